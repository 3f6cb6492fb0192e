// View Engine - search, per-column filters and single-key sorting
//
// Takes the consolidated set and produces exactly the sequence the table
// renders and the exporter serializes. All active filters AND together;
// everything defaults to "match everything".

use crate::consolidate::ConsolidatedEntity;
use crate::records::{Area, AreaVerdict, BillingOrigin, Diagnosis};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ============================================================================
// SORTING
// ============================================================================

/// The sortable/filterable columns of the consolidated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    Id,
    Nome,
    Questor,
    Senior,
    SeniorOrigem,
    Gestta,
    Diagnostico,
    AreaGestta,
    AreaQuestor,
    ConfrontoArea,
}

impl SortKey {
    pub fn title(&self) -> &'static str {
        match self {
            SortKey::Id => "Documento",
            SortKey::Nome => "Empresa",
            SortKey::Questor => "Questor",
            SortKey::Senior => "Sênior",
            SortKey::SeniorOrigem => "Origem Fat.",
            SortKey::Gestta => "Gestta",
            SortKey::Diagnostico => "Diagnóstico",
            SortKey::AreaGestta => "Área Gestta",
            SortKey::AreaQuestor => "Área Questor",
            SortKey::ConfrontoArea => "Confronto",
        }
    }

    pub const ALL: [SortKey; 10] = [
        SortKey::Id,
        SortKey::Nome,
        SortKey::Questor,
        SortKey::Senior,
        SortKey::SeniorOrigem,
        SortKey::Gestta,
        SortKey::Diagnostico,
        SortKey::AreaGestta,
        SortKey::AreaQuestor,
        SortKey::ConfrontoArea,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortConfig {
    fn default() -> Self {
        SortConfig { key: SortKey::Nome, direction: SortDirection::Asc }
    }
}

impl SortConfig {
    /// Clicking the active column toggles direction; clicking another
    /// column resets to ascending.
    pub fn toggle(&mut self, key: SortKey) {
        if self.key == key {
            self.direction = match self.direction {
                SortDirection::Asc => SortDirection::Desc,
                SortDirection::Desc => SortDirection::Asc,
            };
        } else {
            self.key = key;
            self.direction = SortDirection::Asc;
        }
    }
}

/// Numeric-aware, case-insensitive string ordering ("cliente 9" before
/// "cliente 10"). Digit runs compare as integers, everything else compares
/// by lowercased character.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (mut i, mut j) = (0, 0);

    while i < a_chars.len() && j < b_chars.len() {
        let (ca, cb) = (a_chars[i], b_chars[j]);
        if ca.is_ascii_digit() && cb.is_ascii_digit() {
            let run = |chars: &[char], mut k: usize| {
                let start = k;
                while k < chars.len() && chars[k].is_ascii_digit() {
                    k += 1;
                }
                (start, k)
            };
            let (a_start, a_end) = run(&a_chars, i);
            let (b_start, b_end) = run(&b_chars, j);
            let a_num: String = a_chars[a_start..a_end].iter().collect();
            let b_num: String = b_chars[b_start..b_end].iter().collect();
            let a_trim = a_num.trim_start_matches('0');
            let b_trim = b_num.trim_start_matches('0');
            let ord = a_trim
                .len()
                .cmp(&b_trim.len())
                .then_with(|| a_trim.cmp(b_trim));
            if ord != Ordering::Equal {
                return ord;
            }
            i = a_end;
            j = b_end;
        } else {
            let la = ca.to_lowercase().next().unwrap_or(ca);
            let lb = cb.to_lowercase().next().unwrap_or(cb);
            let ord = la.cmp(&lb);
            if ord != Ordering::Equal {
                return ord;
            }
            i += 1;
            j += 1;
        }
    }
    a_chars.len().cmp(&b_chars.len()).then_with(|| a.cmp(b))
}

/// Sort value of one column: booleans order as false < true, everything
/// else by natural string comparison of its display label.
fn compare_by(key: SortKey, a: &ConsolidatedEntity, b: &ConsolidatedEntity) -> Ordering {
    match key {
        SortKey::Questor => a.questor.cmp(&b.questor),
        SortKey::Senior => a.senior.cmp(&b.senior),
        SortKey::Id => natural_cmp(&a.id, &b.id),
        SortKey::Nome => natural_cmp(&a.nome, &b.nome),
        SortKey::SeniorOrigem => natural_cmp(a.senior_origem.as_str(), b.senior_origem.as_str()),
        SortKey::Gestta => natural_cmp(&a.gestta, &b.gestta),
        SortKey::Diagnostico => natural_cmp(a.diagnostico.as_str(), b.diagnostico.as_str()),
        SortKey::AreaGestta => natural_cmp(area_label(a.area_gestta), area_label(b.area_gestta)),
        SortKey::AreaQuestor => natural_cmp(area_label(a.area_questor), area_label(b.area_questor)),
        SortKey::ConfrontoArea => {
            natural_cmp(a.confronto_area.as_str(), b.confronto_area.as_str())
        }
    }
}

fn area_label(area: Option<Area>) -> &'static str {
    area.map(|a| a.as_str()).unwrap_or("")
}

// ============================================================================
// FILTERS
// ============================================================================

/// Gestta status filter values. The status column itself is a free string,
/// but the filter only enumerates the three states the team works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GesttaStatusFilter {
    Ativo,
    Inativo,
    Ausente,
}

impl GesttaStatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            GesttaStatusFilter::Ativo => "Ativo",
            GesttaStatusFilter::Inativo => "Inativo",
            GesttaStatusFilter::Ausente => "Ausente",
        }
    }

    fn matches(&self, status: &str) -> bool {
        status.eq_ignore_ascii_case(self.as_str())
    }

    pub const ALL: [GesttaStatusFilter; 3] = [
        GesttaStatusFilter::Ativo,
        GesttaStatusFilter::Inativo,
        GesttaStatusFilter::Ausente,
    ];
}

/// Per-column filters. `None` / empty string means "match everything".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnFilters {
    /// Substring match on the normalized id
    pub id: String,
    /// Case-insensitive substring match on the display name
    pub nome: String,
    pub questor: Option<bool>,
    pub senior: Option<bool>,
    pub senior_origem: Option<BillingOrigin>,
    pub gestta: Option<GesttaStatusFilter>,
    pub diagnostico: Option<Diagnosis>,
    pub area_gestta: Option<Area>,
    pub area_questor: Option<Area>,
    pub confronto_area: Option<AreaVerdict>,
}

impl ColumnFilters {
    pub fn is_active(&self) -> bool {
        *self != ColumnFilters::default()
    }

    fn matches(&self, e: &ConsolidatedEntity) -> bool {
        if !self.id.is_empty() && !e.id.contains(&self.id) {
            return false;
        }
        if !self.nome.is_empty()
            && !e.nome.to_lowercase().contains(&self.nome.to_lowercase())
        {
            return false;
        }
        if self.questor.is_some_and(|want| e.questor != want) {
            return false;
        }
        if self.senior.is_some_and(|want| e.senior != want) {
            return false;
        }
        if self.senior_origem.is_some_and(|want| e.senior_origem != want) {
            return false;
        }
        if self.gestta.is_some_and(|want| !want.matches(&e.gestta)) {
            return false;
        }
        if self.diagnostico.is_some_and(|want| e.diagnostico != want) {
            return false;
        }
        if self.area_gestta.is_some_and(|want| e.area_gestta != Some(want)) {
            return false;
        }
        if self.area_questor.is_some_and(|want| e.area_questor != Some(want)) {
            return false;
        }
        if self.confronto_area.is_some_and(|want| e.confronto_area != want) {
            return false;
        }
        true
    }
}

// ============================================================================
// VIEW STATE
// ============================================================================

/// The active view: free-text search + column filters + sort.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewState {
    pub search: String,
    pub filters: ColumnFilters,
    pub sort: SortConfig,
}

impl ViewState {
    /// Apply search, filters and sort to the consolidated set. The result is
    /// exactly the displayed/exported sequence.
    pub fn apply(&self, entities: &[ConsolidatedEntity]) -> Vec<ConsolidatedEntity> {
        let search = self.search.to_lowercase();
        let mut items: Vec<ConsolidatedEntity> = entities
            .iter()
            .filter(|e| {
                if !search.is_empty()
                    && !e.nome.to_lowercase().contains(&search)
                    && !e.id.contains(&search)
                {
                    return false;
                }
                self.filters.matches(e)
            })
            .cloned()
            .collect();

        items.sort_by(|a, b| {
            let ord = compare_by(self.sort.key, a, b);
            match self.sort.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
        items
    }
}
