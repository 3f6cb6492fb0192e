// Consolidation Builder - one row per distinct entity across all sources
//
// Derived data only: rebuilt in full from the indexes plus the operator
// state after every mutation. No incremental path, no versioning concern.

use crate::attribution::{resolve_attribution, BillingAttribution};
use crate::diagnosis::{
    area_verdict, derive_diagnosis, gestta_active, gestta_area, gestta_status, questor_area,
};
use crate::index::SourceIndex;
use crate::records::{Area, AreaVerdict, BillingOrigin, Diagnosis};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Display sentinel when no source carries a name for the entity.
pub const UNKNOWN_NAME: &str = "N/A";

/// The consolidated view of one legal entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedEntity {
    /// Normalized id (digits only), never empty
    pub id: String,
    /// First non-empty of Questor, Sênior, Gestta names
    pub nome: String,
    pub codigo_questor: String,
    pub codigo_senior: String,
    pub codigo_gestta: String,
    /// Registered in the ERP
    pub questor: bool,
    /// Billing coverage through any rule
    pub senior: bool,
    pub senior_origem: BillingOrigin,
    /// Raw Gestta status, or "AUSENTE"
    pub gestta: String,
    pub diagnostico: Diagnosis,
    pub area_gestta: Option<Area>,
    pub area_questor: Option<Area>,
    pub confronto_area: AreaVerdict,
    /// Manual payer target, if the operator linked one
    pub payer_id: Option<String>,
    /// The entity's own id is in the billing index
    pub is_direct_senior: bool,
    pub is_excluded: bool,
}

impl ConsolidatedEntity {
    /// Entity is active in Gestta (status equals "ativo").
    pub fn gestta_active(&self) -> bool {
        gestta_active(&self.gestta)
    }
}

fn first_non_empty(candidates: &[Option<&str>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Build one consolidated entity. Pure function of the snapshot.
fn consolidate_one(
    id: &str,
    index: &SourceIndex,
    attr: BillingAttribution,
    payer: Option<&String>,
) -> ConsolidatedEntity {
    let q = index.questor.get(id);
    let s = index.senior.get(id);
    let g = index.gestta.get(id);

    let nome = first_non_empty(&[
        q.map(|r| r.nome_empresa.as_str()),
        s.map(|r| r.nome.as_str()),
        g.map(|r| r.nome.as_str()),
    ])
    .unwrap_or_else(|| UNKNOWN_NAME.to_string());

    let questor_present = q.is_some();
    let status = gestta_status(g.map(|r| r.status.as_str()));
    let active = gestta_active(&status);

    let area_g = g.and_then(|r| gestta_area(&r.nome));
    let area_q = q.and_then(|r| questor_area(&r.especie_estab));

    ConsolidatedEntity {
        id: id.to_string(),
        nome,
        codigo_questor: q.map(|r| r.codigo_empresa.clone()).unwrap_or_default(),
        codigo_senior: s.map(|r| r.codigo.clone()).unwrap_or_default(),
        codigo_gestta: g.map(|r| r.codigo.clone()).unwrap_or_default(),
        questor: questor_present,
        senior: attr.covered,
        senior_origem: attr.origin,
        gestta: status,
        diagnostico: derive_diagnosis(questor_present, attr.covered, active),
        area_gestta: area_g,
        area_questor: area_q,
        confronto_area: area_verdict(area_g, area_q),
        payer_id: payer.cloned(),
        is_direct_senior: attr.has_direct,
        is_excluded: attr.is_excluded,
    }
}

/// Build the full consolidated set, in the index's stable union order.
pub fn build_consolidated(
    index: &SourceIndex,
    overrides: &HashMap<String, String>,
    exclusions: &HashSet<String>,
) -> Vec<ConsolidatedEntity> {
    index
        .all_ids()
        .iter()
        .map(|id| {
            let attr = resolve_attribution(id, index, overrides, exclusions);
            consolidate_one(id, index, attr, overrides.get(id))
        })
        .collect()
}
