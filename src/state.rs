// Application state - the one logical writer
//
// Everything the engine consumes lives here: the three source batches, the
// operator adjustments (payer overrides, matrix exclusions) and the audit
// trail. Every mutating action is atomic, appends one audit entry tagged
// with the operator, bumps the version and synchronously recomputes the
// consolidated view - there is no implicit invalidation graph.

use crate::consolidate::{build_consolidated, ConsolidatedEntity};
use crate::index::SourceIndex;
use crate::ingest::dedupe_last_writer;
use crate::records::{GesttaRecord, QuestorRecord, SeniorRecord, SourceKind};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Actor recorded when no operator is logged in.
pub const SYSTEM_ACTOR: &str = "SISTEMA";

/// One append-only activity-log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub action: String,
    pub details: String,
}

impl AuditEntry {
    pub fn new(user: &str, action: &str, details: String) -> Self {
        AuditEntry {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            user: if user.is_empty() { SYSTEM_ACTOR.to_string() } else { user.to_string() },
            action: action.to_string(),
            details,
        }
    }
}

/// Versioned application state. Single-threaded, synchronous; concurrent
/// multi-operator editing is layered externally if ever needed.
#[derive(Debug, Default)]
pub struct AppState {
    pub operator: String,
    pub questor: Vec<QuestorRecord>,
    pub senior: Vec<SeniorRecord>,
    pub gestta: Vec<GesttaRecord>,
    pub payer_overrides: HashMap<String, String>,
    pub matrix_exclusions: HashSet<String>,
    /// Newest first
    pub audit: Vec<AuditEntry>,
    /// Bumped on every mutation
    pub version: u64,
    consolidated: Vec<ConsolidatedEntity>,
}

impl AppState {
    pub fn new() -> Self {
        AppState::default()
    }

    /// The derived view. Valid because every mutating action recomputes
    /// before returning.
    pub fn consolidated(&self) -> &[ConsolidatedEntity] {
        &self.consolidated
    }

    /// Rebuild the consolidated view from the current snapshot. Total, not
    /// incremental - cheap at this data scale.
    pub fn recompute(&mut self) {
        let index = SourceIndex::build(&self.questor, &self.senior, &self.gestta);
        self.consolidated =
            build_consolidated(&index, &self.payer_overrides, &self.matrix_exclusions);
    }

    fn log(&mut self, action: &str, details: String) {
        let entry = AuditEntry::new(&self.operator, action, details);
        self.audit.insert(0, entry);
    }

    fn touch(&mut self, action: &str, details: String) {
        self.version += 1;
        self.log(action, details);
        self.recompute();
    }

    // ========================================================================
    // OPERATOR SESSION
    // ========================================================================

    pub fn login(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Informe seu nome para entrar");
        }
        self.operator = name.to_string();
        self.log("Login", format!("Utilizador \"{name}\" acedeu ao sistema"));
        Ok(())
    }

    pub fn logout(&mut self) {
        self.operator.clear();
    }

    // ========================================================================
    // SOURCE DATA
    // ========================================================================

    /// Merge a freshly ingested batch into a source base. Rows that
    /// normalize to an id already present replace the stored row
    /// (last writer wins), new ids append in order.
    pub fn import_questor(&mut self, rows: Vec<QuestorRecord>) {
        let count = rows.len();
        let merged: Vec<QuestorRecord> =
            self.questor.drain(..).chain(rows).collect();
        self.questor = dedupe_last_writer(merged, |r| r.inscricao_federal.as_str());
        self.touch(
            "Importação",
            format!("Processados {count} registos no sistema QUESTOR"),
        );
    }

    pub fn import_senior(&mut self, rows: Vec<SeniorRecord>) {
        let count = rows.len();
        let merged: Vec<SeniorRecord> = self.senior.drain(..).chain(rows).collect();
        self.senior = dedupe_last_writer(merged, |r| r.cnpj.as_str());
        self.touch(
            "Importação",
            format!("Processados {count} registos no sistema SÊNIOR"),
        );
    }

    pub fn import_gestta(&mut self, rows: Vec<GesttaRecord>) {
        let count = rows.len();
        let merged: Vec<GesttaRecord> = self.gestta.drain(..).chain(rows).collect();
        self.gestta = dedupe_last_writer(merged, |r| r.cnpj.as_str());
        self.touch(
            "Importação",
            format!("Processados {count} registos no sistema GESTTA"),
        );
    }

    /// Drop one source's base entirely.
    pub fn clear_source(&mut self, kind: SourceKind) {
        match kind {
            SourceKind::Questor => self.questor.clear(),
            SourceKind::Senior => self.senior.clear(),
            SourceKind::Gestta => self.gestta.clear(),
        }
        self.touch(
            "Limpeza",
            format!("A base do sistema {} foi limpa", kind.name().to_uppercase()),
        );
    }

    // ========================================================================
    // OPERATOR ACTIONS
    // ========================================================================

    /// Bulk-link a set of dependents to one payer. At most one target per
    /// dependent: assigning again replaces the previous link.
    pub fn assign_payer(&mut self, dependents: &[String], payer: &str) {
        let payer = crate::normalize::normalize_id(payer);
        for id in dependents {
            self.payer_overrides.insert(id.clone(), payer.clone());
        }
        self.touch(
            "Vínculo Manual",
            format!("{} clientes vinculados ao pagador {payer}", dependents.len()),
        );
    }

    /// Remove the manual payer link of one dependent.
    pub fn remove_payer(&mut self, id: &str) {
        self.payer_overrides.remove(id);
        self.touch(
            "Desvínculo",
            format!("Vínculo manual removido do cliente {id}"),
        );
    }

    /// Flip the matrix-exclusion flag for one entity.
    pub fn toggle_matrix_exclusion(&mut self, id: &str) {
        let details = if self.matrix_exclusions.remove(id) {
            format!("Regra de 8 dígitos reativada para o cliente {id}")
        } else {
            self.matrix_exclusions.insert(id.to_string());
            format!("Regra de 8 dígitos desativada para o cliente {id}")
        };
        self.touch("Regra Matriz", details);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{BillingOrigin, Diagnosis};

    fn senior_row(cnpj: &str) -> SeniorRecord {
        SeniorRecord { cnpj: cnpj.into(), nome: "X".into(), codigo: String::new() }
    }

    #[test]
    fn test_login_requires_name() {
        let mut state = AppState::new();
        assert!(state.login("   ").is_err());
        assert!(state.login("Maria").is_ok());
        assert_eq!(state.operator, "Maria");
        assert_eq!(state.audit[0].action, "Login");
        assert_eq!(state.audit[0].user, "Maria");
    }

    #[test]
    fn test_import_recomputes_view() {
        let mut state = AppState::new();
        assert!(state.consolidated().is_empty());

        state.import_senior(vec![senior_row("12345678000199")]);
        assert_eq!(state.consolidated().len(), 1);
        assert_eq!(state.consolidated()[0].senior_origem, BillingOrigin::Direto);
        assert_eq!(state.version, 1);
    }

    #[test]
    fn test_reimport_replaces_same_id() {
        let mut state = AppState::new();
        state.import_senior(vec![SeniorRecord {
            cnpj: "12345678000199".into(),
            nome: "ANTIGO".into(),
            codigo: String::new(),
        }]);
        state.import_senior(vec![SeniorRecord {
            cnpj: "12.345.678/0001-99".into(),
            nome: "NOVO".into(),
            codigo: String::new(),
        }]);
        assert_eq!(state.senior.len(), 1);
        assert_eq!(state.senior[0].nome, "NOVO");
        assert_eq!(state.consolidated().len(), 1);
    }

    #[test]
    fn test_toggle_exclusion_round_trip() {
        let mut state = AppState::new();
        state.import_senior(vec![senior_row("11111111000100")]);
        state.import_questor(vec![QuestorRecord {
            inscricao_federal: "11111111000299".into(),
            ..Default::default()
        }]);

        let branch = |s: &AppState| {
            s.consolidated()
                .iter()
                .find(|e| e.id == "11111111000299")
                .cloned()
                .unwrap()
        };
        assert_eq!(branch(&state).senior_origem, BillingOrigin::Matriz);

        state.toggle_matrix_exclusion("11111111000299");
        let e = branch(&state);
        assert!(!e.senior);
        assert_eq!(e.senior_origem, BillingOrigin::Ignorado);
        assert_eq!(e.diagnostico, Diagnosis::ClienteInativoBaixa);

        state.toggle_matrix_exclusion("11111111000299");
        assert_eq!(branch(&state).senior_origem, BillingOrigin::Matriz);
    }

    #[test]
    fn test_assign_and_remove_payer() {
        let mut state = AppState::new();
        state.login("Ana").unwrap();
        state.import_senior(vec![senior_row("99999999000100")]);
        state.import_gestta(vec![GesttaRecord {
            cnpj: "12345678000199".into(),
            nome: "DEPENDENTE".into(),
            status: "Ativo".into(),
            ..Default::default()
        }]);

        state.assign_payer(&["12345678000199".to_string()], "99999999000100");
        let e = state
            .consolidated()
            .iter()
            .find(|e| e.id == "12345678000199")
            .unwrap();
        assert_eq!(e.senior_origem, BillingOrigin::Manual);
        assert_eq!(e.payer_id.as_deref(), Some("99999999000100"));

        // Audit is newest first and carries the operator
        assert_eq!(state.audit[0].action, "Vínculo Manual");
        assert_eq!(state.audit[0].user, "Ana");

        state.remove_payer("12345678000199");
        let e = state
            .consolidated()
            .iter()
            .find(|e| e.id == "12345678000199")
            .unwrap();
        assert_eq!(e.senior_origem, BillingOrigin::Ausente);
        assert!(e.payer_id.is_none());
    }

    #[test]
    fn test_clear_source() {
        let mut state = AppState::new();
        state.import_senior(vec![senior_row("12345678000199")]);
        state.clear_source(SourceKind::Senior);
        assert!(state.senior.is_empty());
        assert!(state.consolidated().is_empty());
        assert_eq!(state.audit[0].action, "Limpeza");
    }
}
