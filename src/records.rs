// Source record types and closed vocabularies
//
// Each system of record exports dozens of columns; the engine only ever
// reads a fixed handful. Records are validated into these shapes once, at
// the ingestion boundary, and the engine never touches a loose string map.

use serde::{Deserialize, Serialize};

// ============================================================================
// SOURCE KIND
// ============================================================================

/// Which system of record a batch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Questor - ERP / primary registration base (pipe-delimited export)
    Questor,
    /// Sênior - billing system (comma-delimited export)
    Senior,
    /// Gestta - task management (comma-delimited export)
    Gestta,
}

impl SourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Questor => "Questor",
            SourceKind::Senior => "Sênior",
            SourceKind::Gestta => "Gestta",
        }
    }

    /// Short code for storage and CLI arguments.
    pub fn code(&self) -> &'static str {
        match self {
            SourceKind::Questor => "questor",
            SourceKind::Senior => "senior",
            SourceKind::Gestta => "gestta",
        }
    }

    pub fn from_code(code: &str) -> Option<SourceKind> {
        match code.to_lowercase().as_str() {
            "questor" => Some(SourceKind::Questor),
            "senior" | "sênior" => Some(SourceKind::Senior),
            "gestta" => Some(SourceKind::Gestta),
            _ => None,
        }
    }

    /// Field delimiter of this source's text export.
    pub fn delimiter(&self) -> u8 {
        match self {
            SourceKind::Questor => b'|',
            SourceKind::Senior | SourceKind::Gestta => b',',
        }
    }
}

// ============================================================================
// RAW RECORDS (one fixed shape per source)
// ============================================================================

/// Questor (ERP) row. Identifier column: INSCRFEDERAL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestorRecord {
    /// Raw tax id as exported (punctuation intact)
    pub inscricao_federal: String,
    pub nome_empresa: String,
    pub codigo_empresa: String,
    /// Free-text classification ("especie") - feeds the area derivation
    pub especie_estab: String,
}

/// Sênior (billing) row. Identifier column: CNPJ.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeniorRecord {
    pub cnpj: String,
    pub nome: String,
    /// Internal billing code shown alongside the entity
    pub codigo: String,
}

/// Gestta (tasks) row. Identifier column: CNPJ, lowercase fallback accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GesttaRecord {
    pub cnpj: String,
    /// Display name; may carry a trailing "#0"/"#1" area marker
    pub nome: String,
    pub codigo: String,
    /// Raw "Ativo/inativo" column value; empty means the row said nothing
    pub status: String,
}

// ============================================================================
// CLOSED VOCABULARIES (string-typed in the spreadsheets, enums here)
// ============================================================================

/// How billing coverage was attributed, in display precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BillingOrigin {
    /// Entity's own CNPJ has a billing record
    Direto,
    /// Operator linked the entity to a payer that resolves in billing
    Manual,
    /// Inherited from a head office sharing the 8-digit prefix
    Matriz,
    /// Group inheritance would apply but the operator suppressed it
    Ignorado,
    /// No coverage through any rule
    Ausente,
}

impl BillingOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingOrigin::Direto => "Direto",
            BillingOrigin::Manual => "Manual",
            BillingOrigin::Matriz => "Matriz",
            BillingOrigin::Ignorado => "Ignorado",
            BillingOrigin::Ausente => "Ausente",
        }
    }

    pub const ALL: [BillingOrigin; 5] = [
        BillingOrigin::Direto,
        BillingOrigin::Manual,
        BillingOrigin::Matriz,
        BillingOrigin::Ignorado,
        BillingOrigin::Ausente,
    ];
}

/// Four-state consistency verdict across the three sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Diagnosis {
    /// All three agree (all registered and active, or none)
    Consistente,
    /// Billed and active in Gestta but missing from the ERP
    FaltaCadastroQuestor,
    /// Registered in the ERP only - candidate for write-off
    ClienteInativoBaixa,
    /// Any other mixed combination
    Divergente,
}

impl Diagnosis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Diagnosis::Consistente => "Consistente",
            Diagnosis::FaltaCadastroQuestor => "Falta Cadastro Questor",
            Diagnosis::ClienteInativoBaixa => "Cliente Inativo (Baixa)",
            Diagnosis::Divergente => "Divergente",
        }
    }

    pub const ALL: [Diagnosis; 4] = [
        Diagnosis::Consistente,
        Diagnosis::FaltaCadastroQuestor,
        Diagnosis::ClienteInativoBaixa,
        Diagnosis::Divergente,
    ];
}

/// Business-unit classification, derived independently from two sources.
/// `None` everywhere means "the source did not say".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Area {
    InCompany,
    Integrada,
}

impl Area {
    pub fn as_str(&self) -> &'static str {
        match self {
            Area::InCompany => "In Company",
            Area::Integrada => "Integrada",
        }
    }

    pub const ALL: [Area; 2] = [Area::InCompany, Area::Integrada];
}

/// Outcome of comparing the Gestta-derived and Questor-derived areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AreaVerdict {
    Ok,
    Divergente,
    /// Questor said nothing, Gestta did
    FaltaQuestor,
    /// Gestta said nothing, Questor did
    FaltaGestta,
    /// Neither source classified the entity
    FaltaAmbos,
}

impl AreaVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            AreaVerdict::Ok => "OK",
            AreaVerdict::Divergente => "Divergente",
            AreaVerdict::FaltaQuestor => "Falta Questor",
            AreaVerdict::FaltaGestta => "Falta Gestta",
            AreaVerdict::FaltaAmbos => "Falta Gestta/Questor",
        }
    }

    pub const ALL: [AreaVerdict; 5] = [
        AreaVerdict::Ok,
        AreaVerdict::Divergente,
        AreaVerdict::FaltaQuestor,
        AreaVerdict::FaltaGestta,
        AreaVerdict::FaltaAmbos,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_codes() {
        for kind in [SourceKind::Questor, SourceKind::Senior, SourceKind::Gestta] {
            assert_eq!(SourceKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(SourceKind::from_code("SENIOR"), Some(SourceKind::Senior));
        assert_eq!(SourceKind::from_code("sap"), None);
    }

    #[test]
    fn test_questor_uses_pipe_delimiter() {
        assert_eq!(SourceKind::Questor.delimiter(), b'|');
        assert_eq!(SourceKind::Senior.delimiter(), b',');
        assert_eq!(SourceKind::Gestta.delimiter(), b',');
    }

    #[test]
    fn test_verdict_labels_match_export_vocabulary() {
        assert_eq!(AreaVerdict::FaltaAmbos.as_str(), "Falta Gestta/Questor");
        assert_eq!(Diagnosis::ClienteInativoBaixa.as_str(), "Cliente Inativo (Baixa)");
        assert_eq!(BillingOrigin::Direto.as_str(), "Direto");
    }
}
