// Diagnosis & Area Classifier
//
// Two independent verdicts per entity:
// - a four-state consistency diagnosis over (ERP presence, billing
//   coverage, task-system activity);
// - an area-divergence verdict comparing the business-unit classification
//   each source implies.
// Every input combination maps to a defined output; malformed fields
// degrade to sentinels, never to errors.

use crate::normalize::fold_accents_upper;
use crate::records::{Area, AreaVerdict, Diagnosis};

/// Sentinel shown when Gestta has no row (or an empty status) for an entity.
pub const GESTTA_ABSENT: &str = "AUSENTE";

/// Gestta status string for display: the raw column value, or the sentinel.
pub fn gestta_status(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => GESTTA_ABSENT.to_string(),
    }
}

/// An entity is active in Gestta iff its status compares equal to "ativo",
/// case-insensitively. "Inativo", "AUSENTE" and anything else are inactive.
pub fn gestta_active(status: &str) -> bool {
    status.eq_ignore_ascii_case("ativo")
}

/// Consistency diagnosis. Evaluated in order, first match wins.
pub fn derive_diagnosis(questor_present: bool, billing_covered: bool, gestta_active: bool) -> Diagnosis {
    let all = questor_present && billing_covered && gestta_active;
    let none = !questor_present && !billing_covered && !gestta_active;

    if all || none {
        Diagnosis::Consistente
    } else if billing_covered && gestta_active && !questor_present {
        Diagnosis::FaltaCadastroQuestor
    } else if questor_present && !billing_covered && !gestta_active {
        Diagnosis::ClienteInativoBaixa
    } else {
        Diagnosis::Divergente
    }
}

/// Area implied by a Gestta display name.
///
/// The operations team encodes the area as a trailing marker: "#0" means
/// In Company, "#1" means Integrada, with optional spaces around the digit
/// ("CLIENTE X # 1"). No marker means the source did not say.
pub fn gestta_area(display_name: &str) -> Option<Area> {
    let trimmed = display_name.trim_end();
    let digit = trimmed.chars().last()?;
    let area = match digit {
        '0' => Area::InCompany,
        '1' => Area::Integrada,
        _ => return None,
    };
    let before_digit = trimmed[..trimmed.len() - 1].trim_end();
    if before_digit.ends_with('#') {
        Some(area)
    } else {
        None
    }
}

/// Area implied by the Questor "especie" field, by accent- and
/// case-insensitive substring match. Unrecognized text means unknown.
pub fn questor_area(especie: &str) -> Option<Area> {
    let norm = fold_accents_upper(especie);
    if norm.is_empty() {
        return None;
    }
    if norm.contains("IN COMPANY") || norm.contains("INCOMPANY") {
        return Some(Area::InCompany);
    }
    if norm.contains("INTEGRADA") || norm.contains("INTEGRADO") || norm.contains("INTERNO") {
        return Some(Area::Integrada);
    }
    None
}

/// Compare the two derived areas. Evaluated in order.
pub fn area_verdict(gestta: Option<Area>, questor: Option<Area>) -> AreaVerdict {
    match (gestta, questor) {
        (None, None) => AreaVerdict::FaltaAmbos,
        (None, Some(_)) => AreaVerdict::FaltaGestta,
        (Some(_), None) => AreaVerdict::FaltaQuestor,
        (Some(g), Some(q)) if g != q => AreaVerdict::Divergente,
        _ => AreaVerdict::Ok,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnosis_consistent_both_ways() {
        assert_eq!(derive_diagnosis(true, true, true), Diagnosis::Consistente);
        assert_eq!(derive_diagnosis(false, false, false), Diagnosis::Consistente);
    }

    #[test]
    fn test_diagnosis_missing_erp() {
        assert_eq!(
            derive_diagnosis(false, true, true),
            Diagnosis::FaltaCadastroQuestor
        );
    }

    #[test]
    fn test_diagnosis_writeoff_candidate() {
        assert_eq!(
            derive_diagnosis(true, false, false),
            Diagnosis::ClienteInativoBaixa
        );
    }

    #[test]
    fn test_diagnosis_total_over_all_combinations() {
        // Every boolean combination lands in exactly one of the four states
        for q in [false, true] {
            for s in [false, true] {
                for g in [false, true] {
                    let d = derive_diagnosis(q, s, g);
                    assert!(Diagnosis::ALL.contains(&d));
                }
            }
        }
        // The remaining mixed combinations are all Divergente
        assert_eq!(derive_diagnosis(true, true, false), Diagnosis::Divergente);
        assert_eq!(derive_diagnosis(true, false, true), Diagnosis::Divergente);
        assert_eq!(derive_diagnosis(false, true, false), Diagnosis::Divergente);
        assert_eq!(derive_diagnosis(false, false, true), Diagnosis::Divergente);
    }

    #[test]
    fn test_gestta_status_sentinel() {
        assert_eq!(gestta_status(None), "AUSENTE");
        assert_eq!(gestta_status(Some("")), "AUSENTE");
        assert_eq!(gestta_status(Some("  ")), "AUSENTE");
        assert_eq!(gestta_status(Some("Inativo")), "Inativo");
    }

    #[test]
    fn test_gestta_active_case_insensitive() {
        assert!(gestta_active("ativo"));
        assert!(gestta_active("ATIVO"));
        assert!(gestta_active("Ativo"));
        assert!(!gestta_active("inativo"));
        assert!(!gestta_active(GESTTA_ABSENT));
        assert!(!gestta_active(""));
    }

    #[test]
    fn test_gestta_area_marker() {
        assert_eq!(gestta_area("CLIENTE X #0"), Some(Area::InCompany));
        assert_eq!(gestta_area("CLIENTE X #1"), Some(Area::Integrada));
        assert_eq!(gestta_area("CLIENTE X # 1 "), Some(Area::Integrada));
        assert_eq!(gestta_area("CLIENTE X"), None);
        assert_eq!(gestta_area("CLIENTE X #2"), None);
        assert_eq!(gestta_area("CLIENTE 1"), None);
        assert_eq!(gestta_area(""), None);
    }

    #[test]
    fn test_questor_area_substring_accent_insensitive() {
        assert_eq!(questor_area("ESCRITORIO IN COMPANY"), Some(Area::InCompany));
        assert_eq!(questor_area("incompany"), Some(Area::InCompany));
        assert_eq!(questor_area("INTEGRADA"), Some(Area::Integrada));
        assert_eq!(questor_area("Serviço Integrado"), Some(Area::Integrada));
        assert_eq!(questor_area("setor INTERNO"), Some(Area::Integrada));
        assert_eq!(questor_area("COMERCIO"), None);
        assert_eq!(questor_area(""), None);
    }

    #[test]
    fn test_area_verdict_table() {
        assert_eq!(area_verdict(None, None), AreaVerdict::FaltaAmbos);
        assert_eq!(area_verdict(Some(Area::InCompany), None), AreaVerdict::FaltaQuestor);
        assert_eq!(area_verdict(None, Some(Area::Integrada)), AreaVerdict::FaltaGestta);
        assert_eq!(
            area_verdict(Some(Area::InCompany), Some(Area::Integrada)),
            AreaVerdict::Divergente
        );
        assert_eq!(
            area_verdict(Some(Area::Integrada), Some(Area::Integrada)),
            AreaVerdict::Ok
        );
    }
}
