// Source Indexer - per-source lookup maps plus the head-office prefix set
//
// Built fresh from the current batches on every recompute; at a few thousand
// rows per source there is nothing worth caching.

use crate::normalize::{matrix_prefix, normalize_id};
use crate::records::{GesttaRecord, QuestorRecord, SeniorRecord};
use std::collections::{HashMap, HashSet};

/// Lookup tables for one reconciliation pass.
///
/// Keys are normalized ids; rows whose id normalizes to empty never enter an
/// index. `union_order` preserves first-sighting order across the three
/// sources (Questor, then Sênior, then Gestta) so the consolidated set is
/// stable between recomputes.
#[derive(Debug, Default)]
pub struct SourceIndex {
    pub questor: HashMap<String, QuestorRecord>,
    pub senior: HashMap<String, SeniorRecord>,
    pub gestta: HashMap<String, GesttaRecord>,
    /// 8-digit head-office prefixes observed among Sênior (billing) ids.
    /// Built from EVERY indexed billing id - a documented business heuristic,
    /// not restricted by presence in the other sources.
    pub senior_prefixes: HashSet<String>,
    union_order: Vec<String>,
}

impl SourceIndex {
    pub fn build(
        questor: &[QuestorRecord],
        senior: &[SeniorRecord],
        gestta: &[GesttaRecord],
    ) -> Self {
        let mut index = SourceIndex::default();
        let mut seen: HashSet<String> = HashSet::new();

        for record in questor {
            let id = normalize_id(&record.inscricao_federal);
            if id.is_empty() {
                continue;
            }
            if seen.insert(id.clone()) {
                index.union_order.push(id.clone());
            }
            index.questor.insert(id, record.clone());
        }

        for record in senior {
            let id = normalize_id(&record.cnpj);
            if id.is_empty() {
                continue;
            }
            if let Some(prefix) = matrix_prefix(&id) {
                index.senior_prefixes.insert(prefix.to_string());
            }
            if seen.insert(id.clone()) {
                index.union_order.push(id.clone());
            }
            index.senior.insert(id, record.clone());
        }

        for record in gestta {
            let id = normalize_id(&record.cnpj);
            if id.is_empty() {
                continue;
            }
            if seen.insert(id.clone()) {
                index.union_order.push(id.clone());
            }
            index.gestta.insert(id, record.clone());
        }

        index
    }

    /// All distinct ids seen in any source, in stable first-sighting order.
    pub fn all_ids(&self) -> &[String] {
        &self.union_order
    }

    pub fn is_empty(&self) -> bool {
        self.union_order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn senior(cnpj: &str) -> SeniorRecord {
        SeniorRecord { cnpj: cnpj.into(), nome: "X".into(), codigo: String::new() }
    }

    #[test]
    fn test_index_normalizes_keys() {
        let questor = vec![QuestorRecord {
            inscricao_federal: "12.345.678/0001-99".into(),
            nome_empresa: "ACME".into(),
            ..Default::default()
        }];
        let index = SourceIndex::build(&questor, &[], &[]);
        assert!(index.questor.contains_key("12345678000199"));
        assert_eq!(index.all_ids(), ["12345678000199"]);
    }

    #[test]
    fn test_empty_ids_are_dropped() {
        let senior_rows = vec![senior("sem documento"), senior("")];
        let index = SourceIndex::build(&[], &senior_rows, &[]);
        assert!(index.senior.is_empty());
        assert!(index.senior_prefixes.is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_prefix_set_from_billing_only() {
        let questor = vec![QuestorRecord {
            inscricao_federal: "99999999000101".into(),
            ..Default::default()
        }];
        let senior_rows = vec![senior("11111111000100"), senior("1234567")];
        let index = SourceIndex::build(&questor, &senior_rows, &[]);

        // Prefixes come from Sênior ids of length >= 8 only
        assert!(index.senior_prefixes.contains("11111111"));
        assert!(!index.senior_prefixes.contains("99999999"));
        // The 7-digit id is indexed but contributes no prefix
        assert!(index.senior.contains_key("1234567"));
        assert_eq!(index.senior_prefixes.len(), 1);
    }

    #[test]
    fn test_union_order_is_first_sighting() {
        let questor = vec![QuestorRecord {
            inscricao_federal: "11111111000100".into(),
            ..Default::default()
        }];
        let senior_rows = vec![senior("11111111000100"), senior("22222222000100")];
        let gestta = vec![GesttaRecord {
            cnpj: "33333333000100".into(),
            ..Default::default()
        }];
        let index = SourceIndex::build(&questor, &senior_rows, &gestta);
        assert_eq!(
            index.all_ids(),
            ["11111111000100", "22222222000100", "33333333000100"]
        );
    }
}
