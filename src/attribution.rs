// Attribution Resolver - does billing responsibility reach this entity?
//
// Three independent facts (direct, group, manual) plus the exclusion flag.
// The diagnosis classifier needs the raw OR of the facts, so all of them are
// exposed alongside the single origin tag. Pure function, no failure mode:
// "no coverage" is a normal outcome, not an error.

use crate::index::SourceIndex;
use crate::normalize::matrix_prefix;
use crate::records::BillingOrigin;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Resolved billing attribution for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingAttribution {
    /// The entity's own id has a billing record
    pub has_direct: bool,
    /// Inherited through a shared head-office prefix (suppressed by exclusion)
    pub has_group: bool,
    /// An operator override points at a payer that resolves in billing
    pub has_manual: bool,
    /// Operator suppressed the group rule for this id
    pub is_excluded: bool,
    /// direct OR group OR manual
    pub covered: bool,
    pub origin: BillingOrigin,
}

/// Resolve billing coverage for `id`.
///
/// Rule interplay, deliberately asymmetric:
/// - exclusion suppresses GROUP inheritance only; a direct billing record or
///   a manual payer link still grants coverage on an excluded id;
/// - a manual link counts when its target is either directly billed or
///   itself reachable through the head-office prefix set.
///
/// Origin tag precedence: Direto > Manual > Matriz > Ignorado > Ausente.
pub fn resolve_attribution(
    id: &str,
    index: &SourceIndex,
    overrides: &HashMap<String, String>,
    exclusions: &HashSet<String>,
) -> BillingAttribution {
    let has_direct = index.senior.contains_key(id);
    let is_excluded = exclusions.contains(id);

    let has_group = !is_excluded
        && matrix_prefix(id)
            .map(|p| index.senior_prefixes.contains(p))
            .unwrap_or(false);

    let has_manual = overrides.get(id).is_some_and(|payer| {
        index.senior.contains_key(payer.as_str())
            || matrix_prefix(payer)
                .map(|p| index.senior_prefixes.contains(p))
                .unwrap_or(false)
    });

    let covered = has_direct || has_group || has_manual;

    let origin = if has_direct {
        BillingOrigin::Direto
    } else if has_manual {
        BillingOrigin::Manual
    } else if has_group {
        BillingOrigin::Matriz
    } else if is_excluded {
        BillingOrigin::Ignorado
    } else {
        BillingOrigin::Ausente
    };

    BillingAttribution {
        has_direct,
        has_group,
        has_manual,
        is_excluded,
        covered,
        origin,
    }
}
