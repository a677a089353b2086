//! Merge findings into the recommendation list handed to the caller.

use std::collections::HashSet;

use crate::finding::{Finding, Recommendation, Severity};

/// Emitted alone when nothing was detected.
pub const STABLE_MESSAGE: &str =
    "Paramètres globalement stables. Continuer le suivi et consigner les observations terrain.";

/// Evaluator findings first, then aggregator findings, each in its given order.
///
/// Recommendations with an already emitted message are dropped (first wins). An empty
/// merge yields exactly one OK recommendation. `cap` truncates after
/// deduplication; a cap of zero is treated as one so the result is never empty.
pub fn compose(evaluator: &[Finding], aggregator: &[Finding], cap: Option<usize>) -> Vec<Recommendation> {
    let mut seen = HashSet::new();
    let mut out: Vec<Recommendation> = evaluator
        .iter()
        .chain(aggregator)
        .map(Recommendation::from)
        .filter(|r| seen.insert(r.message.clone()))
        .collect();

    if out.is_empty() {
        out.push(Recommendation::new(Severity::Ok, STABLE_MESSAGE));
    }
    if let Some(cap) = cap {
        out.truncate(cap.max(1));
    }
    out
}
