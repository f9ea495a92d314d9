//! Primary-entity ("focus") detection.
//!
//! A response is judged to be about the entity whose label it mentions most
//! often. Matching is case-insensitive literal substring counting, with
//! non-overlapping occurrences.
//!
//! # Tie-break
//!
//! When several entities share the maximum positive count, the one declared
//! first in the entity set wins. Callers that care about ties should order the
//! entity set accordingly.

use crate::domain::Entity;

/// Count non-overlapping, case-insensitive occurrences of `label` in `text`.
///
/// An empty label never matches.
pub fn count_mentions(text: &str, label: &str) -> usize {
    if label.is_empty() {
        return 0;
    }
    text.to_lowercase().matches(&label.to_lowercase()).count()
}

/// Mention count for every entity, in declared order.
pub fn mention_counts<'a>(text: &str, entities: &'a [Entity]) -> Vec<(&'a Entity, usize)> {
    let lowered = text.to_lowercase();
    entities
        .iter()
        .map(|entity| {
            let needle = entity.label().to_lowercase();
            let count = if needle.is_empty() {
                0
            } else {
                lowered.matches(&needle).count()
            };
            (entity, count)
        })
        .collect()
}

/// The entity `text` is primarily about, or `None` when no label appears.
pub fn detect_primary<'a>(text: &str, entities: &'a [Entity]) -> Option<&'a Entity> {
    let mut best: Option<(&Entity, usize)> = None;
    for (entity, count) in mention_counts(text, entities) {
        if count == 0 {
            continue;
        }
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((entity, count)),
        }
    }
    best.map(|(entity, _)| entity)
}
