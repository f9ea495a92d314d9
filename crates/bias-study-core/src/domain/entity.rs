//! Named subjects of analysis and their ground-truth facts.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One member of the closed, configured entity set (e.g. `Player A`).
///
/// Identified by its display label; matching against text is
/// case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(String);

impl Entity {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Display label as configured.
    pub fn label(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Entity {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// Which end of a metric's range a predicate refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extremum {
    Highest,
    Lowest,
}

/// Fixed numeric facts per entity, keyed by entity label then metric name.
///
/// Only read by contradiction checking; never mutated during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroundTruth {
    facts: BTreeMap<String, BTreeMap<String, i64>>,
}

impl GroundTruth {
    /// The synthetic season statistics embedded in every reference prompt.
    pub fn reference() -> Self {
        Self::default()
            .with_fact("Player A", "goals", 45)
            .with_fact("Player A", "assists", 30)
            .with_fact("Player A", "turnovers", 19)
            .with_fact("Player B", "goals", 39)
            .with_fact("Player B", "assists", 34)
            .with_fact("Player B", "turnovers", 21)
            .with_fact("Player C", "goals", 33)
            .with_fact("Player C", "assists", 28)
            .with_fact("Player C", "turnovers", 12)
    }

    /// Set one fact (builder pattern).
    pub fn with_fact(mut self, entity: &str, metric: &str, value: i64) -> Self {
        self.facts
            .entry(entity.to_string())
            .or_default()
            .insert(metric.to_string(), value);
        self
    }

    pub fn get(&self, entity: &str, metric: &str) -> Option<i64> {
        self.facts.get(entity)?.get(metric).copied()
    }

    /// Entity labels with at least one fact, in label order.
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.facts.keys().map(String::as_str)
    }

    /// Highest or lowest value of `metric` across every entity that has it.
    pub fn extremum(&self, metric: &str, which: Extremum) -> Option<i64> {
        let values = self.facts.values().filter_map(|m| m.get(metric).copied());
        match which {
            Extremum::Highest => values.max(),
            Extremum::Lowest => values.min(),
        }
    }

    /// Whether `entity`'s `metric` sits at the given extremum.
    ///
    /// Ties count: an entity sharing the extreme value holds the predicate.
    /// Unknown entities or metrics never hold.
    pub fn is_extremum(&self, entity: &str, metric: &str, which: Extremum) -> bool {
        match (self.get(entity, metric), self.extremum(metric, which)) {
            (Some(value), Some(extreme)) => value == extreme,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_ground_truth_notes() {
        let truth = GroundTruth::reference();
        assert!(truth.is_extremum("Player A", "goals", Extremum::Highest));
        assert!(truth.is_extremum("Player C", "turnovers", Extremum::Lowest));
        assert!(!truth.is_extremum("Player B", "goals", Extremum::Highest));
        assert_eq!(truth.get("Player B", "assists"), Some(34));
    }

    #[test]
    fn test_unknown_entity_or_metric_never_holds() {
        let truth = GroundTruth::reference();
        assert!(!truth.is_extremum("Player Z", "goals", Extremum::Highest));
        assert!(!truth.is_extremum("Player A", "saves", Extremum::Lowest));
    }

    #[test]
    fn test_with_fact_overrides_value() {
        let truth = GroundTruth::reference().with_fact("Player A", "goals", 10);
        assert_eq!(truth.get("Player A", "goals"), Some(10));
        assert_eq!(truth.extremum("goals", Extremum::Highest), Some(39));
    }

    #[test]
    fn test_ground_truth_toml_shape() {
        let raw = r#"
            ["Player A"]
            goals = 45

            ["Player B"]
            goals = 50
        "#;
        let truth: GroundTruth = toml::from_str(raw).expect("parse ground truth");
        assert!(truth.is_extremum("Player B", "goals", Extremum::Highest));
        assert_eq!(truth.entities().collect::<Vec<_>>(), vec!["Player A", "Player B"]);
    }

    #[test]
    fn test_entity_serializes_as_label() {
        let entity = Entity::new("Player A");
        let json = serde_json::to_string(&entity).expect("serialize");
        assert_eq!(json, "\"Player A\"");
        assert_eq!(entity.to_string(), "Player A");
    }
}
