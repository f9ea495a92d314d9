//! Grouped aggregation of focus counts and sentiment.
//!
//! Each record is classified independently into an [`Observation`] (a pure
//! function of the record text), and observations are folded into per-group
//! [`Aggregate`]s. Folding is commutative and [`GroupedAggregates::merge`] is
//! associative, so record order never changes the result and partial
//! aggregates built over disjoint slices combine into the same totals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Entity, GroupKey, ResponseRecord};
use crate::focus::detect_primary;
use crate::sentiment::SentimentLexicon;

/// Per-record classification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub key: GroupKey,
    pub primary: Option<Entity>,
    pub sentiment: i32,
}

/// Classify one record's response text.
pub fn classify(
    record: &ResponseRecord,
    entities: &[Entity],
    lexicon: &SentimentLexicon,
) -> Observation {
    Observation {
        key: record.group_key(),
        primary: detect_primary(&record.response, entities).cloned(),
        sentiment: lexicon.score(&record.response),
    }
}

/// Accumulated statistics for one group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    /// Records whose primary entity was this entity. Entities never seen as
    /// primary are absent (read as zero).
    pub focus_counts: BTreeMap<Entity, u64>,
    /// Sum of sentiment scores over every record in the group.
    pub sentiment_total: i64,
    /// Number of records folded into the group.
    pub records: u64,
}

impl Aggregate {
    /// Fold one classified record into this aggregate.
    pub fn observe(&mut self, primary: Option<&Entity>, sentiment: i32) {
        if let Some(entity) = primary {
            *self.focus_counts.entry(entity.clone()).or_insert(0) += 1;
        }
        self.sentiment_total += i64::from(sentiment);
        self.records += 1;
    }

    pub fn focus_count(&self, entity: &Entity) -> u64 {
        self.focus_counts.get(entity).copied().unwrap_or(0)
    }

    /// Focus counts for `entities`, in the given order.
    pub fn focus_vector(&self, entities: &[Entity]) -> Vec<u64> {
        entities.iter().map(|e| self.focus_count(e)).collect()
    }

    /// Records that had any primary entity.
    pub fn total_focus(&self) -> u64 {
        self.focus_counts.values().sum()
    }

    /// Arithmetic mean sentiment, or 0.0 for an empty group.
    pub fn mean_sentiment(&self) -> f64 {
        if self.records == 0 {
            0.0
        } else {
            self.sentiment_total as f64 / self.records as f64
        }
    }

    /// Add another aggregate's counts and accumulation into this one.
    pub fn merge(&mut self, other: &Aggregate) {
        for (entity, count) in &other.focus_counts {
            *self.focus_counts.entry(entity.clone()).or_insert(0) += count;
        }
        self.sentiment_total += other.sentiment_total;
        self.records += other.records;
    }
}

/// Group key → aggregate, created lazily as records arrive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedAggregates {
    groups: BTreeMap<GroupKey, Aggregate>,
}

impl GroupedAggregates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify and fold every record.
    pub fn from_records<'r>(
        records: impl IntoIterator<Item = &'r ResponseRecord>,
        entities: &[Entity],
        lexicon: &SentimentLexicon,
    ) -> Self {
        records
            .into_iter()
            .map(|record| classify(record, entities, lexicon))
            .collect()
    }

    /// Fold one observation into its group.
    pub fn observe(&mut self, observation: Observation) {
        self.groups
            .entry(observation.key)
            .or_default()
            .observe(observation.primary.as_ref(), observation.sentiment);
    }

    /// Combine partial aggregates (e.g. built over separate record chunks).
    pub fn merge(mut self, other: GroupedAggregates) -> Self {
        for (key, aggregate) in other.groups {
            self.groups.entry(key).or_default().merge(&aggregate);
        }
        self
    }

    pub fn get(&self, key: &GroupKey) -> Option<&Aggregate> {
        self.groups.get(key)
    }

    /// Groups in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &Aggregate)> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl FromIterator<Observation> for GroupedAggregates {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        let mut grouped = Self::new();
        grouped.extend(iter);
        grouped
    }
}

impl Extend<Observation> for GroupedAggregates {
    fn extend<I: IntoIterator<Item = Observation>>(&mut self, iter: I) {
        for observation in iter {
            self.observe(observation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn players() -> Vec<Entity> {
        vec![
            Entity::new("Player A"),
            Entity::new("Player B"),
            Entity::new("Player C"),
        ]
    }

    fn record(condition: &str, model: &str, response: &str) -> ResponseRecord {
        ResponseRecord {
            timestamp: Utc::now(),
            hypothesis_id: "H1".to_string(),
            condition_id: condition.to_string(),
            model: model.to_string(),
            model_version: "unknown".to_string(),
            temperature: 0.2,
            sample_id: 0,
            prompt: "prompt".to_string(),
            response: response.to_string(),
        }
    }

    #[test]
    fn test_each_record_counts_once() {
        let entities = players();
        let records = vec![
            record("c1", "gpt4", "Player A is great, Player A leads"),
            record("c1", "gpt4", "Player B did fine"),
            record("c1", "gpt4", "no one stood out"),
        ];
        let grouped =
            GroupedAggregates::from_records(&records, &entities, &SentimentLexicon::reference());

        assert_eq!(grouped.len(), 1);
        let agg = grouped
            .get(&GroupKey::new("H1", "c1", "gpt4"))
            .expect("group exists");
        assert_eq!(agg.focus_vector(&entities), vec![1, 1, 0]);
        assert_eq!(agg.records, 3);
        assert_eq!(agg.total_focus(), 2);
    }

    #[test]
    fn test_groups_split_by_key() {
        let entities = players();
        let records = vec![
            record("c1", "gpt4", "Player A"),
            record("c2", "gpt4", "Player B"),
            record("c1", "claude", "Player C"),
        ];
        let grouped =
            GroupedAggregates::from_records(&records, &entities, &SentimentLexicon::reference());
        assert_eq!(grouped.len(), 3);
        let keys: Vec<String> = grouped.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["H1/c1/claude", "H1/c1/gpt4", "H1/c2/gpt4"]);
    }

    #[test]
    fn test_mean_sentiment() {
        let entities = players();
        let records = vec![
            record("c1", "gpt4", "growth and upside"),
            record("c1", "gpt4", "a weakness"),
            record("c1", "gpt4", "neutral"),
        ];
        let grouped =
            GroupedAggregates::from_records(&records, &entities, &SentimentLexicon::reference());
        let agg = grouped.get(&GroupKey::new("H1", "c1", "gpt4")).expect("group");
        assert_eq!(agg.sentiment_total, 1);
        assert!((agg.mean_sentiment() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_aggregate_mean_is_zero() {
        let agg = Aggregate::default();
        assert_eq!(agg.mean_sentiment(), 0.0);
        assert_eq!(agg.focus_vector(&players()), vec![0, 0, 0]);
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let entities = players();
        let lexicon = SentimentLexicon::reference();
        let records = vec![
            record("c1", "gpt4", "Player A has potential"),
            record("c2", "gpt4", "Player C is a liability"),
            record("c1", "gpt4", "Player B, a problem"),
            record("c1", "claude", "Player A shows growth"),
        ];
        let whole = GroupedAggregates::from_records(&records, &entities, &lexicon);
        let left = GroupedAggregates::from_records(&records[..2], &entities, &lexicon);
        let right = GroupedAggregates::from_records(&records[2..], &entities, &lexicon);
        assert_eq!(left.merge(right), whole);
    }

    #[test]
    fn test_classify_is_pure() {
        let entities = players();
        let lexicon = SentimentLexicon::reference();
        let r = record("c1", "gpt4", "Player C: high upside");
        let first = classify(&r, &entities, &lexicon);
        let second = classify(&r, &entities, &lexicon);
        assert_eq!(first, second);
        assert_eq!(first.primary, Some(Entity::new("Player C")));
        assert_eq!(first.sentiment, 1);
    }
}
