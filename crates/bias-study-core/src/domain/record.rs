//! Response records and the composite key they are grouped by.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

fn default_model_version() -> String {
    "unknown".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

/// Accept RFC 3339 timestamps and offset-less ISO 8601 ones (read as UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

/// One model-generated text sample, as written to the record log.
///
/// Records are immutable once written. Fields not listed here are ignored on
/// read so older or richer logs still parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseRecord {
    /// When the response was collected.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,

    /// Hypothesis under test (e.g. `H1`).
    pub hypothesis_id: String,

    /// Prompt variant within the hypothesis.
    pub condition_id: String,

    /// Model identifier from the configured model set.
    pub model: String,

    /// Provider-reported model version, when known.
    #[serde(default = "default_model_version")]
    pub model_version: String,

    /// Sampling temperature requested for the call.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Sample index within (condition, model).
    pub sample_id: u32,

    /// Full prompt text sent to the model.
    pub prompt: String,

    /// Free-text model response.
    pub response: String,
}

impl ResponseRecord {
    /// The (hypothesis, condition, model) key this record aggregates under.
    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(&self.hypothesis_id, &self.condition_id, &self.model)
    }
}

/// Composite aggregation key.
///
/// Ordered lexicographically by hypothesis, then condition, then model so
/// reports iterate groups deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub hypothesis_id: String,
    pub condition_id: String,
    pub model: String,
}

impl GroupKey {
    pub fn new(hypothesis_id: &str, condition_id: &str, model: &str) -> Self {
        Self {
            hypothesis_id: hypothesis_id.to_string(),
            condition_id: condition_id.to_string(),
            model: model.to_string(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.hypothesis_id, self.condition_id, self.model
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_parses_reference_log_line() {
        let line = r#"{"timestamp": "2025-11-02T14:03:11.512345", "hypothesis_id": "H1", "condition_id": "H1_negative_struggling", "model": "gpt4", "model_version": "unknown", "temperature": 0.2, "sample_id": 0, "prompt": "p", "response": "Player C is struggling"}"#;
        let record: ResponseRecord = serde_json::from_str(line).expect("parse record");
        assert_eq!(record.hypothesis_id, "H1");
        assert_eq!(record.model, "gpt4");
        assert_eq!(record.sample_id, 0);
        assert_eq!(
            record.group_key(),
            GroupKey::new("H1", "H1_negative_struggling", "gpt4")
        );
    }

    #[test]
    fn test_optional_fields_default() {
        let line = r#"{"timestamp": "2025-11-02T14:03:11Z", "hypothesis_id": "H2", "condition_id": "c", "model": "claude", "sample_id": 2, "prompt": "p", "response": "r", "extra": true}"#;
        let record: ResponseRecord = serde_json::from_str(line).expect("parse record");
        assert_eq!(record.model_version, "unknown");
        assert!((record.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_rejects_garbage_timestamp() {
        let line = r#"{"timestamp": "yesterday", "hypothesis_id": "H1", "condition_id": "c", "model": "gpt4", "sample_id": 0, "prompt": "p", "response": "r"}"#;
        assert!(serde_json::from_str::<ResponseRecord>(line).is_err());
    }

    #[test]
    fn test_group_key_ordering() {
        let a = GroupKey::new("H1", "b", "gpt4");
        let b = GroupKey::new("H1", "b", "claude");
        let c = GroupKey::new("H2", "a", "claude");
        let mut keys = vec![c.clone(), a.clone(), b.clone()];
        keys.sort();
        assert_eq!(keys, vec![b, a, c]);
    }

    #[test]
    fn test_group_key_display() {
        let key = GroupKey::new("H3", "H3_what_went_wrong", "gemini");
        assert_eq!(key.to_string(), "H3/H3_what_went_wrong/gemini");
    }
}
