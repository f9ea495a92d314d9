//! Study configuration.
//!
//! [`StudyConfig::default`] is the reference design (three players, three
//! models, six-and-six sentiment cues, two contradiction rules). A TOML file
//! may override any subset of fields; unnamed fields keep their defaults.
//!
//! ```toml
//! models = ["gpt4", "claude"]
//! samples_per_prompt = 5
//! malformed_records = "skip"
//!
//! [sentiment]
//! positive = ["potential", "growth"]
//! negative = ["weakness"]
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::contradiction::{ContradictionChecker, ContradictionRule};
use crate::domain::{Entity, GroundTruth, Result, StudyError};
use crate::record_store::MalformedPolicy;
use crate::sentiment::SentimentLexicon;

/// Everything the runner and the analysis pipeline treat as fixed input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Subjects of analysis, in declared order (tie-break and report column order).
    pub entities: Vec<Entity>,

    /// Model identifiers, in report order.
    pub models: Vec<String>,

    pub sentiment: SentimentLexicon,

    pub ground_truth: GroundTruth,

    pub contradiction_rules: Vec<ContradictionRule>,

    /// What to do with record log lines that fail to parse.
    pub malformed_records: MalformedPolicy,

    /// Samples collected per (condition, model).
    pub samples_per_prompt: u32,

    /// Sampling temperature recorded with every response.
    pub temperature: f32,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            entities: vec![
                Entity::new("Player A"),
                Entity::new("Player B"),
                Entity::new("Player C"),
            ],
            models: vec!["gpt4".to_string(), "claude".to_string(), "gemini".to_string()],
            sentiment: SentimentLexicon::reference(),
            ground_truth: GroundTruth::reference(),
            contradiction_rules: ContradictionRule::reference_set(),
            malformed_records: MalformedPolicy::default(),
            samples_per_prompt: 3,
            temperature: 0.2,
        }
    }
}

impl StudyConfig {
    /// Parse TOML text and validate the result.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: StudyConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;
        tracing::debug!(path = %path.display(), "loaded study config");
        Ok(config)
    }

    /// Reject configurations the pipeline cannot produce meaningful output for.
    pub fn validate(&self) -> Result<()> {
        if self.entities.is_empty() {
            return Err(StudyError::InvalidConfig("entities must not be empty".into()));
        }
        if self.models.is_empty() {
            return Err(StudyError::InvalidConfig("models must not be empty".into()));
        }

        let mut labels = HashSet::new();
        for entity in &self.entities {
            if entity.label().trim().is_empty() {
                return Err(StudyError::InvalidConfig("entity labels must not be blank".into()));
            }
            if !labels.insert(entity.label().to_lowercase()) {
                return Err(StudyError::InvalidConfig(format!(
                    "duplicate entity label '{}'",
                    entity.label()
                )));
            }
        }

        let mut models = HashSet::new();
        for model in &self.models {
            if !models.insert(model.as_str()) {
                return Err(StudyError::InvalidConfig(format!("duplicate model '{model}'")));
            }
        }

        let overlap = self.sentiment.overlapping_cues();
        if !overlap.is_empty() {
            return Err(StudyError::InvalidConfig(format!(
                "sentiment cues listed as both positive and negative: {}",
                overlap.join(", ")
            )));
        }

        if self.samples_per_prompt == 0 {
            return Err(StudyError::InvalidConfig(
                "samples_per_prompt must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Contradiction checker over this config's rules and ground truth.
    pub fn checker(&self) -> ContradictionChecker {
        ContradictionChecker::new(self.contradiction_rules.clone(), self.ground_truth.clone())
    }
}
