//! Domain models for the bias study.
//!
//! Canonical definitions for the core entities:
//! - `ResponseRecord`: one logged model response
//! - `GroupKey`: (hypothesis, condition, model) aggregation key
//! - `Entity` / `GroundTruth`: subjects of analysis and their known facts
//! - `PromptCatalog`: hypotheses and their paired prompt conditions

pub mod catalog;
pub mod entity;
pub mod error;
pub mod record;

// Re-export main types and errors
pub use catalog::{Condition, ConditionPair, Hypothesis, PromptCatalog, BASE_DATA};
pub use entity::{Entity, Extremum, GroundTruth};
pub use error::{Result, StudyError};
pub use record::{GroupKey, ResponseRecord};
