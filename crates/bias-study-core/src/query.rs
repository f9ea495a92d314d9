//! Model query boundary and the experiment runner built on it.
//!
//! Models are opaque identifiers mapped to [`ModelClient`]s in a
//! [`ModelRegistry`]. The runner walks catalog × model × sample and appends
//! one [`ResponseRecord`] per call to a [`RecordLogWriter`]. Requests are
//! issued one at a time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{PromptCatalog, ResponseRecord, Result, StudyError};
use crate::metrics::METRICS;
use crate::obs;
use crate::record_store::RecordLogWriter;

/// A text generator that turns a prompt into a response.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn query(&self, prompt: &str) -> Result<String>;

    /// Provider-reported version string, if known.
    fn version(&self) -> Option<String> {
        None
    }
}

/// Stand-in client that returns a fixed marker instead of calling a provider.
///
/// Responses from it never name an entity or cue word, so analysis of a
/// placeholder run reports "insufficient data" everywhere.
#[derive(Debug, Clone)]
pub struct PlaceholderClient {
    display_name: String,
}

impl PlaceholderClient {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
        }
    }
}

#[async_trait]
impl ModelClient for PlaceholderClient {
    async fn query(&self, _prompt: &str) -> Result<String> {
        Ok(format!(
            "[{} RESPONSE PLACEHOLDER - INSERT REAL OUTPUT HERE]",
            self.display_name
        ))
    }
}

/// Model identifier → client.
#[derive(Default)]
pub struct ModelRegistry {
    clients: BTreeMap<String, Box<dyn ModelClient>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One [`PlaceholderClient`] per model identifier.
    pub fn placeholders(models: &[String]) -> Self {
        models.iter().fold(Self::new(), |registry, model| {
            registry.with_client(model, PlaceholderClient::new(model.as_str()))
        })
    }

    /// Register (or replace) the client for `model`.
    pub fn with_client(mut self, model: &str, client: impl ModelClient + 'static) -> Self {
        self.clients.insert(model.to_string(), Box::new(client));
        self
    }

    pub fn contains(&self, model: &str) -> bool {
        self.clients.contains_key(model)
    }

    fn client(&self, model: &str) -> Result<&dyn ModelClient> {
        self.clients
            .get(model)
            .map(|c| c.as_ref())
            .ok_or_else(|| StudyError::UnknownModel(model.to_string()))
    }

    /// Send `prompt` to `model`. Unknown models are a configuration error.
    pub async fn query(&self, model: &str, prompt: &str) -> Result<String> {
        let client = self.client(model)?;
        METRICS.inc_model_queries();
        client.query(prompt).await
    }

    pub fn version(&self, model: &str) -> Result<Option<String>> {
        Ok(self.client(model)?.version())
    }
}

/// Knobs for one experiment run.
#[derive(Debug, Clone)]
pub struct ExperimentSettings {
    pub models: Vec<String>,
    pub samples_per_prompt: u32,
    pub temperature: f32,
    /// Pause between consecutive model calls.
    pub request_delay: Duration,
}

/// Outcome of [`run_experiment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentSummary {
    pub log_path: PathBuf,
    pub records_written: usize,
}

/// Reject a run that could not produce a complete log.
fn preflight(
    catalog: &PromptCatalog,
    registry: &ModelRegistry,
    settings: &ExperimentSettings,
) -> Result<()> {
    catalog.validate()?;
    if settings.models.is_empty() {
        return Err(StudyError::InvalidConfig("models must not be empty".into()));
    }
    if settings.samples_per_prompt == 0 {
        return Err(StudyError::InvalidConfig(
            "samples_per_prompt must be at least 1".into(),
        ));
    }
    for model in &settings.models {
        if !registry.contains(model) {
            return Err(StudyError::UnknownModel(model.clone()));
        }
    }
    Ok(())
}

/// Query every (hypothesis, condition, model, sample) and log the responses
/// to a new `responses_<now>.jsonl` in `results_dir`.
///
/// The catalog, model set, and sample count are checked before the log file
/// is created. A run that fails part-way removes its log, so the newest log
/// in `results_dir` is always a complete one.
pub async fn run_experiment(
    catalog: &PromptCatalog,
    registry: &ModelRegistry,
    settings: &ExperimentSettings,
    results_dir: &Path,
) -> Result<ExperimentSummary> {
    preflight(catalog, registry, settings)?;

    let mut writer = RecordLogWriter::create(results_dir, Utc::now())?;
    let log_path = writer.path().to_path_buf();
    match collect_responses(catalog, registry, settings, &mut writer).await {
        Ok(()) => {
            let records_written = writer.written();
            let log_path = writer.finish()?;
            Ok(ExperimentSummary {
                log_path,
                records_written,
            })
        }
        Err(err) => {
            drop(writer);
            if let Err(e) = std::fs::remove_file(&log_path) {
                tracing::warn!(path = %log_path.display(), error = %e, "failed to remove partial log");
            }
            Err(err)
        }
    }
}

async fn collect_responses(
    catalog: &PromptCatalog,
    registry: &ModelRegistry,
    settings: &ExperimentSettings,
    writer: &mut RecordLogWriter,
) -> Result<()> {
    let mut first_call = true;
    for hypothesis in &catalog.hypotheses {
        for condition in &hypothesis.conditions {
            for model in &settings.models {
                let model_version = registry
                    .version(model)?
                    .unwrap_or_else(|| "unknown".to_string());

                for sample_id in 0..settings.samples_per_prompt {
                    if !first_call && !settings.request_delay.is_zero() {
                        tokio::time::sleep(settings.request_delay).await;
                    }
                    first_call = false;

                    let response = registry.query(model, &condition.prompt).await?;
                    let record = ResponseRecord {
                        timestamp: Utc::now(),
                        hypothesis_id: hypothesis.hypothesis_id.clone(),
                        condition_id: condition.condition_id.clone(),
                        model: model.clone(),
                        model_version: model_version.clone(),
                        temperature: settings.temperature,
                        sample_id,
                        prompt: condition.prompt.clone(),
                        response,
                    };
                    writer.append(&record)?;
                    obs::emit_record_written(&record.group_key(), sample_id);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_store::latest_log;

    struct FailingClient;

    #[async_trait]
    impl ModelClient for FailingClient {
        async fn query(&self, _prompt: &str) -> Result<String> {
            Err(StudyError::QueryFailed {
                model: "broken".to_string(),
                reason: "rate limited".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_placeholder_response() {
        let registry = ModelRegistry::placeholders(&["gpt4".to_string()]);
        let response = registry.query("gpt4", "prompt").await.expect("query");
        assert_eq!(response, "[gpt4 RESPONSE PLACEHOLDER - INSERT REAL OUTPUT HERE]");
    }

    #[tokio::test]
    async fn test_unknown_model_is_error() {
        let registry = ModelRegistry::placeholders(&["gpt4".to_string()]);
        let err = registry.query("llama", "prompt").await.unwrap_err();
        assert!(matches!(err, StudyError::UnknownModel(ref m) if m == "llama"));
    }

    #[tokio::test]
    async fn test_client_error_propagates() {
        let registry = ModelRegistry::new().with_client("broken", FailingClient);
        let err = registry.query("broken", "prompt").await.unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    fn settings(models: &[&str], samples_per_prompt: u32) -> ExperimentSettings {
        ExperimentSettings {
            models: models.iter().map(|m| m.to_string()).collect(),
            samples_per_prompt,
            temperature: 0.2,
            request_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_rejected_run_keeps_previous_latest_log() {
        let dir = tempfile::tempdir().expect("tempdir");
        let catalog = PromptCatalog::reference();
        let registry = ModelRegistry::placeholders(&["gpt4".to_string()]);

        let good = run_experiment(&catalog, &registry, &settings(&["gpt4"], 1), dir.path())
            .await
            .expect("good run");
        assert_eq!(good.records_written, 8);

        let err = run_experiment(
            &catalog,
            &registry,
            &settings(&["gpt4", "llama"], 1),
            dir.path(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StudyError::UnknownModel(ref m) if m == "llama"));

        let err = run_experiment(&catalog, &registry, &settings(&["gpt4"], 0), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, StudyError::InvalidConfig(_)));

        assert_eq!(std::fs::read_dir(dir.path()).expect("read dir").count(), 1);
        assert_eq!(latest_log(dir.path()).expect("latest"), good.log_path);
    }

    #[tokio::test]
    async fn test_failed_query_removes_partial_log() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = ModelRegistry::new().with_client("broken", FailingClient);

        let err = run_experiment(
            &PromptCatalog::reference(),
            &registry,
            &settings(&["broken"], 1),
            dir.path(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StudyError::QueryFailed { .. }));
        assert!(matches!(
            latest_log(dir.path()),
            Err(StudyError::NoRecordLog { .. })
        ));
    }

    #[test]
    fn test_default_version_unknown() {
        let registry = ModelRegistry::placeholders(&["claude".to_string()]);
        assert_eq!(registry.version("claude").expect("registered"), None);
    }
}
