//! Bias Study Core Library
//!
//! Prompt catalog, experiment runner, and the analysis pipeline for the LLM
//! narrative bias study: primary-entity detection, cue-word sentiment,
//! grouped aggregation, paired chi-square tests, and fact-contradiction
//! flagging.

pub mod aggregate;
pub mod analysis;
pub mod chi_square;
pub mod config;
pub mod contradiction;
pub mod domain;
pub mod focus;
pub mod metrics;
pub mod obs;
pub mod query;
pub mod record_store;
pub mod reporting;
pub mod sentiment;
pub mod telemetry;

pub use domain::{
    Condition, ConditionPair, Entity, Extremum, GroundTruth, GroupKey, Hypothesis,
    PromptCatalog, ResponseRecord, Result, StudyError,
};

pub use aggregate::{classify, Aggregate, GroupedAggregates, Observation};
pub use analysis::{
    analyze, check_fabrication, fabrication_pass, AnalysisOutcome, FabricationOutcome,
};
pub use chi_square::{paired_tests, ChiSquare, ContingencyTable, PairOutcome, PairedTest};
pub use config::StudyConfig;
pub use contradiction::{
    ContradictionChecker, ContradictionRule, CueClause, FabricationTally, FactPredicate,
};
pub use focus::{count_mentions, detect_primary, mention_counts};
pub use query::{
    run_experiment, ExperimentSettings, ExperimentSummary, ModelClient, ModelRegistry,
    PlaceholderClient,
};
pub use record_store::{
    latest_log, log_file_name, parse_jsonl, InMemoryRecords, JsonlRecordLog, MalformedPolicy,
    RecordBatch, RecordLogWriter, RecordSource,
};
pub use reporting::{
    render_chi_square_report, render_fabrication_report, render_summary_csv, write_reports,
    AnalysisArtifact, FabricationArtifact, ReportSelection,
};
pub use sentiment::SentimentLexicon;

pub use metrics::METRICS;
pub use obs::AnalysisSpan;
pub use telemetry::init_tracing;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
