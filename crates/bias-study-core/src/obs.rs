//! Structured observability hooks for study lifecycle events.
//!
//! This module provides:
//! - Analysis-scoped tracing spans via the `AnalysisSpan` RAII guard
//! - Emission functions for key events: records loaded, group aggregated,
//!   chi-square computed, fabrication rate computed, record written
//!
//! Events are emitted at `info!`/`debug!` level; filter with `RUST_LOG`.

use tracing::{debug, info};

use crate::chi_square::{PairOutcome, PairedTest};
use crate::domain::GroupKey;

/// RAII guard that enters an analysis-scoped span for the duration of a run.
///
/// ```ignore
/// let _span = AnalysisSpan::enter("3f2c…", "results/responses_….jsonl");
/// // all tracing calls now carry analysis_id and source
/// ```
pub struct AnalysisSpan {
    _span: tracing::span::EnteredSpan,
}

impl AnalysisSpan {
    pub fn enter(analysis_id: &str, source: &str) -> Self {
        let span = tracing::info_span!("bias_study.analysis", analysis_id = %analysis_id, source = %source);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_analysis_started(source: &str) {
    info!(event = "analysis.started", source = %source);
}

pub fn emit_records_loaded(records: usize, malformed: usize) {
    info!(event = "records.loaded", records = records, malformed = malformed);
}

/// Per-group summary at `debug!` level (one event per group).
pub fn emit_group_aggregated(key: &GroupKey, records: u64, total_focus: u64, mean_sentiment: f64) {
    debug!(
        event = "group.aggregated",
        group = %key,
        records = records,
        total_focus = total_focus,
        mean_sentiment = mean_sentiment,
    );
}

pub fn emit_chi_square_computed(test: &PairedTest) {
    match &test.outcome {
        PairOutcome::Computed(chi) => info!(
            event = "chi_square.computed",
            hypothesis = %test.hypothesis_id,
            model = %test.model,
            statistic = chi.statistic,
            df = chi.degrees_of_freedom,
        ),
        PairOutcome::InsufficientData => info!(
            event = "chi_square.insufficient_data",
            hypothesis = %test.hypothesis_id,
            model = %test.model,
        ),
    }
}

pub fn emit_fabrication_computed(flagged: usize, total: usize, rate: f64) {
    info!(event = "fabrication.computed", flagged = flagged, total = total, rate = rate);
}

pub fn emit_rule_matched(rule: &str, key: &GroupKey, sample_id: u32) {
    debug!(event = "contradiction.rule_matched", rule = %rule, group = %key, sample_id = sample_id);
}

pub fn emit_record_written(key: &GroupKey, sample_id: u32) {
    debug!(event = "experiment.record_written", group = %key, sample_id = sample_id);
}
