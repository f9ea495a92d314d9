//! Analysis pipeline: one pass over a record batch.
//!
//! Records are read from an explicit [`RecordSource`], classified and folded
//! into [`GroupedAggregates`], compared pairwise with chi-square tests, and
//! independently scanned for fact contradictions.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::aggregate::GroupedAggregates;
use crate::chi_square::{paired_tests, PairedTest};
use crate::config::StudyConfig;
use crate::contradiction::{ContradictionChecker, FabricationTally};
use crate::domain::{PromptCatalog, ResponseRecord, Result};
use crate::metrics::METRICS;
use crate::obs::{self, AnalysisSpan};
use crate::record_store::RecordSource;

/// Everything computed by [`analyze`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub analysis_id: Uuid,
    pub source: String,
    pub source_digest: Option<String>,
    pub records: usize,
    pub malformed: usize,
    pub aggregates: GroupedAggregates,
    pub tests: Vec<PairedTest>,
    pub fabrication: FabricationTally,
    /// Records matched per contradiction rule name.
    pub rule_hits: BTreeMap<String, usize>,
}

/// Contradiction pass over every record, independent of grouping.
pub fn fabrication_pass(
    records: &[ResponseRecord],
    checker: &ContradictionChecker,
) -> (FabricationTally, BTreeMap<String, usize>) {
    let mut tally = FabricationTally::default();
    let mut rule_hits: BTreeMap<String, usize> = checker
        .rules()
        .iter()
        .map(|rule| (rule.name.clone(), 0))
        .collect();

    for record in records {
        let matched = checker.matched_rules(&record.response);
        for rule in &matched {
            *rule_hits.entry((*rule).to_string()).or_insert(0) += 1;
            obs::emit_rule_matched(rule, &record.group_key(), record.sample_id);
        }
        tally.record(!matched.is_empty());
    }

    (tally, rule_hits)
}

/// Result of [`check_fabrication`].
#[derive(Debug, Clone, PartialEq)]
pub struct FabricationOutcome {
    pub source: String,
    pub records: usize,
    pub malformed: usize,
    pub tally: FabricationTally,
    /// Records matched per contradiction rule name.
    pub rule_hits: BTreeMap<String, usize>,
}

/// Load `source` and run only the contradiction pass.
///
/// Needs no prompt catalog: records are checked one by one regardless of
/// which hypothesis or condition produced them.
pub fn check_fabrication(
    source: &dyn RecordSource,
    config: &StudyConfig,
) -> Result<FabricationOutcome> {
    let description = source.describe();
    let _span = AnalysisSpan::enter(&Uuid::new_v4().to_string(), &description);
    obs::emit_analysis_started(&description);

    let batch = source.load()?;
    METRICS.add_records_read(batch.records.len() as u64);
    METRICS.add_malformed_skipped(batch.malformed as u64);
    obs::emit_records_loaded(batch.records.len(), batch.malformed);

    let (tally, rule_hits) = fabrication_pass(&batch.records, &config.checker());
    METRICS.add_records_flagged(tally.flagged as u64);
    obs::emit_fabrication_computed(tally.flagged, tally.total, tally.rate());

    Ok(FabricationOutcome {
        source: description,
        records: batch.records.len(),
        malformed: batch.malformed,
        tally,
        rule_hits,
    })
}

/// Load `source` and run the full pipeline.
///
/// Fails only when the source cannot be read (missing file, malformed line
/// under [`MalformedPolicy::Fail`]) or the catalog is invalid; empty groups
/// are reported as insufficient data.
///
/// [`MalformedPolicy::Fail`]: crate::record_store::MalformedPolicy::Fail
pub fn analyze(
    source: &dyn RecordSource,
    catalog: &PromptCatalog,
    config: &StudyConfig,
) -> Result<AnalysisOutcome> {
    let pairs = catalog.condition_pairs()?;
    let analysis_id = Uuid::new_v4();
    let description = source.describe();
    let _span = AnalysisSpan::enter(&analysis_id.to_string(), &description);
    obs::emit_analysis_started(&description);

    let batch = source.load()?;
    METRICS.add_records_read(batch.records.len() as u64);
    METRICS.add_malformed_skipped(batch.malformed as u64);
    obs::emit_records_loaded(batch.records.len(), batch.malformed);

    let aggregates =
        GroupedAggregates::from_records(&batch.records, &config.entities, &config.sentiment);
    for (key, aggregate) in aggregates.iter() {
        obs::emit_group_aggregated(
            key,
            aggregate.records,
            aggregate.total_focus(),
            aggregate.mean_sentiment(),
        );
    }

    let tests = paired_tests(&pairs, &config.models, &config.entities, &aggregates);
    for test in &tests {
        obs::emit_chi_square_computed(test);
    }

    let (fabrication, rule_hits) = fabrication_pass(&batch.records, &config.checker());
    METRICS.add_records_flagged(fabrication.flagged as u64);
    obs::emit_fabrication_computed(fabrication.flagged, fabrication.total, fabrication.rate());

    Ok(AnalysisOutcome {
        analysis_id,
        source: description,
        source_digest: batch.content_digest,
        records: batch.records.len(),
        malformed: batch.malformed,
        aggregates,
        tests,
        fabrication,
        rule_hits,
    })
}
