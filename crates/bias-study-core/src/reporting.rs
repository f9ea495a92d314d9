//! Report rendering and persistence.
//!
//! Output artifacts of an analysis run:
//! - `bias_summary.csv`: focus counts and mean sentiment per group and entity
//! - `chi_square_results.txt`: paired-condition chi-square per hypothesis/model
//! - `fabrication_rate.txt`: contradiction flag rate
//! - `analysis.json`: machine-readable manifest of the whole run
//!
//! Every file is written whole: content goes to a temp file in the target
//! directory and is renamed over the destination, so a rerun simply replaces
//! previous outputs.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::aggregate::GroupedAggregates;
use crate::analysis::AnalysisOutcome;
use crate::chi_square::{PairOutcome, PairedTest};
use crate::contradiction::FabricationTally;
use crate::domain::Entity;

pub const SUMMARY_FILE: &str = "bias_summary.csv";
pub const CHI_SQUARE_FILE: &str = "chi_square_results.txt";
pub const FABRICATION_FILE: &str = "fabrication_rate.txt";
pub const MANIFEST_FILE: &str = "analysis.json";

const MANIFEST_SCHEMA_VERSION: &str = "1.0";

// ── text renderers ────────────────────────────────────────────────────────

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// One row per (group, entity): groups in key order, entities in declared order.
pub fn render_summary_csv(aggregates: &GroupedAggregates, entities: &[Entity]) -> String {
    let mut out =
        String::from("hypothesis_id,condition_id,model,entity,focus_count,avg_sentiment\n");
    for (key, aggregate) in aggregates.iter() {
        let mean = aggregate.mean_sentiment();
        for entity in entities {
            out.push_str(&format!(
                "{},{},{},{},{},{:.3}\n",
                csv_field(&key.hypothesis_id),
                csv_field(&key.condition_id),
                csv_field(&key.model),
                csv_field(entity.label()),
                aggregate.focus_count(entity),
                mean
            ));
        }
    }
    out
}

/// One block per hypothesis, one line per model, in test order.
pub fn render_chi_square_report(tests: &[PairedTest]) -> String {
    let mut out = String::from(
        "Chi-square tests on player-focus distributions between paired conditions\n\n",
    );
    let mut current: Option<&str> = None;

    for test in tests {
        if current != Some(test.hypothesis_id.as_str()) {
            if current.is_some() {
                out.push('\n');
            }
            out.push_str(&format!("Hypothesis {}:\n", test.hypothesis_id));
            current = Some(test.hypothesis_id.as_str());
        }
        match &test.outcome {
            PairOutcome::InsufficientData => out.push_str(&format!(
                "  Model {}: insufficient data for chi-square.\n",
                test.model
            )),
            PairOutcome::Computed(chi) => out.push_str(&format!(
                "  Model {}: chi-square = {:.3} (df={}, higher values suggest stronger distribution differences).\n",
                test.model, chi.statistic, chi.degrees_of_freedom
            )),
        }
    }
    if current.is_some() {
        out.push('\n');
    }
    out
}

pub fn render_fabrication_report(tally: &FabricationTally) -> String {
    format!(
        "Fabrication / contradiction rate (heuristic): {}/{} = {:.3}\n",
        tally.flagged,
        tally.total,
        tally.rate()
    )
}

// ── analysis.json schema ──────────────────────────────────────────────────

/// Fabrication section of the manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FabricationArtifact {
    pub flagged: usize,
    pub total: usize,
    pub rate: f64,
    /// Records matched per rule name. A record matching two rules counts in both.
    pub by_rule: BTreeMap<String, usize>,
}

/// Machine-readable record of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisArtifact {
    pub schema_version: String,
    pub analysis_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub source: String,
    /// SHA-256 hex of the record log, when read from a file.
    pub source_digest: Option<String>,
    pub records: usize,
    pub malformed_records: usize,
    pub groups: usize,
    pub entities: Vec<Entity>,
    pub models: Vec<String>,
    pub chi_square: Vec<PairedTest>,
    pub fabrication: FabricationArtifact,
}

impl AnalysisArtifact {
    pub fn from_outcome(outcome: &AnalysisOutcome, entities: &[Entity], models: &[String]) -> Self {
        Self {
            schema_version: MANIFEST_SCHEMA_VERSION.to_string(),
            analysis_id: outcome.analysis_id,
            generated_at: Utc::now(),
            source: outcome.source.clone(),
            source_digest: outcome.source_digest.clone(),
            records: outcome.records,
            malformed_records: outcome.malformed,
            groups: outcome.aggregates.len(),
            entities: entities.to_vec(),
            models: models.to_vec(),
            chi_square: outcome.tests.clone(),
            fabrication: FabricationArtifact {
                flagged: outcome.fabrication.flagged,
                total: outcome.fabrication.total,
                rate: outcome.fabrication.rate(),
                by_rule: outcome.rule_hits.clone(),
            },
        }
    }
}

// ── persistence ───────────────────────────────────────────────────────────

/// Replace `path` with `content` via a temp file in the same directory.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).with_context(|| format!("create {:?}", dir))?;

    let mut tmp = NamedTempFile::new_in(dir).with_context(|| format!("temp file in {:?}", dir))?;
    tmp.write_all(content)
        .with_context(|| format!("write temp file for {:?}", path))?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("write {:?}", path))?;
    Ok(())
}

pub fn write_summary_csv(
    path: &Path,
    aggregates: &GroupedAggregates,
    entities: &[Entity],
) -> Result<()> {
    write_atomic(path, render_summary_csv(aggregates, entities).as_bytes())
}

pub fn write_chi_square_report(path: &Path, tests: &[PairedTest]) -> Result<()> {
    write_atomic(path, render_chi_square_report(tests).as_bytes())
}

pub fn write_fabrication_report(path: &Path, tally: &FabricationTally) -> Result<()> {
    write_atomic(path, render_fabrication_report(tally).as_bytes())
}

/// Write analysis.json in pretty JSON format.
pub fn write_analysis_json(path: &Path, artifact: &AnalysisArtifact) -> Result<()> {
    let content = serde_json::to_vec_pretty(artifact).context("serialize analysis artifact")?;
    write_atomic(path, &content)
}

/// Which artifacts a command produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSelection {
    pub summary: bool,
    pub chi_square: bool,
    pub fabrication: bool,
    pub manifest: bool,
}

impl ReportSelection {
    pub fn all() -> Self {
        Self {
            summary: true,
            chi_square: true,
            fabrication: true,
            manifest: true,
        }
    }

    /// Summary CSV, chi-square text, and the manifest.
    pub fn bias() -> Self {
        Self {
            fabrication: false,
            ..Self::all()
        }
    }
}

/// Write the selected artifacts into `dir`; returns the written paths.
pub fn write_reports(
    dir: &Path,
    outcome: &AnalysisOutcome,
    entities: &[Entity],
    models: &[String],
    selection: ReportSelection,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    if selection.summary {
        let path = dir.join(SUMMARY_FILE);
        write_summary_csv(&path, &outcome.aggregates, entities)?;
        written.push(path);
    }
    if selection.chi_square {
        let path = dir.join(CHI_SQUARE_FILE);
        write_chi_square_report(&path, &outcome.tests)?;
        written.push(path);
    }
    if selection.fabrication {
        let path = dir.join(FABRICATION_FILE);
        write_fabrication_report(&path, &outcome.fabrication)?;
        written.push(path);
    }
    if selection.manifest {
        let path = dir.join(MANIFEST_FILE);
        let artifact = AnalysisArtifact::from_outcome(outcome, entities, models);
        write_analysis_json(&path, &artifact)?;
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Observation;
    use crate::chi_square::ChiSquare;
    use crate::domain::GroupKey;
    use tempfile::tempdir;

    fn players() -> Vec<Entity> {
        vec![
            Entity::new("Player A"),
            Entity::new("Player B"),
            Entity::new("Player C"),
        ]
    }

    fn test(h: &str, model: &str, outcome: PairOutcome) -> PairedTest {
        PairedTest {
            hypothesis_id: h.to_string(),
            model: model.to_string(),
            first_condition: format!("{h}_a"),
            second_condition: format!("{h}_b"),
            outcome,
        }
    }

    #[test]
    fn summary_csv_render_is_stable() {
        let aggregates: GroupedAggregates = vec![
            Observation {
                key: GroupKey::new("H1", "H1_a", "gpt4"),
                primary: Some(Entity::new("Player A")),
                sentiment: 2,
            },
            Observation {
                key: GroupKey::new("H1", "H1_a", "gpt4"),
                primary: None,
                sentiment: -1,
            },
            Observation {
                key: GroupKey::new("H1", "H1_a", "gpt4"),
                primary: Some(Entity::new("Player A")),
                sentiment: 0,
            },
        ]
        .into_iter()
        .collect();

        let actual = render_summary_csv(&aggregates, &players());
        let expected = "hypothesis_id,condition_id,model,entity,focus_count,avg_sentiment\n\
H1,H1_a,gpt4,Player A,2,0.333\n\
H1,H1_a,gpt4,Player B,0,0.333\n\
H1,H1_a,gpt4,Player C,0,0.333\n";
        assert_eq!(actual, expected);
    }

    #[test]
    fn summary_csv_labels_configured_entities() {
        let teams = vec![Entity::new("Falcons"), Entity::new("Hornets")];
        let aggregates: GroupedAggregates = vec![Observation {
            key: GroupKey::new("T1", "T1_home", "claude"),
            primary: Some(Entity::new("Hornets")),
            sentiment: 1,
        }]
        .into_iter()
        .collect();

        let actual = render_summary_csv(&aggregates, &teams);
        let expected = "hypothesis_id,condition_id,model,entity,focus_count,avg_sentiment\n\
T1,T1_home,claude,Falcons,0,1.000\n\
T1,T1_home,claude,Hornets,1,1.000\n";
        assert_eq!(actual, expected);
        assert!(!actual.contains("player"));
    }

    #[test]
    fn summary_csv_quotes_commas() {
        assert_eq!(csv_field("Smith, J."), "\"Smith, J.\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("plain"), "plain");
    }

    #[test]
    fn chi_square_render_is_stable() {
        let tests = vec![
            test(
                "H1",
                "gpt4",
                PairOutcome::Computed(ChiSquare {
                    statistic: 20.0,
                    degrees_of_freedom: 2,
                }),
            ),
            test("H1", "claude", PairOutcome::InsufficientData),
            test(
                "H2",
                "gpt4",
                PairOutcome::Computed(ChiSquare {
                    statistic: 0.0,
                    degrees_of_freedom: 2,
                }),
            ),
        ];
        let actual = render_chi_square_report(&tests);
        let expected = "Chi-square tests on player-focus distributions between paired conditions\n\n\
Hypothesis H1:\n\
\x20 Model gpt4: chi-square = 20.000 (df=2, higher values suggest stronger distribution differences).\n\
\x20 Model claude: insufficient data for chi-square.\n\
\n\
Hypothesis H2:\n\
\x20 Model gpt4: chi-square = 0.000 (df=2, higher values suggest stronger distribution differences).\n\
\n";
        assert_eq!(actual, expected);
    }

    #[test]
    fn fabrication_render() {
        let tally = FabricationTally {
            flagged: 1,
            total: 3,
        };
        assert_eq!(
            render_fabrication_report(&tally),
            "Fabrication / contradiction rate (heuristic): 1/3 = 0.333\n"
        );
        assert_eq!(
            render_fabrication_report(&FabricationTally::default()),
            "Fabrication / contradiction rate (heuristic): 0/0 = 0.000\n"
        );
    }

    #[test]
    fn write_atomic_replaces_content() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("out.txt");
        write_atomic(&path, b"first").expect("first write");
        write_atomic(&path, b"second").expect("second write");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "second");

        let leftovers = std::fs::read_dir(dir.path().join("nested"))
            .expect("read dir")
            .count();
        assert_eq!(leftovers, 1);
    }
}
