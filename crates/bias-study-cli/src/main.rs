//! Bias Study CLI
//!
//! The `bias-study` command drives the narrative bias study end to end.
//!
//! ## Commands
//!
//! - `design`: Write the prompt catalog to disk
//! - `run`: Query every model for every condition and log the responses
//! - `analyze`: Focus/sentiment summary and paired chi-square tests
//! - `validate`: Fabrication / contradiction rate against the ground truth

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, Level};

use bias_study_core::reporting::{write_fabrication_report, FABRICATION_FILE};
use bias_study_core::{
    analyze, check_fabrication, latest_log, render_fabrication_report, run_experiment,
    write_reports, ExperimentSettings, JsonlRecordLog, ModelRegistry, PromptCatalog,
    ReportSelection, StudyConfig, METRICS,
};

#[derive(Parser)]
#[command(name = "bias-study")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "LLM narrative bias study: prompts, runs, and analysis", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Study config (TOML); built-in reference design when omitted
    #[arg(short, long, global = true, env = "BIAS_STUDY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write one `<hypothesis>_prompts.json` per hypothesis
    Design {
        /// Output directory
        #[arg(short, long, default_value = "prompts")]
        out: PathBuf,
    },

    /// Query every (hypothesis, condition, model, sample) and log the responses
    Run {
        /// Load prompts from this directory instead of the built-in catalog
        #[arg(long)]
        prompts_dir: Option<PathBuf>,

        /// Directory receiving `responses_<timestamp>.jsonl`
        #[arg(long, env = "BIAS_STUDY_RESULTS_DIR", default_value = "results")]
        results_dir: PathBuf,

        /// Samples per (condition, model); overrides the config
        #[arg(short, long)]
        samples: Option<u32>,

        /// Pause between model calls, in milliseconds
        #[arg(long, default_value = "100")]
        delay_ms: u64,
    },

    /// Summarize entity focus and sentiment, and run paired chi-square tests
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Load prompts from this directory instead of the built-in catalog
        #[arg(long)]
        prompts_dir: Option<PathBuf>,

        /// Output directory for bias_summary.csv, chi_square_results.txt, analysis.json
        #[arg(short, long, env = "BIAS_STUDY_ANALYSIS_DIR", default_value = "analysis")]
        out: PathBuf,
    },

    /// Flag responses that contradict the ground-truth facts
    Validate {
        #[command(flatten)]
        input: InputArgs,

        /// Output directory for fabrication_rate.txt
        #[arg(short, long, env = "BIAS_STUDY_ANALYSIS_DIR", default_value = "analysis")]
        out: PathBuf,
    },
}

/// Where `analyze` and `validate` read from.
#[derive(clap::Args)]
struct InputArgs {
    /// Directory searched for the latest `responses_*.jsonl`
    #[arg(long, env = "BIAS_STUDY_RESULTS_DIR", default_value = "results")]
    results_dir: PathBuf,

    /// Analyze this record log instead of the latest one
    #[arg(long)]
    log: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    bias_study_core::init_tracing(cli.json, level);

    let config = load_config(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Design { out } => cmd_design(&out),
        Commands::Run {
            prompts_dir,
            results_dir,
            samples,
            delay_ms,
        } => {
            cmd_run(
                &config,
                prompts_dir.as_deref(),
                &results_dir,
                samples,
                Duration::from_millis(delay_ms),
            )
            .await
        }
        Commands::Analyze {
            input,
            prompts_dir,
            out,
        } => cmd_analyze(&config, &input, prompts_dir.as_deref(), &out).map(|_| ()),
        Commands::Validate { input, out } => cmd_validate(&config, &input, &out).map(|_| ()),
    };

    METRICS.flush();
    result
}

fn load_config(path: Option<&Path>) -> Result<StudyConfig> {
    match path {
        Some(path) => StudyConfig::load(path)
            .with_context(|| format!("Failed to load study config: {:?}", path)),
        None => Ok(StudyConfig::default()),
    }
}

fn load_catalog(prompts_dir: Option<&Path>) -> Result<PromptCatalog> {
    match prompts_dir {
        Some(dir) => PromptCatalog::load_from_dir(dir)
            .with_context(|| format!("Failed to load prompt catalog from {:?}", dir)),
        None => Ok(PromptCatalog::reference()),
    }
}

/// The explicit `--log`, or the newest log in the results directory.
fn resolve_log(input: &InputArgs) -> Result<PathBuf> {
    match &input.log {
        Some(log) => Ok(log.clone()),
        None => latest_log(&input.results_dir).with_context(|| {
            format!(
                "No record log found in {:?}; run `bias-study run` first",
                input.results_dir
            )
        }),
    }
}

fn cmd_design(out: &Path) -> Result<()> {
    let catalog = PromptCatalog::reference();
    let written = catalog
        .write_to_dir(out)
        .with_context(|| format!("Failed to write prompt catalog to {:?}", out))?;

    for path in &written {
        println!("Wrote {}", path.display());
    }
    println!(
        "{} hypotheses, {} conditions",
        catalog.hypotheses.len(),
        catalog
            .hypotheses
            .iter()
            .map(|h| h.conditions.len())
            .sum::<usize>()
    );
    Ok(())
}

async fn cmd_run(
    config: &StudyConfig,
    prompts_dir: Option<&Path>,
    results_dir: &Path,
    samples: Option<u32>,
    request_delay: Duration,
) -> Result<()> {
    let catalog = load_catalog(prompts_dir)?;
    let registry = ModelRegistry::placeholders(&config.models);
    let settings = ExperimentSettings {
        models: config.models.clone(),
        samples_per_prompt: samples.unwrap_or(config.samples_per_prompt),
        temperature: config.temperature,
        request_delay,
    };

    info!("Logging responses under {:?}", results_dir);
    let summary = run_experiment(&catalog, &registry, &settings, results_dir)
        .await
        .context("Experiment run failed")?;

    println!(
        "Saved {} responses to {}",
        summary.records_written,
        summary.log_path.display()
    );
    Ok(())
}

fn cmd_analyze(
    config: &StudyConfig,
    input: &InputArgs,
    prompts_dir: Option<&Path>,
    out: &Path,
) -> Result<Vec<PathBuf>> {
    let catalog = load_catalog(prompts_dir)?;
    let log = resolve_log(input)?;
    info!("Analyzing {:?}", log);

    let source = JsonlRecordLog::new(&log, config.malformed_records);
    let outcome = analyze(&source, &catalog, config)
        .with_context(|| format!("Analysis of {:?} failed", log))?;
    let written = write_reports(
        out,
        &outcome,
        &config.entities,
        &config.models,
        ReportSelection::bias(),
    )?;

    if outcome.malformed > 0 {
        println!("Skipped {} malformed record lines", outcome.malformed);
    }
    for path in &written {
        println!("Wrote {}", path.display());
    }
    Ok(written)
}

/// Contradiction pass only; the prompt catalog is not consulted.
fn cmd_validate(config: &StudyConfig, input: &InputArgs, out: &Path) -> Result<Vec<PathBuf>> {
    let log = resolve_log(input)?;
    info!("Validating {:?}", log);

    let source = JsonlRecordLog::new(&log, config.malformed_records);
    let outcome = check_fabrication(&source, config)
        .with_context(|| format!("Validation of {:?} failed", log))?;

    let path = out.join(FABRICATION_FILE);
    write_fabrication_report(&path, &outcome.tally)?;

    if outcome.malformed > 0 {
        println!("Skipped {} malformed record lines", outcome.malformed);
    }
    print!("{}", render_fabrication_report(&outcome.tally));
    for (rule, hits) in &outcome.rule_hits {
        println!("  {}: {}", rule, hits);
    }
    Ok(vec![path])
}
