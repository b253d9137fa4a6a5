//! NeuroTwin Application
//!
//! Command-line entry point for the NeuroTwin EEG analysis pipeline.
//! Results are written as JSON to stdout or to `--output`.
//!
//! # Usage
//!
//! ```bash
//! # Analyze a recording with classifier votes
//! neurotwin analyze --input recording.json --votes 1,0.3,0.2,0.7,0.4,0.6
//!
//! # Analyze with trained classifiers and save the report
//! neurotwin analyze --input recording.json --classifiers models.json --output report.json
//!
//! # Simulate an intervention on a saved twin or report
//! neurotwin simulate --twin report.json --intervention medication --condition epilepsy
//!
//! # Trend over historical results
//! neurotwin trend --history history.json
//!
//! # List known interventions
//! neurotwin interventions
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use neurotwin_core::types::Condition;
use neurotwin_native::config::AnalysisConfig;
use neurotwin_native::io::load_recording;
use neurotwin_native::ml::classifier::ClassifierSet;
use neurotwin_native::pipeline::{AnalysisReport, Pipeline};
use neurotwin_native::twin::builder::DigitalTwin;
use neurotwin_native::twin::intervention::Intervention;
use neurotwin_native::twin::longitudinal::{analyze_trend, HistoryEntry};

/// NeuroTwin Application
#[derive(Parser, Debug)]
#[command(name = "neurotwin")]
#[command(author, version, about = "EEG risk scoring and digital-twin simulation", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// JSON configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Preprocess, extract features, score and build a digital twin
    Analyze {
        /// Recording JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Classifier vote vector: record_id,lpd,gpd,lrda,grda,other
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        votes: Option<Vec<f64>>,

        /// Trained classifier set (JSON), used when no votes are given
        #[arg(long)]
        classifiers: Option<PathBuf>,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply an intervention to a digital twin
    Simulate {
        /// Digital twin or analysis report JSON file
        #[arg(short, long)]
        twin: PathBuf,

        /// Intervention type, e.g. medication
        #[arg(short, long)]
        intervention: String,

        /// Target condition: epilepsy, cognitive_stress or depression
        #[arg(long)]
        condition: Condition,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fit per-condition trends over historical results
    Trend {
        /// JSON list of { timestamp, probabilities }
        #[arg(long)]
        history: PathBuf,
    },

    /// List the configured intervention table
    Interventions,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("NeuroTwin v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze { input, votes, classifiers, output } => {
            run_analyze(config, &input, votes.as_deref(), classifiers.as_deref(), output.as_deref())
        }
        Commands::Simulate { twin, intervention, condition, output } => {
            let pipeline = Pipeline::new(config);
            let twin = load_twin(&twin)?;
            let result = pipeline.simulate(&twin, &Intervention::new(intervention, condition))?;
            write_json(&result, output.as_deref())
        }
        Commands::Trend { history } => {
            let text = read(&history)?;
            let entries: Vec<HistoryEntry> =
                serde_json::from_str(&text).with_context(|| format!("parsing {}", history.display()))?;
            write_json(&analyze_trend(&entries), None)
        }
        Commands::Interventions => {
            for (condition, kind, effect) in config.interventions.iter() {
                println!(
                    "{:<18} {:<18} x{:.2}  {:?}",
                    condition.name(),
                    kind,
                    effect.effect_multiplier,
                    effect.biomarkers
                );
            }
            Ok(())
        }
    }
}

/// Run the full analysis on one recording file
fn run_analyze(
    config: AnalysisConfig,
    input: &Path,
    votes: Option<&[f64]>,
    classifiers: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let mut pipeline = Pipeline::new(config);
    if let Some(path) = classifiers {
        let set = ClassifierSet::from_json(&read(path)?)
            .with_context(|| format!("parsing classifiers {}", path.display()))?;
        info!("Loaded {} classifier(s) from {}", set.len(), path.display());
        pipeline = pipeline.with_classifiers(set);
    }

    let recording = load_recording(input)?;
    let report = pipeline.analyze(&recording, votes)?;

    if !report.score.is_validated() {
        warn!(
            "Probabilities are not validated (placeholder for {:?})",
            report.score.placeholder_conditions
        );
    }

    write_json(&report, output)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AnalysisConfig> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let config = AnalysisConfig::from_json(&read(path)?)
        .with_context(|| format!("parsing config {}", path.display()))?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Accept either a bare twin or a full analysis report.
fn load_twin(path: &Path) -> anyhow::Result<DigitalTwin> {
    let text = read(path)?;
    if let Ok(report) = serde_json::from_str::<AnalysisReport>(&text) {
        return Ok(report.twin);
    }
    serde_json::from_str(&text).with_context(|| format!("parsing twin {}", path.display()))
}

fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
