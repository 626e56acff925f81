//! Session Affect CLI
//!
//! Aligns recorded emotional signal streams and reports observations.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use session_affect::{
    transparency::create_shared_log, AnalysisConfig, Analyzer, SessionAnalysis, SessionInput,
    SessionSignature, SharedTransparencyLog, OBSERVATION_DECLARATION, VERSION,
};
use std::path::{Path, PathBuf};
use std::thread;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "session-affect")]
#[command(version = VERSION)]
#[command(about = "Multimodal emotion signal alignment and incongruence detection", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one session request
    Analyze {
        /// Session request file (JSON)
        #[arg(long, short)]
        input: PathBuf,

        /// Configuration file (defaults to the user config)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the analysis here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Emit compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Analyze every session request in a directory
    Batch {
        /// Directory of session request files (*.json)
        #[arg(long)]
        input_dir: PathBuf,

        /// Number of worker threads
        #[arg(long, default_value = "4")]
        workers: usize,

        /// Write one analysis file per session here
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Configuration file (defaults to the user config)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print processing statistics when done
        #[arg(long)]
        stats: bool,
    },

    /// Show configuration
    Config,

    /// Display the observation declaration
    Declaration,
}

/// A session plus the subject's prior signatures.
#[derive(Debug, Serialize, Deserialize)]
struct SessionRequest {
    #[serde(flatten)]
    session: SessionInput,
    #[serde(default)]
    prior_signatures: Vec<SessionSignature>,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze {
            input,
            config,
            output,
            compact,
        } => cmd_analyze(&input, config.as_deref(), output.as_deref(), compact),
        Commands::Batch {
            input_dir,
            workers,
            output_dir,
            config,
            stats,
        } => cmd_batch(
            &input_dir,
            workers,
            output_dir.as_deref(),
            config.as_deref(),
            stats,
        ),
        Commands::Config => cmd_config(),
        Commands::Declaration => {
            println!("{OBSERVATION_DECLARATION}");
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    let config = match path {
        Some(p) => AnalysisConfig::load_from(p)
            .with_context(|| format!("failed to load config from {}", p.display()))?,
        None => AnalysisConfig::load().context("failed to load config")?,
    };
    Ok(config)
}

fn read_request(path: &Path) -> Result<SessionRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut request: SessionRequest = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse session request {}", path.display()))?;

    if request.session.session_id.is_empty() {
        request.session.session_id = Uuid::new_v4().to_string();
        tracing::info!(
            file = %path.display(),
            session = %request.session.session_id,
            "assigned session id"
        );
    }
    Ok(request)
}

fn run_request(analyzer: &Analyzer, path: &Path) -> Result<SessionAnalysis> {
    let request = read_request(path)?;
    let analysis = analyzer
        .analyze(&request.session, &request.prior_signatures)
        .with_context(|| format!("analysis failed for {}", path.display()))?;
    Ok(analysis)
}

fn to_json(analysis: &SessionAnalysis, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(analysis)?
    } else {
        serde_json::to_string_pretty(analysis)?
    };
    Ok(json)
}

fn cmd_analyze(
    input: &Path,
    config: Option<&Path>,
    output: Option<&Path>,
    compact: bool,
) -> Result<()> {
    let analyzer = Analyzer::new(load_config(config)?)?;
    let analysis = run_request(&analyzer, input)?;
    let json = to_json(&analysis, compact)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Analysis written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_batch(
    input_dir: &Path,
    workers: usize,
    output_dir: Option<&Path>,
    config: Option<&Path>,
    show_stats: bool,
) -> Result<()> {
    if workers == 0 {
        bail!("--workers must be at least 1");
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(input_dir)
        .with_context(|| format!("failed to read {}", input_dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
        .collect();
    files.sort();

    if files.is_empty() {
        println!("No session requests found in {}", input_dir.display());
        return Ok(());
    }
    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let log: SharedTransparencyLog = create_shared_log();
    let analyzer = Analyzer::new(load_config(config)?)?.with_log(log.clone());

    let (job_tx, job_rx) = crossbeam_channel::unbounded::<PathBuf>();
    let (result_tx, result_rx) = crossbeam_channel::unbounded::<(PathBuf, Result<SessionAnalysis>)>();

    for file in &files {
        job_tx.send(file.clone())?;
    }
    drop(job_tx);

    tracing::info!(sessions = files.len(), workers, "starting batch");

    thread::scope(|scope| {
        for _ in 0..workers.min(files.len()) {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let analyzer = &analyzer;
            scope.spawn(move || {
                for path in job_rx.iter() {
                    let result = run_request(analyzer, &path);
                    if result_tx.send((path, result)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(result_tx);

    let mut results: Vec<(PathBuf, Result<SessionAnalysis>)> = result_rx.iter().collect();
    results.sort_by(|a, b| a.0.cmp(&b.0));

    let mut failed = 0usize;
    for (path, result) in results {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match result {
            Ok(analysis) => {
                println!(
                    "{name}: {:?}, {} points, {} markers, repetition: {}",
                    analysis.status,
                    analysis.timeline.len(),
                    analysis.incongruence_markers.len(),
                    analysis.pattern_match.has_repetition
                );
                if let Some(dir) = output_dir {
                    let out = dir.join(format!("{name}.analysis.json"));
                    std::fs::write(&out, to_json(&analysis, false)?)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("{name}: error: {e:#}");
            }
        }
    }

    println!();
    println!(
        "Analyzed {} session(s), {} failed",
        files.len() - failed,
        failed
    );
    if show_stats {
        println!();
        println!("{}", log.summary());
    }
    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = AnalysisConfig::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", AnalysisConfig::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
