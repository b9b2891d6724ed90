//! Moments CLI - Command-line interface for Synheart Moments
//!
//! Commands:
//! - catalog: List the available moments
//! - simulate: Run the engine deterministically for a number of seconds
//! - run: Drive a live engine from stdin commands (interactive mode)
//! - config: Print the default engine configuration

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufReadExt, BufReader};

use synheart_moments::types::{HostContext, SessionEvent};
use synheart_moments::view::ViewSnapshot;
use synheart_moments::{
    spawn_engine, Command, EngineConfig, MomentCatalog, MomentError, MomentsEngine,
    MOMENTS_VERSION,
};

/// Moments - guided micro-moments driven by simulated live metrics
#[derive(Parser)]
#[command(name = "moments")]
#[command(author = "Synheart AI Inc")]
#[command(version = MOMENTS_VERSION)]
#[command(about = "Simulated wellness metrics with guided micro-moments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available moments
    Catalog {
        /// Load a custom catalog (JSON array of moments)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the engine deterministically for a number of simulated seconds
    Simulate {
        /// Simulated seconds to run
        #[arg(long, default_value = "300")]
        seconds: u64,

        /// RNG seed for metric jitter
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Engine config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Custom catalog file (JSON)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Start this moment at second zero
        #[arg(long)]
        start: Option<String>,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Drive a live engine; reads commands from stdin
    Run {
        /// Engine config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Custom catalog file (JSON)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// RNG seed for metric jitter (entropy when omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// User id echoed into snapshots
        #[arg(long)]
        user_id: Option<String>,
    },

    /// Print the default engine configuration
    Config,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one frame per line)
    Ndjson,
    /// JSON array of frames
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

/// One line of simulation output
#[derive(Serialize)]
struct Frame {
    second: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<SessionEvent>,
    snapshot: ViewSnapshot,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), MomentsCliError> {
    match cli.command {
        Commands::Catalog { catalog, json } => cmd_catalog(catalog.as_deref(), json),

        Commands::Simulate {
            seconds,
            seed,
            config,
            catalog,
            start,
            output_format,
        } => cmd_simulate(
            seconds,
            seed,
            config.as_deref(),
            catalog.as_deref(),
            start.as_deref(),
            output_format,
        ),

        Commands::Run {
            config,
            catalog,
            seed,
            user_id,
        } => cmd_run(config.as_deref(), catalog.as_deref(), seed, user_id),

        Commands::Config => {
            println!("{}", EngineConfig::default().to_json_pretty()?);
            Ok(())
        }
    }
}

fn cmd_catalog(catalog: Option<&Path>, json: bool) -> Result<(), MomentsCliError> {
    let catalog = load_catalog(catalog)?;

    if json {
        println!("{}", serde_json::to_string_pretty(catalog.moments())?);
        return Ok(());
    }

    println!("Moments Catalog");
    println!("===============");
    for moment in catalog.moments() {
        let scheduled = moment
            .scheduled_time
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".to_string());
        println!(
            "  [{}] {:<16} {:<12} {:>4}s  {}",
            scheduled,
            moment.id,
            moment.category.as_str(),
            moment.duration_secs,
            moment.title
        );
        println!("         {}", moment.trigger_description);
    }
    Ok(())
}

fn cmd_simulate(
    seconds: u64,
    seed: u64,
    config: Option<&Path>,
    catalog: Option<&Path>,
    start: Option<&str>,
    output_format: OutputFormat,
) -> Result<(), MomentsCliError> {
    let mut engine = build_engine(config, catalog)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let metric_every = engine.config().metric_tick_secs;

    let mut frames = Vec::new();

    if let Some(id) = start {
        let event = engine.start_now(id)?;
        frames.push(Frame {
            second: 0,
            event: Some(event),
            snapshot: engine.snapshot(),
        });
    }

    for second in 1..=seconds {
        if let Some(event) = engine.tick_second() {
            frames.push(Frame {
                second,
                event: Some(event),
                snapshot: engine.snapshot(),
            });
        }

        if second % metric_every == 0 {
            let event = engine.tick_metrics(&mut rng);
            frames.push(Frame {
                second,
                event,
                snapshot: engine.snapshot(),
            });
        }
    }

    print!("{}", format_output(&frames, &output_format)?);
    Ok(())
}

fn cmd_run(
    config: Option<&Path>,
    catalog: Option<&Path>,
    seed: Option<u64>,
    user_id: Option<String>,
) -> Result<(), MomentsCliError> {
    let mut engine = build_engine(config, catalog)?;
    engine.set_context(HostContext {
        user_id,
        health_data: None,
    });

    if atty::is(atty::Stream::Stdin) {
        eprintln!("Moments {} - interactive mode", MOMENTS_VERSION);
        eprintln!("Commands: start <id> | accept | pause | resume | complete | skip | status | quit");
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let (handle, mut events) = spawn_engine(engine, seed);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                Some(event) = events.recv() => {
                    println!("{}", serde_json::to_string(&event)?);
                }
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    let command = match parse_input(line.trim()) {
                        Input::Command(command) => command,
                        Input::Empty => continue,
                        Input::Quit => break,
                        Input::Status => {
                            println!("{}", serde_json::to_string(&handle.snapshot())?);
                            continue;
                        }
                        Input::Unknown(text) => {
                            eprintln!("unknown command: {text}");
                            continue;
                        }
                    };
                    if let Err(e) = handle.send(command).await {
                        eprintln!("{e}");
                    }
                }
            }
        }

        let engine = handle.shutdown().await?;
        println!("{}", engine.history_json()?);
        Ok::<(), MomentsCliError>(())
    })
}

/// One line of interactive input
enum Input {
    Command(Command),
    Status,
    Quit,
    Empty,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Input::Empty;
    };

    let command = match verb {
        "start" => match parts.next() {
            Some(id) => Command::StartNow(id.to_string()),
            None => return Input::Unknown(line.to_string()),
        },
        "accept" => Command::Accept,
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "complete" | "done" => Command::Complete,
        "skip" | "dismiss" => Command::Skip,
        "status" => return Input::Status,
        "quit" | "exit" => return Input::Quit,
        _ => return Input::Unknown(line.to_string()),
    };
    Input::Command(command)
}

// Helper functions

fn load_catalog(path: Option<&Path>) -> Result<MomentCatalog, MomentsCliError> {
    match path {
        Some(path) => Ok(MomentCatalog::from_json(&fs::read_to_string(path)?)?),
        None => Ok(MomentCatalog::builtin()),
    }
}

fn build_engine(
    config: Option<&Path>,
    catalog: Option<&Path>,
) -> Result<MomentsEngine, MomentsCliError> {
    let config = match config {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    let catalog = load_catalog(catalog)?;
    Ok(MomentsEngine::with_config(config, catalog)?)
}

fn format_output(frames: &[Frame], format: &OutputFormat) -> Result<String, MomentsCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for frame in frames {
                lines.push(serde_json::to_string(frame)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(frames)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(frames)?),
    }
}

// Error types

#[derive(Debug)]
enum MomentsCliError {
    Io(io::Error),
    Engine(MomentError),
    Json(serde_json::Error),
}

impl From<io::Error> for MomentsCliError {
    fn from(e: io::Error) -> Self {
        MomentsCliError::Io(e)
    }
}

impl From<MomentError> for MomentsCliError {
    fn from(e: MomentError) -> Self {
        MomentsCliError::Engine(e)
    }
}

impl From<serde_json::Error> for MomentsCliError {
    fn from(e: serde_json::Error) -> Self {
        MomentsCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<MomentsCliError> for CliError {
    fn from(e: MomentsCliError) -> Self {
        match e {
            MomentsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            MomentsCliError::Engine(e) => {
                let hint = match &e {
                    MomentError::UnknownMoment(_) => {
                        Some("Run `moments catalog` to list moment ids".to_string())
                    }
                    MomentError::InvalidConfig(_) => {
                        Some("Run `moments config` for a valid starting point".to_string())
                    }
                    MomentError::InvalidMoment(_) | MomentError::JsonError(_) => {
                        Some("Check the catalog/config JSON".to_string())
                    }
                    _ => None,
                };
                CliError {
                    code: "ENGINE_ERROR".to_string(),
                    message: e.to_string(),
                    hint,
                }
            }
            MomentsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
        }
    }
}
