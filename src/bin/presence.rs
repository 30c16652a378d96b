//! Presence CLI - Command-line interface for Presence Flux
//!
//! Commands:
//! - replay: Process recorded tracker frames into per-frame metrics
//! - synth: Generate a scripted synthetic session as frame records
//! - config: Print the default (or rescaled) engine configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use presence_flux::landmarks::LandmarkTopology;
use presence_flux::replay::{parse_record, FrameRecord, Replayer};
use presence_flux::synthetic::Scenario;
use presence_flux::{BehaviorEngine, EngineConfig, EngineError, PRESENCE_VERSION, PRODUCER_NAME};

/// Presence - On-device engine for real-time non-verbal presence signals
#[derive(Parser)]
#[command(name = "presence")]
#[command(version = PRESENCE_VERSION)]
#[command(about = "Turn facial landmark streams into speaking-coach metrics", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded frames (NDJSON) and emit one metrics record per frame
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Engine configuration JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Tracker frame rate; rescales windows and cooldowns from the config
        #[arg(long)]
        fps: Option<f64>,

        /// Write the session summary JSON to this file
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Flush output after each record
        #[arg(long, default_value = "false")]
        flush: bool,
    },

    /// Emit a scripted synthetic session as NDJSON frame records
    Synth {
        /// Scenario to render
        #[arg(long, value_enum, default_value = "mixed")]
        scenario: ScenarioArg,

        /// Number of frames
        #[arg(long, default_value = "300")]
        frames: usize,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Print the engine configuration as JSON
    Config {
        /// Rescale the defaults for this tracker frame rate
        #[arg(long)]
        fps: Option<f64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ScenarioArg {
    /// Centered and motionless
    Centered,
    /// Gaze held away from the camera
    LookingAway,
    /// Periodic blinks
    Blinking,
    /// Periodic nods
    Nodding,
    /// Alternating gaze with a slow head sway
    Mixed,
}

impl From<ScenarioArg> for Scenario {
    fn from(arg: ScenarioArg) -> Self {
        match arg {
            ScenarioArg::Centered => Scenario::Centered,
            ScenarioArg::LookingAway => Scenario::LookingAway,
            ScenarioArg::Blinking => Scenario::Blinking,
            ScenarioArg::Nodding => Scenario::Nodding,
            ScenarioArg::Mixed => Scenario::Mixed,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), PresenceCliError> {
    match command {
        Commands::Replay {
            input,
            output,
            config,
            fps,
            summary,
            flush,
        } => cmd_replay(&input, &output, config.as_deref(), fps, summary.as_deref(), flush),

        Commands::Synth {
            scenario,
            frames,
            output,
        } => cmd_synth(scenario.into(), frames, &output),

        Commands::Config { fps } => cmd_config(fps),
    }
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn load_config(path: Option<&Path>, fps: Option<f64>) -> Result<EngineConfig, PresenceCliError> {
    let config = match path {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    match fps {
        Some(fps) => Ok(config.rescaled_for_frame_rate(fps)?),
        None => Ok(config),
    }
}

fn open_input(input: &Path) -> Result<Box<dyn BufRead>, PresenceCliError> {
    if is_stdio(input) {
        if atty::is(atty::Stream::Stdin) {
            return Err(PresenceCliError::InteractiveStdin);
        }
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        Ok(Box::new(BufReader::new(fs::File::open(input)?)))
    }
}

fn open_output(output: &Path) -> Result<Box<dyn Write>, PresenceCliError> {
    if is_stdio(output) {
        Ok(Box::new(io::stdout().lock()))
    } else {
        Ok(Box::new(io::BufWriter::new(fs::File::create(output)?)))
    }
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    config: Option<&Path>,
    fps: Option<f64>,
    summary: Option<&Path>,
    flush: bool,
) -> Result<(), PresenceCliError> {
    let config = load_config(config, fps)?;
    let engine = BehaviorEngine::with_config(config)?;
    info!(session_id = %engine.session_id(), "Replay started");

    let reader = open_input(input)?;
    let mut writer = open_output(output)?;
    let mut replayer = Replayer::new(engine);
    let mut records = 0usize;

    // Stream line by line
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_record(&line)
            .map_err(|e| PresenceCliError::ParseError(format!("line {}: {}", i + 1, e)))?;
        records += 1;

        if let Some(metrics) = replayer.feed(&record) {
            writeln!(writer, "{}", metrics.to_json()?)?;
            if flush {
                writer.flush()?;
            }
        }
    }
    writer.flush()?;

    if records == 0 {
        return Err(PresenceCliError::NoFrames);
    }

    let skipped = replayer.skipped();
    let session = replayer.into_engine().finish();
    info!(records, skipped, "Replay finished");

    if let Some(path) = summary {
        fs::write(path, session.to_json()?)?;
    }
    Ok(())
}

fn cmd_synth(scenario: Scenario, frames: usize, output: &Path) -> Result<(), PresenceCliError> {
    let topology = LandmarkTopology::default();
    let mut writer = open_output(output)?;

    for i in 0..frames {
        let record = FrameRecord::with_landmarks(i as u64, scenario.face(i).render(&topology));
        writeln!(writer, "{}", serde_json::to_string(&record)?)?;
    }
    writer.flush()?;
    Ok(())
}

fn cmd_config(fps: Option<f64>) -> Result<(), PresenceCliError> {
    let config = load_config(None, fps)?;
    println!("{}", config.to_json()?);
    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
enum PresenceCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    ParseError(String),
    InteractiveStdin,
    NoFrames,
}

impl From<io::Error> for PresenceCliError {
    fn from(e: io::Error) -> Self {
        PresenceCliError::Io(e)
    }
}

impl From<EngineError> for PresenceCliError {
    fn from(e: EngineError) -> Self {
        PresenceCliError::Engine(e)
    }
}

impl From<serde_json::Error> for PresenceCliError {
    fn from(e: serde_json::Error) -> Self {
        PresenceCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
    producer: &'static str,
}

impl From<PresenceCliError> for CliError {
    fn from(e: PresenceCliError) -> Self {
        let (code, message, hint) = match e {
            PresenceCliError::Io(e) => ("IO_ERROR", e.to_string(), Some("Check file paths and permissions")),
            PresenceCliError::Engine(EngineError::InvalidConfig(msg)) => (
                "INVALID_CONFIG",
                msg,
                Some("Run 'presence config' to see a valid configuration"),
            ),
            PresenceCliError::Engine(e) => ("ENGINE_ERROR", e.to_string(), None),
            PresenceCliError::Json(e) => ("JSON_ERROR", e.to_string(), Some("Check JSON syntax")),
            PresenceCliError::ParseError(msg) => (
                "PARSE_ERROR",
                msg,
                Some("Each line must be a frame record: {\"seq\": 0, \"landmarks\": [[x, y, z], ...]}"),
            ),
            PresenceCliError::InteractiveStdin => (
                "INTERACTIVE_STDIN",
                "Refusing to read frames from a terminal".to_string(),
                Some("Pipe a recording in, e.g. 'presence synth | presence replay -i -'"),
            ),
            PresenceCliError::NoFrames => (
                "NO_FRAMES",
                "No frame records found in input".to_string(),
                Some("Ensure input file is not empty"),
            ),
        };
        CliError {
            code: code.to_string(),
            message,
            hint: hint.map(str::to_string),
            producer: PRODUCER_NAME,
        }
    }
}
