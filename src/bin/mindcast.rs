//! Mindcast CLI - Command-line interface for the mindcast scoring engine
//!
//! Commands:
//! - score: Score a recorded device event stream into a session report
//! - simulate: Generate a synthetic session as NDJSON device events
//! - validate: Validate device event schema
//! - config: Print the default game configuration
//! - doctor: Diagnose configuration and environment

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use mindcast::config::GameConfig;
use mindcast::pipeline::SessionProcessor;
use mindcast::schema::{EventAdapter, SCHEMA_VERSION};
use mindcast::simulator::{SimulationConfig, Simulator};
use mindcast::types::SessionReport;
use mindcast::{MINDCAST_VERSION, PRODUCER_NAME};

/// Mindcast - On-device scoring engine for EEG focus-puzzle sessions
#[derive(Parser)]
#[command(name = "mindcast")]
#[command(author = "Throwp Labs")]
#[command(version = MINDCAST_VERSION)]
#[command(about = "Score EEG headset sessions into brain metrics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a recorded event stream into a session report
    Score {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Game configuration file (JSON); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Player name stored on the record
        #[arg(long, default_value = "player")]
        user_name: String,

        /// Completion time in seconds (defaults to the span of event timestamps)
        #[arg(long)]
        completion_time: Option<u64>,

        /// Seed for the score capper
        #[arg(long)]
        seed: Option<u64>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Generate a synthetic session as NDJSON device events
    Simulate {
        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Session length in seconds
        #[arg(long, default_value = "90")]
        duration: u64,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Probability that a throw hits
        #[arg(long, default_value = "0.5")]
        hit_rate: f64,

        /// Session start (RFC 3339); defaults to now
        #[arg(long)]
        start: Option<String>,
    },

    /// Validate device event schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default game configuration
    Config,

    /// Diagnose configuration and environment
    Doctor {
        /// Check a game configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Single-line JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
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

fn run(cli: Cli) -> Result<(), MindcastCliError> {
    match cli.command {
        Commands::Score {
            input,
            output,
            config,
            user_name,
            completion_time,
            seed,
            output_format,
        } => cmd_score(
            &input,
            &output,
            config.as_deref(),
            &user_name,
            completion_time,
            seed,
            output_format,
        ),

        Commands::Simulate {
            output,
            duration,
            seed,
            hit_rate,
            start,
        } => cmd_simulate(&output, duration, seed, hit_rate, start.as_deref()),

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Config => cmd_config(),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn read_input(input: &Path) -> Result<String, MindcastCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(MindcastCliError::NoInput);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), MindcastCliError> {
    if output.to_string_lossy() == "-" {
        let mut stdout = io::stdout();
        stdout.write_all(data.as_bytes())?;
        stdout.flush()?;
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<GameConfig, MindcastCliError> {
    match path {
        Some(path) => Ok(GameConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(GameConfig::default()),
    }
}

fn cmd_score(
    input: &Path,
    output: &Path,
    config: Option<&Path>,
    user_name: &str,
    completion_time: Option<u64>,
    seed: Option<u64>,
    output_format: OutputFormat,
) -> Result<(), MindcastCliError> {
    let config = load_config(config)?;
    let input_data = read_input(input)?;

    let events = EventAdapter::parse_auto(&input_data)?;
    if events.is_empty() {
        return Err(MindcastCliError::NoEvents);
    }

    let mut processor = SessionProcessor::with_config(config)?;
    if let Some(seed) = seed {
        processor = processor.with_seed(seed);
    }

    let summary = processor.ingest_all(&events);
    log::info!(
        "scored {} events ({} samples stored, {} discarded, {} throws, {} bounced)",
        events.len(),
        summary.stored,
        summary.discarded,
        summary.throws,
        summary.bounced
    );

    let report = processor.report(user_name, completion_time);
    let mut output_data = format_report(&report, &output_format)?;
    output_data.push('\n');
    write_output(output, &output_data)
}

fn cmd_simulate(
    output: &Path,
    duration: u64,
    seed: u64,
    hit_rate: f64,
    start: Option<&str>,
) -> Result<(), MindcastCliError> {
    if !(0.0..=1.0).contains(&hit_rate) {
        return Err(MindcastCliError::InvalidArgument(format!(
            "hit_rate must be between 0 and 1, got {hit_rate}"
        )));
    }

    let start = match start {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map_err(|e| MindcastCliError::InvalidArgument(format!("invalid start time: {e}")))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let config = SimulationConfig {
        duration_secs: duration,
        hit_rate,
        ..SimulationConfig::default()
    };
    let events = Simulator::new(config, seed, start).generate();

    let mut lines = Vec::with_capacity(events.len());
    for event in &events {
        lines.push(serde_json::to_string(event)?);
    }
    let mut output_data = lines.join("\n");
    output_data.push('\n');

    log::info!("generated {} events over {}s", events.len(), duration);
    write_output(output, &output_data)
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), MindcastCliError> {
    let input_data = read_input(input)?;
    let events = EventAdapter::parse_auto(&input_data)?;

    let results = EventAdapter::validate_events(&events);

    let report = ValidationReport {
        total_events: events.len(),
        valid_events: events.len() - results.len(),
        invalid_events: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                kind: r.kind.to_string(),
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Schema:         {}", SCHEMA_VERSION);
        println!("Total events:   {}", report.total_events);
        println!("Valid events:   {}", report.valid_events);
        println!("Invalid events: {}", report.invalid_events);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - {} event (index {}): {}", err.kind, err.index, err.error);
            }
        }
    }

    if report.invalid_events > 0 {
        Err(MindcastCliError::ValidationFailed(report.invalid_events))
    } else {
        Ok(())
    }
}

fn cmd_config() -> Result<(), MindcastCliError> {
    println!("{}", GameConfig::default().to_json()?);
    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), MindcastCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "mindcast_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Mindcast version {}", MINDCAST_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", SCHEMA_VERSION),
    });

    if let Some(config_path) = config {
        let check = match fs::read_to_string(config_path) {
            Ok(content) => match GameConfig::from_json(&content) {
                Ok(config) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Config valid ({} throws, {} hit buckets)",
                        config.max_throws,
                        config.hit_distribution.len()
                    ),
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                },
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read config file: {}", e),
            },
        };
        checks.push(check);
    }

    let distribution_total: f64 = GameConfig::default().hit_distribution.values().sum();
    checks.push(DoctorCheck {
        name: "hit_distribution".to_string(),
        status: if (distribution_total - 100.0).abs() < 1e-6 {
            CheckStatus::Ok
        } else {
            CheckStatus::Warning
        },
        message: format!("Default hit distribution sums to {:.1}%", distribution_total),
    });

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: MINDCAST_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Mindcast Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(MindcastCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn format_report(report: &SessionReport, format: &OutputFormat) -> Result<String, MindcastCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(report)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(report)?),
    }
}

// Error types

#[derive(Debug)]
enum MindcastCliError {
    Io(io::Error),
    Compute(mindcast::ComputeError),
    Json(serde_json::Error),
    NoInput,
    NoEvents,
    ValidationFailed(usize),
    DoctorFailed,
    InvalidArgument(String),
}

impl From<io::Error> for MindcastCliError {
    fn from(e: io::Error) -> Self {
        MindcastCliError::Io(e)
    }
}

impl From<mindcast::ComputeError> for MindcastCliError {
    fn from(e: mindcast::ComputeError) -> Self {
        MindcastCliError::Compute(e)
    }
}

impl From<serde_json::Error> for MindcastCliError {
    fn from(e: serde_json::Error) -> Self {
        MindcastCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<MindcastCliError> for CliError {
    fn from(e: MindcastCliError) -> Self {
        match e {
            MindcastCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            MindcastCliError::Compute(mindcast::ComputeError::InvalidConfig(msg)) => CliError {
                code: "INVALID_CONFIG".to_string(),
                message: msg,
                hint: Some("Run 'mindcast config' to see a valid configuration".to_string()),
            },
            MindcastCliError::Compute(e @ mindcast::ComputeError::Storage(_)) => CliError {
                code: "STORAGE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the record store is writable and retry".to_string()),
            },
            MindcastCliError::Compute(e @ mindcast::ComputeError::EncodingError(_)) => CliError {
                code: "ENCODING_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Session state could not be serialized".to_string()),
            },
            MindcastCliError::Compute(e @ mindcast::ComputeError::JsonError(_)) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            MindcastCliError::Compute(mindcast::ComputeError::NoEvents) => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            MindcastCliError::Compute(e @ mindcast::ComputeError::ParseError(_)) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches {} schema", SCHEMA_VERSION)),
            },
            MindcastCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            MindcastCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "stdin is a terminal; nothing to read".to_string(),
                hint: Some("Pipe events in or pass --input <file>".to_string()),
            },
            MindcastCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            MindcastCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} events failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            MindcastCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            MindcastCliError::InvalidArgument(msg) => CliError {
                code: "INVALID_ARGUMENT".to_string(),
                message: msg,
                hint: Some("Run with --help for usage".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_events: usize,
    valid_events: usize,
    invalid_events: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    kind: String,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
