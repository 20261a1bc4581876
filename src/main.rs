use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use orbitstream::config::Config;
use orbitstream::pipeline::{BatchReport, Driver};
use orbitstream::source::{FileSource, Simulator};
use orbitstream::web;

#[derive(Parser)]
#[command(name = "orbitstream")]
#[command(about = "Orbital position stream processing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process sample files from a directory
    Process {
        input: PathBuf,
        #[arg(long)]
        config: Option<String>,
        /// Folder for processed/ and statistics/ output
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        no_console: bool,
        /// Keep polling the input directory
        #[arg(long)]
        follow: bool,
        #[arg(long, default_value = "5s", value_parser = humantime::parse_duration)]
        poll: Duration,
        #[arg(long)]
        delete_consumed: bool,
        /// Discard the saved checkpoint before starting
        #[arg(long)]
        clean_checkpoint: bool,
    },
    /// Generate position samples from a TLE
    Simulate {
        #[arg(long)]
        tle: PathBuf,
        /// Directory to write a JSON-lines file into; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value = "5s", value_parser = humantime::parse_duration)]
        interval: Duration,
        #[arg(long, default_value = "10m", value_parser = humantime::parse_duration)]
        duration: Duration,
        /// RFC 3339 start time, defaults to now
        #[arg(long)]
        start: Option<String>,
        #[arg(long, default_value = "iss")]
        object_id: String,
    },
    /// Run the HTTP API with the configured simulator feed
    Serve {
        #[arg(long)]
        config: Option<String>,
        #[arg(long)]
        clean_checkpoint: bool,
    },
    /// Validate a config file
    CheckConfig { config: String },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            config,
            output,
            no_console,
            follow,
            poll,
            delete_consumed,
            clean_checkpoint,
        } => {
            let mut config = match load_config(config.as_deref()) {
                Ok(c) => c,
                Err(code) => return code,
            };
            if output.is_some() {
                config.output.folder = output;
            }
            if no_console {
                config.output.console = false;
            }
            process(
                &config,
                FileSource::new(input, delete_consumed),
                follow,
                poll,
                clean_checkpoint,
            )
        }
        Commands::Simulate {
            tle,
            output,
            interval,
            duration,
            start,
            object_id,
        } => simulate(tle, output, interval, duration, start, object_id),
        Commands::Serve {
            config,
            clean_checkpoint,
        } => serve(config.as_deref(), clean_checkpoint),
        Commands::CheckConfig { config } => check_config(&config),
    }
}

fn load_config(path: Option<&str>) -> Result<Config, ExitCode> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    match Config::from_file(path) {
        Ok(c) => Ok(c),
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            Err(ExitCode::FAILURE)
        }
    }
}

fn process(
    config: &Config,
    mut source: FileSource,
    follow: bool,
    poll: Duration,
    clean_checkpoint: bool,
) -> ExitCode {
    let mut driver = match Driver::from_config(config, clean_checkpoint) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error starting pipeline: {}", e);
            return ExitCode::FAILURE;
        }
    };

    loop {
        let batch = match source.poll() {
            Ok(b) => b,
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                return ExitCode::FAILURE;
            }
        };

        if batch.files > 0 {
            log::info!(
                "Read {} record(s) from {} file(s), {} unreadable",
                batch.samples.len(),
                batch.files,
                batch.malformed
            );
            log_report(&driver.run_json(batch.samples));
        }

        if !follow {
            break;
        }
        std::thread::sleep(poll);
    }

    log_report(&driver.flush());

    let stats = driver.pipeline().stats();
    println!(
        "Accepted {} record(s), rejected {}, dropped {} late; emitted {} window(s), {} failed",
        stats.records_accepted,
        stats.records_rejected,
        stats.records_late,
        stats.windows_emitted,
        stats.windows_failed
    );
    ExitCode::SUCCESS
}

fn log_report(report: &BatchReport) {
    let summary = report.summary();
    log::info!(
        "Batch: {} accepted, {} rejected, {} late, {} window(s) closed, {} failed",
        summary.accepted,
        summary.rejected.len(),
        summary.late_dropped,
        summary.windows_closed,
        summary.windows_failed
    );
}

fn simulate(
    tle: PathBuf,
    output: Option<PathBuf>,
    interval: Duration,
    duration: Duration,
    start: Option<String>,
    object_id: String,
) -> ExitCode {
    let start: DateTime<Utc> = match start {
        Some(s) => match DateTime::parse_from_rfc3339(&s) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => {
                eprintln!("Invalid start time: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Utc::now(),
    };
    let (Ok(step), Ok(span)) = (
        chrono::Duration::from_std(interval),
        chrono::Duration::from_std(duration),
    ) else {
        eprintln!("Interval or duration out of range");
        return ExitCode::FAILURE;
    };

    let samples = match Simulator::from_tle_file(&tle, object_id)
        .and_then(|sim| {
            let end = start.checked_add_signed(span).unwrap_or(DateTime::<Utc>::MAX_UTC);
            sim.samples(start, end, step)
        })
    {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Simulation failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut lines = String::new();
    for sample in &samples {
        match serde_json::to_string(sample) {
            Ok(line) => {
                lines.push_str(&line);
                lines.push('\n');
            }
            Err(e) => {
                eprintln!("Serialization failed: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let Some(dir) = output else {
        if let Err(e) = std::io::stdout().write_all(lines.as_bytes()) {
            eprintln!("Error writing output: {}", e);
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    };

    let path = dir.join(format!(
        "{}_{}.jsonl",
        start.format("%Y%m%dT%H%M%SZ"),
        uuid::Uuid::new_v4()
    ));
    let written = fs::create_dir_all(&dir).and_then(|_| fs::write(&path, lines));
    if let Err(e) = written {
        eprintln!("Error writing {}: {}", path.display(), e);
        return ExitCode::FAILURE;
    }

    println!("Wrote {} sample(s) to {}", samples.len(), path.display());
    ExitCode::SUCCESS
}

fn serve(config_path: Option<&str>, clean_checkpoint: bool) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(web::run_server(config, clean_checkpoint)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn check_config(path: &str) -> ExitCode {
    let config = match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Invalid config: {}", e);
        return ExitCode::FAILURE;
    }

    let pipeline = &config.pipeline;
    println!("Config is valid");
    println!(
        "  window: {}, allowed lateness: {}",
        humantime::format_duration(pipeline.window),
        humantime::format_duration(pipeline.allowed_lateness)
    );
    println!("  default object: {}", pipeline.default_object_id);
    match config.reference_point() {
        Ok(Some(r)) => println!(
            "  reference: {} ({:.4}, {:.4})",
            r.name.as_deref().unwrap_or("unnamed"),
            r.latitude_deg,
            r.longitude_deg
        ),
        Ok(None) => println!("  reference: disabled"),
        Err(e) => {
            eprintln!("Invalid config: {}", e);
            return ExitCode::FAILURE;
        }
    }
    println!("  API keys: {}", config.api_keys.len());
    ExitCode::SUCCESS
}
