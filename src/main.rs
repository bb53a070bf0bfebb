//! CLI entry point for the bus recorder.
//!
//! Provides subcommands for recording live vehicle positions, downloading
//! the bus stop timetable, and analyzing a finished recording.

use anyhow::Result;
use bus_recorder::analyzers::analyzer::analyze;
use bus_recorder::{
    config::Config,
    departures::DeparturesDownloader,
    fetch::{BasicClient, auth::UrlParam},
    output::{print_json, write_json, write_records, write_stats},
    recorder::Recorder,
};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "bus_recorder")]
#[command(about = "Record and analyze live bus positions from the open-data API", long_about = None)]
struct Cli {
    /// Project configuration file
    #[arg(short, long, global = true, default_value = "project_config.json")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll vehicle positions for the configured duration and save them
    Record,
    /// Download all bus stops and today's departures
    DownloadDepartures,
    /// Compute speeds and speeding hotspots of a saved recording
    Analyze {
        /// Smallest number of speeding samples reported as a hotspot
        #[arg(short, long, default_value_t = 5)]
        min_hotspot_size: usize,

        /// Optional: JSON file to write the report to
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/bus_recorder.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bus_recorder.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Record => record(&config).await?,
        Commands::DownloadDepartures => {
            let downloader = DeparturesDownloader::new(api_client(&config), &config)?;
            let summary = downloader.run().await?;
            info!(
                departures = summary.departures,
                files = summary.files,
                folder = %config.departures_folder,
                "Departures downloaded"
            );
        }
        Commands::Analyze {
            min_hotspot_size,
            output,
        } => {
            let report = analyze(&config, min_hotspot_size)?;
            print_json(&report)?;
            if let Some(path) = output {
                write_json(&path, &report)?;
                info!(path = %path, "Analysis report saved");
            }
        }
    }

    Ok(())
}

fn api_client(config: &Config) -> UrlParam<BasicClient> {
    UrlParam::api_key(BasicClient::new(), config.api_key.clone())
}

/// Records vehicle positions, then saves the records and the statistics.
#[tracing::instrument(skip(config), fields(output = %config.bus_data_file))]
async fn record(config: &Config) -> Result<()> {
    let time_parser = config.time_parser()?;
    let recorder = Recorder::new(api_client(config), config)?;

    let recording = recorder.record().await?;

    write_records(&config.bus_data_file, &recording.records, &time_parser)?;
    recording.stats.log(&time_parser);
    write_stats(&config.bus_recording_stats_file, &recording.stats, &time_parser)?;

    info!(records = recording.records.len(), "Recording saved");
    Ok(())
}
