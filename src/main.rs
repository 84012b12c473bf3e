//! CLI entry point for the transit board.
//!
//! Provides subcommands for the menu-bar text report, the flat ferry line,
//! composing the wall-display PNG, and inspecting a raw feed.

use anyhow::Result;
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transit_board::{
    config::{API_KEY_HEADER, BoardConfig, FeedConfig},
    display::{Fonts, RenderOptions, render_board},
    extract::{ArrivalEstimate, extract_arrivals},
    fetch::{BasicClient, auth::ApiKey, fetch_bytes},
    output,
    parser::parse_feed,
    weather::fetch_weather,
};

#[derive(Parser)]
#[command(name = "transit_board")]
#[command(about = "Real-time arrival board for a subway and ferry stop pair", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the text arrival report for every configured direction
    Status {
        /// Maximum arrivals to show per direction
        #[arg(short, long, default_value_t = 3)]
        limit: usize,
    },
    /// Print the next ferry departures as one comma-separated line
    Ferry {
        /// Maximum departures to include
        #[arg(short, long, default_value_t = 3)]
        limit: usize,
    },
    /// Compose the arrival board PNG for the wall display
    Render {
        /// Where to write the image
        #[arg(short, long, default_value = "schedule.png")]
        output: String,

        /// Rotate 90 degrees counter-clockwise for portrait panels
        #[arg(short, long, default_value_t = false)]
        rotate: bool,

        /// Produce 8-bit grayscale for e-ink panels
        #[arg(short, long, default_value_t = false)]
        grayscale: bool,

        /// Skip the weather strip
        #[arg(long, default_value_t = false)]
        no_weather: bool,
    },
    /// Fetch one feed and log a summary of its contents
    Inspect {
        /// Which feed to inspect: "subway" or "ferry"
        #[arg(value_name = "FEED", default_value = "subway")]
        feed: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/transit_board.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_board.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = BoardConfig::from_env();

    match cli.command {
        Commands::Status { limit } => {
            let (subway, ferry) = tokio::join!(
                board_arrivals(&config.subway, limit),
                board_arrivals(&config.ferry, limit),
            );
            if let Err(error) = &subway {
                warn!(feed = %config.subway.name, %error, "Feed unavailable");
            }
            if let Err(error) = &ferry {
                warn!(feed = %config.ferry.name, %error, "Feed unavailable");
            }

            print!("{}", output::status_report(&config, &subway, &ferry, Local::now()));
        }
        Commands::Ferry { limit } => {
            let outcome = board_arrivals(&config.ferry, limit).await;
            let failed = outcome.is_err();
            if let Err(error) = &outcome {
                warn!(feed = %config.ferry.name, %error, "Feed unavailable");
            }

            println!("{}", output::ferry_line(&outcome));

            // "0" plus a nonzero exit marks fetch failure; an empty line
            // with exit 0 means a clean run with nothing upcoming.
            if failed {
                // process::exit skips destructors; drop the guard first so
                // queued records reach the log file.
                drop(_file_guard);
                std::process::exit(1);
            }
        }
        Commands::Render {
            output,
            rotate,
            grayscale,
            no_weather,
        } => {
            // Two rows per direction fills the four-row board.
            let arrivals = match board_arrivals(&config.subway, 2).await {
                Ok(arrivals) => arrivals,
                Err(error) => {
                    warn!(feed = %config.subway.name, %error, "Feed unavailable, rendering empty board");
                    Vec::new()
                }
            };

            let weather = if no_weather {
                None
            } else {
                match fetch_weather(&BasicClient::new(), &config.weather, Local::now()).await {
                    Ok(weather) => Some(weather),
                    Err(error) => {
                        warn!(%error, "Weather unavailable, rendering without it");
                        None
                    }
                }
            };

            let fonts = Fonts::load();
            if fonts.is_none() {
                warn!("No usable font found, rendering without text");
            }

            let options = RenderOptions {
                rotate,
                grayscale,
                ..Default::default()
            };
            let img = render_board(
                &arrivals,
                &config.subway.badge,
                weather.as_ref(),
                Local::now(),
                fonts.as_ref(),
                &options,
            );
            img.save(&output)?;
            info!(path = %output, rotated = rotate, grayscale, "Board image written");
        }
        Commands::Inspect { feed } => {
            let feed_config = match feed.as_str() {
                "ferry" => &config.ferry,
                _ => &config.subway,
            };
            inspect_feed(feed_config).await?;
        }
    }

    Ok(())
}

/// Fetches a feed's current snapshot, honoring its optional API key.
#[tracing::instrument(skip(config), fields(feed = %config.name, url = %config.url))]
async fn fetch_feed_bytes(config: &FeedConfig) -> Result<Vec<u8>> {
    match &config.api_key {
        Some(key) => {
            let client = ApiKey::new(BasicClient::new(), API_KEY_HEADER, key.clone());
            fetch_bytes(&client, &config.url).await
        }
        None => fetch_bytes(&BasicClient::new(), &config.url).await,
    }
}

/// One pipeline run for one feed: fetch, decode, extract. A fetch or decode
/// failure is the `Err` arm, distinct from "fetched fine, nothing upcoming".
#[tracing::instrument(skip(config), fields(feed = %config.name))]
async fn board_arrivals(config: &FeedConfig, limit_per_direction: usize) -> Result<Vec<ArrivalEstimate>> {
    let bytes = fetch_feed_bytes(config).await?;
    let feed = parse_feed(&bytes)?;
    Ok(extract_arrivals(&feed, &config.stops, Utc::now(), limit_per_direction))
}

/// Logs what a feed currently carries; the debugging companion to `status`.
#[tracing::instrument(skip(config), fields(feed = %config.name))]
async fn inspect_feed(config: &FeedConfig) -> Result<()> {
    let bytes = fetch_feed_bytes(config).await?;
    let feed = parse_feed(&bytes)?;

    let trip_updates = feed.entity.iter().filter(|e| e.trip_update.is_some()).count();
    let vehicles = feed.entity.iter().filter(|e| e.vehicle.is_some()).count();
    let alerts = feed.entity.iter().filter(|e| e.alert.is_some()).count();

    info!(
        entities = feed.entity.len(),
        trip_updates,
        vehicles,
        alerts,
        header_timestamp = feed.header.timestamp,
        "Feed snapshot"
    );

    for target in &config.stops {
        let matched = feed
            .entity
            .iter()
            .filter_map(|e| e.trip_update.as_ref())
            .flat_map(|u| u.stop_time_update.iter())
            .filter(|st| st.stop_id() == target.stop_id)
            .count();
        info!(
            stop_id = %target.stop_id,
            direction = %target.direction,
            stop_time_entries = matched,
            "Target stop coverage"
        );
    }

    Ok(())
}
