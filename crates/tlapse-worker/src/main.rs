//! Timelapse worker binary.

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tlapse_media::Timelapse;
use tlapse_models::TimelapseOptions;
use tlapse_worker::WorkerConfig;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("tlapse=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    if std::env::var_os("TIMELAPSE_PRINT_SCHEMA").is_some() {
        let schema = schemars::schema_for!(TimelapseOptions);
        match serde_json::to_string_pretty(&schema) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!("Failed to serialize options schema: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    info!("Starting tlapse-worker");

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid worker configuration: {:#}", e);
            std::process::exit(1);
        }
    };
    info!("Worker config: {:?}", config);

    let timelapse = match Timelapse::from_options(config.options) {
        Ok(timelapse) => timelapse,
        Err(e) => {
            error!("Failed to configure timelapse: {}", e);
            std::process::exit(1);
        }
    };

    match timelapse.make_video(config.with_graph, &config.output).await {
        Ok(report) => {
            info!(
                output = %report.output.display(),
                frames = report.frames_staged,
                elapsed_ms = report.elapsed_ms,
                "Worker finished"
            );
            if let Ok(json) = serde_json::to_string(&report) {
                println!("{json}");
            }
        }
        Err(e) => {
            error!(stage = e.stage(), "Timelapse failed: {}", e);
            std::process::exit(1);
        }
    }
}
