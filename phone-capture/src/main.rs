use std::process::ExitCode;

use envconfig::Envconfig;
use tracing::level_filters::LevelFilter;
use tracing::{error, info, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use phone_capture::app;
use phone_capture::config::Config;

fn setup_tracing(level: Level) {
    // stdout with a level configured by the RUST_LOG envvar, LOG_LEVEL if unset
    let log_layer = tracing_subscriber::fmt::layer().with_filter(
        EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(level).into())
            .from_env_lossy(),
    );
    tracing_subscriber::registry().with(log_layer).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::init_from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    setup_tracing(config.log_level);
    info!("Starting up...");

    match app::run(config).await {
        Ok(summary) => {
            info!("done: {:?}", summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
