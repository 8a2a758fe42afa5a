use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wechat_weather_bot::{config::PushConfig, push};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting weather push");

    let result = match PushConfig::load() {
        Ok(config) => push::run(config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(report) => {
            tracing::info!("🎉 Push finished: {} sent, {} failed", report.sent(), report.failed());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("❌ Push aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}
