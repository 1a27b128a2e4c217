use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ed_bot::bridge::EventBridge;
use ed_bot::cache::CourseCache;
use ed_bot::discord::{WebhookDispatcher, WebhookRegistry};
use ed_bot::ed::EdClient;
use ed_bot::settings::{Logging, Settings};
use log::info;
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};
use tokio::sync::mpsc;

/// Period of the scheduled course refresh.
const REFRESH_PERIOD: Duration = Duration::from_secs(60 * 60);
/// Capacity of the transport → bridge event channel.
const EVENT_BUFFER: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    // Loading .env file
    dotenv::dotenv().ok();

    let settings = Settings::new().await?;
    init_logger(&settings.logging)?;

    info!("starting the Ed notification bridge");

    let registry = WebhookRegistry::new(settings.webhooks);
    let course_ids = registry.course_ids();

    let client = Arc::new(EdClient::new(&settings.ed));
    let cache = Arc::new(CourseCache::new());
    let bridge = Arc::new(EventBridge::new(
        cache,
        Arc::clone(&client),
        WebhookDispatcher::new(registry),
    ));

    let refresh = Arc::clone(&bridge).spawn_refresh_loop(REFRESH_PERIOD);

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let consumer = tokio::spawn(Arc::clone(&bridge).run(rx));

    // The subscription is the one startup step the bridge cannot live
    // without, so a failed handshake takes the process down.
    tokio::select! {
        result = client.subscribe(&course_ids, tx) => {
            result.context("realtime subscription ended")?;
            info!("event stream closed, shutting down");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received CTRL+C, shutting down");
        }
    }

    refresh.abort();
    consumer.abort();

    Ok(())
}

/// Set up a combined logger with the backends enabled in the configuration.
fn init_logger(logging: &Logging) -> Result<()> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    if let Some(terminal) = &logging.terminal {
        loggers.push(TermLogger::new(
            terminal.filter,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }

    if let Some(file) = &logging.file {
        let target = std::fs::File::create(&file.path)
            .with_context(|| format!("failed creating log file at '{}'", file.path.display()))?;
        loggers.push(WriteLogger::new(file.base.filter, Config::default(), target));
    }

    CombinedLogger::init(loggers).context("logger failed to set up")?;

    Ok(())
}
