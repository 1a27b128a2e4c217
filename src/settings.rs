//! Authentication, webhook routing and logging settings for the bot.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use simplelog::LevelFilter;
use tokio::fs;

/// Main structure that holds all the settings of this bot.
pub struct Settings {
    /// Logger specific configuration.
    pub logging: Logging,
    /// Settings for the Ed client.
    pub ed: Ed,
    /// Resolved webhook destination per course id. An empty URL means the
    /// course is configured but notifications are disabled.
    pub webhooks: HashMap<u64, String>,
}

/// All configuration for the logging of the bot, including different logging
/// backends like a file or the terminal.
#[derive(Deserialize)]
pub struct Logging {
    /// Logging settings for the terminal backend.
    pub terminal: Option<BaseLogger>,
    /// File backend settings.
    pub file: Option<FileLogger>,
}

/// The base logger describes the very basic settings that apply to each
/// logging backend.
#[derive(Deserialize)]
pub struct BaseLogger {
    /// Maximum logging level that the backend outputs.
    #[serde(with = "SerdeLevelFilter")]
    pub filter: LevelFilter,
}

/// Logging configuration specific to file backends.
#[derive(Deserialize)]
pub struct FileLogger {
    /// Base logging backend configuration.
    #[serde(flatten)]
    pub base: BaseLogger,
    /// Location of the file to write logs to.
    pub path: PathBuf,
}

/// All settings regarding the Ed API and realtime stream.
#[derive(Deserialize)]
pub struct Ed {
    /// Token used to authenticate both API calls and the stream handshake.
    /// This is usually created on the Ed account settings page.
    pub api_token: String,
    /// Base URL of the HTTP API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// URL of the realtime websocket stream.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
}

fn default_api_url() -> String {
    "https://us.edstem.org/api".to_owned()
}

fn default_ws_url() -> String {
    "wss://us.edstem.org/api/stream".to_owned()
}

/// A wrapper for the [LevelFilter] that allows to use it in [serde], as it
/// doesn't provide support for it out of the box.
#[derive(Deserialize)]
#[serde(remote = "LevelFilter", rename_all = "lowercase")]
enum SerdeLevelFilter {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// An intermediate structure for the authentication related settings that
/// allows to parse them separately and merge them into a single [Settings]
/// structure later.
#[derive(Deserialize)]
struct Auth {
    ed: Ed,
}

/// The webhook map as written in the config file. Keys are course ids and
/// values are the NAMES of env vars holding the actual URLs, so the URLs
/// themselves can stay out of the repository.
#[derive(Deserialize)]
struct Webhooks {
    courses: HashMap<String, String>,
}

impl Settings {
    /// Create a new instance of the settings and fill it with the
    /// configuration from the `config/log.toml`, `config/auth.toml` and
    /// `config/webhooks.toml` files. The API token is overwritten by the
    /// `ED_API_TOKEN` env var if it exists, and webhook URLs are resolved
    /// from the env vars named in the webhooks file. An unset env var
    /// resolves to an empty URL, meaning "don't notify this course".
    pub async fn new() -> Result<Self> {
        let logging = load_toml("config/log.toml").await?;
        let Auth { mut ed } = load_toml("config/auth.toml").await?;
        let Webhooks { courses } = load_toml("config/webhooks.toml").await?;

        if let Ok(api_token) = env::var("ED_API_TOKEN") {
            ed.api_token = api_token;
        }

        Ok(Self {
            logging,
            ed,
            webhooks: resolve_webhooks(courses)?,
        })
    }
}

/// Parse the course ids of the webhook map and look up each env var name.
fn resolve_webhooks(courses: HashMap<String, String>) -> Result<HashMap<u64, String>> {
    courses
        .into_iter()
        .map(|(course_id, var)| {
            let course_id = course_id
                .parse::<u64>()
                .with_context(|| format!("invalid course id '{}' in webhooks config", course_id))?;
            Ok((course_id, env::var(&var).unwrap_or_default()))
        })
        .collect()
}

/// Load any deserializable structure from the given file path as TOML and
/// provide helpful error messages in case something goes wrong during the
/// process.
async fn load_toml<T>(path: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let content = fs::read(path)
        .await
        .with_context(|| format!("failed loading config file at '{}'", path))?;

    toml::from_slice(&content).with_context(|| format!("failed to parse TOML config from '{}'", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_urls_come_from_the_named_env_vars() {
        env::set_var("ED_BOT_TEST_WEBHOOK", "https://discord.com/api/webhooks/1/abc");

        let resolved = resolve_webhooks(HashMap::from([
            ("72681".to_owned(), "ED_BOT_TEST_WEBHOOK".to_owned()),
            ("72536".to_owned(), "ED_BOT_TEST_WEBHOOK_UNSET".to_owned()),
        ]))
        .unwrap();

        assert_eq!(
            resolved.get(&72681).map(String::as_str),
            Some("https://discord.com/api/webhooks/1/abc")
        );
        // Unset env var: the course stays configured, with notifications
        // disabled.
        assert_eq!(resolved.get(&72536).map(String::as_str), Some(""));
    }

    #[test]
    fn non_numeric_course_ids_are_rejected() {
        let result = resolve_webhooks(HashMap::from([(
            "ece350".to_owned(),
            "ED_BOT_TEST_WEBHOOK".to_owned(),
        )]));

        assert!(result.is_err());
    }

    #[test]
    fn ed_defaults_point_at_the_public_endpoints() {
        let ed: Ed = toml::from_str(r#"api_token = "secret""#).unwrap();

        assert_eq!(ed.api_url, "https://us.edstem.org/api");
        assert_eq!(ed.ws_url, "wss://us.edstem.org/api/stream");
    }
}
