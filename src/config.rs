use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

pub const MAX_PAGE_SIZE: usize = 500;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_csrf_cookie")]
    pub csrf_cookie: String,
    #[serde(default = "default_csrf_header")]
    pub csrf_header: String,
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    /// Existing session id to resume, e.g. copied from a browser.
    #[serde(default)]
    pub session_token: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_csrf_cookie() -> String {
    "csrftoken".to_string()
}
fn default_csrf_header() -> String {
    "X-CSRFToken".to_string()
}
fn default_session_cookie() -> String {
    "sessionid".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    newsradar_core::feed::DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    /// Where the magic link should send the user after signing in.
    #[serde(default)]
    pub redirect_url: Option<String>,
}

impl Config {
    /// Defaults for everything except the API location.
    pub fn minimal(base_url: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                base_url: base_url.into(),
                timeout_secs: default_timeout_secs(),
                csrf_cookie: default_csrf_cookie(),
                csrf_header: default_csrf_header(),
                session_cookie: default_session_cookie(),
                session_token: None,
            },
            feed: FeedConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate api
    let url = reqwest::Url::parse(&config.api.base_url)
        .with_context(|| format!("api.base_url is not a valid URL: {}", config.api.base_url))?;
    match url.scheme() {
        "http" | "https" => {}
        other => anyhow::bail!(
            "Unsupported api.base_url scheme: '{}'. Must be http or https.",
            other
        ),
    }
    if config.api.timeout_secs == 0 {
        anyhow::bail!("api.timeout_secs must be > 0");
    }
    if config.api.csrf_header.trim().is_empty() {
        anyhow::bail!("api.csrf_header must not be empty");
    }

    // Validate feed
    if !(1..=MAX_PAGE_SIZE).contains(&config.feed.page_size) {
        anyhow::bail!("feed.page_size must be in [1, {}]", MAX_PAGE_SIZE);
    }

    Ok(())
}
