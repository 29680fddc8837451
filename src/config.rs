//! Runtime configuration.
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! `SCHEDULE_*` environment variables (nested keys separated by `__`, e.g.
//! `SCHEDULE_GRID__EPSILON`).

use crate::crawler::{CrawlSettings, DEFAULT_ALPHABET};
use crate::timetable::GridConfig;
use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use fundu::DurationParser;
use serde::{Deserialize, Deserializer};
use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Config file read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "schedule.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Level for this crate's logs when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Characters the listing index is filtered by, one request each.
    #[serde(default = "default_alphabet")]
    pub alphabet: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    /// Accepts plain seconds or a duration string such as `"30s"` or `"2m"`.
    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub request_timeout: Duration,
    /// Decoded entries buffered between the crawler and the output writer.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default)]
    pub grid: GridConfig,
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_base_url() -> String {
    "http://moria.umcs.lublin.pl".to_owned()
}

fn default_alphabet() -> String {
    DEFAULT_ALPHABET.to_owned()
}

fn default_concurrency() -> usize {
    8
}

fn default_requests_per_second() -> u32 {
    4
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_channel_capacity() -> usize {
    256
}

fn deserialize_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

/// Parse a human duration like `"30s"`, `"1.5m"` or `"250ms"`.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let parsed = DurationParser::with_all_time_units()
        .parse(text.trim())
        .map_err(|e| format!("invalid duration {text:?}: {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration {text:?}: {e}"))
}

impl Config {
    /// Load configuration from `path` (or [`DEFAULT_CONFIG_FILE`]) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) if !path.exists() => {
                bail!("config file {} does not exist", path.display())
            }
            Some(path) => path,
            None => Path::new(DEFAULT_CONFIG_FILE),
        };

        Self::from_figment(
            Figment::new()
                .merge(Toml::file(file))
                .merge(Env::prefixed("SCHEDULE_").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment.extract().context("Failed to load config")
    }

    /// Requests per second as a non-zero quota.
    pub fn rate_limit(&self) -> Result<NonZeroU32> {
        NonZeroU32::new(self.requests_per_second).context("requests_per_second must be at least 1")
    }

    /// Validated, immutable settings for the crawler.
    pub fn crawl_settings(&self) -> Result<CrawlSettings> {
        let base_url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base_url {:?}", self.base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("base_url {:?} cannot be used as a base", self.base_url);
        }

        let alphabet: Vec<char> = self.alphabet.chars().filter(|c| !c.is_whitespace()).collect();
        if alphabet.is_empty() {
            bail!("alphabet must contain at least one character");
        }
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }

        let grid = self.grid;
        if grid.day_start_hour >= grid.day_end_hour || grid.day_end_hour > 24 {
            bail!(
                "grid hours must satisfy day_start_hour < day_end_hour <= 24, got {}..{}",
                grid.day_start_hour,
                grid.day_end_hour
            );
        }
        if !grid.column_scale.is_finite() || grid.column_scale <= 0.0 {
            bail!("grid.column_scale must be positive, got {}", grid.column_scale);
        }
        if !grid.epsilon.is_finite() || grid.epsilon < 0.0 {
            bail!("grid.epsilon must be non-negative, got {}", grid.epsilon);
        }

        Ok(CrawlSettings {
            base_url,
            alphabet,
            concurrency: self.concurrency,
            grid,
        })
    }
}
