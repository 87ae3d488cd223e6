//! YAML configuration for the carousel and the derived runtime settings.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use chrono::format::{Item, StrftimeItems};
use chrono_tz::Tz;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use tracing::warn;

use crate::builder::{BuildLimits, EmptyAfterFilter};
use crate::clock::{CalendarZone, Clock};
use crate::gesture::DEFAULT_SWIPE_THRESHOLD;
use crate::photo::RawPhotoDescriptor;
use crate::render::{DEFAULT_TIMESTAMP_FORMAT, RenderSettings};

const DEFAULT_MAX_ITEMS: usize = 30;
const DEFAULT_AUTOPLAY_MS: u64 = 5000;
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Longest autoplay or reload period accepted (ten years).
pub const MAX_TIMER_INTERVAL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Visibility and font overrides for one text field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    #[serde(alias = "show_title", alias = "show_timestamp", alias = "show_description")]
    pub show: bool,
    pub font_color: Option<String>,
    pub font_size: Option<String>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            show: true,
            font_color: None,
            font_size: None,
        }
    }
}

/// Autoplay interval; `None` disables timed advancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Autoplay(pub Option<Duration>);

impl Default for Autoplay {
    fn default() -> Self {
        Self(Some(Duration::from_millis(DEFAULT_AUTOPLAY_MS)))
    }
}

impl<'de> Deserialize<'de> for Autoplay {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Millis(f64),
            Text(String),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Flag(false) => Self(None),
            Repr::Flag(true) => Self::default(),
            Repr::Millis(ms) if ms.is_finite() && ms > 0.0 => {
                let interval = Duration::try_from_secs_f64(ms / 1000.0).map_err(|err| {
                    de::Error::custom(format!("invalid autoplay interval {ms}ms: {err}"))
                })?;
                Self(Some(interval))
            }
            Repr::Millis(_) => Self(None),
            Repr::Text(text) => {
                let interval = humantime::parse_duration(&text).map_err(|err| {
                    de::Error::custom(format!("invalid autoplay interval '{text}': {err}"))
                })?;
                Self(Some(interval).filter(|d| !d.is_zero()))
            }
        })
    }
}

/// Minutes given as a number or a numeric string.
fn lenient_minutes<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Repr>::deserialize(deserializer)? {
        Some(Repr::Number(n)) => Some(n),
        Some(Repr::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct Configuration {
    /// Text or JSON file listing the photos; a URL or a local path.
    #[serde(default)]
    pub description_file_path: Option<String>,
    /// Folder prefixed to filenames from a plain-text description file.
    #[serde(default)]
    pub folder_path: Option<String>,
    /// Inline photos used when the description file yields nothing.
    #[serde(default)]
    pub photos: Vec<RawPhotoDescriptor>,
    #[serde(default)]
    pub max_items_to_show: Option<i64>,
    #[serde(default)]
    pub max_days_to_show: Option<i64>,
    #[serde(default)]
    pub autoplay: Autoplay,
    #[serde(default, deserialize_with = "lenient_minutes")]
    pub reload_interval_minutes: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub title_style: StyleConfig,
    #[serde(default)]
    pub timestamp_style: StyleConfig,
    #[serde(default)]
    pub description_style: StyleConfig,
    /// Calendar zone for day cutoffs and display; the host zone when unset.
    #[serde(default)]
    pub timezone: Option<Tz>,
    #[serde(default = "Configuration::default_timestamp_format")]
    pub timestamp_format: String,
    #[serde(default = "Configuration::default_swipe_threshold")]
    pub swipe_threshold: f64,
    #[serde(default)]
    pub empty_after_filter: EmptyAfterFilter,
    /// Upper bound on one description file request.
    #[serde(
        default = "Configuration::default_fetch_timeout",
        with = "humantime_serde"
    )]
    pub fetch_timeout: Duration,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            description_file_path: None,
            folder_path: None,
            photos: Vec::new(),
            max_items_to_show: None,
            max_days_to_show: None,
            autoplay: Autoplay::default(),
            reload_interval_minutes: None,
            title: None,
            title_style: StyleConfig::default(),
            timestamp_style: StyleConfig::default(),
            description_style: StyleConfig::default(),
            timezone: None,
            timestamp_format: Self::default_timestamp_format(),
            swipe_threshold: Self::default_swipe_threshold(),
            empty_after_filter: EmptyAfterFilter::default(),
            fetch_timeout: Self::default_fetch_timeout(),
        }
    }
}

impl Configuration {
    fn default_timestamp_format() -> String {
        DEFAULT_TIMESTAMP_FORMAT.to_string()
    }

    const fn default_swipe_threshold() -> f64 {
        DEFAULT_SWIPE_THRESHOLD
    }

    const fn default_fetch_timeout() -> Duration {
        DEFAULT_FETCH_TIMEOUT
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            self.swipe_threshold.is_finite() && self.swipe_threshold >= 0.0,
            "swipe_threshold must be a non-negative number"
        );
        ensure!(
            !StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error)),
            "timestamp_format '{}' is not a valid strftime pattern",
            self.timestamp_format
        );
        if let Some(minutes) = self.reload_interval_minutes {
            ensure!(
                minutes.is_finite(),
                "reload_interval_minutes must be a finite number"
            );
            if minutes > 0.0 {
                let within = minutes_to_duration(minutes)
                    .is_some_and(|every| every <= MAX_TIMER_INTERVAL);
                ensure!(
                    within,
                    "reload_interval_minutes must be at most {}",
                    humantime::format_duration(MAX_TIMER_INTERVAL)
                );
            }
        }
        if let Some(interval) = self.autoplay.0 {
            ensure!(
                interval <= MAX_TIMER_INTERVAL,
                "autoplay must be at most {}",
                humantime::format_duration(MAX_TIMER_INTERVAL)
            );
        }
        ensure!(
            !self.fetch_timeout.is_zero(),
            "fetch_timeout must be greater than zero"
        );
        Ok(self)
    }

    /// The description file location, if one is set and not blank.
    pub fn description_file(&self) -> Option<&str> {
        self.description_file_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn calendar_zone(&self) -> CalendarZone {
        self.timezone.map_or(CalendarZone::Local, CalendarZone::Named)
    }

    pub fn clock(&self) -> Clock {
        Clock::new(self.calendar_zone())
    }

    pub fn build_limits(&self) -> BuildLimits {
        BuildLimits {
            max_items: non_negative(self.max_items_to_show, "max_items_to_show")
                .map_or(DEFAULT_MAX_ITEMS, |n| usize::try_from(n).unwrap_or(usize::MAX)),
            max_days: non_negative(self.max_days_to_show, "max_days_to_show")
                .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX)),
            empty_after_filter: self.empty_after_filter,
        }
    }

    pub fn autoplay_interval(&self) -> Option<Duration> {
        self.autoplay.0
    }

    /// Period of the full reload pipeline, when configured and positive.
    pub fn reload_interval(&self) -> Option<Duration> {
        self.reload_interval_minutes
            .filter(|m| m.is_finite() && *m > 0.0)
            .and_then(minutes_to_duration)
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            title: self.title.clone(),
            title_style: self.title_style.clone(),
            timestamp_style: self.timestamp_style.clone(),
            description_style: self.description_style.clone(),
            timestamp_format: self.timestamp_format.clone(),
        }
    }
}

fn minutes_to_duration(minutes: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(minutes * 60.0).ok()
}

fn non_negative(value: Option<i64>, key: &str) -> Option<i64> {
    match value {
        Some(n) if n >= 0 => Some(n),
        Some(n) => {
            warn!(key, value = n, "negative value ignored; using default");
            None
        }
        None => None,
    }
}

/// Load and validate a configuration file.
pub fn load(path: &Path) -> Result<Configuration> {
    Configuration::from_yaml_file(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?
        .validated()
        .context("invalid configuration values")
}
