use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use swlog_core::display::Locale;
use swlog_core::logging::LogSettings;
use swlog_core::tracker::TrackerOptions;

/// File name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "swlog.toml";

const MIN_INTERVAL_MS: u64 = 100;

/// Monitor configuration loaded from `swlog.toml`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MonitorConfig {
    /// Cadence of synthetic idle entries.
    pub idle_interval_ms: u64,
    /// Cadence of the controller liveness check.
    pub liveness_interval_ms: u64,
    /// Maximum entries kept in the activity log; `0` keeps everything.
    pub log_capacity: usize,
    /// Initial state of the idle-logging switch.
    pub idle_logging: bool,
    pub locale: Locale,
    /// Diagnostic filter used when `SWLOG_LOG`/`RUST_LOG` are unset.
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub feed: Option<FeedConfig>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            idle_interval_ms: 3000,
            liveness_interval_ms: 3000,
            log_capacity: 1000,
            idle_logging: true,
            locale: Locale::En,
            log_level: "info".to_string(),
            log_dir: None,
            feed: None,
        }
    }
}

/// Where worker lifecycle records come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    /// A JSON-lines file to replay; `-` reads stdin.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Resolved feed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSpec {
    Command { program: String, args: Vec<String> },
    File(PathBuf),
    Stdin,
}

impl FeedConfig {
    pub fn validate(&self) -> Result<()> {
        match (&self.command, &self.path) {
            (Some(_), Some(_)) => bail!("feed: set either `command` or `path`, not both"),
            (None, None) => bail!("feed: one of `command` or `path` is required"),
            (Some(command), None) => validate_nonempty("feed.command", command)?,
            (None, Some(path)) => {
                if path.as_os_str().is_empty() {
                    bail!("feed.path must not be empty");
                }
            }
        }
        if self.path.is_some() && !self.args.is_empty() {
            bail!("feed.args only applies to `command`");
        }
        if self.args.iter().any(|arg| arg.contains('\0')) {
            bail!("feed.args entries must not contain NUL bytes");
        }
        Ok(())
    }

    /// Resolve to a concrete source. Call after [`validate`](Self::validate).
    pub fn spec(&self) -> Option<FeedSpec> {
        if let Some(command) = &self.command {
            return Some(FeedSpec::Command {
                program: command.clone(),
                args: self.args.clone(),
            });
        }
        self.path.as_ref().map(|path| {
            if path.as_os_str() == "-" {
                FeedSpec::Stdin
            } else {
                FeedSpec::File(path.clone())
            }
        })
    }

    /// Parse a whitespace-separated command line, as given in `SWLOG_FEED`.
    pub fn from_command_line(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let Some(command) = parts.next() else {
            bail!("feed command line is empty");
        };
        Ok(Self {
            command: Some(command),
            args: parts.collect(),
            path: None,
        })
    }
}

impl MonitorConfig {
    /// Parse and validate config TOML.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input).context("failed to parse swlog config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read swlog config at {}", path.display()))?;

        Self::from_toml_str(&raw)
            .with_context(|| format!("invalid swlog config at {}", path.display()))
    }

    /// Load from `SWLOG_CONFIG` or the platform config dir, then apply env
    /// overrides. A missing file at the default location yields defaults; an
    /// explicitly named file must exist.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os("SWLOG_CONFIG") {
            Some(path) => Self::from_path(Path::new(&path))?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_path(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// `SWLOG_FEED` replaces any `[feed]` table from the file.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(line) = std::env::var("SWLOG_FEED") {
            if !line.trim().is_empty() {
                self.feed = Some(
                    FeedConfig::from_command_line(&line).context("invalid SWLOG_FEED")?,
                );
            }
        }
        Ok(())
    }

    /// Validate numeric ranges and the feed table.
    pub fn validate(&self) -> Result<()> {
        validate_interval("idle_interval_ms", self.idle_interval_ms)?;
        validate_interval("liveness_interval_ms", self.liveness_interval_ms)?;
        validate_nonempty("log_level", &self.log_level)?;
        if let Some(feed) = &self.feed {
            feed.validate()?;
        }
        Ok(())
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_interval_ms)
    }

    /// Capacity for the activity log; `None` means unbounded.
    pub fn log_capacity(&self) -> Option<usize> {
        (self.log_capacity > 0).then_some(self.log_capacity)
    }

    pub fn tracker_options(&self) -> TrackerOptions {
        TrackerOptions {
            idle_period: self.idle_interval(),
            idle_logging: self.idle_logging,
            log_capacity: self.log_capacity(),
            locale: self.locale,
        }
    }

    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            default_filter: self.log_level.clone(),
            dir: self.log_dir.clone(),
            ..LogSettings::default()
        }
    }

    pub fn feed_spec(&self) -> Option<FeedSpec> {
        self.feed.as_ref().and_then(FeedConfig::spec)
    }
}

/// `<config_dir>/swlog/swlog.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("swlog").join(CONFIG_FILE_NAME))
}

fn validate_interval(field: &str, value: u64) -> Result<()> {
    if value < MIN_INTERVAL_MS {
        bail!("{field} must be at least {MIN_INTERVAL_MS}ms, got {value}");
    }
    Ok(())
}

fn validate_nonempty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{field} must not be empty");
    }
    Ok(())
}
