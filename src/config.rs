//! Application-level configuration loading: timer defaults, report schedule and store bounds.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "POMORA_BACK_CONFIG_PATH";
/// Settings commands accept at most two digits.
const MAX_MINUTES: u32 = 99;

#[derive(Debug, Clone, Default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Room defaults and driver pace.
    pub timer: TimerConfig,
    /// Scheduled report triggers.
    pub reports: ReportConfig,
    /// Session store connection bounds.
    pub store: StoreConfig,
}

/// Defaults applied to every new room and the pace of the timer driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    /// Focus length of new rooms.
    pub focus_minutes: u32,
    /// Short break length of new rooms.
    pub break_minutes: u32,
    /// Driver period, rounded down to whole seconds.
    pub tick_interval_ms: u64,
    /// Minimum delay between two non-mandatory status refreshes of a room.
    pub status_refresh_secs: u32,
    /// Long break escalation, off when absent.
    pub long_break: Option<LongBreakConfig>,
}

impl TimerConfig {
    /// Whole seconds one driver tick takes off every room, never less than one.
    ///
    /// The driver period is this many seconds, so countdowns follow the wall clock.
    pub fn tick_step_secs(&self) -> u32 {
        u32::try_from(self.tick_interval_ms / 1000)
            .unwrap_or(u32::MAX)
            .max(1)
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            break_minutes: 5,
            tick_interval_ms: 1000,
            status_refresh_secs: 60,
            long_break: None,
        }
    }
}

/// Optional long break inserted after every `every_rounds` focus rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LongBreakConfig {
    /// Long break length.
    #[serde(default = "default_long_break_minutes")]
    pub minutes: u32,
    /// Focus rounds between two long breaks.
    #[serde(default = "default_long_break_rounds")]
    pub every_rounds: u32,
}

fn default_long_break_minutes() -> u32 {
    15
}

fn default_long_break_rounds() -> u32 {
    4
}

/// What happens to a window when its scheduled report could not be delivered anywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Reset once every guild was attempted, whatever the outcome.
    #[default]
    Always,
    /// Keep the counters when some guild had data but no report went out.
    SkipOnTotalFailure,
}

/// When daily, weekly and monthly reports fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportConfig {
    /// UTC hour at which every report fires, on the hour.
    pub hour_utc: u8,
    /// Day of the weekly report.
    pub weekly_weekday: time::Weekday,
    /// Rows shown in a report.
    pub leaderboard_limit: usize,
    /// Whether undelivered windows are still reset.
    pub reset_policy: ResetPolicy,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            hour_utc: 21,
            weekly_weekday: time::Weekday::Friday,
            leaderboard_limit: 10,
            reset_policy: ResetPolicy::Always,
        }
    }
}

/// Connection pool bounds of the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Upper bound of pooled connections.
    pub max_pool_size: u32,
    /// Delay before a connection attempt is abandoned.
    pub connect_timeout_secs: u64,
    /// Idle connections are closed after this long, `0` keeps them.
    pub idle_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_pool_size: 10,
            connect_timeout_secs: 10,
            idle_timeout_secs: 20,
        }
    }
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        focus_minutes = app_config.timer.focus_minutes,
                        break_minutes = app_config.timer.break_minutes,
                        report_hour = app_config.reports.hour_utc,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration document, applying defaults to missing keys.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    timer: RawTimer,
    reports: RawReports,
    store: RawStore,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawTimer {
    focus_minutes: u32,
    break_minutes: u32,
    tick_interval_ms: u64,
    status_refresh_secs: u32,
    long_break: Option<LongBreakConfig>,
}

impl Default for RawTimer {
    fn default() -> Self {
        let defaults = TimerConfig::default();
        Self {
            focus_minutes: defaults.focus_minutes,
            break_minutes: defaults.break_minutes,
            tick_interval_ms: defaults.tick_interval_ms,
            status_refresh_secs: defaults.status_refresh_secs,
            long_break: defaults.long_break,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawWeekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<RawWeekday> for time::Weekday {
    fn from(value: RawWeekday) -> Self {
        match value {
            RawWeekday::Monday => time::Weekday::Monday,
            RawWeekday::Tuesday => time::Weekday::Tuesday,
            RawWeekday::Wednesday => time::Weekday::Wednesday,
            RawWeekday::Thursday => time::Weekday::Thursday,
            RawWeekday::Friday => time::Weekday::Friday,
            RawWeekday::Saturday => time::Weekday::Saturday,
            RawWeekday::Sunday => time::Weekday::Sunday,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawReports {
    hour_utc: u8,
    weekly_weekday: RawWeekday,
    leaderboard_limit: usize,
    reset_policy: ResetPolicy,
}

impl Default for RawReports {
    fn default() -> Self {
        Self {
            hour_utc: 21,
            weekly_weekday: RawWeekday::Friday,
            leaderboard_limit: 10,
            reset_policy: ResetPolicy::Always,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawStore {
    max_pool_size: u32,
    connect_timeout_secs: u64,
    idle_timeout_secs: u64,
}

impl Default for RawStore {
    fn default() -> Self {
        let defaults = StoreConfig::default();
        Self {
            max_pool_size: defaults.max_pool_size,
            connect_timeout_secs: defaults.connect_timeout_secs,
            idle_timeout_secs: defaults.idle_timeout_secs,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let RawConfig {
            timer,
            reports,
            store,
        } = value;

        Self {
            timer: TimerConfig {
                focus_minutes: timer.focus_minutes.clamp(1, MAX_MINUTES),
                break_minutes: timer.break_minutes.clamp(1, MAX_MINUTES),
                tick_interval_ms: timer.tick_interval_ms.max(1),
                status_refresh_secs: timer.status_refresh_secs.max(1),
                long_break: timer.long_break.map(|long_break| LongBreakConfig {
                    minutes: long_break.minutes.clamp(1, MAX_MINUTES),
                    every_rounds: long_break.every_rounds.max(1),
                }),
            },
            reports: ReportConfig {
                hour_utc: reports.hour_utc.min(23),
                weekly_weekday: reports.weekly_weekday.into(),
                leaderboard_limit: reports.leaderboard_limit.max(1),
                reset_policy: reports.reset_policy,
            },
            store: StoreConfig {
                max_pool_size: store.max_pool_size.max(1),
                connect_timeout_secs: store.connect_timeout_secs.max(1),
                idle_timeout_secs: store.idle_timeout_secs,
            },
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
