// ruleflow/src/config.rs

//! Engine configuration and the duration syntax shared with rule documents.
//!
//! Durations are written either as a plain number of seconds (`5`, `0.25`)
//! or as a suffixed string (`"500ms"`, `"10s"`, `"2m"`, `"1h"`).

use serde::Deserialize;
use std::time::Duration;
use tracing::{event, Level};

/// Deadline applied to rules that do not configure their own `timeout`.
pub const DEFAULT_RULE_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable read by [`EngineConfig::from_env`].
pub const DEFAULT_RULE_TIMEOUT_ENV: &str = "RULEFLOW_DEFAULT_RULE_TIMEOUT";

/// Process-wide settings supplied to the engine at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  #[serde(
    rename = "DEFAULT_RULE_TIMEOUT",
    alias = "default_rule_timeout",
    deserialize_with = "duration_serde::deserialize"
  )]
  pub default_rule_timeout: Duration,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      default_rule_timeout: DEFAULT_RULE_TIMEOUT,
    }
  }
}

impl EngineConfig {
  pub fn new(default_rule_timeout: Duration) -> Self {
    Self { default_rule_timeout }
  }

  pub fn from_json_str(document: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(document)
  }

  /// Reads `RULEFLOW_DEFAULT_RULE_TIMEOUT`. An unset or unparsable value
  /// yields the default configuration.
  pub fn from_env() -> Self {
    let Ok(raw) = std::env::var(DEFAULT_RULE_TIMEOUT_ENV) else {
      return Self::default();
    };
    match duration_serde::parse_duration_str(raw.trim()) {
      Ok(default_rule_timeout) => Self { default_rule_timeout },
      Err(message) => {
        event!(
          Level::WARN,
          variable = DEFAULT_RULE_TIMEOUT_ENV,
          value = %raw,
          "Ignoring invalid default rule timeout: {}",
          message
        );
        Self::default()
      }
    }
  }
}

pub(crate) mod duration_serde {
  use serde::{Deserialize, Deserializer};
  use std::time::Duration;

  #[derive(Deserialize)]
  #[serde(untagged)]
  enum RawDuration {
    Seconds(f64),
    Text(String),
  }

  pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
  where
    D: Deserializer<'de>,
  {
    match RawDuration::deserialize(deserializer)? {
      RawDuration::Seconds(secs) => from_secs(secs),
      RawDuration::Text(s) => parse_duration_str(&s),
    }
    .map_err(serde::de::Error::custom)
  }

  /// `null` and a missing field both mean "not configured".
  pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
  where
    D: Deserializer<'de>,
  {
    match Option::<RawDuration>::deserialize(deserializer)? {
      None => Ok(None),
      Some(RawDuration::Seconds(secs)) => from_secs(secs).map(Some),
      Some(RawDuration::Text(s)) => parse_duration_str(&s).map(Some),
    }
    .map_err(serde::de::Error::custom)
  }

  fn from_secs(secs: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration {}: {}", secs, e))
  }

  pub fn parse_duration_str(s: &str) -> Result<Duration, String> {
    if let Some(val) = s.strip_suffix("ms") {
      scaled(s, val, 1)
    } else if let Some(val) = s.strip_suffix('s') {
      scaled(s, val, 1_000)
    } else if let Some(val) = s.strip_suffix('m') {
      scaled(s, val, 60_000)
    } else if let Some(val) = s.strip_suffix('h') {
      scaled(s, val, 3_600_000)
    } else if let Ok(secs) = s.parse::<f64>() {
      from_secs(secs)
    } else {
      Err(format!("unknown duration format: {}", s))
    }
  }

  /// `val` units of `millis_per_unit` milliseconds. Whole numbers stay exact;
  /// fractional ones go through `f64` seconds.
  fn scaled(s: &str, val: &str, millis_per_unit: u64) -> Result<Duration, String> {
    if let Ok(whole) = val.parse::<u64>() {
      return whole
        .checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("duration '{}' is out of range", s));
    }
    let value = val
      .parse::<f64>()
      .map_err(|e| format!("invalid duration '{}': {}", s, e))?;
    from_secs(value * millis_per_unit as f64 / 1_000.0)
  }
}
