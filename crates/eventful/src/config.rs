#![forbid(unsafe_code)]

//! Observable configuration.
//!
//! By default an [`Observable`](crate::Observable) is unbuffered: a
//! subscriber only sees emissions that happen after it attached. The
//! [`ReplayPolicy`] opts a single observable into handing its most recent
//! emission to each new subscriber instead.
//!
//! Configuration can be built in code or read from the environment:
//!
//! | Variable          | Values                         | Field    |
//! |-------------------|--------------------------------|----------|
//! | `EVENTFUL_REPLAY` | `off`, `none`, `latest`, `cached` | `replay` |
//! | `EVENTFUL_LABEL`  | any non-empty string           | `label`  |
//!
//! Invalid values are reported in [`ConfigParse::errors`] and leave the
//! corresponding field at its default.

use std::env;
use std::fmt;

const ENV_REPLAY: &str = "EVENTFUL_REPLAY";
const ENV_LABEL: &str = "EVENTFUL_LABEL";

/// What a newly attached subscriber receives from past emissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayPolicy {
    /// Nothing; only future emissions are delivered.
    #[default]
    Off,
    /// The most recent emission, delivered once on subscription.
    Latest,
}

impl ReplayPolicy {
    /// Parse a policy name (case-insensitive).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Some(Self::Off),
            "latest" | "cached" => Some(Self::Latest),
            _ => None,
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Latest => "latest",
        }
    }
}

impl fmt::Display for ReplayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a single observable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservableConfig {
    /// Replay behavior for new subscribers.
    pub replay: ReplayPolicy,
    /// Optional name used in debug output and tracing fields.
    pub label: Option<String>,
}

impl ObservableConfig {
    /// Configuration that replays the latest emission.
    #[must_use]
    pub fn cached() -> Self {
        Self {
            replay: ReplayPolicy::Latest,
            label: None,
        }
    }

    /// Set the replay policy.
    #[must_use]
    pub fn with_replay(mut self, replay: ReplayPolicy) -> Self {
        self.replay = replay;
        self
    }

    /// Set the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Parse config from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with_diagnostics().config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> ConfigParse {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Parse config using a custom environment lookup.
    pub fn from_env_with<F>(mut get: F) -> ConfigParse
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let mut errors = Vec::new();

        if let Some(value) = get(ENV_REPLAY) {
            match ReplayPolicy::parse(&value) {
                Some(parsed) => config.replay = parsed,
                None => errors.push(ConfigError::new(
                    "replay",
                    value,
                    "expected off|none|latest|cached",
                )),
            }
        }

        if let Some(value) = get(ENV_LABEL) {
            config.label = Some(value);
        }

        if let Err(mut invalid) = config.validate() {
            config.label = None;
            errors.append(&mut invalid);
        }

        ConfigParse { config, errors }
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        if let Some(label) = self.label.as_ref().filter(|l| l.trim().is_empty()) {
            errors.push(ConfigError::new(
                "label",
                label.clone(),
                "label must not be blank",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration parse result with diagnostics.
#[derive(Debug, Clone)]
pub struct ConfigParse {
    pub config: ObservableConfig,
    pub errors: Vec<ConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:?} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}
