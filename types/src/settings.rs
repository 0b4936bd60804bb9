//! Resolved configuration types shared across crates.
//!
//! Raw TOML structs (with `Option` fields) stay private in `hostbridge-config`.
//! The loader validates them into these types at the parse boundary, so
//! holding one of these is proof the values are usable.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("bridge.wait_timeout_ms must be greater than zero (omit it to wait forever)")]
    ZeroWaitTimeout,
    #[error("shell.prompt must not be empty")]
    EmptyPrompt,
}

/// How long a bridged request may take before `wait` gives up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeSettings {
    wait_timeout: Option<Duration>,
}

impl BridgeSettings {
    /// `None` waits until the host fires.
    #[must_use]
    pub fn new(wait_timeout: Option<Duration>) -> Self {
        Self { wait_timeout }
    }

    pub fn from_millis(wait_timeout_ms: Option<u64>) -> Result<Self, SettingsError> {
        match wait_timeout_ms {
            Some(0) => Err(SettingsError::ZeroWaitTimeout),
            Some(ms) => Ok(Self::new(Some(Duration::from_millis(ms)))),
            None => Ok(Self::default()),
        }
    }

    #[must_use]
    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSettings {
    prompt: String,
}

impl ShellSettings {
    pub const DEFAULT_PROMPT: &'static str = "$ ";

    pub fn new(prompt: impl Into<String>) -> Result<Self, SettingsError> {
        let prompt = prompt.into();
        if prompt.is_empty() {
            return Err(SettingsError::EmptyPrompt);
        }
        Ok(Self { prompt })
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            prompt: Self::DEFAULT_PROMPT.to_string(),
        }
    }
}

/// Scratch store behavior. Zero latency still completes on a later turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreSettings {
    latency: Duration,
}

impl StoreSettings {
    #[must_use]
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    #[must_use]
    pub fn latency(&self) -> Duration {
        self.latency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_is_rejected() {
        assert_eq!(
            BridgeSettings::from_millis(Some(0)),
            Err(SettingsError::ZeroWaitTimeout)
        );
    }

    #[test]
    fn missing_timeout_waits_forever() {
        let settings = BridgeSettings::from_millis(None).unwrap();
        assert!(settings.wait_timeout().is_none());
    }

    #[test]
    fn timeout_in_millis() {
        let settings = BridgeSettings::from_millis(Some(1500)).unwrap();
        assert_eq!(settings.wait_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn empty_prompt_is_rejected() {
        assert_eq!(ShellSettings::new(""), Err(SettingsError::EmptyPrompt));
        assert_eq!(ShellSettings::default().prompt(), "$ ");
    }
}
