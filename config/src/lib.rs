//! Configuration for hostbridge.
//!
//! `~/.hostbridge/config.toml` is parsed into raw structs with `Option`
//! fields, then resolved into the validated types from `hostbridge-types`.
//!
//! ```toml
//! [bridge]
//! wait_timeout_ms = 30000
//!
//! [shell]
//! prompt = "${USER}$ "
//!
//! [store]
//! latency_ms = 5
//!
//! [log]
//! filter = "hostbridge_core=debug"
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hostbridge_types::{BridgeSettings, SettingsError, ShellSettings, StoreSettings};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(#[from] SettingsError),
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HostbridgeConfig {
    pub bridge: Option<BridgeConfig>,
    pub shell: Option<ShellConfig>,
    pub store: Option<StoreConfig>,
    pub log: Option<LogConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BridgeConfig {
    /// Give up waiting on a host request after this long. Absent: wait forever.
    pub wait_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShellConfig {
    pub prompt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StoreConfig {
    /// Delay before the scratch store completes a request. Default: 0.
    #[serde(default)]
    pub latency_ms: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

/// Validated settings for every subsystem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub bridge: BridgeSettings,
    pub shell: ShellSettings,
    pub store: StoreSettings,
    pub log_filter: Option<String>,
}

/// Replace `${VAR}` with the value of the environment variable `VAR`.
/// Unset variables expand to the empty string; an unterminated `${` is kept.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(end_rel) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + end_rel];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 2 + end_rel + 1..];
    }

    out.push_str(rest);
    out
}

impl HostbridgeConfig {
    /// Load from the default location. A missing file is `Ok(None)`.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Validate into [`Settings`], applying defaults for absent sections.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        let bridge = BridgeSettings::from_millis(
            self.bridge.as_ref().and_then(|b| b.wait_timeout_ms),
        )?;

        let shell = match self.shell.as_ref().and_then(|s| s.prompt.as_deref()) {
            Some(prompt) => ShellSettings::new(expand_env_vars(prompt))?,
            None => ShellSettings::default(),
        };

        let store = StoreSettings::new(Duration::from_millis(
            self.store.as_ref().map_or(0, |s| s.latency_ms),
        ));

        let log_filter = self
            .log
            .as_ref()
            .and_then(|l| l.filter.as_deref())
            .map(expand_env_vars)
            .filter(|f| !f.trim().is_empty());

        Ok(Settings {
            bridge,
            shell,
            store,
            log_filter,
        })
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".hostbridge").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(toml: &str) -> HostbridgeConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars("hello world"), "hello world");
    }

    #[test]
    fn expand_env_vars_single_var() {
        unsafe {
            std::env::set_var("HOSTBRIDGE_TEST_PROMPT_VAR", "replaced");
        }
        let result = expand_env_vars("prefix ${HOSTBRIDGE_TEST_PROMPT_VAR} suffix");
        assert_eq!(result, "prefix replaced suffix");
        unsafe {
            std::env::remove_var("HOSTBRIDGE_TEST_PROMPT_VAR");
        }
    }

    #[test]
    fn expand_env_vars_missing_var_becomes_empty() {
        unsafe {
            std::env::remove_var("HOSTBRIDGE_MISSING_VAR");
        }
        assert_eq!(
            expand_env_vars("before ${HOSTBRIDGE_MISSING_VAR} after"),
            "before  after"
        );
    }

    #[test]
    fn expand_env_vars_unterminated_is_literal() {
        assert_eq!(expand_env_vars("cost ${oops"), "cost ${oops");
    }

    #[test]
    fn empty_config_resolves_to_defaults() {
        let settings = parse("").resolve().unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.shell.prompt(), "$ ");
        assert!(settings.bridge.wait_timeout().is_none());
    }

    #[test]
    fn full_config_resolves() {
        let settings = parse(
            r#"
            [bridge]
            wait_timeout_ms = 250

            [shell]
            prompt = "hb> "

            [store]
            latency_ms = 3

            [log]
            filter = "debug"
            "#,
        )
        .resolve()
        .unwrap();

        assert_eq!(
            settings.bridge.wait_timeout(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(settings.shell.prompt(), "hb> ");
        assert_eq!(settings.store.latency(), Duration::from_millis(3));
        assert_eq!(settings.log_filter.as_deref(), Some("debug"));
    }

    #[test]
    fn zero_timeout_is_invalid() {
        let err = parse("[bridge]\nwait_timeout_ms = 0\n")
            .resolve()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(SettingsError::ZeroWaitTimeout)
        ));
        assert!(err.path().is_none());
    }

    #[test]
    fn load_from_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let result = HostbridgeConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn load_from_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[bridge\nwait_timeout_ms = ").unwrap();

        let err = HostbridgeConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), Some(path.as_path()));
    }

    #[test]
    fn load_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[shell]\nprompt = \"> \"\n").unwrap();

        let config = HostbridgeConfig::load_from(&path).unwrap().unwrap();
        assert_eq!(config.resolve().unwrap().shell.prompt(), "> ");
    }
}
