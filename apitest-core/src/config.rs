//! Runtime configuration for a test run.
//!
//! Configuration is loaded from a TOML file exactly once at suite startup and
//! is readable from every suite afterwards:
//!
//! ```toml
//! [application]
//! url = "https://demoqa.com"
//!
//! [report]
//! path = "target/report.json"
//! ```
//!
//! Any other top-level keys land in a free-form map with typed accessors.
//! `APITEST_<KEY>` environment variables override those free-form values, and
//! `APITEST_CONFIG` overrides the config file path itself (it is never
//! treated as a config value).

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};
use toml::Value as TomlValue;
use tracing::*;

use crate::{Error, Result};

/// Environment variable name for specifying the config file path.
pub const APITEST_CONFIG_ENV: &str = "APITEST_CONFIG";

const ENV_PREFIX: &str = "APITEST_";

static STORE: Lazy<Store> = Lazy::new(Store::default);

/// The resolved runtime configuration. Immutable after load.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub application: Application,
    #[serde(default)]
    pub report: Report,
    /// Free-form keys and values specified by the user.
    #[serde(flatten)]
    pub data: HashMap<String, TomlValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Application {
    /// Base URL of the service under test.
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Report {
    #[serde(default = "Report::default_path")]
    pub path: PathBuf,
}

impl Default for Report {
    fn default() -> Report {
        Report {
            path: Report::default_path(),
        }
    }
}

impl Report {
    fn default_path() -> PathBuf {
        PathBuf::from("target/report.json")
    }
}

impl Config {
    pub fn get(&self, key: impl AsRef<str>) -> Result<&TomlValue> {
        let key = key.as_ref();
        self.data
            .get(key)
            .ok_or_else(|| Error::ValueNotFound(key.to_string()))
    }

    pub fn get_str(&self, key: impl AsRef<str>) -> Result<&str> {
        let key = key.as_ref();
        self.get(key)?
            .as_str()
            .ok_or_else(|| Error::ValueNotFound(key.to_string()))
    }

    pub fn get_int(&self, key: impl AsRef<str>) -> Result<i64> {
        let key = key.as_ref();
        match self.get(key)? {
            TomlValue::Integer(n) => Ok(*n),
            TomlValue::String(s) => s
                .parse()
                .map_err(|_| Error::ValueNotFound(key.to_string())),
            _ => Err(Error::ValueNotFound(key.to_string())),
        }
    }

    pub fn get_bool(&self, key: impl AsRef<str>) -> Result<bool> {
        let key = key.as_ref();
        match self.get(key)? {
            TomlValue::Boolean(b) => Ok(*b),
            TomlValue::String(s) => s
                .parse()
                .map_err(|_| Error::ValueNotFound(key.to_string())),
            _ => Err(Error::ValueNotFound(key.to_string())),
        }
    }

    /// Merge `APITEST_<KEY>` environment variables into the free-form map.
    /// `APITEST_CONFIG` is reserved for the config file path and skipped.
    fn load_env(&mut self) {
        let vars: HashMap<_, _> = std::env::vars()
            .filter_map(|(k, v)| {
                if k == APITEST_CONFIG_ENV {
                    return None;
                }
                let key = k.strip_prefix(ENV_PREFIX)?;
                Some((key.to_lowercase(), TomlValue::String(v)))
            })
            .collect();
        if !vars.is_empty() {
            debug!("configuration overrides loaded from env: {vars:?}");
        }
        self.data.extend(vars);
    }
}

/// Holder for the process-wide current configuration. Factored out of the
/// static so the load/current contract is testable in isolation.
#[derive(Default)]
struct Store {
    current: RwLock<Option<Arc<Config>>>,
}

impl Store {
    fn load(&self, path: &Path) -> Result<Arc<Config>> {
        let buf = std::fs::read_to_string(path).map_err(|e| {
            Error::LoadError(format!("cannot read {}: {e}", path.display()))
        })?;

        let mut cfg: Config = toml::from_str(&buf).map_err(|e| {
            Error::LoadError(format!("cannot parse {}: {e}", path.display()))
        })?;
        cfg.load_env();

        debug!("configuration loaded from {}: {cfg:?}", path.display());

        let cfg = Arc::new(cfg);
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // last load wins, no merge
        *guard = Some(cfg.clone());
        Ok(cfg)
    }

    fn current(&self) -> Result<Arc<Config>> {
        self.current
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
            .ok_or(Error::NotLoaded)
    }
}

/// Load the runtime configuration from `path` and make it the process-wide
/// current configuration. A `.env` file, if present, is applied first so that
/// `APITEST_<KEY>` overrides picked up from it take effect.
pub fn load(path: impl AsRef<Path>) -> Result<Arc<Config>> {
    let _ = dotenv::dotenv();
    STORE.load(path.as_ref())
}

/// Resolve the config file path: `APITEST_CONFIG` if set, `default` otherwise.
pub fn resolve_path(default: impl Into<PathBuf>) -> PathBuf {
    std::env::var(APITEST_CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| default.into())
}

/// The most recently loaded configuration.
pub fn current() -> Result<Arc<Config>> {
    STORE.current()
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn current_before_load_fails() {
        let store = Store::default();
        assert!(matches!(store.current(), Err(Error::NotLoaded)));
    }

    #[test]
    fn load_then_current() {
        let file = write_config(
            r#"
            [application]
            url = "https://api.example.com"
            "#,
        );
        let store = Store::default();
        store.load(file.path()).unwrap();

        let cfg = store.current().unwrap();
        assert_eq!(cfg.application.url, "https://api.example.com");
        assert_eq!(cfg.report.path, PathBuf::from("target/report.json"));
    }

    #[test]
    fn last_load_wins() {
        let first = write_config("[application]\nurl = \"https://first.example.com\"\n");
        let second = write_config("[application]\nurl = \"https://second.example.com\"\n");

        let store = Store::default();
        store.load(first.path()).unwrap();
        store.load(second.path()).unwrap();

        let cfg = store.current().unwrap();
        assert_eq!(cfg.application.url, "https://second.example.com");
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let store = Store::default();
        let result = store.load(Path::new("/nonexistent/apitest.toml"));
        assert!(matches!(result, Err(Error::LoadError(_))));
    }

    #[test]
    fn free_form_keys_are_typed() {
        let file = write_config(
            r#"
            account_key = "account_01"
            request_timeout = 30
            verbose = true

            [application]
            url = "https://api.example.com"
            "#,
        );
        let store = Store::default();
        let cfg = store.load(file.path()).unwrap();

        assert_eq!(cfg.get_str("account_key").unwrap(), "account_01");
        assert_eq!(cfg.get_int("request_timeout").unwrap(), 30);
        assert!(cfg.get_bool("verbose").unwrap());
        assert!(matches!(
            cfg.get_str("unknown"),
            Err(Error::ValueNotFound(_))
        ));
    }

    #[test]
    #[serial_test::serial]
    fn env_overrides_free_form_keys() {
        std::env::set_var("APITEST_ACCOUNT_KEY", "account_02");
        let file = write_config(
            r#"
            account_key = "account_01"

            [application]
            url = "https://api.example.com"
            "#,
        );
        let store = Store::default();
        let cfg = store.load(file.path()).unwrap();
        std::env::remove_var("APITEST_ACCOUNT_KEY");

        assert_eq!(cfg.get_str("account_key").unwrap(), "account_02");
    }

    #[test]
    #[serial_test::serial]
    fn resolve_path_prefers_env() {
        std::env::set_var(APITEST_CONFIG_ENV, "/etc/apitest/custom.toml");
        let path = resolve_path("apitest.toml");
        std::env::remove_var(APITEST_CONFIG_ENV);

        assert_eq!(path, PathBuf::from("/etc/apitest/custom.toml"));
        assert_eq!(resolve_path("apitest.toml"), PathBuf::from("apitest.toml"));
    }
}
