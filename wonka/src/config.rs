use crate::error::{WonkaError, WonkaResult};
use accounts::AccountsConfig;
use hostspec::RunnerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable consulted when `--config` is not given.
pub const CONFIG_ENV: &str = "WONKA_CONFIG";

/// Contents of a wonka TOML configuration file.
///
/// ```toml
/// [accounts]
/// first_uid = 500
/// expiry_days = 90
///
/// [runner]
/// command_timeout = 10
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WonkaConfig {
    pub accounts: AccountsConfig,
    pub runner: RunnerSection,
}

/// Runner settings; account file locations come from `[accounts]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSection {
    pub backend: hostspec::BackendKind,
    pub os_release_path: PathBuf,
    pub command_timeout: u64,
    /// Root whose package database is queried; set by `--root`.
    pub root: Option<PathBuf>,
}

impl Default for RunnerSection {
    fn default() -> Self {
        let defaults = RunnerConfig::default();
        Self {
            backend: defaults.backend,
            os_release_path: defaults.os_release_path,
            command_timeout: defaults.command_timeout.as_secs(),
            root: defaults.root,
        }
    }
}

impl WonkaConfig {
    pub fn load(path: &Path) -> WonkaResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| WonkaError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: WonkaConfig = toml::from_str(&text).map_err(|e| WonkaError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `explicit` if given, else the file named by `$WONKA_CONFIG`, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> WonkaResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    /// Re-base every host path under `root`, and query packages there too.
    pub fn with_root(mut self, root: &Path) -> Self {
        self.accounts = self.accounts.with_root(root);
        self.runner.root = Some(root.to_path_buf());
        let relative = self
            .runner
            .os_release_path
            .strip_prefix("/")
            .unwrap_or(&self.runner.os_release_path)
            .to_path_buf();
        self.runner.os_release_path = root.join(relative);
        self
    }

    pub fn with_os_release_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.runner.os_release_path = path.into();
        self
    }

    pub fn runner_config(&self) -> RunnerConfig {
        let mut config = RunnerConfig::new()
            .with_accounts(self.accounts.clone())
            .with_os_release_path(self.runner.os_release_path.clone())
            .with_command_timeout(std::time::Duration::from_secs(self.runner.command_timeout));
        config.backend = self.runner.backend;
        config.root = self.runner.root.clone();
        config
    }

    pub fn validate(&self) -> WonkaResult<()> {
        self.runner_config()
            .validate()
            .map_err(WonkaError::InvalidConfig)
    }
}
