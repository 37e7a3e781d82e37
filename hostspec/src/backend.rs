//! Backends answer questions about the host's actual state.

use crate::{HostSpecError, HostSpecResult};
use accounts::{AccountsConfig, Groups, Passwd};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

pub const DEFAULT_OS_RELEASE: &str = "/etc/os-release";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home_dir: String,
    pub shell: String,
    /// Primary group first, then supplementary groups.
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupInfo {
    pub name: String,
    pub gid: u32,
    pub members: Vec<String>,
}

#[async_trait]
pub trait HostBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// The host's os-release `ID`, e.g. `ubuntu`. `None` when unknown.
    async fn os_family(&self) -> HostSpecResult<Option<String>>;

    async fn user(&self, name: &str) -> HostSpecResult<Option<UserInfo>>;

    async fn group(&self, name: &str) -> HostSpecResult<Option<GroupInfo>>;

    async fn package_installed(&self, name: &str) -> HostSpecResult<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Query the machine the runner is executing on.
    #[default]
    Exec,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exec" => Ok(BackendKind::Exec),
            other => Err(format!("unsupported backend '{}', expected exec", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub backend: BackendKind,
    pub accounts: AccountsConfig,
    pub os_release_path: PathBuf,
    #[serde(with = "duration_secs")]
    pub command_timeout: Duration,
    /// Alternate root whose package database is queried instead of the live host's.
    pub root: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Exec,
            accounts: AccountsConfig::default(),
            os_release_path: PathBuf::from(DEFAULT_OS_RELEASE),
            command_timeout: Duration::from_secs(30),
            root: None,
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(mut self, accounts: AccountsConfig) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn with_os_release_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.os_release_path = path.into();
        self
    }

    pub fn with_command_timeout(mut self, command_timeout: Duration) -> Self {
        self.command_timeout = command_timeout;
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.command_timeout.is_zero() {
            return Err("Command timeout must be greater than 0".to_string());
        }
        if self.os_release_path.as_os_str().is_empty() {
            return Err("os-release path cannot be empty".to_string());
        }
        if self.root.as_ref().is_some_and(|root| !root.is_absolute()) {
            return Err("Root must be an absolute path".to_string());
        }
        self.accounts.validate()
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Build the backend selected by `config`.
pub fn backend_for(config: &RunnerConfig) -> HostSpecResult<Box<dyn HostBackend>> {
    config.validate().map_err(HostSpecError::InvalidConfig)?;
    match config.backend {
        BackendKind::Exec => Ok(Box::new(ExecBackend::new(config.clone()))),
    }
}

/// Fields of `os-release(5)` the runner cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: Option<String>,
    pub id_like: Vec<String>,
}

impl OsRelease {
    pub fn parse(text: &str) -> Self {
        let mut release = OsRelease::default();
        for line in text.lines().map(str::trim) {
            if line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            match key.trim() {
                "ID" if !value.is_empty() => release.id = Some(value.to_lowercase()),
                "ID_LIKE" => {
                    release.id_like = value.split_whitespace().map(str::to_lowercase).collect()
                }
                _ => {}
            }
        }
        release
    }

    /// `ID` first, then each `ID_LIKE` entry.
    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.id
            .iter()
            .chain(self.id_like.iter())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Dpkg,
    Rpm,
    Apk,
    Pacman,
}

impl PackageManager {
    pub fn for_family(family: &str) -> Option<Self> {
        match family {
            "ubuntu" | "debian" | "linuxmint" | "raspbian" | "pop" => Some(PackageManager::Dpkg),
            "redhat" | "rhel" | "centos" | "fedora" | "amzn" | "amazon" | "rocky"
            | "almalinux" | "ol" | "suse" | "opensuse" | "opensuse-leap" | "sles" => {
                Some(PackageManager::Rpm)
            }
            "alpine" => Some(PackageManager::Apk),
            "arch" | "manjaro" => Some(PackageManager::Pacman),
            _ => None,
        }
    }

    pub fn detect(release: &OsRelease) -> Option<Self> {
        release.families().find_map(Self::for_family)
    }

    /// Command line that asks whether `package` is installed, against the
    /// package database under `root` when one is given.
    pub fn query(&self, package: &str, root: Option<&Path>) -> (&'static str, Vec<String>) {
        let package = package.to_string();
        let root = root.map(|root| root.display().to_string());
        match self {
            PackageManager::Dpkg => {
                let mut args = Vec::new();
                if let Some(root) = root {
                    args.push(format!("--admindir={}/var/lib/dpkg", root.trim_end_matches('/')));
                }
                args.extend(["-f".into(), "${Status}".into(), "-W".into(), package]);
                ("dpkg-query", args)
            }
            PackageManager::Rpm => {
                let mut args = Vec::new();
                if let Some(root) = root {
                    args.extend(["--root".into(), root]);
                }
                args.extend(["-q".into(), package]);
                ("rpm", args)
            }
            PackageManager::Apk => {
                let mut args = Vec::new();
                if let Some(root) = root {
                    args.extend(["--root".into(), root]);
                }
                args.extend(["info".into(), "-e".into(), package]);
                ("apk", args)
            }
            PackageManager::Pacman => {
                let mut args = vec!["-Q".to_string()];
                if let Some(root) = root {
                    args.extend(["--root".into(), root]);
                }
                args.push(package);
                ("pacman", args)
            }
        }
    }

    pub fn is_installed(&self, output: &Output) -> bool {
        match self {
            PackageManager::Dpkg => {
                output.status.success()
                    && String::from_utf8_lossy(&output.stdout).contains("install ok installed")
            }
            PackageManager::Rpm | PackageManager::Apk | PackageManager::Pacman => {
                output.status.success()
            }
        }
    }
}

/// Runs a command to completion, killing it if it outlives `limit`.
pub async fn run_command(
    program: &str,
    args: &[String],
    limit: Duration,
) -> HostSpecResult<Output> {
    let command_line = std::iter::once(program.to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ");
    debug!("Running {}", command_line);

    let mut command = Command::new(program);
    command.args(args).kill_on_drop(true);

    match timeout(limit, command.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(HostSpecError::CommandFailed {
            command: command_line,
            reason: e.to_string(),
        }),
        Err(_) => Err(HostSpecError::CommandTimeout {
            command: command_line,
            timeout: limit,
        }),
    }
}

/// Inspects the local machine: account files through `accounts`, packages
/// through the distribution's package query tool.
pub struct ExecBackend {
    config: RunnerConfig,
}

impl ExecBackend {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    async fn os_release(&self) -> HostSpecResult<Option<OsRelease>> {
        match tokio::fs::read_to_string(&self.config.os_release_path).await {
            Ok(text) => Ok(Some(OsRelease::parse(&text))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn package_manager(&self) -> HostSpecResult<PackageManager> {
        let release = self.os_release().await?.unwrap_or_default();
        PackageManager::detect(&release).ok_or_else(|| HostSpecError::UnsupportedPlatform {
            reason: format!(
                "no known package manager for os family {:?}",
                release.id.as_deref().unwrap_or("unknown")
            ),
        })
    }

    /// The query `package_installed` runs for `name`.
    pub async fn package_query(&self, name: &str) -> HostSpecResult<(&'static str, Vec<String>)> {
        let manager = self.package_manager().await?;
        Ok(manager.query(name, self.config.root.as_deref()))
    }

    async fn read_passwd(&self) -> HostSpecResult<Passwd> {
        let text = tokio::fs::read_to_string(&self.config.accounts.passwd_path).await?;
        Ok(Passwd::parse(&text))
    }

    async fn read_groups(&self) -> HostSpecResult<Groups> {
        let text = tokio::fs::read_to_string(&self.config.accounts.group_path).await?;
        Ok(Groups::parse(&text))
    }
}

#[async_trait]
impl HostBackend for ExecBackend {
    fn name(&self) -> &'static str {
        "exec"
    }

    async fn os_family(&self) -> HostSpecResult<Option<String>> {
        Ok(self.os_release().await?.and_then(|release| release.id))
    }

    async fn user(&self, name: &str) -> HostSpecResult<Option<UserInfo>> {
        let passwd = self.read_passwd().await?;
        let Some(entry) = passwd.get(name) else {
            return Ok(None);
        };
        let groups = self.read_groups().await?;

        let mut names: Vec<String> = groups
            .get_by_gid(entry.gid)
            .map(|group| group.name.clone())
            .into_iter()
            .collect();
        for group in groups.memberships(name) {
            if !names.iter().any(|existing| existing == group) {
                names.push(group.to_string());
            }
        }

        Ok(Some(UserInfo {
            name: entry.username.clone(),
            uid: entry.uid,
            gid: entry.gid,
            home_dir: entry.home_dir.clone(),
            shell: entry.shell.clone(),
            groups: names,
        }))
    }

    async fn group(&self, name: &str) -> HostSpecResult<Option<GroupInfo>> {
        let groups = self.read_groups().await?;
        Ok(groups.get(name).map(|group| GroupInfo {
            name: group.name.clone(),
            gid: group.gid,
            members: group.members.clone(),
        }))
    }

    async fn package_installed(&self, name: &str) -> HostSpecResult<bool> {
        let manager = self.package_manager().await?;
        let (program, args) = manager.query(name, self.config.root.as_deref());
        let output = run_command(program, &args, self.config.command_timeout).await?;
        Ok(manager.is_installed(&output))
    }
}
