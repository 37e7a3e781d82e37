use crate::database::DatabaseKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_FILE_PASSWD: &str = "/etc/passwd";
pub const DEFAULT_FILE_GROUP: &str = "/etc/group";
pub const DEFAULT_FILE_SHADOW: &str = "/etc/shadow";
pub const DEFAULT_FILE_LOCK: &str = "/etc/.pwd.lock";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountsConfig {
    pub passwd_path: PathBuf,
    pub group_path: PathBuf,
    pub shadow_path: PathBuf,
    /// Lock file held from load to save.
    pub lock_path: PathBuf,
    /// Seconds to wait for another process to release `lock_path`.
    pub lock_timeout: u64,
    pub first_uid: u32,
    pub first_gid: u32,
    pub home_base: PathBuf,
    pub default_shell: String,
    pub expiry_days: Option<u32>,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            passwd_path: PathBuf::from(DEFAULT_FILE_PASSWD),
            group_path: PathBuf::from(DEFAULT_FILE_GROUP),
            shadow_path: PathBuf::from(DEFAULT_FILE_SHADOW),
            lock_path: PathBuf::from(DEFAULT_FILE_LOCK),
            lock_timeout: 15,
            first_uid: 1000,
            first_gid: 1000,
            home_base: PathBuf::from("/home"),
            default_shell: "/bin/bash".to_string(),
            expiry_days: None,
        }
    }
}

impl AccountsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-base the database and lock paths under `root`, e.g. a chroot or a
    /// test directory. `/etc/passwd` becomes `<root>/etc/passwd`.
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        self.passwd_path = rebase(root, &self.passwd_path);
        self.group_path = rebase(root, &self.group_path);
        self.shadow_path = rebase(root, &self.shadow_path);
        self.lock_path = rebase(root, &self.lock_path);
        self
    }

    pub fn with_lock_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_path = path.into();
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout.as_secs();
        self
    }

    pub fn lock_wait(&self) -> Duration {
        Duration::from_secs(self.lock_timeout)
    }

    pub fn with_passwd_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.passwd_path = path.into();
        self
    }

    pub fn with_group_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.group_path = path.into();
        self
    }

    pub fn with_shadow_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.shadow_path = path.into();
        self
    }

    pub fn with_first_uid(mut self, uid: u32) -> Self {
        self.first_uid = uid;
        self
    }

    pub fn with_first_gid(mut self, gid: u32) -> Self {
        self.first_gid = gid;
        self
    }

    pub fn with_home_base(mut self, home_base: impl Into<PathBuf>) -> Self {
        self.home_base = home_base.into();
        self
    }

    pub fn with_default_shell(mut self, shell: impl Into<String>) -> Self {
        self.default_shell = shell.into();
        self
    }

    pub fn with_expiry_days(mut self, days: u32) -> Self {
        self.expiry_days = Some(days);
        self
    }

    pub fn path_for(&self, kind: DatabaseKind) -> &Path {
        match kind {
            DatabaseKind::Passwd => &self.passwd_path,
            DatabaseKind::Group => &self.group_path,
            DatabaseKind::Shadow => &self.shadow_path,
        }
    }

    /// Home directory given to a new user when none is requested.
    pub fn home_for(&self, username: &str) -> String {
        self.home_base.join(username).display().to_string()
    }

    pub fn validate(&self) -> Result<(), String> {
        for (label, path) in [
            ("passwd", &self.passwd_path),
            ("group", &self.group_path),
            ("shadow", &self.shadow_path),
            ("lock", &self.lock_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(format!("{} path cannot be empty", label));
            }
        }

        if self.passwd_path == self.shadow_path
            || self.passwd_path == self.group_path
            || self.group_path == self.shadow_path
        {
            return Err("Database paths must be distinct".to_string());
        }

        if [&self.passwd_path, &self.group_path, &self.shadow_path].contains(&&self.lock_path) {
            return Err("Lock path must differ from the database paths".to_string());
        }

        if self.first_uid == 0 || self.first_gid == 0 {
            return Err("First allocated uid and gid must be greater than 0".to_string());
        }

        if !self.home_base.is_absolute() {
            return Err("Home base must be an absolute path".to_string());
        }

        if !self.default_shell.starts_with('/') {
            return Err("Default shell must be an absolute path".to_string());
        }

        if self.expiry_days == Some(0) {
            return Err("Expiry must be greater than 0 days".to_string());
        }

        Ok(())
    }
}

fn rebase(root: &Path, path: &Path) -> PathBuf {
    let relative = path.strip_prefix("/").unwrap_or(path);
    root.join(relative)
}
