//! The three account databases loaded together and edited as one unit.

use crate::config::AccountsConfig;
use crate::database::{validate_field, validate_name, DatabaseKind, Record};
use crate::error::{AccountsError, AccountsResult};
use crate::group::{GroupEntry, Groups};
use crate::lock::{read_with_lock, write_with_lock, DatabaseLock};
use crate::passwd::{Passwd, PasswdEntry};
use crate::shadow::{today, Shadow, ShadowEntry};
use chrono::Days;
use std::path::Path;
use tracing::{debug, info, warn};

/// Request for a new account. Unset fields fall back to the store's
/// [`AccountsConfig`].
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub comment: String,
    pub home_dir: Option<String>,
    pub shell: Option<String>,
    pub groups: Vec<String>,
    pub password: Option<String>,
}

impl NewUser {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }

    pub fn with_gid(mut self, gid: u32) -> Self {
        self.gid = Some(gid);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_home_dir(mut self, home_dir: impl Into<String>) -> Self {
        self.home_dir = Some(home_dir.into());
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = Some(shell.into());
        self
    }

    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

/// The passwd, shadow and group databases of one host.
///
/// A store returned by [`AccountStore::load`] holds the database lock until
/// it is dropped, so no other process can change the files between `load`
/// and `save`.
#[derive(Debug)]
pub struct AccountStore {
    config: AccountsConfig,
    passwd: Passwd,
    shadow: Shadow,
    groups: Groups,
    /// File contents as last read or written, used to undo a partial save.
    on_disk: Vec<(DatabaseKind, String)>,
    lock: Option<DatabaseLock>,
}

impl AccountStore {
    /// Take the database lock, then read all three databases described by
    /// `config`. The lock is held until the store is dropped.
    pub fn load(config: AccountsConfig) -> AccountsResult<Self> {
        config
            .validate()
            .map_err(|message| AccountsError::InvalidConfig { message })?;

        let lock = DatabaseLock::acquire(&config.lock_path, config.lock_wait())?;

        let passwd_text = read_with_lock(&config.passwd_path)?;
        let shadow_text = read_with_lock(&config.shadow_path)?;
        let group_text = read_with_lock(&config.group_path)?;

        let passwd = Passwd::parse(&passwd_text);
        let shadow = Shadow::parse(&shadow_text);
        let groups = Groups::parse(&group_text);

        let mut store = Self::from_parts(config, passwd, shadow, groups);
        store.on_disk = vec![
            (DatabaseKind::Passwd, passwd_text),
            (DatabaseKind::Shadow, shadow_text),
            (DatabaseKind::Group, group_text),
        ];
        store.lock = Some(lock);
        store.report_damage();
        debug!(
            "Loaded {} users, {} shadow entries, {} groups",
            store.passwd.len(),
            store.shadow.len(),
            store.groups.len()
        );
        Ok(store)
    }

    pub fn from_parts(
        config: AccountsConfig,
        passwd: Passwd,
        shadow: Shadow,
        groups: Groups,
    ) -> Self {
        Self {
            config,
            passwd,
            shadow,
            groups,
            on_disk: Vec::new(),
            lock: None,
        }
    }

    /// Write all three databases back, each under its own exclusive lock.
    ///
    /// Every database is rendered before any file is touched. When a write
    /// fails part way, the files already written get their previous contents
    /// back; a failed restore is logged and the original error returned.
    pub fn save(&mut self) -> AccountsResult<()> {
        let rendered = DatabaseKind::ALL
            .into_iter()
            .map(|kind| Ok((kind, self.render(kind)?)))
            .collect::<AccountsResult<Vec<_>>>()?;

        for (index, (kind, data)) in rendered.iter().enumerate() {
            let path = self.config.path_for(*kind);
            if let Err(e) = write_with_lock(path, data.as_bytes(), kind.default_mode()) {
                self.restore(&rendered[..index]);
                return Err(e);
            }
            debug!("Wrote {} to {}", kind, path.display());
        }

        self.on_disk = rendered;
        Ok(())
    }

    fn restore(&self, written: &[(DatabaseKind, String)]) {
        for (kind, _) in written {
            let path = self.config.path_for(*kind);
            let Some((_, previous)) = self.on_disk.iter().find(|(known, _)| known == kind) else {
                warn!("No previous copy of {}, leaving it as written", path.display());
                continue;
            };
            match write_with_lock(path, previous.as_bytes(), kind.default_mode()) {
                Ok(()) => warn!("Restored {} after a failed save", path.display()),
                Err(e) => warn!("Unable to restore {}: {}", path.display(), e),
            }
        }
    }

    /// The marshalled text of one database.
    pub fn render(&self, kind: DatabaseKind) -> AccountsResult<String> {
        match kind {
            DatabaseKind::Passwd => self.passwd.marshal(),
            DatabaseKind::Shadow => self.shadow.marshal(),
            DatabaseKind::Group => self.groups.marshal(),
        }
    }

    pub fn config(&self) -> &AccountsConfig {
        &self.config
    }

    /// Path of the database lock this store holds, if it was loaded from disk.
    pub fn lock_path(&self) -> Option<&Path> {
        self.lock.as_ref().map(DatabaseLock::path)
    }

    pub fn passwd(&self) -> &Passwd {
        &self.passwd
    }

    pub fn shadow(&self) -> &Shadow {
        &self.shadow
    }

    pub fn groups(&self) -> &Groups {
        &self.groups
    }

    pub fn user(&self, name: &str) -> Option<&PasswdEntry> {
        self.passwd.get(name)
    }

    pub fn group(&self, name: &str) -> Option<&GroupEntry> {
        self.groups.get(name)
    }

    /// Every group `name` belongs to: its primary group first, then the
    /// groups listing it as a member.
    pub fn groups_of(&self, name: &str) -> AccountsResult<Vec<String>> {
        let user = self
            .passwd
            .get(name)
            .ok_or_else(|| AccountsError::not_found("user", name))?;

        let mut names = Vec::new();
        if let Some(primary) = self.groups.get_by_gid(user.gid) {
            names.push(primary.name.clone());
        }
        for group in self.groups.memberships(name) {
            if !names.iter().any(|existing| existing == group) {
                names.push(group.to_string());
            }
        }
        Ok(names)
    }

    pub fn add_user(&mut self, request: NewUser) -> AccountsResult<PasswdEntry> {
        let name = request.name.as_str();
        validate_name(name)?;
        validate_field("comment", &request.comment)?;

        if self.passwd.contains(name) {
            return Err(AccountsError::AlreadyExists {
                kind: "user",
                name: name.to_string(),
            });
        }
        if self.shadow.contains(name) {
            return Err(AccountsError::AlreadyExists {
                kind: "shadow entry",
                name: name.to_string(),
            });
        }

        let uid = match request.uid {
            Some(uid) => {
                if let Some(owner) = self.passwd.get_by_uid(uid) {
                    return Err(AccountsError::IdInUse {
                        kind: "uid",
                        id: uid,
                        owner: owner.username.clone(),
                    });
                }
                uid
            }
            None => self
                .passwd
                .next_free_uid(self.config.first_uid)
                .ok_or(AccountsError::NoFreeId {
                    kind: "uid",
                    start: self.config.first_uid,
                })?,
        };

        for group in &request.groups {
            let entry = self
                .groups
                .get(group)
                .ok_or_else(|| AccountsError::not_found("group", group.as_str()))?;
            ensure_intact(entry)?;
        }

        let private_group = match request.gid {
            Some(gid) => {
                if self.groups.get_by_gid(gid).is_none() {
                    return Err(AccountsError::not_found("group", gid.to_string()));
                }
                None
            }
            None => {
                if self.groups.contains(name) {
                    return Err(AccountsError::AlreadyExists {
                        kind: "group",
                        name: name.to_string(),
                    });
                }
                let gid = if self.groups.get_by_gid(uid).is_none() {
                    uid
                } else {
                    self.groups
                        .next_free_gid(self.config.first_gid)
                        .ok_or(AccountsError::NoFreeId {
                            kind: "gid",
                            start: self.config.first_gid,
                        })?
                };
                Some(GroupEntry::new(name, gid))
            }
        };
        let gid = request
            .gid
            .or(private_group.as_ref().map(|group| group.gid))
            .unwrap_or(uid);

        let home_dir = request
            .home_dir
            .clone()
            .unwrap_or_else(|| self.config.home_for(name));
        let shell = request
            .shell
            .clone()
            .unwrap_or_else(|| self.config.default_shell.clone());
        validate_field("home directory", &home_dir)?;
        validate_field("shell", &shell)?;

        let mut shadow_entry = ShadowEntry::locked(name);
        if let Some(password) = &request.password {
            shadow_entry.set_password(password)?;
        }
        if let Some(days) = self.config.expiry_days {
            shadow_entry.expiration = today().checked_add_days(Days::new(u64::from(days)));
        }

        // Everything is validated; from here on nothing can fail.
        let entry = PasswdEntry::new(name, uid, gid, request.comment.clone(), home_dir, shell);
        self.passwd.insert(entry.clone());
        self.shadow.insert(shadow_entry);
        if let Some(group) = private_group {
            info!("Created group {} ({})", group.name, group.gid);
            self.groups.insert(group);
        }
        for group in &request.groups {
            if let Some(group) = self.groups.get_mut(group) {
                if !group.has_member(name) {
                    group.members.push(name.to_string());
                }
            }
        }

        info!(
            "Created user {} (uid {}, gid {})",
            entry.username, entry.uid, entry.gid
        );
        Ok(entry)
    }

    pub fn remove_user(&mut self, name: &str) -> AccountsResult<PasswdEntry> {
        self.require_user(name)?;
        for group in self.groups.iter().filter(|group| group.has_member(name)) {
            ensure_intact(group)?;
        }

        let removed = self.passwd.remove(name)?;

        if let Err(e) = self.shadow.remove(name) {
            warn!("User {} had no shadow entry: {}", name, e);
        }

        for group in self.groups.iter_mut() {
            if group.remove_member(name).is_ok() {
                debug!("Removed {} from group {}", name, group.name);
            }
        }

        let private_group_unused = self.groups.get(name).is_some_and(|group| {
            !removed.has_invalid_number("gid")
                && !group.is_damaged()
                && group.gid == removed.gid
                && group.members.is_empty()
                && self.passwd.with_primary_gid(group.gid).next().is_none()
        });
        if private_group_unused {
            self.groups.remove(name)?;
            info!("Removed group {}", name);
        }

        info!("Removed user {} (uid {})", removed.username, removed.uid);
        Ok(removed)
    }

    pub fn set_password(&mut self, name: &str, password: &str) -> AccountsResult<()> {
        self.shadow_entry_mut(name)?.set_password(password)?;
        info!("Updated password for {}", name);
        Ok(())
    }

    pub fn lock_password(&mut self, name: &str) -> AccountsResult<()> {
        self.shadow_entry_mut(name)?.lock();
        info!("Locked password for {}", name);
        Ok(())
    }

    pub fn unlock_password(&mut self, name: &str) -> AccountsResult<()> {
        self.shadow_entry_mut(name)?.unlock();
        info!("Unlocked password for {}", name);
        Ok(())
    }

    pub fn add_group(&mut self, name: &str, gid: Option<u32>) -> AccountsResult<GroupEntry> {
        validate_name(name)?;
        if self.groups.contains(name) {
            return Err(AccountsError::AlreadyExists {
                kind: "group",
                name: name.to_string(),
            });
        }

        let gid = match gid {
            Some(gid) => {
                if let Some(owner) = self.groups.get_by_gid(gid) {
                    return Err(AccountsError::IdInUse {
                        kind: "gid",
                        id: gid,
                        owner: owner.name.clone(),
                    });
                }
                gid
            }
            None => self
                .groups
                .next_free_gid(self.config.first_gid)
                .ok_or(AccountsError::NoFreeId {
                    kind: "gid",
                    start: self.config.first_gid,
                })?,
        };

        let group = GroupEntry::new(name, gid);
        self.groups.insert(group.clone());
        info!("Created group {} ({})", name, gid);
        Ok(group)
    }

    pub fn remove_group(&mut self, name: &str) -> AccountsResult<GroupEntry> {
        let group = self
            .groups
            .get(name)
            .ok_or_else(|| AccountsError::not_found("group", name))?;
        let gid = group.gid;

        // A gid that did not parse cannot be anyone's primary group.
        if !group.has_invalid_number("gid") {
            if let Some(user) = self.passwd.with_primary_gid(gid).next() {
                return Err(AccountsError::InUse {
                    group: name.to_string(),
                    user: user.username.clone(),
                });
            }
        }

        let removed = self.groups.remove(name)?;
        info!("Removed group {} ({})", name, gid);
        Ok(removed)
    }

    pub fn add_member(&mut self, group: &str, user: &str) -> AccountsResult<()> {
        self.require_user(user)?;
        self.intact_group_mut(group)?.add_member(user)?;
        info!("Added {} to group {}", user, group);
        Ok(())
    }

    pub fn remove_member(&mut self, group: &str, user: &str) -> AccountsResult<()> {
        self.intact_group_mut(group)?.remove_member(user)?;
        info!("Removed {} from group {}", user, group);
        Ok(())
    }

    fn require_user(&self, name: &str) -> AccountsResult<()> {
        if self.passwd.contains(name) {
            Ok(())
        } else {
            Err(AccountsError::not_found("user", name))
        }
    }

    /// The shadow entry for `name`, created locked when passwd has the user
    /// but shadow does not.
    fn shadow_entry_mut(&mut self, name: &str) -> AccountsResult<&mut ShadowEntry> {
        self.require_user(name)?;
        if !self.shadow.contains(name) {
            warn!("User {} had no shadow entry, creating one", name);
            self.shadow.insert(ShadowEntry::locked(name));
        }
        let entry = self
            .shadow
            .get_mut(name)
            .ok_or_else(|| AccountsError::not_found("shadow entry", name))?;
        ensure_intact(&*entry)?;
        Ok(entry)
    }

    fn intact_group_mut(&mut self, name: &str) -> AccountsResult<&mut GroupEntry> {
        let group = self
            .groups
            .get_mut(name)
            .ok_or_else(|| AccountsError::not_found("group", name))?;
        ensure_intact(&*group)?;
        Ok(group)
    }

    fn report_damage(&self) {
        for entry in self.passwd.damaged() {
            for issue in &entry.issues {
                warn!("passwd entry '{}': {}", entry.username, issue);
            }
        }
        for entry in self.shadow.damaged() {
            for issue in &entry.issues {
                warn!("shadow entry '{}': {}", entry.username, issue);
            }
        }
        for entry in self.groups.damaged() {
            for issue in &entry.issues {
                warn!("group entry '{}': {}", entry.name, issue);
            }
        }
    }
}

/// Damaged entries are written back verbatim, so edits to them would be lost.
fn ensure_intact<R: Record>(entry: &R) -> AccountsResult<()> {
    if entry.is_damaged() {
        return Err(AccountsError::Damaged {
            kind: R::KIND,
            name: entry.key().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> AccountStore {
        AccountStore::from_parts(
            AccountsConfig::default(),
            Passwd::parse(
                "root:x:0:0:root:/root:/bin/bash\nalice:x:1000:1000:Alice:/home/alice:/bin/zsh\n",
            ),
            Shadow::parse("root:*:19000:0:99999:7:::\nalice:!:19000:0:99999:7:::\n"),
            Groups::parse("root:x:0:\nwheel:x:10:alice\nalice:x:1000:\n"),
        )
    }

    #[test]
    fn test_add_user_with_defaults() {
        let mut store = sample_store();
        let entry = store.add_user(NewUser::new("bob")).unwrap();

        assert_eq!(entry.uid, 1001);
        assert_eq!(entry.gid, 1001);
        assert_eq!(entry.home_dir, "/home/bob");
        assert_eq!(entry.shell, "/bin/bash");
        assert_eq!(entry.password, "x");

        assert_eq!(store.group("bob").unwrap().gid, 1001);
        let shadow = store.shadow().get("bob").unwrap();
        assert!(shadow.is_locked());
        assert_eq!(shadow.last_change, Some(today()));
        assert!(shadow.expiration.is_none());
    }

    #[test]
    fn test_add_user_with_explicit_fields() {
        let mut store = sample_store();
        let request = NewUser::new("splug")
            .with_uid(500)
            .with_comment("Splug")
            .with_home_dir("/home/splug")
            .with_shell("/bin/bash")
            .with_groups(vec!["wheel".to_string()])
            .with_password("hunter2");

        let entry = store.add_user(request).unwrap();
        assert_eq!(entry.uid, 500);
        assert_eq!(entry.gid, 500);
        assert_eq!(entry.info, "Splug");

        assert!(store.group("wheel").unwrap().has_member("splug"));
        assert_eq!(
            store.groups_of("splug").unwrap(),
            vec!["splug".to_string(), "wheel".to_string()]
        );
        assert!(store
            .shadow()
            .get("splug")
            .unwrap()
            .password
            .starts_with("$6$"));
    }

    #[test]
    fn test_add_user_rejections_leave_store_untouched() {
        let mut store = sample_store();
        let before = store.render(DatabaseKind::Passwd).unwrap();

        assert!(matches!(
            store.add_user(NewUser::new("alice")),
            Err(AccountsError::AlreadyExists { kind: "user", .. })
        ));
        assert!(matches!(
            store.add_user(NewUser::new("carol").with_uid(0)),
            Err(AccountsError::IdInUse { kind: "uid", id: 0, .. })
        ));
        assert!(matches!(
            store.add_user(NewUser::new("carol").with_groups(vec!["missing".to_string()])),
            Err(AccountsError::NotFound { kind: "group", .. })
        ));
        assert!(matches!(
            store.add_user(NewUser::new("carol").with_gid(4242)),
            Err(AccountsError::NotFound { kind: "group", .. })
        ));
        assert!(matches!(
            store.add_user(NewUser::new("bad:name")),
            Err(AccountsError::InvalidName { .. })
        ));
        assert!(matches!(
            store.add_user(NewUser::new("carol").with_shell("/bin/sh:evil")),
            Err(AccountsError::InvalidEntry { .. })
        ));

        assert_eq!(store.render(DatabaseKind::Passwd).unwrap(), before);
        assert!(store.group("carol").is_none());
    }

    #[test]
    fn test_add_user_with_existing_primary_group() {
        let mut store = sample_store();
        let entry = store.add_user(NewUser::new("carol").with_gid(10)).unwrap();
        assert_eq!(entry.gid, 10);
        assert!(store.group("carol").is_none());
    }

    #[test]
    fn test_add_user_picks_free_gid_when_uid_gid_taken() {
        let mut store = sample_store();
        store.add_group("builders", Some(1001)).unwrap();

        let entry = store.add_user(NewUser::new("bob")).unwrap();
        assert_eq!(entry.uid, 1001);
        assert_eq!(entry.gid, 1002);
    }

    #[test]
    fn test_add_user_applies_expiry() {
        let mut store = sample_store();
        store.config = store.config.clone().with_expiry_days(30);

        store.add_user(NewUser::new("temp")).unwrap();
        let expiration = store.shadow().get("temp").unwrap().expiration.unwrap();
        assert_eq!(expiration, today() + Days::new(30));
    }

    #[test]
    fn test_remove_user() {
        let mut store = sample_store();
        let removed = store.remove_user("alice").unwrap();

        assert_eq!(removed.uid, 1000);
        assert!(store.user("alice").is_none());
        assert!(store.shadow().get("alice").is_none());
        assert!(store.group("alice").is_none());
        assert!(!store.group("wheel").unwrap().has_member("alice"));

        assert!(matches!(
            store.remove_user("alice"),
            Err(AccountsError::NotFound { kind: "user", .. })
        ));
    }

    #[test]
    fn test_remove_user_keeps_shared_group() {
        let mut store = sample_store();
        store.add_user(NewUser::new("bob").with_gid(1000)).unwrap();

        store.remove_user("alice").unwrap();
        assert!(store.group("alice").is_some());
    }

    #[test]
    fn test_passwords() {
        let mut store = sample_store();

        store.set_password("alice", "wonderland").unwrap();
        let entry = store.shadow().get("alice").unwrap();
        assert!(crate::crypt::verify_password("wonderland", &entry.password));

        store.lock_password("alice").unwrap();
        assert!(store.shadow().get("alice").unwrap().is_locked());
        store.unlock_password("alice").unwrap();
        assert!(!store.shadow().get("alice").unwrap().is_locked());

        assert!(matches!(
            store.set_password("nobody", "x"),
            Err(AccountsError::NotFound { kind: "user", .. })
        ));
    }

    #[test]
    fn test_set_password_creates_missing_shadow_entry() {
        let mut store = sample_store();
        store.shadow = Shadow::new();

        store.set_password("alice", "wonderland").unwrap();
        assert!(store.shadow().get("alice").is_some());
    }

    fn damaged_store() -> AccountStore {
        AccountStore::from_parts(
            AccountsConfig::default(),
            Passwd::parse(
                "root:x:0:0:root:/root:/bin/bash\nnobody:x:-2:-2:Unprivileged:/var/empty:/usr/bin/false\nalice:x:1000:1000::/home/alice:/bin/bash\n",
            ),
            Shadow::parse("root:*:19000:0:99999:7:::\nalice:$6$salt$hash:later:0:99999:7:::\n"),
            Groups::parse("root:x:0:\nnogroup:x:-2:alice\nalice:x:1000:\n"),
        )
    }

    #[test]
    fn test_unparsed_ids_never_collide() {
        let mut store = damaged_store();
        assert!(store.passwd().get_by_uid(0).is_some_and(|user| user.username == "root"));
        assert_eq!(store.passwd().with_primary_gid(0).count(), 1);
        assert!(store.groups().get_by_gid(0).is_some_and(|group| group.name == "root"));

        match store.add_user(NewUser::new("splug").with_uid(0)) {
            Err(AccountsError::IdInUse { owner, .. }) => assert_eq!(owner, "root"),
            other => panic!("unexpected result: {:?}", other),
        }

        store.remove_group("nogroup").unwrap();
        assert!(store.group("nogroup").is_none());
    }

    #[test]
    fn test_damaged_entries_are_not_edited() {
        let mut store = damaged_store();
        let shadow_before = store.render(DatabaseKind::Shadow).unwrap();
        let group_before = store.render(DatabaseKind::Group).unwrap();

        assert!(matches!(
            store.set_password("alice", "wonderland"),
            Err(AccountsError::Damaged { kind: "shadow entry", .. })
        ));
        assert!(matches!(
            store.lock_password("alice"),
            Err(AccountsError::Damaged { .. })
        ));
        assert!(matches!(
            store.add_member("nogroup", "root"),
            Err(AccountsError::Damaged { kind: "group", .. })
        ));
        assert!(matches!(
            store.remove_member("nogroup", "alice"),
            Err(AccountsError::Damaged { .. })
        ));
        assert!(matches!(
            store.add_user(NewUser::new("bob").with_groups(vec!["nogroup".to_string()])),
            Err(AccountsError::Damaged { .. })
        ));
        assert!(matches!(
            store.remove_user("alice"),
            Err(AccountsError::Damaged { .. })
        ));

        assert!(store.user("alice").is_some());
        assert!(store.user("bob").is_none());
        assert_eq!(store.render(DatabaseKind::Shadow).unwrap(), shadow_before);
        assert_eq!(store.render(DatabaseKind::Group).unwrap(), group_before);
    }

    #[test]
    fn test_group_management() {
        let mut store = sample_store();

        let docker = store.add_group("docker", None).unwrap();
        assert_eq!(docker.gid, 1001);
        assert!(matches!(
            store.add_group("docker", None),
            Err(AccountsError::AlreadyExists { kind: "group", .. })
        ));
        assert!(matches!(
            store.add_group("other", Some(10)),
            Err(AccountsError::IdInUse { kind: "gid", .. })
        ));

        store.add_member("docker", "alice").unwrap();
        assert!(matches!(
            store.add_member("docker", "alice"),
            Err(AccountsError::AlreadyMember { .. })
        ));
        assert!(matches!(
            store.add_member("docker", "ghost"),
            Err(AccountsError::NotFound { kind: "user", .. })
        ));
        store.remove_member("docker", "alice").unwrap();

        assert!(matches!(
            store.remove_group("alice"),
            Err(AccountsError::InUse { .. })
        ));
        store.remove_group("docker").unwrap();
        assert!(store.group("docker").is_none());
    }
}
