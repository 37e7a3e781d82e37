use crate::database::{parse_number, Database, Record};
use crate::error::{AccountsResult, ParseIssue};

const FIELDS: usize = 7;

/// Placeholder stored in passwd when the real hash lives in shadow.
pub const SHADOWED_PASSWORD: &str = "x";

pub type Passwd = Database<PasswdEntry>;

/// One line of `/etc/passwd`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PasswdEntry {
    pub username: String,
    pub password: String,
    pub uid: u32,
    pub gid: u32,
    pub info: String,
    pub home_dir: String,
    pub shell: String,
    pub issues: Vec<ParseIssue>,
    pub raw_line: Option<String>,
}

impl PasswdEntry {
    pub fn new(
        username: impl Into<String>,
        uid: u32,
        gid: u32,
        info: impl Into<String>,
        home_dir: impl Into<String>,
        shell: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: SHADOWED_PASSWORD.to_string(),
            uid,
            gid,
            info: info.into(),
            home_dir: home_dir.into(),
            shell: shell.into(),
            issues: Vec::new(),
            raw_line: None,
        }
    }
}

impl Record for PasswdEntry {
    const DATABASE: &'static str = "passwd";
    const KIND: &'static str = "user";

    fn key(&self) -> &str {
        &self.username
    }

    fn parse_line(line: &str) -> Self {
        let parts: Vec<&str> = line.split(':').collect();
        let mut issues = Vec::new();

        if parts.len() < FIELDS {
            issues.push(ParseIssue::TooFewFields {
                database: Self::DATABASE,
                expected: FIELDS,
            });
        }

        let username = parts[0].to_string();
        if username.is_empty() {
            issues.push(ParseIssue::EmptyField { field: "username" });
        }

        let password = parts.get(1).copied().unwrap_or_default().to_string();
        if password != SHADOWED_PASSWORD {
            issues.push(ParseIssue::PasswordNotShadowed);
        }

        let uid = parse_number(parts.get(2).copied(), "uid", &mut issues);
        let gid = parse_number(parts.get(3).copied(), "gid", &mut issues);

        let mut text_field = |index: usize, field: &'static str| match parts.get(index) {
            Some(value) => value.to_string(),
            None => {
                issues.push(ParseIssue::MissingField { field });
                String::new()
            }
        };
        let info = text_field(4, "info");
        let home_dir = text_field(5, "homedir");
        let shell = text_field(6, "shell");

        if parts.len() > FIELDS {
            issues.push(ParseIssue::TooManyFields {
                database: Self::DATABASE,
                expected: FIELDS,
            });
        }

        Self {
            username,
            password,
            uid,
            gid,
            info,
            home_dir,
            shell,
            raw_line: (!issues.is_empty()).then(|| line.to_string()),
            issues,
        }
    }

    fn render(&self) -> AccountsResult<String> {
        Ok(format!(
            "{}:{}:{}:{}:{}:{}:{}",
            self.username,
            self.password,
            self.uid,
            self.gid,
            self.info,
            self.home_dir,
            self.shell,
        ))
    }

    fn issues(&self) -> &[ParseIssue] {
        &self.issues
    }

    fn raw_line(&self) -> Option<&str> {
        self.raw_line.as_deref()
    }
}

impl Passwd {
    /// Entries whose uid field did not parse never match.
    pub fn get_by_uid(&self, uid: u32) -> Option<&PasswdEntry> {
        self.iter()
            .find(|entry| entry.uid == uid && !entry.has_invalid_number("uid"))
    }

    /// Users whose primary group is `gid`.
    pub fn with_primary_gid(&self, gid: u32) -> impl Iterator<Item = &PasswdEntry> {
        self.iter()
            .filter(move |entry| entry.gid == gid && !entry.has_invalid_number("gid"))
    }

    /// Lowest uid at or above `start` that no entry uses.
    pub fn next_free_uid(&self, start: u32) -> Option<u32> {
        (start..u32::MAX).find(|uid| self.get_by_uid(*uid).is_none())
    }
}
