use crate::database::{parse_number, Database, Record};
use crate::error::{AccountsError, AccountsResult, ParseIssue};

const FIELDS: usize = 4;

pub type Groups = Database<GroupEntry>;

/// One line of `/etc/group`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupEntry {
    pub name: String,
    pub password: String,
    pub gid: u32,
    pub members: Vec<String>,
    pub issues: Vec<ParseIssue>,
    pub raw_line: Option<String>,
}

impl GroupEntry {
    pub fn new(name: impl Into<String>, gid: u32) -> Self {
        Self {
            name: name.into(),
            password: "x".to_string(),
            gid,
            members: Vec::new(),
            issues: Vec::new(),
            raw_line: None,
        }
    }

    pub fn has_member(&self, user: &str) -> bool {
        self.members.iter().any(|member| member == user)
    }

    pub fn add_member(&mut self, user: &str) -> AccountsResult<()> {
        if self.has_member(user) {
            return Err(AccountsError::AlreadyMember {
                group: self.name.clone(),
                user: user.to_string(),
            });
        }
        self.members.push(user.to_string());
        Ok(())
    }

    pub fn remove_member(&mut self, user: &str) -> AccountsResult<()> {
        let position = self
            .members
            .iter()
            .position(|member| member == user)
            .ok_or_else(|| AccountsError::not_found("group member", user))?;
        self.members.remove(position);
        Ok(())
    }
}

impl Record for GroupEntry {
    const DATABASE: &'static str = "group";
    const KIND: &'static str = "group";

    fn key(&self) -> &str {
        &self.name
    }

    fn parse_line(line: &str) -> Self {
        let parts: Vec<&str> = line.split(':').collect();
        let mut issues = Vec::new();

        if parts.len() < FIELDS {
            issues.push(ParseIssue::TooFewFields {
                database: Self::DATABASE,
                expected: FIELDS,
            });
        } else if parts.len() > FIELDS {
            issues.push(ParseIssue::TooManyFields {
                database: Self::DATABASE,
                expected: FIELDS,
            });
        }

        let name = parts[0].to_string();
        if name.is_empty() {
            issues.push(ParseIssue::EmptyField { field: "name" });
        }

        let password = parts.get(1).copied().unwrap_or_default().to_string();
        let gid = parse_number(parts.get(2).copied(), "gid", &mut issues);

        let members = parts
            .get(3)
            .map(|field| {
                field
                    .split(',')
                    .map(str::trim)
                    .filter(|member| !member.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name,
            password,
            gid,
            members,
            raw_line: (!issues.is_empty()).then(|| line.to_string()),
            issues,
        }
    }

    fn render(&self) -> AccountsResult<String> {
        Ok(format!(
            "{}:{}:{}:{}",
            self.name,
            self.password,
            self.gid,
            self.members.join(","),
        ))
    }

    fn issues(&self) -> &[ParseIssue] {
        &self.issues
    }

    fn raw_line(&self) -> Option<&str> {
        self.raw_line.as_deref()
    }
}

impl Groups {
    pub fn get_by_gid(&self, gid: u32) -> Option<&GroupEntry> {
        self.iter()
            .find(|group| group.gid == gid && !group.has_invalid_number("gid"))
    }

    /// Lowest gid at or above `start` that no group uses.
    pub fn next_free_gid(&self, start: u32) -> Option<u32> {
        (start..u32::MAX).find(|gid| self.get_by_gid(*gid).is_none())
    }

    /// Names of the groups listing `user` as a supplementary member.
    pub fn memberships<'a>(&'a self, user: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.iter()
            .filter(move |group| group.has_member(user))
            .map(|group| group.name.as_str())
    }
}
