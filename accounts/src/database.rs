//! Generic line-oriented account database.
//!
//! passwd, shadow and group files share the same shape: one record per line,
//! colon separated fields, `#` comments and blank lines ignored. Each record
//! type implements [`Record`] and gets the parse, marshal and lookup
//! operations from [`Database`].

use crate::error::{AccountsError, AccountsResult, ParseIssue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three account databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Passwd,
    Shadow,
    Group,
}

impl DatabaseKind {
    pub const ALL: [DatabaseKind; 3] = [Self::Passwd, Self::Shadow, Self::Group];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passwd => "passwd",
            Self::Shadow => "shadow",
            Self::Group => "group",
        }
    }

    /// Permissions for a database file that does not exist yet.
    pub fn default_mode(&self) -> u32 {
        match self {
            Self::Passwd | Self::Group => 0o644,
            Self::Shadow => 0o640,
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passwd" => Ok(Self::Passwd),
            "shadow" => Ok(Self::Shadow),
            "group" | "groups" => Ok(Self::Group),
            other => Err(format!(
                "unknown database '{}', expected passwd, shadow or group",
                other
            )),
        }
    }
}

pub trait Record: Sized {
    /// Name used in messages and parse issues, e.g. `"passwd"`.
    const DATABASE: &'static str;
    /// Human readable kind of the record, e.g. `"user"`.
    const KIND: &'static str;

    fn key(&self) -> &str;

    fn parse_line(line: &str) -> Self;

    fn render(&self) -> AccountsResult<String>;

    fn issues(&self) -> &[ParseIssue];

    /// The line as read, kept only for entries that did not parse cleanly.
    fn raw_line(&self) -> Option<&str>;

    fn is_damaged(&self) -> bool {
        !self.issues().is_empty()
    }

    /// Whether the numeric `field` failed to parse and holds a placeholder.
    fn has_invalid_number(&self, field: &str) -> bool {
        self.issues()
            .iter()
            .any(|issue| matches!(issue, ParseIssue::InvalidNumber { field: f } if *f == field))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Database<R> {
    entries: Vec<R>,
}

impl<R> Default for Database<R> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<R: Record> Database<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<R>) -> Self {
        Self { entries }
    }

    /// Parse a whole database file. Never fails: damaged lines still produce
    /// an entry, with the problems recorded on it.
    pub fn parse(data: &str) -> Self {
        let entries = data
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(R::parse_line)
            .collect();

        Self { entries }
    }

    /// Render every entry, one per line, newline terminated. Damaged
    /// entries are written back exactly as they were read.
    pub fn marshal(&self) -> AccountsResult<String> {
        let mut out = String::new();
        for entry in &self.entries {
            if let Some(line) = entry.raw_line() {
                out.push_str(line);
            } else if entry.key().is_empty() {
                return Err(AccountsError::InvalidEntry {
                    message: format!("{} entry without a name", R::DATABASE),
                });
            } else {
                out.push_str(&entry.render()?);
            }
            out.push('\n');
        }
        Ok(out)
    }

    pub fn entries(&self) -> &[R] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, R> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&R> {
        self.entries.iter().find(|entry| entry.key() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut R> {
        self.entries.iter_mut().find(|entry| entry.key() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn insert(&mut self, entry: R) {
        self.entries.push(entry);
    }

    /// Remove the entry named `name`, returning it.
    pub fn remove(&mut self, name: &str) -> AccountsResult<R> {
        if name.is_empty() {
            return Err(AccountsError::InvalidEntry {
                message: "must provide a name to be removed".to_string(),
            });
        }

        let position = self
            .entries
            .iter()
            .position(|entry| entry.key() == name)
            .ok_or_else(|| AccountsError::not_found(R::KIND, name))?;

        Ok(self.entries.remove(position))
    }

    /// Entries that carried at least one parse issue.
    pub fn damaged(&self) -> impl Iterator<Item = &R> {
        self.entries.iter().filter(|entry| entry.is_damaged())
    }
}

impl<'a, R> IntoIterator for &'a Database<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Parse a numeric field, recording an issue and falling back to the
/// type's default when the field is missing or malformed.
pub(crate) fn parse_number<T>(
    value: Option<&str>,
    field: &'static str,
    issues: &mut Vec<ParseIssue>,
) -> T
where
    T: FromStr + Default,
{
    match value.map(str::parse::<T>) {
        Some(Ok(number)) => number,
        _ => {
            issues.push(ParseIssue::InvalidNumber { field });
            T::default()
        }
    }
}

/// Like [`parse_number`] but an empty field is a legitimate absent value.
pub(crate) fn parse_optional_number<T>(
    value: Option<&str>,
    field: &'static str,
    issues: &mut Vec<ParseIssue>,
) -> Option<T>
where
    T: FromStr,
{
    match value {
        None | Some("") => None,
        Some(raw) => match raw.parse::<T>() {
            Ok(number) => Some(number),
            Err(_) => {
                issues.push(ParseIssue::InvalidNumber { field });
                None
            }
        },
    }
}

/// Names end up inside colon and comma separated records.
pub(crate) fn validate_name(name: &str) -> AccountsResult<()> {
    let reason = if name.is_empty() {
        Some("name cannot be empty")
    } else if name.contains([':', ',', '\n', '\r']) {
        Some("name cannot contain ':', ',' or line breaks")
    } else if name.starts_with('-') {
        Some("name cannot start with '-'")
    } else if name.chars().any(char::is_whitespace) {
        Some("name cannot contain whitespace")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(AccountsError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Free-form fields (GECOS, paths, hashes) must not break the record.
pub(crate) fn validate_field(field: &'static str, value: &str) -> AccountsResult<()> {
    if value.contains([':', '\n', '\r']) {
        return Err(AccountsError::InvalidEntry {
            message: format!("{} cannot contain ':' or line breaks", field),
        });
    }
    Ok(())
}
