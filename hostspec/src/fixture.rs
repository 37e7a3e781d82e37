//! Fixture files: declared expectations about a host's state.
//!
//! A fixture is a TOML document made of `[[describe]]` blocks. Each block
//! names one subject, an optional guard, and a list of expectations:
//!
//! ```toml
//! [[describe]]
//! subject = { user = "splug" }
//! only_if = { os_family = "ubuntu" }
//!
//! [[describe.it]]
//! should = { have_uid = 500 }
//!
//! [[describe.it]]
//! should_not = "exist"
//! ```

use crate::{HostSpecError, HostSpecResult};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// The thing an expectation block talks about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Package(String),
    User(String),
    Group(String),
}

impl Subject {
    pub fn kind(&self) -> &'static str {
        match self {
            Subject::Package(_) => "package",
            Subject::User(_) => "user",
            Subject::Group(_) => "group",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Subject::Package(name) | Subject::User(name) | Subject::Group(name) => name,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Subject::Package(_) => "Package",
            Subject::User(_) => "User",
            Subject::Group(_) => "Group",
        };
        write!(f, "{} \"{}\"", kind, self.name())
    }
}

/// A named predicate applied to a subject.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matcher {
    Exist,
    BeInstalled,
    HaveUid(u32),
    HaveGid(u32),
    HaveHomeDirectory(String),
    HaveLoginShell(String),
    BelongToGroup(String),
}

impl Matcher {
    pub fn applies_to(&self, subject: &Subject) -> bool {
        match (self, subject) {
            (Matcher::BeInstalled, Subject::Package(_)) => true,
            (Matcher::BeInstalled, _) => false,
            (Matcher::Exist, Subject::User(_) | Subject::Group(_)) => true,
            (Matcher::HaveGid(_), Subject::User(_) | Subject::Group(_)) => true,
            (
                Matcher::HaveUid(_)
                | Matcher::HaveHomeDirectory(_)
                | Matcher::HaveLoginShell(_)
                | Matcher::BelongToGroup(_),
                Subject::User(_),
            ) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Exist => write!(f, "exist"),
            Matcher::BeInstalled => write!(f, "be installed"),
            Matcher::HaveUid(uid) => write!(f, "have uid {}", uid),
            Matcher::HaveGid(gid) => write!(f, "have gid {}", gid),
            Matcher::HaveHomeDirectory(path) => write!(f, "have home directory \"{}\"", path),
            Matcher::HaveLoginShell(path) => write!(f, "have login shell \"{}\"", path),
            Matcher::BelongToGroup(group) => write!(f, "belong to group \"{}\"", group),
        }
    }
}

/// One `it { should ... }` line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawExpectation")]
pub struct Expectation {
    pub matcher: Matcher,
    pub negated: bool,
}

impl Expectation {
    pub fn should(matcher: Matcher) -> Self {
        Self {
            matcher,
            negated: false,
        }
    }

    pub fn should_not(matcher: Matcher) -> Self {
        Self {
            matcher,
            negated: true,
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "should not {}", self.matcher)
        } else {
            write!(f, "should {}", self.matcher)
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawExpectation {
    should: Option<Matcher>,
    should_not: Option<Matcher>,
}

impl TryFrom<RawExpectation> for Expectation {
    type Error = String;

    fn try_from(raw: RawExpectation) -> Result<Self, Self::Error> {
        match (raw.should, raw.should_not) {
            (Some(matcher), None) => Ok(Expectation::should(matcher)),
            (None, Some(matcher)) => Ok(Expectation::should_not(matcher)),
            (Some(_), Some(_)) => {
                Err("an expectation takes either `should` or `should_not`, not both".to_string())
            }
            (None, None) => Err("an expectation needs `should` or `should_not`".to_string()),
        }
    }
}

/// Facts about the host that guards are evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostFacts {
    pub os_family: Option<String>,
}

/// Restricts a block to matching hosts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Guard {
    pub os_family: Option<String>,
}

impl Guard {
    pub fn os_family(family: impl Into<String>) -> Self {
        Self {
            os_family: Some(family.into()),
        }
    }

    /// `Err` carries the reason the block does not apply.
    pub fn check(&self, facts: &HostFacts) -> Result<(), String> {
        if let Some(wanted) = &self.os_family {
            match &facts.os_family {
                Some(actual) if actual == wanted => {}
                Some(actual) => {
                    return Err(format!("os family is \"{}\", not \"{}\"", actual, wanted));
                }
                None => return Err(format!("os family is unknown, not \"{}\"", wanted)),
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    pub subject: Subject,
    #[serde(default)]
    pub only_if: Option<Guard>,
    #[serde(rename = "it", default)]
    pub expectations: Vec<Expectation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "describe", default)]
    pub blocks: Vec<Block>,
}

impl Fixture {
    pub fn parse(name: impl Into<String>, text: &str) -> HostSpecResult<Self> {
        let name = name.into();
        let mut fixture: Fixture =
            toml::from_str(text).map_err(|source| HostSpecError::FixtureParse {
                name: name.clone(),
                source,
            })?;
        fixture.name = name;
        fixture.validate()?;
        Ok(fixture)
    }

    pub fn load(path: &Path) -> HostSpecResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| HostSpecError::FixtureRead {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse(name, &text)
    }

    pub fn expectation_count(&self) -> usize {
        self.blocks.iter().map(|block| block.expectations.len()).sum()
    }

    fn validate(&self) -> HostSpecResult<()> {
        let invalid = |reason: String| HostSpecError::InvalidFixture {
            name: self.name.clone(),
            reason,
        };

        for (index, block) in self.blocks.iter().enumerate() {
            if block.subject.name().is_empty() {
                return Err(invalid(format!(
                    "block {} has a {} subject without a name",
                    index + 1,
                    block.subject.kind()
                )));
            }
            if block.expectations.is_empty() {
                return Err(invalid(format!("{} has no expectations", block.subject)));
            }
            if let Some(Guard { os_family: Some(family) }) = &block.only_if {
                if family.is_empty() {
                    return Err(invalid(format!("{} has an empty os_family guard", block.subject)));
                }
            }
            for expectation in &block.expectations {
                if !expectation.matcher.applies_to(&block.subject) {
                    return Err(invalid(format!(
                        "a {} cannot {}",
                        block.subject.kind(),
                        expectation.matcher
                    )));
                }
            }
        }
        Ok(())
    }
}
