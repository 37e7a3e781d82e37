use crate::crypt::hash_password;
use crate::database::{parse_optional_number, Database, Record};
use crate::error::{AccountsResult, ParseIssue};
use chrono::{Datelike, NaiveDate, Utc};

const FIELDS: usize = 9;
const REQUIRED_FIELDS: usize = 8;
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

/// Password field for an account that cannot log in with a password.
pub const LOCKED_PASSWORD: &str = "!";

pub type Shadow = Database<ShadowEntry>;

/// One line of `/etc/shadow`. Ages and periods are counted in days.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShadowEntry {
    pub username: String,
    pub password: String,
    pub last_change: Option<NaiveDate>,
    pub min_age: Option<i64>,
    pub max_age: Option<i64>,
    pub warning_period: Option<i64>,
    pub inactivity_period: Option<i64>,
    pub expiration: Option<NaiveDate>,
    pub reserved: String,
    pub issues: Vec<ParseIssue>,
    pub raw_line: Option<String>,
}

impl ShadowEntry {
    /// A fresh entry whose password is locked until one is set.
    pub fn locked(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: LOCKED_PASSWORD.to_string(),
            last_change: Some(today()),
            ..Default::default()
        }
    }

    /// Hash `password` and record today as the last change.
    pub fn set_password(&mut self, password: &str) -> AccountsResult<()> {
        self.password = hash_password(password)?;
        self.last_change = Some(today());
        Ok(())
    }

    /// Prefix the hash with `!` so it can never match, keeping it restorable.
    pub fn lock(&mut self) {
        if !self.is_locked() {
            self.password.insert(0, '!');
        }
    }

    pub fn unlock(&mut self) {
        if let Some(stripped) = self.password.strip_prefix('!') {
            if !stripped.is_empty() {
                self.password = stripped.to_string();
            }
        }
    }

    pub fn is_locked(&self) -> bool {
        self.password.starts_with('!') || self.password.starts_with('*')
    }

    pub fn is_expired_on(&self, date: NaiveDate) -> bool {
        self.expiration.is_some_and(|expiration| expiration <= date)
    }
}

impl Record for ShadowEntry {
    const DATABASE: &'static str = "shadow";
    const KIND: &'static str = "shadow entry";

    fn key(&self) -> &str {
        &self.username
    }

    fn parse_line(line: &str) -> Self {
        let parts: Vec<&str> = line.split(':').collect();
        let mut issues = Vec::new();

        if parts.len() < REQUIRED_FIELDS {
            issues.push(ParseIssue::TooFewFields {
                database: Self::DATABASE,
                expected: REQUIRED_FIELDS,
            });
        } else if parts.len() > FIELDS {
            issues.push(ParseIssue::TooManyFields {
                database: Self::DATABASE,
                expected: FIELDS,
            });
        }

        let username = parts[0].to_string();
        if username.is_empty() {
            issues.push(ParseIssue::EmptyField { field: "username" });
        }

        let password = parts.get(1).copied().unwrap_or_default().to_string();

        let mut days = |index: usize, field: &'static str| {
            parse_optional_number::<i64>(parts.get(index).copied(), field, &mut issues)
        };
        let last_change = days(2, "lastPasswordChange");
        let min_age = days(3, "minAge");
        let max_age = days(4, "maxAge");
        let warning_period = days(5, "warning");
        let inactivity_period = days(6, "inactivity");
        let expiration = days(7, "expiration");

        let mut date = |value: Option<i64>, field: &'static str| {
            value.and_then(|days| match date_from_epoch_days(days) {
                Some(date) => Some(date),
                None => {
                    issues.push(ParseIssue::InvalidNumber { field });
                    None
                }
            })
        };
        let last_change = date(last_change, "lastPasswordChange");
        let expiration = date(expiration, "expiration");

        Self {
            username,
            password,
            last_change,
            min_age,
            max_age,
            warning_period,
            inactivity_period,
            expiration,
            reserved: parts.get(8).copied().unwrap_or_default().to_string(),
            raw_line: (!issues.is_empty()).then(|| line.to_string()),
            issues,
        }
    }

    fn render(&self) -> AccountsResult<String> {
        let days = |value: Option<i64>| value.map(|days| days.to_string()).unwrap_or_default();
        let date = |value: Option<NaiveDate>| days(value.map(epoch_days));

        Ok(format!(
            "{}:{}:{}:{}:{}:{}:{}:{}:{}",
            self.username,
            self.password,
            date(self.last_change),
            days(self.min_age),
            days(self.max_age),
            days(self.warning_period),
            days(self.inactivity_period),
            date(self.expiration),
            self.reserved,
        ))
    }

    fn issues(&self) -> &[ParseIssue] {
        &self.issues
    }

    fn raw_line(&self) -> Option<&str> {
        self.raw_line.as_deref()
    }
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Days since 1970-01-01, the unit shadow stores dates in.
pub fn epoch_days(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce()) - UNIX_EPOCH_DAYS_FROM_CE
}

pub fn date_from_epoch_days(days: i64) -> Option<NaiveDate> {
    let days_from_ce = i32::try_from(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?).ok()?;
    NaiveDate::from_num_days_from_ce_opt(days_from_ce)
}
