use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccountsError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("User {user} is already a member of group {group}")]
    AlreadyMember { group: String, user: String },

    #[error("{kind} id {id} is already in use by {owner}")]
    IdInUse {
        kind: &'static str,
        id: u32,
        owner: String,
    },

    #[error("No free {kind} available at or above {start}")]
    NoFreeId { kind: &'static str, start: u32 },

    #[error("Group {group} is the primary group of user {user}")]
    InUse { group: String, user: String },

    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("{kind} {name} has a damaged line; repair it by hand before changing it")]
    Damaged { kind: &'static str, name: String },

    #[error("Attempting to save invalid entry: {message}")]
    InvalidEntry { message: String },

    #[error("Failed to hash password: {message}")]
    PasswordHash { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

pub type AccountsResult<T> = Result<T, AccountsError>;

impl AccountsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}

/// A problem found while parsing a single database line.
///
/// Parsing never rejects a whole file; each entry keeps the issues found on
/// its own line so callers can decide what to do with damaged records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseIssue {
    #[error("{database} entry has less than {expected} segments")]
    TooFewFields {
        database: &'static str,
        expected: usize,
    },

    #[error("{database} entry has more than {expected} segments")]
    TooManyFields {
        database: &'static str,
        expected: usize,
    },

    #[error("invalid {field} parsed")]
    EmptyField { field: &'static str },

    #[error("invalid {field}")]
    InvalidNumber { field: &'static str },

    #[error("invalid {field} field")]
    MissingField { field: &'static str },

    #[error("password not stored in /etc/shadow")]
    PasswordNotShadowed,
}
