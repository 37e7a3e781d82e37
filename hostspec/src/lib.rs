//! Declarative host assertions for wonka
//!
//! Fixtures describe the state a host should be in (packages installed,
//! users present with given attributes, groups) and the runner checks them
//! against a [`HostBackend`]. Evaluation only ever reads host state.

pub mod backend;
pub mod fixture;
pub mod runner;

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub use backend::{
    backend_for, BackendKind, ExecBackend, GroupInfo, HostBackend, OsRelease, PackageManager,
    RunnerConfig, UserInfo,
};
pub use fixture::{Block, Expectation, Fixture, Guard, HostFacts, Matcher, Subject};
pub use runner::{run_fixture, run_fixtures, ExampleResult, Outcome, RunReport};

/// Errors raised while loading fixtures or querying a host
#[derive(Error, Debug)]
pub enum HostSpecError {
    #[error("Failed to read fixture {path}: {source}")]
    FixtureRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse fixture {name}: {source}")]
    FixtureParse {
        name: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid fixture {name}: {reason}")]
    InvalidFixture { name: String, reason: String },
    #[error("Command `{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },
    #[error("Command `{command}` timed out after {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },
    #[error("Unsupported platform: {reason}")]
    UnsupportedPlatform { reason: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Account database error: {0}")]
    Accounts(#[from] accounts::AccountsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HostSpecResult<T> = Result<T, HostSpecError>;
