//! Command line front end for the `accounts` and `hostspec` crates.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::{Cli, Commands, MembershipAction, PasswordAction, ReportFormat};
pub use commands::execute;
pub use config::{RunnerSection, WonkaConfig, CONFIG_ENV};
pub use error::{WonkaError, WonkaResult};
