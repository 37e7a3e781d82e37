//! Local account database management for wonka
//!
//! Parses and writes `/etc/passwd`, `/etc/shadow` and `/etc/group` without
//! losing lines it does not understand. [`AccountStore`] loads the three
//! files under one lock and applies user, group and password changes to
//! them as a unit.

pub mod config;
pub mod crypt;
pub mod database;
pub mod error;
pub mod group;
pub mod lock;
pub mod passwd;
pub mod shadow;
pub mod store;

pub use config::AccountsConfig;
pub use database::{Database, DatabaseKind, Record};
pub use error::{AccountsError, AccountsResult, ParseIssue};
pub use group::{GroupEntry, Groups};
pub use lock::{read_with_lock, write_with_lock, DatabaseLock};
pub use passwd::{Passwd, PasswdEntry};
pub use shadow::{Shadow, ShadowEntry};
pub use store::{AccountStore, NewUser};

pub mod prelude {
    pub use crate::config::*;
    pub use crate::database::*;
    pub use crate::error::*;
    pub use crate::group::*;
    pub use crate::passwd::*;
    pub use crate::shadow::*;
    pub use crate::store::*;
}
