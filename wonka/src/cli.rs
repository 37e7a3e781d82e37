use accounts::DatabaseKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "wonka")]
#[command(about = "Manage local accounts and verify host state against fixtures")]
pub struct Cli {
    /// Operate on account files and package databases below this directory instead of /
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
    /// TOML configuration file (falls back to $WONKA_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print one account database
    List {
        /// passwd, shadow or group
        database: DatabaseKind,
    },
    /// Create a user, its private group and shadow entry
    Useradd {
        name: String,
        #[arg(long)]
        uid: Option<u32>,
        /// Existing primary group id (default: a new private group)
        #[arg(long)]
        gid: Option<u32>,
        #[arg(long)]
        home: Option<String>,
        #[arg(long)]
        shell: Option<String>,
        #[arg(long)]
        comment: Option<String>,
        /// Supplementary groups, comma separated
        #[arg(long, value_delimiter = ',')]
        groups: Vec<String>,
        /// Read the initial password from the first line of stdin
        #[arg(long)]
        password_stdin: bool,
    },
    /// Remove a user and its private group
    Userdel { name: String },
    /// Change or lock a user's password
    Passwd {
        name: String,
        #[command(flatten)]
        action: PasswordAction,
    },
    /// Create a group
    Groupadd {
        name: String,
        #[arg(long)]
        gid: Option<u32>,
    },
    /// Remove a group
    Groupdel { name: String },
    /// Add or remove a group member
    Gpasswd {
        group: String,
        #[command(flatten)]
        action: MembershipAction,
    },
    /// Evaluate fixture files against this host
    Check {
        #[arg(required = true)]
        fixtures: Vec<PathBuf>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
        /// os-release file used to detect the os family
        #[arg(long)]
        os_release: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
#[group(required = true, multiple = false)]
pub struct PasswordAction {
    /// Read the new password from the first line of stdin
    #[arg(long)]
    pub stdin: bool,
    #[arg(long)]
    pub lock: bool,
    #[arg(long)]
    pub unlock: bool,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
#[group(required = true, multiple = false)]
pub struct MembershipAction {
    #[arg(short, long, value_name = "USER")]
    pub add: Option<String>,
    #[arg(short, long, value_name = "USER")]
    pub delete: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}
