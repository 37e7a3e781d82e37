use crate::cli::{Cli, Commands, MembershipAction, PasswordAction, ReportFormat};
use crate::config::WonkaConfig;
use crate::error::{WonkaError, WonkaResult};
use accounts::{
    read_with_lock, AccountStore, AccountsConfig, Database, DatabaseKind, GroupEntry, NewUser,
    PasswdEntry, Record, ShadowEntry,
};
use hostspec::{backend_for, run_fixtures, Fixture};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Run one parsed command line.
///
/// Passwords are read from `input`; everything meant for the user goes to
/// `output`. Returns `false` when a `check` run found failures or errors.
pub async fn execute(
    cli: Cli,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> WonkaResult<bool> {
    let mut config = WonkaConfig::resolve(cli.config.as_deref())?;
    if let Some(root) = &cli.root {
        config = config.with_root(root);
    }
    config.validate()?;
    debug!("Using account files {:?}", config.accounts);

    match cli.command {
        Commands::List { database } => {
            list(&config.accounts, database, output)?;
        }
        Commands::Useradd {
            name,
            uid,
            gid,
            home,
            shell,
            comment,
            groups,
            password_stdin,
        } => {
            let mut request = NewUser::new(&name).with_groups(groups);
            if let Some(uid) = uid {
                request = request.with_uid(uid);
            }
            if let Some(gid) = gid {
                request = request.with_gid(gid);
            }
            if let Some(home) = home {
                request = request.with_home_dir(home);
            }
            if let Some(shell) = shell {
                request = request.with_shell(shell);
            }
            if let Some(comment) = comment {
                request = request.with_comment(comment);
            }
            if password_stdin {
                request = request.with_password(read_password(input)?);
            }

            let mut store = AccountStore::load(config.accounts)?;
            let entry = store.add_user(request)?;
            store.save()?;
            writeln!(
                output,
                "Created user {} (uid {}, gid {})",
                entry.username, entry.uid, entry.gid
            )?;
        }
        Commands::Userdel { name } => {
            let mut store = AccountStore::load(config.accounts)?;
            let removed = store.remove_user(&name)?;
            store.save()?;
            writeln!(output, "Removed user {} (uid {})", removed.username, removed.uid)?;
        }
        Commands::Passwd { name, action } => {
            let mut store = AccountStore::load(config.accounts)?;
            let PasswordAction {
                stdin,
                lock,
                unlock,
            } = action;
            let message = if stdin {
                let password = read_password(input)?;
                store.set_password(&name, &password)?;
                "Updated password for"
            } else if lock {
                store.lock_password(&name)?;
                "Locked password for"
            } else if unlock {
                store.unlock_password(&name)?;
                "Unlocked password for"
            } else {
                return Err(WonkaError::InvalidConfig(
                    "passwd needs --stdin, --lock or --unlock".to_string(),
                ));
            };
            store.save()?;
            writeln!(output, "{} {}", message, name)?;
        }
        Commands::Groupadd { name, gid } => {
            let mut store = AccountStore::load(config.accounts)?;
            let group = store.add_group(&name, gid)?;
            store.save()?;
            writeln!(output, "Created group {} (gid {})", group.name, group.gid)?;
        }
        Commands::Groupdel { name } => {
            let mut store = AccountStore::load(config.accounts)?;
            let group = store.remove_group(&name)?;
            store.save()?;
            writeln!(output, "Removed group {} (gid {})", group.name, group.gid)?;
        }
        Commands::Gpasswd { group, action } => {
            let mut store = AccountStore::load(config.accounts)?;
            match action {
                MembershipAction {
                    add: Some(user), ..
                } => {
                    store.add_member(&group, &user)?;
                    store.save()?;
                    writeln!(output, "Added {} to group {}", user, group)?;
                }
                MembershipAction {
                    delete: Some(user),
                    ..
                } => {
                    store.remove_member(&group, &user)?;
                    store.save()?;
                    writeln!(output, "Removed {} from group {}", user, group)?;
                }
                MembershipAction { .. } => {
                    return Err(WonkaError::InvalidConfig(
                        "gpasswd needs --add or --delete".to_string(),
                    ));
                }
            }
        }
        Commands::Check {
            fixtures,
            format,
            os_release,
        } => {
            if let Some(path) = os_release {
                config = config.with_os_release_path(path);
            }
            return check(&config, &fixtures, format, output).await;
        }
    }

    Ok(true)
}

/// Print a database exactly as stored, warning about lines that do not parse.
fn list(config: &AccountsConfig, kind: DatabaseKind, output: &mut dyn Write) -> WonkaResult<()> {
    let path = config.path_for(kind);
    let text = read_with_lock(path)?;
    match kind {
        DatabaseKind::Passwd => warn_damaged::<PasswdEntry>(path, &text),
        DatabaseKind::Shadow => warn_damaged::<ShadowEntry>(path, &text),
        DatabaseKind::Group => warn_damaged::<GroupEntry>(path, &text),
    };
    output.write_all(text.as_bytes())?;
    Ok(())
}

fn warn_damaged<R: Record>(path: &Path, text: &str) -> usize {
    let database = Database::<R>::parse(text);
    let mut count = 0;
    for entry in database.damaged() {
        count += 1;
        for issue in entry.issues() {
            warn!("{}: entry {:?}: {}", path.display(), entry.key(), issue);
        }
    }
    count
}

async fn check(
    config: &WonkaConfig,
    paths: &[PathBuf],
    format: ReportFormat,
    output: &mut dyn Write,
) -> WonkaResult<bool> {
    let fixtures = paths
        .iter()
        .map(|path| Fixture::load(path))
        .collect::<Result<Vec<_>, _>>()?;

    let backend = backend_for(&config.runner_config())?;
    let reports = run_fixtures(backend.as_ref(), &fixtures).await;
    let success = reports.iter().all(|report| report.is_success());

    match format {
        ReportFormat::Text => {
            for report in &reports {
                writeln!(output, "{}\n", report)?;
            }
        }
        ReportFormat::Json => {
            writeln!(output, "{}", serde_json::to_string_pretty(&reports)?)?;
        }
    }

    info!(
        "Checked {} fixture(s): {}",
        reports.len(),
        if success { "ok" } else { "failed" }
    );
    Ok(success)
}

/// First line of `input` without its line terminator.
fn read_password(input: &mut dyn BufRead) -> WonkaResult<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    let password = line.trim_end_matches(['\n', '\r']);
    if password.is_empty() {
        return Err(WonkaError::EmptyPassword);
    }
    Ok(password.to_string())
}
