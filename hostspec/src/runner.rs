use crate::backend::{GroupInfo, HostBackend, UserInfo};
use crate::fixture::{Block, Expectation, Fixture, HostFacts, Matcher, Subject};
use crate::HostSpecResult;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed { reason: String },
    /// The block's guard did not match this host; neither pass nor fail.
    Skipped { reason: String },
    /// The backend could not answer the question.
    Errored { message: String },
}

impl Outcome {
    fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "pass",
            Outcome::Failed { .. } => "FAIL",
            Outcome::Skipped { .. } => "skip",
            Outcome::Errored { .. } => "ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExampleResult {
    pub subject: String,
    pub description: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub fixture: String,
    pub backend: String,
    pub results: Vec<ExampleResult>,
}

impl RunReport {
    fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.results
            .iter()
            .filter(|result| predicate(&result.outcome))
            .count()
    }

    pub fn passed(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Skipped { .. }))
    }

    pub fn errored(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Errored { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.errored() == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{} examples, {} failures, {} errors, {} skipped",
            self.results.len(),
            self.failed(),
            self.errored(),
            self.skipped()
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({} backend)", self.fixture, self.backend)?;
        let mut current_subject: Option<&str> = None;
        for result in &self.results {
            if current_subject != Some(result.subject.as_str()) {
                writeln!(f, "  {}", result.subject)?;
                current_subject = Some(result.subject.as_str());
            }
            write!(f, "    [{}] {}", result.outcome.label(), result.description)?;
            match &result.outcome {
                Outcome::Passed => writeln!(f)?,
                Outcome::Failed { reason } | Outcome::Skipped { reason } => {
                    writeln!(f, " ({})", reason)?
                }
                Outcome::Errored { message } => writeln!(f, " ({})", message)?,
            }
        }
        write!(f, "{}", self.summary())
    }
}

/// What the backend said about a block's subject.
enum Observed {
    Package { installed: bool },
    User(Option<UserInfo>),
    Group(Option<GroupInfo>),
}

/// Whether the matcher held, plus a description of what was actually seen.
struct Evaluation {
    matched: bool,
    actual: String,
}

impl Evaluation {
    fn new(matched: bool, actual: impl Into<String>) -> Self {
        Self {
            matched,
            actual: actual.into(),
        }
    }
}

/// Evaluate every block of `fixture` against `backend`.
///
/// The runner only reads host state, so running the same fixture twice
/// against an unchanged host yields the same report.
pub async fn run_fixture(backend: &dyn HostBackend, fixture: &Fixture) -> RunReport {
    info!(
        "Running {} ({} expectations) with the {} backend",
        fixture.name,
        fixture.expectation_count(),
        backend.name()
    );

    let mut facts: Option<Result<HostFacts, String>> = None;
    let mut results = Vec::with_capacity(fixture.expectation_count());

    for block in &fixture.blocks {
        if let Some(guard) = &block.only_if {
            if facts.is_none() {
                facts = Some(
                    backend
                        .os_family()
                        .await
                        .map(|os_family| HostFacts { os_family })
                        .map_err(|e| e.to_string()),
                );
            }
            let verdict = match facts.as_ref() {
                Some(Ok(facts)) => guard.check(facts).map_err(|reason| Outcome::Skipped { reason }),
                Some(Err(message)) => Err(Outcome::Errored {
                    message: format!("could not determine host facts: {}", message),
                }),
                None => Ok(()),
            };
            if let Err(outcome) = verdict {
                debug!("Not evaluating {}: {:?}", block.subject, outcome);
                push_all(&mut results, block, outcome);
                continue;
            }
        }

        match observe(backend, block).await {
            Ok(observed) => {
                for expectation in &block.expectations {
                    let outcome = judge(&block.subject, expectation, &observed);
                    debug!("{} {}: {:?}", block.subject, expectation, outcome);
                    results.push(ExampleResult {
                        subject: block.subject.to_string(),
                        description: expectation.to_string(),
                        outcome,
                    });
                }
            }
            Err(e) => {
                warn!("Backend failed on {}: {}", block.subject, e);
                push_all(
                    &mut results,
                    block,
                    Outcome::Errored {
                        message: e.to_string(),
                    },
                );
            }
        }
    }

    let report = RunReport {
        fixture: fixture.name.clone(),
        backend: backend.name().to_string(),
        results,
    };
    info!("{}: {}", report.fixture, report.summary());
    report
}

pub async fn run_fixtures(backend: &dyn HostBackend, fixtures: &[Fixture]) -> Vec<RunReport> {
    let mut reports = Vec::with_capacity(fixtures.len());
    for fixture in fixtures {
        reports.push(run_fixture(backend, fixture).await);
    }
    reports
}

fn push_all(results: &mut Vec<ExampleResult>, block: &Block, outcome: Outcome) {
    for expectation in &block.expectations {
        results.push(ExampleResult {
            subject: block.subject.to_string(),
            description: expectation.to_string(),
            outcome: outcome.clone(),
        });
    }
}

async fn observe(backend: &dyn HostBackend, block: &Block) -> HostSpecResult<Observed> {
    match &block.subject {
        Subject::Package(name) => Ok(Observed::Package {
            installed: backend.package_installed(name).await?,
        }),
        Subject::User(name) => Ok(Observed::User(backend.user(name).await?)),
        Subject::Group(name) => Ok(Observed::Group(backend.group(name).await?)),
    }
}

fn judge(subject: &Subject, expectation: &Expectation, observed: &Observed) -> Outcome {
    let evaluation = match evaluate(&expectation.matcher, observed) {
        Some(evaluation) => evaluation,
        None => {
            return Outcome::Errored {
                message: format!("a {} cannot {}", subject.kind(), expectation.matcher),
            }
        }
    };

    if evaluation.matched != expectation.negated {
        Outcome::Passed
    } else {
        let wanted = if expectation.negated { "not to" } else { "to" };
        Outcome::Failed {
            reason: format!(
                "expected {} {} {}, but {}",
                subject, wanted, expectation.matcher, evaluation.actual
            ),
        }
    }
}

fn evaluate(matcher: &Matcher, observed: &Observed) -> Option<Evaluation> {
    let evaluation = match (observed, matcher) {
        (Observed::Package { installed }, Matcher::BeInstalled) => Evaluation::new(
            *installed,
            if *installed { "it is installed" } else { "it is not installed" },
        ),

        (Observed::User(None), _) | (Observed::Group(None), _) => {
            Evaluation::new(false, "it does not exist")
        }

        (Observed::User(Some(_)), Matcher::Exist) | (Observed::Group(Some(_)), Matcher::Exist) => {
            Evaluation::new(true, "it exists")
        }
        (Observed::User(Some(user)), Matcher::HaveUid(uid)) => {
            Evaluation::new(user.uid == *uid, format!("uid is {}", user.uid))
        }
        (Observed::User(Some(user)), Matcher::HaveGid(gid)) => {
            Evaluation::new(user.gid == *gid, format!("gid is {}", user.gid))
        }
        (Observed::User(Some(user)), Matcher::HaveHomeDirectory(path)) => Evaluation::new(
            user.home_dir == *path,
            format!("home directory is \"{}\"", user.home_dir),
        ),
        (Observed::User(Some(user)), Matcher::HaveLoginShell(path)) => Evaluation::new(
            user.shell == *path,
            format!("login shell is \"{}\"", user.shell),
        ),
        (Observed::User(Some(user)), Matcher::BelongToGroup(group)) => Evaluation::new(
            user.groups.iter().any(|name| name == group),
            format!("groups are [{}]", user.groups.join(", ")),
        ),
        (Observed::Group(Some(group)), Matcher::HaveGid(gid)) => {
            Evaluation::new(group.gid == *gid, format!("gid is {}", group.gid))
        }

        _ => return None,
    };
    Some(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::Guard;
    use crate::{HostSpecError, HostSpecResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockBackend {
        os_family: Option<String>,
        users: Vec<UserInfo>,
        packages: Vec<String>,
        os_queries: AtomicUsize,
    }

    impl MockBackend {
        fn new(os_family: Option<&str>) -> Self {
            Self {
                os_family: os_family.map(String::from),
                users: vec![UserInfo {
                    name: "root".to_string(),
                    uid: 0,
                    gid: 0,
                    home_dir: "/root".to_string(),
                    shell: "/bin/bash".to_string(),
                    groups: vec!["root".to_string()],
                }],
                packages: vec![],
                os_queries: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl HostBackend for MockBackend {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn os_family(&self) -> HostSpecResult<Option<String>> {
            self.os_queries.fetch_add(1, Ordering::SeqCst);
            Ok(self.os_family.clone())
        }

        async fn user(&self, name: &str) -> HostSpecResult<Option<UserInfo>> {
            Ok(self.users.iter().find(|user| user.name == name).cloned())
        }

        async fn group(&self, _name: &str) -> HostSpecResult<Option<GroupInfo>> {
            Ok(None)
        }

        async fn package_installed(&self, name: &str) -> HostSpecResult<bool> {
            if name == "broken" {
                return Err(HostSpecError::UnsupportedPlatform {
                    reason: "no package manager".to_string(),
                });
            }
            Ok(self.packages.iter().any(|package| package == name))
        }
    }

    fn block(subject: Subject, guard: Option<Guard>, expectations: Vec<Expectation>) -> Block {
        Block {
            subject,
            only_if: guard,
            expectations,
        }
    }

    fn fixture(blocks: Vec<Block>) -> Fixture {
        Fixture {
            name: "test.toml".to_string(),
            description: None,
            blocks,
        }
    }

    #[tokio::test]
    async fn test_passing_and_failing_expectations() {
        let backend = MockBackend::new(Some("ubuntu"));
        let fixture = fixture(vec![block(
            Subject::User("root".to_string()),
            None,
            vec![
                Expectation::should(Matcher::Exist),
                Expectation::should(Matcher::HaveUid(0)),
                Expectation::should(Matcher::HaveLoginShell("/bin/zsh".to_string())),
            ],
        )]);

        let report = run_fixture(&backend, &fixture).await;
        assert_eq!(report.passed(), 2);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());
        assert_eq!(
            report.results[2].outcome,
            Outcome::Failed {
                reason: "expected User \"root\" to have login shell \"/bin/zsh\", but login shell is \"/bin/bash\"".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_negated_expectation_on_missing_user() {
        let backend = MockBackend::new(None);
        let fixture = fixture(vec![block(
            Subject::User("splug".to_string()),
            None,
            vec![
                Expectation::should_not(Matcher::Exist),
                Expectation::should(Matcher::HaveUid(500)),
            ],
        )]);

        let report = run_fixture(&backend, &fixture).await;
        assert_eq!(report.results[0].outcome, Outcome::Passed);
        assert_eq!(
            report.results[1].outcome,
            Outcome::Failed {
                reason: "expected User \"splug\" to have uid 500, but it does not exist"
                    .to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_guard_skips_block_on_other_family() {
        let backend = MockBackend::new(Some("fedora"));
        let fixture = fixture(vec![
            block(
                Subject::Package("httpd".to_string()),
                Some(Guard::os_family("ubuntu")),
                vec![Expectation::should_not(Matcher::BeInstalled)],
            ),
            block(
                Subject::Package("broken".to_string()),
                Some(Guard::os_family("ubuntu")),
                vec![Expectation::should(Matcher::BeInstalled)],
            ),
        ]);

        let report = run_fixture(&backend, &fixture).await;
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.passed(), 0);
        assert!(report.is_success());
        assert_eq!(backend.os_queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_guard_allows_block_on_matching_family() {
        let mut backend = MockBackend::new(Some("ubuntu"));
        backend.packages.push("httpd".to_string());
        let fixture = fixture(vec![block(
            Subject::Package("httpd".to_string()),
            Some(Guard::os_family("ubuntu")),
            vec![Expectation::should_not(Matcher::BeInstalled)],
        )]);

        let report = run_fixture(&backend, &fixture).await;
        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.results[0].outcome,
            Outcome::Failed {
                reason: "expected Package \"httpd\" not to be installed, but it is installed"
                    .to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_backend_errors_become_errored_outcomes() {
        let backend = MockBackend::new(Some("ubuntu"));
        let fixture = fixture(vec![block(
            Subject::Package("broken".to_string()),
            None,
            vec![Expectation::should(Matcher::BeInstalled)],
        )]);

        let report = run_fixture(&backend, &fixture).await;
        assert_eq!(report.errored(), 1);
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_repeated_runs_are_identical() {
        let backend = MockBackend::new(Some("ubuntu"));
        let fixture = fixture(vec![
            block(
                Subject::Package("httpd".to_string()),
                Some(Guard::os_family("ubuntu")),
                vec![Expectation::should_not(Matcher::BeInstalled)],
            ),
            block(
                Subject::User("root".to_string()),
                None,
                vec![Expectation::should(Matcher::HaveUid(0))],
            ),
        ]);

        let first = run_fixture(&backend, &fixture).await;
        let second = run_fixture(&backend, &fixture).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_report_rendering() {
        let backend = MockBackend::new(Some("fedora"));
        let fixture = fixture(vec![
            block(
                Subject::Package("httpd".to_string()),
                Some(Guard::os_family("ubuntu")),
                vec![Expectation::should_not(Matcher::BeInstalled)],
            ),
            block(
                Subject::User("root".to_string()),
                None,
                vec![Expectation::should(Matcher::HaveUid(0))],
            ),
        ]);

        let report = run_fixture(&backend, &fixture).await;
        let text = report.to_string();
        assert!(text.starts_with("test.toml (mock backend)\n"));
        assert!(text.contains(
            "    [skip] should not be installed (os family is \"fedora\", not \"ubuntu\")\n"
        ));
        assert!(text.contains("  User \"root\"\n    [pass] should have uid 0\n"));
        assert!(text.ends_with("2 examples, 0 failures, 0 errors, 1 skipped"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["results"][0]["outcome"]["status"], "skipped");
        assert_eq!(json["results"][1]["outcome"]["status"], "passed");
    }
}
