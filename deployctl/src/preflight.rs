//! Ordered host precondition checks with fail-fast semantics.
//!
//! Checks run strictly in the order they are registered; the first failure
//! aborts the run with a remediation message and no later probe executes,
//! because later checks assume the invariants of earlier ones (branch
//! detection is meaningless outside a git repository). Probes are
//! side-effect-free: read-only queries against git, the filesystem, and the
//! container engine.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::debug;

/// Branch on which direct development activity is blocked
pub const PROTECTED_BRANCH: &str = "main";
/// Remote probed for reachability
pub const DEFAULT_REMOTE: &str = "origin";

/// A named precondition check that failed, with its remediation.
#[derive(Error, Debug)]
#[error("{name}: {detail}\n  fix: {remediation}")]
pub struct CheckFailure {
    pub name: String,
    pub detail: String,
    pub remediation: String,
}

/// Result of one probe: pass/fail plus contextual detail.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub passed: bool,
    pub detail: String,
}

impl CheckOutcome {
    pub fn pass(detail: impl Into<String>) -> Self {
        Self {
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn fail(detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            detail: detail.into(),
        }
    }
}

/// One precondition: identifier, side-effect-free probe, remediation.
pub trait Check {
    fn name(&self) -> &str;
    fn probe(&self) -> CheckOutcome;
    /// What command or action resolves a failed probe
    fn remediation(&self) -> String;
}

/// Ordered collection of checks, run with short-circuit semantics.
pub struct Preflight {
    checks: Vec<Box<dyn Check>>,
}

impl Preflight {
    pub fn new(checks: Vec<Box<dyn Check>>) -> Self {
        Self { checks }
    }

    /// The standard host validation sequence.
    pub fn with_default_checks() -> Self {
        Self::new(default_checks())
    }

    /// Run every check in order, stopping at the first failure.
    ///
    /// No check after a failing one executes, and no remediation is
    /// attempted automatically.
    pub fn run_all(&self) -> Result<(), CheckFailure> {
        for check in &self.checks {
            debug!("running preflight check: {}", check.name());
            let outcome = check.probe();
            if !outcome.passed {
                return Err(CheckFailure {
                    name: check.name().to_string(),
                    detail: outcome.detail,
                    remediation: check.remediation(),
                });
            }
            println!("✓ {}: {}", check.name(), outcome.detail);
        }
        Ok(())
    }
}

/// The seven standard checks in their fixed order.
pub fn default_checks() -> Vec<Box<dyn Check>> {
    vec![
        Box::new(GitRepoCheck),
        Box::new(GitIdentityCheck),
        Box::new(SshKeyCheck::default()),
        Box::new(RemoteReachableCheck::new(DEFAULT_REMOTE)),
        Box::new(EngineCliCheck),
        Box::new(EngineDaemonCheck),
        Box::new(BranchGuardCheck::new(PROTECTED_BRANCH)),
    ]
}

fn git_query(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}

/// 1. The working directory is inside a git working tree.
pub struct GitRepoCheck;

impl Check for GitRepoCheck {
    fn name(&self) -> &str {
        "git-repo"
    }

    fn probe(&self) -> CheckOutcome {
        match git_query(&["rev-parse", "--show-toplevel"]) {
            Some(root) => CheckOutcome::pass(format!("repository at {}", root)),
            None => CheckOutcome::fail("no git repository at or above the working directory"),
        }
    }

    fn remediation(&self) -> String {
        "clone the eduagent repository and run deployctl from inside it".to_string()
    }
}

/// 2. Git author identity (user.name and user.email) is configured.
pub struct GitIdentityCheck;

impl GitIdentityCheck {
    /// Pure evaluation of the two identity values, reported separately.
    pub fn evaluate(name: Option<&str>, email: Option<&str>) -> CheckOutcome {
        match (name, email) {
            (Some(n), Some(e)) => {
                CheckOutcome::pass(format!("user.name={}, user.email={}", n, e))
            }
            (None, Some(_)) => CheckOutcome::fail("user.name is not set"),
            (Some(_), None) => CheckOutcome::fail("user.email is not set"),
            (None, None) => CheckOutcome::fail("user.name and user.email are not set"),
        }
    }
}

impl Check for GitIdentityCheck {
    fn name(&self) -> &str {
        "git-identity"
    }

    fn probe(&self) -> CheckOutcome {
        let name = git_query(&["config", "user.name"]).filter(|v| !v.is_empty());
        let email = git_query(&["config", "user.email"]).filter(|v| !v.is_empty());
        Self::evaluate(name.as_deref(), email.as_deref())
    }

    fn remediation(&self) -> String {
        "git config --global user.name \"Your Name\" && \
         git config --global user.email you@example.com"
            .to_string()
    }
}

/// 3. At least one conventional SSH public key exists.
pub struct SshKeyCheck {
    candidates: Vec<PathBuf>,
}

impl SshKeyCheck {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }
}

impl Default for SshKeyCheck {
    fn default() -> Self {
        let ssh_dir = home::home_dir().unwrap_or_default().join(".ssh");
        Self::new(vec![
            ssh_dir.join("id_rsa.pub"),
            ssh_dir.join("id_ed25519.pub"),
        ])
    }
}

impl Check for SshKeyCheck {
    fn name(&self) -> &str {
        "ssh-key"
    }

    fn probe(&self) -> CheckOutcome {
        for candidate in &self.candidates {
            if candidate.exists() {
                return CheckOutcome::pass(format!("found {}", candidate.display()));
            }
        }
        CheckOutcome::fail("no SSH key pair found (checked id_rsa and id_ed25519)")
    }

    fn remediation(&self) -> String {
        "generate one with: ssh-keygen -t ed25519".to_string()
    }
}

/// 4. The named remote answers a live `git ls-remote` probe. No retry: a
/// transient network blip surfaces as a hard failure.
pub struct RemoteReachableCheck {
    remote: String,
}

impl RemoteReachableCheck {
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
        }
    }
}

impl Check for RemoteReachableCheck {
    fn name(&self) -> &str {
        "remote-reachable"
    }

    fn probe(&self) -> CheckOutcome {
        let reachable = Command::new("git")
            .args(["ls-remote", &self.remote])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success());

        if reachable {
            CheckOutcome::pass(format!("remote '{}' reachable", self.remote))
        } else {
            CheckOutcome::fail(format!("remote '{}' did not respond", self.remote))
        }
    }

    fn remediation(&self) -> String {
        format!(
            "check network connectivity, the '{}' remote URL (git remote -v), \
             and that your SSH key is registered with the host",
            self.remote
        )
    }
}

/// 5. The container engine CLI is present on the search path.
pub struct EngineCliCheck;

impl Check for EngineCliCheck {
    fn name(&self) -> &str {
        "engine-cli"
    }

    fn probe(&self) -> CheckOutcome {
        match which::which("docker") {
            Ok(path) => CheckOutcome::pass(format!("docker at {}", path.display())),
            Err(_) => CheckOutcome::fail("docker CLI not found on PATH"),
        }
    }

    fn remediation(&self) -> String {
        "install Docker: https://docs.docker.com/get-docker/".to_string()
    }
}

/// 6. The engine daemon is reachable and responsive, which is distinct from
/// the CLI merely being installed.
pub struct EngineDaemonCheck;

impl Check for EngineDaemonCheck {
    fn name(&self) -> &str {
        "engine-daemon"
    }

    fn probe(&self) -> CheckOutcome {
        let responsive = Command::new("docker")
            .arg("info")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success());

        if responsive {
            CheckOutcome::pass("daemon responsive")
        } else {
            CheckOutcome::fail("docker daemon is not responding")
        }
    }

    fn remediation(&self) -> String {
        "start the Docker daemon (systemctl start docker, or launch Docker Desktop)".to_string()
    }
}

/// 7. The current branch is not the protected trunk.
pub struct BranchGuardCheck {
    protected: String,
}

impl BranchGuardCheck {
    pub fn new(protected: impl Into<String>) -> Self {
        Self {
            protected: protected.into(),
        }
    }

    /// Exact string comparison against the protected branch name. An empty
    /// branch means detached HEAD, which is not the trunk.
    pub fn evaluate(&self, branch: &str) -> CheckOutcome {
        if branch == self.protected {
            CheckOutcome::fail(format!("currently on protected branch '{}'", self.protected))
        } else if branch.is_empty() {
            CheckOutcome::pass("detached HEAD")
        } else {
            CheckOutcome::pass(format!("on branch '{}'", branch))
        }
    }
}

impl Check for BranchGuardCheck {
    fn name(&self) -> &str {
        "branch-guard"
    }

    fn probe(&self) -> CheckOutcome {
        let branch = git_query(&["branch", "--show-current"]).unwrap_or_default();
        self.evaluate(&branch)
    }

    fn remediation(&self) -> String {
        format!(
            "work on a feature branch: git checkout -b <branch> (not '{}')",
            self.protected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingCheck {
        name: &'static str,
        passes: bool,
        calls: Rc<Cell<usize>>,
    }

    impl CountingCheck {
        fn new(name: &'static str, passes: bool) -> (Self, Rc<Cell<usize>>) {
            let calls = Rc::new(Cell::new(0));
            (
                Self {
                    name,
                    passes,
                    calls: Rc::clone(&calls),
                },
                calls,
            )
        }
    }

    impl Check for CountingCheck {
        fn name(&self) -> &str {
            self.name
        }

        fn probe(&self) -> CheckOutcome {
            self.calls.set(self.calls.get() + 1);
            if self.passes {
                CheckOutcome::pass("ok")
            } else {
                CheckOutcome::fail("boom")
            }
        }

        fn remediation(&self) -> String {
            format!("fix {}", self.name)
        }
    }

    #[test]
    fn test_all_passing_checks_run_once_each() {
        let (a, a_calls) = CountingCheck::new("a", true);
        let (b, b_calls) = CountingCheck::new("b", true);

        let result = Preflight::new(vec![Box::new(a), Box::new(b)]).run_all();

        assert!(result.is_ok());
        assert_eq!(a_calls.get(), 1);
        assert_eq!(b_calls.get(), 1);
    }

    #[test]
    fn test_first_failure_short_circuits_later_checks() {
        let (a, a_calls) = CountingCheck::new("a", false);
        let (b, b_calls) = CountingCheck::new("b", true);
        let (c, c_calls) = CountingCheck::new("c", true);

        let err = Preflight::new(vec![Box::new(a), Box::new(b), Box::new(c)])
            .run_all()
            .unwrap_err();

        assert_eq!(err.name, "a");
        assert_eq!(err.detail, "boom");
        assert_eq!(err.remediation, "fix a");
        assert_eq!(a_calls.get(), 1);
        assert_eq!(b_calls.get(), 0);
        assert_eq!(c_calls.get(), 0);
    }

    #[test]
    fn test_failure_display_includes_remediation() {
        let (a, _) = CountingCheck::new("a", false);
        let err = Preflight::new(vec![Box::new(a)]).run_all().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("boom"));
        assert!(message.contains("fix a"));
    }

    #[test]
    fn test_default_checks_fixed_order() {
        let names: Vec<String> = default_checks()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "git-repo",
                "git-identity",
                "ssh-key",
                "remote-reachable",
                "engine-cli",
                "engine-daemon",
                "branch-guard",
            ]
        );
    }

    #[test]
    fn test_identity_requires_both_name_and_email() {
        assert!(GitIdentityCheck::evaluate(Some("Alice"), Some("a@example.com")).passed);
        let missing_email = GitIdentityCheck::evaluate(Some("Alice"), None);
        assert!(!missing_email.passed);
        assert!(missing_email.detail.contains("user.email"));
        let missing_name = GitIdentityCheck::evaluate(None, Some("a@example.com"));
        assert!(!missing_name.passed);
        assert!(missing_name.detail.contains("user.name"));
        assert!(!GitIdentityCheck::evaluate(None, None).passed);
    }

    #[test]
    fn test_branch_guard_exact_string_compare() {
        let check = BranchGuardCheck::new("main");
        assert!(!check.evaluate("main").passed);
        assert!(check.evaluate("main-feature").passed);
        assert!(check.evaluate("feature/main").passed);
        assert!(check.evaluate("").passed);
    }

    #[test]
    fn test_ssh_key_check_passes_if_either_candidate_exists() {
        let dir = tempfile::TempDir::new().unwrap();
        let rsa = dir.path().join("id_rsa.pub");
        let ed25519 = dir.path().join("id_ed25519.pub");

        let check = SshKeyCheck::new(vec![rsa.clone(), ed25519.clone()]);
        assert!(!check.probe().passed);

        std::fs::write(&ed25519, "ssh-ed25519 AAAA test@host\n").unwrap();
        assert!(check.probe().passed);
    }
}
