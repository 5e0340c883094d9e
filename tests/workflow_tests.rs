//! Integration tests for the workflow driver

#![cfg(unix)]

use expectflow::install::{self, InstallConfig};
use expectflow::workflow::{
    exit_code, AbortReason, Credential, Driver, DriverConfig, Expectation, FollowUp, Outcome,
    Prompter, Reaction, Step,
};
use expectflow::Pattern;
use secrecy::SecretString;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Answers prompts from fixed values and records what was asked.
#[derive(Clone)]
struct ScriptedPrompter {
    secret: String,
    accept: bool,
    delay: Duration,
    secret_requests: Arc<AtomicUsize>,
    confirmations: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPrompter {
    fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
            accept: true,
            delay: Duration::ZERO,
            secret_requests: Arc::new(AtomicUsize::new(0)),
            confirmations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn declining(mut self) -> Self {
        self.accept = false;
        self
    }

    /// Take `delay` to answer, like a person at the keyboard
    fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn secret_requests(&self) -> usize {
        self.secret_requests.load(Ordering::SeqCst)
    }

    fn confirmations(&self) -> Vec<String> {
        self.confirmations.lock().unwrap().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn get_secret(&mut self) -> io::Result<SecretString> {
        self.secret_requests.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        Ok(SecretString::from(self.secret.clone()))
    }

    fn confirm(&mut self, message: &str) -> io::Result<bool> {
        self.confirmations.lock().unwrap().push(message.to_string());
        std::thread::sleep(self.delay);
        Ok(self.accept)
    }
}

fn aborted(outcome: Outcome) -> expectflow::workflow::Abort {
    match outcome {
        Outcome::Aborted(abort) => abort,
        Outcome::Completed(summary) => panic!("expected abort, completed: {:?}", summary),
    }
}

fn completed(outcome: Outcome) -> expectflow::workflow::Summary {
    match outcome {
        Outcome::Completed(summary) => summary,
        Outcome::Aborted(abort) => panic!("expected completion, aborted: {:?}", abort),
    }
}

fn password_exchange(timeout: Duration) -> Reaction {
    Reaction::SendCredential(FollowUp::new(
        vec![
            Expectation::new(
                Pattern::exact("try again"),
                Reaction::Abort(AbortReason::AuthenticationFailed),
            ),
            Expectation::new(Pattern::exact("ACCESS-GRANTED"), Reaction::Continue),
        ],
        timeout,
    ))
}

const CHECK_PASSWORD: &str = r#"sh -c "printf 'password: '; read pw; if [ \"$pw\" = hunter2 ]; then echo ACCESS-GRANTED; else echo 'Sorry, try again.'; fi""#;

#[tokio::test]
async fn test_tool_present() {
    let prompter = ScriptedPrompter::new("unused");
    let install = Step::new("install-cargo", "echo installing").on(Pattern::Eof, Reaction::Continue);

    let probe = Step::new("cargo", r#"sh -c "echo cargo 1.70.0""#)
        .timeout(Duration::from_secs(5))
        .on(Pattern::regex(r"cargo \d+\.\d+\.\d+").unwrap(), Reaction::Continue)
        .on(Pattern::exact("not found"), Reaction::Branch(vec![install.clone()]))
        .on(Pattern::Eof, Reaction::Branch(vec![install]));

    let mut driver = Driver::new(prompter.clone());
    let outcome = driver.run(vec![probe]).await;
    assert_eq!(outcome.exit_code(), exit_code::SUCCESS);

    let summary = completed(outcome);
    assert_eq!(summary.steps.len(), 1);
    assert_eq!(summary.steps[0].name, "cargo");
    assert_eq!(summary.steps[0].matched_index, Some(0));
    assert_eq!(summary.steps[0].matched, "cargo 1.70.0");
    assert_eq!(summary.steps[0].exit_code, Some(0));
    assert!(summary.captures.is_empty());
    assert_eq!(prompter.secret_requests(), 0);
    assert!(prompter.confirmations().is_empty());
}

#[tokio::test]
async fn test_tool_absent_branches_into_install() {
    let prompter = ScriptedPrompter::new("unused");
    let install = Step::new("install-cargo", r#"sh -c "echo installed cargo""#)
        .confirm("Press enter to install cargo")
        .on(Pattern::exact("installed cargo"), Reaction::Continue);

    let probe = Step::new("cargo", r#"sh -c "echo cargo: command not found; exit 127""#)
        .timeout(Duration::from_secs(5))
        .on(Pattern::regex(r"cargo \d+\.\d+\.\d+").unwrap(), Reaction::Continue)
        .on(Pattern::exact("not found"), Reaction::Branch(vec![install.clone()]))
        .on(Pattern::Eof, Reaction::Branch(vec![install]));

    let after = Step::new("after", "echo after").on(Pattern::Eof, Reaction::Continue);

    let mut driver = Driver::new(prompter.clone());
    let summary = completed(driver.run(vec![probe, after]).await);

    let names: Vec<&str> = summary.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["cargo", "install-cargo", "after"]);
    assert_eq!(summary.steps[0].matched_index, Some(1));
    assert_eq!(summary.steps[0].exit_code, Some(127));
    assert_eq!(prompter.confirmations(), vec!["Press enter to install cargo"]);
}

#[tokio::test]
async fn test_wrong_password_aborts_with_authentication_failure() {
    let prompter = ScriptedPrompter::new("wrong");
    let install = Step::new(
        "install",
        r#"sh -c "printf '[sudo] password for user: '; read pw; echo 'Sorry, try again.'; sleep 10""#,
    )
    .timeout(Duration::from_secs(5))
    .on(Pattern::exact("password"), password_exchange(Duration::from_secs(5)));

    let started = Instant::now();
    let mut driver = Driver::new(prompter.clone());
    let outcome = driver.run(vec![install]).await;

    assert_eq!(outcome.exit_code(), exit_code::AUTHENTICATION_FAILED);
    let abort = aborted(outcome);
    assert_eq!(abort.reason, AbortReason::AuthenticationFailed);
    assert_eq!(abort.reason.to_string(), "AuthenticationFailed");
    assert_eq!(abort.step_index, 0);
    assert_eq!(abort.step, "install");
    assert!(abort.summary.steps.is_empty());

    assert_eq!(prompter.secret_requests(), 1);
    // The child was terminated rather than left to finish its sleep
    assert!(started.elapsed() < Duration::from_secs(8));
}

#[tokio::test]
async fn test_correct_password_continues() {
    let prompter = ScriptedPrompter::new("hunter2");
    let install = Step::new("install", CHECK_PASSWORD)
        .timeout(Duration::from_secs(5))
        .on(Pattern::exact("password"), password_exchange(Duration::from_secs(5)));

    let mut driver = Driver::new(prompter.clone());
    let summary = completed(driver.run(vec![install]).await);

    assert_eq!(summary.steps.len(), 1);
    assert_eq!(summary.steps[0].matched, "ACCESS-GRANTED");
    assert_eq!(summary.steps[0].exit_code, Some(0));
    assert!(driver.credential().is_cached());
}

#[tokio::test]
async fn test_credential_is_fetched_once() {
    let prompter = ScriptedPrompter::new("hunter2");
    let first = Step::new("first", CHECK_PASSWORD)
        .on(Pattern::exact("password"), password_exchange(Duration::from_secs(5)));
    let second = Step::new("second", CHECK_PASSWORD)
        .on(Pattern::exact("password"), password_exchange(Duration::from_secs(5)));

    let mut driver = Driver::new(prompter.clone());
    let summary = completed(driver.run(vec![first, second]).await);

    assert_eq!(summary.steps.len(), 2);
    assert_eq!(prompter.secret_requests(), 1);
}

#[tokio::test]
async fn test_preset_credential_skips_prompt() {
    let prompter = ScriptedPrompter::new("wrong");
    let install = Step::new("install", CHECK_PASSWORD)
        .on(Pattern::exact("password"), password_exchange(Duration::from_secs(5)));

    let mut driver = Driver::new(prompter.clone())
        .with_credential(Credential::preset(SecretString::from("hunter2")));
    let outcome = driver.run(vec![install]).await;

    assert!(outcome.is_completed());
    assert_eq!(prompter.secret_requests(), 0);
}

#[tokio::test]
async fn test_no_credential_without_password_prompt() {
    let prompter = ScriptedPrompter::new("hunter2");
    // sudo with cached credentials never asks
    let install = Step::new("install", "echo Setting up syspixel")
        .on(Pattern::exact("password"), password_exchange(Duration::from_secs(5)))
        .on(Pattern::Eof, Reaction::Continue);

    let mut driver = Driver::new(prompter.clone());
    let summary = completed(driver.run(vec![install]).await);

    assert_eq!(summary.steps[0].matched_index, Some(1));
    assert_eq!(prompter.secret_requests(), 0);
    assert!(!driver.credential().is_cached());
}

#[tokio::test]
async fn test_extracted_artifact_feeds_later_step() {
    let build = Step::new(
        "build",
        r#"sh -c "echo Compiling syspixel; echo target/debian/syspixel_1.0.0_amd64.deb""#,
    )
    .on(
        Pattern::regex(r"target/debian/syspixel_\S*\.deb").unwrap(),
        Reaction::Extract,
    )
    .require_success();

    let install = Step::new("install", r#"sh -c "echo installing ../{build}""#)
        .on(
            Pattern::exact("installing ../target/debian/syspixel_1.0.0_amd64.deb"),
            Reaction::Continue,
        );

    let mut driver = Driver::new(ScriptedPrompter::new("unused"));
    let summary = completed(driver.run(vec![build, install]).await);

    assert_eq!(
        summary.capture("build"),
        Some("target/debian/syspixel_1.0.0_amd64.deb")
    );
    assert_eq!(
        summary.steps[1].command,
        "sh -c echo installing ../target/debian/syspixel_1.0.0_amd64.deb"
    );
}

#[tokio::test]
async fn test_unresolved_placeholder() {
    let install = Step::new("install", "sudo apt install -y ../{build}")
        .on(Pattern::Eof, Reaction::Continue);

    let mut driver = Driver::new(ScriptedPrompter::new("unused"));
    let abort = aborted(driver.run(vec![install]).await);

    assert_eq!(
        abort.reason,
        AbortReason::UnresolvedPlaceholder("build".to_string())
    );
    assert_eq!(abort.reason.exit_code(), exit_code::COMMAND_FAILED);
}

#[tokio::test]
async fn test_unregistered_eof_aborts() {
    let step = Step::new("probe", "echo nothing here").on(Pattern::exact("NEVER"), Reaction::Continue);

    let mut driver = Driver::new(ScriptedPrompter::new("unused"));
    let abort = aborted(driver.run(vec![step]).await);

    assert!(matches!(abort.reason, AbortReason::StreamClosed { .. }));
    assert_eq!(abort.reason.exit_code(), exit_code::COMMAND_FAILED);
}

#[tokio::test]
async fn test_unregistered_timeout_aborts() {
    let step = Step::new("probe", "sleep 10")
        .timeout(Duration::from_millis(300))
        .on(Pattern::exact("NEVER"), Reaction::Continue);

    let started = Instant::now();
    let mut driver = Driver::new(ScriptedPrompter::new("unused"));
    let outcome = driver.run(vec![step]).await;

    assert_eq!(outcome.exit_code(), exit_code::TIMED_OUT);
    assert!(matches!(
        aborted(outcome).reason,
        AbortReason::TimedOut { .. }
    ));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_spawn_failure_aborts() {
    let step = Step::new("probe", "definitely-not-a-real-program-4f2a")
        .on(Pattern::Eof, Reaction::Continue);

    let mut driver = Driver::new(ScriptedPrompter::new("unused"));
    let abort = aborted(driver.run(vec![step]).await);

    assert!(matches!(abort.reason, AbortReason::SpawnFailed(_)));
}

#[tokio::test]
async fn test_nonzero_exit_with_require_success() {
    let step = Step::new("build", r#"sh -c "echo error: could not compile; exit 101""#)
        .on(Pattern::Eof, Reaction::Continue)
        .require_success();

    let mut driver = Driver::new(ScriptedPrompter::new("unused"));
    let abort = aborted(driver.run(vec![step]).await);

    assert!(matches!(abort.reason, AbortReason::CommandFailed(ref m) if m.contains("101")));
}

#[tokio::test]
async fn test_abort_reaction_stops_later_steps() {
    let ok = Step::new("first", "echo fine").on(Pattern::Eof, Reaction::Continue);
    let failing = Step::new("second", "echo E: Unable to locate package")
        .on(
            Pattern::exact("Unable to locate"),
            Reaction::Abort(AbortReason::CommandFailed("package not found".to_string())),
        )
        .on(Pattern::Eof, Reaction::Continue);
    let never = Step::new("third", "echo unreachable").on(Pattern::Eof, Reaction::Continue);

    let mut driver = Driver::new(ScriptedPrompter::new("unused"));
    let abort = aborted(driver.run(vec![ok, failing, never]).await);

    assert_eq!(abort.step_index, 1);
    assert_eq!(abort.step, "second");
    assert_eq!(abort.summary.steps.len(), 1);
    assert_eq!(abort.summary.steps[0].name, "first");
}

#[tokio::test]
async fn test_declined_confirmation() {
    let prompter = ScriptedPrompter::new("unused").declining();
    let install = Step::new("install-cargo", "echo installing")
        .confirm("Press enter to install cargo")
        .on(Pattern::Eof, Reaction::Continue);

    let mut driver = Driver::new(prompter.clone());
    let outcome = driver.run(vec![install]).await;

    assert_eq!(outcome.exit_code(), exit_code::DECLINED);
    assert_eq!(aborted(outcome).reason, AbortReason::Declined);
    assert_eq!(prompter.confirmations().len(), 1);
}

#[tokio::test]
async fn test_shutdown_cancels_running_step() {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = tx.send(true);
    });

    let step = Step::new("build", "sleep 30")
        .on(Pattern::exact("NEVER"), Reaction::Continue)
        .timeout(Duration::from_secs(30));

    let started = Instant::now();
    let mut driver = Driver::new(ScriptedPrompter::new("unused")).with_shutdown(rx);
    let outcome = driver.run(vec![step]).await;

    assert_eq!(outcome.exit_code(), exit_code::CANCELLED);
    assert_eq!(aborted(outcome).reason, AbortReason::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_shutdown_before_start() {
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let step = Step::new("probe", "echo hi").on(Pattern::Eof, Reaction::Continue);
    let mut driver = Driver::new(ScriptedPrompter::new("unused")).with_shutdown(rx);
    let abort = aborted(driver.run(vec![step]).await);

    assert_eq!(abort.reason, AbortReason::Cancelled);
    assert_eq!(abort.step_index, 0);
}

fn shutdown_after(delay: Duration) -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = tx.send(true);
    });
    rx
}

#[tokio::test]
async fn test_shutdown_during_password_prompt_withholds_credential() {
    let tools = FakeTools::new("cancel-password");
    let marker = tools.root.join("credential-received");
    let command = format!(
        r#"sh -c "printf 'password: '; read pw; touch {}; sleep 5""#,
        marker.display()
    );
    let install = Step::new("install", command)
        .on(Pattern::exact("password"), password_exchange(Duration::from_secs(5)));

    let prompter = ScriptedPrompter::new("hunter2").slow(Duration::from_secs(2));
    let started = Instant::now();
    let mut driver =
        Driver::new(prompter.clone()).with_shutdown(shutdown_after(Duration::from_millis(100)));
    let outcome = driver.run(vec![install]).await;

    assert_eq!(outcome.exit_code(), exit_code::CANCELLED);
    assert_eq!(aborted(outcome).reason, AbortReason::Cancelled);
    assert!(started.elapsed() < Duration::from_millis(1500));

    // Wait out the prompter; the child must still never see the secret
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(prompter.secret_requests(), 1);
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_shutdown_during_confirmation() {
    let tools = FakeTools::new("cancel-confirm");
    let marker = tools.root.join("installed");
    let install = Step::new("install-cargo", format!("touch {}", marker.display()))
        .confirm("Press enter to install cargo")
        .on(Pattern::Eof, Reaction::Continue);

    let prompter = ScriptedPrompter::new("unused").slow(Duration::from_secs(2));
    let started = Instant::now();
    let mut driver =
        Driver::new(prompter.clone()).with_shutdown(shutdown_after(Duration::from_millis(100)));
    let abort = aborted(driver.run(vec![install]).await);

    assert_eq!(abort.reason, AbortReason::Cancelled);
    assert!(started.elapsed() < Duration::from_millis(1500));

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(!marker.exists());
}

const FAKE_CARGO: &str = r##"#!/bin/sh
state=$(dirname "$0")
case "$1" in
  --version)
    echo "cargo 1.70.0 (ec8a8a0ca 2023-04-25)" ;;
  install)
    echo "  Installing $2 v1.44.1"
    touch "$state/cargo-deb-installed" ;;
  deb)
    if [ ! -e "$state/cargo-deb-installed" ]; then
      echo "error: no such command: \`deb\`"
      exit 101
    fi
    if [ "$2" = "--version" ]; then
      echo "1.44.1"
      exit 0
    fi
    echo "   Compiling $3 v1.0.0"
    echo "target/debian/${3}_1.0.0_amd64.deb" ;;
esac
"##;

const FAKE_SUDO_PROMPTING: &str = r##"#!/bin/sh
state=$(dirname "$0")
printf '[sudo] password for tester: '
read pw
if [ "$pw" != "hunter2" ]; then
  echo "Sorry, try again."
  sleep 5
  exit 1
fi
echo "Reading package lists..."
echo "$@" > "$state/sudo-args"
"##;

/// sudo with cached credentials in front of an apt that takes a while
const FAKE_SUDO_CACHED: &str = r##"#!/bin/sh
state=$(dirname "$0")
echo "Reading package lists..."
sleep 2
echo "Setting up syspixel (1.0.0) ..."
echo "$@" > "$state/sudo-args"
"##;

/// Stand-ins for `cargo` and `sudo` in a scratch directory put first on PATH.
struct FakeTools {
    root: PathBuf,
}

impl FakeTools {
    fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!(
            "expectflow-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("bin")).unwrap();
        fs::create_dir_all(root.join("project")).unwrap();
        Self { root }
    }

    fn with_cargo(self, cargo_deb_installed: bool) -> Self {
        self.script("cargo", FAKE_CARGO);
        if cargo_deb_installed {
            fs::write(self.bin().join("cargo-deb-installed"), "").unwrap();
        }
        self
    }

    fn with_sudo(self, script: &str) -> Self {
        self.script("sudo", script);
        self
    }

    fn script(&self, name: &str, body: &str) {
        let path = self.bin().join(name);
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn bin(&self) -> PathBuf {
        self.root.join("bin")
    }

    fn sudo_args(&self) -> Option<String> {
        fs::read_to_string(self.bin().join("sudo-args"))
            .ok()
            .map(|s| s.trim().to_string())
    }

    fn config(&self) -> InstallConfig {
        InstallConfig {
            project_dir: self.root.join("project"),
            probe_timeout: Duration::from_secs(5),
            prerequisite_timeout: Duration::from_secs(10),
            build_timeout: Duration::from_secs(10),
            prompt_timeout: Duration::from_secs(2),
            install_timeout: Duration::from_secs(10),
            ..InstallConfig::default()
        }
    }

    fn driver(&self, prompter: &ScriptedPrompter) -> Driver {
        let path = format!(
            "{}:{}",
            self.bin().display(),
            std::env::var("PATH").unwrap_or_default()
        );
        Driver::new(prompter.clone()).with_config(DriverConfig {
            working_dir: Some(self.root.join("project")),
            env: vec![("PATH".to_string(), path)],
            ..DriverConfig::default()
        })
    }
}

impl Drop for FakeTools {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn step_names(summary: &expectflow::workflow::Summary) -> Vec<&str> {
    summary.steps.iter().map(|s| s.name.as_str()).collect()
}

#[tokio::test]
async fn test_install_workflow_with_password() {
    let tools = FakeTools::new("install-password")
        .with_cargo(true)
        .with_sudo(FAKE_SUDO_PROMPTING);
    let prompter = ScriptedPrompter::new("hunter2");

    let steps = install::steps(&tools.config()).unwrap();
    let summary = completed(tools.driver(&prompter).run(steps).await);

    assert_eq!(step_names(&summary), vec!["cargo", "cargo-deb", "build", "install"]);
    assert_eq!(
        summary.capture(install::BUILD_STEP),
        Some("target/debian/syspixel_1.0.0_amd64.deb")
    );
    assert_eq!(
        tools.sudo_args().as_deref(),
        Some("apt install -y ../target/debian/syspixel_1.0.0_amd64.deb")
    );
    assert_eq!(prompter.secret_requests(), 1);
    assert!(prompter.confirmations().is_empty());
}

#[tokio::test]
async fn test_install_workflow_installs_missing_cargo_deb() {
    let tools = FakeTools::new("install-cargo-deb")
        .with_cargo(false)
        .with_sudo(FAKE_SUDO_CACHED);
    let prompter = ScriptedPrompter::new("hunter2");

    let steps = install::steps(&tools.config()).unwrap();
    let summary = completed(tools.driver(&prompter).run(steps).await);

    assert_eq!(
        step_names(&summary),
        vec!["cargo", "cargo-deb", "install-cargo-deb", "build", "install"]
    );
    assert_eq!(summary.steps[1].matched_index, Some(0));
    assert_eq!(prompter.confirmations(), vec!["Press enter to install cargo deb"]);
    assert!(tools.bin().join("cargo-deb-installed").exists());
    assert_eq!(prompter.secret_requests(), 0);
}

#[tokio::test]
async fn test_install_workflow_rejected_password() {
    let tools = FakeTools::new("install-rejected")
        .with_cargo(true)
        .with_sudo(FAKE_SUDO_PROMPTING);
    let prompter = ScriptedPrompter::new("wrong");

    let steps = install::steps(&tools.config()).unwrap();
    let outcome = tools.driver(&prompter).run(steps).await;

    assert_eq!(outcome.exit_code(), exit_code::AUTHENTICATION_FAILED);
    let abort = aborted(outcome);
    assert_eq!(abort.reason, AbortReason::AuthenticationFailed);
    assert_eq!(abort.step, "install");
    assert_eq!(abort.step_index, 3);
    assert_eq!(abort.summary.steps.len(), 3);
    assert!(tools.sudo_args().is_none());
}

#[tokio::test]
async fn test_install_without_password_outlasts_prompt_timeout() {
    let tools = FakeTools::new("install-cached")
        .with_cargo(true)
        .with_sudo(FAKE_SUDO_CACHED);
    let prompter = ScriptedPrompter::new("hunter2");
    let config = InstallConfig {
        skip_prerequisites: true,
        prompt_timeout: Duration::from_secs(1),
        ..tools.config()
    };

    let steps = install::steps(&config).unwrap();
    let summary = completed(tools.driver(&prompter).run(steps).await);

    assert_eq!(step_names(&summary), vec!["build", "install"]);
    assert_eq!(summary.steps[1].matched_index, Some(1));
    assert_eq!(summary.steps[1].exit_code, Some(0));
    assert!(summary.steps[1].elapsed >= Duration::from_secs(2));
    assert_eq!(
        tools.sudo_args().as_deref(),
        Some("apt install -y ../target/debian/syspixel_1.0.0_amd64.deb")
    );
    assert_eq!(prompter.secret_requests(), 0);
}
