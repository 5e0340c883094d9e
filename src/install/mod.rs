//! The build-and-install workflow for a Debian-packaged crate
//!
//! 1. make sure `cargo` is available, installing rustup if it is not
//! 2. make sure `cargo deb` is available, installing it if it is not
//! 3. `cargo deb -p <package>`, extracting the produced `.deb` path
//! 4. `sudo apt install` the package, answering the password prompt

use crate::pattern::Pattern;
use crate::workflow::{AbortReason, Expectation, FollowUp, Reaction, Step};
use std::path::PathBuf;
use std::time::Duration;

/// Name of the build step, and so of the placeholder holding the artifact path
pub const BUILD_STEP: &str = "build";

/// First line apt prints once it runs
const APT_STARTED: &str = "Reading package lists";

/// Settings for [`steps`].
#[derive(Debug, Clone)]
pub struct InstallConfig {
    /// Directory `cargo deb` and `apt` run in
    pub project_dir: PathBuf,
    /// Package passed to `cargo deb -p`
    pub package: String,
    /// Directory the `target/` path printed by `cargo deb` is relative to,
    /// as seen from `project_dir`
    pub artifact_root: String,
    /// Deadline for the `--version` probes
    pub probe_timeout: Duration,
    /// Deadline for installing rustup or cargo-deb
    pub prerequisite_timeout: Duration,
    /// Deadline for `cargo deb`
    pub build_timeout: Duration,
    /// Deadline for sudo's password prompt, or for apt's first output when
    /// sudo does not ask
    pub prompt_timeout: Duration,
    /// Deadline for apt to finish
    pub install_timeout: Duration,
    /// Skip the cargo and cargo-deb checks
    pub skip_prerequisites: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            package: "syspixel".to_string(),
            artifact_root: "..".to_string(),
            probe_timeout: Duration::from_secs(30),
            prerequisite_timeout: Duration::from_secs(30 * 60),
            build_timeout: Duration::from_secs(30 * 60),
            prompt_timeout: Duration::from_secs(10),
            install_timeout: Duration::from_secs(5 * 60),
            skip_prerequisites: false,
        }
    }
}

/// Build the ordered step list for `config`.
pub fn steps(config: &InstallConfig) -> Result<Vec<Step>, regex::Error> {
    let mut steps = Vec::with_capacity(4);

    if !config.skip_prerequisites {
        steps.push(cargo_probe(config)?);
        steps.push(cargo_deb_probe(config)?);
    }

    steps.push(build(config)?);
    steps.push(install(config));
    Ok(steps)
}

fn cargo_probe(config: &InstallConfig) -> Result<Step, regex::Error> {
    let install_rustup = Step::new(
        "install-rustup",
        r#"sh -c "curl --proto '=https' --tlsv1.2 -sSf https://sh.rustup.rs | sh -s -- -y""#,
    )
    .confirm("Press enter to install cargo")
    .timeout(config.prerequisite_timeout)
    .on(Pattern::Eof, Reaction::Continue)
    .require_success();

    Ok(Step::new("cargo", r#"sh -c "cargo --version""#)
        .timeout(config.probe_timeout)
        .on(Pattern::regex(r"cargo \d+\.\d+\.\d+")?, Reaction::Continue)
        .on(
            Pattern::exact("not found"),
            Reaction::Branch(vec![install_rustup.clone()]),
        )
        .on(Pattern::Eof, Reaction::Branch(vec![install_rustup])))
}

fn cargo_deb_probe(config: &InstallConfig) -> Result<Step, regex::Error> {
    let install_cargo_deb = Step::new("install-cargo-deb", "cargo install cargo-deb")
        .confirm("Press enter to install cargo deb")
        .timeout(config.prerequisite_timeout)
        .on(Pattern::Eof, Reaction::Continue)
        .require_success();

    Ok(Step::new("cargo-deb", r#"sh -c "cargo deb --version""#)
        .timeout(config.probe_timeout)
        .on(
            Pattern::exact("no such command"),
            Reaction::Branch(vec![install_cargo_deb.clone()]),
        )
        .on(
            Pattern::exact("not found"),
            Reaction::Branch(vec![install_cargo_deb.clone()]),
        )
        .on(Pattern::regex(r"\d+\.\d+\.\d+")?, Reaction::Continue)
        .on(Pattern::Eof, Reaction::Branch(vec![install_cargo_deb])))
}

fn build(config: &InstallConfig) -> Result<Step, regex::Error> {
    let artifact = format!(r"target/debian/{}_\S*\.deb", regex::escape(&config.package));

    Ok(Step::new(
        BUILD_STEP,
        format!("cargo deb -p {}", shell_words::quote(&config.package)),
    )
    .working_dir(&config.project_dir)
    .timeout(config.build_timeout)
    .on(Pattern::regex(&artifact)?, Reaction::Extract)
    .require_success())
}

fn install(config: &InstallConfig) -> Step {
    let after_password = FollowUp::new(
        vec![
            Expectation::new(
                Pattern::exact("try again"),
                Reaction::Abort(AbortReason::AuthenticationFailed),
            ),
            Expectation::new(Pattern::Eof, Reaction::Continue),
            Expectation::new(
                Pattern::Timeout,
                Reaction::Abort(AbortReason::CommandFailed(
                    "apt install did not finish".to_string(),
                )),
            ),
        ],
        config.install_timeout,
    );

    let root = config.artifact_root.trim_end_matches('/');
    Step::new(
        "install",
        format!(
            "sudo apt install -y {}/{{{}}}",
            shell_words::quote(root),
            BUILD_STEP
        ),
    )
    .working_dir(&config.project_dir)
    .timeout(config.prompt_timeout)
    .completion_timeout(config.install_timeout)
    .on(
        Pattern::exact("password"),
        Reaction::SendCredential(after_password),
    )
    // sudo still had cached credentials
    .on(Pattern::exact(APT_STARTED), Reaction::Continue)
    .on(Pattern::Eof, Reaction::Continue)
    .require_success()
}
