//! Build a Debian package with `cargo deb` and install it with `sudo apt`.

use anyhow::{Context, Result};
use clap::Parser;
use expectflow::install::{self, InstallConfig};
use expectflow::workflow::{self, Driver, DriverConfig, Outcome, TerminalPrompter};
use log::{error, info};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(name = "expectflow")]
#[command(version, about = "Build a Debian package and install it, answering prompts along the way", long_about = None)]
struct Args {
    /// Directory to build and install from [default: current directory]
    #[arg(short = 'C', long)]
    project_dir: Option<PathBuf>,

    /// Package passed to `cargo deb -p`
    #[arg(short, long, default_value = "syspixel")]
    package: String,

    /// Directory the printed `target/` path is relative to, seen from the project dir
    #[arg(long, default_value = "..")]
    artifact_root: String,

    /// Skip the cargo and cargo-deb checks
    #[arg(long)]
    skip_prerequisites: bool,

    /// Seconds to wait for sudo's password prompt
    #[arg(long, default_value_t = 10)]
    prompt_timeout: u64,

    /// Seconds allowed for apt once the password was accepted
    #[arg(long, default_value_t = 300)]
    install_timeout: u64,

    /// Seconds allowed for `cargo deb`
    #[arg(long, default_value_t = 1800)]
    build_timeout: u64,

    /// Don't echo command output
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let code = match run(Args::parse()).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    };

    // An interrupted prompt may still be blocked reading stdin; exiting here
    // keeps the runtime from waiting on it.
    workflow::restore_terminal();
    std::process::exit(code);
}

async fn run(args: Args) -> Result<i32> {
    let project_dir = match args.project_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    info!("project dir is {}", project_dir.display());

    let config = InstallConfig {
        project_dir: project_dir.clone(),
        package: args.package,
        artifact_root: args.artifact_root,
        prompt_timeout: Duration::from_secs(args.prompt_timeout),
        install_timeout: Duration::from_secs(args.install_timeout),
        build_timeout: Duration::from_secs(args.build_timeout),
        skip_prerequisites: args.skip_prerequisites,
        ..InstallConfig::default()
    };
    let steps = install::steps(&config).context("invalid package name pattern")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, stopping");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut driver = Driver::new(TerminalPrompter::default())
        .with_config(DriverConfig {
            working_dir: Some(project_dir),
            tee_output: !args.quiet,
            ..DriverConfig::default()
        })
        .with_shutdown(shutdown_rx);

    let outcome = driver.run(steps).await;
    match &outcome {
        Outcome::Completed(summary) => {
            if let Some(artifact) = summary.capture(install::BUILD_STEP) {
                info!("installed {}", artifact);
            }
        }
        Outcome::Aborted(abort) => {
            error!(
                "step {} ({}) failed: {}",
                abort.step_index, abort.step, abort.reason
            );
        }
    }

    Ok(outcome.exit_code())
}
