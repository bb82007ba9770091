mod config;
mod error;
mod launch;
mod runtime;
#[cfg(test)]
mod testutil;

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::{Result, anyhow};
use config::LaunchConfig;
use launch::ExitStatus;
use runtime::Interpreter;
use tracing::{debug, info};

fn main() -> ExitCode {
    match launch_editor() {
        Ok(status) => status.into(),
        Err(err) => {
            debug!("launch failed: {:#}", err);
            eprintln!("vy_launcher: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn launch_editor() -> Result<ExitStatus> {
    let config = LaunchConfig::from_parent()?;

    // Logs go to stderr, stdout belongs to the editor
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(config.log_level)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .try_init()
        .map_err(|e| anyhow!("failed to install logger: {}", e))?;

    info!(
        "vy_launcher starting, {} forwarded argument(s)",
        config.args.len()
    );

    // Stage 1: bring the runtime up
    let interp = Interpreter::bring_up()?;

    // Stage 2: hand over to the application. Errors are rendered while the
    // runtime is still up, their Python causes need it.
    let outcome = interp
        .run(&config)
        .map_err(|err| anyhow!("{:#}", anyhow::Error::from(err)));

    // Stage 3: paired shutdown, which runs the application's atexit hooks
    let shutdown = interp.finalize();
    debug!("runtime {:?}", runtime::state());
    let status = outcome?;
    if shutdown != ExitStatus::SUCCESS && status == ExitStatus::SUCCESS {
        return Ok(shutdown);
    }
    Ok(status)
}
