//! `TaskBox` task and project shell.
//!
//! Reads one command per line from stdin and prints the result. Logs go to
//! a file so stdout carries only command output. Configuration via CLI
//! flags, environment variables, or config file
//! (`~/.config/taskbox/config.toml`).
//!
//! ```bash
//! cargo run --bin taskbox
//! cargo run --bin taskbox -- --data-dir /tmp/tb --poll-interval-secs 5
//! TASKBOX_LOG=debug cargo run --bin taskbox
//! ```

use std::io;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use taskbox::config::{AppConfig, CliArgs};
use taskbox::logging;
use taskbox::registry::StoreRegistry;
use taskbox::shell::{Command, Shell, ShellError};

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    let config = match AppConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            AppConfig::default()
        }
    };

    let _log_guard = logging::init(
        &cli.log_level,
        cli.log_file.as_deref(),
        &config.storage.data_dir,
    );

    tracing::info!("taskbox starting");

    let registry = StoreRegistry::open(&config.storage).await;
    let shell = Shell::new(registry, config.max_task_title_len).await;
    let poller = shell.snooze().spawn(config.snooze_poll_interval);

    let result = run_shell(&shell).await;

    poller.abort();
    shell.flush().await;
    tracing::info!("taskbox exiting");
    result
}

/// Read-eval-print loop over stdin. Returns on `quit` or end of input.
async fn run_shell(shell: &Shell) -> io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    stdout.write_all(b"taskbox ready, type `help` for commands\n").await?;
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(ShellError::Empty) => continue,
            Err(e) => {
                stdout.write_all(format!("error: {e}\n").as_bytes()).await?;
                continue;
            }
        };
        let quit = command == Command::Quit;
        let output = match shell.execute(command).await {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(error = %e, "command failed");
                format!("error: {e}")
            }
        };
        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
        if quit {
            break;
        }
    }
    Ok(())
}
