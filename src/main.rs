//! Focus Timer CLI
//!
//! Task-linked pomodoro timer:
//! - 25 minutes of focused work
//! - 5 minutes of short break
//! - 15 minutes of long break after 4 pomodoros

use anyhow::Result;
use clap::{CommandFactory, Parser};

use focus_timer::cli::{Cli, Commands, Display, IpcClient, SettingsCommand, TaskCommand};
use focus_timer::daemon::{self, DaemonConfig};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins; otherwise `--verbose` raises the default level to info.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        // No command provided, show help
        Cli::command().print_help()?;
        return Ok(());
    };

    if let Commands::Completions { shell } = command {
        generate_completions(shell);
        return Ok(());
    }

    let config = DaemonConfig::resolve(cli.home)?;
    tracing::info!("State directory: {:?}", config.home());

    if let Commands::Daemon = command {
        return daemon::run(&config).await;
    }

    let client = IpcClient::new(&config);
    match command {
        Commands::Start(args) => {
            let response = client.start(args.kind.into()).await?;
            Display::show_command_result(&response);
        }
        Commands::Pause => {
            let response = client.pause().await?;
            Display::show_command_result(&response);
        }
        Commands::Resume => {
            let response = client.resume().await?;
            Display::show_command_result(&response);
        }
        Commands::Reset => {
            let response = client.reset().await?;
            Display::show_command_result(&response);
        }
        Commands::Skip => {
            let response = client.skip().await?;
            Display::show_command_result(&response);
        }
        Commands::Status => {
            let response = client.status().await?;
            Display::show_status(&response);
        }
        Commands::Settings { action } => match action {
            None | Some(SettingsCommand::Show) => {
                let response = client.settings().await?;
                Display::show_settings(&response);
            }
            Some(SettingsCommand::Set(args)) => {
                let response = client.update_settings(args.to_patch()).await?;
                Display::show_settings(&response);
            }
        },
        Commands::Task { action } => execute_task(&client, action).await?,
        Commands::SessionEnd => {
            let response = client.session_end().await?;
            Display::show_command_result(&response);
        }
        Commands::Daemon | Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Executes a task subcommand.
async fn execute_task(client: &IpcClient, action: TaskCommand) -> Result<()> {
    match action {
        TaskCommand::Track { task_id, estimate } => {
            Display::show_tasks(&client.track(task_id, estimate).await?);
        }
        TaskCommand::Untrack { task_id } => {
            Display::show_tasks(&client.untrack(task_id).await?);
        }
        TaskCommand::Estimate { task_id, estimate } => {
            Display::show_tasks(&client.estimate(task_id, estimate).await?);
        }
        TaskCommand::Select { task_id, track } => {
            Display::show_command_result(&client.select(Some(task_id), track).await?);
        }
        TaskCommand::Clear => {
            Display::show_command_result(&client.select(None, false).await?);
        }
        TaskCommand::List => {
            Display::show_tasks(&client.tasks().await?);
        }
    }
    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_status() {
        let cli = Cli::parse_from(["focus-timer", "status"]);
        assert!(matches!(cli.command, Some(Commands::Status)));
    }

    #[test]
    fn test_cli_parse_task_clear() {
        let cli = Cli::parse_from(["focus-timer", "task", "clear"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Task {
                action: TaskCommand::Clear
            })
        ));
    }

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
