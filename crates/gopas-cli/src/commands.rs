//! Command implementations.

use std::path::{Path, PathBuf};

use gopas_project::GoProject;
use gopas_runner::{shutdown_signal, CommandDescriptor, ProcessRunner, RunnerConfig};
use gopas_watcher::{BoxError, ChangeWatcher, WatchSpec};
use tokio::io::BufReader;
use tracing::{error, info, warn};

use crate::cli::{Cli, Commands};
use crate::tool::Tool;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Executes a CLI command.
pub async fn execute(cli: Cli) -> Result<()> {
    let Cli {
        project_dir,
        command,
        ..
    } = cli;
    let tool = || GoProject::open(&project_dir).map(Tool::new);

    match command {
        Commands::List { format } => tool()?.list(format, &mut std::io::stdout().lock()),
        Commands::Clean => tool()?.clean(),
        Commands::Install => tool()?.install().await,
        Commands::Build => tool()?.build().await,
        Commands::Run { args } => tool()?.run(&args).await,
        Commands::Test { cover, packages } => tool()?.test(cover, &packages).await,
        Commands::Go { args } => tool()?.go(&args).await,
        Commands::Watch {
            watch,
            ext,
            ignore,
            exec,
            args,
        } => cmd_watch(&project_dir, &watch, &ext, &ignore, exec.as_deref(), args).await,
    }
}

async fn cmd_watch(
    project_dir: &Path,
    roots: &[PathBuf],
    extensions: &str,
    ignores: &[String],
    exec: Option<&str>,
    args: Vec<String>,
) -> Result<()> {
    let spec = WatchSpec::new()
        .with_roots(roots.iter().map(|root| watch_root(project_dir, root)))
        .with_ignores(ignores)?
        .with_extensions(extensions);

    let command = watch_command(project_dir, exec, args)?;
    info!(command = %command, "supervising");

    let factory = move || {
        let command = command.clone();
        async move {
            // Separates the output of consecutive runs.
            println!();
            let mut runner = supervised(command);
            runner.start()?;
            Ok::<_, BoxError>(runner)
        }
    };

    let shutdown = async {
        match shutdown_signal().await {
            Ok(signal) => info!(signal, "stopping watch"),
            Err(e) => {
                warn!(error = %e, "cannot listen for signals");
                std::future::pending::<()>().await;
            }
        }
    };

    let watcher = ChangeWatcher::new(spec);
    let result = watcher
        .watch_until(factory, BufReader::new(tokio::io::stdin()), shutdown)
        .await;

    if let Err(e) = &result {
        if e.is_fatal() {
            error!(error = %e, "supervised process could not be stopped");
        }
    }
    Ok(result?)
}

/// Runner for a watched command.
///
/// The command gets its own process group, so stopping it also stops
/// anything it started, such as the program behind a nested `gopas run`.
pub fn supervised(command: CommandDescriptor) -> ProcessRunner {
    ProcessRunner::new(command).with_config(RunnerConfig::new().with_process_group(true))
}

/// Resolves a watch root against the project directory.
pub fn watch_root(project_dir: &Path, root: &Path) -> PathBuf {
    if root.is_absolute() || project_dir == Path::new(".") {
        root.to_path_buf()
    } else {
        project_dir.join(root)
    }
}

/// Command supervised by `watch`: the `--exec` line split on whitespace, or
/// this executable with `args` (default `run`).
pub fn watch_command(
    project_dir: &Path,
    exec: Option<&str>,
    args: Vec<String>,
) -> Result<CommandDescriptor> {
    let command = match exec {
        Some(line) => CommandDescriptor::parse(line),
        None => {
            let exe = std::env::current_exe()?;
            let args = if args.is_empty() {
                vec!["run".to_string()]
            } else {
                args
            };
            CommandDescriptor::new(exe.to_string_lossy()).with_args(args)
        }
    };

    if command.name().is_empty() {
        return Err("--exec needs a command".into());
    }
    Ok(command.with_dir(project_dir))
}
