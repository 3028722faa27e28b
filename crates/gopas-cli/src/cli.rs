//! Command-line interface definition using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gopas - build, test and live-reload Go projects in a private GOPATH
#[derive(Parser, Debug)]
#[command(name = "gopas")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Project directory
    #[arg(
        short = 'C',
        long,
        env = "GOPAS_PROJECT_DIR",
        default_value = "."
    )]
    pub project_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the project's dependencies
    List {
        /// Output format (table, json, brief)
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove the private GOPATH
    Clean,

    /// Fetch dependencies and install vendored packages
    Install,

    /// Install, run pre-build commands, then build the project
    Build,

    /// Build, then run the project executable
    Run {
        /// Arguments passed to the executable
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run the project's tests
    Test {
        /// Write cover.out and an HTML report to cover.html
        #[arg(long)]
        cover: bool,

        /// Packages to test (default: the project package)
        packages: Vec<String>,
    },

    /// Run the Go toolchain inside the project workspace
    Go {
        /// Toolchain arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Restart a command whenever watched files change
    Watch {
        /// Directory to watch (repeatable)
        #[arg(short, long = "watch", default_value = ".")]
        watch: Vec<PathBuf>,

        /// Comma-separated file extensions that trigger a restart
        #[arg(short, long, default_value = "go")]
        ext: String,

        /// Glob pattern of paths to ignore (repeatable)
        #[arg(short, long = "ignore", default_values_t = [String::from(".git"), String::from(".gopath")])]
        ignore: Vec<String>,

        /// Command to supervise, split on whitespace (default: gopas itself)
        #[arg(short = 'x', long)]
        exec: Option<String>,

        /// gopas arguments to supervise when --exec is not given (default: run)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Brief,
}

impl Cli {
    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
