//! Subprocess supervision for gopas.
//!
//! This crate launches external commands and stops them reliably:
//! - `CommandDescriptor` - executable, arguments, working directory and
//!   environment overrides
//! - `ProcessRunner` - launches one command at a time, waits for it and kills it
//! - `Sink` - where a child's stdout and stderr are copied to
//!
//! # Example
//!
//! ```ignore
//! use gopas_runner::{CommandDescriptor, ProcessRunner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let command = CommandDescriptor::new("go")
//!         .with_args(["build", "./..."])
//!         .with_env("GOPATH=/work/.gopath");
//!
//!     let mut runner = ProcessRunner::new(command);
//!     runner.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Stopping
//!
//! [`ProcessRunner::kill`] first interrupts the child (SIGINT on unix) and
//! gives it a graceful window, three seconds by default, to exit. If it is
//! still alive afterwards it is terminated forcibly. On targets without a
//! cooperative signal the forced termination happens immediately.
//!
//! A failed forced termination is reported as a fatal
//! [`RunnerError::ForcedKill`]; callers are expected to exit.

pub mod command;
pub mod config;
pub mod error;
pub mod runner;
pub mod signal;
pub mod sink;

pub use command::{resolve_env, CommandDescriptor};
pub use config::RunnerConfig;
pub use error::{Result, RunnerError};
pub use runner::{ProcessRunner, Termination};
pub use signal::{shutdown_signal, Interrupt};
pub use sink::{SharedBuffer, Sink};
