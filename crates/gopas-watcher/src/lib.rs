//! File-change watcher for gopas.
//!
//! This crate keeps one supervised process running and restarts it when
//! source files change:
//! - `WatchSpec` - roots, glob ignore patterns and accepted extensions
//! - `TreeWalk` - depth-first walk yielding the files a spec accepts
//! - `Supervisor` - owns the current process; kills it before starting the next
//! - `ChangeWatcher` - runs a session: poll loop, control loop and supervisor
//!
//! # Example
//!
//! ```ignore
//! use gopas_runner::{CommandDescriptor, ProcessRunner};
//! use gopas_watcher::{BoxError, ChangeWatcher, WatchSpec};
//! use tokio::io::BufReader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let spec = WatchSpec::new()
//!         .with_root(".")
//!         .with_ignores([".git", ".gopath"])?
//!         .with_extensions("go");
//!
//!     let command = CommandDescriptor::parse("go run main.go");
//!     let factory = move || {
//!         let command = command.clone();
//!         async move { ProcessRunner::spawn(command).map_err(BoxError::from) }
//!     };
//!
//!     let watcher = ChangeWatcher::new(spec);
//!     watcher
//!         .watch(factory, BufReader::new(tokio::io::stdin()))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Restart rules
//!
//! The session starts the process once before polling begins. After that a
//! restart happens when a watched file is newer than the session watermark
//! (which then moves to the current time) or when `rs` is read from the
//! control input. `q` ends the session. A failed restart or an unreadable
//! tree ends the session with an error.

pub mod config;
pub mod error;
pub mod event;
pub mod scan;
pub mod supervisor;
pub mod watch_spec;
pub mod watcher;

pub use config::WatcherConfig;
pub use error::{BoxError, Result, WatchError};
pub use event::{RestartTrigger, WatchEvent};
pub use scan::{TreeWalk, WatchedFile};
pub use supervisor::{RunnerFactory, Supervised, Supervisor};
pub use watch_spec::{parse_extensions, WatchSpec};
pub use watcher::ChangeWatcher;
