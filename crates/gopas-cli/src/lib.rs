//! gopas command-line front end.
//!
//! - `cli` - clap definitions
//! - `commands` - dispatch and the `watch` session wiring
//! - `tool` - build, install, run and test actions over a [`gopas_project::Project`]

pub mod cli;
pub mod commands;
pub mod tool;
