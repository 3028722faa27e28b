//! The project abstraction driven by the CLI.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::dependency::Dependency;
use crate::error::Result;

/// A buildable project.
///
/// Every toolchain command runs inside the project's build directory with
/// the project's environment overrides. The first toolchain command of a
/// process prepares that directory.
#[async_trait]
pub trait Project: Send + Sync {
    /// Project import path.
    fn name(&self) -> &str;

    /// Directory toolchain commands run in.
    fn build_dir(&self) -> PathBuf;

    /// Declared dependencies, in declaration order.
    fn dependencies(&self) -> Result<Vec<Dependency>>;

    /// Vendored package import paths to install.
    fn vendor_packages(&self) -> Result<Vec<String>>;

    /// Removes everything the tool generated.
    fn clean(&self) -> Result<()>;

    /// Fetches one dependency.
    async fn get(&self, dependency: &Dependency) -> Result<()>;

    /// Runs the configured pre-build commands.
    async fn pre_build(&self) -> Result<()>;

    /// Compiles and installs the project.
    async fn build(&self) -> Result<()>;

    /// Runs the installed executable with `args` until it exits or the tool
    /// is asked to stop.
    async fn run(&self, args: &[String]) -> Result<()>;

    /// Runs the test suite, optionally producing an HTML coverage report.
    async fn test(&self, cover: bool, packages: &[String]) -> Result<()>;

    /// Runs the toolchain with arbitrary arguments.
    async fn go(&self, args: &[String]) -> Result<()>;
}
