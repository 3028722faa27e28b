//! Go project handling for gopas.
//!
//! This crate turns a project directory into toolchain commands:
//! - `Dependency` - one `name = version` entry of the `gopasfile`
//! - `ProjectConfig` - optional `gopas.yml` (name, pre-build commands, extra dependencies)
//! - `GoWorkspace` - the private GOPATH layout under `<root>/.gopath`
//! - `WorkspaceMaterializer` - prepares the build directory (`CopyMaterializer` by default)
//! - `Project` / `GoProject` - get, build, run, test and raw toolchain commands
//!
//! # Example
//!
//! ```ignore
//! use gopas_project::{GoProject, Project};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let project = GoProject::open(".")?;
//!     for dependency in project.dependencies()? {
//!         project.get(&dependency).await?;
//!     }
//!     project.build().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dependency;
pub mod error;
pub mod go;
pub mod materializer;
pub mod project;
pub mod workspace;

pub use config::{ProjectConfig, CONFIG_FILE};
pub use dependency::{parse_dependencies, read_dependency_file, Dependency, GOPASFILE};
pub use error::{ProjectError, Result};
pub use go::GoProject;
pub use materializer::{CopyMaterializer, WorkspaceMaterializer};
pub use project::Project;
pub use workspace::{find_packages, GoWorkspace};
