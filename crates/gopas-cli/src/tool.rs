//! Project actions behind each subcommand.

use std::io::Write;

use gopas_project::Project;
use tracing::{info, warn};

use crate::cli::OutputFormat;
use crate::commands::Result;

/// Runs gopas actions against a project.
pub struct Tool<P> {
    project: P,
}

impl<P: Project> Tool<P> {
    /// Creates a tool for `project`.
    pub fn new(project: P) -> Self {
        Self { project }
    }

    /// The project actions run against.
    pub fn project(&self) -> &P {
        &self.project
    }

    /// Writes the declared dependencies to `out`.
    pub fn list(&self, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
        let dependencies = self.project.dependencies()?;

        match format {
            OutputFormat::Table => {
                writeln!(out, "{:<48} VERSION", "NAME")?;
                for dependency in &dependencies {
                    let version = if dependency.version.is_empty() {
                        "-"
                    } else {
                        dependency.version.as_str()
                    };
                    writeln!(out, "{:<48} {}", dependency.name, version)?;
                }
                writeln!(out, "dependencies({})", dependencies.len())?;
            }
            OutputFormat::Json => {
                writeln!(out, "{}", serde_json::to_string_pretty(&dependencies)?)?;
            }
            OutputFormat::Brief => {
                for dependency in &dependencies {
                    writeln!(out, "{}", dependency)?;
                }
            }
        }

        Ok(())
    }

    /// Removes the private GOPATH.
    pub fn clean(&self) -> Result<()> {
        info!("Cleaning {}", self.project.name());
        self.project.clean()?;
        Ok(())
    }

    /// Fetches every dependency, then installs vendored packages.
    ///
    /// A dependency that cannot be fetched is reported and skipped.
    pub async fn install(&self) -> Result<()> {
        let dependencies = self.project.dependencies()?;
        info!("Installing {} dependencies", dependencies.len());

        let mut failed = 0;
        for dependency in &dependencies {
            info!("  {}", dependency);
            match self.project.get(dependency).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    warn!(error = %e, "  ---> {} fail", dependency);
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            warn!(failed, "some dependencies could not be fetched");
        }

        for package in self.project.vendor_packages()? {
            info!("  install {}", package);
            self.project
                .go(&["install".to_string(), package])
                .await?;
        }

        Ok(())
    }

    /// Installs, runs the pre-build commands, then builds.
    pub async fn build(&self) -> Result<()> {
        self.install().await?;

        info!("Building {}", self.project.name());
        self.project.pre_build().await?;
        self.project.build().await?;
        Ok(())
    }

    /// Builds, then runs the executable with `args`.
    pub async fn run(&self, args: &[String]) -> Result<()> {
        self.build().await?;

        info!("Running {}", self.project.name());
        self.project.run(args).await?;
        Ok(())
    }

    /// Runs the test suite.
    pub async fn test(&self, cover: bool, packages: &[String]) -> Result<()> {
        info!("Testing {}", self.project.name());
        self.project.test(cover, packages).await?;

        if cover {
            let report = self.project.build_dir().join("cover.html");
            if report.exists() {
                info!("coverage report: {}", report.display());
            } else {
                warn!("no coverage report was produced");
            }
        }
        Ok(())
    }

    /// Passes `args` to the toolchain.
    pub async fn go(&self, args: &[String]) -> Result<()> {
        self.project.go(args).await?;
        Ok(())
    }
}
