//! Go toolchain project.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use gopas_runner::{shutdown_signal, CommandDescriptor, ProcessRunner};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::ProjectConfig;
use crate::dependency::{read_dependency_file, Dependency};
use crate::error::{ProjectError, Result};
use crate::materializer::{CopyMaterializer, WorkspaceMaterializer};
use crate::project::Project;
use crate::workspace::GoWorkspace;

const COVER_PROFILE: &str = "cover.out";
const COVER_REPORT: &str = "cover.html";

/// A Go project built inside a private GOPATH.
pub struct GoProject {
    workspace: GoWorkspace,
    config: ProjectConfig,
    materializer: Arc<dyn WorkspaceMaterializer>,
    toolchain: PathBuf,
    bootstrapped: OnceCell<PathBuf>,
}

impl GoProject {
    /// Opens the project rooted at `dir`, reading `gopas.yml` if present.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let root = fs::canonicalize(dir).map_err(|e| ProjectError::io("open", dir, e))?;
        let config = ProjectConfig::load(&root)?;

        let name = config
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .or_else(|| {
                root.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "main".to_string());

        debug!(root = %root.display(), name = %name, "opened project");
        Ok(Self {
            workspace: GoWorkspace::new(root, name),
            config,
            materializer: Arc::new(CopyMaterializer::new()),
            toolchain: PathBuf::from("go"),
            bootstrapped: OnceCell::new(),
        })
    }

    /// Replaces the build-directory materializer.
    pub fn with_materializer(mut self, materializer: impl WorkspaceMaterializer + 'static) -> Self {
        self.materializer = Arc::new(materializer);
        self
    }

    /// Uses another toolchain binary (a name looked up on `PATH`, or a path).
    pub fn with_toolchain(mut self, toolchain: impl Into<PathBuf>) -> Self {
        self.toolchain = toolchain.into();
        self
    }

    /// Path layout.
    pub fn workspace(&self) -> &GoWorkspace {
        &self.workspace
    }

    /// Loaded `gopas.yml`.
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Locates the toolchain and materializes the build directory, once.
    async fn bootstrap(&self) -> Result<&Path> {
        let toolchain = self
            .bootstrapped
            .get_or_try_init(|| async {
                let toolchain = which::which(&self.toolchain).map_err(|_| {
                    ProjectError::ToolchainNotFound(self.toolchain.display().to_string())
                })?;

                let src = self.workspace.private_gopath().join("src");
                fs::create_dir_all(&src).map_err(|e| ProjectError::io("create", &src, e))?;

                let dependencies = self.dependencies()?;
                self.materializer.materialize(
                    self.workspace.root(),
                    &self.workspace.build_dir(),
                    &dependencies,
                )?;

                debug!(toolchain = %toolchain.display(), "workspace ready");
                Ok::<_, ProjectError>(toolchain)
            })
            .await?;
        Ok(toolchain.as_path())
    }

    fn workspace_command(&self, program: impl Into<String>) -> CommandDescriptor {
        CommandDescriptor::new(program)
            .with_dir(self.workspace.build_dir())
            .with_envs(self.workspace.env())
    }
}

#[async_trait]
impl Project for GoProject {
    fn name(&self) -> &str {
        self.workspace.name()
    }

    fn build_dir(&self) -> PathBuf {
        self.workspace.build_dir()
    }

    fn dependencies(&self) -> Result<Vec<Dependency>> {
        let mut dependencies = read_dependency_file(self.workspace.root())?;
        dependencies.extend(self.config.dependencies());
        Ok(dependencies)
    }

    fn vendor_packages(&self) -> Result<Vec<String>> {
        self.workspace.vendor_packages()
    }

    fn clean(&self) -> Result<()> {
        let gopath = self.workspace.private_gopath();
        match fs::remove_dir_all(&gopath) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ProjectError::io("remove", gopath, e)),
        }
    }

    async fn get(&self, dependency: &Dependency) -> Result<()> {
        self.go(&["get".to_string(), dependency.name.clone()]).await
    }

    async fn pre_build(&self) -> Result<()> {
        if self.config.pre_build.is_empty() {
            return Ok(());
        }
        self.bootstrap().await?;

        for (index, argv) in self.config.pre_build.iter().enumerate() {
            let Some((program, args)) = argv.split_first() else {
                return Err(ProjectError::EmptyPreBuild { index });
            };
            info!("  {}", argv.join(" "));
            let command = self.workspace_command(program.as_str()).with_args(args);
            ProcessRunner::new(command).run().await?;
        }
        Ok(())
    }

    async fn build(&self) -> Result<()> {
        self.go(&["install".to_string()]).await
    }

    async fn run(&self, args: &[String]) -> Result<()> {
        let executable = self.workspace.executable();
        let command =
            CommandDescriptor::new(executable.to_string_lossy()).with_args(args.iter().cloned());

        let mut runner = ProcessRunner::new(command);
        runner.start()?;

        let signal = tokio::select! {
            result = runner.wait() => return result.map_err(ProjectError::from),
            signal = shutdown_signal() => signal,
        };

        match signal {
            Ok(name) => info!(signal = name, "stopping {}", self.name()),
            Err(e) => {
                warn!(error = %e, "cannot listen for signals");
                return runner.wait().await.map_err(ProjectError::from);
            }
        }

        let termination = runner.kill().await?;
        debug!(?termination, "executable stopped");
        Ok(())
    }

    async fn test(&self, cover: bool, packages: &[String]) -> Result<()> {
        let mut args = vec!["test".to_string()];
        if cover {
            args.extend(["-coverprofile".to_string(), COVER_PROFILE.to_string()]);
        }
        args.extend(packages.iter().cloned());
        self.go(&args).await?;

        if !cover || !self.build_dir().join(COVER_PROFILE).exists() {
            return Ok(());
        }

        let report = [
            "tool", "cover", "-html", COVER_PROFILE, "-o", COVER_REPORT,
        ]
        .map(String::from);
        self.go(&report).await
    }

    async fn go(&self, args: &[String]) -> Result<()> {
        let toolchain = self.bootstrap().await?;
        let command = self
            .workspace_command(toolchain.to_string_lossy())
            .with_args(args.iter().cloned());

        debug!(command = %command, "running toolchain");
        ProcessRunner::new(command).run().await?;
        Ok(())
    }
}
