//! One build's worth of Elide resolution and task execution.
//!
//! [`BuildPipeline`] owns the worker pool for the duration of a build. It
//! resolves the binary, installs it when the policy calls for a download,
//! checks its version and then hands out [`ElideCli`] handles and tasks.

use crate::cli::ElideCli;
use crate::config::Settings;
use crate::error::{BuildError, Result};
use crate::exec::{ExecTask, INSTALL_TASK, install_task};
use crate::pool::WorkerPool;
use crate::version::{VersionCheckOutcome, check_version};
use camino::{Utf8Path, Utf8PathBuf};
use elide_installer::artefact::download::DownloadEndpoints;
use elide_installer::command::SystemCommandExecutor;
use elide_installer::locator::LocalBinaryLocator;
use elide_installer::pipeline::{
    InstallBackends, InstallReport, InstallRequest, install_binary, install_binary_with,
};
use elide_installer::platform::PlatformTag;
use elide_installer::resolution::{BinaryOrigin, RuntimeLayout, resolve_binary};
use elide_installer::source::BinaryConfiguration;
use log::{debug, info};

/// Resolution, installation and invocation state for one build.
#[derive(Debug)]
pub struct BuildPipeline {
    settings: Settings,
    config: BinaryConfiguration,
    project_dir: Utf8PathBuf,
    layout: RuntimeLayout,
    platform: Option<PlatformTag>,
    locator: LocalBinaryLocator,
    endpoints: DownloadEndpoints,
    pool: WorkerPool,
}

/// Outcome of [`BuildPipeline::prepare`].
#[derive(Debug)]
pub struct Prepared {
    /// Handle on the resolved binary; `None` when no binary can exist.
    pub cli: Option<ElideCli>,
    /// What the install steps did, when a download was needed.
    pub install: Option<InstallReport>,
    /// What the version check did.
    pub version: VersionCheckOutcome,
}

impl BuildPipeline {
    /// Start a build for `project_dir`, writing into `build_dir`.
    ///
    /// # Errors
    ///
    /// Returns configuration errors from the settings or a pool that cannot
    /// start. The host platform is only classified when a download is due.
    pub fn new(settings: Settings, project_dir: &Utf8Path, build_dir: &Utf8Path) -> Result<Self> {
        let config = settings.binary_configuration()?;
        let locator = LocalBinaryLocator::from_environment(settings.binary.override_path.clone());
        Ok(Self {
            settings,
            config,
            project_dir: project_dir.to_path_buf(),
            layout: RuntimeLayout::new(build_dir.as_std_path()),
            platform: None,
            locator,
            endpoints: DownloadEndpoints::default(),
            pool: WorkerPool::new()?,
        })
    }

    /// Use another local search.
    #[must_use]
    pub fn with_locator(mut self, locator: LocalBinaryLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Use another platform tag instead of classifying the host.
    #[must_use]
    pub fn with_platform(mut self, platform: PlatformTag) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Use other download endpoints.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: DownloadEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// The effective binary configuration.
    #[must_use]
    pub fn config(&self) -> &BinaryConfiguration {
        &self.config
    }

    /// Paths under the build directory.
    #[must_use]
    pub fn layout(&self) -> &RuntimeLayout {
        &self.layout
    }

    /// Resolve and install with HTTP downloads and `cosign` verification.
    ///
    /// # Errors
    ///
    /// See [`prepare_with`](Self::prepare_with).
    pub fn prepare(&self) -> Result<Prepared> {
        self.prepare_inner(|request| {
            install_binary(request, &self.endpoints, &SystemCommandExecutor).map_err(Into::into)
        })
    }

    /// Resolve, install with `backends` and check the version.
    ///
    /// # Errors
    ///
    /// Configuration, download, verification and version errors, in that
    /// order. Verification failures are never softened by silent mode.
    pub fn prepare_with(&self, backends: &InstallBackends<'_>) -> Result<Prepared> {
        self.prepare_inner(|request| {
            install_binary_with(request, &self.endpoints, backends).map_err(Into::into)
        })
    }

    fn prepare_inner<F>(&self, install: F) -> Result<Prepared>
    where
        F: FnOnce(&InstallRequest<'_>) -> Result<InstallReport>,
    {
        let platform = || self.platform.map_or_else(PlatformTag::host, Ok);
        let Some(resolved) = resolve_binary(&self.config, &self.locator, &self.layout, platform)? else {
            if self.config.silent_mode() {
                info!(target: "elide", "no local Elide binary found; Elide tasks will be skipped");
                return Ok(Prepared {
                    cli: None,
                    install: None,
                    version: VersionCheckOutcome::BinaryAbsent,
                });
            }
            return Err(BuildError::BinaryNotFound { path: None });
        };

        let install = match resolved.origin() {
            BinaryOrigin::Download {
                dir,
                version,
                platform,
            } => Some(install(&InstallRequest {
                version,
                platform: *platform,
                dir,
            })?),
            BinaryOrigin::Local(origin) => {
                debug!(target: "elide", "using {origin:?} binary {}", resolved.path().display());
                None
            }
        };

        let cli = self.cli(resolved.path());
        let version = check_version(&cli, &self.config, &self.layout.version_file())?;
        Ok(Prepared {
            cli: Some(cli),
            install,
            version,
        })
    }

    /// A handle on `binary` running inside the project directory.
    #[must_use]
    pub fn cli(&self, binary: &std::path::Path) -> ElideCli {
        ElideCli::new(binary, self.project_dir.as_std_path(), self.pool.handle())
    }

    /// An exec task wired with the diagnostics flags and silent mode.
    #[must_use]
    pub fn exec_task(&self, name: &str) -> ExecTask {
        ExecTask::new(name, self.layout.task_marker(name))
            .debug(self.settings.diagnostics.debug)
            .verbose(self.settings.diagnostics.verbose)
            .telemetry(self.settings.diagnostics.telemetry)
            .silent_mode(self.config.silent_mode())
    }

    /// The install task, or `None` when disabled or without a manifest.
    #[must_use]
    pub fn install_task(&self) -> Option<ExecTask> {
        if !self.settings.install_enabled(&self.project_dir) {
            debug!(target: "elide", "`{INSTALL_TASK}` disabled or no project manifest");
            return None;
        }
        let task = install_task(
            self.layout.task_marker(INSTALL_TASK),
            self.settings.diagnostics.telemetry,
        );
        Some(
            task.debug(self.settings.diagnostics.debug)
                .verbose(self.settings.diagnostics.verbose)
                .silent_mode(self.config.silent_mode()),
        )
    }

    /// End the build, stopping the worker pool.
    pub fn shutdown(self) {
        self.pool.shutdown();
    }
}
