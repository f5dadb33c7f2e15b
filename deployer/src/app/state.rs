//! State owned by one pipeline run

use std::io::Write;
use std::path::Path;
use std::process::ExitStatus;

use tracing::info;

use crate::cache::artifacts::ArtifactCache;
use crate::deploy::build::BuildRunner;
use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::terminal::StatusLine;

/// Outcome of a successful build cycle
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub status: ExitStatus,

    /// Last lines of build output
    pub tail: Vec<String>,

    /// Archives found in the output directory afterwards
    pub artifacts: Vec<String>,
}

/// Run-scoped state: the build runner and the artifact cache it invalidates
pub struct RunState {
    pub artifacts: ArtifactCache,
    runner: BuildRunner,
}

impl RunState {
    pub fn new(runner: BuildRunner) -> Self {
        Self {
            artifacts: ArtifactCache::new(),
            runner,
        }
    }

    /// Start a new build cycle in `project_dir`
    ///
    /// The artifact cache is dropped when the build starts and again when it
    /// succeeds, so the next lookup scans the fresh output.
    pub async fn build<W: Write>(
        &mut self,
        command: &str,
        project_dir: &Path,
        output_dir: &Dir,
        status_line: &mut StatusLine<W>,
    ) -> Result<BuildResult, DeployError> {
        self.artifacts.invalidate();
        let output = self.runner.run(command, project_dir, status_line).await?;
        self.artifacts.invalidate();

        let artifacts = if output_dir.exists().await {
            self.artifacts.get_built_artifacts(output_dir).await?
        } else {
            Vec::new()
        };
        info!("Build produced {} war(s)", artifacts.len());

        Ok(BuildResult {
            status: output.status,
            tail: output.tail,
            artifacts,
        })
    }
}
