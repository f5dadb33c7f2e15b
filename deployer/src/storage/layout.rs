//! Filesystem layout of a deployment: the Maven project and the Tomcat install

use std::path::{Path, PathBuf};

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Project and container paths for one run
#[derive(Debug, Clone)]
pub struct DeployLayout {
    /// Maven project directory
    pub project_dir: PathBuf,

    /// Container installation (`CATALINA_HOME`)
    pub catalina_home: PathBuf,
}

impl DeployLayout {
    /// Create a new deploy layout
    pub fn new(project_dir: impl Into<PathBuf>, catalina_home: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            catalina_home: catalina_home.into(),
        }
    }

    /// Get the project manifest
    pub fn manifest_file(&self) -> File {
        File::new(self.project_dir.join("pom.xml"))
    }

    /// Get the build output directory
    pub fn target_dir(&self) -> Dir {
        Dir::new(self.project_dir.join("target"))
    }

    /// Get the live deployment directory
    pub fn webapps_dir(&self) -> Dir {
        Dir::new(self.catalina_home.join("webapps"))
    }

    /// Get the container startup script
    pub fn startup_script(&self) -> File {
        File::new(self.catalina_home.join("bin").join("startup.sh"))
    }

    /// Get the container shutdown script
    pub fn shutdown_script(&self) -> File {
        File::new(self.catalina_home.join("bin").join("shutdown.sh"))
    }
}

/// Guess the container log directory
///
/// Tries `/<fragment>` first, then `<home>/<fragment>`.
pub async fn guess_log_dir(fragment: &str, home: Option<&Path>) -> Option<Dir> {
    let fragment = fragment.trim_start_matches('/');

    let absolute = Dir::new(Path::new("/").join(fragment));
    if absolute.exists().await {
        return Some(absolute);
    }

    if let Some(home) = home {
        let in_home = Dir::new(home.join(fragment));
        if in_home.exists().await {
            return Some(in_home);
        }
    }

    None
}
