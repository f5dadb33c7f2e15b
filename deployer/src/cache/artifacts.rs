//! Built artifact cache

use tracing::debug;

use crate::errors::DeployError;
use crate::filesys::dir::Dir;

/// Suffix of deployable web archives
pub const ARCHIVE_SUFFIX: &str = ".war";

/// Whether `name` looks like a deployable archive
pub fn is_archive(name: &str) -> bool {
    name.len() > ARCHIVE_SUFFIX.len() && name.ends_with(ARCHIVE_SUFFIX)
}

/// Archive name without its suffix, i.e. the expanded directory name
pub fn expanded_name(archive: &str) -> &str {
    archive.strip_suffix(ARCHIVE_SUFFIX).unwrap_or(archive)
}

/// Artifact list memoized for one build cycle
///
/// Filled on first lookup, emptied only by [`ArtifactCache::invalidate`].
#[derive(Debug, Default)]
pub struct ArtifactCache {
    artifacts: Option<Vec<String>>,
}

impl ArtifactCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Archives in `output_dir`, scanning only when nothing is cached
    pub async fn get_built_artifacts(&mut self, output_dir: &Dir) -> Result<Vec<String>, DeployError> {
        if let Some(artifacts) = &self.artifacts {
            return Ok(artifacts.clone());
        }

        let artifacts: Vec<String> = output_dir
            .list_names()
            .await?
            .into_iter()
            .filter(|name| is_archive(name))
            .collect();
        debug!("Found {} artifact(s) in {}", artifacts.len(), output_dir.path().display());

        self.artifacts = Some(artifacts.clone());
        Ok(artifacts)
    }

    /// Forget the cached list so the next lookup re-scans
    pub fn invalidate(&mut self) {
        self.artifacts = None;
    }

    /// Whether a list is currently cached
    pub fn is_cached(&self) -> bool {
        self.artifacts.is_some()
    }
}
