//! Deployment executor
//!
//! Replaces archives in the container's live directory and brings the
//! container back up. Nothing here is transactional: a failure halfway leaves
//! whatever was already removed or copied.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::cache::artifacts::{expanded_name, is_archive, ArtifactCache};
use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::http::client::{HealthReport, HttpClient};
use crate::services::process::{ensure_running, Invocation, SupervisedProcess};

/// Entry names that could escape the directory they are listed in
fn is_traversal(name: &str) -> bool {
    name.contains("..")
}

/// Remove every archive in `target` along with its expanded directory
///
/// All archives go first, then the directories derived from their names.
/// Returns the removed entry names.
pub async fn remove_all_existing_deployments(target: &Dir) -> Result<Vec<String>, DeployError> {
    let names: Vec<String> = target
        .list_names()
        .await?
        .into_iter()
        .filter(|name| {
            if is_traversal(name) {
                warn!("Skipping suspicious entry {:?}", name);
                return false;
            }
            true
        })
        .collect();

    let mut archives = Vec::new();
    let mut expanded = Vec::new();
    for name in &names {
        if is_archive(name) {
            archives.push(name.clone());
            let dir_name = expanded_name(name);
            if names.iter().any(|n| n == dir_name) && target.subdir(dir_name).exists().await {
                expanded.push(dir_name.to_string());
            }
        }
    }

    for archive in &archives {
        info!("Removing {}", archive);
        target.file(archive).delete().await?;
    }
    for dir in &expanded {
        info!("Removing {}", dir);
        target.subdir(dir).delete().await?;
    }

    Ok(archives.into_iter().chain(expanded).collect())
}

/// Copy every built archive into `live`, replacing earlier copies
///
/// Returns the deployed archive names.
pub async fn deploy(live: &Dir, built: &Dir, cache: &mut ArtifactCache) -> Result<Vec<String>, DeployError> {
    let artifacts = cache.get_built_artifacts(built).await?;
    if artifacts.is_empty() {
        return Err(DeployError::NoArtifact(built.path().display().to_string()));
    }

    for artifact in &artifacts {
        let deployed = live.file(artifact);
        if deployed.exists().await {
            info!("Removing existing deployed war");
            deployed.delete().await?;
        }

        let expanded = live.subdir(expanded_name(artifact));
        if expanded.exists().await {
            info!("Removing existing expanded deployed war");
            expanded.delete().await?;
        }

        info!("Deploying {}", artifact);
        built.file(artifact).copy_to(&deployed).await?;
    }

    Ok(artifacts)
}

/// Delete the files in the container's log directory
///
/// Returns the number of files removed.
pub async fn remove_logs(log_dir: &Dir) -> Result<usize, DeployError> {
    let mut removed = 0;
    for path in log_dir.list_files().await? {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if is_traversal(name) {
            continue;
        }
        info!("Removing {}", name);
        log_dir.file(name).delete().await?;
        removed += 1;
    }
    Ok(removed)
}

/// Archive names of versioned services, e.g. `orders-2.war`
const SERVICE_ARTIFACT_PATTERN: &str = r"-[0-9]+\.war$";

static SERVICE_ARTIFACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(SERVICE_ARTIFACT_PATTERN).expect("service artifact pattern is a valid regex")
});

/// First artifact named like a versioned service
pub fn primary_service_artifact(artifacts: &[String]) -> Option<&str> {
    artifacts
        .iter()
        .map(String::as_str)
        .find(|a| SERVICE_ARTIFACT.is_match(a))
}

/// How the container is started and probed
#[derive(Debug, Clone)]
pub struct ContainerStartup {
    /// Command that launches the container
    pub startup_command: Invocation,

    /// Services that must run before the container starts
    pub services: Vec<SupervisedProcess>,

    /// Health URL template with a `{name}` placeholder
    pub health_url: String,

    /// Fixed wait before probing; not a readiness check
    pub settle_delay: Duration,
}

/// What happened after the container was started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupOutcome {
    /// No versioned service artifact to probe
    NotProbed,
    Probed(HealthReport),
    /// The probe could not reach the container
    ProbeFailed(String),
}

/// Start dependencies and the container, then probe the primary service
pub async fn start_container(
    startup: &ContainerStartup,
    built: &Dir,
    cache: &mut ArtifactCache,
    http: &HttpClient,
) -> Result<StartupOutcome, DeployError> {
    for service in &startup.services {
        ensure_running(service).await?;
    }

    info!("Starting Tomcat");
    let status = startup.startup_command.run().await?;
    if !status.success() {
        return Err(DeployError::ServiceError(format!(
            "Container startup failed ({})",
            status
        )));
    }

    let artifacts = cache.get_built_artifacts(built).await?;
    let Some(service) = primary_service_artifact(&artifacts) else {
        debug!("No versioned service artifact, skipping health check");
        return Ok(StartupOutcome::NotProbed);
    };

    let url = HttpClient::health_url(&startup.health_url, expanded_name(service))?;
    tokio::time::sleep(startup.settle_delay).await;

    match http.probe(url).await {
        Ok(report) => {
            if report.is_healthy() {
                info!("Health check {} -> {}", report.url, report.status);
            } else {
                warn!("Health check {} -> {}", report.url, report.status);
            }
            Ok(StartupOutcome::Probed(report))
        }
        Err(e) => {
            warn!("Health check did not complete: {}", e);
            Ok(StartupOutcome::ProbeFailed(e.to_string()))
        }
    }
}
