//! Deployment style classification
//!
//! The manifest is sniffed, not parsed: only the presence of a few plugin
//! names and the snapshot marker matter, wherever they appear in the file.

use tracing::{debug, info};

use crate::errors::DeployError;
use crate::storage::settings::BuildSettings;

/// Flag that allows building a release (non-snapshot) library
pub const FORCE_FLAG: &str = "--force";

const WAR_MARKERS: &[&str] = &["maven-war-plugin"];
const BUILDABLE_MARKERS: &[&str] = &[
    "maven-jar-plugin",
    "protobuf-maven-plugin",
    "maven-surefire-plugin",
];
const SNAPSHOT_MARKER: &str = "SNAPSHOT</version";

/// Build command plus the header shown while it runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub command: String,
    pub label: String,
}

/// How the project is built and what happens afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentStyle {
    /// A web archive: build, then deploy into the container
    Deployable(BuildCommand),

    /// A library: build, install and publish, no container involved
    Buildable(BuildCommand),
}

impl DeploymentStyle {
    pub fn deployable(settings: &BuildSettings) -> Self {
        DeploymentStyle::Deployable(BuildCommand {
            command: settings.deployable_command.clone(),
            label: "Clean and package".to_string(),
        })
    }

    pub fn buildable(settings: &BuildSettings) -> Self {
        DeploymentStyle::Buildable(BuildCommand {
            command: settings.buildable_command.clone(),
            label: "Install and deploy".to_string(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeploymentStyle::Deployable(_) => "deployable",
            DeploymentStyle::Buildable(_) => "buildable",
        }
    }

    pub fn build_command(&self) -> &BuildCommand {
        match self {
            DeploymentStyle::Deployable(cmd) | DeploymentStyle::Buildable(cmd) => cmd,
        }
    }

    pub fn is_deployable(&self) -> bool {
        matches!(self, DeploymentStyle::Deployable(_))
    }
}

/// Classify the manifest contents and report the result
pub fn determine_style(
    manifest: &str,
    args: &[String],
    settings: &BuildSettings,
) -> Result<DeploymentStyle, DeployError> {
    let style = classify(manifest, args, settings)?;
    info!("Project style: {}", style.name());
    Ok(style)
}

/// Classify manifest contents; first match wins
pub fn classify(
    contents: &str,
    args: &[String],
    settings: &BuildSettings,
) -> Result<DeploymentStyle, DeployError> {
    let mentions = |markers: &[&str]| markers.iter().any(|m| contents.contains(m));

    if mentions(WAR_MARKERS) {
        return Ok(DeploymentStyle::deployable(settings));
    }

    if mentions(BUILDABLE_MARKERS) {
        if !contents.contains(SNAPSHOT_MARKER) {
            if !args.iter().any(|a| a == FORCE_FLAG) {
                return Err(DeployError::Classification(format!(
                    "Declining to build a non-SNAPSHOT jar (consider {})",
                    FORCE_FLAG
                )));
            }
            debug!("Building a release jar because of {}", FORCE_FLAG);
        }
        return Ok(DeploymentStyle::buildable(settings));
    }

    Err(DeployError::Classification(
        "Project type unrecognized - not war/jar?".to_string(),
    ))
}
