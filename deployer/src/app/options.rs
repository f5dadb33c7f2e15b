//! Pipeline configuration options

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::deploy::style::FORCE_FLAG;
use crate::errors::DeployError;
use crate::storage::layout::DeployLayout;
use crate::storage::settings::{BuildSettings, ContainerSettings, ServiceSettings, Settings};

/// Environment variable naming the container installation
pub const CATALINA_HOME_VAR: &str = "CATALINA_HOME";

/// Split `--key=value` and `--flag` arguments into a map
///
/// Flags map to `"true"`; positional arguments are ignored.
pub fn parse_cli_args(args: &[String]) -> HashMap<String, String> {
    let mut cli_args = HashMap::new();

    for arg in args {
        if let Some((key, value)) = arg.split_once('=') {
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    cli_args
}

/// Container home from settings, else from `CATALINA_HOME`
pub fn resolve_catalina_home(
    configured: Option<&Path>,
    get_env: impl Fn(&str) -> Option<String>,
) -> Result<PathBuf, DeployError> {
    if let Some(home) = configured {
        return Ok(home.to_path_buf());
    }

    get_env(CATALINA_HOME_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| DeployError::Precondition(format!("{} is not set", CATALINA_HOME_VAR)))
}

/// Everything one pipeline run needs
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Project and container paths
    pub layout: DeployLayout,

    /// Raw command line arguments, checked for override flags
    pub args: Vec<String>,

    /// Stop after building, even for deployable projects
    pub build_only: bool,

    /// Home directory used when guessing the log directory
    pub home_dir: Option<PathBuf>,

    /// Build settings
    pub build: BuildSettings,

    /// Container settings
    pub container: ContainerSettings,

    /// Auxiliary services
    pub services: Vec<ServiceSettings>,

    /// Timeout of the health probe request
    pub probe_timeout: Duration,
}

impl PipelineOptions {
    /// Combine settings, command line and environment
    pub fn from_settings(
        settings: &Settings,
        args: Vec<String>,
        get_env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, DeployError> {
        let cli_args = parse_cli_args(&args);

        let project_dir = match cli_args.get("project") {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir()?,
        };
        let catalina_home = resolve_catalina_home(settings.container.home.as_deref(), &get_env)?;

        Ok(Self {
            layout: DeployLayout::new(project_dir, catalina_home),
            build_only: cli_args.contains_key("build-only"),
            home_dir: get_env("HOME").map(PathBuf::from),
            build: settings.build.clone(),
            container: settings.container.clone(),
            services: settings.services.clone(),
            probe_timeout: Duration::from_secs(10),
            args,
        })
    }

    /// Whether the release-build override was given
    pub fn is_forced(&self) -> bool {
        self.args.iter().any(|a| a == FORCE_FLAG)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.container.settle_delay_ms)
    }
}
