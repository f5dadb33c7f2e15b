//! Settings file management

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Deployer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Optional file to append logs to
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Emit logs as JSON
    #[serde(default)]
    pub json_logs: bool,

    /// Build configuration
    #[serde(default)]
    pub build: BuildSettings,

    /// Servlet container configuration
    #[serde(default)]
    pub container: ContainerSettings,

    /// Auxiliary services the container depends on
    #[serde(default = "default_services")]
    pub services: Vec<ServiceSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_file: None,
            json_logs: false,
            build: BuildSettings::default(),
            container: ContainerSettings::default(),
            services: default_services(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from the default location when it exists
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file yields the built-in defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self, DeployError> {
        let file = match path {
            Some(path) => {
                let file = File::new(path);
                if !file.exists().await {
                    return Err(DeployError::Precondition(format!(
                        "Settings file not found: {}",
                        path.display()
                    )));
                }
                file
            }
            None => match default_settings_path() {
                Some(path) if File::new(&path).exists().await => File::new(path),
                _ => {
                    debug!("No settings file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        debug!("Reading settings from {}", file.path().display());
        file.read_json().await
    }
}

/// `$HOME/.wardeploy/settings.json`
pub fn default_settings_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .map(|home| home.join(".wardeploy").join("settings.json"))
}

/// Build tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Command for war projects
    #[serde(default = "default_deployable_command")]
    pub deployable_command: String,

    /// Command for jar/library projects
    #[serde(default = "default_buildable_command")]
    pub buildable_command: String,

    /// Output lines matching this pattern stay in the scrollback
    #[serde(default = "default_milestone_pattern")]
    pub milestone_pattern: String,

    /// Number of trailing output lines kept for failure diagnosis
    #[serde(default = "default_tail_capacity")]
    pub tail_capacity: usize,
}

fn default_deployable_command() -> String {
    "mvn clean -U package -DskipTests".to_string()
}

fn default_buildable_command() -> String {
    "mvn clean install deploy -DskipTests".to_string()
}

fn default_milestone_pattern() -> String {
    " Building".to_string()
}

fn default_tail_capacity() -> usize {
    25
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            deployable_command: default_deployable_command(),
            buildable_command: default_buildable_command(),
            milestone_pattern: default_milestone_pattern(),
            tail_capacity: default_tail_capacity(),
        }
    }
}

/// Servlet container settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSettings {
    /// Container installation directory; falls back to `CATALINA_HOME`
    #[serde(default)]
    pub home: Option<PathBuf>,

    /// Pattern matching the running container's command line
    #[serde(default = "default_container_pattern")]
    pub process_pattern: String,

    /// Health endpoint, `{name}` is replaced by the artifact's base name
    #[serde(default = "default_health_url")]
    pub health_url: String,

    /// Wait between container startup and the health probe
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Log directory relative to `/` or `$HOME`
    #[serde(default = "default_log_dir_fragment")]
    pub log_dir_fragment: String,
}

fn default_container_pattern() -> String {
    r"org\.apache\.catalina\.startup\.Bootstrap".to_string()
}

fn default_health_url() -> String {
    "http://127.0.0.1:8080/{name}/1/health.json".to_string()
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_log_dir_fragment() -> String {
    "data/logs/tomcat".to_string()
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            home: None,
            process_pattern: default_container_pattern(),
            health_url: default_health_url(),
            settle_delay_ms: default_settle_delay_ms(),
            log_dir_fragment: default_log_dir_fragment(),
        }
    }
}

/// An auxiliary service kept alive alongside the container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceSettings {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub start_command: Option<String>,
    #[serde(default)]
    pub stop_command: Option<String>,
}

fn default_services() -> Vec<ServiceSettings> {
    vec![
        ServiceSettings {
            name: "redis".to_string(),
            pattern: "redis-server".to_string(),
            start_command: Some("redis-server --daemonize yes".to_string()),
            stop_command: None,
        },
        ServiceSettings {
            name: "rabbitmq".to_string(),
            pattern: "rabbitmq".to_string(),
            start_command: Some("rabbitmq-server -detached".to_string()),
            stop_command: None,
        },
    ]
}
