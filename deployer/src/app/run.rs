//! Build-and-deploy pipeline

use std::io::Write;

use tracing::{info, warn};

use crate::app::options::PipelineOptions;
use crate::app::state::RunState;
use crate::deploy::build::BuildRunner;
use crate::deploy::executor::{
    deploy, remove_all_existing_deployments, remove_logs, start_container, ContainerStartup,
    StartupOutcome,
};
use crate::deploy::style::determine_style;
use crate::deploy::toolchain::verify_toolchain;
use crate::errors::DeployError;
use crate::filesys::file::must_exist;
use crate::http::client::HttpClient;
use crate::services::process::{ensure_off, Invocation, SupervisedProcess};
use crate::storage::layout::guess_log_dir;
use crate::terminal::StatusLine;

/// What a successful run did
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// `deployable` or `buildable`
    pub style: &'static str,

    /// Archives built by this run
    pub built: Vec<String>,

    /// Archives copied into the container
    pub deployed: Vec<String>,

    /// Container startup result, when the container was started
    pub startup: Option<StartupOutcome>,
}

/// Run the pipeline, rendering build progress on stdout
pub async fn run(options: &PipelineOptions) -> Result<RunSummary, DeployError> {
    let mut status_line = StatusLine::stdout();
    run_with(options, &mut status_line).await
}

/// Run the pipeline, rendering build progress on `status_line`
///
/// Stages run strictly in order and the first error ends the run.
pub async fn run_with<W: Write>(
    options: &PipelineOptions,
    status_line: &mut StatusLine<W>,
) -> Result<RunSummary, DeployError> {
    let layout = &options.layout;

    let manifest = layout.manifest_file();
    must_exist(manifest.path(), "No pom.xml found").await?;

    let contents = manifest.read_string().await?;
    let style = determine_style(&contents, &options.args, &options.build)?;
    if !style.is_deployable() && options.is_forced() {
        warn!("Building a release version");
    }
    verify_toolchain(&contents).await?;

    let mut state = RunState::new(BuildRunner::from_settings(&options.build)?);
    let build_command = style.build_command();
    let target_dir = layout.target_dir();

    if !style.is_deployable() || options.build_only {
        info!("{}", build_command.label);
        let result = state
            .build(&build_command.command, &layout.project_dir, &target_dir, status_line)
            .await?;
        return Ok(RunSummary {
            style: style.name(),
            built: result.artifacts,
            deployed: Vec::new(),
            startup: None,
        });
    }

    let startup_script = layout.startup_script();
    must_exist(startup_script.path(), "Tomcat startup script not found").await?;
    let webapps_dir = layout.webapps_dir();
    must_exist(webapps_dir.path(), "Tomcat webapps directory not found").await?;

    info!("{}", build_command.label);
    let result = state
        .build(&build_command.command, &layout.project_dir, &target_dir, status_line)
        .await?;

    // The container keeps running when the build fails
    let container = SupervisedProcess::new("Tomcat", &options.container.process_pattern)?
        .with_stop_command(layout.shutdown_script().path().to_path_buf());
    ensure_off(&container).await?;

    match guess_log_dir(&options.container.log_dir_fragment, options.home_dir.as_deref()).await {
        Some(log_dir) => {
            remove_logs(&log_dir).await?;
        }
        None => info!("No Tomcat log directory found"),
    }

    remove_all_existing_deployments(&webapps_dir).await?;
    let deployed = deploy(&webapps_dir, &target_dir, &mut state.artifacts).await?;

    let services = options
        .services
        .iter()
        .map(SupervisedProcess::from_settings)
        .collect::<Result<Vec<_>, _>>()?;
    let startup = ContainerStartup {
        startup_command: Invocation::Program(startup_script.path().to_path_buf()),
        services,
        health_url: options.container.health_url.clone(),
        settle_delay: options.settle_delay(),
    };
    let http = HttpClient::new(options.probe_timeout)?;
    let outcome = start_container(&startup, &target_dir, &mut state.artifacts, &http).await?;

    Ok(RunSummary {
        style: style.name(),
        built: result.artifacts,
        deployed,
        startup: Some(outcome),
    })
}
