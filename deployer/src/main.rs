//! Wardeploy - Entry Point
//!
//! Builds the Maven project in the current directory and redeploys it into
//! the local Tomcat. Any failure ends the run with exit code 1.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use colored::Colorize;
use tracing::{debug, info};

use wardeploy::app::options::{parse_cli_args, PipelineOptions};
use wardeploy::app::run::run;
use wardeploy::errors::DeployError;
use wardeploy::logs::{init_logging, LogLevel, LogOptions};
use wardeploy::storage::settings::Settings;
use wardeploy::utils::{finished_message, version_info};

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let cli_args = parse_cli_args(&args);

    // Print version and exit
    if cli_args.contains_key("version") {
        let version = version_info();
        println!("wardeploy {} ({}, built {})", version.version, version.git_hash, version.build_time);
        return ExitCode::SUCCESS;
    }

    // Retrieve the settings file
    let config_path = cli_args.get("config").map(PathBuf::from);
    let settings = match Settings::load(config_path.as_deref()).await {
        Ok(settings) => settings,
        Err(e) => return fail(e),
    };

    // Initialize logging
    let log_level = match cli_args.get("log-level") {
        Some(level) => match level.parse::<LogLevel>() {
            Ok(level) => level,
            Err(e) => return fail(DeployError::ConfigError(e)),
        },
        None => settings.log_level.clone(),
    };
    let log_options = LogOptions {
        log_level,
        log_file: settings.log_file.clone(),
        json_format: settings.json_logs,
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = match PipelineOptions::from_settings(&settings, args, |key| env::var(key).ok()) {
        Ok(options) => options,
        Err(e) => return fail(e),
    };
    debug!("Running with options: {:?}", options);

    match run(&options).await {
        Ok(summary) => {
            info!(
                "Done: {} project, {} war(s) deployed",
                summary.style,
                summary.deployed.len()
            );
            println!("{}", finished_message(chrono::Local::now()));
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

/// Report a fatal error, with any build output tail first
fn fail(error: DeployError) -> ExitCode {
    let diagnostics = error.diagnostics();
    if !diagnostics.is_empty() {
        println!();
        println!("{}", diagnostics.join("\n"));
    }
    eprintln!("{}", error.to_string().red());
    ExitCode::from(error.exit_code() as u8)
}
