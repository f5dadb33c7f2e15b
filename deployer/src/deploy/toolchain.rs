//! Java toolchain version check

use std::process::Stdio;

use regex::Regex;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::DeployError;

/// Manifest properties naming the required Java release, by priority
const RELEASE_PROPERTIES: &[&str] = &[
    "maven.compiler.release",
    "maven.compiler.source",
    "maven.compiler.target",
];

/// Major version from `17`, `1.8`, `11.0.2` style strings
fn major_of(version: &str) -> Option<u32> {
    let mut parts = version.trim().split(['.', '_', '-', '+']);
    let first: u32 = parts.next()?.parse().ok()?;
    if first == 1 {
        parts.next()?.parse().ok()
    } else {
        Some(first)
    }
}

/// Java release required by the manifest, if it declares one
pub fn required_release(manifest: &str) -> Option<u32> {
    RELEASE_PROPERTIES.iter().find_map(|property| {
        let pattern = format!(r"<{0}>\s*([^<]*?)\s*</{0}>", regex::escape(property));
        let re = Regex::new(&pattern).ok()?;
        let captures = re.captures(manifest)?;
        major_of(captures.get(1)?.as_str())
    })
}

/// Major version from `java -version` output
pub fn parse_java_major(version_output: &str) -> Option<u32> {
    let re = Regex::new(r#"version\s+"([^"]+)""#).ok()?;
    let captures = re.captures(version_output)?;
    major_of(captures.get(1)?.as_str())
}

/// Compare installed against required major versions
///
/// Older than required is fatal; newer yields a warning message.
pub fn check_toolchain(installed: u32, required: u32) -> Result<Option<String>, DeployError> {
    if installed < required {
        return Err(DeployError::ToolchainMismatch { installed, required });
    }
    if installed > required {
        return Ok(Some(format!(
            "Java {} is installed, the project targets Java {}",
            installed, required
        )));
    }
    Ok(None)
}

/// Installed Java major version, `None` when `java` cannot be run or parsed
pub async fn installed_java_major() -> Option<u32> {
    let output = Command::new("java")
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .await
        .ok()?;

    // java prints its version banner on stderr
    let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stdout));
    let major = parse_java_major(&text);
    debug!("Installed Java major version: {:?}", major);
    major
}

/// Verify the installed Java against what the manifest declares
pub async fn verify_toolchain(manifest: &str) -> Result<(), DeployError> {
    let Some(required) = required_release(manifest) else {
        debug!("Manifest declares no Java release");
        return Ok(());
    };

    let Some(installed) = installed_java_major().await else {
        warn!("Unable to determine the installed Java version (project requires {})", required);
        return Ok(());
    };

    if let Some(warning) = check_toolchain(installed, required)? {
        warn!("{}", warning);
    }
    Ok(())
}
