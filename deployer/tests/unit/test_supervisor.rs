//! Process supervisor unit tests

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::process::{Child, Command};
use std::time::Duration;

use wardeploy::errors::DeployError;
use wardeploy::services::process::{
    ensure_off, ensure_running, Invocation, ProcessStatus, SupervisedProcess,
};

fn spawn_sleeper(seconds: &str) -> Child {
    Command::new("sleep").arg(seconds).spawn().unwrap()
}

#[tokio::test]
async fn test_ensure_off_kills_matching_process() {
    let mut child = spawn_sleeper("4711");
    let sleeper = SupervisedProcess::new("sleeper", "^sleep 4711$")
        .unwrap()
        // a failing graceful stop must not prevent the kill
        .with_stop_command("exit 1");
    assert!(sleeper.is_running());

    let status = ensure_off(&sleeper).await.unwrap();
    assert_eq!(status, ProcessStatus::Stopped(1));

    let exit = child.wait().unwrap();
    assert!(!exit.success());
    assert!(!sleeper.is_running());
}

#[tokio::test]
async fn test_ensure_off_when_not_running() {
    let ghost = SupervisedProcess::new("ghost", "^wardeploy-ghost-process$").unwrap();
    assert_eq!(ensure_off(&ghost).await.unwrap(), ProcessStatus::AlreadyStopped);
}

#[tokio::test]
async fn test_ensure_running_leaves_running_process_alone() {
    let mut child = spawn_sleeper("4712");
    let sleeper = SupervisedProcess::new("sleeper", "^sleep 4712$")
        .unwrap()
        .with_start_command("exit 1");

    let status = ensure_running(&sleeper).await.unwrap();
    assert_eq!(status, ProcessStatus::AlreadyRunning);

    child.kill().unwrap();
    child.wait().unwrap();
}

#[tokio::test]
async fn test_ensure_running_starts_missing_process() {
    let service = SupervisedProcess::new("ghost", "^wardeploy-ghost-process$")
        .unwrap()
        .with_start_command("true");
    assert_eq!(ensure_running(&service).await.unwrap(), ProcessStatus::Started);
}

#[tokio::test]
async fn test_ensure_running_failures() {
    let no_command = SupervisedProcess::new("ghost", "^wardeploy-ghost-process$").unwrap();
    assert!(matches!(
        ensure_running(&no_command).await,
        Err(DeployError::ServiceError(_))
    ));

    let failing = no_command.with_start_command("exit 4");
    assert!(matches!(
        ensure_running(&failing).await,
        Err(DeployError::ServiceError(_))
    ));
}

#[tokio::test]
async fn test_zombie_does_not_count_as_running() {
    // Exits at once and stays defunct until reaped below
    let mut child = Command::new("sleep").arg("0").spawn().unwrap();
    std::thread::sleep(Duration::from_millis(300));

    let defunct = SupervisedProcess::new("defunct", "^sleep$")
        .unwrap()
        .with_start_command("true");
    assert!(!defunct.is_running());
    assert_eq!(ensure_running(&defunct).await.unwrap(), ProcessStatus::Started);

    child.wait().unwrap();
}

#[tokio::test]
async fn test_program_path_is_not_shell_expanded() {
    let scratch = tempfile::tempdir().unwrap();
    let bin = scratch.path().join("tom\"cat `id` $HOME");
    fs::create_dir_all(&bin).unwrap();
    let script = bin.join("startup.sh");
    fs::write(&script, "#!/bin/sh\ntouch \"$(dirname \"$0\")/started\"\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let status = Invocation::Program(script).run().await.unwrap();

    assert!(status.success());
    assert!(bin.join("started").exists());
}
