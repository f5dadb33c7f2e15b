//! End-to-end pipeline tests with stand-in build and container scripts

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use wardeploy::app::options::PipelineOptions;
use wardeploy::app::run::run_with;
use wardeploy::deploy::executor::StartupOutcome;
use wardeploy::errors::DeployError;
use wardeploy::storage::settings::Settings;
use wardeploy::terminal::StatusLine;

const WAR_POM: &str = r#"<project>
  <version>1.0.0</version>
  <build><plugins><plugin><artifactId>maven-war-plugin</artifactId></plugin></plugins></build>
</project>"#;

struct Fixture {
    _root: tempfile::TempDir,
    project: PathBuf,
    catalina: PathBuf,
    home: PathBuf,
}

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn write_script(path: &Path, body: &str) {
    write(path, &format!("#!/bin/sh\n{}", body));
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn fixture(pom: &str) -> Fixture {
    fixture_at(pom, "tomcat")
}

fn fixture_at(pom: &str, catalina_name: &str) -> Fixture {
    let root = tempfile::tempdir().unwrap();
    let project = root.path().join("project");
    let catalina = root.path().join(catalina_name);
    let home = root.path().join("home");

    write(&project.join("pom.xml"), pom);
    write_script(
        &catalina.join("bin/startup.sh"),
        "echo started > \"$(dirname \"$0\")/started\"\n",
    );
    write_script(&catalina.join("bin/shutdown.sh"), "exit 0\n");
    write(&catalina.join("webapps/app.war"), "old");
    write(&catalina.join("webapps/app/index.jsp"), "old");
    write(&home.join("wardeploy-logs/catalina.out"), "log");

    Fixture {
        _root: root,
        project,
        catalina,
        home,
    }
}

fn options(fixture: &Fixture, build_command: &str, extra_args: &[&str]) -> PipelineOptions {
    let mut settings = Settings::default();
    settings.build.deployable_command = build_command.to_string();
    settings.build.buildable_command = build_command.to_string();
    settings.container.home = Some(fixture.catalina.clone());
    settings.container.process_pattern = "^wardeploy-test-container$".to_string();
    settings.container.log_dir_fragment = "wardeploy-logs".to_string();
    settings.container.settle_delay_ms = 0;
    settings.services = Vec::new();

    let mut args = vec![format!("--project={}", fixture.project.display())];
    args.extend(extra_args.iter().map(|a| a.to_string()));

    let home = fixture.home.display().to_string();
    PipelineOptions::from_settings(&settings, args, move |key| {
        (key == "HOME").then(|| home.clone())
    })
    .unwrap()
}

#[tokio::test]
async fn test_deployable_project_is_redeployed() {
    let fixture = fixture(WAR_POM);
    let options = options(&fixture, "mkdir -p target && echo new > target/app.war", &[]);
    let mut status_line = StatusLine::new(Vec::new(), 60);

    let summary = run_with(&options, &mut status_line).await.unwrap();

    assert_eq!(summary.style, "deployable");
    assert_eq!(summary.deployed, vec!["app.war"]);
    assert_eq!(summary.startup, Some(StartupOutcome::NotProbed));

    let webapps = fixture.catalina.join("webapps");
    assert_eq!(fs::read_to_string(webapps.join("app.war")).unwrap().trim(), "new");
    assert!(!webapps.join("app").exists());
    assert!(fixture.catalina.join("bin/started").exists());
    assert!(!fixture.home.join("wardeploy-logs/catalina.out").exists());
}

#[tokio::test]
async fn test_container_home_with_shell_characters() {
    let fixture = fixture_at(WAR_POM, "tom\"cat $HOME `id`");
    let options = options(&fixture, "mkdir -p target && echo new > target/app.war", &[]);
    let mut status_line = StatusLine::new(Vec::new(), 60);

    let summary = run_with(&options, &mut status_line).await.unwrap();

    assert_eq!(summary.deployed, vec!["app.war"]);
    assert!(fixture.catalina.join("bin/started").exists());
}

#[tokio::test]
async fn test_build_only_leaves_container_untouched() {
    let fixture = fixture(WAR_POM);
    let options = options(
        &fixture,
        "mkdir -p target && echo new > target/app.war",
        &["--build-only"],
    );
    let mut status_line = StatusLine::new(Vec::new(), 60);

    let summary = run_with(&options, &mut status_line).await.unwrap();

    assert_eq!(summary.built, vec!["app.war"]);
    assert!(summary.deployed.is_empty());
    assert!(summary.startup.is_none());
    let webapps = fixture.catalina.join("webapps");
    assert_eq!(fs::read_to_string(webapps.join("app.war")).unwrap(), "old");
}

#[tokio::test]
async fn test_release_library_requires_force() {
    let pom = r#"<project><version>2.0.0</version>
      <build><plugins><plugin><artifactId>maven-jar-plugin</artifactId></plugin></plugins></build>
    </project>"#;
    let fixture = fixture(pom);
    let mut status_line = StatusLine::new(Vec::new(), 60);

    let refused = run_with(&options(&fixture, "true", &[]), &mut status_line).await;
    assert!(matches!(refused, Err(DeployError::Classification(_))));

    let forced = options(&fixture, "mkdir -p target", &["--force"]);
    let summary = run_with(&forced, &mut status_line).await.unwrap();
    assert_eq!(summary.style, "buildable");
    assert!(summary.built.is_empty());
}

#[tokio::test]
async fn test_failed_build_keeps_existing_deployment() {
    let fixture = fixture(WAR_POM);
    let options = options(&fixture, "echo '[ERROR] COMPILATION ERROR'; exit 1", &[]);
    let mut status_line = StatusLine::new(Vec::new(), 60);

    let err = run_with(&options, &mut status_line).await.unwrap_err();

    assert_eq!(err.diagnostics(), ["[ERROR] COMPILATION ERROR".to_string()]);
    assert!(fixture.catalina.join("webapps/app.war").exists());
    assert!(fixture.catalina.join("webapps/app").exists());
}

#[tokio::test]
async fn test_missing_manifest_is_a_precondition_error() {
    let fixture = fixture(WAR_POM);
    fs::remove_file(fixture.project.join("pom.xml")).unwrap();
    let mut status_line = StatusLine::new(Vec::new(), 60);

    let err = run_with(&options(&fixture, "true", &[]), &mut status_line)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Precondition(_)));
}
