//! Build runner unit tests

use std::path::Path;

use wardeploy::app::state::RunState;
use wardeploy::deploy::build::BuildRunner;
use wardeploy::errors::DeployError;
use wardeploy::filesys::dir::Dir;
use wardeploy::terminal::StatusLine;

fn runner() -> BuildRunner {
    BuildRunner::new(25, " Building").unwrap()
}

fn rendered(status_line: StatusLine<Vec<u8>>) -> String {
    String::from_utf8(status_line.into_inner()).unwrap()
}

#[tokio::test]
async fn test_successful_build_keeps_tail() {
    let mut status_line = StatusLine::new(Vec::new(), 40);
    let output = runner()
        .run("printf '  one  \\n\\n\\ntwo\\n'", Path::new("."), &mut status_line)
        .await
        .unwrap();

    assert!(output.status.success());
    assert_eq!(output.tail, vec!["one", "two"]);
    assert!(rendered(status_line).contains(" Build Success"));
}

#[tokio::test]
async fn test_tail_is_bounded_to_most_recent_lines() {
    let mut status_line = StatusLine::new(Vec::new(), 40);
    let output = runner()
        .run("seq 1 40", Path::new("."), &mut status_line)
        .await
        .unwrap();

    let expected: Vec<String> = (16..=40).map(|i| i.to_string()).collect();
    assert_eq!(output.tail, expected);
}

#[tokio::test]
async fn test_lines_are_truncated_to_width() {
    let mut status_line = StatusLine::new(Vec::new(), 5);
    let output = runner()
        .run("echo 'abcdefghij'", Path::new("."), &mut status_line)
        .await
        .unwrap();

    assert_eq!(output.tail, vec!["abcde"]);
}

#[tokio::test]
async fn test_milestones_are_committed() {
    let mut status_line = StatusLine::new(Vec::new(), 30);
    runner()
        .run(
            "echo '[INFO] Building shop 1.0'; echo '[INFO] compiling'",
            Path::new("."),
            &mut status_line,
        )
        .await
        .unwrap();

    let out = rendered(status_line);
    let committed: Vec<&str> = out
        .split('\n')
        .filter(|l| !l.is_empty())
        .map(|l| l.rsplit('\r').next().unwrap_or("").trim_end())
        .collect();
    // Milestone stays on its own row; the plain line is overwritten by the result
    assert_eq!(committed.first(), Some(&"[INFO] Building shop 1.0"));
    assert!(out.contains("\r[INFO] compiling"));
}

#[tokio::test]
async fn test_failed_build_carries_tail() {
    let mut status_line = StatusLine::new(Vec::new(), 40);
    let err = runner()
        .run(
            "echo 'compiling'; echo '[ERROR] BUILD FAILURE'; echo 'oops' >&2; exit 3",
            Path::new("."),
            &mut status_line,
        )
        .await
        .unwrap_err();

    match err {
        DeployError::BuildFailed { status, tail } => {
            assert!(status.contains('3'));
            assert_eq!(tail, vec!["compiling", "[ERROR] BUILD FAILURE", "oops"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_non_utf8_stderr_does_not_break_the_build() {
    let mut status_line = StatusLine::new(Vec::new(), 40);
    let output = runner()
        .run(
            "printf 'caf\\351\\n' >&2; sleep 0.3; echo 'still compiling' >&2; echo done; exit 0",
            Path::new("."),
            &mut status_line,
        )
        .await
        .unwrap();

    assert!(output.status.success());
    assert_eq!(output.tail, vec!["done"]);
}

#[tokio::test]
async fn test_non_utf8_stderr_is_kept_in_failure_tail() {
    let mut status_line = StatusLine::new(Vec::new(), 40);
    let err = runner()
        .run(
            "printf 'caf\\351\\n' >&2; sleep 0.3; echo 'still compiling' >&2; exit 1",
            Path::new("."),
            &mut status_line,
        )
        .await
        .unwrap_err();

    assert_eq!(err.diagnostics(), ["caf\u{fffd}".to_string(), "still compiling".to_string()]);
}

#[tokio::test]
async fn test_build_runs_in_project_dir_and_resolves_artifacts() {
    let project = tempfile::tempdir().unwrap();
    let target = Dir::new(project.path().join("target"));
    let mut state = RunState::new(runner());
    let mut status_line = StatusLine::new(Vec::new(), 40);

    let result = state
        .build(
            "mkdir -p target && echo war > target/shop.war",
            project.path(),
            &target,
            &mut status_line,
        )
        .await
        .unwrap();
    assert_eq!(result.artifacts, vec!["shop.war"]);

    // A new cycle re-scans the output directory
    let result = state
        .build(
            "echo war > target/admin.war",
            project.path(),
            &target,
            &mut status_line,
        )
        .await
        .unwrap();
    assert_eq!(result.artifacts, vec!["admin.war", "shop.war"]);
}

#[test]
fn test_invalid_milestone_pattern() {
    assert!(matches!(
        BuildRunner::new(25, "[unclosed"),
        Err(DeployError::PatternError(_))
    ));
}

#[test]
fn test_build_blocks_on_runtime() {
    let mut status_line = StatusLine::new(Vec::new(), 40);
    let output = tokio_test::block_on(runner().run("echo ok", Path::new("."), &mut status_line));
    assert_eq!(output.unwrap().tail, vec!["ok"]);
}
