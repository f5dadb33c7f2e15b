//! Artifact cache unit tests

use std::fs;

use wardeploy::cache::artifacts::ArtifactCache;
use wardeploy::filesys::dir::Dir;

fn touch(dir: &std::path::Path, name: &str) {
    fs::write(dir.join(name), b"PK").unwrap();
}

#[tokio::test]
async fn test_artifact_scan_filters_archives() {
    let target = tempfile::tempdir().unwrap();
    touch(target.path(), "shop.war");
    touch(target.path(), "shop.jar");
    touch(target.path(), "admin-1.war");
    fs::create_dir(target.path().join("classes")).unwrap();

    let mut cache = ArtifactCache::new();
    let artifacts = cache.get_built_artifacts(&Dir::new(target.path())).await.unwrap();

    assert_eq!(artifacts, vec!["admin-1.war", "shop.war"]);
    assert!(cache.is_cached());
}

#[tokio::test]
async fn test_artifact_cache_is_stable_within_cycle() {
    let target = tempfile::tempdir().unwrap();
    let dir = Dir::new(target.path());
    touch(target.path(), "shop.war");

    let mut cache = ArtifactCache::new();
    let first = cache.get_built_artifacts(&dir).await.unwrap();

    // Appears after the first scan; not visible until invalidation
    touch(target.path(), "late.war");
    let second = cache.get_built_artifacts(&dir).await.unwrap();
    assert_eq!(first, second);

    cache.invalidate();
    assert!(!cache.is_cached());
    let third = cache.get_built_artifacts(&dir).await.unwrap();
    assert_eq!(third, vec!["late.war", "shop.war"]);
}

#[tokio::test]
async fn test_missing_output_dir_is_an_error() {
    let mut cache = ArtifactCache::new();
    let result = cache
        .get_built_artifacts(&Dir::new("/nonexistent/wardeploy/target"))
        .await;
    assert!(result.is_err());
    assert!(!cache.is_cached());
}
