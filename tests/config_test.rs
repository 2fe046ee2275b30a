// tests/config_test.rs
use release_sync::config::{load_config, Config, CONFIG_FILE_NAME};
use release_sync::domain::Style;
use release_sync::ReleaseError;
use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_default_config() {
    let config = Config::default();
    assert_eq!(config.changes.file_names, vec!["CHANGES", "CHANGES.md"]);
    assert_eq!(config.repository.main_branch, None);
    assert_eq!(config.repository.remote, "origin");
    assert_eq!(config.style.prefix, None);
    assert!(config.reconcile.track_releases);
    assert!(!config.reconcile.push);
}

#[test]
fn test_load_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    let toml_content = r#"
[changes]
file_names = ["CHANGELOG.md"]

[repository]
main_branch = "develop"
remote = "upstream"

[style]
prefix = "release-"
omit_patch = true

[reconcile]
track_releases = false
push = true
"#;
    temp_file.write_all(toml_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = load_config(Some(temp_file.path().to_str().unwrap())).unwrap();
    assert_eq!(config.changes.file_names, vec!["CHANGELOG.md"]);
    assert_eq!(config.repository.main_branch.as_deref(), Some("develop"));
    assert_eq!(config.repository.remote, "upstream");
    assert_eq!(
        config.style.apply(Style::new("v", false)),
        Style::new("release-", true)
    );
    assert!(!config.reconcile.track_releases);
    assert!(config.reconcile.push);
}

#[test]
fn test_invalid_file_is_an_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[reconcile]\npush = \"maybe\"\n").unwrap();
    temp_file.flush().unwrap();

    let result = load_config(Some(temp_file.path().to_str().unwrap()));
    assert!(matches!(result, Err(ReleaseError::Toml(_))));
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let result = load_config(Some("/definitely/not/here/release-sync.toml"));
    assert!(matches!(result, Err(ReleaseError::Io(_))));
}

#[test]
#[serial]
fn test_load_from_current_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "[repository]\nmain_branch = \"trunk\"\n",
    )
    .unwrap();

    let original_dir = env::current_dir().unwrap();
    env::set_current_dir(dir.path()).unwrap();
    let result = load_config(None);
    env::set_current_dir(original_dir).unwrap();

    let config = result.unwrap();
    assert_eq!(config.repository.main_branch.as_deref(), Some("trunk"));
    assert_eq!(config.repository.remote, "origin");
}
