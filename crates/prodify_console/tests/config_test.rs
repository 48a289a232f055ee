//! Layered configuration loading.

use prodify_console::{ConfigOverrides, ConsoleConfig};
use std::io::Write;
use std::time::Duration;

fn toml_file(contents: &str) -> anyhow::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[test]
fn test_file_values_override_defaults() -> anyhow::Result<()> {
    let file = toml_file(
        r#"
base_url = "http://gateway.internal:8000"
api_key = "from-file"
poll_interval_ms = 500
max_poll_attempts = 30
max_poll_duration_secs = 120
"#,
    )?;

    let config = ConsoleConfig::load(Some(file.path()))?;

    assert_eq!(config.base_url(), "http://gateway.internal:8000");
    assert_eq!(config.api_key(), "from-file");
    assert_eq!(*config.request_timeout(), Duration::from_secs(60));
    let policy = config.poll_policy();
    assert_eq!(*policy.interval(), Duration::from_millis(500));
    assert_eq!(*policy.max_attempts(), Some(30));
    assert_eq!(*policy.max_duration(), Some(Duration::from_secs(120)));
    Ok(())
}

#[test]
fn test_overrides_win_over_file() -> anyhow::Result<()> {
    let file = toml_file("base_url = \"http://from-file:8000\"\n")?;

    let config = ConsoleConfig::load_with(
        Some(file.path()),
        ConfigOverrides {
            base_url: Some("https://from-flag.example".into()),
            api_key: None,
        },
    )?;

    assert_eq!(config.base_url(), "https://from-flag.example");
    Ok(())
}

#[test]
fn test_invalid_values_are_rejected() -> anyhow::Result<()> {
    let file = toml_file("poll_interval_ms = 0\n")?;
    let err = ConsoleConfig::load(Some(file.path())).unwrap_err();
    assert!(err.message.contains("poll_interval_ms"));

    let file = toml_file("base_url = \"ftp://gateway\"\n")?;
    assert!(ConsoleConfig::load(Some(file.path())).is_err());
    Ok(())
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("absent.toml");
    assert!(ConsoleConfig::load(Some(&missing)).is_err());
}
