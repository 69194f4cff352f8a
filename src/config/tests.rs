use super::validation::{validate_config, validate_coordinates};
use super::*;
use serial_test::serial;
use std::fs;
use tempfile::tempdir;

fn create_test_config(
    endpoint: Option<&str>,
    fetch_timeout_secs: Option<u64>,
    accuracy_threshold: Option<f64>,
) -> Config {
    Config {
        endpoint: endpoint.map(|s| s.to_string()),
        fetch_timeout_secs,
        accuracy_threshold,
        accuracy_preference: None,
    }
}

#[test]
fn test_defaults_when_fields_missing() {
    let config = create_test_config(None, None, None);
    assert_eq!(config.endpoint(), "https://api.sunrise-sunset.org");
    assert_eq!(config.fetch_timeout_secs(), 10);
    assert_eq!(config.accuracy_threshold(), 10.0);
    assert_eq!(config.accuracy_preference(), AccuracyPreference::Medium);
}

#[test]
fn test_validate_rejects_bad_endpoint() {
    let config = create_test_config(Some("ftp://example.org"), None, None);
    let err = validate_config(&config).unwrap_err();
    assert!(err.to_string().contains("http"));

    let config = create_test_config(Some(""), None, None);
    assert!(validate_config(&config).is_err());
}

#[test]
fn test_validate_rejects_timeout_out_of_range() {
    let config = create_test_config(None, Some(0), None);
    assert!(validate_config(&config).is_err());

    let config = create_test_config(None, Some(121), None);
    assert!(validate_config(&config).is_err());

    let config = create_test_config(None, Some(5), None);
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_validate_rejects_nonpositive_threshold() {
    let config = create_test_config(None, None, Some(0.0));
    assert!(validate_config(&config).is_err());

    let config = create_test_config(None, None, Some(-3.0));
    assert!(validate_config(&config).is_err());

    let config = create_test_config(None, None, Some(f64::NAN));
    assert!(validate_config(&config).is_err());

    let config = create_test_config(None, None, Some(25.0));
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_validate_coordinates_ranges() {
    assert!(validate_coordinates(48.1, 17.1).is_ok());
    assert!(validate_coordinates(-90.0, 180.0).is_ok());
    assert!(validate_coordinates(90.5, 0.0).is_err());
    assert!(validate_coordinates(0.0, -180.5).is_err());
    assert!(validate_coordinates(f64::NAN, 0.0).is_err());
}

#[test]
#[serial]
fn test_load_from_path_parses_full_file() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("sunwidgetr.toml");
    fs::write(
        &path,
        r#"
endpoint = "http://localhost:9000"
fetch_timeout_secs = 3
accuracy_threshold = 25.0
accuracy_preference = "high"
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.endpoint(), "http://localhost:9000");
    assert_eq!(config.fetch_timeout_secs(), 3);
    assert_eq!(config.accuracy_threshold(), 25.0);
    assert_eq!(config.accuracy_preference(), AccuracyPreference::High);
}

#[test]
#[serial]
fn test_load_from_path_applies_defaults_to_partial_file() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("sunwidgetr.toml");
    fs::write(&path, "fetch_timeout_secs = 30\n").unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.fetch_timeout_secs(), 30);
    // Untouched fields get compiled-in defaults
    assert_eq!(config.endpoint(), "https://api.sunrise-sunset.org");
    assert_eq!(config.accuracy_preference(), AccuracyPreference::Medium);
}

#[test]
#[serial]
fn test_default_template_round_trips() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("sub").join("sunwidgetr.toml");

    crate::logger::Log::set_enabled(false);
    create_default_config(&path).unwrap();
    crate::logger::Log::set_enabled(true);

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.endpoint(), "https://api.sunrise-sunset.org");
    assert_eq!(config.fetch_timeout_secs(), 10);
    assert_eq!(config.accuracy_threshold(), 10.0);
}
