use serial_test::serial;
use temp_env::with_vars;

use super::*;

fn cleanup_all_consul_env_vars() {
    for (key, _) in std::env::vars() {
        if key.starts_with("CONSUL_") {
            std::env::remove_var(&key);
        }
    }
}

#[test]
#[serial]
fn default_config_should_initialize_with_hardcoded_values() {
    let config = ClientConfig::default();

    assert!(config.enabled);
    assert_eq!(config.host, "localhost");
    assert_eq!(config.port, 8500);
    assert_eq!(config.ttl(), Duration::from_secs(60));
    assert_eq!(config.base_path, "config/dev/settings");
    assert_eq!(config.watch.wait_timeout(), Duration::from_secs(30));
    assert_eq!(config.watch.retry_interval(), Duration::from_secs(5));
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn load_without_sources_should_match_defaults() {
    cleanup_all_consul_env_vars();
    let config = ClientConfig::load(None).unwrap();

    assert!(config.enabled);
    assert_eq!(config.endpoint(), "http://localhost:8500");
    assert_eq!(config.cache_ttl, 60);
}

#[test]
#[serial]
fn load_should_merge_environment_overrides() {
    cleanup_all_consul_env_vars();
    with_vars(
        vec![
            ("CONSUL_ENABLED", Some("false")),
            ("CONSUL_HOST", Some("consul.internal")),
            ("CONSUL_PORT", Some("8501")),
            ("CONSUL_CACHE_TTL", Some("15")),
            ("CONSUL_BASE_PATH", Some("config/prod/settings")),
            ("CONSUL_WATCH__RETRY_INTERVAL_SECS", Some("9")),
        ],
        || {
            let config = ClientConfig::load(None).unwrap();

            assert!(!config.enabled);
            assert_eq!(config.endpoint(), "http://consul.internal:8501");
            assert_eq!(config.ttl(), Duration::from_secs(15));
            assert_eq!(config.namespace(), "config/prod/settings");
            assert_eq!(config.watch.retry_interval_secs, 9);
            assert_eq!(config.watch.wait_timeout_secs, 30);
        },
    );
}

#[test]
#[serial]
fn load_should_merge_file_settings() {
    cleanup_all_consul_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("settings.toml");

    std::fs::write(
        &config_path,
        r#"
        address = "https://kv.example.com:443/"
        cache_ttl = 120

        [watch]
        wait_timeout_secs = 10
        "#,
    )
    .unwrap();

    let config = ClientConfig::load(config_path.to_str()).unwrap();

    assert_eq!(config.endpoint(), "https://kv.example.com:443");
    assert_eq!(config.cache_ttl, 120);
    assert_eq!(config.watch.wait_timeout_secs, 10);
    assert_eq!(config.watch.retry_interval_secs, 5);
}

#[test]
#[serial]
fn environment_variables_should_have_highest_priority() {
    cleanup_all_consul_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    std::fs::write(
        &config_path,
        r#"
        cache_ttl = 120
        base_path = "config/file/settings"
        "#,
    )
    .unwrap();

    with_vars(
        vec![
            ("CONSUL_CONFIG_PATH", Some(config_path.to_str().unwrap())),
            ("CONSUL_CACHE_TTL", Some("5")),
        ],
        || {
            let config = ClientConfig::load(None).unwrap();

            assert_eq!(config.cache_ttl, 5);
            assert_eq!(config.base_path, "config/file/settings");
        },
    );
}

#[test]
#[serial]
fn load_should_fail_when_config_file_is_missing() {
    cleanup_all_consul_env_vars();
    let result = ClientConfig::load(Some("/nonexistent/kv-settings.toml"));

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn load_should_reject_zero_ttl() {
    cleanup_all_consul_env_vars();
    with_vars(vec![("CONSUL_CACHE_TTL", Some("0"))], || {
        let result = ClientConfig::load(None);

        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    });
}

#[test]
fn validation_should_fail_with_empty_base_path() {
    let config = ClientConfig {
        base_path: "/".to_string(),
        ..ClientConfig::default()
    };

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_fail_with_invalid_watch_settings() {
    let mut config = ClientConfig::default();
    config.watch.retry_interval_secs = 0;
    assert!(config.validate().is_err());

    let mut config = ClientConfig::default();
    config.watch.max_concurrent_callbacks = 0;
    assert!(config.validate().is_err());
}

#[test]
fn endpoint_should_prefer_address_over_host_and_port() {
    let config = ClientConfig {
        address: Some("10.0.0.5:8500".to_string()),
        host: "ignored".to_string(),
        ..ClientConfig::default()
    };

    assert_eq!(config.endpoint(), "http://10.0.0.5:8500");
}

#[test]
fn namespace_should_strip_surrounding_slashes() {
    let config = ClientConfig {
        base_path: "/config/dev/settings/".to_string(),
        ..ClientConfig::default()
    };

    assert_eq!(config.namespace(), "config/dev/settings");
}
