use clap::Parser;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use linkdupe::cli::Cli;
use linkdupe::config::{Config, ConfigError};
use std::fs;
use std::sync::Mutex;
use tempfile::tempdir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config.io_threads, 4);
    assert_eq!(config.max_suffix_attempts, 16);
    assert!(!config.skip_empty);
    assert!(!config.dry_run);
}

#[test]
fn test_config_load_from_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
io_threads = 8
max_suffix_attempts = 32
skip_empty = true
"#,
    )
    .unwrap();

    let config = Config::load(Some(&config_path)).unwrap();

    assert_eq!(config.io_threads, 8);
    assert_eq!(config.max_suffix_attempts, 32);
    assert!(config.skip_empty);
    assert!(!config.dry_run);
}

#[test]
fn test_env_overrides_file_and_cli_overrides_env() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "io_threads = 8\nmax_suffix_attempts = 5\n").unwrap();

    std::env::set_var("LINKDUPE_IO_THREADS", "12");
    let mut config = Config::load(Some(&config_path)).unwrap();
    std::env::remove_var("LINKDUPE_IO_THREADS");

    assert_eq!(config.io_threads, 12);
    assert_eq!(config.max_suffix_attempts, 5);

    let cli = Cli::try_parse_from(["linkdupe", "--io-threads", "2", "/data"]).unwrap();
    config.merge_cli(&cli).unwrap();
    assert_eq!(config.io_threads, 2);
    assert_eq!(config.max_suffix_attempts, 5);
}

#[test]
fn test_env_provider_keys() {
    let _lock = ENV_MUTEX.lock().unwrap();
    std::env::set_var("LINKDUPE_MAX_SUFFIX_ATTEMPTS", "64");

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed("LINKDUPE_"));
    let config: Config = figment.extract().unwrap();

    std::env::remove_var("LINKDUPE_MAX_SUFFIX_ATTEMPTS");
    assert_eq!(config.max_suffix_attempts, 64);
}

#[test]
fn test_invalid_toml_rejected() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "io_threads = [not valid").unwrap();

    // Figment should return error on invalid TOML format
    let figment = Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));
    let result: Result<Config, _> = figment.extract();
    assert!(result.is_err());

    let _lock = ENV_MUTEX.lock().unwrap();
    assert!(matches!(
        Config::load(Some(&config_path)),
        Err(ConfigError::Load(_))
    ));
}

#[test]
fn test_zero_values_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "max_suffix_attempts = 0\n").unwrap();

    match Config::load(Some(&config_path)) {
        Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "max_suffix_attempts"),
        other => panic!("expected invalid value error, got {other:?}"),
    }
}

#[test]
fn test_unknown_keys_ignored() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "io_threads = 3\ncolor_scheme = \"dark\"\n").unwrap();

    let config = Config::load(Some(&config_path)).unwrap();
    assert_eq!(config.io_threads, 3);
}
