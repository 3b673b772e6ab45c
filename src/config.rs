//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//! built-in defaults, then a TOML file (`--config FILE`, or `config.toml`
//! in the platform config directory), then `LINKDUPE_*` environment
//! variables, then command-line flags.

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::actions::merge::DEFAULT_MAX_SUFFIX_ATTEMPTS;
use crate::cli::Cli;
use crate::duplicates::DedupConfig;
use crate::scanner::WalkerConfig;

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "LINKDUPE_";

/// Errors from loading or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A configuration source could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// A value is outside its allowed range.
    #[error("invalid value for {field}: {message}")]
    Invalid {
        /// Offending setting
        field: &'static str,
        /// What is wrong with it
        message: String,
    },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of I/O threads for parallel hashing.
    pub io_threads: usize,
    /// Bound on temporary-name draws per merged file.
    pub max_suffix_attempts: usize,
    /// Ignore zero-length files.
    pub skip_empty: bool,
    /// Report merges without performing them.
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            io_threads: 4,
            max_suffix_attempts: DEFAULT_MAX_SUFFIX_ATTEMPTS,
            skip_empty: false,
            dry_run: false,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the platform default path
    /// when `path` is `None`.
    ///
    /// A missing default file is not an error; a missing explicit file is.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a source cannot be parsed or a value is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::Invalid {
                        field: "config",
                        message: format!("{} is not a readable file", path.display()),
                    });
                }
                Self::load_from_path(path)
            }
            None => match Self::default_path() {
                Some(path) => Self::load_from_path(&path),
                None => {
                    log::debug!("No platform config directory, using defaults and environment");
                    Self::from_figment(Self::base_figment())
                }
            },
        }
    }

    /// Load configuration from a specific TOML file plus the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a source cannot be parsed or a value is invalid.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("Loading configuration from {}", path.display());
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX));
        Self::from_figment(figment)
    }

    /// The platform-specific default configuration path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "linkdupe").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn base_figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed(ENV_PREFIX))
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Config = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line flags on top of the loaded values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a flag carries an invalid value.
    pub fn merge_cli(&mut self, cli: &Cli) -> Result<(), ConfigError> {
        if let Some(threads) = cli.io_threads {
            self.io_threads = threads;
        }
        if let Some(attempts) = cli.max_suffix_attempts {
            self.max_suffix_attempts = attempts;
        }
        if cli.skip_empty {
            self.skip_empty = true;
        }
        if cli.dry_run {
            self.dry_run = true;
        }
        self.validate()
    }

    /// Check every value is within range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.io_threads == 0 {
            return Err(ConfigError::Invalid {
                field: "io_threads",
                message: "must be at least 1".into(),
            });
        }
        if self.max_suffix_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "max_suffix_attempts",
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Engine configuration for these settings.
    #[must_use]
    pub fn dedup_config(&self) -> DedupConfig {
        DedupConfig::default()
            .with_io_threads(self.io_threads)
            .with_max_suffix_attempts(self.max_suffix_attempts)
            .with_dry_run(self.dry_run)
            .with_walker_config(WalkerConfig::default().with_skip_empty(self.skip_empty))
    }
}
