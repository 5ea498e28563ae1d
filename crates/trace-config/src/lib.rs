//! # trace-config
//!
//! Layered configuration loading for T-Trace using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`TTRACE_*` prefix, `__` as separator)
//! 2. Project-level `.ttrace/config.toml`
//! 3. User-level `~/.config/ttrace/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `TTRACE_LEDGER__PATH` -> `ledger.path` and
//! `TTRACE_GENERAL__DEFAULT_LIMIT` -> `general.default_limit`.
//! `TTRACE_LOG` is reserved for the log filter and never read as config.
//!
//! # Usage
//!
//! ```no_run
//! use trace_config::TraceConfig;
//!
//! let config = TraceConfig::load_with_dotenv().expect("config");
//! println!("ledger: {}", config.ledger.path.display());
//! ```

mod error;
mod general;
mod ledger;

pub use error::ConfigError;
pub use general::GeneralConfig;
pub use ledger::LedgerConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable holding the tracing filter directive.
pub const LOG_ENV: &str = "TTRACE_LOG";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TraceConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl TraceConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env`
    /// support.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] if a source cannot be parsed or has
    /// the wrong shape, and [`ConfigError::InvalidValue`] if a value is out
    /// of range.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    /// Load configuration after reading `.env` from the current directory.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Extract and validate a config from an arbitrary provider chain.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the figment provider chain.
    ///
    /// This is public so tests can inspect the figment directly or add
    /// additional providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".ttrace/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("TTRACE_").ignore(&["LOG"]).split("__"))
    }

    /// Check values that deserialize fine but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ledger.validate()?;
        self.general.validate()
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ttrace").join("config.toml"))
    }
}
