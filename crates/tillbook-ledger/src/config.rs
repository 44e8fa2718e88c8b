//! # Ledger Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     TILLBOOK_DATABASE_PATH=/var/lib/tillbook/shop.db                    │
//! │     TILLBOOK_RESERVE_MAX_RETRIES=8                                      │
//! │                                                                         │
//! │  2. TOML Config File (optional)                                         │
//! │     ./tillbook.toml                                                     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # tillbook.toml
//! database_path = "./data/tillbook.db"
//! max_connections = 5
//! reserve_max_retries = 5
//! laybye_term_days = 90
//! recent_sales_limit = 10
//! report_dir = "./reports"
//! default_shop = "main"
//! best_sellers_limit = 10
//! ```

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::ConfigError;
use tillbook_core::DEFAULT_SHOP_ID;
use tillbook_db::DbConfig;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TILLBOOK";

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "tillbook.toml";

/// Runtime settings for the ledger and its database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    pub max_connections: u32,

    /// Attempts at a version-checked update before giving up with a
    /// "busy" error.
    pub reserve_max_retries: u32,

    /// Days until a new lay-bye falls due.
    pub laybye_term_days: i64,

    /// How many recent sales (and open orders, active lay-byes) a numeric
    /// reference can index into.
    pub recent_sales_limit: i64,

    /// Where exported report documents are written.
    pub report_dir: PathBuf,

    /// Shop used by the stdin binary.
    pub default_shop: String,

    pub best_sellers_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            database_path: PathBuf::from("./data/tillbook.db"),
            max_connections: 5,
            reserve_max_retries: 5,
            laybye_term_days: 90,
            recent_sales_limit: 10,
            report_dir: PathBuf::from("./reports"),
            default_shop: DEFAULT_SHOP_ID.to_string(),
            best_sellers_limit: 10,
        }
    }
}

impl LedgerConfig {
    /// Loads settings from `path` (or `tillbook.toml` when `None`) and the
    /// environment. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        debug!(file = %file.display(), "Loading configuration");

        let settings = Config::builder()
            .add_source(File::from(file).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: LedgerConfig = settings.try_deserialize()?;
        config.validate()?;

        info!(
            database = %config.database_path.display(),
            shop = %config.default_shop,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Settings for tests: in-memory database, defaults elsewhere.
    pub fn in_memory() -> Self {
        LedgerConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            ..LedgerConfig::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_connections",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.reserve_max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                key: "reserve_max_retries",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.laybye_term_days <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "laybye_term_days",
                reason: "must be positive".to_string(),
            });
        }
        if self.recent_sales_limit <= 0 || self.best_sellers_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "recent_sales_limit",
                reason: "list limits must be positive".to_string(),
            });
        }
        if self.default_shop.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "default_shop",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// The database settings these values imply.
    pub fn db_config(&self) -> DbConfig {
        if self.database_path.as_os_str() == ":memory:" {
            DbConfig::in_memory()
        } else {
            DbConfig::new(&self.database_path).max_connections(self.max_connections)
        }
    }
}
