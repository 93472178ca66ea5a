//! Runtime settings: built-in defaults, overridden by `PINBOARD_*`
//! environment variables (a `.env` file is loaded first).

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use pb_core::models::SessionUser;
use pb_store::StoreConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub upload_root: PathBuf,
    pub url_prefix: String,
    /// Already authenticated by the external provider.
    pub user_id: String,
    pub user_email: String,
    /// Seconds.
    pub gateway_timeout: u64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("database_url", "sqlite:pinboard.db")?
            .set_default("upload_root", "./data/uploads")?
            .set_default("url_prefix", "/static/uploads")?
            .set_default("user_id", "demo")?
            .set_default("user_email", "demo@example.com")?
            .set_default("gateway_timeout", 30)?
            .add_source(Environment::with_prefix("PINBOARD"))
            .build()?
            .try_deserialize()
    }

    pub fn session_user(&self) -> SessionUser {
        SessionUser::new(self.user_id.clone(), self.user_email.clone())
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::with_timeout(Duration::from_secs(self.gateway_timeout))
    }
}
