use std::path::Path;

use anyhow::{Context, Result};
use uuid::Uuid;

use kartei::config::Config;
use kartei::store::SqliteStore;
use kartei::StudyService;

/// Shared application state for CLI commands
pub struct App {
    pub service: StudyService<SqliteStore>,
    pub user_id: Uuid,
}

impl App {
    /// Load config, open the store, and resolve the acting user id
    pub fn new(config_path: Option<&Path>, user_flag: Option<Uuid>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => Config::load_default().context("Failed to load config")?,
        };

        let user_id = resolve_user(user_flag, &config)?;

        let store = SqliteStore::open(config.storage.database.clone()).with_context(|| {
            format!(
                "Failed to open database at {}",
                config.storage.database.display()
            )
        })?;

        Ok(Self {
            service: StudyService::new(store),
            user_id,
        })
    }
}

/// Acting user: the --user flag, then KARTEI_USER, then the config default
fn resolve_user(flag: Option<Uuid>, config: &Config) -> Result<Uuid> {
    if let Some(id) = flag {
        return Ok(id);
    }

    if let Ok(var) = std::env::var("KARTEI_USER") {
        return var
            .parse()
            .with_context(|| format!("KARTEI_USER is not a valid user id: '{}'", var));
    }

    config.user.default_user.context(
        "No user id given. Pass --user, set KARTEI_USER, or set user.default_user in the config",
    )
}
