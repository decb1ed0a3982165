use std::collections::HashMap;
use std::path::{Path, PathBuf};

use roster::SchemaAction;
use serde::Deserialize;

use crate::AppError;

/// Profile both binaries run against.
pub const MAIN_PROFILE: &str = "main";

/// Optional settings file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "roster.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileSettings {
    /// SQLite database file.
    pub database: PathBuf,
    /// `none`, `create` or `drop-create`.
    pub schema: String,
}

impl ProfileSettings {
    pub fn schema_action(&self) -> Result<SchemaAction, AppError> {
        Ok(self.schema.parse::<SchemaAction>()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub profiles: HashMap<String, ProfileSettings>,
}

impl Settings {
    /// Defaults, then `roster.toml`, then `ROSTER__PROFILES__<NAME>__<KEY>` variables.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Like [`Settings::load`] with an explicit settings file, which may be absent.
    pub fn load_from(file: &Path) -> Result<Self, AppError> {
        let config = ::config::Config::builder()
            .set_default("profiles.main.database", "roster.db")?
            .set_default("profiles.main.schema", "create")?
            .add_source(::config::File::from(file).required(false))
            .add_source(
                ::config::Environment::with_prefix("ROSTER")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn profile(&self, name: &str) -> Result<&ProfileSettings, AppError> {
        self.profiles
            .get(name)
            .ok_or_else(|| AppError::UnknownProfile(name.to_string()))
    }
}
