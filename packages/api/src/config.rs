//! Service configuration loaded from a JSON file.

use std::io;
use std::path::Path;

use db::DbConfig;
use lens_core::GroupNode;
use serde::Deserialize;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Runtime configuration.
///
/// Every field is optional in the file; missing fields take their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hostname: String,
    pub port: u16,
    /// SurrealDB endpoint, e.g. `mem://` or `rocksdb://data/lens`.
    pub database: String,
    pub namespace: String,
    pub database_name: String,
    /// Root credentials; only used when both are set.
    pub username: Option<String>,
    pub password: Option<String>,
    pub groups: GroupNode,
}

impl Default for Config {
    fn default() -> Self {
        let defaults = DbConfig::default();
        Self {
            hostname: "127.0.0.1".to_string(),
            port: 4000,
            database: defaults.endpoint,
            namespace: defaults.namespace,
            database_name: defaults.database,
            username: None,
            password: None,
            groups: default_groups(),
        }
    }
}

/// A single `ungrouped` leaf whose pattern only matches the empty name.
fn default_groups() -> GroupNode {
    match GroupNode::pattern("$") {
        Ok(leaf) => GroupNode::groups([("ungrouped", leaf)]),
        Err(_) => GroupNode::groups(Vec::<(String, GroupNode)>::new()),
    }
}

impl Config {
    /// Load configuration from `path`.
    ///
    /// A missing file yields the defaults. Any other read or parse failure is
    /// an error; an invalid group tree counts as a parse failure.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let shown = path.display().to_string();

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::warn!("Config file {} not found, using defaults", shown);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: shown,
                    source,
                });
            }
        };

        let config: Self = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: shown.clone(),
            source,
        })?;

        tracing::info!(
            "Loaded config from {} ({} group patterns)",
            shown,
            config.groups.leaf_count()
        );
        Ok(config)
    }

    /// Address the HTTP server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    /// Database settings for `db::init`.
    pub fn db_config(&self) -> DbConfig {
        let config = DbConfig::endpoint(&self.database)
            .with_namespace(&self.namespace)
            .with_database(&self.database_name);

        match (&self.username, &self.password) {
            (Some(username), Some(password)) => config.with_credentials(username, password),
            _ => config,
        }
    }
}
