//! Configuration manager for itdesk.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};

use crate::AppState;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_ADDRESS: &str = "0.0.0.0:8080";
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Socket address the HTTP API binds to.
    pub address: String,
    #[serde(skip_deserializing)]
    pub(crate) version: String,
    #[serde(skip)]
    pub(crate) path: PathBuf,
    /// Shared secret expected from the chat adapter.
    /// Requests are not checked when unset.
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    /// Identities allowed to register administrators.
    pub super_admins: Vec<i64>,
    /// Related to SQLite configuration.
    #[serde(skip_serializing)]
    pub database: Database,
    /// Workplaces inserted on an empty directory.
    /// Built-in floors are used when unset.
    #[serde(skip_serializing)]
    pub workplaces: Option<Vec<SeedWorkplace>>,
    /// Related to OLTP and Prometheus.
    #[serde(skip_serializing)]
    pub telemetry: Option<Telemetry>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: env!("CARGO_CRATE_NAME").to_owned(),
            address: DEFAULT_ADDRESS.to_owned(),
            version: VERSION.to_owned(),
            path: PathBuf::default(),
            api_token: None,
            super_admins: Vec::new(),
            database: Database::default(),
            workplaces: None,
            telemetry: None,
        }
    }
}

/// SQLite configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    /// File holding the store, created when missing.
    pub path: String,
    /// Maximum pool connections.
    pub pool_size: u32,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            path: crate::database::DEFAULT_DATABASE_PATH.to_owned(),
            pool_size: crate::database::DEFAULT_POOL_SIZE,
        }
    }
}

/// One workplace of the default seed.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct SeedWorkplace {
    pub number: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub location: String,
    pub floor: i64,
    pub primary_pc: Option<String>,
    pub peripherals: Option<String>,
}

/// Telemetry configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Telemetry {
    /// OTLP gRPC collector, e.g. `http://localhost:4317`.
    pub otlp_endpoint: Option<String>,
    /// Expose `/metrics`.
    #[serde(default)]
    pub prometheus: bool,
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Whether `id` may register administrators.
    pub fn is_super_admin(&self, id: i64) -> bool {
        self.super_admins.contains(&id)
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Arc<Self> {
        let file_path = if self.path.is_file() {
            self.path.clone()
        } else {
            Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        match File::open(&file_path) {
            Ok(file) => match serde_yaml::from_reader::<_, Configuration>(file) {
                Ok(mut config) => {
                    config.version = VERSION.to_owned();
                    config.path = file_path;
                    Arc::new(config)
                },
                Err(err) => Arc::new(self.error(err)),
            },
            Err(err) => Arc::new(self.error(err)),
        }
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found or invalid");
        Self::default()
    }
}
