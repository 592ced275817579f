use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::ws::DEFAULT_CONNECTION_BUFFER;

// =============================================================================
// File config (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
//   config.toml:     [chat]
//                    connection_buffer = 128
//
//   env var:         PAIRCHAT_CHAT__CONNECTION_BUFFER=128   (double underscore = nesting)

pub const DEFAULT_PORT: u16 = 3000;

/// Named configuration presets.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// host=127.0.0.1
    Local,
    /// host=0.0.0.0
    Server,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub chat: ChatFileConfig,
    #[serde(default)]
    pub identity: IdentityFileConfig,
}

/// `[server]` in config.toml.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerFileConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

/// `[chat]` in config.toml.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatFileConfig {
    /// Outbound queue depth per WebSocket connection
    #[serde(default = "default_connection_buffer")]
    pub connection_buffer: usize,
}

impl Default for ChatFileConfig {
    fn default() -> Self {
        Self {
            connection_buffer: default_connection_buffer(),
        }
    }
}

/// `[identity]` in config.toml.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityFileConfig {
    #[serde(default = "default_allow_registration")]
    pub allow_registration: bool,
}

impl Default for IdentityFileConfig {
    fn default() -> Self {
        Self {
            allow_registration: default_allow_registration(),
        }
    }
}

fn default_connection_buffer() -> usize {
    DEFAULT_CONNECTION_BUFFER
}

fn default_allow_registration() -> bool {
    true
}

/// Layer defaults → profile defaults → config.toml → PAIRCHAT_* env vars.
///
/// The CLI profile wins over one named in config.toml or the environment.
pub fn load_config(data_dir: &Path, cli_profile: Option<&Profile>) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    let base = Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(data_dir.join("config.toml")))
        .merge(Env::prefixed("PAIRCHAT_").split("__"));

    let profile: Option<Profile> = cli_profile
        .cloned()
        .or_else(|| base.extract_inner("profile").ok());

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Serialized::defaults(profile_to_file_config(profile.as_ref())))
        .merge(Toml::file(data_dir.join("config.toml")))
        .merge(Env::prefixed("PAIRCHAT_").split("__"))
}

fn profile_to_file_config(profile: Option<&Profile>) -> FileConfig {
    let host = match profile {
        Some(Profile::Local) => "127.0.0.1",
        Some(Profile::Server) => "0.0.0.0",
        None => return FileConfig::default(),
    };
    FileConfig {
        profile: profile.cloned(),
        server: ServerFileConfig {
            host: Some(host.to_string()),
            port: None,
        },
        ..Default::default()
    }
}

// =============================================================================
// Runtime config (derived from FileConfig)
// =============================================================================

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub connection_buffer: usize,
}

impl ChatConfig {
    pub fn from_file(fc: &ChatFileConfig) -> Self {
        Self {
            connection_buffer: fc.connection_buffer.max(1),
        }
    }
}

#[derive(Clone, Debug)]
pub struct IdentityConfig {
    /// Whether `POST /api/users/register` accepts new accounts
    pub allow_registration: bool,
}

impl IdentityConfig {
    pub fn from_file(fc: &IdentityFileConfig) -> Self {
        Self {
            allow_registration: fc.allow_registration,
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self::from_file(&IdentityFileConfig::default())
    }
}

// =============================================================================
// Directory layout (derived from --data-dir, not tunable via figment)
// =============================================================================

#[derive(Clone, Debug)]
pub struct PairchatConfig {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
}

impl PairchatConfig {
    pub fn new(custom_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match custom_dir {
            Some(dir) => dir,
            None => dirs::home_dir()
                .context("Could not find home directory")?
                .join(".pairchat"),
        };

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

        let db_path = data_dir.join("pairchat.db");

        info!("Data directory: {}", data_dir.display());

        Ok(Self { data_dir, db_path })
    }

    pub fn db_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.db_path.display())
    }

    /// Delete the database file along with its WAL and shared-memory files.
    pub fn reset_database(&self) -> Result<()> {
        if self.db_path.exists() {
            std::fs::remove_file(&self.db_path)
                .with_context(|| format!("Failed to delete database: {:?}", self.db_path))?;
            info!("Database reset: {:?}", self.db_path);

            for ext in ["db-wal", "db-shm"] {
                let path = self.db_path.with_extension(ext);
                if path.exists() {
                    std::fs::remove_file(&path)
                        .with_context(|| format!("Failed to delete {:?}", path))?;
                }
            }
        }
        Ok(())
    }

    pub fn config_toml_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }
}
