//! Daemon configuration.
//!
//! Read from the TOML file named by `$MCFT_CONFIG`, or
//! `~/.config/mcft/mcftservd.toml`. A missing file means defaults. The
//! `MCFS_DIR` environment variable overrides the storage root.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use mcft_protocol::constants::{DEFAULT_PORT, WS_MAX_MESSAGE_SIZE};
use mcft_transfer::{DEFAULT_MCFS_ROOT, MCFS_DIR_ENV};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "MCFT_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// WebSocket server port (0 = auto-assign).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Root of the content store.
    #[serde(default = "default_mcfs_dir")]
    pub mcfs_dir: PathBuf,

    /// Largest accepted WebSocket message, in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Users loaded into the in-process store.
    #[serde(default)]
    pub users: Vec<UserSeed>,

    /// Projects loaded into the in-process store.
    #[serde(default)]
    pub projects: Vec<ProjectSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSeed {
    pub id: i64,
    pub name: String,
    pub api_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSeed {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    /// Users other than the owner with access.
    #[serde(default)]
    pub members: Vec<i64>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_mcfs_dir() -> PathBuf {
    PathBuf::from(DEFAULT_MCFS_ROOT)
}

fn default_max_message_size() -> usize {
    WS_MAX_MESSAGE_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            mcfs_dir: default_mcfs_dir(),
            max_message_size: default_max_message_size(),
            users: Vec::new(),
            projects: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration from the default location plus environment.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&config_path())?;
        config.apply_mcfs_dir(std::env::var(MCFS_DIR_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Applies a storage root override; empty values are ignored.
    pub fn apply_mcfs_dir(&mut self, value: Option<String>) {
        if let Some(dir) = value.filter(|d| !d.is_empty()) {
            self.mcfs_dir = PathBuf::from(dir);
        }
    }

    /// Checks that seed records reference each other consistently.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut user_ids = HashSet::new();
        let mut tokens = HashSet::new();
        for user in &self.users {
            if !user_ids.insert(user.id) {
                bail!("duplicate user id {}", user.id);
            }
            if user.api_token.is_empty() {
                bail!("user {} has an empty api_token", user.id);
            }
            if !tokens.insert(user.api_token.as_str()) {
                bail!("user {} reuses another user's api_token", user.id);
            }
        }

        let mut project_ids = HashSet::new();
        for project in &self.projects {
            if !project_ids.insert(project.id) {
                bail!("duplicate project id {}", project.id);
            }
            for user_id in std::iter::once(&project.owner_id).chain(&project.members) {
                if !user_ids.contains(user_id) {
                    bail!("project {} references unknown user {user_id}", project.id);
                }
            }
        }
        Ok(())
    }
}

fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home)
        .join(".config")
        .join("mcft")
        .join("mcftservd.toml")
}
