use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub rooms: Vec<RoomConfig>,
    #[serde(default)]
    pub modifications: Vec<ModificationConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_json_root")]
    pub json_root: PathBuf,
    #[serde(default = "default_historical_root")]
    pub historical_root: PathBuf,
    #[serde(default = "default_docs_root")]
    pub docs_root: PathBuf,
    #[serde(default = "default_sql_dir")]
    pub sql_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            json_root: default_json_root(),
            historical_root: default_historical_root(),
            docs_root: default_docs_root(),
            sql_dir: default_sql_dir(),
        }
    }
}

fn default_json_root() -> PathBuf {
    PathBuf::from("logs/json")
}
fn default_historical_root() -> PathBuf {
    PathBuf::from("logs/historical")
}
fn default_docs_root() -> PathBuf {
    PathBuf::from("logs/docs")
}
fn default_sql_dir() -> PathBuf {
    PathBuf::from("sql")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_source_url")]
    pub source_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            source_url: default_source_url(),
        }
    }
}

fn default_title() -> String {
    "Matrix Logs".to_string()
}
fn default_source_url() -> String {
    "https://github.com/bakkot/matrix-archive-bot".to_string()
}

/// A room to index, and which source root its day files live under.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    pub room: String,
    #[serde(default)]
    pub historical: bool,
}

/// One retroactive correction, matched by event id or timestamp.
#[derive(Debug, Deserialize, Clone)]
pub struct ModificationConfig {
    pub room: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub ts: Option<i64>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub remove: bool,
}

impl Config {
    /// Built-in defaults, used when no config file is present.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Directory holding a room's day files.
    pub fn source_dir(&self, room: &RoomConfig) -> PathBuf {
        let root = if room.historical {
            &self.paths.historical_root
        } else {
            &self.paths.json_root
        };
        root.join(&room.room)
    }

    /// Configured rooms, or every directory under `json_root` when none are listed.
    pub fn room_list(&self) -> Result<Vec<RoomConfig>> {
        if !self.rooms.is_empty() {
            return Ok(self.rooms.clone());
        }
        if !self.paths.json_root.exists() {
            return Ok(Vec::new());
        }
        Ok(crate::layout::list_rooms(&self.paths.json_root)?
            .into_iter()
            .map(|room| RoomConfig {
                room,
                historical: false,
            })
            .collect())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load the config file if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found; using defaults");
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    for (name, path) in [
        ("paths.json_root", &config.paths.json_root),
        ("paths.historical_root", &config.paths.historical_root),
        ("paths.docs_root", &config.paths.docs_root),
        ("paths.sql_dir", &config.paths.sql_dir),
    ] {
        if path.as_os_str().is_empty() {
            bail!("{} must not be empty", name);
        }
    }

    for room in &config.rooms {
        if room.room.trim().is_empty() {
            bail!("rooms.room must not be empty");
        }
    }

    for (i, m) in config.modifications.iter().enumerate() {
        if m.id.is_some() == m.ts.is_some() {
            bail!("modifications[{}] must set exactly one of `id` or `ts`", i);
        }
        if m.body.is_some() == m.remove {
            bail!(
                "modifications[{}] must set exactly one of `body` or `remove = true`",
                i
            );
        }
    }

    Ok(())
}
