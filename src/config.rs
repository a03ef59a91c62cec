//! Runtime configuration.
//!
//! Built from, in increasing priority: built-in defaults, the optional TOML
//! config file, and command-line flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cli::SaveArgs;
use crate::error::{HoardError, Result};
use crate::platform::{self, Platform};
use crate::scan::collector::SaveLayout;
use crate::tag::TagFormat;
use crate::timeline::GAP_THRESHOLD_MS;
use crate::util::parse_duration;

/// Shape of `config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub saves_root: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub format: Option<TagFormat>,
    pub poll_interval: Option<String>,
    pub gap_threshold: Option<String>,
    pub read_timeout: Option<String>,
    pub layout: Option<SaveLayout>,
}

impl FileConfig {
    pub fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| HoardError::Config(e.to_string()))
    }

    /// Reads `path`, or the default location when `None`. A missing default
    /// file is fine; a missing explicit file is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_config_path() {
                Some(p) => (p, false),
                None => return Ok(FileConfig::default()),
            },
        };

        match fs::read_to_string(&path) {
            Ok(raw) => FileConfig::parse(&raw)
                .map_err(|e| HoardError::Config(format!("{}: {e}", path.display()))),
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                Ok(FileConfig::default())
            }
            Err(e) => Err(HoardError::io(path, e)),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "hoard")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub struct Config {
    pub save_dir: Option<PathBuf>,
    pub saves_root: Option<PathBuf>,
    pub catalog_path: PathBuf,
    pub format: TagFormat,
    pub poll_interval: Duration,
    pub gap_threshold: Duration,
    pub read_timeout: Duration,
    pub layout: SaveLayout,
    pub platform: Platform,
}

impl Config {
    pub fn default() -> Self {
        let platform = platform::detect();

        Config {
            save_dir: None,
            saves_root: platform::default_saves_root(platform),
            catalog_path: PathBuf::from("items.json"),
            format: TagFormat::Nbt,
            poll_interval: Duration::from_secs(5),
            gap_threshold: Duration::from_millis(GAP_THRESHOLD_MS as u64),
            read_timeout: Duration::from_secs(2),
            layout: SaveLayout::default(),
            platform,
        }
    }

    pub fn from_args(file: FileConfig, args: &SaveArgs) -> Result<Self> {
        let mut config = Config::default();

        if let Some(root) = file.saves_root {
            config.saves_root = Some(root);
        }
        if let Some(catalog) = file.catalog {
            config.catalog_path = catalog;
        }
        if let Some(format) = file.format {
            config.format = format;
        }
        if let Some(value) = &file.poll_interval {
            config.poll_interval = parse_duration("poll_interval", value)?;
        }
        if let Some(value) = &file.gap_threshold {
            config.gap_threshold = parse_duration("gap_threshold", value)?;
        }
        if let Some(value) = &file.read_timeout {
            config.read_timeout = parse_duration("read_timeout", value)?;
        }
        if let Some(layout) = file.layout {
            config.layout = layout;
        }

        config.save_dir = args.save.clone();
        if let Some(catalog) = &args.catalog {
            config.catalog_path = catalog.clone();
        }
        if let Some(format) = args.format {
            config.format = format;
        }

        Ok(config)
    }

    pub fn gap_threshold_ms(&self) -> i64 {
        i64::try_from(self.gap_threshold.as_millis()).unwrap_or(i64::MAX)
    }

    /// The explicit save directory, or the newest default-named world.
    pub fn resolve_save_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.save_dir {
            return Ok(dir.clone());
        }

        let root = self
            .saves_root
            .as_ref()
            .ok_or_else(|| {
                HoardError::Config("no save given and no saves directory known".into())
            })?;

        platform::latest_world(root).ok_or_else(|| {
            HoardError::Config(format!(
                "no \"New World\" save found under {}, pass a save directory",
                root.display()
            ))
        })
    }
}
