//! Optional on-disk configuration
//!
//! Looked up under `$XDG_CONFIG_HOME/volman/config.toml` (falling back
//! to `~/.config`). A missing default file is fine; a missing file named
//! on the command line is not.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Icon theme name the dock view reports.
    pub theme: Option<String>,
}

pub fn load(path: Option<&Path>) -> Result<Config> {
    let (path, explicit) = match path {
        Some(path) => (path.to_owned(), true),
        None => match default_path() {
            Some(path) => (path, false),
            None => return Ok(Config::default()),
        },
    };

    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Config::default());
        }
        Err(e) => {
            return Err(
                anyhow::Error::new(e).context(format!("reading config {}", path.display()))
            );
        }
    };

    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

fn default_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("volman").join("config.toml"))
}
