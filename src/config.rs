use std::env;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::lease::Selection;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("config error in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml_edit::de::Error,
    },
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Name of the connector to lease. The first available one if unset.
    pub connector: Option<String>,
    /// Keep the lease until interrupted instead of exiting right away.
    pub hold: bool,
}

impl Config {
    /// Load the config from the default location, or use the defaults if there is no file.
    pub fn new() -> Result<Self, Error> {
        match config_path() {
            None => Ok(Self::default()),
            Some(path) => Self::load(&path),
        }
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&contents).map_err(|source| Error::Parse {
            path: path.to_owned(),
            source,
        })
    }

    fn parse(contents: &str) -> Result<Self, toml_edit::de::Error> {
        toml_edit::de::from_str(contents)
    }

    pub fn selection(&self) -> Selection {
        match &self.connector {
            Some(name) => Selection::Named(name.clone()),
            None => Selection::First,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connector: None,
            hold: true,
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from(env::var_os("HOME")?).join(".config")))
}

fn config_path() -> Option<PathBuf> {
    let mut path = config_dir()?;
    path.push("kmslease");
    path.push("config.toml");
    path.exists().then_some(path)
}
