use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::RunError;

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "compendium.toml";

#[derive(Debug, Default, Deserialize)]
pub struct CompendiumConfig {
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub diagnostics: DiagnosticsSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_input")]
    pub input: String,
    #[serde(default = "default_mapping")]
    pub mapping: String,
    #[serde(default = "default_output")]
    pub output: String,
}

fn default_input() -> String {
    "save".into()
}

fn default_mapping() -> String {
    "hash-mapping.json".into()
}

fn default_output() -> String {
    "remapped".into()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            input: default_input(),
            mapping: default_mapping(),
            output: default_output(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DiagnosticsSection {
    /// Append `ids-found.txt` / `ids-not-found.txt` to the output directory.
    #[serde(default)]
    pub dump_ids: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".into()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl CompendiumConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RunError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| RunError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| RunError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `explicit` if given, else the default file if present, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, RunError> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Self::load(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    pub fn input(&self) -> PathBuf {
        PathBuf::from(&self.paths.input)
    }

    pub fn mapping(&self) -> PathBuf {
        PathBuf::from(&self.paths.mapping)
    }

    pub fn output(&self) -> PathBuf {
        PathBuf::from(&self.paths.output)
    }
}
