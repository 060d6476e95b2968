//! Layered interpreter configuration.
//!
//! Load order, each layer overriding the previous:
//!
//! 1. Compiled defaults
//! 2. `bf.toml` in the XDG config home (`[interpreter]` section)
//! 3. Environment variables (`BF_TAPE_SIZE`, `BF_CELL_WIDTH`, `BF_MAX_STEPS`)
//!
//! Command-line flags are applied on top by the binary.
//!
//! ```toml
//! [interpreter]
//! tape_size = 30000
//! cell_width = "i16"
//! max_steps = 1000000
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cross_xdg::BaseDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cell::CellWidth;
use crate::tape::DEFAULT_TAPE_SIZE;

pub const CONFIG_FILE_NAME: &str = "bf.toml";

pub const ENV_TAPE_SIZE: &str = "BF_TAPE_SIZE";
pub const ENV_CELL_WIDTH: &str = "BF_CELL_WIDTH";
pub const ENV_MAX_STEPS: &str = "BF_MAX_STEPS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file: {message}")]
    Parse { message: String },

    #[error("invalid value for {var}: {message}")]
    InvalidEnvVar { var: &'static str, message: String },
}

/// Settings for a single interpreter instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Number of cells; `0` selects the default.
    pub tape_size: usize,
    pub cell_width: CellWidth,
    /// Abort after this many steps. `None` runs until halted or cancelled.
    pub max_steps: Option<u64>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            tape_size: DEFAULT_TAPE_SIZE,
            cell_width: CellWidth::default(),
            max_steps: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub interpreter: InterpreterConfig,
}

impl Config {
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Defaults, then the user config file if present, then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match default_config_path() {
            Some(path) if path.is_file() => {
                debug!(path = %path.display(), "loading config file");
                Self::from_file(&path)?
            }
            _ => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Override fields from environment-style lookups.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cfg = &mut self.interpreter;

        if let Some(raw) = lookup(ENV_TAPE_SIZE) {
            cfg.tape_size = raw.trim().parse().map_err(|e| ConfigError::InvalidEnvVar {
                var: ENV_TAPE_SIZE,
                message: format!("{e}"),
            })?;
        }
        if let Some(raw) = lookup(ENV_CELL_WIDTH) {
            cfg.cell_width = raw.parse().map_err(|e| ConfigError::InvalidEnvVar {
                var: ENV_CELL_WIDTH,
                message: format!("{e}"),
            })?;
        }
        if let Some(raw) = lookup(ENV_MAX_STEPS) {
            let limit: u64 = raw.trim().parse().map_err(|e| ConfigError::InvalidEnvVar {
                var: ENV_MAX_STEPS,
                message: format!("{e}"),
            })?;
            cfg.max_steps = Some(limit);
        }
        Ok(())
    }
}

/// `bf.toml` under the XDG config home, e.g. `~/.config/bf.toml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    let base_dirs = BaseDirs::new().ok()?;
    let mut path = PathBuf::from(base_dirs.config_home());
    path.push(CONFIG_FILE_NAME);
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = Config::default().interpreter;
        assert_eq!(cfg.tape_size, 4096);
        assert_eq!(cfg.cell_width, CellWidth::I8);
        assert_eq!(cfg.max_steps, None);
    }

    #[test]
    fn parses_partial_file() {
        let cfg = Config::parse("[interpreter]\ncell_width = \"i32\"\n").unwrap();
        assert_eq!(cfg.interpreter.cell_width, CellWidth::I32);
        assert_eq!(cfg.interpreter.tape_size, 4096);
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn malformed_file_is_error() {
        assert!(matches!(
            Config::parse("[interpreter]\ncell_width = \"u9\"\n"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn env_overrides_file() {
        let mut cfg = Config::parse("[interpreter]\ntape_size = 10\nmax_steps = 5\n").unwrap();
        cfg.apply_env(env(&[("BF_TAPE_SIZE", "64"), ("BF_CELL_WIDTH", "i16")]))
            .unwrap();
        assert_eq!(cfg.interpreter.tape_size, 64);
        assert_eq!(cfg.interpreter.cell_width, CellWidth::I16);
        assert_eq!(cfg.interpreter.max_steps, Some(5));
    }

    #[test]
    fn invalid_env_names_the_variable() {
        let mut cfg = Config::default();
        let err = cfg.apply_env(env(&[("BF_MAX_STEPS", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { var: "BF_MAX_STEPS", .. }));
    }

    #[test]
    fn reads_from_file() {
        let mut tf = tempfile::NamedTempFile::new().unwrap();
        write!(tf, "[interpreter]\ntape_size = 128\n").unwrap();
        let cfg = Config::from_file(tf.path()).unwrap();
        assert_eq!(cfg.interpreter.tape_size, 128);
    }
}
