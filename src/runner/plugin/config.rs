//! Analysis configuration file parsing.

use std::fs;
use std::path::Path;

use log::warn;
use serde::Deserialize;

use crate::runner::ds::error::AnalysisError;

pub const DEFAULT_CONFIG_FILE: &str = "jsai.toml";

/// Analysis limits and CLI settings. Every key is optional.
///
/// Expected format:
/// ```toml
/// max_eval_depth = 32
/// max_union_size = 16
/// max_objects = 1000000
/// log_filter = "info"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Nesting limit for calls and `eval`/`Function` re-entry.
    pub max_eval_depth: usize,
    /// Unions wider than this widen to `Top`.
    pub max_union_size: usize,
    /// Object store allocation cap.
    pub max_objects: usize,
    /// `env_logger` filter used by the binary.
    pub log_filter: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            max_eval_depth: 32,
            max_union_size: 16,
            max_objects: 1_000_000,
            log_filter: "info".to_string(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let content = fs::read_to_string(path).map_err(|e| {
            AnalysisError::Setup(format!("failed to read config '{}': {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, AnalysisError> {
        let config: AnalysisConfig = toml::from_str(content)
            .map_err(|e| AnalysisError::Setup(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        if self.max_union_size == 0 {
            return Err(AnalysisError::Setup(
                "max_union_size must be at least 1".to_string(),
            ));
        }
        if self.max_eval_depth == 0 {
            return Err(AnalysisError::Setup(
                "max_eval_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load `path`, or `jsai.toml` from the working directory if present; defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if !default_path.exists() {
                    return Self::default();
                }
                default_path
            }
        };
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }
}
