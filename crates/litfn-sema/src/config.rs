use std::path::Path;

use serde::Deserialize;

use crate::capture::RegisterPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(String),
}

/// Analysis options, usually read from a `litfn.toml`:
///
/// ```toml
/// register_constant_policy = "deny"
/// deduplicate = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub register_constant_policy: RegisterPolicy,
    #[serde(default = "default_true")]
    pub deduplicate: bool,
    /// Attach "did you mean" notes to undeclared identifiers.
    #[serde(default = "default_true")]
    pub suggestions: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            register_constant_policy: RegisterPolicy::default(),
            deduplicate: default_true(),
            suggestions: default_true(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl AnalysisConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|err| ConfigError::Config(err.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|err| ConfigError::Config(format!("failed to parse {}: {err}", path.display())))
    }
}
