//! Rewrite engine configuration.
//!
//! Read from the `[rewrite]` table of `qail.toml` in the working directory,
//! falling back to `<config dir>/qail/rewrite.toml`, then to defaults.

use crate::error::{RewriteError, RewriteResult};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Deepest expression nesting a rewriter will descend into
    pub max_depth: usize,
    /// Stored form of `true` for boolean flag columns
    pub flag_true: String,
    /// Stored form of `false` for boolean flag columns
    pub flag_false: String,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            max_depth: 256,
            flag_true: "Y".to_string(),
            flag_false: "N".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProjectFile {
    #[serde(default)]
    rewrite: Option<RewriteConfig>,
}

impl RewriteConfig {
    pub fn from_toml_str(content: &str) -> RewriteResult<Self> {
        let config: RewriteConfig =
            toml::from_str(content).map_err(|e| RewriteError::Config(e.to_string()))?;
        config.validate()
    }

    /// Load a standalone `rewrite.toml`.
    pub fn load(path: impl AsRef<Path>) -> RewriteResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            RewriteError::Config(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Look for `qail.toml` then the user config dir, else defaults.
    pub fn discover() -> RewriteResult<Self> {
        let project = Path::new("qail.toml");
        if project.exists() {
            let content = std::fs::read_to_string(project)
                .map_err(|e| RewriteError::Config(format!("qail.toml: {}", e)))?;
            let file: ProjectFile =
                toml::from_str(&content).map_err(|e| RewriteError::Config(e.to_string()))?;
            if let Some(config) = file.rewrite {
                tracing::debug!("Loaded rewrite config from qail.toml");
                return config.validate();
            }
        }

        if let Some(dir) = dirs::config_dir() {
            let user = dir.join("qail").join("rewrite.toml");
            if user.exists() {
                tracing::debug!("Loaded rewrite config from {}", user.display());
                return Self::load(user);
            }
        }

        Ok(Self::default())
    }

    fn validate(self) -> RewriteResult<Self> {
        if self.max_depth == 0 {
            return Err(RewriteError::Config("max_depth must be positive".to_string()));
        }
        if self.flag_true == self.flag_false {
            return Err(RewriteError::Config(format!(
                "flag_true and flag_false must differ (both '{}')",
                self.flag_true
            )));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = RewriteConfig::from_toml_str("max_depth = 32").unwrap();
        assert_eq!(config.max_depth, 32);
        assert_eq!(config.flag_true, "Y");
        assert_eq!(config.flag_false, "N");
    }

    #[test]
    fn test_rejects_identical_flags() {
        let err =
            RewriteConfig::from_toml_str("flag_true = \"1\"\nflag_false = \"1\"").unwrap_err();
        assert!(matches!(err, RewriteError::Config(_)));
    }

    #[test]
    fn test_rejects_zero_depth() {
        assert!(RewriteConfig::from_toml_str("max_depth = 0").is_err());
    }
}
