use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const PLACEMENT_RADIUS_ENV_VAR: &str = "PETRIFY_PLACEMENT_RADIUS";
pub const PLACEHOLDER_TEMPLATE_ENV_VAR: &str = "PETRIFY_PLACEHOLDER_TEMPLATE";
pub const CONDITION_ENV_VAR: &str = "PETRIFY_CONDITION";
pub const APPEARANCE_DIR_ENV_VAR: &str = "PETRIFY_APPEARANCE_DIR";

pub const DEFAULT_PLACEMENT_RADIUS: u32 = 5;
pub const MAX_PLACEMENT_RADIUS: u32 = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config json: {message}")]
    Parse { message: String },
    #[error("parse config json at {path}: {message}")]
    ParseAt { path: String, message: String },
    #[error("{var}: expected {expected}, got '{value}'")]
    InvalidEnv {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("{field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PetrifyConfig {
    /// Chebyshev radius searched for a standable cell on respawn.
    pub placement_radius: u32,
    pub placeholder_template: String,
    pub wrapper_template: String,
    /// Name of the actor condition that drives petrification.
    pub condition: String,
    /// When set, appearance records are written here.
    pub appearance_dir: Option<PathBuf>,
}

impl Default for PetrifyConfig {
    fn default() -> Self {
        Self {
            placement_radius: DEFAULT_PLACEMENT_RADIUS,
            placeholder_template: "petrify.statue".to_string(),
            wrapper_template: "petrify.statue_packed".to_string(),
            condition: "petrified_full".to_string(),
            appearance_dir: None,
        }
    }
}

impl PetrifyConfig {
    pub fn load_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_json(&raw)
    }

    pub fn parse_json(raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config = match serde_path_to_error::deserialize::<_, Self>(&mut deserializer) {
            Ok(config) => config,
            Err(error) => {
                let path = error.path().to_string();
                let message = error.into_inner().to_string();
                return if path.is_empty() || path == "." {
                    Err(ConfigError::Parse { message })
                } else {
                    Err(ConfigError::ParseAt { path, message })
                };
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Applies `PETRIFY_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|var| env::var(var).ok())
    }

    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup(PLACEMENT_RADIUS_ENV_VAR) {
            self.placement_radius = raw.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnv {
                var: PLACEMENT_RADIUS_ENV_VAR,
                expected: "a non-negative integer",
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup(PLACEHOLDER_TEMPLATE_ENV_VAR) {
            self.placeholder_template = raw.trim().to_string();
        }
        if let Some(raw) = lookup(CONDITION_ENV_VAR) {
            self.condition = raw.trim().to_string();
        }
        if let Some(raw) = lookup(APPEARANCE_DIR_ENV_VAR) {
            let trimmed = raw.trim();
            self.appearance_dir = (!trimmed.is_empty()).then(|| PathBuf::from(trimmed));
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.placement_radius > MAX_PLACEMENT_RADIUS {
            return Err(ConfigError::Invalid {
                field: "placement_radius",
                message: format!(
                    "must be at most {MAX_PLACEMENT_RADIUS}, got {}",
                    self.placement_radius
                ),
            });
        }
        for (field, value) in [
            ("placeholder_template", &self.placeholder_template),
            ("wrapper_template", &self.wrapper_template),
            ("condition", &self.condition),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    message: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = PetrifyConfig::default();
        config.validate().expect("valid");
        assert_eq!(config.placement_radius, 5);
        assert_eq!(config.condition, "petrified_full");
    }

    #[test]
    fn env_overrides_apply() {
        let config = PetrifyConfig::default()
            .with_overrides(lookup(&[
                (PLACEMENT_RADIUS_ENV_VAR, " 3 "),
                (CONDITION_ENV_VAR, "stoned"),
                (APPEARANCE_DIR_ENV_VAR, "/tmp/looks"),
            ]))
            .expect("overrides");
        assert_eq!(config.placement_radius, 3);
        assert_eq!(config.condition, "stoned");
        assert_eq!(config.appearance_dir, Some(PathBuf::from("/tmp/looks")));
        assert_eq!(config.placeholder_template, "petrify.statue");
    }

    #[test]
    fn bad_radius_env_is_rejected() {
        let err = PetrifyConfig::default()
            .with_overrides(lookup(&[(PLACEMENT_RADIUS_ENV_VAR, "far")]))
            .expect_err("bad radius");
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));

        let err = PetrifyConfig::default()
            .with_overrides(lookup(&[(PLACEMENT_RADIUS_ENV_VAR, "65")]))
            .expect_err("too far");
        assert!(matches!(err, ConfigError::Invalid { field: "placement_radius", .. }));
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = PetrifyConfig::parse_json(r#"{ "placement_radius": 2 }"#).expect("parse");
        assert_eq!(config.placement_radius, 2);
        assert_eq!(config.wrapper_template, "petrify.statue_packed");
    }

    #[test]
    fn json_rejects_unknown_fields() {
        let err = PetrifyConfig::parse_json(r#"{ "radius": 2 }"#).expect_err("unknown");
        assert!(err.to_string().contains("radius"));
    }

    #[test]
    fn json_type_errors_name_the_field() {
        let err = PetrifyConfig::parse_json(r#"{ "condition": 7 }"#).expect_err("type");
        assert!(matches!(err, ConfigError::ParseAt { ref path, .. } if path == "condition"));
    }

    #[test]
    fn empty_names_fail_validation() {
        let err = PetrifyConfig::parse_json(r#"{ "condition": " " }"#).expect_err("empty");
        assert!(matches!(err, ConfigError::Invalid { field: "condition", .. }));
    }

    #[test]
    fn load_from_file() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("petrify.json");
        std::fs::write(&path, r#"{ "placeholder_template": "custom.statue" }"#).expect("write");
        let config = PetrifyConfig::load_json_file(&path).expect("load");
        assert_eq!(config.placeholder_template, "custom.statue");
    }
}
