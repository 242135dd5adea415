//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use stride_core::{ActivityType, BodyWeight, Component, MetricsSettings, UnitSystem};

use crate::error::ConfigError;

/// User preferences consumed by a recording session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Activity type a fresh session starts with.
    pub activity_type: ActivityType,
    pub unit_system: UnitSystem,
    pub body_weight_kg: f64,
    /// Show rolling speed instead of recent instantaneous speed.
    pub rolling_speed: bool,
    /// Components that must report ready before recording can start.
    pub required_components: Vec<Component>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            activity_type: ActivityType::default(),
            unit_system: UnitSystem::default(),
            body_weight_kg: BodyWeight::default().kilograms(),
            rolling_speed: true,
            required_components: vec![Component::Location],
        }
    }
}

impl SessionConfig {
    /// Loads configuration from default locations.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // STRIDE_BODY_WEIGHT_KG, STRIDE_UNIT_SYSTEM, ...
        figment = figment.merge(Env::prefixed("STRIDE_"));

        Self::from_figment(&figment)
    }

    /// Extracts and validates a configuration from any provider stack.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.metrics_settings()?;
        Ok(config)
    }

    /// The settings the metric calculations need.
    pub fn metrics_settings(&self) -> Result<MetricsSettings, ConfigError> {
        Ok(MetricsSettings {
            activity_type: self.activity_type,
            unit_system: self.unit_system,
            body_weight: BodyWeight::new(self.body_weight_kg)?,
            rolling_speed: self.rolling_speed,
        })
    }
}

/// Returns the platform-specific config directory for stride.
///
/// On Linux: `~/.config/stride`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("stride"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn from_toml(toml: &str) -> Result<SessionConfig, ConfigError> {
        let figment = Figment::from(Serialized::defaults(SessionConfig::default()))
            .merge(Toml::string(toml));
        SessionConfig::from_figment(&figment)
    }

    #[test]
    fn defaults_are_valid() {
        let settings = SessionConfig::default().metrics_settings().unwrap();
        assert_eq!(settings.activity_type, ActivityType::Walking);
        assert!(settings.rolling_speed);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = from_toml(
            r#"
            activity_type = "running"
            unit_system = "imperial"
            body_weight_kg = 82.5
            required_components = ["location", "heart_rate"]
            "#,
        )
        .unwrap();

        assert_eq!(config.activity_type, ActivityType::Running);
        assert_eq!(config.unit_system, UnitSystem::Imperial);
        assert!((config.body_weight_kg - 82.5).abs() < f64::EPSILON);
        assert_eq!(
            config.required_components,
            vec![Component::Location, Component::HeartRate]
        );
        assert!(config.rolling_speed);
    }

    #[test]
    fn non_positive_body_weight_is_rejected() {
        let err = from_toml("body_weight_kg = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_activity_is_a_load_error() {
        let err = from_toml(r#"activity_type = "rowing""#).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn explicit_file_is_merged() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rolling_speed = false").unwrap();

        let figment = Figment::from(Serialized::defaults(SessionConfig::default()))
            .merge(Toml::file(file.path()));
        let config = SessionConfig::from_figment(&figment).unwrap();
        assert!(!config.rolling_speed);
    }

    #[test]
    fn config_dir_ends_with_stride() {
        if let Some(path) = dirs_config_path() {
            assert_eq!(path.file_name().unwrap(), "stride");
        }
    }
}
