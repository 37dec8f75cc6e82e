//! Application configuration injected by the hosting shell.
//!
//! # Responsibility
//! - Model host-persisted preferences as explicit values with defined
//!   defaults, never as ambient process-global state.
//!
//! # Invariants
//! - Unknown preference strings fall back to the default, matching how the
//!   host treats a missing stored preference.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};

/// Theme selection offered by the settings screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemePreference {
    Light,
    Dark,
    /// Follow the platform-wide appearance setting.
    #[default]
    System,
}

impl ThemePreference {
    /// Parses a stored preference value; unknown values fall back to the
    /// default rather than erroring.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Self::Light,
            "dark" => Self::Dark,
            "system" => Self::System,
            _ => Self::default(),
        }
    }

    /// Stable string form for host-side persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }
}

/// Configuration handed to the core by the hosting application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Appearance preference persisted by the host.
    #[serde(default)]
    pub theme: ThemePreference,
    /// Log level handed to `init_logging`.
    #[serde(default = "default_level_string")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            theme: ThemePreference::default(),
            log_level: default_level_string(),
        }
    }
}

fn default_level_string() -> String {
    default_log_level().to_string()
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ThemePreference};

    #[test]
    fn theme_parse_accepts_known_values_case_insensitively() {
        assert_eq!(ThemePreference::parse("Light"), ThemePreference::Light);
        assert_eq!(ThemePreference::parse(" dark "), ThemePreference::Dark);
        assert_eq!(ThemePreference::parse("system"), ThemePreference::System);
    }

    #[test]
    fn theme_parse_falls_back_to_default_for_unknown_values() {
        assert_eq!(ThemePreference::parse("sepia"), ThemePreference::System);
        assert_eq!(ThemePreference::parse(""), ThemePreference::System);
    }

    #[test]
    fn theme_round_trips_through_stable_strings() {
        for theme in [
            ThemePreference::Light,
            ThemePreference::Dark,
            ThemePreference::System,
        ] {
            assert_eq!(ThemePreference::parse(theme.as_str()), theme);
        }
    }

    #[test]
    fn config_default_uses_system_theme() {
        let config = AppConfig::default();
        assert_eq!(config.theme, ThemePreference::System);
        assert!(!config.log_level.is_empty());
    }
}
