use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum ThemePreference {
    System,
    Light,
    Dark,
}

/// Application settings persisted across runs. Image state never is; these
/// cover only window defaults and the theme choice.
#[derive(Serialize, Deserialize)]
pub struct AppSettings {
    pub theme_preference: ThemePreference,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self { theme_preference: ThemePreference::System, window_width: 700.0, window_height: 500.0 }
    }
}

impl AppSettings {
    pub fn load() -> Self {
        let config_path = Self::get_config_path();
        if let Ok(contents) = fs::read_to_string(&config_path) {
            if let Ok(settings) = serde_json::from_str(&contents) {
                return settings;
            }
        }
        Self::default()
    }

    pub fn save(&self) {
        let config_path = Self::get_config_path();
        if let Some(parent) = config_path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(self) {
            let _ = fs::write(config_path, json);
        }
    }

    fn get_config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("retouch");
        path.push("settings.json");
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_initial_window() {
        let settings = AppSettings::default();
        assert!(matches!(settings.theme_preference, ThemePreference::System));
        assert_eq!(settings.window_width, 700.0);
        assert_eq!(settings.window_height, 500.0);
    }

    #[test]
    fn settings_round_trip_through_json() {
        let settings = AppSettings {
            theme_preference: ThemePreference::Dark,
            window_width: 1024.0,
            window_height: 768.0,
        };
        let json = serde_json::to_string(&settings).unwrap();
        let restored: AppSettings = serde_json::from_str(&json).unwrap();
        assert!(matches!(restored.theme_preference, ThemePreference::Dark));
        assert_eq!(restored.window_width, 1024.0);
        assert_eq!(restored.window_height, 768.0);
    }
}
