use std::fs;
use std::path::PathBuf;

use ratatui::style::Color;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::PortalError;

const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

/// Colors a theme maps to.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub bg: Color,
    pub ink: Color,
    pub ink_dim: Color,
    pub accent: Color,
    pub highlight: Color,
    pub error: Color,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Icon of the toggle, it shows the theme one would switch to.
    pub fn icon(&self) -> &'static str {
        match self {
            Theme::Dark => "\u{2600}",
            Theme::Light => "\u{263e}",
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            Theme::Light => Palette {
                bg: Color::Rgb(248, 250, 252),
                ink: Color::Rgb(17, 24, 39),
                ink_dim: Color::Rgb(107, 114, 128),
                accent: Color::Rgb(37, 99, 235),
                highlight: Color::Rgb(219, 234, 254),
                error: Color::Rgb(185, 28, 28),
            },
            Theme::Dark => Palette {
                bg: Color::Rgb(15, 23, 42),
                ink: Color::Rgb(226, 232, 240),
                ink_dim: Color::Rgb(148, 163, 184),
                accent: Color::Rgb(96, 165, 250),
                highlight: Color::Rgb(30, 41, 59),
                error: Color::Rgb(248, 113, 113),
            },
        }
    }

    /// Guess from `COLORFGBG` ("fg;bg"), where a background of 0-6 or 8 is dark.
    pub fn from_terminal_hint(hint: Option<&str>) -> Option<Self> {
        let bg: u8 = hint?.rsplit(';').next()?.trim().parse().ok()?;
        Some(if bg <= 6 || bg == 8 { Theme::Dark } else { Theme::Light })
    }
}

/// Small JSON key-value file for user preferences.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: Option<PathBuf>,
}

impl PreferenceStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("portal").join("preferences.json"))
    }

    fn read_all(&self) -> Map<String, Value> {
        let Some(path) = &self.path else {
            return Map::new();
        };
        match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    warn!("Ignoring malformed preferences in {}", path.display());
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.read_all()
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), PortalError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut map = self.read_all();
        map.insert(key.to_string(), Value::String(value.to_string()));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&Value::Object(map))?)?;
        debug!("Stored preference {key}={value}");
        Ok(())
    }

    /// Saved theme, else the terminal's hint, else light.
    pub fn initial_theme(&self, hint: Option<&str>) -> Theme {
        self.get(THEME_KEY)
            .as_deref()
            .and_then(Theme::parse)
            .or_else(|| Theme::from_terminal_hint(hint))
            .unwrap_or(Theme::Light)
    }

    pub fn save_theme(&self, theme: Theme) {
        if let Err(e) = self.set(THEME_KEY, theme.as_str()) {
            warn!("Could not persist theme: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_store(name: &str) -> PreferenceStore {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("portal-{name}-{nanos}"));
        PreferenceStore::new(Some(dir.join("preferences.json")))
    }

    #[test]
    fn theme_round_trips_through_store() {
        let store = temp_store("theme");
        assert_eq!(store.initial_theme(None), Theme::Light);
        store.save_theme(Theme::Dark);
        assert_eq!(store.get("theme").as_deref(), Some("dark"));
        assert_eq!(store.initial_theme(Some("15;7")), Theme::Dark);
        store.save_theme(Theme::Dark.toggled());
        assert_eq!(store.initial_theme(None), Theme::Light);
    }

    #[test]
    fn terminal_hint_decides_without_saved_value() {
        let store = PreferenceStore::new(None);
        assert_eq!(store.initial_theme(Some("15;0")), Theme::Dark);
        assert_eq!(store.initial_theme(Some("0;15")), Theme::Light);
        assert_eq!(store.initial_theme(Some("garbage")), Theme::Light);
        assert!(store.set("theme", "dark").is_ok());
        assert_eq!(store.get("theme"), None);
    }

    #[test]
    fn malformed_file_is_ignored() {
        let store = temp_store("malformed");
        let path = store.path.clone().unwrap();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[1, 2").unwrap();
        assert_eq!(store.get("theme"), None);
        store.save_theme(Theme::Dark);
        assert_eq!(store.initial_theme(None), Theme::Dark);
    }
}
