use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::links::LinkItem;

pub const DEFAULT_ENDPOINT: &str = "https://script.google.com/macros/s/AKfycbw1y2WxgBD7HI5crf4ZXvFKrh0lKOHgTs1EjOc4ZWAkRX8OO84aqZGeRDDpr7aN1Zdp8g/exec";

pub const DEFAULT_PHOTO_BASES: [&str; 2] = [
    "https://raw.githubusercontent.com/KP360-PO/KPP/a0d4bb8d6909b10d25c517c65568568e4d37580b/path/to/photos/",
    "https://raw.githubusercontent.com/purchase-order-team/Processors/main/path/to/photos/",
];

pub const CONTACTS_SHEET: &str = "Supplier Contacts";
pub const PERFORMERS_SHEET: &str = "Top Performer";

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("Invalid JSON from API")]
    Parse(#[source] serde_json::Error),
    #[error("{0}")]
    Remote(String),
    #[error("Unexpected API shape")]
    UnexpectedShape,
    #[error("missing columns {missing:?}, headers: {headers:?}")]
    MissingColumns {
        missing: Vec<String>,
        headers: Vec<String>,
    },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("unknown page \"{0}\"")]
    UnknownPage(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Enter,
    Exit,
    Home,
    Back,
    Forward,
    ToggleTheme,
    Help,
    Search,
    FilterText,
    NextSupplier,
    PrevSupplier,
    Reload,
    CopySelection,
    OpenSelection,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    GlobalSearch,
    ContactsFilter,
}

pub const HELP_TEXT: &str = "\
Navigation
  ←↑↓→        move selection
  Enter       open selected section / link
  h           home
  [ / ]       back / forward
  /           search sections and links
  q           quit

Supplier contacts
  s / S       next / previous supplier
  i           filter rows by text
  y           copy email of selected contact
  o           write email to selected contact

General
  t           toggle dark / light theme
  r           reload the current data page
  ?           this help
  Esc         close popup";

/// Links per category as they appear in the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    #[serde(flatten)]
    pub categories: BTreeMap<String, Vec<LinkItem>>,
}

#[derive(Debug, Clone, Setters, Deserialize)]
#[serde(default)]
#[setters(into)]
pub struct PortalConfig {
    pub endpoint: String,
    pub photo_bases: Vec<String>,
    pub contacts_sheet: String,
    pub performers_sheet: String,
    pub event_poll_time: u64,
    pub search_debounce_ms: u64,
    pub search_limit: usize,
    pub links: LinksConfig,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            photo_bases: DEFAULT_PHOTO_BASES.iter().map(|s| s.to_string()).collect(),
            contacts_sheet: CONTACTS_SHEET.to_string(),
            performers_sheet: PERFORMERS_SHEET.to_string(),
            event_poll_time: 100,
            search_debounce_ms: 120,
            search_limit: 20,
            links: LinksConfig::default(),
        }
    }
}

impl PortalConfig {
    pub fn from_toml(text: &str) -> Result<Self, PortalError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads the given file, or the default location if it exists, or falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, PortalError> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path().filter(|p| p.is_file()),
        };
        match path {
            Some(p) => {
                info!("Loading config from {}", p.display());
                let text = fs::read_to_string(&p)?;
                let cfg = Self::from_toml(&text)?;
                debug!("Config: {cfg:?}");
                Ok(cfg)
            }
            None => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("portal").join("portal.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = PortalConfig::from_toml("").unwrap();
        assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(cfg.photo_bases.len(), 2);
        assert_eq!(cfg.search_limit, 20);
        assert!(cfg.links.categories.is_empty());
    }

    #[test]
    fn config_reads_links_and_overrides() {
        let cfg = PortalConfig::from_toml(
            r#"
endpoint = "http://localhost:8080/exec"
search_debounce_ms = 50

[links]
po-tools = [
  { name = "Task Tracker", url = "https://example.com/tasks", note = "PO tasks dashboard" },
]
sops = []
"#,
        )
        .unwrap();
        assert_eq!(cfg.endpoint, "http://localhost:8080/exec");
        assert_eq!(cfg.search_debounce_ms, 50);
        assert_eq!(cfg.event_poll_time, 100);
        assert_eq!(cfg.links.categories["po-tools"][0].name, "Task Tracker");
        assert!(cfg.links.categories["sops"].is_empty());
    }

    #[test]
    fn setters_override_fields() {
        let cfg = PortalConfig::default()
            .endpoint("http://127.0.0.1/exec")
            .search_limit(5usize);
        assert_eq!(cfg.endpoint, "http://127.0.0.1/exec");
        assert_eq!(cfg.search_limit, 5);
    }

    #[test]
    fn bad_toml_is_config_error() {
        let err = PortalConfig::from_toml("endpoint = [").unwrap_err();
        assert!(matches!(err, PortalError::Config(_)));
    }

    #[test]
    fn error_messages_match_inline_status() {
        assert_eq!(PortalError::UnexpectedShape.to_string(), "Unexpected API shape");
        assert_eq!(PortalError::Remote("HTTP 500".into()).to_string(), "HTTP 500");
    }
}
