use std::time::Duration;

use chrono::{DateTime, Local};
use reqwest::blocking::Client;
use tracing::{debug, trace};

use crate::domain::PortalError;
use crate::table::Table;

const NAME: [&str; 4] = ["name", "employee", "full name", "contact"];
const PHOTO: [&str; 4] = ["photo", "photo file", "photo filename", "filename"];

pub const NO_ROWS_NOTE: &str = "No rows in Top Performer sheet.";

/// Circular grey avatar used once every photo base failed.
pub const PLACEHOLDER_SVG: &str = "<svg xmlns='http://www.w3.org/2000/svg' width='110' height='110'>\
<rect width='100%' height='100%' rx='55' ry='55' fill='#e5e7eb'/>\
<text x='50%' y='52%' font-size='12' text-anchor='middle' fill='#6b7280'>No photo</text>\
</svg>";

pub fn placeholder_data_uri() -> String {
    format!(
        "data:image/svg+xml;charset=utf-8,{}",
        urlencoding::encode(PLACEHOLDER_SVG)
    )
}

pub fn photo_url(base: &str, filename: &str) -> String {
    format!("{}{}", base, urlencoding::encode(filename.trim()))
}

#[derive(Debug, Clone, PartialEq)]
pub enum PhotoSource {
    Url { base_idx: usize, url: String },
    Placeholder,
}

/// Photo of one performer. Starts at the first base and only moves on when a load failure
/// is reported for the URL currently shown.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoChain {
    filename: String,
    bases: Vec<String>,
    base_idx: usize,
    loaded: bool,
}

impl PhotoChain {
    pub fn new(filename: &str, bases: &[String]) -> Self {
        Self {
            filename: filename.to_string(),
            bases: bases.to_vec(),
            base_idx: 0,
            loaded: false,
        }
    }

    pub fn current(&self) -> PhotoSource {
        match self.bases.get(self.base_idx) {
            Some(base) if !self.filename.is_empty() => PhotoSource::Url {
                base_idx: self.base_idx,
                url: photo_url(base, &self.filename),
            },
            _ => PhotoSource::Placeholder,
        }
    }

    /// Url to attempt next, `None` once the placeholder is showing.
    pub fn pending_url(&self) -> Option<String> {
        match self.current() {
            PhotoSource::Url { url, .. } if !self.loaded => Some(url),
            _ => None,
        }
    }

    /// What an image element would point at: the current url or the placeholder.
    pub fn src(&self) -> String {
        match self.current() {
            PhotoSource::Url { url, .. } => url,
            PhotoSource::Placeholder => placeholder_data_uri(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_placeholder(&self) -> bool {
        self.current() == PhotoSource::Placeholder
    }

    pub fn on_loaded(&mut self, url: &str) {
        if self.pending_url().as_deref() == Some(url) {
            self.loaded = true;
        }
    }

    /// Advance past `url` if it is the one currently attempted. Stale reports are ignored.
    pub fn on_failed(&mut self, url: &str) -> PhotoSource {
        if self.pending_url().as_deref() == Some(url) {
            self.base_idx += 1;
            trace!("Photo {url} failed, moving to base {}", self.base_idx);
        }
        self.current()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Performer {
    pub name: String,
    pub photo_file: String,
    pub photo: PhotoChain,
}

/// Performer cards plus an optional note shown above them.
#[derive(Debug, Default, Clone)]
pub struct PerformersView {
    pub performers: Vec<Performer>,
    pub note: Option<String>,
    pub selected: usize,
}

impl PerformersView {
    pub fn new(table: &Table, photo_bases: &[String]) -> Self {
        match extract(table) {
            Ok(list) if list.is_empty() => Self {
                note: Some(NO_ROWS_NOTE.to_string()),
                ..Default::default()
            },
            Ok(list) => Self {
                performers: list
                    .into_iter()
                    .map(|(name, photo_file)| Performer {
                        photo: PhotoChain::new(&photo_file, photo_bases),
                        name,
                        photo_file,
                    })
                    .collect(),
                ..Default::default()
            },
            Err(e) => {
                debug!("Top performers degraded: {e}");
                Self {
                    note: Some(format!(
                        "No \u{201c}Name\u{201d}/\u{201c}Photo\u{201d} columns found in Top Performer. Headers: {}",
                        table.headers.join(", ")
                    )),
                    ..Default::default()
                }
            }
        }
    }

    /// Urls of all photos that still need an attempt, keyed by performer index.
    pub fn pending_photos(&self) -> Vec<(usize, String)> {
        self.performers
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.photo.pending_url().map(|u| (i, u)))
            .collect()
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.performers.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

/// Name and photo filename pairs, or `MissingColumns` when either column is absent.
pub fn extract(table: &Table) -> Result<Vec<(String, String)>, PortalError> {
    let name_idx = table.column_index(&NAME);
    let photo_idx = table.column_index(&PHOTO);
    let (Some(name_idx), Some(photo_idx)) = (name_idx, photo_idx) else {
        let mut missing = Vec::new();
        if name_idx.is_none() {
            missing.push("Name".to_string());
        }
        if photo_idx.is_none() {
            missing.push("Photo".to_string());
        }
        return Err(PortalError::MissingColumns {
            missing,
            headers: table.headers.clone(),
        });
    };

    Ok(table
        .rows
        .iter()
        .map(|r| {
            let cell = |i: usize| r.get(i).map(|s| s.trim().to_string()).unwrap_or_default();
            (cell(name_idx), cell(photo_idx))
        })
        .filter(|(name, photo)| !name.is_empty() || !photo.is_empty())
        .collect())
}

/// Title of the start-up spotlight, naming the month 30 days back.
pub fn spotlight_title(now: DateTime<Local>, loaded: bool) -> String {
    if loaded {
        let month = now - chrono::Duration::days(30);
        format!("Top Performers \u{2014} {}", month.format("%B %Y"))
    } else {
        "Top Performers \u{2014} Loading\u{2026}".to_string()
    }
}

/// Attempts to load a photo. An `Err` is the load-failure signal that advances a chain.
pub trait PhotoLoader: Send {
    fn load(&self, url: &str) -> Result<(), String>;
}

pub struct HttpPhotoLoader {
    client: Client,
}

impl HttpPhotoLoader {
    pub fn new() -> Result<Self, PortalError> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self { client })
    }
}

impl PhotoLoader for HttpPhotoLoader {
    fn load(&self, url: &str) -> Result<(), String> {
        let response = self.client.get(url).send().map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let bytes = response.bytes().map_err(|e| e.to_string())?;
        check_photo(status, &bytes)
    }
}

/// A photo counts as loaded only for a 2xx answer whose body decodes as an image.
pub fn check_photo(status: u16, bytes: &[u8]) -> Result<(), String> {
    if !(200..300).contains(&status) {
        return Err(format!("HTTP {status}"));
    }
    image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    Ok(())
}
