use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, trace};

use crate::domain::LinksConfig;
use crate::router::Page;

pub const EMPTY_GRID_NOTE: &str = "No links configured yet. Edit the links file to add items.";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LinkItem {
    pub name: String,
    pub url: String,
    pub note: String,
}

impl LinkItem {
    pub fn new(name: &str, url: &str, note: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            note: note.to_string(),
        }
    }

    pub fn title(&self) -> &str {
        if self.name.is_empty() { "Untitled" } else { &self.name }
    }

    pub fn is_web(&self) -> bool {
        let lower = self.url.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }
}

/// Pages that show a grid of links.
pub const LINK_PAGES: [Page; 6] = [
    Page::PoSpreadsheets,
    Page::PoTools,
    Page::Marketplaces,
    Page::Mailboxes,
    Page::SupplierWebsites,
    Page::Sops,
];

fn default_items(page: Page) -> Vec<LinkItem> {
    match page {
        Page::PoTools => vec![
            LinkItem::new(
                "Task Tracker",
                "https://kp360-po.github.io/task-tracker/",
                "PO tasks dashboard",
            ),
            LinkItem::new(
                "PO Portal",
                "https://kp360-po.github.io/KPP/PO_Portal.html",
                "Projects & docs",
            ),
        ],
        _ => Vec::new(),
    }
}

/// Hand-authored links per page. Read-only once the portal is running.
#[derive(Debug, Clone)]
pub struct LinkBook {
    items: BTreeMap<Page, Vec<LinkItem>>,
}

impl LinkBook {
    pub fn from_config(cfg: &LinksConfig) -> Self {
        let mut items: BTreeMap<Page, Vec<LinkItem>> =
            LINK_PAGES.iter().map(|&p| (p, default_items(p))).collect();
        for (key, links) in cfg.categories.iter() {
            match Page::from_id(key) {
                Some(page) if LINK_PAGES.contains(&page) => {
                    debug!("Using {} configured links for {}", links.len(), key);
                    items.insert(page, links.clone());
                }
                _ => debug!("Ignoring links for unknown category \"{key}\""),
            }
        }
        Self { items }
    }

    pub fn items(&self, page: Page) -> Result<&[LinkItem], String> {
        self.items
            .get(&page)
            .map(Vec::as_slice)
            .ok_or_else(|| format!("no links configured for {}", page.id()))
    }

    /// Items for the search index. Pages without a link grid have none.
    pub fn search_items(&self, page: Page) -> Result<Vec<LinkItem>, String> {
        if !LINK_PAGES.contains(&page) {
            return Ok(Vec::new());
        }
        self.items(page).map(<[LinkItem]>::to_vec)
    }
}

/// A link grid that is filled once, on first activation of its page.
#[derive(Debug, Clone, Default)]
pub struct LinkGrid {
    pub cards: Vec<LinkItem>,
    rendered: bool,
    pub selected: usize,
}

impl LinkGrid {
    /// Populate the grid unless that already happened. Returns whether work was done.
    pub fn ensure(&mut self, items: &[LinkItem]) -> bool {
        if self.rendered {
            trace!("Link grid already rendered");
            return false;
        }
        self.cards = items.to_vec();
        self.rendered = true;
        true
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    pub fn note(&self) -> Option<&str> {
        (self.rendered && self.cards.is_empty()).then_some(EMPTY_GRID_NOTE)
    }

    pub fn selected_card(&self) -> Option<&LinkItem> {
        self.cards.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.cards.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_only_fill_po_tools() {
        let book = LinkBook::from_config(&LinksConfig::default());
        assert_eq!(book.items(Page::PoTools).unwrap().len(), 2);
        assert!(book.items(Page::Sops).unwrap().is_empty());
        assert!(book.items(Page::Home).is_err());
        assert_eq!(book.search_items(Page::Home), Ok(Vec::new()));
        assert_eq!(book.search_items(Page::PoTools).unwrap()[1].name, "PO Portal");
    }

    #[test]
    fn config_replaces_defaults() {
        let mut cfg = LinksConfig::default();
        cfg.categories.insert(
            "sops".into(),
            vec![LinkItem::new("Returns SOP", "https://docs.example/rma", "RMA flow")],
        );
        cfg.categories.insert("po-tools".into(), vec![]);
        cfg.categories.insert("nonsense".into(), vec![LinkItem::default()]);
        let book = LinkBook::from_config(&cfg);
        assert_eq!(book.items(Page::Sops).unwrap()[0].name, "Returns SOP");
        assert!(book.items(Page::PoTools).unwrap().is_empty());
    }

    #[test]
    fn grid_renders_once() {
        let mut grid = LinkGrid::default();
        assert!(grid.note().is_none());
        assert!(grid.ensure(&[LinkItem::new("A", "https://a.example", "")]));
        assert!(!grid.ensure(&[]));
        assert_eq!(grid.cards.len(), 1);
        assert!(grid.is_rendered());
    }

    #[test]
    fn empty_grid_shows_note() {
        let mut grid = LinkGrid::default();
        grid.ensure(&[]);
        assert_eq!(grid.note(), Some(EMPTY_GRID_NOTE));
    }

    #[test]
    fn link_helpers() {
        assert_eq!(LinkItem::default().title(), "Untitled");
        assert!(LinkItem::new("x", "HTTPS://x.example", "").is_web());
        assert!(!LinkItem::new("x", "mailto:po@x.example", "").is_web());
    }
}
