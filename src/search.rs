use std::cell::OnceCell;
use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::links::LinkItem;
use crate::router::Page;

/// Offset used for entries whose title does not contain the query.
const NO_TITLE_MATCH: usize = 999;

pub struct CatalogEntry {
    pub page: Page,
    pub keywords: &'static [&'static str],
}

pub const CATALOG: [CatalogEntry; 14] = [
    CatalogEntry { page: Page::PoProjects, keywords: &["projects", "po", "portal", "docs", "kpp"] },
    CatalogEntry { page: Page::SupplierContacts, keywords: &["contacts", "vendors", "phone", "email", "supplier"] },
    CatalogEntry { page: Page::EmailTemplates, keywords: &["templates", "email", "reply", "canned responses"] },
    CatalogEntry { page: Page::Schedule, keywords: &["calendar", "roster", "shift"] },
    CatalogEntry { page: Page::TaskMonitoring, keywords: &["tasks", "tracker", "kanban", "status"] },
    CatalogEntry { page: Page::Tracker, keywords: &["status", "metrics", "tracking"] },
    CatalogEntry { page: Page::MarketplacePerformance, keywords: &["kpi", "revenue", "conversion", "marketplace", "performance"] },
    CatalogEntry { page: Page::TopPerformers, keywords: &["awards", "recognition", "employees"] },
    CatalogEntry { page: Page::PoSpreadsheets, keywords: &["sheets", "spreadsheets", "gdrive", "excel"] },
    CatalogEntry { page: Page::PoTools, keywords: &["tools", "utility", "automation", "dashboard"] },
    CatalogEntry { page: Page::Marketplaces, keywords: &["amazon", "ebay", "walmart", "marketplace", "seller"] },
    CatalogEntry { page: Page::Mailboxes, keywords: &["inbox", "gmail", "outlook", "email", "support"] },
    CatalogEntry { page: Page::SupplierWebsites, keywords: &["supplier", "portal", "ordering", "tickets"] },
    CatalogEntry { page: Page::Sops, keywords: &["standard operating procedures", "guidelines", "policy", "process", "how-to"] },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Category,
    Item,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchEntry {
    pub kind: EntryKind,
    pub page: Page,
    pub title: String,
    pub subtitle: String,
    pub url: Option<String>,
    haystack: String,
}

impl SearchEntry {
    fn category(cat: &CatalogEntry) -> Self {
        let title = cat.page.title().to_string();
        let haystack = format!("{} {}", title, cat.keywords.join(" ")).to_lowercase();
        Self {
            kind: EntryKind::Category,
            page: cat.page,
            title,
            subtitle: "Open section".to_string(),
            url: None,
            haystack,
        }
    }

    fn item(cat: &CatalogEntry, item: &LinkItem) -> Self {
        let mut parts = vec![
            item.title(),
            item.note.as_str(),
            item.url.as_str(),
            cat.page.title(),
        ];
        parts.extend(cat.keywords.iter());
        Self {
            kind: EntryKind::Item,
            page: cat.page,
            title: item.title().to_string(),
            subtitle: if item.note.is_empty() {
                cat.page.title().to_string()
            } else {
                item.note.clone()
            },
            url: (!item.url.is_empty()).then(|| item.url.clone()),
            haystack: parts.join(" ").to_lowercase(),
        }
    }

    fn title_offset(&self, query: &str) -> usize {
        self.title
            .to_lowercase()
            .find(query)
            .unwrap_or(NO_TITLE_MATCH)
    }
}

/// Supplies the link items of one category. Failing suppliers are skipped.
pub type ItemSupplier<'a> = dyn Fn(Page) -> Result<Vec<LinkItem>, String> + 'a;

/// Flat search entries, one per category followed by its items.
pub fn build_index(catalog: &[CatalogEntry], items: &ItemSupplier) -> Vec<SearchEntry> {
    let mut entries = Vec::new();
    for cat in catalog.iter() {
        entries.push(SearchEntry::category(cat));
        match items(cat.page) {
            Ok(list) => entries.extend(list.iter().map(|it| SearchEntry::item(cat, it))),
            Err(e) => warn!("Skipping items of {}: {e}", cat.page.id()),
        }
    }
    debug!("Built search index with {} entries", entries.len());
    entries
}

/// Search entries built on first use and kept for the whole session.
pub struct SearchIndex {
    entries: OnceCell<Vec<SearchEntry>>,
    limit: usize,
}

impl SearchIndex {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: OnceCell::new(),
            limit,
        }
    }

    pub fn is_built(&self) -> bool {
        self.entries.get().is_some()
    }

    pub fn entries(&self, items: &ItemSupplier) -> &[SearchEntry] {
        self.entries.get_or_init(|| build_index(&CATALOG, items))
    }

    /// Ranked matches for `query`: items before categories, then earlier title hits first.
    pub fn search(&self, query: &str, items: &ItemSupplier) -> Vec<SearchEntry> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        let mut results: Vec<SearchEntry> = self
            .entries(items)
            .iter()
            .filter(|e| e.haystack.contains(&query))
            .cloned()
            .collect();
        results.sort_by(|a, b| compare(a, b, &query));
        results.truncate(self.limit);
        results
    }
}

fn compare(a: &SearchEntry, b: &SearchEntry, query: &str) -> Ordering {
    match (a.kind, b.kind) {
        (EntryKind::Item, EntryKind::Category) => Ordering::Less,
        (EntryKind::Category, EntryKind::Item) => Ordering::Greater,
        _ => a.title_offset(query).cmp(&b.title_offset(query)),
    }
}
