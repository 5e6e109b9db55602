use tracing::{debug, trace};

use crate::domain::PortalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Page {
    Home,
    PoProjects,
    SupplierContacts,
    EmailTemplates,
    Schedule,
    TaskMonitoring,
    Tracker,
    MarketplacePerformance,
    TopPerformers,
    PoSpreadsheets,
    PoTools,
    Marketplaces,
    Mailboxes,
    SupplierWebsites,
    Sops,
}

pub static ALL_PAGES: [Page; 15] = [
    Page::Home,
    Page::PoProjects,
    Page::SupplierContacts,
    Page::EmailTemplates,
    Page::Schedule,
    Page::TaskMonitoring,
    Page::Tracker,
    Page::MarketplacePerformance,
    Page::TopPerformers,
    Page::PoSpreadsheets,
    Page::PoTools,
    Page::Marketplaces,
    Page::Mailboxes,
    Page::SupplierWebsites,
    Page::Sops,
];

impl Page {
    pub fn id(&self) -> &'static str {
        match self {
            Page::Home => "home",
            Page::PoProjects => "po-projects",
            Page::SupplierContacts => "supplier-contacts",
            Page::EmailTemplates => "email-templates",
            Page::Schedule => "schedule",
            Page::TaskMonitoring => "task-monitoring",
            Page::Tracker => "tracker",
            Page::MarketplacePerformance => "marketplace-performance",
            Page::TopPerformers => "top-performers",
            Page::PoSpreadsheets => "po-spreadsheets",
            Page::PoTools => "po-tools",
            Page::Marketplaces => "marketplaces",
            Page::Mailboxes => "mailboxes",
            Page::SupplierWebsites => "supplier-websites",
            Page::Sops => "sops",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        ALL_PAGES.iter().copied().find(|p| p.id() == id)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::PoProjects => "PO Projects",
            Page::SupplierContacts => "Supplier Contacts",
            Page::EmailTemplates => "Email Templates",
            Page::Schedule => "Schedule",
            Page::TaskMonitoring => "Task Monitoring",
            Page::Tracker => "Tracker",
            Page::MarketplacePerformance => "Marketplace Performance",
            Page::TopPerformers => "Top Performers",
            Page::PoSpreadsheets => "PO Spreadsheets",
            Page::PoTools => "PO Tools",
            Page::Marketplaces => "Marketplaces",
            Page::Mailboxes => "Mailboxes",
            Page::SupplierWebsites => "Supplier Websites",
            Page::Sops => "SOPs",
        }
    }
}

/// A `#<page-id>` fragment. Empty fragments mean home.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location(pub Page);

impl Location {
    pub fn parse(fragment: &str) -> Result<Self, PortalError> {
        let id = fragment.trim().trim_start_matches('#');
        if id.is_empty() {
            return Ok(Location(Page::Home));
        }
        Page::from_id(id)
            .map(Location)
            .ok_or_else(|| PortalError::UnknownPage(id.to_string()))
    }

    pub fn fragment(&self) -> String {
        format!("#{}", self.0.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FooterSize {
    Full,
    Slim,
}

impl FooterSize {
    pub fn rows(&self) -> u16 {
        match self {
            FooterSize::Full => 3,
            FooterSize::Slim => 1,
        }
    }
}

/// Work an activation asks the caller to do after switching the visible page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    LoadContacts,
    LoadPerformers,
    EnsureLinkGrid(Page),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub page: Page,
    pub pushed: bool,
    pub footer: FooterSize,
    pub effects: Vec<SideEffect>,
}

/// Session history with exactly one active page.
#[derive(Debug)]
pub struct Router {
    history: Vec<Page>,
    cursor: usize,
    pub footer: FooterSize,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Page::Home)
    }
}

impl Router {
    pub fn new(initial: Page) -> Self {
        Self {
            history: vec![initial],
            cursor: 0,
            footer: footer_for(initial),
        }
    }

    pub fn active(&self) -> Page {
        self.history[self.cursor]
    }

    pub fn location(&self) -> Location {
        Location(self.active())
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Show `page`, pushing a history entry when the location changes.
    pub fn activate(&mut self, page: Page) -> Activation {
        let pushed = page != self.active();
        if pushed {
            self.history.truncate(self.cursor + 1);
            self.history.push(page);
            self.cursor = self.history.len() - 1;
            debug!("Navigate to {}", self.location().fragment());
        }
        self.apply(pushed)
    }

    /// Re-activate the previous history entry without pushing.
    pub fn back(&mut self) -> Option<Activation> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        trace!("Back to {}", self.active().id());
        Some(self.apply(false))
    }

    pub fn forward(&mut self) -> Option<Activation> {
        if self.cursor + 1 >= self.history.len() {
            return None;
        }
        self.cursor += 1;
        trace!("Forward to {}", self.active().id());
        Some(self.apply(false))
    }

    /// Re-run the current page's activation, e.g. on start-up.
    pub fn refresh(&mut self) -> Activation {
        self.apply(false)
    }

    fn apply(&mut self, pushed: bool) -> Activation {
        let page = self.active();
        self.footer = footer_for(page);
        Activation {
            page,
            pushed,
            footer: self.footer,
            effects: effects_for(page),
        }
    }
}

fn footer_for(page: Page) -> FooterSize {
    if page == Page::Home {
        FooterSize::Full
    } else {
        FooterSize::Slim
    }
}

fn effects_for(page: Page) -> Vec<SideEffect> {
    match page {
        Page::SupplierContacts => vec![SideEffect::LoadContacts],
        Page::TopPerformers => vec![SideEffect::LoadPerformers],
        Page::PoSpreadsheets
        | Page::PoTools
        | Page::Marketplaces
        | Page::Mailboxes
        | Page::SupplierWebsites
        | Page::Sops => vec![SideEffect::EnsureLinkGrid(page)],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_fragments() {
        assert_eq!(Location::parse("").unwrap().0, Page::Home);
        assert_eq!(Location::parse("#").unwrap().0, Page::Home);
        assert_eq!(Location::parse("#sops").unwrap().0, Page::Sops);
        assert_eq!(Location::parse("supplier-contacts").unwrap().0, Page::SupplierContacts);
        assert!(matches!(Location::parse("#nope"), Err(PortalError::UnknownPage(_))));
        assert_eq!(Location(Page::PoTools).fragment(), "#po-tools");
    }

    #[test]
    fn ids_round_trip() {
        for page in ALL_PAGES {
            assert_eq!(Page::from_id(page.id()), Some(page));
        }
    }

    #[test]
    fn back_after_home_does_not_push() {
        let mut router = Router::new(Page::Schedule);
        router.activate(Page::Home);
        assert_eq!(router.history_len(), 2);

        let activation = router.back().unwrap();
        assert_eq!(activation.page, Page::Schedule);
        assert!(!activation.pushed);
        assert_eq!(router.active(), Page::Schedule);
        assert_eq!(router.history_len(), 2);

        let activation = router.forward().unwrap();
        assert_eq!(activation.page, Page::Home);
        assert!(router.forward().is_none());
    }

    #[test]
    fn reactivating_active_page_only_reruns_effects() {
        let mut router = Router::new(Page::SupplierContacts);
        let activation = router.activate(Page::SupplierContacts);
        assert!(!activation.pushed);
        assert_eq!(router.history_len(), 1);
        assert_eq!(activation.effects, vec![SideEffect::LoadContacts]);
    }

    #[test]
    fn navigating_after_back_drops_forward_entries() {
        let mut router = Router::new(Page::Home);
        router.activate(Page::Tracker);
        router.activate(Page::Sops);
        router.back();
        router.activate(Page::PoTools);
        assert_eq!(router.history_len(), 3);
        assert!(router.forward().is_none());
        assert_eq!(router.back().unwrap().page, Page::Tracker);
    }

    #[test]
    fn footer_and_effects() {
        let mut router = Router::default();
        assert_eq!(router.footer, FooterSize::Full);
        let activation = router.activate(Page::Marketplaces);
        assert_eq!(activation.footer, FooterSize::Slim);
        assert_eq!(activation.effects, vec![SideEffect::EnsureLinkGrid(Page::Marketplaces)]);
        assert_eq!(router.activate(Page::TopPerformers).effects, vec![SideEffect::LoadPerformers]);
        assert!(router.back().unwrap().effects.len() == 1);
        assert!(router.activate(Page::Home).effects.is_empty());
        assert!(router.back().is_some());
    }
}
