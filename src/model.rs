use arboard::Clipboard;
use ratatui::crossterm::event::{KeyCode, KeyEvent};
use std::collections::BTreeMap;
use std::io;
use std::sync::mpsc::{Receiver, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::contacts::ContactsView;
use crate::domain::{CMDMode, HELP_TEXT, Message, PortalConfig, PortalError};
use crate::inputter::{InputResult, Inputter};
use crate::links::{LinkBook, LinkGrid};
use crate::loader::sheet_url;
use crate::performers::PerformersView;
use crate::router::{ALL_PAGES, Activation, FooterSize, Page, Router, SideEffect};
use crate::search::{SearchEntry, SearchIndex};
use crate::theme::{PreferenceStore, Theme};
use crate::worker::{Job, JobResult};

/// Tiles per row on the home page.
pub const HOME_COLUMNS: usize = 3;

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    PAGE,
    POPUP,
    CMDINPUT,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Popup {
    Help,
    Spotlight,
}

/// State of a page whose data comes from the sheet endpoint.
#[derive(Debug)]
pub enum LoadState<T> {
    Idle,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            LoadState::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match self {
            LoadState::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

type Launcher = fn(&str) -> io::Result<()>;

fn open_url(url: &str) -> io::Result<()> {
    open::that_detached(url)
}

pub struct Model {
    config: PortalConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    router: Router,
    theme: Theme,
    prefs: PreferenceStore,
    links: LinkBook,
    grids: BTreeMap<Page, LinkGrid>,
    search_index: SearchIndex,
    search_results: Vec<SearchEntry>,
    search_selected: usize,
    search_dirty: bool,
    last_input_time: Instant,
    contacts: LoadState<ContactsView>,
    kept_filters: Option<(String, String)>,
    contacts_pending: usize,
    filter_before: String,
    performers: LoadState<PerformersView>,
    popup: Option<Popup>,
    home_selected: usize,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
    last_status_message_update: Instant,
    clipboard: Option<Clipboard>,
    launcher: Launcher,
    job_tx: Sender<Job>,
    result_rx: Receiver<JobResult>,
    ui_size: (usize, usize),
}

impl Model {
    pub fn init(
        config: &PortalConfig,
        initial: Page,
        prefs: PreferenceStore,
        theme_hint: Option<&str>,
        job_tx: Sender<Job>,
        result_rx: Receiver<JobResult>,
    ) -> Self {
        let theme = prefs.initial_theme(theme_hint);
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::PAGE,
            previous_modus: Modus::PAGE,
            router: Router::new(initial),
            theme,
            prefs,
            links: LinkBook::from_config(&config.links),
            grids: BTreeMap::new(),
            search_index: SearchIndex::new(config.search_limit),
            search_results: Vec::new(),
            search_selected: 0,
            search_dirty: false,
            last_input_time: Instant::now(),
            contacts: LoadState::Idle,
            kept_filters: None,
            contacts_pending: 0,
            filter_before: String::new(),
            performers: LoadState::Idle,
            popup: None,
            home_selected: 0,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: "Started portal!".to_string(),
            last_status_message_update: Instant::now(),
            clipboard: Clipboard::new().ok(),
            launcher: open_url,
            job_tx,
            result_rx,
            ui_size: (0, 0),
        };
        info!("Starting on {} with {} theme", initial.id(), theme.as_str());

        let activation = model.router.refresh();
        model.handle_activation(activation);

        // The spotlight only greets on the home page, elsewhere performers are preloaded quietly.
        if initial == Page::Home {
            model.open_popup(Popup::Spotlight);
        }
        if initial != Page::TopPerformers {
            model.request_performers();
        }
        model
    }

    #[cfg(test)]
    pub fn set_launcher(&mut self, launcher: Launcher) {
        self.launcher = launcher;
    }

    // -------------------- Accessors used by the ui ---------------------- //

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn active_page(&self) -> Page {
        self.router.active()
    }

    pub fn footer(&self) -> FooterSize {
        self.router.footer
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn contacts(&self) -> &LoadState<ContactsView> {
        &self.contacts
    }

    pub fn performers(&self) -> &LoadState<PerformersView> {
        &self.performers
    }

    pub fn grid(&self, page: Page) -> Option<&LinkGrid> {
        self.grids.get(&page)
    }

    pub fn home_tiles() -> &'static [Page] {
        &ALL_PAGES[1..]
    }

    pub fn home_selected(&self) -> usize {
        self.home_selected
    }

    pub fn popup(&self) -> Option<Popup> {
        self.popup
    }

    pub fn help_text(&self) -> &'static str {
        HELP_TEXT
    }

    pub fn cmd_input(&self) -> (&InputResult, Option<CMDMode>, bool) {
        (&self.last_input, self.cmd_mode, self.active_cmdinput)
    }

    pub fn search_results(&self) -> (&[SearchEntry], usize) {
        (&self.search_results, self.search_selected)
    }

    pub fn status_message(&self) -> (&str, Instant) {
        (&self.status_message, self.last_status_message_update)
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    // -------------------- Update loop ---------------------- //

    pub fn update(&mut self, message: Option<Message>) -> Result<(), PortalError> {
        self.poll_results();
        self.maybe_run_search();

        if let Some(msg) = message {
            trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
            match self.modus {
                Modus::PAGE => match msg {
                    Message::Quit => self.quit(),
                    Message::Home => self.navigate(Page::Home),
                    Message::Back => {
                        if let Some(activation) = self.router.back() {
                            self.handle_activation(activation);
                        }
                    }
                    Message::Forward => {
                        if let Some(activation) = self.router.forward() {
                            self.handle_activation(activation);
                        }
                    }
                    Message::ToggleTheme => self.toggle_theme(),
                    Message::Help => self.open_popup(Popup::Help),
                    Message::Search => self.enter_cmd_mode(CMDMode::GlobalSearch),
                    Message::FilterText => {
                        if self.active_page() == Page::SupplierContacts && self.contacts.ready().is_some() {
                            self.enter_cmd_mode(CMDMode::ContactsFilter);
                        }
                    }
                    Message::NextSupplier => self.cycle_supplier(true),
                    Message::PrevSupplier => self.cycle_supplier(false),
                    Message::Reload => self.navigate(self.active_page()),
                    Message::MoveUp => self.move_selection(0, -1),
                    Message::MoveDown => self.move_selection(0, 1),
                    Message::MoveLeft => self.move_selection(-1, 0),
                    Message::MoveRight => self.move_selection(1, 0),
                    Message::Enter => self.enter(),
                    Message::OpenSelection => self.open_selection(),
                    Message::CopySelection => self.copy_selection(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::Exit | Message::RawKey(_) => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit | Message::Enter => self.close_popup(),
                    Message::Help => self.close_popup(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::CMDINPUT => match msg {
                    Message::Quit => self.quit(),
                    Message::RawKey(key) => self.raw_input(key),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
            }
        }
        Ok(())
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.ui_size.0, width, self.ui_size.1, height
        );
        self.ui_size = (width, height);
    }

    // -------------------- Navigation ---------------------- //

    pub fn navigate(&mut self, page: Page) {
        let activation = self.router.activate(page);
        self.handle_activation(activation);
    }

    fn handle_activation(&mut self, activation: Activation) {
        debug!(
            "Activated {} (pushed: {}, footer: {:?}, history: {})",
            activation.page.id(),
            activation.pushed,
            activation.footer,
            self.router.history_len()
        );
        // Every activation starts the page from the top
        match activation.page {
            Page::Home => self.home_selected = 0,
            Page::TopPerformers => {
                if let Some(view) = self.performers.ready_mut() {
                    view.selected = 0;
                }
            }
            page => {
                if let Some(grid) = self.grids.get_mut(&page) {
                    grid.selected = 0;
                }
            }
        }
        for effect in activation.effects {
            match effect {
                SideEffect::LoadContacts => self.request_contacts(),
                SideEffect::LoadPerformers => self.request_performers(),
                SideEffect::EnsureLinkGrid(page) => {
                    let items = self.links.items(page).unwrap_or(&[]);
                    if self.grids.entry(page).or_default().ensure(items) {
                        debug!("Rendered link grid for {}", page.id());
                    }
                }
            }
        }
    }

    fn send_job(&mut self, job: Job) {
        if self.job_tx.send(job).is_err() {
            error!("Worker is gone, dropping job");
            self.set_status_message("Background loader stopped");
        }
    }

    fn request_contacts(&mut self) {
        // A reload keeps the filters that were active
        if let Some(view) = self.contacts.ready() {
            self.kept_filters = Some((
                view.supplier_filter().unwrap_or_default().to_string(),
                view.text_filter().to_string(),
            ));
        }
        self.contacts = LoadState::Loading;
        self.contacts_pending += 1;
        self.set_status_message("Loading\u{2026}");
        self.send_job(Job::LoadContacts(self.config.contacts_sheet.clone()));
    }

    fn request_performers(&mut self) {
        self.performers = LoadState::Loading;
        self.send_job(Job::LoadPerformers(self.config.performers_sheet.clone()));
    }

    // -------------------- Worker results ---------------------- //

    fn poll_results(&mut self) {
        while let Ok(result) = self.result_rx.try_recv() {
            self.handle_result(result);
        }
    }

    fn handle_result(&mut self, result: JobResult) {
        match result {
            JobResult::Contacts(Ok(table)) => {
                self.contacts_pending = self.contacts_pending.saturating_sub(1);
                let mut view = ContactsView::new(table);
                if let Some((supplier, text)) = &self.kept_filters {
                    view.set_supplier(supplier);
                    view.set_text_filter(text);
                }
                if self.contacts_pending == 0 {
                    self.kept_filters = None;
                }
                // Text typed into an open filter line wins over the kept one
                if self.active_cmdinput && self.cmd_mode == Some(CMDMode::ContactsFilter) {
                    view.set_text_filter(&self.last_input.input);
                }
                self.set_status_message(view.status_line());
                self.contacts = LoadState::Ready(view);
            }
            JobResult::Contacts(Err(e)) => {
                self.contacts_pending = self.contacts_pending.saturating_sub(1);
                if self.contacts_pending == 0 {
                    self.kept_filters = None;
                }
                error!("Loading contacts failed: {e}");
                self.set_status_message("Failed to load contacts");
                self.contacts = LoadState::Failed(format!(
                    "Error: {e} - confirm the Web App is deployed (Anyone with the link) and the tab is exactly \u{201c}{}\u{201d}.",
                    self.config.contacts_sheet
                ));
            }
            JobResult::Performers(Ok(table)) => {
                let view = PerformersView::new(&table, &self.config.photo_bases);
                info!("Loaded {} top performers", view.performers.len());
                for (performer, url) in view.pending_photos() {
                    self.send_job(Job::LoadPhoto { performer, url });
                }
                self.performers = LoadState::Ready(view);
            }
            JobResult::Performers(Err(e)) => {
                error!("Top Performers load error: {e}");
                self.performers = LoadState::Failed(format!(
                    "Top Performers error: {e}. Test JSON: {}",
                    sheet_url(&self.config.endpoint, &self.config.performers_sheet)
                ));
            }
            JobResult::PhotoLoaded { performer, url } => {
                if let Some(view) = self.performers.ready_mut()
                    && let Some(p) = view.performers.get_mut(performer)
                {
                    p.photo.on_loaded(&url);
                }
            }
            JobResult::PhotoFailed { performer, url } => {
                let mut next = None;
                if let Some(view) = self.performers.ready_mut()
                    && let Some(p) = view.performers.get_mut(performer)
                {
                    let before = p.photo.current();
                    let after = p.photo.on_failed(&url);
                    if after != before {
                        next = p.photo.pending_url();
                    }
                }
                if let Some(url) = next {
                    self.send_job(Job::LoadPhoto { performer, url });
                }
            }
        }
    }

    // -------------------- Popups ---------------------- //

    fn open_popup(&mut self, popup: Popup) {
        if self.modus != Modus::POPUP {
            self.previous_modus = self.modus;
        }
        self.modus = Modus::POPUP;
        self.popup = Some(popup);
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        self.popup = None;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
    }

    fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        self.prefs.save_theme(self.theme);
        self.set_status_message(format!("{} theme", self.theme.as_str()));
    }

    // -------------------- Command input ---------------------- //

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {mode:?} ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;
        self.input.clear();

        match mode {
            CMDMode::GlobalSearch => {
                self.search_results.clear();
                self.search_selected = 0;
                self.search_dirty = false;
            }
            CMDMode::ContactsFilter => {
                self.filter_before = self
                    .contacts
                    .ready()
                    .map(|c| c.text_filter().to_string())
                    .unwrap_or_default();
                self.input.set(&self.filter_before);
            }
        }
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if !self.active_cmdinput {
            return;
        }
        if self.cmd_mode == Some(CMDMode::GlobalSearch) {
            match key.code {
                KeyCode::Down => {
                    if self.search_selected + 1 < self.search_results.len() {
                        self.search_selected += 1;
                    }
                    return;
                }
                KeyCode::Up => {
                    self.search_selected = self.search_selected.saturating_sub(1);
                    return;
                }
                _ => {}
            }
        }

        self.last_input = self.input.read(key);
        if self.last_input.changed {
            match self.cmd_mode {
                Some(CMDMode::GlobalSearch) => {
                    self.search_dirty = true;
                    self.last_input_time = Instant::now();
                }
                Some(CMDMode::ContactsFilter) => {
                    let text = self.last_input.input.clone();
                    if let Some(view) = self.contacts.ready_mut() {
                        view.set_text_filter(&text);
                    }
                }
                None => {}
            }
        }
        if self.last_input.finished {
            self.handle_cmd_input();
        }
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {}", self.last_input.input);
        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        let canceled = self.last_input.canceled;
        match self.cmd_mode.take() {
            Some(CMDMode::GlobalSearch) => {
                if !canceled {
                    if self.search_dirty || self.search_results.is_empty() {
                        self.run_search();
                    }
                    match self.search_results.get(self.search_selected).cloned() {
                        Some(entry) => self.act_on_result(&entry),
                        None => {
                            let query = self.last_input.input.trim().to_string();
                            if !query.is_empty() {
                                self.set_status_message(format!("No matches for \"{query}\""));
                            }
                        }
                    }
                }
                self.search_results.clear();
                self.search_dirty = false;
            }
            Some(CMDMode::ContactsFilter) => {
                if canceled {
                    let previous = self.filter_before.clone();
                    if let Some(view) = self.contacts.ready_mut() {
                        view.set_text_filter(&previous);
                    }
                }
            }
            None => info!("Cmd mode is none!"),
        }
    }

    fn maybe_run_search(&mut self) {
        if self.search_dirty
            && self.last_input_time.elapsed() > Duration::from_millis(self.config.search_debounce_ms)
        {
            self.run_search();
        }
    }

    fn run_search(&mut self) {
        let start_time = Instant::now();
        if !self.search_index.is_built() {
            debug!("Building search index");
        }
        let links = &self.links;
        let supplier = |page: Page| links.search_items(page);
        self.search_results = self.search_index.search(&self.last_input.input, &supplier);
        self.search_selected = 0;
        self.search_dirty = false;
        trace!(
            "Search for \"{}\" found {} results in {}µs",
            self.last_input.input,
            self.search_results.len(),
            start_time.elapsed().as_micros()
        );
    }

    /// Show the result's page and open its link, if it has one.
    pub fn act_on_result(&mut self, entry: &SearchEntry) {
        self.navigate(entry.page);
        if let Some(url) = &entry.url {
            self.open_external(url);
        }
    }

    fn open_external(&mut self, url: &str) {
        match (self.launcher)(url) {
            Ok(()) => {
                info!("Opened {url}");
                self.set_status_message(format!("Opened {url}"));
            }
            Err(e) => {
                warn!("Could not open {url}: {e}");
                let copied = self
                    .clipboard
                    .as_mut()
                    .map(|c| c.set_text(url.to_string()).is_ok())
                    .unwrap_or(false);
                if copied {
                    self.set_status_message(format!("Could not open browser, copied {url}"));
                } else {
                    self.set_status_message(format!("Open manually: {url}"));
                }
            }
        }
    }

    // -------------------- Page interaction ---------------------- //

    fn cycle_supplier(&mut self, forward: bool) {
        if self.active_page() != Page::SupplierContacts {
            return;
        }
        if let Some(view) = self.contacts.ready_mut() {
            view.cycle_supplier(forward);
            let label = view.supplier_filter().unwrap_or("All").to_string();
            let rows = view.rows().len();
            self.set_status_message(format!("Supplier: {label} ({rows} rows)"));
        }
    }

    fn move_selection(&mut self, dx: i32, dy: i32) {
        let page = self.active_page();
        match page {
            Page::Home => {
                let n = Self::home_tiles().len() as i32;
                let step = dx + dy * HOME_COLUMNS as i32;
                let next = self.home_selected as i32 + step;
                if (0..n).contains(&next) {
                    self.home_selected = next as usize;
                }
            }
            Page::SupplierContacts => {
                if let Some(view) = self.contacts.ready_mut() {
                    if dy > 0 {
                        view.select_next()
                    } else if dy < 0 {
                        view.select_prev()
                    }
                }
            }
            Page::TopPerformers => {
                if let Some(view) = self.performers.ready_mut() {
                    if dy > 0 || dx > 0 {
                        view.select_next()
                    } else {
                        view.select_prev()
                    }
                }
            }
            _ => {
                if let Some(grid) = self.grids.get_mut(&page) {
                    if dy > 0 || dx > 0 {
                        grid.select_next()
                    } else {
                        grid.select_prev()
                    }
                }
            }
        }
    }

    fn enter(&mut self) {
        match self.active_page() {
            Page::Home => {
                if let Some(&page) = Self::home_tiles().get(self.home_selected) {
                    self.navigate(page);
                }
            }
            _ => self.open_selection(),
        }
    }

    fn selected_link(&self) -> Option<String> {
        let page = self.active_page();
        match page {
            Page::SupplierContacts => self
                .contacts
                .ready()
                .and_then(|v| v.selected_row())
                .and_then(|r| r.email.href()),
            Page::TopPerformers => self
                .performers
                .ready()
                .and_then(|v| v.performers.get(v.selected))
                .map(|p| p.photo.src()),
            _ => self
                .grids
                .get(&page)
                .and_then(|g| g.selected_card())
                .map(|c| c.url.clone())
                .filter(|u| !u.is_empty()),
        }
    }

    fn open_selection(&mut self) {
        if let Some(url) = self.selected_link() {
            self.open_external(&url);
        }
    }

    fn copy_selection(&mut self) {
        let Some(link) = self.selected_link() else {
            return;
        };
        let text = link.trim_start_matches("mailto:").to_string();
        let copied = match self.clipboard.as_mut() {
            Some(clipboard) => match clipboard.set_text(text.clone()) {
                Ok(_) => true,
                Err(e) => {
                    trace!("Error copying to clipboard: {:?}", e);
                    false
                }
            },
            None => false,
        };
        if copied {
            self.set_status_message(format!("Copied: {text}"));
        } else {
            self.set_status_message("Clipboard not available");
        }
    }
}
