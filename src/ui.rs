use chrono::Local;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap},
};

use crate::contacts::{self, CONTACT_HEADERS};
use crate::domain::CMDMode;
use crate::links::LINK_PAGES;
use crate::model::{HOME_COLUMNS, LoadState, Model, Popup};
use crate::performers::spotlight_title;
use crate::router::Page;
use crate::theme::Palette;

pub const HEADER_HEIGHT: u16 = 3;
pub const CMDLINE_HEIGHT: u16 = 3;
const TILE_HEIGHT: u16 = 4;
const SEARCH_POPUP_HEIGHT: u16 = 12;

#[derive(Debug, Default)]
pub struct PortalUI {}

impl PortalUI {
    pub fn new() -> Self {
        Self {}
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let palette = model.theme().palette();
        frame.render_widget(
            Block::default().style(Style::default().bg(palette.bg).fg(palette.ink)),
            frame.area(),
        );

        let (_, cmd_mode, cmd_active) = model.cmd_input();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(5),
                Constraint::Length(if cmd_active { CMDLINE_HEIGHT } else { 0 }),
                Constraint::Length(model.footer().rows()),
            ])
            .split(frame.area());

        self.render_header(frame, model, &palette, chunks[0]);
        self.render_page(frame, model, &palette, chunks[1]);
        if cmd_active {
            self.render_cmdline(frame, model, &palette, chunks[2]);
            if cmd_mode == Some(CMDMode::GlobalSearch) {
                self.render_search_results(frame, model, &palette, chunks[1]);
            }
        }
        self.render_footer(frame, model, &palette, chunks[3]);

        match model.popup() {
            Some(Popup::Help) => self.render_help(frame, model, &palette),
            Some(Popup::Spotlight) => self.render_spotlight(frame, model, &palette),
            None => {}
        }
    }

    fn render_header(&self, frame: &mut Frame, model: &Model, palette: &Palette, area: Rect) {
        let page = model.active_page();
        let title = Line::from(vec![
            Span::styled(" Portal ", Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)),
            Span::raw(format!("\u{203a} {} ", page.title())),
        ]);
        let right = Line::from(vec![
            Span::styled("/ search  ", Style::default().fg(palette.ink_dim)),
            Span::raw(format!("{} ", model.theme().icon())),
        ])
        .right_aligned();

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent))
            .title(title)
            .title(right);
        let location = Paragraph::new(Span::styled(
            model.router().location().fragment(),
            Style::default().fg(palette.ink_dim),
        ))
        .block(block);
        frame.render_widget(location, area);
    }

    fn render_page(&self, frame: &mut Frame, model: &Model, palette: &Palette, area: Rect) {
        let page = model.active_page();
        match page {
            Page::Home => self.render_home(frame, model, palette, area),
            Page::SupplierContacts => self.render_contacts(frame, model, palette, area),
            Page::TopPerformers => self.render_performers(frame, model, palette, area),
            p if LINK_PAGES.contains(&p) => self.render_link_grid(frame, model, palette, area),
            p => {
                let text = Text::from(vec![
                    Line::from(Span::styled(p.title(), Style::default().add_modifier(Modifier::BOLD))),
                    Line::from(Span::styled("Open section", Style::default().fg(palette.ink_dim))),
                ]);
                frame.render_widget(Paragraph::new(text).block(page_block(p, palette)), area);
            }
        }
    }

    fn render_home(&self, frame: &mut Frame, model: &Model, palette: &Palette, area: Rect) {
        let tiles = Model::home_tiles();
        let rows = tiles.len().div_ceil(HOME_COLUMNS);
        let row_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Length(TILE_HEIGHT); rows])
            .split(area);

        for (row_idx, row_area) in row_areas.iter().enumerate() {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Ratio(1, HOME_COLUMNS as u32); HOME_COLUMNS])
                .split(*row_area);
            for (col_idx, col_area) in cols.iter().enumerate() {
                let idx = row_idx * HOME_COLUMNS + col_idx;
                let Some(page) = tiles.get(idx) else {
                    continue;
                };
                let selected = idx == model.home_selected();
                let border = if selected { palette.accent } else { palette.ink_dim };
                let mut style = Style::default();
                if selected {
                    style = style.bg(palette.highlight).add_modifier(Modifier::BOLD);
                }
                let tile = Paragraph::new(Line::from(page.title()).centered())
                    .style(style)
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .border_style(Style::default().fg(border)),
                    );
                frame.render_widget(tile, *col_area);
            }
        }
    }

    fn render_contacts(&self, frame: &mut Frame, model: &Model, palette: &Palette, area: Rect) {
        let block = page_block(Page::SupplierContacts, palette);
        let view = match model.contacts() {
            LoadState::Ready(view) => view,
            state => {
                frame.render_widget(state_paragraph(state, palette).block(block), area);
                return;
            }
        };

        let inner = block.inner(area);
        frame.render_widget(block, area);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(inner);

        let supplier = view.supplier_filter().unwrap_or("All");
        let filter_line = Line::from(vec![
            Span::styled("Supplier: ", Style::default().fg(palette.ink_dim)),
            Span::styled(format!("[{supplier} \u{25be}]"), Style::default().fg(palette.accent)),
            Span::styled(
                format!("  {} rows, {} suppliers", view.rows().len(), view.supplier_options().len() - 1),
                Style::default().fg(palette.ink_dim),
            ),
            Span::styled("   Filter: ", Style::default().fg(palette.ink_dim)),
            Span::raw(view.text_filter().to_string()),
        ]);
        frame.render_widget(Paragraph::new(filter_line), chunks[0]);

        let header = Row::new(CONTACT_HEADERS.iter().map(|h| Cell::from(*h)))
            .style(Style::default().add_modifier(Modifier::BOLD).fg(palette.accent));
        let rows = view.rows().iter().map(|r| {
            Row::new(r.cells().into_iter().map(|c| match c {
                contacts::Cell::Mail(s) => Cell::from(Span::styled(
                    s.clone(),
                    Style::default().fg(palette.accent).add_modifier(Modifier::UNDERLINED),
                )),
                contacts::Cell::Text(_) => Cell::from(c.text().to_string()),
            }))
        });
        let table = Table::new(
            rows,
            [
                Constraint::Percentage(20),
                Constraint::Percentage(20),
                Constraint::Percentage(25),
                Constraint::Percentage(15),
                Constraint::Percentage(20),
            ],
        )
        .header(header)
        .row_highlight_style(Style::default().bg(palette.highlight));

        let mut state = TableState::default().with_selected(Some(view.selected));
        frame.render_stateful_widget(table, chunks[1], &mut state);
    }

    fn render_performers(&self, frame: &mut Frame, model: &Model, palette: &Palette, area: Rect) {
        let block = page_block(Page::TopPerformers, palette);
        let view = match model.performers() {
            LoadState::Ready(view) => view,
            state => {
                frame.render_widget(state_paragraph(state, palette).block(block), area);
                return;
            }
        };

        let mut items: Vec<ListItem> = Vec::new();
        if let Some(note) = &view.note {
            items.push(ListItem::new(Span::styled(note.clone(), Style::default().fg(palette.ink_dim))));
        }
        for p in view.performers.iter() {
            let photo = if p.photo.is_placeholder() {
                Span::styled("( No photo )", Style::default().fg(palette.ink_dim))
            } else if p.photo.is_loaded() {
                Span::styled(p.photo.src(), Style::default().fg(palette.accent))
            } else {
                Span::styled("loading photo\u{2026}", Style::default().fg(palette.ink_dim))
            };
            items.push(ListItem::new(Line::from(vec![
                Span::styled(format!("{:<28}", p.name), Style::default().add_modifier(Modifier::BOLD)),
                photo,
            ])));
        }

        let offset = usize::from(view.note.is_some());
        let mut state = ListState::default();
        if !view.performers.is_empty() {
            state.select(Some(view.selected + offset));
        }
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(palette.highlight));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn render_link_grid(&self, frame: &mut Frame, model: &Model, palette: &Palette, area: Rect) {
        let page = model.active_page();
        let block = page_block(page, palette);
        let Some(grid) = model.grid(page).filter(|g| g.is_rendered()) else {
            frame.render_widget(block, area);
            return;
        };
        if let Some(note) = grid.note() {
            let text = Paragraph::new(Span::styled(note, Style::default().fg(palette.ink_dim))).block(block);
            frame.render_widget(text, area);
            return;
        }

        let items: Vec<ListItem> = grid
            .cards
            .iter()
            .map(|card| {
                let mut lines = vec![Line::from(Span::styled(
                    card.title().to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ))];
                if !card.note.is_empty() {
                    lines.push(Line::from(Span::styled(card.note.clone(), Style::default().fg(palette.ink_dim))));
                }
                if !card.url.is_empty() {
                    let mut style = Style::default().fg(palette.accent);
                    if card.is_web() {
                        style = style.add_modifier(Modifier::UNDERLINED);
                    }
                    lines.push(Line::from(Span::styled(card.url.clone(), style)));
                }
                ListItem::new(lines)
            })
            .collect();
        let mut state = ListState::default().with_selected(Some(grid.selected));
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(palette.highlight))
            .highlight_symbol("\u{25b8} ");
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn render_cmdline(&self, frame: &mut Frame, model: &Model, palette: &Palette, area: Rect) {
        let (input, mode, _) = model.cmd_input();
        let title = match mode {
            Some(CMDMode::GlobalSearch) => " Search ",
            Some(CMDMode::ContactsFilter) => " Filter contacts ",
            None => "",
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent))
            .title(title);
        let inner = block.inner(area);
        frame.render_widget(Paragraph::new(input.input.as_str()).block(block), area);
        let cursor_x = inner.x + (input.curser_pos as u16).min(inner.width.saturating_sub(1));
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn render_search_results(&self, frame: &mut Frame, model: &Model, palette: &Palette, area: Rect) {
        let (results, selected) = model.search_results();
        if results.is_empty() {
            return;
        }
        let height = SEARCH_POPUP_HEIGHT.min(area.height);
        let popup = Rect::new(area.x + 2, area.y, area.width.saturating_sub(4), height);

        let items: Vec<ListItem> = results
            .iter()
            .map(|e| {
                ListItem::new(Line::from(vec![
                    Span::styled(e.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::styled(format!("  {}", e.subtitle), Style::default().fg(palette.ink_dim)),
                ]))
            })
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.accent))
                    .title(format!(" Results [{}] ", results.len())),
            )
            .style(Style::default().bg(palette.bg))
            .highlight_style(Style::default().bg(palette.highlight));
        let mut state = ListState::default().with_selected(Some(selected));
        frame.render_widget(Clear, popup);
        frame.render_stateful_widget(list, popup, &mut state);
    }

    fn render_footer(&self, frame: &mut Frame, model: &Model, palette: &Palette, area: Rect) {
        let (message, _) = model.status_message();
        let mut lines = vec![Line::from(Span::styled(
            format!(" {message}"),
            Style::default().fg(palette.ink_dim),
        ))];
        if area.height > 1 {
            lines.push(Line::from(Span::styled(
                " ? help \u{2502} / search \u{2502} t theme \u{2502} q quit",
                Style::default().fg(palette.ink_dim),
            )));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_help(&self, frame: &mut Frame, model: &Model, palette: &Palette) {
        let area = centered_rect(60, 70, frame.area());
        let help = Paragraph::new(model.help_text())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.accent))
                    .title(" Help "),
            )
            .style(Style::default().bg(palette.bg).fg(palette.ink));
        frame.render_widget(Clear, area);
        frame.render_widget(help, area);
    }

    fn render_spotlight(&self, frame: &mut Frame, model: &Model, palette: &Palette) {
        let area = centered_rect(50, 60, frame.area());
        let loaded = matches!(model.performers(), LoadState::Ready(_));
        let title = format!(" {} ", spotlight_title(Local::now(), loaded));

        let lines: Vec<Line> = match model.performers() {
            LoadState::Ready(view) if !view.performers.is_empty() => view
                .performers
                .iter()
                .map(|p| Line::from(format!("\u{2605} {}", p.name)))
                .collect(),
            LoadState::Ready(view) => vec![Line::from(view.note.clone().unwrap_or_default())],
            LoadState::Failed(msg) => vec![Line::from(Span::styled(msg.clone(), Style::default().fg(palette.error)))],
            LoadState::Idle | LoadState::Loading => {
                let skeleton = Span::styled("\u{2591}".repeat(24), Style::default().fg(palette.ink_dim));
                vec![Line::from(skeleton); 3]
            }
        };
        let popup = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.accent))
                    .title(title)
                    .title_bottom(Line::from(" Esc to close ").centered()),
            )
            .style(Style::default().bg(palette.bg).fg(palette.ink));
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }
}

fn page_block(page: Page, palette: &Palette) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.ink_dim))
        .title(format!(" {} ", page.title()))
}

fn state_paragraph<T>(state: &LoadState<T>, palette: &Palette) -> Paragraph<'static> {
    match state {
        LoadState::Failed(msg) => Paragraph::new(Span::styled(msg.clone(), Style::default().fg(palette.error)))
            .wrap(Wrap { trim: true }),
        state if state.is_loading() => {
            Paragraph::new(Span::styled("Loading\u{2026}", Style::default().fg(palette.ink_dim)))
        }
        _ => Paragraph::new(""),
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
