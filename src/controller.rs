use std::time::Duration;
use tracing::trace;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crate::domain::{PortalConfig, PortalError, Message};
use crate::model::Model;

pub struct Controller {
    event_poll_time: u64
}

impl Controller {
    pub fn new(cfg: &PortalConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, PortalError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    return Ok(self.handle_key(key, model.raw_keyevents()));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent, raw: bool) -> Option<Message> {
        // The line editor gets everything but Ctrl-C
        if raw {
            let message = match (key.code, key.modifiers) {
                (KeyCode::Char('c'), KeyModifiers::CONTROL) => Message::Quit,
                _ => Message::RawKey(key),
            };
            return Some(message);
        }

        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Message::Quit),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::Left => Some(Message::MoveLeft),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::MoveRight),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Esc => Some(Message::Exit),
            KeyCode::Char('h') => Some(Message::Home),
            KeyCode::Char('[') | KeyCode::Backspace => Some(Message::Back),
            KeyCode::Char(']') => Some(Message::Forward),
            KeyCode::Char('t') => Some(Message::ToggleTheme),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char('i') => Some(Message::FilterText),
            KeyCode::Char('s') => Some(Message::NextSupplier),
            KeyCode::Char('S') => Some(Message::PrevSupplier),
            KeyCode::Char('r') => Some(Message::Reload),
            KeyCode::Char('y') => Some(Message::CopySelection),
            KeyCode::Char('o') => Some(Message::OpenSelection),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
