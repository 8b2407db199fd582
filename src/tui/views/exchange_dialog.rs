//! Exchange dialog: pick exactly one of your books to offer for the target.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::super::app::centered_rect;
use super::super::theme;
use crate::core::exchange::{DialogMessage, ExchangeDialog};
use crate::core::models::BookId;

/// What the catalog should do after a dialog key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    Consumed,
    /// Radio-select this book.
    Select(BookId),
    Submit,
    Cancel,
}

/// Dialog state machine plus the list cursor.
#[derive(Debug, Default)]
pub struct ExchangeDialogView {
    pub dialog: ExchangeDialog,
    cursor: usize,
}

impl ExchangeDialogView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
    }

    pub fn handle_input(&mut self, event: &Event) -> DialogOutcome {
        let Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return DialogOutcome::Consumed;
        };

        let count = self.dialog.offerable().len();
        match code {
            KeyCode::Esc | KeyCode::Char('q') => DialogOutcome::Cancel,
            KeyCode::Char('j') | KeyCode::Down => {
                if self.cursor + 1 < count {
                    self.cursor += 1;
                }
                DialogOutcome::Consumed
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.cursor = self.cursor.saturating_sub(1);
                DialogOutcome::Consumed
            }
            KeyCode::Char(' ') => match self.dialog.offerable().get(self.cursor) {
                Some(book) => DialogOutcome::Select(book.id.clone()),
                None => DialogOutcome::Consumed,
            },
            KeyCode::Enter if self.dialog.offered().is_some() => DialogOutcome::Submit,
            // Enter without a choice selects the highlighted book first.
            KeyCode::Enter => match self.dialog.offerable().get(self.cursor) {
                Some(book) => DialogOutcome::Select(book.id.clone()),
                None => DialogOutcome::Consumed,
            },
            _ => DialogOutcome::Consumed,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let modal = centered_rect(60, 60, area);
        let block = theme::block_modal("Request Exchange");
        let inner = block.inner(modal);
        frame.render_widget(Clear, modal);
        frame.render_widget(block, modal);

        let rows = Layout::vertical([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(inner);

        let body = match self.dialog.message() {
            DialogMessage::Closed => return,
            DialogMessage::Loading => Some(Line::from(Span::styled(
                " Loading your books...",
                theme::muted(),
            ))),
            DialogMessage::NothingToOffer => Some(Line::from(Span::styled(
                " You have no books to offer. Add one under Your Books first.",
                theme::muted(),
            ))),
            DialogMessage::LoadFailed(reason) => Some(Line::from(Span::styled(
                format!(" Could not load your books: {reason}"),
                theme::error_text(),
            ))),
            DialogMessage::Choose { .. } => None,
        };

        if let Some(target) = self.dialog.target() {
            let header = Line::from(vec![
                Span::raw(" Select a book to offer for "),
                Span::styled(target.book.title.clone(), theme::title()),
                Span::styled(format!(" by {}", target.book.author), theme::muted()),
            ]);
            frame.render_widget(Paragraph::new(header), rows[0]);
        }

        match body {
            Some(line) => frame.render_widget(Paragraph::new(line), rows[1]),
            None => {
                let offered = self.dialog.offered();
                let items: Vec<ListItem> = self
                    .dialog
                    .offerable()
                    .iter()
                    .map(|book| {
                        let mark = if offered == Some(&book.id) { "(•)" } else { "( )" };
                        ListItem::new(Line::from(vec![
                            Span::styled(format!(" {mark} "), theme::heading()),
                            Span::raw(book.title.clone()),
                            Span::styled(format!(" by {}", book.author), theme::muted()),
                        ]))
                    })
                    .collect();
                let mut state = ListState::default().with_selected(Some(self.cursor));
                frame.render_stateful_widget(
                    List::new(items).highlight_style(theme::selected_row()),
                    rows[1],
                    &mut state,
                );
            }
        }

        let hint = if self.dialog.is_submitting() {
            Line::from(Span::styled(" Sending request...", theme::muted()))
        } else {
            Line::from(vec![
                Span::styled(" j/k", theme::key_hint()),
                Span::raw(":move "),
                Span::styled("Space", theme::key_hint()),
                Span::raw(":choose "),
                Span::styled("Enter", theme::key_hint()),
                Span::raw(":request "),
                Span::styled("Esc", theme::key_hint()),
                Span::raw(":cancel"),
            ])
        };
        frame.render_widget(Paragraph::new(hint), rows[2]);
    }
}
