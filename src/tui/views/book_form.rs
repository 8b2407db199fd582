//! Add/edit book modal.
//!
//! Title and author are free text; genre cycles through the known genres
//! (plus the book's own genre when editing one the form does not know).

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use super::super::app::centered_rect;
use super::super::theme;
use super::super::widgets::input_buffer::InputBuffer;
use crate::core::models::{Book, Genre};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Author,
    Genre,
}

impl Field {
    fn next(self) -> Self {
        match self {
            Self::Title => Self::Author,
            Self::Author => Self::Genre,
            Self::Genre => Self::Title,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Title => Self::Genre,
            Self::Author => Self::Title,
            Self::Genre => Self::Author,
        }
    }
}

/// What the owning view should do after a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormOutcome {
    Consumed,
    Submit,
    Cancel,
}

pub struct BookForm {
    /// The book being edited; `None` when adding.
    editing: Option<Book>,
    title: InputBuffer,
    author: InputBuffer,
    genres: Vec<Genre>,
    genre_idx: usize,
    field: Field,
    submitting: bool,
    error: Option<String>,
}

impl BookForm {
    pub fn add() -> Self {
        Self {
            editing: None,
            title: InputBuffer::new(),
            author: InputBuffer::new(),
            genres: Genre::KNOWN.to_vec(),
            genre_idx: 0,
            field: Field::Title,
            submitting: false,
            error: None,
        }
    }

    pub fn edit(book: &Book) -> Self {
        let mut genres = Genre::KNOWN.to_vec();
        let genre_idx = match genres.iter().position(|g| *g == book.genre) {
            Some(idx) => idx,
            None => {
                genres.push(book.genre.clone());
                genres.len() - 1
            }
        };
        Self {
            editing: Some(book.clone()),
            title: InputBuffer::with_text(book.title.clone()),
            author: InputBuffer::with_text(book.author.clone()),
            genres,
            genre_idx,
            field: Field::Title,
            submitting: false,
            error: None,
        }
    }

    pub fn editing(&self) -> Option<&Book> {
        self.editing.as_ref()
    }

    pub fn title(&self) -> &str {
        self.title.text()
    }

    pub fn author(&self) -> &str {
        self.author.text()
    }

    pub fn genre(&self) -> &str {
        self.genres
            .get(self.genre_idx)
            .map(Genre::as_str)
            .unwrap_or_default()
    }

    pub fn set_submitting(&mut self) {
        self.submitting = true;
        self.error = None;
    }

    /// Keep the form open with the failure shown inline.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.submitting = false;
        self.error = Some(message.into());
    }

    pub fn handle_input(&mut self, event: &Event) -> FormOutcome {
        let Event::Key(key @ KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return FormOutcome::Consumed;
        };

        if self.submitting {
            return FormOutcome::Consumed;
        }

        match (*modifiers, *code) {
            (_, KeyCode::Esc) => return FormOutcome::Cancel,
            (_, KeyCode::Enter) => return FormOutcome::Submit,
            (_, KeyCode::Tab) | (_, KeyCode::Down) => self.field = self.field.next(),
            (_, KeyCode::BackTab) | (_, KeyCode::Up) => self.field = self.field.prev(),
            (KeyModifiers::NONE, KeyCode::Left | KeyCode::Char('h')) if self.field == Field::Genre => {
                self.genre_idx = (self.genre_idx + self.genres.len() - 1) % self.genres.len();
            }
            (KeyModifiers::NONE, KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' '))
                if self.field == Field::Genre =>
            {
                self.genre_idx = (self.genre_idx + 1) % self.genres.len();
            }
            _ => {
                let input = match self.field {
                    Field::Title => &mut self.title,
                    Field::Author => &mut self.author,
                    Field::Genre => return FormOutcome::Consumed,
                };
                if input.handle_key(key) {
                    self.error = None;
                }
            }
        }
        FormOutcome::Consumed
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let modal = centered_rect(60, 50, area);
        let heading = if self.editing.is_some() {
            "Edit Book"
        } else {
            "Add a New Book"
        };
        let block = theme::block_modal(heading);
        let inner = block.inner(modal);
        frame.render_widget(Clear, modal);
        frame.render_widget(block, modal);

        let rows = Layout::vertical([
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(inner);

        let label = |field: Field, text: &'static str| {
            let style = if self.field == field {
                theme::heading()
            } else {
                theme::muted()
            };
            Span::styled(format!(" {text:<8}"), style)
        };

        let value_style = Style::default().fg(theme::TEXT);
        for (row, field, text, input) in [
            (rows[0], Field::Title, "Title", &self.title),
            (rows[1], Field::Author, "Author", &self.author),
        ] {
            let mut line = input.to_line(value_style, self.field == field && !self.submitting);
            line.spans.insert(0, label(field, text));
            frame.render_widget(Paragraph::new(line), row);
        }

        let genre_line = Line::from(vec![
            label(Field::Genre, "Genre"),
            Span::styled("< ", theme::dim()),
            Span::styled(self.genre().to_string(), theme::title()),
            Span::styled(" >", theme::dim()),
        ]);
        frame.render_widget(Paragraph::new(genre_line), rows[2]);

        if let Some(ref error) = self.error {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(format!(" {error}"), theme::error_text()))),
                rows[3],
            );
        }

        let hint = if self.submitting {
            Line::from(Span::styled(" Saving...", theme::muted()))
        } else {
            Line::from(vec![
                Span::styled(" Tab", theme::key_hint()),
                Span::raw(":field "),
                Span::styled("←/→", theme::key_hint()),
                Span::raw(":genre "),
                Span::styled("Enter", theme::key_hint()),
                Span::raw(if self.editing.is_some() { ":save " } else { ":add " }),
                Span::styled("Esc", theme::key_hint()),
                Span::raw(":cancel"),
            ])
        };
        frame.render_widget(Paragraph::new(hint), rows[4]);
    }
}
