//! Your Books: the signed-in user's own listings.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Cell, Clear, Paragraph, Row, Table, TableState},
    Frame,
};
use tokio::sync::mpsc;

use super::super::app::centered_rect;
use super::super::events::NotificationLevel;
use super::super::services::Services;
use super::super::theme;
use super::book_form::{BookForm, FormOutcome};
use crate::core::error::{ApiError, Result};
use crate::core::models::{Book, BookId};
use crate::core::query::{FetchSequencer, FetchToken};
use crate::core::shelf;

enum ShelfMsg {
    Loaded {
        token: FetchToken,
        result: Result<Vec<Book>>,
    },
    Saved(Result<Book>),
    Toggled(Result<Book>),
    Deleted {
        book_id: BookId,
        result: Result<()>,
    },
}

pub struct ShelfState {
    books: Option<Vec<Book>>,
    loading: bool,
    error: Option<String>,
    sequencer: FetchSequencer,
    selected: usize,
    form: Option<BookForm>,
    /// Book awaiting delete confirmation.
    confirm_delete: Option<Book>,
    data_rx: mpsc::UnboundedReceiver<ShelfMsg>,
    data_tx: mpsc::UnboundedSender<ShelfMsg>,
}

impl ShelfState {
    pub fn new() -> Self {
        let (data_tx, data_rx) = mpsc::unbounded_channel();
        Self {
            books: None,
            loading: false,
            error: None,
            sequencer: FetchSequencer::new(),
            selected: 0,
            form: None,
            confirm_delete: None,
            data_rx,
            data_tx,
        }
    }

    pub fn load(&mut self, services: &Services) {
        let Some(viewer) = services.viewer() else {
            self.books = None;
            self.loading = false;
            self.error = Some(ApiError::NotSignedIn.to_string());
            return;
        };

        let token = self.sequencer.issue();
        self.loading = true;
        let api = services.api.clone();
        let tx = self.data_tx.clone();
        tokio::spawn(async move {
            let result = shelf::list_owned(api.as_ref(), &viewer.id).await;
            let _ = tx.send(ShelfMsg::Loaded { token, result });
        });
    }

    pub fn poll(&mut self, services: &Services) {
        while let Ok(msg) = self.data_rx.try_recv() {
            match msg {
                ShelfMsg::Loaded { token, result } => self.apply_loaded(token, result),
                ShelfMsg::Saved(Ok(book)) => {
                    let verb = if self.form.as_ref().and_then(BookForm::editing).is_some() {
                        "Updated"
                    } else {
                        "Added"
                    };
                    self.form = None;
                    services.notify(NotificationLevel::Success, format!("{verb} \"{}\"", book.title));
                }
                ShelfMsg::Saved(Err(e)) => {
                    if let Some(ref mut form) = self.form {
                        form.set_error(e.to_string());
                    } else {
                        services.notify(NotificationLevel::Error, e.to_string());
                    }
                }
                ShelfMsg::Toggled(Ok(book)) => {
                    let state = if book.is_available { "available" } else { "unavailable" };
                    services.notify(NotificationLevel::Success, format!("\"{}\" is now {state}", book.title));
                }
                ShelfMsg::Toggled(Err(e)) => {
                    services.notify(NotificationLevel::Error, format!("Update failed: {e}"));
                }
                ShelfMsg::Deleted { book_id, result } => match result {
                    Ok(()) => services.notify(NotificationLevel::Success, "Book deleted"),
                    Err(e) => {
                        log::warn!("Delete of {book_id} failed: {e}");
                        services.notify(NotificationLevel::Error, format!("Delete failed: {e}"));
                    }
                },
            }
        }
    }

    fn apply_loaded(&mut self, token: FetchToken, result: Result<Vec<Book>>) {
        if !self.sequencer.is_current(token) {
            log::debug!("Discarding stale shelf fetch {token:?}");
            return;
        }
        self.loading = false;
        match result {
            Ok(books) => {
                self.selected = self.selected.min(books.len().saturating_sub(1));
                self.books = Some(books);
                self.error = None;
            }
            Err(e) => {
                log::warn!("Own books load failed: {e}");
                self.error = Some(e.to_string());
            }
        }
    }

    fn books(&self) -> &[Book] {
        self.books.as_deref().unwrap_or_default()
    }

    pub fn is_capturing_input(&self) -> bool {
        self.form.is_some() || self.confirm_delete.is_some()
    }

    pub fn handle_input(&mut self, event: &Event, services: &Services) -> bool {
        if let Some(ref mut form) = self.form {
            match form.handle_input(event) {
                FormOutcome::Consumed => {}
                FormOutcome::Cancel => self.form = None,
                FormOutcome::Submit => self.save(services),
            }
            return true;
        }

        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return self.confirm_delete.is_some();
        };

        if let Some(book) = self.confirm_delete.take() {
            if matches!(code, KeyCode::Char('y') | KeyCode::Enter) {
                self.delete(book, services);
            }
            return true;
        }

        match (*modifiers, *code) {
            (KeyModifiers::NONE, KeyCode::Char('j') | KeyCode::Down) => {
                if self.selected + 1 < self.books().len() {
                    self.selected += 1;
                }
                true
            }
            (KeyModifiers::NONE, KeyCode::Char('k') | KeyCode::Up) => {
                self.selected = self.selected.saturating_sub(1);
                true
            }
            (KeyModifiers::NONE, KeyCode::Char('a')) => {
                self.form = Some(BookForm::add());
                true
            }
            (KeyModifiers::NONE, KeyCode::Char('e') | KeyCode::Enter) => {
                if let Some(book) = self.books().get(self.selected) {
                    self.form = Some(BookForm::edit(book));
                }
                true
            }
            (KeyModifiers::NONE, KeyCode::Char('v')) => {
                if let Some(book) = self.books().get(self.selected).cloned() {
                    self.toggle_availability(book, services);
                }
                true
            }
            (KeyModifiers::NONE, KeyCode::Char('d')) => {
                self.confirm_delete = self.books().get(self.selected).cloned();
                true
            }
            (KeyModifiers::NONE, KeyCode::Char('r')) => {
                self.load(services);
                true
            }
            _ => false,
        }
    }

    fn save(&mut self, services: &Services) {
        let Some(ref mut form) = self.form else {
            return;
        };
        let owner = services.viewer().map(|u| u.id).unwrap_or_default();

        let (title, author, genre) = (
            form.title().to_string(),
            form.author().to_string(),
            form.genre().to_string(),
        );
        let api = services.api.clone();
        let invalidator = services.invalidator.clone();
        let tx = self.data_tx.clone();

        match form.editing().cloned() {
            None => {
                form.set_submitting();
                tokio::spawn(async move {
                    let result =
                        shelf::add_book(api.as_ref(), &invalidator, &owner, &title, &author, &genre).await;
                    let _ = tx.send(ShelfMsg::Saved(result));
                });
            }
            Some(book) => {
                let update = match shelf::edit_changes(&book, &title, &author, &genre) {
                    Ok(update) if update.is_empty() => {
                        self.form = None;
                        return;
                    }
                    Ok(update) => update,
                    Err(e) => {
                        form.set_error(e.to_string());
                        return;
                    }
                };
                form.set_submitting();
                tokio::spawn(async move {
                    let result =
                        shelf::update_book(api.as_ref(), &invalidator, &owner, &book.id, &update).await;
                    let _ = tx.send(ShelfMsg::Saved(result));
                });
            }
        }
    }

    fn toggle_availability(&mut self, book: Book, services: &Services) {
        let owner = services.viewer().map(|u| u.id).unwrap_or_default();
        let update = shelf::availability_toggle(&book);
        let api = services.api.clone();
        let invalidator = services.invalidator.clone();
        let tx = self.data_tx.clone();
        tokio::spawn(async move {
            let result = shelf::update_book(api.as_ref(), &invalidator, &owner, &book.id, &update).await;
            let _ = tx.send(ShelfMsg::Toggled(result));
        });
    }

    fn delete(&mut self, book: Book, services: &Services) {
        let owner = services.viewer().map(|u| u.id).unwrap_or_default();
        let api = services.api.clone();
        let invalidator = services.invalidator.clone();
        let tx = self.data_tx.clone();
        tokio::spawn(async move {
            let result = shelf::delete_book(api.as_ref(), &invalidator, &owner, &book.id).await;
            let _ = tx.send(ShelfMsg::Deleted {
                book_id: book.id,
                result,
            });
        });
    }

    // ── Rendering ───────────────────────────────────────────────────────

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = theme::block_focused("Your Books");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(inner);

        if let Some(ref error) = self.error {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(format!(" {error}"), theme::error_text()))),
                rows[0],
            );
        } else if self.books.is_none() {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(" Loading your books...", theme::muted()))),
                rows[0],
            );
        } else if self.books().is_empty() {
            frame.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled(" You have not listed any books. Press ", theme::muted()),
                    Span::styled("a", theme::key_hint()),
                    Span::styled(" to add one.", theme::muted()),
                ])),
                rows[0],
            );
        } else {
            self.render_table(frame, rows[0]);
        }

        let hint = Line::from(vec![
            Span::styled(" a", theme::key_hint()),
            Span::raw(":add "),
            Span::styled("e", theme::key_hint()),
            Span::raw(":edit "),
            Span::styled("v", theme::key_hint()),
            Span::raw(":availability "),
            Span::styled("d", theme::key_hint()),
            Span::raw(":delete "),
            Span::styled("r", theme::key_hint()),
            Span::raw(":refresh"),
        ]);
        frame.render_widget(Paragraph::new(hint), rows[1]);

        if let Some(ref book) = self.confirm_delete {
            render_confirm_delete(frame, area, book);
        }
        if let Some(ref form) = self.form {
            form.render(frame, area);
        }
    }

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        let header = Row::new(["Title", "Author", "Genre", "Available"]).style(theme::heading());
        let rows: Vec<Row> = self
            .books()
            .iter()
            .map(|book| {
                let available = if book.is_available {
                    Span::styled("yes", theme::muted())
                } else {
                    Span::styled("no", theme::dim())
                };
                Row::new(vec![
                    Cell::from(book.title.clone()),
                    Cell::from(book.author.clone()),
                    Cell::from(book.genre.to_string()),
                    Cell::from(available),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(40),
                Constraint::Percentage(30),
                Constraint::Percentage(20),
                Constraint::Length(10),
            ],
        )
        .header(header)
        .row_highlight_style(theme::selected_row());

        let mut state = TableState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(table, area, &mut state);
    }
}

impl Default for ShelfState {
    fn default() -> Self {
        Self::new()
    }
}

fn render_confirm_delete(frame: &mut Frame, area: Rect, book: &Book) {
    let modal = centered_rect(50, 20, area);
    let block = theme::block_modal("Delete Book");
    let lines = vec![
        Line::raw(""),
        Line::from(vec![
            Span::raw(" Delete "),
            Span::styled(book.title.clone(), theme::title()),
            Span::raw("?"),
        ]),
        Line::raw(""),
        Line::from(vec![
            Span::styled(" y", theme::key_hint()),
            Span::raw(":delete  "),
            Span::styled("any other key", theme::key_hint()),
            Span::raw(":keep"),
        ]),
    ];
    frame.render_widget(Clear, modal);
    frame.render_widget(Paragraph::new(lines).block(block), modal);
}
