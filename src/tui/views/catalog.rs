//! Catalog view: every available book not owned by the viewer.
//!
//! The catalog is refetched on a timer and whenever it is invalidated. Each
//! fetch carries a [`FetchToken`]; only the newest fetch may replace the
//! table, so a slow earlier response never overwrites a newer one.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table, TableState},
    Frame,
};
use tokio::sync::mpsc;

use super::super::events::NotificationLevel;
use super::super::services::Services;
use super::super::theme;
use super::super::widgets::input_buffer::InputBuffer;
use super::exchange_dialog::{DialogOutcome, ExchangeDialogView};
use crate::core::enrichment::enrich_catalog;
use crate::core::error::{ApiError, Result};
use crate::core::exchange::{fetch_offerable_books, submit_exchange};
use crate::core::filter::{genre_options, CatalogFilter, FilteredRow, GenreFacet, ALL_GENRES};
use crate::core::models::{Book, EnrichedBook, ExchangeRequest};
use crate::core::query::{FetchSequencer, FetchToken};

enum CatalogMsg {
    Loaded {
        token: FetchToken,
        result: Result<Vec<EnrichedBook>>,
    },
    OfferableLoaded(Result<Vec<Book>>),
    Submitted(Result<ExchangeRequest>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
}

pub struct CatalogState {
    books: Vec<EnrichedBook>,
    loaded: bool,
    loading: bool,
    error: Option<String>,
    sequencer: FetchSequencer,
    search: InputBuffer,
    mode: InputMode,
    facet: GenreFacet,
    selected: usize,
    exchange: ExchangeDialogView,
    data_rx: mpsc::UnboundedReceiver<CatalogMsg>,
    data_tx: mpsc::UnboundedSender<CatalogMsg>,
}

impl CatalogState {
    pub fn new() -> Self {
        let (data_tx, data_rx) = mpsc::unbounded_channel();
        Self {
            books: Vec::new(),
            loaded: false,
            loading: false,
            error: None,
            sequencer: FetchSequencer::new(),
            search: InputBuffer::new(),
            mode: InputMode::Normal,
            facet: GenreFacet::All,
            selected: 0,
            exchange: ExchangeDialogView::new(),
            data_rx,
            data_tx,
        }
    }

    /// Fetch and enrich the catalog. Any earlier fetch still in flight is
    /// superseded.
    pub fn load(&mut self, services: &Services) {
        let Some(viewer) = services.viewer() else {
            self.books.clear();
            self.loaded = false;
            self.loading = false;
            self.error = Some(ApiError::NotSignedIn.to_string());
            return;
        };

        let token = self.sequencer.issue();
        self.loading = true;
        services.resolver.begin_cycle();

        let api = services.api.clone();
        let resolver = services.resolver.clone();
        let policy = services.config.tui.self_exclusion;
        let tx = self.data_tx.clone();

        tokio::spawn(async move {
            let result = match api.list_catalog().await {
                Ok(catalog) => enrich_catalog(catalog, &viewer, &resolver, policy).await,
                Err(e) => Err(e),
            };
            let _ = tx.send(CatalogMsg::Loaded { token, result });
        });
    }

    pub fn poll(&mut self, services: &Services) {
        while let Ok(msg) = self.data_rx.try_recv() {
            match msg {
                CatalogMsg::Loaded { token, result } => self.apply_loaded(token, result),
                CatalogMsg::OfferableLoaded(result) => {
                    self.exchange.reset_cursor();
                    self.exchange.dialog.offerable_loaded(result);
                }
                CatalogMsg::Submitted(Ok(request)) => {
                    log::info!("Exchange request {} created", request.id);
                    self.exchange.dialog.submit_succeeded();
                    services.notify(NotificationLevel::Success, "Exchange request sent");
                }
                CatalogMsg::Submitted(Err(e)) => {
                    self.exchange.dialog.submit_failed();
                    services.notify(NotificationLevel::Error, format!("Exchange failed: {e}"));
                }
            }
        }
    }

    fn apply_loaded(&mut self, token: FetchToken, result: Result<Vec<EnrichedBook>>) {
        if !self.sequencer.is_current(token) {
            log::debug!("Discarding stale catalog fetch {token:?}");
            return;
        }
        self.loading = false;
        match result {
            Ok(books) => {
                self.books = books;
                self.loaded = true;
                self.error = None;
                self.clamp_selection();
            }
            Err(e) => {
                log::warn!("Catalog load failed: {e}");
                self.error = Some(e.to_string());
            }
        }
    }

    fn filter(&self) -> CatalogFilter {
        CatalogFilter::new(self.search.text(), self.facet.clone())
    }

    fn visible(&self) -> Vec<FilteredRow<'_>> {
        self.filter().apply(&self.books)
    }

    fn clamp_selection(&mut self) {
        let len = self.visible().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    /// Facet values in picker order: "all" then genres as first seen.
    fn facet_values(&self) -> Vec<String> {
        std::iter::once(ALL_GENRES.to_string())
            .chain(genre_options(&self.books))
            .collect()
    }

    fn cycle_facet(&mut self, forward: bool) {
        let values = self.facet_values();
        let current = match &self.facet {
            GenreFacet::All => ALL_GENRES,
            GenreFacet::Exact(genre) => genre.as_str(),
        };
        let idx = values.iter().position(|v| v == current).unwrap_or(0);
        let next = if forward {
            (idx + 1) % values.len()
        } else {
            (idx + values.len() - 1) % values.len()
        };
        self.facet = GenreFacet::from_value(&values[next]);
        self.selected = 0;
    }

    pub fn is_capturing_input(&self) -> bool {
        self.mode == InputMode::Search || self.exchange.dialog.is_open()
    }

    pub fn handle_input(&mut self, event: &Event, services: &Services) -> bool {
        if self.exchange.dialog.is_open() {
            self.handle_dialog_input(event, services);
            return true;
        }

        let Event::Key(key) = event else {
            return false;
        };
        if key.kind != KeyEventKind::Press {
            return false;
        }

        if self.mode == InputMode::Search {
            match key.code {
                KeyCode::Esc | KeyCode::Enter => self.mode = InputMode::Normal,
                _ => {
                    if self.search.handle_key(key) {
                        self.selected = 0;
                    }
                }
            }
            return true;
        }

        self.handle_normal_key(key, services)
    }

    fn handle_normal_key(&mut self, key: &KeyEvent, services: &Services) -> bool {
        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Char('/')) => {
                self.mode = InputMode::Search;
                true
            }
            (KeyModifiers::NONE, KeyCode::Esc) if !self.search.text().is_empty() => {
                self.search.clear();
                true
            }
            (KeyModifiers::NONE, KeyCode::Char('g')) => {
                self.cycle_facet(true);
                true
            }
            (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char('G')) => {
                self.cycle_facet(false);
                true
            }
            (KeyModifiers::NONE, KeyCode::Char('j') | KeyCode::Down) => {
                if self.selected + 1 < self.visible().len() {
                    self.selected += 1;
                }
                true
            }
            (KeyModifiers::NONE, KeyCode::Char('k') | KeyCode::Up) => {
                self.selected = self.selected.saturating_sub(1);
                true
            }
            (KeyModifiers::NONE, KeyCode::Char('r')) => {
                self.load(services);
                true
            }
            (KeyModifiers::NONE, KeyCode::Enter | KeyCode::Char('x')) => {
                self.open_exchange(services);
                true
            }
            _ => false,
        }
    }

    fn open_exchange(&mut self, services: &Services) {
        let Some(target) = self.visible().get(self.selected).map(|row| row.book.clone()) else {
            return;
        };
        let Some(viewer) = services.viewer() else {
            services.notify(NotificationLevel::Warning, ApiError::NotSignedIn.to_string());
            return;
        };
        if let Err(e) = self.exchange.dialog.open(target) {
            services.notify(NotificationLevel::Warning, e.to_string());
            return;
        }
        self.exchange.reset_cursor();

        let api = services.api.clone();
        let tx = self.data_tx.clone();
        tokio::spawn(async move {
            let result = fetch_offerable_books(api.as_ref(), &viewer.id).await;
            let _ = tx.send(CatalogMsg::OfferableLoaded(result));
        });
    }

    fn handle_dialog_input(&mut self, event: &Event, services: &Services) {
        match self.exchange.handle_input(event) {
            DialogOutcome::Consumed => {}
            DialogOutcome::Cancel => {
                if !self.exchange.dialog.cancel() {
                    services.notify(NotificationLevel::Info, "Request already on its way");
                }
            }
            DialogOutcome::Select(book_id) => {
                if let Err(e) = self.exchange.dialog.select(book_id) {
                    services.notify(NotificationLevel::Warning, e.to_string());
                }
            }
            DialogOutcome::Submit => self.submit(services),
        }
    }

    fn submit(&mut self, services: &Services) {
        let requester = services.viewer().map(|u| u.id).unwrap_or_default();
        let proposal = match self.exchange.dialog.begin_submit(&requester) {
            Ok(proposal) => proposal,
            Err(e) => {
                services.notify(NotificationLevel::Warning, e.to_string());
                return;
            }
        };

        let api = services.api.clone();
        let invalidator = services.invalidator.clone();
        let tx = self.data_tx.clone();
        tokio::spawn(async move {
            let result = submit_exchange(api.as_ref(), &invalidator, &proposal).await;
            if let Err(ref e) = result {
                log::warn!("Exchange proposal failed: {e}");
            }
            let _ = tx.send(CatalogMsg::Submitted(result));
        });
    }

    // ── Rendering ───────────────────────────────────────────────────────

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let rows = Layout::vertical([Constraint::Length(3), Constraint::Min(1)]).split(area);
        self.render_filter_bar(frame, rows[0]);

        let title = if self.loading && self.loaded {
            "Available Books (refreshing)"
        } else {
            "Available Books"
        };
        let block = theme::block_focused(title);
        let inner = block.inner(rows[1]);
        frame.render_widget(block, rows[1]);

        if let Some(ref error) = self.error {
            let lines = vec![
                Line::raw(""),
                Line::from(Span::styled(format!("  {error}"), theme::error_text())),
                Line::raw(""),
                Line::from(vec![
                    Span::raw("  Press "),
                    Span::styled("r", theme::key_hint()),
                    Span::raw(" to retry"),
                ]),
            ];
            frame.render_widget(Paragraph::new(lines), inner);
        } else if !self.loaded {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled("  Loading catalog...", theme::muted()))),
                inner,
            );
        } else {
            self.render_table(frame, inner);
        }

        if self.exchange.dialog.is_open() {
            self.exchange.render(frame, area);
        }
    }

    fn render_filter_bar(&self, frame: &mut Frame, area: Rect) {
        let searching = self.mode == InputMode::Search;
        let block = if searching {
            theme::block_focused("Search")
        } else {
            theme::block_default("Search")
        };
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut line = if self.search.text().is_empty() && !searching {
            Line::from(Span::styled("Search books by title (/)", theme::dim()))
        } else {
            self.search.to_line(Style::default().fg(theme::TEXT), searching)
        };
        line.spans.insert(0, Span::raw(" "));
        line.spans.push(Span::styled("   Genre: ", theme::muted()));
        line.spans.push(Span::styled(self.facet.label().to_string(), theme::title()));
        line.spans.push(Span::styled(" (g/G)", theme::dim()));
        frame.render_widget(Paragraph::new(line), inner);
    }

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        let visible = self.visible();
        if visible.is_empty() {
            let message = if self.books.is_empty() {
                "  No books from other users yet"
            } else {
                "  No books match the current search"
            };
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(message, theme::muted()))),
                area,
            );
            return;
        }

        let header = Row::new(["Title", "Author", "Genre", "Owner", ""]).style(theme::heading());
        let rows: Vec<Row> = visible
            .iter()
            .map(|row| {
                let book = &row.book.book;
                let action = if self.exchange.dialog.was_requested(&book.id) {
                    Cell::from(Span::styled("Requested", theme::muted()))
                } else if !book.is_available {
                    Cell::from(Span::styled("Unavailable", theme::dim()))
                } else {
                    Cell::from(Span::styled("Request", theme::key_hint()))
                };
                Row::new(vec![
                    Cell::from(book.title.clone()),
                    Cell::from(book.author.clone()),
                    Cell::from(book.genre.to_string()),
                    Cell::from(row.book.owner_name.clone()),
                    action,
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(32),
                Constraint::Percentage(24),
                Constraint::Percentage(16),
                Constraint::Percentage(16),
                Constraint::Length(12),
            ],
        )
        .header(header)
        .row_highlight_style(theme::selected_row());

        let mut state = TableState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(table, area, &mut state);
    }
}

impl Default for CatalogState {
    fn default() -> Self {
        Self::new()
    }
}
