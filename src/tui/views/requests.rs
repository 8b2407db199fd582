//! Exchange requests view: received and sent requests.
//!
//! Received requests that are still pending can be accepted or rejected.
//! After a decision the request list is invalidated and refetched; the
//! previous state stays on screen until the refetch lands.

use std::collections::HashSet;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table, TableState, Tabs},
    Frame,
};
use tokio::sync::mpsc;

use super::super::events::NotificationLevel;
use super::super::services::Services;
use super::super::theme;
use crate::core::error::{ApiError, Result};
use crate::core::inbox::{can_decide, decide, load_inbox, Inbox, InboxEntry, Partition};
use crate::core::models::{Decision, ExchangeRequest, RequestId};
use crate::core::query::{FetchSequencer, FetchToken};

enum RequestsMsg {
    Loaded {
        token: FetchToken,
        result: Result<Inbox>,
    },
    Decided {
        request_id: RequestId,
        decision: Decision,
        result: Result<Option<ExchangeRequest>>,
    },
}

pub struct RequestsState {
    inbox: Option<Inbox>,
    loading: bool,
    error: Option<String>,
    sequencer: FetchSequencer,
    tab: Partition,
    selected: usize,
    /// Decision in flight; further decisions wait for it.
    deciding: Option<RequestId>,
    /// Decided on the server but still pending in the loaded inbox.
    decided: HashSet<RequestId>,
    data_rx: mpsc::UnboundedReceiver<RequestsMsg>,
    data_tx: mpsc::UnboundedSender<RequestsMsg>,
}

impl RequestsState {
    pub fn new() -> Self {
        let (data_tx, data_rx) = mpsc::unbounded_channel();
        Self {
            inbox: None,
            loading: false,
            error: None,
            sequencer: FetchSequencer::new(),
            tab: Partition::Received,
            selected: 0,
            deciding: None,
            decided: HashSet::new(),
            data_rx,
            data_tx,
        }
    }

    pub fn load(&mut self, services: &Services) {
        let Some(viewer) = services.viewer() else {
            self.inbox = None;
            self.loading = false;
            self.error = Some(ApiError::NotSignedIn.to_string());
            return;
        };

        let token = self.sequencer.issue();
        self.loading = true;

        let api = services.api.clone();
        let resolver = services.resolver.clone();
        let tx = self.data_tx.clone();
        tokio::spawn(async move {
            let result = load_inbox(api.as_ref(), &resolver, &viewer.id).await;
            let _ = tx.send(RequestsMsg::Loaded { token, result });
        });
    }

    pub fn poll(&mut self, services: &Services) {
        while let Ok(msg) = self.data_rx.try_recv() {
            match msg {
                RequestsMsg::Loaded { token, result } => self.apply_loaded(token, result),
                RequestsMsg::Decided {
                    request_id,
                    decision,
                    result,
                } => {
                    self.deciding = None;
                    if let Ok(Some(_)) = &result {
                        self.decided.insert(request_id.clone());
                    }
                    match result {
                        Ok(Some(updated)) => services.notify(
                            NotificationLevel::Success,
                            format!("Request {}", updated.status.as_str()),
                        ),
                        Ok(None) => {}
                        Err(e) => {
                            log::warn!("{decision:?} on {request_id} failed: {e}");
                            services.notify(
                                NotificationLevel::Error,
                                format!("Could not update request: {e}"),
                            );
                        }
                    }
                }
            }
        }
    }

    fn apply_loaded(&mut self, token: FetchToken, result: Result<Inbox>) {
        if !self.sequencer.is_current(token) {
            log::debug!("Discarding stale inbox fetch {token:?}");
            return;
        }
        self.loading = false;
        match result {
            Ok(inbox) => {
                // Terminal statuses are one-way, so a pending row for a
                // decided id is stale data.
                self.decided.retain(|id| {
                    inbox
                        .received
                        .iter()
                        .any(|e| &e.request.id == id && !e.request.status.is_terminal())
                });
                self.inbox = Some(inbox);
                self.error = None;
                self.clamp_selection();
            }
            Err(e) => {
                log::warn!("Inbox load failed: {e}");
                self.error = Some(e.to_string());
            }
        }
    }

    fn entries(&self) -> &[InboxEntry] {
        self.inbox
            .as_ref()
            .map(|inbox| inbox.partition(self.tab))
            .unwrap_or_default()
    }

    fn is_decidable(&self, entry: &InboxEntry) -> bool {
        can_decide(self.tab, &entry.request) && !self.decided.contains(&entry.request.id)
    }

    fn clamp_selection(&mut self) {
        let len = self.entries().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn switch_tab(&mut self) {
        self.tab = match self.tab {
            Partition::Received => Partition::Sent,
            Partition::Sent => Partition::Received,
        };
        self.selected = 0;
    }

    pub fn handle_input(&mut self, event: &Event, services: &Services) -> bool {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return false;
        };

        match (*modifiers, *code) {
            (KeyModifiers::NONE, KeyCode::Char('h') | KeyCode::Left)
            | (KeyModifiers::NONE, KeyCode::Char('l') | KeyCode::Right) => {
                self.switch_tab();
                true
            }
            (KeyModifiers::NONE, KeyCode::Char('j') | KeyCode::Down) => {
                if self.selected + 1 < self.entries().len() {
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
            (KeyModifiers::NONE, KeyCode::Char('a')) => {
                self.decide_selected(Decision::Accept, services);
                true
            }
            (KeyModifiers::NONE, KeyCode::Char('x')) => {
                self.decide_selected(Decision::Reject, services);
                true
            }
            _ => false,
        }
    }

    /// Accept/reject the highlighted request. Undecidable requests are
    /// ignored, like a disabled button.
    fn decide_selected(&mut self, decision: Decision, services: &Services) {
        if self.deciding.is_some() {
            return;
        }
        let Some(entry) = self.entries().get(self.selected) else {
            return;
        };
        if !self.is_decidable(entry) {
            return;
        }
        let Some(viewer) = services.viewer() else {
            services.notify(NotificationLevel::Warning, ApiError::NotSignedIn.to_string());
            return;
        };

        let request = entry.request.clone();
        let partition = self.tab;
        self.deciding = Some(request.id.clone());

        let api = services.api.clone();
        let invalidator = services.invalidator.clone();
        let tx = self.data_tx.clone();
        tokio::spawn(async move {
            let result = decide(
                api.as_ref(),
                &invalidator,
                &viewer.id,
                partition,
                &request,
                decision,
            )
            .await;
            let _ = tx.send(RequestsMsg::Decided {
                request_id: request.id,
                decision,
                result,
            });
        });
    }

    // ── Rendering ───────────────────────────────────────────────────────

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = theme::block_focused("Exchange Requests");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::vertical([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(inner);

        let pending = self.inbox.as_ref().map(Inbox::pending_received).unwrap_or(0);
        let received_label = if pending > 0 {
            format!("Received ({pending})")
        } else {
            Partition::Received.label().to_string()
        };
        let tabs = Tabs::new(vec![received_label, Partition::Sent.label().to_string()])
            .select(match self.tab {
                Partition::Received => 0,
                Partition::Sent => 1,
            })
            .style(theme::muted())
            .highlight_style(theme::title());
        frame.render_widget(tabs, rows[0]);

        if let Some(ref error) = self.error {
            frame.render_widget(
                Paragraph::new(vec![
                    Line::from(Span::styled(format!(" {error}"), theme::error_text())),
                    Line::from(vec![
                        Span::raw(" Press "),
                        Span::styled("r", theme::key_hint()),
                        Span::raw(" to retry"),
                    ]),
                ]),
                rows[1],
            );
        } else if self.inbox.is_none() {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(" Loading requests...", theme::muted()))),
                rows[1],
            );
        } else {
            self.render_table(frame, rows[1]);
        }

        let mut hint = vec![
            Span::styled(" h/l", theme::key_hint()),
            Span::raw(":received/sent "),
            Span::styled("j/k", theme::key_hint()),
            Span::raw(":move "),
        ];
        let decidable = self
            .entries()
            .get(self.selected)
            .is_some_and(|e| self.is_decidable(e));
        let decision_style = if decidable && self.deciding.is_none() {
            theme::key_hint()
        } else {
            theme::dim()
        };
        hint.extend([
            Span::styled("a", decision_style),
            Span::styled(":accept ", decision_style),
            Span::styled("x", decision_style),
            Span::styled(":reject ", decision_style),
            Span::styled("r", theme::key_hint()),
            Span::raw(":refresh"),
        ]);
        frame.render_widget(Paragraph::new(Line::from(hint)), rows[2]);
    }

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        let entries = self.entries();
        if entries.is_empty() {
            let message = match self.tab {
                Partition::Received => " No requests received yet",
                Partition::Sent => " You have not requested any exchanges",
            };
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(message, theme::muted()))),
                area,
            );
            return;
        }

        let header = Row::new(["Requester", "Requested", "Offered", "Status"]).style(theme::heading());
        let rows: Vec<Row> = entries
            .iter()
            .map(|entry| {
                let request = &entry.request;
                let status = if self.deciding.as_ref() == Some(&request.id)
                    || self.decided.contains(&request.id)
                {
                    Span::styled("updating...", theme::muted())
                } else {
                    Span::styled(request.status.as_str(), theme::status(request.status))
                };
                Row::new(vec![
                    Cell::from(entry.requester_name.clone()),
                    Cell::from(book_label(
                        request.requested_book.title_or_placeholder(),
                        request.requested_book.author_or_placeholder(),
                    )),
                    Cell::from(book_label(
                        request.offered_book.title_or_placeholder(),
                        request.offered_book.author_or_placeholder(),
                    )),
                    Cell::from(status),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(20),
                Constraint::Percentage(35),
                Constraint::Percentage(35),
                Constraint::Length(12),
            ],
        )
        .header(header)
        .row_highlight_style(theme::selected_row());

        let mut state = TableState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(table, area, &mut state);
    }
}

impl Default for RequestsState {
    fn default() -> Self {
        Self::new()
    }
}

fn book_label(title: &str, author: &str) -> String {
    format!("{title} by {author}")
}
