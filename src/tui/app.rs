use std::io;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Frame, Terminal,
};
use tokio::sync::{mpsc, watch};

use super::events::{Action, AppEvent, Focus, Notification, NotificationLevel};
use super::layout::AppLayout;
use super::services::{notify, Services};
use super::theme;
use super::views::catalog::CatalogState;
use super::views::requests::RequestsState;
use super::views::shelf::ShelfState;
use crate::core::models::{User, UserId};
use crate::core::query::QueryKey;

/// Most notifications visible at once.
const MAX_NOTIFICATIONS: usize = 3;

/// Central application state (Elm architecture).
pub struct AppState {
    /// Whether the app is still running.
    pub running: bool,
    /// Currently focused top-level view.
    pub focus: Focus,
    pub catalog: CatalogState,
    pub requests: RequestsState,
    pub shelf: ShelfState,
    /// Active notifications (max 3 visible).
    pub notifications: Vec<Notification>,
    /// Monotonic counter for notification IDs.
    notification_counter: u64,
    /// Whether the help modal is open.
    pub show_help: bool,
    /// Receiver for backend events.
    event_rx: mpsc::UnboundedReceiver<AppEvent>,
    /// Stale query keys published by mutations.
    invalidate_rx: mpsc::UnboundedReceiver<QueryKey>,
    session_rx: watch::Receiver<Option<User>>,
    /// Backend services handle.
    services: Services,
}

impl AppState {
    pub fn new(
        event_rx: mpsc::UnboundedReceiver<AppEvent>,
        invalidate_rx: mpsc::UnboundedReceiver<QueryKey>,
        services: Services,
    ) -> Self {
        let session_rx = services.session.subscribe();
        Self {
            running: true,
            focus: Focus::Catalog,
            catalog: CatalogState::new(),
            requests: RequestsState::new(),
            shelf: ShelfState::new(),
            notifications: Vec::new(),
            notification_counter: 0,
            show_help: false,
            event_rx,
            invalidate_rx,
            session_rx,
            services,
        }
    }

    // ── Elm event loop ──────────────────────────────────────────────────

    /// Main event loop: render → select → update → loop.
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        let tui = &self.services.config.tui;
        let mut tick_interval = tokio::time::interval(Duration::from_millis(tui.tick_rate_ms.max(1)));
        let refresh_every = Duration::from_secs(tui.catalog_refresh_secs.max(1));
        let mut refresh_interval =
            tokio::time::interval_at(tokio::time::Instant::now() + refresh_every, refresh_every);
        let mut event_stream = EventStream::new();

        self.catalog.load(&self.services);

        while self.running {
            terminal.draw(|frame| self.render(frame))?;

            tokio::select! {
                _ = tick_interval.tick() => {
                    self.on_tick();
                }
                _ = refresh_interval.tick() => {
                    self.catalog.load(&self.services);
                }
                Some(event) = self.event_rx.recv() => {
                    self.handle_event(event);
                }
                Some(key) = self.invalidate_rx.recv() => {
                    self.handle_event(AppEvent::Invalidate(key));
                }
                Ok(()) = self.session_rx.changed() => {
                    let user = self.session_rx.borrow_and_update().clone();
                    self.handle_event(AppEvent::SessionChanged(user));
                }
                Some(Ok(crossterm_event)) = event_stream.next() => {
                    self.handle_event(AppEvent::Input(crossterm_event));
                }
            }
        }

        Ok(())
    }

    // ── Event handling ──────────────────────────────────────────────────

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Input(crossterm_event) => {
                // Priority 1: Help modal
                if self.show_help {
                    if let Some(action) = self.map_help_input(&crossterm_event) {
                        self.handle_action(action);
                    }
                    return;
                }

                // Priority 2: Focused view
                if self.dispatch_view_input(&crossterm_event) {
                    return;
                }

                // Priority 3: Global keybindings
                if let Some(action) = self.map_input_to_action(crossterm_event) {
                    self.handle_action(action);
                }
            }
            AppEvent::Action(action) => self.handle_action(action),
            AppEvent::Tick => self.on_tick(),
            AppEvent::Notification(notification) => {
                self.push_notification(notification.message, notification.level);
            }
            AppEvent::Invalidate(key) => self.invalidate(key),
            AppEvent::SessionChanged(user) => {
                match user {
                    Some(ref user) => log::info!("Signed in as {}", user.name),
                    None => log::info!("Signed out"),
                }
                self.reload_all();
            }
            AppEvent::Quit => {
                self.running = false;
            }
        }
    }

    /// Refetch every view holding data under `key`.
    fn invalidate(&mut self, key: QueryKey) {
        log::debug!("Invalidated {key:?}");
        let viewer: Option<UserId> = self.services.viewer().map(|u| u.id);
        match key {
            QueryKey::Catalog => self.catalog.load(&self.services),
            QueryKey::ExchangeRequests(user) if viewer.as_ref() == Some(&user) => {
                self.requests.load(&self.services)
            }
            QueryKey::OwnedBooks(user) if viewer.as_ref() == Some(&user) => {
                self.shelf.load(&self.services)
            }
            QueryKey::ExchangeRequests(_) | QueryKey::OwnedBooks(_) => {}
        }
    }

    /// Dispatch input to the currently focused view. Returns true if consumed.
    fn dispatch_view_input(&mut self, event: &Event) -> bool {
        match self.focus {
            Focus::Catalog => self.catalog.handle_input(event, &self.services),
            Focus::Requests => self.requests.handle_input(event, &self.services),
            Focus::Shelf => self.shelf.handle_input(event, &self.services),
        }
    }

    fn view_is_capturing_input(&self) -> bool {
        match self.focus {
            Focus::Catalog => self.catalog.is_capturing_input(),
            Focus::Requests => false,
            Focus::Shelf => self.shelf.is_capturing_input(),
        }
    }

    // ── Input mapping ───────────────────────────────────────────────────

    fn map_help_input(&self, event: &Event) -> Option<Action> {
        let Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return None;
        };
        match code {
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => Some(Action::CloseHelp),
            _ => None,
        }
    }

    fn map_input_to_action(&self, event: Event) -> Option<Action> {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return None;
        };

        match (modifiers, code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(Action::Quit),
            (KeyModifiers::CONTROL, KeyCode::Char('r')) => Some(Action::RefetchSession),
            (KeyModifiers::NONE | KeyModifiers::SHIFT, _) => match code {
                KeyCode::Char('q') => Some(Action::Quit),
                KeyCode::Char('?') => Some(Action::ShowHelp),
                KeyCode::Tab => Some(Action::TabNext),
                KeyCode::BackTab => Some(Action::TabPrev),
                KeyCode::Char(c @ '1'..='9') => Focus::ALL
                    .get(c as usize - '1' as usize)
                    .map(|f| f.to_action()),
                KeyCode::Char('R') => Some(Action::RefreshAll),
                KeyCode::Char('L') => Some(Action::Logout),
                _ => None,
            },
            _ => None,
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::FocusCatalog => self.set_focus(Focus::Catalog),
            Action::FocusRequests => self.set_focus(Focus::Requests),
            Action::FocusShelf => self.set_focus(Focus::Shelf),
            Action::TabNext => self.set_focus(self.focus.next()),
            Action::TabPrev => self.set_focus(self.focus.prev()),
            Action::ShowHelp => self.show_help = true,
            Action::CloseHelp => self.show_help = false,
            Action::RefreshAll => self.reload_all(),
            Action::RefetchSession => {
                let session = self.services.session.clone();
                let api = self.services.api.clone();
                let tx = self.services.event_tx.clone();
                tokio::spawn(async move {
                    if session.refetch(api.as_ref()).await.is_none() {
                        notify(&tx, NotificationLevel::Warning, "Session could not be restored");
                    }
                });
            }
            Action::Logout => {
                let session = self.services.session.clone();
                let api = self.services.api.clone();
                let tx = self.services.event_tx.clone();
                tokio::spawn(async move {
                    match session.logout(api.as_ref()).await {
                        Ok(()) => notify(&tx, NotificationLevel::Info, "Logged out"),
                        Err(e) => notify(
                            &tx,
                            NotificationLevel::Warning,
                            format!("Logged out locally; server said: {e}"),
                        ),
                    }
                });
            }
        }
    }

    /// Switch views; every view refetches when it gains focus.
    fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        self.on_focus_changed();
    }

    fn on_focus_changed(&mut self) {
        match self.focus {
            Focus::Catalog => self.catalog.load(&self.services),
            Focus::Requests => self.requests.load(&self.services),
            Focus::Shelf => self.shelf.load(&self.services),
        }
    }

    fn reload_all(&mut self) {
        self.catalog.load(&self.services);
        match self.focus {
            Focus::Requests => self.requests.load(&self.services),
            Focus::Shelf => self.shelf.load(&self.services),
            Focus::Catalog => {}
        }
    }

    // ── Notifications ───────────────────────────────────────────────────

    /// Push a notification (dedup by message, max 3).
    pub fn push_notification(&mut self, message: String, level: NotificationLevel) {
        if self.notifications.iter().any(|n| n.message == message) {
            return;
        }

        self.notification_counter += 1;
        self.notifications.push(Notification {
            id: self.notification_counter,
            message,
            level,
            ttl_ticks: Notification::DEFAULT_TTL,
        });

        while self.notifications.len() > MAX_NOTIFICATIONS {
            self.notifications.remove(0);
        }
    }

    /// Tick: decrement notification TTLs, dismiss expired, poll async data.
    fn on_tick(&mut self) {
        for n in &mut self.notifications {
            n.ttl_ticks = n.ttl_ticks.saturating_sub(1);
        }
        self.notifications.retain(|n| n.ttl_ticks > 0);

        self.catalog.poll(&self.services);
        self.requests.poll(&self.services);
        self.shelf.poll(&self.services);
    }

    // ── Rendering ───────────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let layout = AppLayout::compute(area);

        if let Some(tabs_area) = layout.tabs {
            self.render_tabs(frame, tabs_area);
        }

        match self.focus {
            Focus::Catalog => self.catalog.render(frame, layout.main),
            Focus::Requests => self.requests.render(frame, layout.main),
            Focus::Shelf => self.shelf.render(frame, layout.main),
        }

        self.render_status_bar(frame, layout.status);

        // Overlays
        self.render_notifications(frame, area);

        if self.show_help {
            self.render_help_modal(frame, area);
        }
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<String> = Focus::ALL
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{} {}", i + 1, f.label()))
            .collect();
        let selected = Focus::ALL.iter().position(|&f| f == self.focus).unwrap_or(0);
        let tabs = Tabs::new(titles)
            .select(selected)
            .style(theme::muted())
            .highlight_style(theme::title())
            .divider(Span::styled("│", theme::dim()));
        frame.render_widget(tabs, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let user = match self.services.viewer() {
            Some(user) => Span::styled(user.name, Style::default().fg(theme::PRIMARY_LIGHT)),
            None => Span::styled("not signed in", Style::default().fg(theme::WARNING)),
        };

        let mode_indicator = if self.view_is_capturing_input() {
            Span::styled(" INPUT ", theme::insert_badge())
        } else {
            Span::raw("")
        };

        let status = Line::from(vec![
            Span::styled(" BookHub ", theme::brand_badge()),
            Span::raw(" "),
            mode_indicator,
            Span::raw(" "),
            Span::styled(
                self.focus.label(),
                Style::default()
                    .fg(theme::PRIMARY_LIGHT)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" │ "),
            user,
            Span::raw(" │ "),
            Span::styled("Tab", theme::key_hint()),
            Span::raw(":nav "),
            Span::styled("?", theme::key_hint()),
            Span::raw(":help "),
            Span::styled("q", theme::key_hint()),
            Span::raw(":quit"),
        ]);

        frame.render_widget(Paragraph::new(status), area);
    }

    fn render_notifications(&self, frame: &mut Frame, area: Rect) {
        if self.notifications.is_empty() {
            return;
        }

        let max_width = 50.min(area.width.saturating_sub(2));
        let height = (self.notifications.len() as u16).min(area.height);
        let x = area.width.saturating_sub(max_width + 1);
        let notification_area = Rect::new(x, 1.min(area.height.saturating_sub(height)), max_width, height);

        let lines: Vec<Line> = self
            .notifications
            .iter()
            .map(|n| {
                let (prefix, color) = match n.level {
                    NotificationLevel::Info => ("ℹ", theme::INFO),
                    NotificationLevel::Success => ("✓", theme::SUCCESS),
                    NotificationLevel::Warning => ("⚠", theme::WARNING),
                    NotificationLevel::Error => ("✗", theme::ERROR),
                };
                Line::from(vec![
                    Span::styled(
                        format!(" {prefix} "),
                        Style::default().fg(color).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(n.message.as_str()),
                ])
            })
            .collect();

        frame.render_widget(Clear, notification_area);
        frame.render_widget(Paragraph::new(lines), notification_area);
    }

    fn render_help_modal(&self, frame: &mut Frame, area: Rect) {
        let modal = centered_rect(60, 80, area);

        let keybindings = [
            ("Global:", ""),
            ("q", "Quit application"),
            ("?", "Toggle this help"),
            ("Tab / Shift+Tab", "Next / previous view"),
            ("1-3", "Jump to view by number"),
            ("R", "Refresh everything"),
            ("Ctrl+R", "Reload session"),
            ("L", "Log out"),
            ("Ctrl+C", "Force quit"),
            ("", ""),
            ("Browse:", ""),
            ("/", "Search titles (Esc/Enter to leave)"),
            ("g / G", "Next / previous genre"),
            ("j/k", "Move selection"),
            ("Enter / x", "Request exchange"),
            ("r", "Refresh catalog"),
            ("", ""),
            ("Exchange dialog:", ""),
            ("Space", "Choose the book to offer"),
            ("Enter", "Send request"),
            ("Esc", "Cancel"),
            ("", ""),
            ("Exchanges:", ""),
            ("h/l", "Received / sent"),
            ("a / x", "Accept / reject (pending, received)"),
            ("", ""),
            ("Your Books:", ""),
            ("a", "Add a book"),
            ("e / Enter", "Edit selected book"),
            ("d", "Delete selected book"),
        ];

        let mut lines = vec![
            Line::raw(""),
            Line::from(Span::styled(" Keybindings", theme::title())),
            Line::raw(""),
        ];

        for (key, desc) in keybindings {
            if key.is_empty() {
                lines.push(Line::raw(""));
            } else if desc.is_empty() {
                lines.push(Line::from(Span::styled(format!("  {key}"), theme::title())));
            } else {
                lines.push(Line::from(vec![
                    Span::raw("  "),
                    Span::styled(format!("{key:<18}"), theme::key_hint()),
                    Span::raw(desc),
                ]));
            }
        }

        lines.push(Line::raw(""));
        lines.push(Line::from(vec![
            Span::raw("  Press "),
            Span::styled("?", theme::key_hint()),
            Span::raw(" or "),
            Span::styled("Esc", theme::key_hint()),
            Span::raw(" to close"),
        ]));

        let block = Block::default()
            .title(" Help ")
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::ACCENT));

        frame.render_widget(Clear, modal);
        frame.render_widget(Paragraph::new(lines).block(block), modal);
    }
}

/// Calculate a centered rect using percentage of parent area.
pub(super) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .split(area);

    Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(popup_layout[1])[1]
}
