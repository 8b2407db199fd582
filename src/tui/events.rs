use crate::core::models::User;
use crate::core::query::QueryKey;

/// Events flowing through the Elm-architecture event loop.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Periodic tick for notification TTLs and polling view data.
    Tick,
    /// Raw terminal input (keyboard/mouse).
    Input(crossterm::event::Event),
    /// A resolved action to execute.
    Action(Action),
    /// Notification to display to the user.
    Notification(Notification),
    /// A cached query went stale and should be refetched.
    Invalidate(QueryKey),
    /// The session user changed (sign-in, refetch, logout).
    SessionChanged(Option<User>),
    /// Request to quit the application.
    Quit,
}

/// High-level actions dispatched by the input mapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // Navigation
    FocusCatalog,
    FocusRequests,
    FocusShelf,
    TabNext,
    TabPrev,

    // Modals
    ShowHelp,
    CloseHelp,

    // Session
    RefetchSession,
    Logout,

    // Application
    RefreshAll,
    Quit,
}

/// Which top-level view has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Focus {
    Catalog,
    Requests,
    Shelf,
}

impl Focus {
    pub const ALL: [Focus; 3] = [Focus::Catalog, Focus::Requests, Focus::Shelf];

    pub fn label(self) -> &'static str {
        match self {
            Focus::Catalog => "Browse",
            Focus::Requests => "Exchanges",
            Focus::Shelf => "Your Books",
        }
    }

    pub fn to_action(self) -> Action {
        match self {
            Focus::Catalog => Action::FocusCatalog,
            Focus::Requests => Action::FocusRequests,
            Focus::Shelf => Action::FocusShelf,
        }
    }

    pub fn next(self) -> Focus {
        let idx = Focus::ALL.iter().position(|&f| f == self).unwrap_or(0);
        Focus::ALL[(idx + 1) % Focus::ALL.len()]
    }

    pub fn prev(self) -> Focus {
        let idx = Focus::ALL.iter().position(|&f| f == self).unwrap_or(0);
        Focus::ALL[(idx + Focus::ALL.len() - 1) % Focus::ALL.len()]
    }
}

/// Notification level for the overlay system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A timed notification shown in the overlay.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub level: NotificationLevel,
    /// Ticks remaining before auto-dismiss.
    pub ttl_ticks: u32,
}

impl Notification {
    /// Default lifetime: 100 ticks, five seconds at the default tick rate.
    pub const DEFAULT_TTL: u32 = 100;

    /// The id is assigned by `AppState` when the notification is shown.
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            id: 0,
            message: message.into(),
            level,
            ttl_ticks: Self::DEFAULT_TTL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_cycles() {
        let mut f = Focus::Catalog;
        for _ in 0..Focus::ALL.len() {
            f = f.next();
        }
        assert_eq!(f, Focus::Catalog);
        assert_eq!(Focus::Catalog.prev(), Focus::Shelf);
        assert_eq!(Focus::Catalog.next(), Focus::Requests);
    }

    #[test]
    fn test_focus_actions_are_distinct() {
        let actions: Vec<Action> = Focus::ALL.iter().map(|f| f.to_action()).collect();
        for (i, a) in actions.iter().enumerate() {
            assert!(!actions[i + 1..].contains(a));
        }
    }
}
