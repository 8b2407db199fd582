use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::core::api::ExchangeApi;
use crate::core::models::User;
use crate::core::query::CacheInvalidator;
use crate::core::resolver::NameResolver;
use crate::core::session::SessionContext;

use super::events::{AppEvent, Notification, NotificationLevel};

/// Centralized handle to all backend services.
///
/// Created once at startup, then passed by reference to views. Every field
/// is cheap to clone into a spawned task.
pub struct Services {
    pub api: Arc<dyn ExchangeApi>,
    pub session: SessionContext,
    pub resolver: NameResolver,
    pub invalidator: CacheInvalidator,
    pub config: AppConfig,
    pub event_tx: mpsc::UnboundedSender<AppEvent>,
}

impl Services {
    pub fn new(
        api: Arc<dyn ExchangeApi>,
        session: SessionContext,
        invalidator: CacheInvalidator,
        config: AppConfig,
        event_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let resolver = NameResolver::new(Arc::clone(&api));
        Self {
            api,
            session,
            resolver,
            invalidator,
            config,
            event_tx,
        }
    }

    /// The signed-in user, if any.
    pub fn viewer(&self) -> Option<User> {
        self.session.current()
    }

    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        notify(&self.event_tx, level, message);
    }
}

/// Send a notification from a spawned task.
pub fn notify(
    tx: &mpsc::UnboundedSender<AppEvent>,
    level: NotificationLevel,
    message: impl Into<String>,
) {
    let _ = tx.send(AppEvent::Notification(Notification::new(level, message)));
}
