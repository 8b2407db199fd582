//! Session context: the signed-in user, shared by every view.
//!
//! Constructed once at startup and initialized explicitly with
//! [`SessionContext::initialize`]. Readers either take a snapshot with
//! [`SessionContext::current`] or subscribe to changes. Only the context's own
//! operations write the user.

use std::sync::Arc;

use tokio::sync::watch;

use super::api::ExchangeApi;
use super::error::Result;
use super::models::User;

#[derive(Debug, Clone)]
pub struct SessionContext {
    user_tx: Arc<watch::Sender<Option<User>>>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        let (user_tx, _) = watch::channel(None);
        Self {
            user_tx: Arc::new(user_tx),
        }
    }

    /// Snapshot of the current user.
    pub fn current(&self) -> Option<User> {
        self.user_tx.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.user_tx.borrow().is_some()
    }

    /// Receive every subsequent change of the session user.
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.user_tx.subscribe()
    }

    pub fn set(&self, user: Option<User>) {
        self.user_tx.send_if_modified(|current| {
            if *current == user {
                return false;
            }
            *current = user;
            true
        });
    }

    /// Startup step: load the user of the existing server session.
    pub async fn initialize(&self, api: &dyn ExchangeApi) -> Option<User> {
        log::info!("Initializing session");
        self.refetch(api).await
    }

    /// Reload the user from the server. Any failure clears the session.
    pub async fn refetch(&self, api: &dyn ExchangeApi) -> Option<User> {
        match api.refetch_session().await {
            Ok(user) => {
                log::info!("Session user: {} <{}>", user.name, user.email);
                self.set(Some(user.clone()));
                Some(user)
            }
            Err(e) => {
                log::warn!("Session refetch failed: {e}");
                self.set(None);
                None
            }
        }
    }

    /// End the server session. The local user is cleared even when the
    /// server call fails; the failure is still reported.
    pub async fn logout(&self, api: &dyn ExchangeApi) -> Result<()> {
        let result = api.logout().await;
        if let Err(ref e) = result {
            log::warn!("Logout failed: {e}");
        }
        self.set(None);
        result
    }
}
