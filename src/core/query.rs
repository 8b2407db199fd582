//! Query keys, cache invalidation and fetch sequencing.
//!
//! Views own their fetched data and refetch it when a [`QueryKey`] they care
//! about is invalidated. Invalidations travel over an unbounded channel so a
//! mutation finishing after its view is gone still reaches whoever listens.
//!
//! Overlapping fetches of the same query (timer and invalidation driven) are
//! ordered with [`FetchSequencer`]: only the response to the most recently
//! issued fetch may commit.

use tokio::sync::mpsc;

use super::models::UserId;

/// Identifies a remotely fetched data set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// The global catalog (`GET /api/books`).
    Catalog,
    /// Sent/received exchange requests of a user.
    ExchangeRequests(UserId),
    /// Books owned by a user.
    OwnedBooks(UserId),
}

/// Sending half of the invalidation bus.
#[derive(Debug, Clone)]
pub struct CacheInvalidator {
    tx: mpsc::UnboundedSender<QueryKey>,
}

impl CacheInvalidator {
    /// Create an invalidator and the receiver that observes it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<QueryKey>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn invalidate(&self, key: QueryKey) {
        log::debug!("Invalidating {key:?}");
        if self.tx.send(key).is_err() {
            log::debug!("Invalidation dropped: no listener");
        }
    }
}

/// Token handed to a fetch when it is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchToken(u64);

/// Monotonic fetch counter for one query.
#[derive(Debug, Default)]
pub struct FetchSequencer {
    latest: u64,
}

impl FetchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token for a new fetch, superseding every earlier one.
    pub fn issue(&mut self) -> FetchToken {
        self.latest += 1;
        FetchToken(self.latest)
    }

    /// Whether a response carrying `token` may commit.
    pub fn is_current(&self, token: FetchToken) -> bool {
        token.0 == self.latest
    }

    /// Most recently issued token, if any.
    pub fn latest(&self) -> Option<FetchToken> {
        (self.latest > 0).then_some(FetchToken(self.latest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_latest_token_commits() {
        let mut seq = FetchSequencer::new();
        let timer = seq.issue();
        let invalidation = seq.issue();
        assert!(!seq.is_current(timer));
        assert!(seq.is_current(invalidation));
    }

    #[test]
    fn test_tokens_are_monotonic() {
        let mut seq = FetchSequencer::new();
        assert_eq!(seq.latest(), None);
        let a = seq.issue();
        let b = seq.issue();
        assert!(b > a);
        assert_eq!(seq.latest(), Some(b));
    }

    #[tokio::test]
    async fn test_invalidations_reach_listener() {
        let (invalidator, mut rx) = CacheInvalidator::channel();
        invalidator.invalidate(QueryKey::Catalog);
        invalidator.invalidate(QueryKey::OwnedBooks(UserId::from("u1")));
        assert_eq!(rx.recv().await, Some(QueryKey::Catalog));
        assert_eq!(
            rx.recv().await,
            Some(QueryKey::OwnedBooks(UserId::from("u1")))
        );
    }

    #[test]
    fn test_invalidate_without_listener_does_not_panic() {
        let (invalidator, rx) = CacheInvalidator::channel();
        drop(rx);
        invalidator.invalidate(QueryKey::Catalog);
    }
}
