//! Shared display-name resolver.
//!
//! Owner names (catalog) and requester names (inbox) come from the same
//! lookup endpoint. The resolver issues at most one lookup per distinct user
//! id per refresh cycle; concurrent callers asking for the same id await the
//! same in-flight request. Failed lookups are evicted so the next call retries.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use futures::future::{try_join_all, BoxFuture, FutureExt, Shared};

use super::api::ExchangeApi;
use super::error::Result;
use super::models::UserId;

type PendingName = Shared<BoxFuture<'static, Result<String>>>;

#[derive(Default)]
struct Cycle {
    generation: u64,
    entries: HashMap<UserId, PendingName>,
}

#[derive(Clone)]
pub struct NameResolver {
    api: Arc<dyn ExchangeApi>,
    cycle: Arc<Mutex<Cycle>>,
}

impl NameResolver {
    pub fn new(api: Arc<dyn ExchangeApi>) -> Self {
        Self {
            api,
            cycle: Arc::new(Mutex::new(Cycle::default())),
        }
    }

    /// Start a new refresh cycle: names are looked up again on next use.
    pub fn begin_cycle(&self) {
        let mut cycle = self.lock();
        cycle.generation += 1;
        cycle.entries.clear();
        log::trace!("Name resolver cycle {}", cycle.generation);
    }

    /// Number of names cached or in flight in the current cycle.
    pub fn cached_len(&self) -> usize {
        self.lock().entries.len()
    }

    pub async fn resolve(&self, user_id: &UserId) -> Result<String> {
        let (generation, pending) = {
            let mut cycle = self.lock();
            let generation = cycle.generation;
            let pending = cycle
                .entries
                .entry(user_id.clone())
                .or_insert_with(|| {
                    let api = Arc::clone(&self.api);
                    let id = user_id.clone();
                    async move { api.lookup_display_name(&id).await }
                        .boxed()
                        .shared()
                })
                .clone();
            (generation, pending)
        };

        let result = pending.await;
        if let Err(ref e) = result {
            log::warn!("Name lookup for {user_id} failed: {e}");
            let mut cycle = self.lock();
            if cycle.generation == generation {
                cycle.entries.remove(user_id);
            }
        }
        result
    }

    /// Resolve every distinct id concurrently. Fails as a whole if any single
    /// lookup fails.
    pub async fn resolve_all<'a, I>(&self, user_ids: I) -> Result<HashMap<UserId, String>>
    where
        I: IntoIterator<Item = &'a UserId>,
    {
        let mut seen = HashSet::new();
        let distinct: Vec<&UserId> = user_ids.into_iter().filter(|id| seen.insert(*id)).collect();

        let names = try_join_all(distinct.iter().map(|id| self.resolve(id))).await?;
        Ok(distinct.into_iter().cloned().zip(names).collect())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Cycle> {
        // The cache holds no invariants a panicking holder could break.
        self.cycle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::api::MockExchangeApi;
    use crate::core::error::ApiError;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_one_lookup_per_distinct_id() {
        let mut api = MockExchangeApi::new();
        api.expect_lookup_display_name()
            .with(eq(UserId::from("a")))
            .times(1)
            .returning(|_| Ok("Alice".to_string()));
        api.expect_lookup_display_name()
            .with(eq(UserId::from("b")))
            .times(1)
            .returning(|_| Ok("Bob".to_string()));

        let resolver = NameResolver::new(Arc::new(api));
        let ids = [
            UserId::from("a"),
            UserId::from("b"),
            UserId::from("a"),
            UserId::from("a"),
        ];
        let names = resolver.resolve_all(ids.iter()).await.unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names[&UserId::from("a")], "Alice");
        assert_eq!(names[&UserId::from("b")], "Bob");

        // Same cycle: served from cache.
        assert_eq!(resolver.resolve(&UserId::from("b")).await.unwrap(), "Bob");
        assert_eq!(resolver.cached_len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_lookup() {
        let mut api = MockExchangeApi::new();
        api.expect_lookup_display_name()
            .times(1)
            .returning(|_| Ok("Alice".to_string()));

        let resolver = NameResolver::new(Arc::new(api));
        let id = UserId::from("a");
        let (first, second) = tokio::join!(resolver.resolve(&id), resolver.resolve(&id));
        assert_eq!(first.unwrap(), "Alice");
        assert_eq!(second.unwrap(), "Alice");
    }

    #[tokio::test]
    async fn test_new_cycle_looks_up_again() {
        let mut api = MockExchangeApi::new();
        api.expect_lookup_display_name()
            .times(2)
            .returning(|_| Ok("Alice".to_string()));

        let resolver = NameResolver::new(Arc::new(api));
        let id = UserId::from("a");
        resolver.resolve(&id).await.unwrap();
        resolver.begin_cycle();
        assert_eq!(resolver.cached_len(), 0);
        resolver.resolve(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_lookup_is_evicted() {
        let mut api = MockExchangeApi::new();
        let mut seq = mockall::Sequence::new();
        api.expect_lookup_display_name()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(ApiError::Transport("timeout".to_string())));
        api.expect_lookup_display_name()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("Alice".to_string()));

        let resolver = NameResolver::new(Arc::new(api));
        let id = UserId::from("a");
        assert!(resolver.resolve(&id).await.is_err());
        assert_eq!(resolver.cached_len(), 0);
        assert_eq!(resolver.resolve(&id).await.unwrap(), "Alice");
    }

    #[tokio::test]
    async fn test_resolve_all_fails_if_any_lookup_fails() {
        let mut api = MockExchangeApi::new();
        api.expect_lookup_display_name()
            .with(eq(UserId::from("a")))
            .returning(|_| Ok("Alice".to_string()));
        api.expect_lookup_display_name()
            .with(eq(UserId::from("b")))
            .returning(|_| {
                Err(ApiError::Server {
                    status: 500,
                    message: "boom".to_string(),
                })
            });

        let resolver = NameResolver::new(Arc::new(api));
        let ids = [UserId::from("a"), UserId::from("b")];
        assert!(resolver.resolve_all(ids.iter()).await.is_err());
    }
}
