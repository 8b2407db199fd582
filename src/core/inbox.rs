//! Request inbox: the user's sent and received exchange requests.
//!
//! The server partitions requests; the client only attaches requester
//! display names and guards the accept/reject transition.

use super::api::ExchangeApi;
use super::error::{ApiError, Result};
use super::models::{Decision, ExchangeRequest, StatusUpdate, UserId};
use super::query::{CacheInvalidator, QueryKey};
use super::resolver::NameResolver;

/// Which side of an exchange the user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Sent,
    Received,
}

impl Partition {
    pub fn label(self) -> &'static str {
        match self {
            Self::Sent => "Sent",
            Self::Received => "Received",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxEntry {
    pub request: ExchangeRequest,
    pub requester_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inbox {
    pub sent: Vec<InboxEntry>,
    pub received: Vec<InboxEntry>,
}

impl Inbox {
    pub fn partition(&self, partition: Partition) -> &[InboxEntry] {
        match partition {
            Partition::Sent => &self.sent,
            Partition::Received => &self.received,
        }
    }

    pub fn pending_received(&self) -> usize {
        self.received
            .iter()
            .filter(|e| can_decide(Partition::Received, &e.request))
            .count()
    }
}

/// Only received requests that are still pending can be accepted or rejected.
pub fn can_decide(partition: Partition, request: &ExchangeRequest) -> bool {
    partition == Partition::Received && !request.status.is_terminal()
}

/// Fetch both partitions for `user_id` and resolve requester names.
pub async fn load_inbox(
    api: &dyn ExchangeApi,
    resolver: &NameResolver,
    user_id: &UserId,
) -> Result<Inbox> {
    if user_id.is_blank() {
        return Err(ApiError::NotSignedIn);
    }
    let requests = api.list_exchange_requests(user_id).await?;

    let names = resolver
        .resolve_all(
            requests
                .sent
                .iter()
                .chain(&requests.received)
                .map(|r| &r.requester.id),
        )
        .await?;

    let attach = |list: Vec<ExchangeRequest>| -> Vec<InboxEntry> {
        list.into_iter()
            .map(|request| {
                let requester_name = names
                    .get(&request.requester.id)
                    .cloned()
                    .or_else(|| request.requester.name.clone())
                    .unwrap_or_default();
                InboxEntry {
                    request,
                    requester_name,
                }
            })
            .collect()
    };

    let inbox = Inbox {
        sent: attach(requests.sent),
        received: attach(requests.received),
    };
    log::debug!(
        "Inbox for {user_id}: {} sent, {} received",
        inbox.sent.len(),
        inbox.received.len()
    );
    Ok(inbox)
}

/// Accept or reject a request.
///
/// Returns `Ok(None)` without touching the network when the request is not
/// decidable from `partition`. On success the user's request list is
/// invalidated; the local copy is not updated.
pub async fn decide(
    api: &dyn ExchangeApi,
    invalidator: &CacheInvalidator,
    user_id: &UserId,
    partition: Partition,
    request: &ExchangeRequest,
    decision: Decision,
) -> Result<Option<ExchangeRequest>> {
    if !can_decide(partition, request) {
        log::debug!(
            "Ignoring {decision:?} on {} request {} ({})",
            partition.label(),
            request.id,
            request.status.as_str()
        );
        return Ok(None);
    }

    let update = StatusUpdate {
        status: decision.target_status(),
    };
    let updated = api.update_exchange_status(&request.id, &update).await?;
    log::info!("Request {} is now {}", request.id, updated.status.as_str());
    invalidator.invalidate(QueryKey::ExchangeRequests(user_id.clone()));
    Ok(Some(updated))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::api::MockExchangeApi;
    use crate::core::models::{
        BookId, BookSummary, ExchangeRequests, ExchangeStatus, RequestId, UserRef,
    };
    use mockall::predicate::{always, eq};
    use rstest::rstest;

    fn request(id: &str, requester: &str, status: ExchangeStatus) -> ExchangeRequest {
        ExchangeRequest {
            id: RequestId::from(id),
            requester: UserRef::new(requester),
            requested_book: BookSummary {
                id: BookId::from("2"),
                title: Some("Emma".to_string()),
                author: Some("Jane Austen".to_string()),
            },
            offered_book: BookSummary {
                id: BookId::from("5"),
                title: None,
                author: None,
            },
            status,
        }
    }

    #[rstest]
    #[case(Partition::Received, ExchangeStatus::Pending, true)]
    #[case(Partition::Received, ExchangeStatus::Accepted, false)]
    #[case(Partition::Received, ExchangeStatus::Rejected, false)]
    #[case(Partition::Sent, ExchangeStatus::Pending, false)]
    fn test_can_decide(
        #[case] partition: Partition,
        #[case] status: ExchangeStatus,
        #[case] expected: bool,
    ) {
        assert_eq!(can_decide(partition, &request("r", "u", status)), expected);
    }

    #[tokio::test]
    async fn test_load_inbox_resolves_each_requester_once() {
        let mut api = MockExchangeApi::new();
        api.expect_list_exchange_requests()
            .with(eq(UserId::from("U1")))
            .times(1)
            .returning(|_| {
                Ok(ExchangeRequests {
                    sent: vec![request("s1", "U1", ExchangeStatus::Pending)],
                    received: vec![
                        request("r1", "U2", ExchangeStatus::Pending),
                        request("r2", "U2", ExchangeStatus::Accepted),
                    ],
                })
            });
        api.expect_lookup_display_name()
            .with(eq(UserId::from("U1")))
            .times(1)
            .returning(|_| Ok("Una".to_string()));
        api.expect_lookup_display_name()
            .with(eq(UserId::from("U2")))
            .times(1)
            .returning(|_| Ok("Dos".to_string()));

        let api: Arc<MockExchangeApi> = Arc::new(api);
        let resolver = NameResolver::new(api.clone());
        let inbox = load_inbox(api.as_ref(), &resolver, &UserId::from("U1"))
            .await
            .unwrap();

        assert_eq!(inbox.sent[0].requester_name, "Una");
        assert_eq!(inbox.received.len(), 2);
        assert!(inbox.received.iter().all(|e| e.requester_name == "Dos"));
        assert_eq!(inbox.pending_received(), 1);
    }

    #[tokio::test]
    async fn test_load_inbox_surfaces_lookup_failure() {
        let mut api = MockExchangeApi::new();
        api.expect_list_exchange_requests().returning(|_| {
            Ok(ExchangeRequests {
                sent: Vec::new(),
                received: vec![request("r1", "U2", ExchangeStatus::Pending)],
            })
        });
        api.expect_lookup_display_name()
            .returning(|_| Err(ApiError::Transport("timeout".to_string())));

        let api: Arc<MockExchangeApi> = Arc::new(api);
        let resolver = NameResolver::new(api.clone());
        assert!(load_inbox(api.as_ref(), &resolver, &UserId::from("U1"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_load_inbox_requires_user() {
        let mut api = MockExchangeApi::new();
        api.expect_list_exchange_requests().never();
        let api: Arc<MockExchangeApi> = Arc::new(api);
        let resolver = NameResolver::new(api.clone());
        let err = load_inbox(api.as_ref(), &resolver, &UserId::default())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::NotSignedIn);
    }

    #[tokio::test]
    async fn test_accept_pending_received_request() {
        let mut api = MockExchangeApi::new();
        api.expect_update_exchange_status()
            .with(
                eq(RequestId::from("r1")),
                eq(StatusUpdate {
                    status: ExchangeStatus::Accepted,
                }),
            )
            .times(1)
            .returning(|_, _| Ok(request("r1", "U2", ExchangeStatus::Accepted)));
        let (invalidator, mut rx) = CacheInvalidator::channel();

        let updated = decide(
            &api,
            &invalidator,
            &UserId::from("U1"),
            Partition::Received,
            &request("r1", "U2", ExchangeStatus::Pending),
            Decision::Accept,
        )
        .await
        .unwrap();

        assert_eq!(updated.map(|r| r.status), Some(ExchangeStatus::Accepted));
        assert_eq!(
            rx.try_recv().unwrap(),
            QueryKey::ExchangeRequests(UserId::from("U1"))
        );
    }

    #[rstest]
    #[case(Partition::Received, ExchangeStatus::Rejected)]
    #[case(Partition::Received, ExchangeStatus::Accepted)]
    #[case(Partition::Sent, ExchangeStatus::Pending)]
    #[tokio::test]
    async fn test_undecidable_requests_are_noops(
        #[case] partition: Partition,
        #[case] status: ExchangeStatus,
    ) {
        let mut api = MockExchangeApi::new();
        api.expect_update_exchange_status()
            .with(always(), always())
            .never();
        let (invalidator, mut rx) = CacheInvalidator::channel();

        let result = decide(
            &api,
            &invalidator,
            &UserId::from("U1"),
            partition,
            &request("r1", "U2", status),
            Decision::Reject,
        )
        .await
        .unwrap();

        assert!(result.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_decision_does_not_invalidate() {
        let mut api = MockExchangeApi::new();
        api.expect_update_exchange_status().returning(|_, _| {
            Err(ApiError::Server {
                status: 403,
                message: "Forbidden".to_string(),
            })
        });
        let (invalidator, mut rx) = CacheInvalidator::channel();

        let err = decide(
            &api,
            &invalidator,
            &UserId::from("U1"),
            Partition::Received,
            &request("r1", "U2", ExchangeStatus::Pending),
            Decision::Reject,
        )
        .await
        .unwrap_err();

        assert!(err.is_validation());
        assert!(rx.try_recv().is_err());
    }
}
