//! Test Fixtures
//!
//! Builders for books, users and exchange requests, plus a mock API whose
//! name lookup answers `name-<id>` for every user.

use crate::core::api::MockExchangeApi;
use crate::core::models::{
    Book, BookId, BookSummary, EnrichedBook, ExchangeRequest, ExchangeStatus, Genre, RequestId,
    User, UserId, UserRef,
};

pub fn user(id: &str, name: &str) -> User {
    User {
        id: UserId::from(id),
        email: format!("{id}@example.com"),
        name: name.to_string(),
    }
}

pub fn book(id: &str, title: &str, genre: &str, owner: &str) -> Book {
    Book {
        id: BookId::from(id),
        title: title.to_string(),
        author: format!("Author of {title}"),
        genre: Genre::from(genre),
        owner: UserRef::new(owner),
        is_available: true,
    }
}

pub fn enriched(id: &str, title: &str, genre: &str, owner_name: &str) -> EnrichedBook {
    EnrichedBook {
        book: book(id, title, genre, "owner"),
        owner_name: owner_name.to_string(),
    }
}

pub fn summary(id: &str, title: &str) -> BookSummary {
    BookSummary {
        id: BookId::from(id),
        title: Some(title.to_string()),
        author: Some(format!("Author of {title}")),
    }
}

pub fn request(
    id: &str,
    requester: &str,
    requested: BookSummary,
    offered: BookSummary,
    status: ExchangeStatus,
) -> ExchangeRequest {
    ExchangeRequest {
        id: RequestId::from(id),
        requester: UserRef::new(requester),
        requested_book: requested,
        offered_book: offered,
        status,
    }
}

/// Mock API resolving every user id to `name-<id>`.
pub fn naming_api() -> MockExchangeApi {
    let mut api = MockExchangeApi::new();
    api.expect_lookup_display_name()
        .returning(|id| Ok(format!("name-{}", id.as_str())));
    api
}
