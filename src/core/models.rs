//! Wire and domain types for the book exchange API.
//!
//! Field names follow the server's JSON (`_id`, camelCase). References to
//! users and books arrive either as a bare id string or as a populated object
//! depending on the endpoint, so the reference types accept both shapes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{ApiError, Result};

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Empty or whitespace-only ids never identify a record.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

opaque_id!(
    /// Server-assigned book identity.
    BookId
);
opaque_id!(
    /// Server-assigned user identity.
    UserId
);
opaque_id!(
    /// Server-assigned exchange request identity.
    RequestId
);

// ============================================================================
// Users
// ============================================================================

/// The signed-in user as returned by the session refetch endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub email: String,
    pub name: String,
}

/// A reference to a user, optionally carrying a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UserRefRepr")]
pub struct UserRef {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UserRef {
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UserRefRepr {
    Id(UserId),
    Populated {
        #[serde(rename = "_id")]
        id: UserId,
        #[serde(default, alias = "username")]
        name: Option<String>,
    },
}

impl From<UserRefRepr> for UserRef {
    fn from(repr: UserRefRepr) -> Self {
        match repr {
            UserRefRepr::Id(id) => Self { id, name: None },
            UserRefRepr::Populated { id, name } => Self { id, name },
        }
    }
}

// ============================================================================
// Books
// ============================================================================

/// Book genre. The known set is what the add-book form offers; anything
/// else the server sends is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Genre {
    Fiction,
    NonFiction,
    Mystery,
    ScienceFiction,
    Fantasy,
    Other(String),
}

impl Genre {
    /// Genres offered when adding a book, in display order.
    pub const KNOWN: [Genre; 5] = [
        Genre::Fiction,
        Genre::NonFiction,
        Genre::Mystery,
        Genre::ScienceFiction,
        Genre::Fantasy,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Fiction => "Fiction",
            Self::NonFiction => "Non-Fiction",
            Self::Mystery => "Mystery",
            Self::ScienceFiction => "Science Fiction",
            Self::Fantasy => "Fantasy",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for Genre {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Fiction" => Self::Fiction,
            "Non-Fiction" => Self::NonFiction,
            "Mystery" => Self::Mystery,
            "Science Fiction" => Self::ScienceFiction,
            "Fantasy" => Self::Fantasy,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for Genre {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Genre> for String {
    fn from(genre: Genre) -> Self {
        match genre {
            Genre::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn available_by_default() -> bool {
    true
}

/// A catalog entry. Only the server may change `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    #[serde(rename = "_id")]
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub owner: UserRef,
    #[serde(rename = "isAvailable", default = "available_by_default")]
    pub is_available: bool,
}

/// A book plus its resolved owner display name. Client-only, rebuilt
/// wholesale on every enrichment run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedBook {
    pub book: Book,
    pub owner_name: String,
}

impl EnrichedBook {
    pub fn id(&self) -> &BookId {
        &self.book.id
    }

    pub fn title(&self) -> &str {
        &self.book.title
    }

    pub fn genre(&self) -> &Genre {
        &self.book.genre
    }
}

/// Body of `POST /api/books`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub owner: UserId,
}

impl NewBook {
    /// Build a new book from form input, trimming fields and rejecting
    /// blanks before anything is sent.
    pub fn validated(title: &str, author: &str, genre: &str, owner: &UserId) -> Result<Self> {
        let title = title.trim();
        let author = author.trim();
        let genre = genre.trim();
        if title.is_empty() {
            return Err(ApiError::precondition("Title is required"));
        }
        if author.is_empty() {
            return Err(ApiError::precondition("Author is required"));
        }
        if genre.is_empty() {
            return Err(ApiError::precondition("Genre is required"));
        }
        if owner.is_blank() {
            return Err(ApiError::NotSignedIn);
        }
        Ok(Self {
            title: title.to_string(),
            author: author.to_string(),
            genre: Genre::from(genre),
            owner: owner.clone(),
        })
    }
}

/// Body of `PUT /api/books/{id}`; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<Genre>,
    #[serde(rename = "isAvailable", skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
}

impl BookUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.genre.is_none()
            && self.is_available.is_none()
    }
}

// ============================================================================
// Exchange requests
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ExchangeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// Accepted and rejected are terminal.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The book side of an exchange request. Title and author may be missing
/// when the server did not populate the reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BookSummaryRepr")]
pub struct BookSummary {
    #[serde(rename = "_id")]
    pub id: BookId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl BookSummary {
    pub fn title_or_placeholder(&self) -> &str {
        self.title.as_deref().unwrap_or("No title")
    }

    pub fn author_or_placeholder(&self) -> &str {
        self.author.as_deref().unwrap_or("Unknown author")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BookSummaryRepr {
    Id(BookId),
    Populated {
        #[serde(rename = "_id")]
        id: BookId,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        author: Option<String>,
    },
}

impl From<BookSummaryRepr> for BookSummary {
    fn from(repr: BookSummaryRepr) -> Self {
        match repr {
            BookSummaryRepr::Id(id) => Self {
                id,
                title: None,
                author: None,
            },
            BookSummaryRepr::Populated { id, title, author } => Self { id, title, author },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRequest {
    #[serde(rename = "_id")]
    pub id: RequestId,
    pub requester: UserRef,
    /// Owned by the request's recipient.
    #[serde(rename = "requestedBook")]
    pub requested_book: BookSummary,
    /// Owned by the requester.
    #[serde(rename = "offeredBook")]
    pub offered_book: BookSummary,
    pub status: ExchangeStatus,
}

/// `GET /api/books/user-exchanges/{userId}`, partitioned by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRequests {
    #[serde(default)]
    pub sent: Vec<ExchangeRequest>,
    #[serde(default)]
    pub received: Vec<ExchangeRequest>,
}

/// Body of `POST /api/books/exchange`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeProposal {
    pub requester_id: UserId,
    pub requested_book_id: BookId,
    pub offered_book_id: BookId,
}

impl ExchangeProposal {
    pub fn new(requester_id: UserId, requested_book_id: BookId, offered_book_id: BookId) -> Self {
        Self {
            requester_id,
            requested_book_id,
            offered_book_id,
        }
    }

    /// Reject proposals with a blank id before they reach the network.
    pub fn validate(&self) -> Result<()> {
        if self.requester_id.is_blank() {
            return Err(ApiError::precondition("exchange proposal has no requester"));
        }
        if self.requested_book_id.is_blank() {
            return Err(ApiError::precondition("exchange proposal has no requested book"));
        }
        if self.offered_book_id.is_blank() {
            return Err(ApiError::precondition("exchange proposal has no offered book"));
        }
        if self.requested_book_id == self.offered_book_id {
            return Err(ApiError::precondition("a book cannot be exchanged for itself"));
        }
        Ok(())
    }
}

/// The two transitions a recipient may apply to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn target_status(self) -> ExchangeStatus {
        match self {
            Self::Accept => ExchangeStatus::Accepted,
            Self::Reject => ExchangeStatus::Rejected,
        }
    }
}

/// Body of `PUT /api/books/exchange/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub status: ExchangeStatus,
}
