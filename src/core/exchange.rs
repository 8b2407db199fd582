//! Exchange orchestration: "offer one of my books for one of theirs".
//!
//! [`ExchangeDialog`] is the dialog state machine:
//!
//! ```text
//! Idle ──open──▶ Selecting ──select──▶ Confirming ──begin_submit──▶ Submitting
//!  ▲                                      ▲                            │
//!  │                                      └──────── submit_failed ─────┤
//!  └──────────────────────────────────────────────── submit_succeeded ─┘
//! ```
//!
//! The state machine is synchronous; the network side lives in
//! [`fetch_offerable_books`] and [`submit_exchange`], which the UI spawns and
//! feeds back into the dialog.

use std::collections::HashSet;

use super::api::ExchangeApi;
use super::error::{ApiError, Result};
use super::models::{Book, BookId, EnrichedBook, ExchangeProposal, ExchangeRequest, UserId};
use super::query::{CacheInvalidator, QueryKey};

/// The requester's own books while the dialog is selecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferableBooks {
    Loading,
    Loaded(Vec<Book>),
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExchangeState {
    #[default]
    Idle,
    /// Dialog open; the requester's books are being fetched or shown.
    Selecting {
        target: EnrichedBook,
        offerable: OfferableBooks,
    },
    /// One offered book picked.
    Confirming {
        target: EnrichedBook,
        offerable: Vec<Book>,
        offered: BookId,
    },
    /// Proposal in flight.
    Submitting {
        target: EnrichedBook,
        offerable: Vec<Book>,
        offered: BookId,
    },
}

/// What the dialog body should say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogMessage<'a> {
    Closed,
    Loading,
    /// Loaded, and the requester owns nothing to offer.
    NothingToOffer,
    LoadFailed(&'a str),
    Choose { title: &'a str, author: &'a str },
}

#[derive(Debug, Default)]
pub struct ExchangeDialog {
    state: ExchangeState,
    /// Books successfully requested during this session.
    requested: HashSet<BookId>,
}

impl ExchangeDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ExchangeState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, ExchangeState::Idle)
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, ExchangeState::Submitting { .. })
    }

    pub fn was_requested(&self, book_id: &BookId) -> bool {
        self.requested.contains(book_id)
    }

    pub fn target(&self) -> Option<&EnrichedBook> {
        match &self.state {
            ExchangeState::Idle => None,
            ExchangeState::Selecting { target, .. }
            | ExchangeState::Confirming { target, .. }
            | ExchangeState::Submitting { target, .. } => Some(target),
        }
    }

    /// The requester's books once loaded.
    pub fn offerable(&self) -> &[Book] {
        match &self.state {
            ExchangeState::Selecting {
                offerable: OfferableBooks::Loaded(books),
                ..
            }
            | ExchangeState::Confirming {
                offerable: books, ..
            }
            | ExchangeState::Submitting {
                offerable: books, ..
            } => books,
            _ => &[],
        }
    }

    pub fn offered(&self) -> Option<&BookId> {
        match &self.state {
            ExchangeState::Confirming { offered, .. }
            | ExchangeState::Submitting { offered, .. } => Some(offered),
            _ => None,
        }
    }

    pub fn message(&self) -> DialogMessage<'_> {
        match &self.state {
            ExchangeState::Idle => DialogMessage::Closed,
            ExchangeState::Selecting {
                offerable: OfferableBooks::Loading,
                ..
            } => DialogMessage::Loading,
            ExchangeState::Selecting {
                offerable: OfferableBooks::Failed(reason),
                ..
            } => DialogMessage::LoadFailed(reason),
            ExchangeState::Selecting {
                offerable: OfferableBooks::Loaded(books),
                ..
            } if books.is_empty() => DialogMessage::NothingToOffer,
            ExchangeState::Selecting { target, .. }
            | ExchangeState::Confirming { target, .. }
            | ExchangeState::Submitting { target, .. } => DialogMessage::Choose {
                title: &target.book.title,
                author: &target.book.author,
            },
        }
    }

    /// Idle → Selecting. The caller fetches the requester's books next.
    pub fn open(&mut self, target: EnrichedBook) -> Result<()> {
        if self.is_open() {
            return Err(ApiError::precondition("an exchange dialog is already open"));
        }
        if self.was_requested(target.id()) {
            return Err(ApiError::precondition(format!(
                "\"{}\" has already been requested",
                target.title()
            )));
        }
        if !target.book.is_available {
            return Err(ApiError::precondition(format!(
                "\"{}\" is not available for exchange",
                target.title()
            )));
        }
        log::debug!("Exchange dialog opened for {}", target.id());
        self.state = ExchangeState::Selecting {
            target,
            offerable: OfferableBooks::Loading,
        };
        Ok(())
    }

    /// Deliver the result of the requester's book fetch. Ignored unless the
    /// dialog is still waiting for it.
    pub fn offerable_loaded(&mut self, result: Result<Vec<Book>>) {
        if let ExchangeState::Selecting { offerable, .. } = &mut self.state {
            if *offerable == OfferableBooks::Loading {
                *offerable = match result {
                    Ok(books) => OfferableBooks::Loaded(books),
                    Err(e) => OfferableBooks::Failed(e.to_string()),
                };
            }
        }
    }

    /// Pick the single book to offer. Picking again replaces the choice.
    pub fn select(&mut self, offered: BookId) -> Result<()> {
        if !self.offerable().iter().any(|b| b.id == offered) {
            return Err(ApiError::precondition("the offered book is not one of yours"));
        }
        let state = std::mem::take(&mut self.state);
        self.state = match state {
            ExchangeState::Selecting {
                target,
                offerable: OfferableBooks::Loaded(offerable),
            }
            | ExchangeState::Confirming {
                target, offerable, ..
            } => ExchangeState::Confirming {
                target,
                offerable,
                offered,
            },
            other => {
                self.state = other;
                return Err(ApiError::precondition("nothing to select right now"));
            }
        };
        Ok(())
    }

    /// Confirming → Submitting, returning the proposal to send. Blank ids
    /// are rejected here and the state is left unchanged.
    pub fn begin_submit(&mut self, requester: &UserId) -> Result<ExchangeProposal> {
        let ExchangeState::Confirming { target, offered, .. } = &self.state else {
            return Err(ApiError::precondition("pick a book to offer first"));
        };
        let proposal = ExchangeProposal::new(requester.clone(), target.id().clone(), offered.clone());
        proposal.validate()?;

        if let ExchangeState::Confirming {
            target,
            offerable,
            offered,
        } = std::mem::take(&mut self.state)
        {
            self.state = ExchangeState::Submitting {
                target,
                offerable,
                offered,
            };
        }
        Ok(proposal)
    }

    /// Submitting → Idle. The selection is cleared and the target remembered
    /// as requested.
    pub fn submit_succeeded(&mut self) {
        if let ExchangeState::Submitting { target, .. } = std::mem::take(&mut self.state) {
            self.requested.insert(target.id().clone());
        }
    }

    /// Submitting → Confirming with the selection retained for a retry.
    pub fn submit_failed(&mut self) {
        let state = std::mem::take(&mut self.state);
        self.state = match state {
            ExchangeState::Submitting {
                target,
                offerable,
                offered,
            } => ExchangeState::Confirming {
                target,
                offerable,
                offered,
            },
            other => other,
        };
    }

    /// Close the dialog. A proposal in flight cannot be cancelled.
    pub fn cancel(&mut self) -> bool {
        if self.is_submitting() {
            return false;
        }
        self.state = ExchangeState::Idle;
        true
    }
}

/// Fetch the books the requester can offer.
pub async fn fetch_offerable_books(api: &dyn ExchangeApi, requester: &UserId) -> Result<Vec<Book>> {
    if requester.is_blank() {
        return Err(ApiError::NotSignedIn);
    }
    api.list_owned_by(requester).await
}

/// Send a proposal. Invalid proposals never reach the network; a successful
/// submission invalidates the catalog once.
pub async fn submit_exchange(
    api: &dyn ExchangeApi,
    invalidator: &CacheInvalidator,
    proposal: &ExchangeProposal,
) -> Result<ExchangeRequest> {
    proposal.validate()?;
    let request = api.create_exchange(proposal).await?;
    invalidator.invalidate(QueryKey::Catalog);
    Ok(request)
}
