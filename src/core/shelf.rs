//! The signed-in user's own books: list, add, edit, delete.

use super::api::ExchangeApi;
use super::error::{ApiError, Result};
use super::models::{Book, BookId, BookUpdate, Genre, NewBook, UserId};
use super::query::{CacheInvalidator, QueryKey};

pub async fn list_owned(api: &dyn ExchangeApi, owner: &UserId) -> Result<Vec<Book>> {
    if owner.is_blank() {
        return Err(ApiError::NotSignedIn);
    }
    api.list_owned_by(owner).await
}

/// Validate form input and create the book. Blank fields never reach the
/// server.
pub async fn add_book(
    api: &dyn ExchangeApi,
    invalidator: &CacheInvalidator,
    owner: &UserId,
    title: &str,
    author: &str,
    genre: &str,
) -> Result<Book> {
    let new_book = NewBook::validated(title, author, genre, owner)?;
    let book = api.create_book(&new_book).await?;
    log::info!("Added book {} ({})", book.id, book.title);
    invalidator.invalidate(QueryKey::Catalog);
    invalidator.invalidate(QueryKey::OwnedBooks(owner.clone()));
    Ok(book)
}

/// Diff edited form fields against `book`. Only changed fields are sent.
pub fn edit_changes(book: &Book, title: &str, author: &str, genre: &str) -> Result<BookUpdate> {
    let (title, author, genre) = (title.trim(), author.trim(), genre.trim());
    if title.is_empty() {
        return Err(ApiError::precondition("Title is required"));
    }
    if author.is_empty() {
        return Err(ApiError::precondition("Author is required"));
    }
    if genre.is_empty() {
        return Err(ApiError::precondition("Genre is required"));
    }

    Ok(BookUpdate {
        title: (title != book.title).then(|| title.to_string()),
        author: (author != book.author).then(|| author.to_string()),
        genre: (genre != book.genre.as_str()).then(|| Genre::from(genre)),
        is_available: None,
    })
}

/// Flip the listing's availability, leaving every other field untouched.
pub fn availability_toggle(book: &Book) -> BookUpdate {
    BookUpdate {
        is_available: Some(!book.is_available),
        ..BookUpdate::default()
    }
}

pub async fn update_book(
    api: &dyn ExchangeApi,
    invalidator: &CacheInvalidator,
    owner: &UserId,
    book_id: &BookId,
    update: &BookUpdate,
) -> Result<Book> {
    if update.is_empty() {
        return Err(ApiError::precondition("Nothing to update"));
    }
    let book = api.update_book(book_id, update).await?;
    log::info!("Updated book {book_id}");
    invalidator.invalidate(QueryKey::OwnedBooks(owner.clone()));
    invalidator.invalidate(QueryKey::Catalog);
    Ok(book)
}

pub async fn delete_book(
    api: &dyn ExchangeApi,
    invalidator: &CacheInvalidator,
    owner: &UserId,
    book_id: &BookId,
) -> Result<()> {
    api.delete_book(book_id).await?;
    log::info!("Deleted book {book_id}");
    invalidator.invalidate(QueryKey::OwnedBooks(owner.clone()));
    invalidator.invalidate(QueryKey::Catalog);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::api::MockExchangeApi;
    use crate::core::models::UserRef;
    use rstest::rstest;

    fn owner() -> UserId {
        UserId::from("U1")
    }

    fn dune() -> Book {
        Book {
            id: BookId::from("1"),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            genre: Genre::ScienceFiction,
            owner: UserRef::new("U1"),
            is_available: true,
        }
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<QueryKey>) -> Vec<QueryKey> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[tokio::test]
    async fn test_add_book_sends_trimmed_fields() {
        let mut api = MockExchangeApi::new();
        api.expect_create_book()
            .withf(|b| b.title == "Dune" && b.author == "Frank Herbert" && b.owner == UserId::from("U1"))
            .times(1)
            .returning(|_| Ok(dune()));
        let (invalidator, mut rx) = CacheInvalidator::channel();

        let book = add_book(
            &api,
            &invalidator,
            &owner(),
            "  Dune ",
            "Frank Herbert",
            "Science Fiction",
        )
        .await
        .unwrap();

        assert_eq!(book.id, BookId::from("1"));
        assert_eq!(
            drain(&mut rx),
            [QueryKey::Catalog, QueryKey::OwnedBooks(owner())]
        );
    }

    #[rstest]
    #[case("", "Frank Herbert", "Fantasy", "Title is required")]
    #[case("Dune", "   ", "Fantasy", "Author is required")]
    #[case("Dune", "Frank Herbert", "", "Genre is required")]
    #[tokio::test]
    async fn test_add_book_rejects_blank_fields(
        #[case] title: &str,
        #[case] author: &str,
        #[case] genre: &str,
        #[case] message: &str,
    ) {
        let mut api = MockExchangeApi::new();
        api.expect_create_book().never();
        let (invalidator, mut rx) = CacheInvalidator::channel();

        let err = add_book(&api, &invalidator, &owner(), title, author, genre)
            .await
            .unwrap_err();

        assert_eq!(err, ApiError::precondition(message));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_add_book_requires_owner() {
        let mut api = MockExchangeApi::new();
        api.expect_create_book().never();
        let (invalidator, _rx) = CacheInvalidator::channel();
        let err = add_book(&api, &invalidator, &UserId::default(), "Dune", "Herbert", "Fiction")
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::NotSignedIn);
    }

    #[test]
    fn test_edit_changes_only_diffs() {
        let update = edit_changes(&dune(), "Dune", "F. Herbert", "Science Fiction").unwrap();
        assert_eq!(
            update,
            BookUpdate {
                author: Some("F. Herbert".to_string()),
                ..BookUpdate::default()
            }
        );
        assert!(edit_changes(&dune(), " Dune ", "Frank Herbert", "Science Fiction")
            .unwrap()
            .is_empty());
        assert!(edit_changes(&dune(), "", "Frank Herbert", "Fantasy").is_err());
    }

    #[test]
    fn test_availability_toggle_touches_only_flag() {
        let update = availability_toggle(&dune());
        assert_eq!(update.is_available, Some(false));
        assert!(update.title.is_none() && update.genre.is_none());
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({ "isAvailable": false })
        );
    }

    #[tokio::test]
    async fn test_empty_update_is_not_sent() {
        let mut api = MockExchangeApi::new();
        api.expect_update_book().never();
        let (invalidator, _rx) = CacheInvalidator::channel();
        let err = update_book(
            &api,
            &invalidator,
            &owner(),
            &BookId::from("1"),
            &BookUpdate::default(),
        )
        .await
        .unwrap_err();
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn test_update_book_invalidates() {
        let mut api = MockExchangeApi::new();
        api.expect_update_book().times(1).returning(|_, _| Ok(dune()));
        let (invalidator, mut rx) = CacheInvalidator::channel();
        let update = BookUpdate {
            genre: Some(Genre::Fantasy),
            ..BookUpdate::default()
        };
        update_book(&api, &invalidator, &owner(), &BookId::from("1"), &update)
            .await
            .unwrap();
        assert_eq!(
            drain(&mut rx),
            [QueryKey::OwnedBooks(owner()), QueryKey::Catalog]
        );
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_caches() {
        let mut api = MockExchangeApi::new();
        api.expect_delete_book().times(1).returning(|_| {
            Err(ApiError::Server {
                status: 404,
                message: "Book not found".to_string(),
            })
        });
        let (invalidator, mut rx) = CacheInvalidator::channel();
        assert!(delete_book(&api, &invalidator, &owner(), &BookId::from("1"))
            .await
            .is_err());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_list_owned_requires_user() {
        let mut api = MockExchangeApi::new();
        api.expect_list_owned_by().never();
        assert_eq!(
            list_owned(&api, &UserId::default()).await.unwrap_err(),
            ApiError::NotSignedIn
        );
    }
}
