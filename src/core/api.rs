//! Book Exchange HTTP Client
//!
//! [`ExchangeApi`] is the seam between the client core and the remote API.
//! [`HttpExchangeApi`] is the reqwest-backed implementation; tests swap in
//! the generated `MockExchangeApi`. Every call is a single request with no
//! retries: transport and server failures come back to the caller as-is.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use crate::config::ApiConfig;

use super::error::{ApiError, Result};
use super::models::{
    Book, BookId, BookUpdate, ExchangeProposal, ExchangeRequest, ExchangeRequests, NewBook,
    RequestId, StatusUpdate, User, UserId,
};

// ============================================================================
// Trait
// ============================================================================

/// The remote operations the client consumes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// `GET /api/books`
    async fn list_catalog(&self) -> Result<Vec<Book>>;

    /// `GET /api/books/user/{userId}`
    async fn list_owned_by(&self, user_id: &UserId) -> Result<Vec<Book>>;

    /// `GET /api/user/auth/info/{userId}`
    async fn lookup_display_name(&self, user_id: &UserId) -> Result<String>;

    /// `POST /api/books`
    async fn create_book(&self, book: &NewBook) -> Result<Book>;

    /// `PUT /api/books/{id}`
    async fn update_book(&self, book_id: &BookId, update: &BookUpdate) -> Result<Book>;

    /// `DELETE /api/books/{id}`
    async fn delete_book(&self, book_id: &BookId) -> Result<()>;

    /// `POST /api/books/exchange`
    async fn create_exchange(&self, proposal: &ExchangeProposal) -> Result<ExchangeRequest>;

    /// `GET /api/books/user-exchanges/{userId}`
    async fn list_exchange_requests(&self, user_id: &UserId) -> Result<ExchangeRequests>;

    /// `PUT /api/books/exchange/{id}`
    async fn update_exchange_status(
        &self,
        request_id: &RequestId,
        update: &StatusUpdate,
    ) -> Result<ExchangeRequest>;

    /// `GET /api/user/auth/refetch`
    async fn refetch_session(&self) -> Result<User>;

    /// `GET /api/user/auth/logout`
    async fn logout(&self) -> Result<()>;
}

// ============================================================================
// HTTP implementation
// ============================================================================

#[derive(Deserialize)]
struct UserInfo {
    name: String,
}

/// reqwest client for the exchange API.
///
/// Session credentials travel as cookies: the cookie store keeps whatever the
/// server sets, and a configured token is sent as the `token` cookie.
#[derive(Debug, Clone)]
pub struct HttpExchangeApi {
    base_url: Url,
    http_client: reqwest::Client,
}

impl HttpExchangeApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;

        let mut headers = HeaderMap::new();
        if let Some(token) = config.auth_token.as_deref().filter(|t| !t.trim().is_empty()) {
            let value = HeaderValue::from_str(&format!("token={}", token.trim()))
                .map_err(|e| ApiError::precondition(format!("invalid auth token: {e}")))?;
            headers.insert(COOKIE, value);
        }

        let http_client = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport(format!("base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Response> {
        log::debug!("{method} {url}");
        let mut request = self.http_client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            log::warn!("{method} {url} failed: {e}");
            ApiError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            body
        };
        log::warn!("{method} {url} returned {status}: {message}");
        Err(ApiError::Server {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;
        let response = self.send::<()>(Method::GET, url, None).await?;
        Ok(response.json().await?)
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        let response = self.send(method, url, Some(body)).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ExchangeApi for HttpExchangeApi {
    async fn list_catalog(&self) -> Result<Vec<Book>> {
        self.get_json(&["api", "books"]).await
    }

    async fn list_owned_by(&self, user_id: &UserId) -> Result<Vec<Book>> {
        self.get_json(&["api", "books", "user", user_id.as_str()]).await
    }

    async fn lookup_display_name(&self, user_id: &UserId) -> Result<String> {
        let info: UserInfo = self
            .get_json(&["api", "user", "auth", "info", user_id.as_str()])
            .await?;
        Ok(info.name)
    }

    #[instrument(skip(self, book), fields(title = %book.title))]
    async fn create_book(&self, book: &NewBook) -> Result<Book> {
        let created: Book = self.send_json(Method::POST, &["api", "books"], book).await?;
        log::info!("Created book {} ({})", created.id, created.title);
        Ok(created)
    }

    async fn update_book(&self, book_id: &BookId, update: &BookUpdate) -> Result<Book> {
        self.send_json(Method::PUT, &["api", "books", book_id.as_str()], update)
            .await
    }

    #[instrument(skip(self))]
    async fn delete_book(&self, book_id: &BookId) -> Result<()> {
        let url = self.endpoint(&["api", "books", book_id.as_str()])?;
        self.send::<()>(Method::DELETE, url, None).await?;
        log::info!("Deleted book {book_id}");
        Ok(())
    }

    #[instrument(
        skip(self, proposal),
        fields(requested = %proposal.requested_book_id, offered = %proposal.offered_book_id)
    )]
    async fn create_exchange(&self, proposal: &ExchangeProposal) -> Result<ExchangeRequest> {
        let request: ExchangeRequest = self
            .send_json(Method::POST, &["api", "books", "exchange"], proposal)
            .await?;
        log::info!(
            "Exchange request {} created: {} offered for {}",
            request.id,
            proposal.offered_book_id,
            proposal.requested_book_id
        );
        Ok(request)
    }

    async fn list_exchange_requests(&self, user_id: &UserId) -> Result<ExchangeRequests> {
        self.get_json(&["api", "books", "user-exchanges", user_id.as_str()])
            .await
    }

    #[instrument(skip(self, update), fields(status = update.status.as_str()))]
    async fn update_exchange_status(
        &self,
        request_id: &RequestId,
        update: &StatusUpdate,
    ) -> Result<ExchangeRequest> {
        self.send_json(
            Method::PUT,
            &["api", "books", "exchange", request_id.as_str()],
            update,
        )
        .await
    }

    async fn refetch_session(&self) -> Result<User> {
        self.get_json(&["api", "user", "auth", "refetch"]).await
    }

    async fn logout(&self) -> Result<()> {
        let url = self.endpoint(&["api", "user", "auth", "logout"])?;
        self.send::<()>(Method::GET, url, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        }
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let api = HttpExchangeApi::new(&config("http://localhost:3000")).unwrap();
        let url = api.endpoint(&["api", "books", "user", "u1"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/books/user/u1");
    }

    #[test]
    fn test_endpoint_respects_base_path() {
        let api = HttpExchangeApi::new(&config("https://example.com/bookhub/")).unwrap();
        let url = api.endpoint(&["api", "books"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/bookhub/api/books");
    }

    #[test]
    fn test_endpoint_escapes_ids() {
        let api = HttpExchangeApi::new(&config("http://localhost:3000")).unwrap();
        let url = api.endpoint(&["api", "books", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/books/a%2Fb");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpExchangeApi::new(&config("not a url")).unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
