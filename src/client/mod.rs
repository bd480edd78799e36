//! HTTP client for the Tracex API
//!
//! [`ApiClient`] implements every service trait over `reqwest`. It attaches
//! the bearer token, unwraps the `{ success, data }` envelope and maps non-2xx
//! responses to [`ApiError`]. A 401 clears the stored token and publishes
//! [`ClientEvent::SessionExpired`]; every other notice is left to the caller.

pub mod endpoints;
pub mod export;
mod services;

pub use endpoints::Endpoint;
pub use export::CsvExport;

use crate::config::ClientConfig;
use crate::core::auth::TokenStore;
use crate::core::error::{ApiError, ErrorBody, RetryAfter, TracexError, TracexResult};
use crate::core::events::{ClientEvent, EventBus};
use crate::core::query::{Page, PaginationMeta};
use reqwest::header::RETRY_AFTER;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

/// `{ "success": true, "data": ... }`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: T,
}

/// `{ "success": true, "data": [...], "pagination": {...} }`
#[derive(Debug, Deserialize)]
struct ListEnvelope<T> {
    #[serde(default)]
    success: bool,
    data: Vec<T>,
    pagination: PaginationMeta,
}

/// Typed client for the Tracex REST API
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenStore>,
    events: EventBus,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(
        config: &ClientConfig,
        tokens: Arc<dyn TokenStore>,
        events: EventBus,
    ) -> TracexResult<Self> {
        config.validate()?;
        let base_url = Url::parse(config.base_url()).map_err(|e| {
            TracexError::Internal(format!("invalid api_url '{}': {}", config.api_url, e))
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TracexError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            tokens,
            events,
        })
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// `GET /health`
    pub async fn health(&self) -> TracexResult<bool> {
        let response = self
            .execute(self.request(Method::GET, Endpoint::Health, false)?)
            .await?;
        Ok(response.status().is_success())
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    pub(crate) fn url(&self, endpoint: Endpoint<'_>) -> TracexResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                TracexError::Internal(format!("'{}' cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(endpoint.segments());
        Ok(url)
    }

    /// Start a request, with the bearer token when `authenticated`
    pub(crate) fn request(
        &self,
        method: Method,
        endpoint: Endpoint<'_>,
        authenticated: bool,
    ) -> TracexResult<RequestBuilder> {
        let url = self.url(endpoint)?;
        tracing::debug!(%method, path = url.path(), "api request");
        let builder = self.http.request(method, url);
        Ok(match self.tokens.get_token().filter(|_| authenticated) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Send and turn non-2xx responses into errors
    pub(crate) async fn execute(&self, builder: RequestBuilder) -> TracexResult<Response> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(error = %e, "request did not complete");
            TracexError::from(e)
        })?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(self.error_from(response, false).await)
    }

    /// Map a failed response; `raw_text` uses a non-JSON body as the message
    pub(crate) async fn error_from(&self, response: Response, raw_text: bool) -> TracexError {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(RetryAfter::parse);
        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<ErrorBody>(&text).unwrap_or_else(|_| ErrorBody {
            error: Some(text.trim().to_string()).filter(|t| raw_text && !t.is_empty()),
            ..ErrorBody::default()
        });

        let error = ApiError::from_status(status, body, retry_after);
        tracing::warn!(status = status.as_u16(), error = %error, "api error");

        if status == StatusCode::UNAUTHORIZED {
            self.tokens.clear_token();
            self.events.publish(ClientEvent::SessionExpired);
        }
        error.into()
    }

    pub(crate) async fn read_data<T: DeserializeOwned>(response: Response) -> TracexResult<T> {
        let bytes = response.bytes().await?;
        let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
        if !envelope.success {
            return Err(TracexError::InvalidResponse {
                message: "response is not marked successful".to_string(),
            });
        }
        Ok(envelope.data)
    }

    pub(crate) async fn read_page<T: DeserializeOwned>(response: Response) -> TracexResult<Page<T>> {
        let bytes = response.bytes().await?;
        let envelope: ListEnvelope<T> = serde_json::from_slice(&bytes)?;
        if !envelope.success {
            return Err(TracexError::InvalidResponse {
                message: "list response is not marked successful".to_string(),
            });
        }
        Ok(Page {
            items: envelope.data,
            pagination: envelope.pagination,
        })
    }

    /// Decode a bare JSON body (no envelope)
    pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> TracexResult<T> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub(crate) async fn get_data<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint<'_>,
        query: &[(&str, String)],
    ) -> TracexResult<T> {
        let builder = self.request(Method::GET, endpoint, true)?.query(query);
        Self::read_data(self.execute(builder).await?).await
    }

    pub(crate) async fn send_data<B, T>(
        &self,
        method: Method,
        endpoint: Endpoint<'_>,
        body: Option<&B>,
    ) -> TracexResult<T>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut builder = self.request(method, endpoint, true)?;
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Self::read_data(self.execute(builder).await?).await
    }

    /// Request whose success body is ignored (204 or an envelope)
    pub(crate) async fn send_empty(&self, method: Method, endpoint: Endpoint<'_>) -> TracexResult<()> {
        self.execute(self.request(method, endpoint, true)?).await?;
        Ok(())
    }
}
