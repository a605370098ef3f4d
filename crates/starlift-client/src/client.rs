//! HTTP client for the Northstar REST API.
//!
//! Wraps `reqwest` with basic-auth credential handling, typed response
//! deserialization, and page-looping for paginated reference endpoints. All
//! entity submissions go through [`ApiClient::submit`], which reports the raw
//! status and body and leaves the success-vs-failure decision to the caller —
//! the bulk dispatcher treats anything above 201 as a row failure, which is
//! not an error at the transport layer.

use std::time::Duration;

use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use starlift_core::AppConfig;

use crate::envelope::{rejection_message, Envelope, Page};
use crate::error::ApiError;
use crate::types::{ServiceRecord, SubmitReply};

/// Hard cap on pages fetched from one paginated endpoint. Guards against a
/// paginator that never reports `current_page >= total_pages`.
const MAX_PAGES: usize = 100;

/// Client for the Northstar REST API.
///
/// Holds the HTTP client, instance base URI, and basic-auth credentials. Use
/// [`ApiClient::from_config`] for production or [`ApiClient::with_base_url`]
/// to point at a mock server in tests.
pub struct ApiClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl ApiClient {
    /// Creates a client for the configured Northstar instance.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed, or [`ApiError::InvalidUri`] if the configured URI does
    /// not parse.
    pub fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        Self::with_base_url(
            &config.uri,
            &config.username,
            &config.password,
            config.request_timeout_secs,
        )
    }

    /// Creates a client with an explicit base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed, or [`ApiError::InvalidUri`] if `base_url` is not a
    /// valid URL.
    pub fn with_base_url(
        base_url: &str,
        username: &str,
        password: &str,
        timeout_secs: u64,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("starlift/0.1 (bulk-import)")
            .build()?;

        let normalized = base_url.trim_end_matches('/').to_owned();
        Url::parse(&normalized).map_err(|e| ApiError::InvalidUri {
            uri: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url: normalized,
            username: username.to_owned(),
            password: password.to_owned(),
        })
    }

    /// Submits one entity request and returns the raw status and body.
    ///
    /// Transport-level failures (connect errors, timeouts) surface as
    /// [`ApiError::Http`]; HTTP error statuses do **not** — the reply carries
    /// them for the caller to judge.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] on network failure and
    /// [`ApiError::InvalidUri`] if `path` does not form a valid URL.
    pub async fn submit(
        &self,
        method: Method,
        path: &str,
        body: &Value,
    ) -> Result<SubmitReply, ApiError> {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(SubmitReply { status, body })
    }

    /// Fetches a single object from a `{"data": ...}` endpoint.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Rejected`] if the API answers with an error status; the
    ///   message is the flattened error-envelope message.
    /// - [`ApiError::Http`] on network failure.
    /// - [`ApiError::Deserialize`] if the body does not match the expected shape.
    pub async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body),
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| ApiError::Deserialize {
                context: path.to_owned(),
                source: e,
            })?;
        Ok(envelope.data)
    }

    /// Posts a JSON body and parses the `{"data": ...}` success envelope.
    ///
    /// Used by address validation, where the caller needs the typed result on
    /// success and a [`ApiError::Rejected`] (to trigger local fallback) when
    /// the validator turns the address down.
    ///
    /// # Errors
    ///
    /// Same contract as [`ApiClient::get_data`].
    pub async fn post_data<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .post(url)
            .basic_auth(&self.username, Some(&self.password))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() || status.as_u16() > 201 {
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&text),
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&text).map_err(|e| ApiError::Deserialize {
                context: path.to_owned(),
                source: e,
            })?;
        Ok(envelope.data)
    }

    /// Fetches every page of a paginated list endpoint.
    ///
    /// Follows the `{data: [...], paginator: {current_page, total_pages}}`
    /// envelope, requesting `?page=N` until the paginator reports the last
    /// page. An endpoint with no rows reports `total_pages: 0` and yields an
    /// empty list.
    ///
    /// # Errors
    ///
    /// Same contract as [`ApiClient::get_data`], plus
    /// [`ApiError::PaginationLimit`] if the paginator never terminates.
    pub async fn get_paged<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let mut collected = Vec::new();
        let mut page = 1usize;

        loop {
            if page > MAX_PAGES {
                return Err(ApiError::PaginationLimit {
                    path: path.to_owned(),
                    max_pages: MAX_PAGES,
                });
            }

            let url = self.endpoint(&format!("{path}?page={page}"))?;
            let response = self
                .client
                .get(url)
                .basic_auth(&self.username, Some(&self.password))
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(ApiError::Rejected {
                    status: status.as_u16(),
                    message: rejection_message(&body),
                });
            }

            let parsed: Page<T> =
                serde_json::from_str(&body).map_err(|e| ApiError::Deserialize {
                    context: format!("{path} (page {page})"),
                    source: e,
                })?;

            collected.extend(parsed.data);

            if parsed.paginator.current_page >= parsed.paginator.total_pages {
                break;
            }
            page += 1;
        }

        Ok(collected)
    }

    /// Looks up one service definition by id.
    ///
    /// # Errors
    ///
    /// Same contract as [`ApiClient::get_data`].
    pub async fn service(&self, id: i64) -> Result<ServiceRecord, ApiError> {
        self.get_data(&format!("system/services/{id}")).await
    }

    /// Cheap pre-flight credential check: fetches the first page of the
    /// country list. Bad credentials surface as a 401 rejection here, before
    /// any row is dispatched.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] on any error status (401 for bad
    /// credentials) and [`ApiError::Http`] on network failure.
    pub async fn verify_credentials(&self) -> Result<(), ApiError> {
        let url = self.endpoint("_data/countries?page=1")?;
        let response = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body),
            });
        }
        Ok(())
    }

    /// Builds the full URL for an API path under `/api/v1/`.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!("{}/api/v1/{path}", self.base_url);
        Url::parse(&raw).map_err(|e| ApiError::InvalidUri {
            uri: raw,
            reason: e.to_string(),
        })
    }
}
