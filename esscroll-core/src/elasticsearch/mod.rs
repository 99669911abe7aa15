//! Elasticsearch scroll API backend.
//!
//! - start: `POST {base}/{index}/_search?scroll={keep_alive}`
//! - continue: `POST {base}/_search/scroll`
//! - release: `DELETE {base}/_search/scroll`

mod wire;

pub use wire::format_keep_alive;

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;
use zeroize::Zeroizing;

use crate::backend::SearchBackend;
use crate::batch::ScrollPage;
use crate::error::{BackendError, ScrollOp};
use crate::request::SearchRequest;
use crate::token::CursorToken;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ElasticsearchSetupError {
    #[error("invalid Elasticsearch URL '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Elasticsearch URL '{url}' cannot be used as a base URL")]
    UnsupportedUrl { url: String },
    #[error("failed to build HTTP client")]
    Client(#[from] reqwest::Error),
}

/// Connection settings for [`ElasticsearchBackend`].
#[derive(Clone)]
pub struct ElasticsearchOptions {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<Zeroizing<String>>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl fmt::Debug for ElasticsearchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElasticsearchOptions")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

impl ElasticsearchOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            username: None,
            password: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            accept_invalid_certs: false,
        }
    }

    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(Zeroizing::new(password.into()));
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }
}

struct Credentials {
    username: String,
    password: Option<Zeroizing<String>>,
}

/// [`SearchBackend`] over the Elasticsearch (and OpenSearch) REST API.
pub struct ElasticsearchBackend {
    client: Client,
    base_url: Url,
    credentials: Option<Credentials>,
}

impl fmt::Debug for ElasticsearchBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElasticsearchBackend")
            .field("base_url", &self.base_url.as_str())
            .field(
                "username",
                &self.credentials.as_ref().map(|c| c.username.as_str()),
            )
            .finish()
    }
}

impl ElasticsearchBackend {
    pub fn new(options: ElasticsearchOptions) -> Result<Self, ElasticsearchSetupError> {
        let base_url = normalize_base_url(&options.base_url)?;

        let client = Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.request_timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()?;

        let credentials = options.username.map(|username| Credentials {
            username,
            password: options.password,
        });

        debug!(base_url = %base_url, "created Elasticsearch backend");

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // http(s) URLs always have a path; normalize_base_url guarantees it.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(credentials) => builder.basic_auth(
                &credentials.username,
                credentials.password.as_ref().map(|p| p.as_str()),
            ),
            None => builder,
        }
    }

    async fn send(
        &self,
        operation: ScrollOp,
        builder: RequestBuilder,
        body: &Value,
    ) -> Result<(StatusCode, Vec<u8>), BackendError> {
        let response = self
            .authorize(builder)
            .json(body)
            .send()
            .await
            .map_err(|err| transport_error(operation, None, err))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| transport_error(operation, Some(status), err))?;
        Ok((status, bytes.to_vec()))
    }

    async fn fetch_page(
        &self,
        operation: ScrollOp,
        builder: RequestBuilder,
        body: &Value,
    ) -> Result<ScrollPage, BackendError> {
        let (status, bytes) = self.send(operation, builder, body).await?;
        if !status.is_success() {
            return Err(status_error(operation, status, &bytes));
        }
        wire::parse_page(operation, &bytes)
    }
}

#[async_trait]
impl SearchBackend for ElasticsearchBackend {
    async fn start_scroll(
        &self,
        request: &SearchRequest,
    ) -> Result<ScrollPage, BackendError> {
        let mut url = self.endpoint(&[request.collection.as_str(), "_search"]);
        url.query_pairs_mut()
            .append_pair("scroll", &format_keep_alive(request.keep_alive));

        debug!(%url, batch_size = request.batch_size, "starting scroll search");
        let body = wire::start_body(request);
        self.fetch_page(ScrollOp::Start, self.client.post(url), &body)
            .await
    }

    async fn continue_scroll(
        &self,
        token: &CursorToken,
        keep_alive: Duration,
    ) -> Result<ScrollPage, BackendError> {
        let url = self.endpoint(&["_search", "scroll"]);
        let body = wire::continue_body(token, keep_alive);
        self.fetch_page(ScrollOp::Continue, self.client.post(url), &body)
            .await
    }

    async fn release_scroll(&self, token: &CursorToken) -> Result<(), BackendError> {
        let url = self.endpoint(&["_search", "scroll"]);
        let body = wire::release_body(token);
        let (status, bytes) = self
            .send(ScrollOp::Release, self.client.delete(url), &body)
            .await?;

        if status == StatusCode::NOT_FOUND {
            // Expired or already freed server-side.
            debug!(token = %token.fingerprint(), "scroll context already gone");
            return Ok(());
        }
        if !status.is_success() {
            return Err(status_error(ScrollOp::Release, status, &bytes));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "elasticsearch"
    }
}

/// Add a missing scheme and drop a trailing slash, so `localhost:9200` works.
fn normalize_base_url(raw: &str) -> Result<Url, ElasticsearchSetupError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let with_scheme = match default_scheme(trimmed) {
        Some(with_scheme) => {
            warn!("normalized Elasticsearch URL from '{}' to '{}'", raw, with_scheme);
            with_scheme
        }
        None => trimmed.to_string(),
    };

    let url = Url::parse(&with_scheme).map_err(|source| {
        ElasticsearchSetupError::InvalidUrl {
            url: raw.to_string(),
            source,
        }
    })?;
    if url.cannot_be_a_base() || url.query().is_some() {
        return Err(ElasticsearchSetupError::UnsupportedUrl {
            url: raw.to_string(),
        });
    }
    Ok(url)
}

/// `Some` only when the URL had no scheme and one was added.
fn default_scheme(trimmed: &str) -> Option<String> {
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        None
    } else {
        Some(format!("http://{trimmed}"))
    }
}

fn transport_error(
    operation: ScrollOp,
    status: Option<StatusCode>,
    err: reqwest::Error,
) -> BackendError {
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        "connection failed".to_string()
    } else {
        err.to_string()
    };
    BackendError::Unavailable {
        operation,
        status: status.map(|s| s.as_u16()),
        reason,
        source: Some(Box::new(err)),
    }
}

fn status_error(operation: ScrollOp, status: StatusCode, body: &[u8]) -> BackendError {
    let text = String::from_utf8_lossy(body);
    let reason = if text.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string()
    } else {
        wire::truncate_reason(&text)
    };
    BackendError::Unavailable {
        operation,
        status: Some(status.as_u16()),
        reason,
        source: None,
    }
}
