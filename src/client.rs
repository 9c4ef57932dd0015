//! Host API client abstraction and the tab definition payload.
//!
//! The host application ships its own authenticated API client; the
//! injector only needs `getUrl` and `fetch` from it. [`ApiClient`] captures
//! that surface, and [`MemoryApiClient`] stands in for it when no host is
//! around.
//!
//! # Wire Format
//!
//! The config endpoint answers `GET <base>/CustomTabs/Config` with:
//!
//! ```json
//! [
//!   { "Title": "Info", "ContentHtml": "<p>hi</p>", "ContentJS": "" }
//! ]
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Content type requested from the config endpoint.
pub const ACCEPT_JSON: &str = "application/json";

// ============================================================================
// HttpMethod
// ============================================================================

/// HTTP method passed through to the host client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`
    Get,
}

impl HttpMethod {
    /// Returns the method name as sent on the wire.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ApiClient
// ============================================================================

/// The host application's API client.
///
/// Implementations are expected to attach whatever authentication the host
/// uses; the injector treats the response as trusted.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Server base URL all relative paths resolve against.
    fn base_url(&self) -> &Url;

    /// Resolves a path relative to [`base_url`](Self::base_url).
    ///
    /// The base is treated as a directory even without a trailing slash, so
    /// `http://host/jf` + `CustomTabs/Config` gives `http://host/jf/CustomTabs/Config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if the joined URL is invalid.
    fn get_url(&self, path: &str) -> Result<Url> {
        let mut base = self.base_url().clone();
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }
        Ok(base.join(path.trim_start_matches('/'))?)
    }

    /// Performs a request and returns the parsed JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] on transport or status failures and
    /// [`Error::Json`] if the body is not JSON.
    async fn fetch(&self, url: &Url, method: HttpMethod, accept: &str) -> Result<Value>;
}

// ============================================================================
// TabDefinition
// ============================================================================

/// One tab as served by the config endpoint.
///
/// Missing or `null` markup and script are treated as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabDefinition {
    /// Button label.
    #[serde(rename = "Title", default, deserialize_with = "null_as_empty")]
    pub title: String,

    /// Markup placed verbatim into the content container.
    #[serde(rename = "ContentHtml", default, deserialize_with = "null_as_empty")]
    pub content_markup: String,

    /// Script body run after the markup is mounted. May be empty.
    #[serde(rename = "ContentJS", default, deserialize_with = "null_as_empty")]
    pub content_script: String,
}

impl TabDefinition {
    /// Creates a definition.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        content_markup: impl Into<String>,
        content_script: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content_markup: content_markup.into(),
            content_script: content_script.into(),
        }
    }

    /// Returns `true` if rendering this tab runs a script.
    #[inline]
    #[must_use]
    pub fn has_script(&self) -> bool {
        !self.content_script.is_empty()
    }

    /// Decodes the endpoint payload into an ordered list of definitions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPayload`] if the payload is not an array and
    /// [`Error::Json`] if an element does not decode.
    pub fn list_from_value(value: Value) -> Result<Vec<Self>> {
        if !value.is_array() {
            return Err(Error::invalid_payload(format!(
                "expected an array of tab definitions, got {}",
                json_kind(&value)
            )));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Deserializes `null` or a string, mapping `null` to an empty string.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Names a JSON value's type for error messages.
fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Fetch Helper
// ============================================================================

/// Fetches and decodes the tab definitions from the config endpoint.
///
/// # Errors
///
/// Propagates URL, fetch and payload errors.
pub async fn fetch_tab_definitions(
    client: &dyn ApiClient,
    config_path: &str,
) -> Result<Vec<TabDefinition>> {
    let url = client.get_url(config_path)?;
    debug!(url = %url, "Fetching tab definitions");

    let value = client.fetch(&url, HttpMethod::Get, ACCEPT_JSON).await?;
    let definitions = TabDefinition::list_from_value(value)?;

    debug!(count = definitions.len(), "Retrieved tab definitions");
    Ok(definitions)
}

// ============================================================================
// MemoryApiClient
// ============================================================================

/// Scripted response for [`MemoryApiClient`].
#[derive(Debug, Clone)]
enum Reply {
    Json(Value),
    Fail(String),
}

/// In-memory API client.
///
/// Serves a fixed body for every request, or drains a queue of one-shot
/// replies first. Counts requests so callers can observe fetch traffic.
pub struct MemoryApiClient {
    /// Base URL reported to the injector.
    base_url: Url,
    /// Reply used once the queue is empty.
    default_reply: Mutex<Reply>,
    /// One-shot replies served in order.
    queued: Mutex<VecDeque<Reply>>,
    /// URLs requested so far.
    requests: Mutex<Vec<Url>>,
    /// Request counter.
    request_count: AtomicUsize,
}

impl fmt::Debug for MemoryApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("request_count", &self.request_count())
            .finish_non_exhaustive()
    }
}

impl MemoryApiClient {
    /// Creates a client that answers every request with `definitions`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if `base_url` does not parse.
    pub fn new(base_url: &str, definitions: &[TabDefinition]) -> Result<Self> {
        let body = serde_json::to_value(definitions)?;
        Self::with_body(base_url, body)
    }

    /// Creates a client that answers every request with a raw JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if `base_url` does not parse.
    pub fn with_body(base_url: &str, body: Value) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            default_reply: Mutex::new(Reply::Json(body)),
            queued: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            request_count: AtomicUsize::new(0),
        })
    }

    /// Creates a client whose every request fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if `base_url` does not parse.
    pub fn failing(base_url: &str, message: impl Into<String>) -> Result<Self> {
        let client = Self::with_body(base_url, Value::Array(Vec::new()))?;
        *client.default_reply.lock() = Reply::Fail(message.into());
        Ok(client)
    }

    /// Serves `definitions` for every request after the queue drains.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the definitions do not serialize.
    pub fn set_definitions(&self, definitions: &[TabDefinition]) -> Result<()> {
        *self.default_reply.lock() = Reply::Json(serde_json::to_value(definitions)?);
        Ok(())
    }

    /// Queues a single failing reply.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.queued.lock().push_back(Reply::Fail(message.into()));
    }

    /// Queues a single JSON reply.
    pub fn reply_next(&self, body: Value) {
        self.queued.lock().push_back(Reply::Json(body));
    }

    /// Returns the number of requests served.
    #[inline]
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Returns the URLs requested so far.
    #[must_use]
    pub fn requested_urls(&self) -> Vec<Url> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ApiClient for MemoryApiClient {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn fetch(&self, url: &Url, method: HttpMethod, accept: &str) -> Result<Value> {
        debug!(url = %url, %method, accept, "Serving in-memory request");
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(url.clone());

        let reply = self
            .queued
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_reply.lock().clone());

        match reply {
            Reply::Json(body) => Ok(body),
            Reply::Fail(message) => Err(Error::fetch(url.as_str(), message)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
