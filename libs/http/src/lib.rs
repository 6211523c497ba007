//! HTTP transport against the store's v2 API: batch writes and bucket lookup.

mod buckets;
mod write;

pub use buckets::HttpBucketService;
pub use write::{HttpWriteService, classify_status};

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

/// Connection settings fixed for the whole run.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Base address, e.g. `http://localhost:9999`.
    pub host: String,
    pub token: Option<String>,
    /// Не проверять TLS сертификат сервера.
    pub skip_verify: bool,
    /// Upper bound for one request, connect to end of body. `None` = unbounded.
    pub timeout: Option<Duration>,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid host {host:?}: {reason}")]
    InvalidHost { host: String, reason: String },

    #[error("HTTP client: {0}")]
    Build(String),
}

/// Shared reqwest client plus base address and credentials.
///
/// Cheap to clone: `reqwest::Client` is reference counted.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl HttpClient {
    pub fn new(conn: &Connection) -> Result<Self, ClientError> {
        let http = Self::builder(conn)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;
        Self::with_client(http, conn)
    }

    /// reqwest builder with the connection's TLS and timeout settings applied.
    pub fn builder(conn: &Connection) -> reqwest::ClientBuilder {
        let builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(conn.skip_verify)
            .user_agent(concat!("lpwrite/", env!("CARGO_PKG_VERSION")));
        match conn.timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }

    /// Use a preconfigured reqwest client (proxy, timeouts) instead of the default one.
    pub fn with_client(http: reqwest::Client, conn: &Connection) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidHost { host: conn.host.clone(), reason };

        let mut base = Url::parse(&conn.host).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {:?}", base.scheme())));
        }
        // join() заменяет последний сегмент пути, если он без '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            http,
            base,
            token: conn.token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, String> {
        self.base.join(path).map_err(|e| format!("invalid endpoint {path:?}: {e}"))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, format!("Token {token}")),
            None => request,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Error bodies
// ═══════════════════════════════════════════════════════════════

const MAX_ERROR_BODY: usize = 512;

#[derive(Deserialize)]
struct ApiError {
    code: Option<String>,
    message: Option<String>,
}

/// Human-readable message for a non-2xx response.
///
/// The store's `{"code", "message"}` object renders as `code: message`;
/// anything else is passed through, truncated.
pub(crate) fn error_message(status: u16, body: &str) -> String {
    if let Ok(ApiError { code, message: Some(message) }) = serde_json::from_str::<ApiError>(body) {
        return match code {
            Some(code) if !code.is_empty() => format!("{code}: {message}"),
            _ => message,
        };
    }

    let body = body.trim();
    if body.is_empty() {
        return format!("unexpected status {status}");
    }
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
