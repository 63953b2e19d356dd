//! Transport abstraction used by the attempt executor.
//!
//! The executor never talks to an HTTP client directly; it hands a fully
//! prepared [`DispatchRequest`] to an [`HttpTransport`] and receives an
//! [`HttpResponse`] back. Tests substitute stub transports here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::LOCATION;
use http::{HeaderMap, Method, StatusCode};
use reqwest::cookie::Jar;
use thiserror::Error;
use url::Url;

use super::headers::HeaderList;

/// Contract that abstracts the underlying HTTP client.
///
/// One call equals one physical request. Redirect following, when enabled,
/// happens inside the transport according to [`SessionSettings::allow_redirects`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: DispatchRequest) -> Result<HttpResponse, TransportError>;
}

/// Connection-level switches copied from the caller onto every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub verify: bool,
    pub timeout: Option<Duration>,
    pub allow_redirects: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            verify: true,
            timeout: None,
            allow_redirects: true,
        }
    }
}

/// A request ready to leave the process.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub method: Method,
    pub url: Url,
    pub params: Vec<(String, String)>,
    pub headers: HeaderList,
    pub body: Option<Bytes>,
    pub settings: SessionSettings,
    /// Cookie store of the owning session, shared by every physical request
    /// of one attempt.
    pub cookies: Arc<Jar>,
}

/// What was actually sent for a given response.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderList,
}

/// Minimal response representation returned by the transport abstraction.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Reason phrase sent by the server when it differs from the canonical one.
    pub reason_phrase: Option<String>,
    pub headers: HeaderMap,
    pub url: Url,
    pub elapsed: Duration,
    pub body: Bytes,
    pub request: SentRequest,
}

impl HttpResponse {
    /// `true` for any status below 400.
    pub fn is_ok(&self) -> bool {
        self.status < 400
    }

    /// `true` for a redirect status that carries a `Location` header.
    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308) && self.location().is_some()
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    /// Reason phrase as sent by the server, falling back to the canonical one.
    pub fn reason(&self) -> &str {
        if let Some(phrase) = self.reason_phrase.as_deref() {
            return phrase;
        }
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("")
    }

    /// Human-readable summary: status line, response headers, the request
    /// that produced it and the elapsed time.
    pub fn explanation_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Response HTTP/1.1 {} {}",
            self.status,
            self.reason()
        )];

        for (name, value) in self.headers.iter() {
            let value = String::from_utf8_lossy(value.as_bytes());
            lines.push(format!("\t'{name}': '{value}'"));
        }

        lines.push(format!("Request [{} {}]", self.request.method, self.url));

        for (name, value) in self.request.headers.iter() {
            lines.push(format!("\t'{name}': '{value}'"));
        }

        lines.push(format!("Elapsed: {}s", self.elapsed.as_secs_f64()));
        lines
    }

    /// Resolves the `Location` header against the response URL.
    pub fn redirect_target(&self) -> Option<Url> {
        let location = self.location()?;
        if let Ok(absolute) = Url::parse(location)
            && absolute.has_host()
        {
            return Some(absolute);
        }
        self.url.join(location).ok()
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build http client: {0}")]
    Build(String),
    #[error("http transport error: {0}")]
    Request(String),
    #[error("failed to convert header '{0}'")]
    InvalidHeader(String),
}
