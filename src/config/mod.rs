//! Request parameters shared by every attempt of a run.
//!
//! Provides:
//! - [`RequestSpec`], the caller's request as given on the command line
//! - a fluent builder
//! - the body-driven method promotion rule

use std::time::Duration;

use bytes::Bytes;
use http::Method;

use crate::core::{HeaderList, SessionSettings};

/// Everything about the request that is not decided by strategies.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    /// Kept as given; scheme checks work on the raw text.
    pub url: String,
    pub params: Vec<(String, String)>,
    pub headers: HeaderList,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
    pub verify: bool,
    pub allow_redirects: bool,
}

impl RequestSpec {
    pub fn builder(url: impl Into<String>) -> RequestSpecBuilder {
        RequestSpecBuilder::new(url)
    }

    pub fn settings(&self) -> SessionSettings {
        SessionSettings {
            verify: self.verify,
            timeout: self.timeout,
            allow_redirects: self.allow_redirects,
        }
    }
}

/// Fluent builder for [`RequestSpec`].
#[derive(Debug, Clone)]
pub struct RequestSpecBuilder {
    request: RequestSpec,
}

impl RequestSpecBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            request: RequestSpec {
                method: Method::GET,
                url: url.into(),
                params: Vec::new(),
                headers: HeaderList::new(),
                body: None,
                timeout: None,
                verify: true,
                allow_redirects: true,
            },
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.request.method = method;
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.params.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.set(key, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.request.body = Some(body.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request.timeout = Some(timeout);
        self
    }

    pub fn verify(mut self, verify: bool) -> Self {
        self.request.verify = verify;
        self
    }

    pub fn allow_redirects(mut self, allow: bool) -> Self {
        self.request.allow_redirects = allow;
        self
    }

    /// Finalises the request, promoting the method to POST when a non-empty
    /// body accompanies a method other than POST, PUT or PATCH.
    pub fn build(self) -> RequestSpec {
        let mut request = self.request;
        request.method = promote_method(request.method, request.body.as_ref());
        request
    }
}

pub fn promote_method(method: Method, body: Option<&Bytes>) -> Method {
    let has_body = body.is_some_and(|body| !body.is_empty());
    if has_body && !matches!(method, Method::POST | Method::PUT | Method::PATCH) {
        log::debug!("promoting {method} to POST because a body was supplied");
        return Method::POST;
    }
    method
}
