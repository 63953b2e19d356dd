//! Recording stub transport shared by the unit tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, LOCATION};

use super::transport::{DispatchRequest, HttpResponse, HttpTransport, SentRequest, TransportError};

type Responder =
    Box<dyn Fn(&DispatchRequest, usize) -> Result<StubReply, TransportError> + Send + Sync>;

#[derive(Debug, Clone)]
pub(crate) struct StubReply {
    pub status: u16,
    pub location: Option<String>,
}

impl StubReply {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            location: None,
        }
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        Self {
            status,
            location: Some(location.to_string()),
        }
    }
}

pub(crate) struct StubTransport {
    responder: Responder,
    seen: Mutex<Vec<DispatchRequest>>,
}

impl StubTransport {
    /// Replies are computed from the request and its zero-based call index.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&DispatchRequest, usize) -> Result<StubReply, TransportError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn always(status: u16) -> Self {
        Self::new(move |_, _| Ok(StubReply::status(status)))
    }

    /// Plays back `replies` in order, then keeps answering 500.
    pub fn scripted(replies: Vec<StubReply>) -> Self {
        Self::new(move |_, index| {
            Ok(replies
                .get(index)
                .cloned()
                .unwrap_or_else(|| StubReply::status(500)))
        })
    }

    pub fn seen(&self) -> Vec<DispatchRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn seen_urls(&self) -> Vec<String> {
        self.seen()
            .iter()
            .map(|request| request.url.to_string())
            .collect()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn send(&self, request: DispatchRequest) -> Result<HttpResponse, TransportError> {
        let index = {
            let mut seen = self.seen.lock().unwrap();
            seen.push(request.clone());
            seen.len() - 1
        };
        let reply = (self.responder)(&request, index)?;

        let mut headers = HeaderMap::new();
        if let Some(location) = reply.location {
            headers.insert(LOCATION, HeaderValue::from_str(&location).unwrap());
        }

        Ok(HttpResponse {
            status: reply.status,
            reason_phrase: None,
            headers,
            url: request.url.clone(),
            elapsed: Duration::from_millis(1),
            body: Bytes::new(),
            request: SentRequest {
                method: request.method,
                url: request.url,
                headers: request.headers,
            },
        })
    }
}
