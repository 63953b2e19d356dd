//! Per-attempt request session.
//!
//! A [`Session`] is built fresh for every candidate set, mutated by the
//! strategies of that candidate and dropped after its single dispatch. It owns
//! the header list, the connection settings and a small dispatch pipeline
//! made of before-send URL rewrites plus an optional one-shot redirect
//! re-issue.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::cookie::Jar;
use http::Method;
use url::Url;

use super::headers::HeaderList;
use super::transport::{
    DispatchRequest, HttpResponse, HttpTransport, SessionSettings, TransportError,
};

/// Headers every new session starts with, before the caller's own headers.
/// No User-Agent: one is only sent when the caller or a strategy adds it.
pub const DEFAULT_HEADERS: &[(&str, &str)] = &[
    ("Accept-Encoding", "gzip, deflate"),
    ("Accept", "*/*"),
    ("Connection", "keep-alive"),
];

/// URL transform applied right before a request leaves the session.
pub type UrlRewrite = Arc<dyn Fn(Url) -> Url + Send + Sync>;

/// Middleware stage between the session and the transport.
#[derive(Clone, Default)]
pub struct DispatchPipeline {
    rewrites: Vec<UrlRewrite>,
    resend_redirect_once: bool,
}

impl DispatchPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rewrite; rewrites run in registration order.
    pub fn push_rewrite(&mut self, rewrite: UrlRewrite) {
        self.rewrites.push(rewrite);
    }

    /// Re-issue the request once to the redirect target when the transport
    /// is not following redirects itself.
    pub fn enable_redirect_resend(&mut self) {
        self.resend_redirect_once = true;
    }

    pub fn resends_redirects(&self) -> bool {
        self.resend_redirect_once
    }

    pub fn rewrite_count(&self) -> usize {
        self.rewrites.len()
    }

    pub fn rewrite(&self, url: Url) -> Url {
        self.rewrites
            .iter()
            .fold(url, |current, rewrite| rewrite(current))
    }
}

impl fmt::Debug for DispatchPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchPipeline")
            .field("rewrites", &self.rewrites.len())
            .field("resend_redirect_once", &self.resend_redirect_once)
            .finish()
    }
}

/// Mutable request configuration for one attempt.
#[derive(Debug, Clone)]
pub struct Session {
    headers: HeaderList,
    settings: SessionSettings,
    pipeline: DispatchPipeline,
    cookies: Arc<Jar>,
}

impl Session {
    /// Creates a session with the default headers, the caller's headers
    /// merged on top and an empty cookie jar.
    pub fn new(settings: SessionSettings, caller_headers: &HeaderList) -> Self {
        let mut headers: HeaderList = DEFAULT_HEADERS.iter().copied().collect();
        headers.merge(caller_headers);

        Self {
            headers,
            settings,
            pipeline: DispatchPipeline::new(),
            cookies: Arc::new(Jar::default()),
        }
    }

    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    pub fn set_headers(&mut self, headers: HeaderList) {
        self.headers = headers;
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn pipeline(&self) -> &DispatchPipeline {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut DispatchPipeline {
        &mut self.pipeline
    }

    pub fn cookies(&self) -> &Arc<Jar> {
        &self.cookies
    }

    /// Sends one logical request through the pipeline.
    ///
    /// With the redirect re-issue enabled and redirects disallowed, a
    /// redirect response triggers exactly one more physical request to its
    /// target, carrying the same headers, params, body and cookie jar.
    pub async fn dispatch(
        &self,
        transport: &dyn HttpTransport,
        method: &Method,
        url: &Url,
        params: &[(String, String)],
        body: Option<&Bytes>,
    ) -> Result<HttpResponse, TransportError> {
        let request = DispatchRequest {
            method: method.clone(),
            url: self.pipeline.rewrite(url.clone()),
            params: params.to_vec(),
            headers: self.headers.clone(),
            body: body.cloned(),
            settings: self.settings,
            cookies: Arc::clone(&self.cookies),
        };

        if !(self.pipeline.resend_redirect_once && !self.settings.allow_redirects) {
            return transport.send(request).await;
        }

        let response = transport.send(request.clone()).await?;
        if !response.is_redirect() {
            return Ok(response);
        }

        let Some(target) = response.redirect_target() else {
            return Ok(response);
        };

        log::debug!("re-issuing {} to redirect target {}", request.method, target);
        transport
            .send(DispatchRequest {
                url: target,
                ..request
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stub::{StubReply, StubTransport};

    fn downgrade() -> UrlRewrite {
        Arc::new(|mut url: Url| {
            if url.scheme() == "https" {
                let _ = url.set_scheme("http");
            }
            url
        })
    }

    fn no_redirects() -> SessionSettings {
        SessionSettings {
            allow_redirects: false,
            ..SessionSettings::default()
        }
    }

    #[test]
    fn new_session_has_no_user_agent_and_merges_caller_headers() {
        let caller: HeaderList = [("accept", "text/html"), ("X-Token", "abc")]
            .into_iter()
            .collect();
        let session = Session::new(SessionSettings::default(), &caller);

        let entries: Vec<_> = session.headers().iter().collect();
        assert_eq!(
            entries,
            vec![
                ("Accept-Encoding", "gzip, deflate"),
                ("accept", "text/html"),
                ("Connection", "keep-alive"),
                ("X-Token", "abc"),
            ]
        );
        assert!(!session.headers().contains("user-agent"));
    }

    #[tokio::test]
    async fn rewrites_url_before_sending() {
        let transport = StubTransport::always(200);
        let mut session = Session::new(SessionSettings::default(), &HeaderList::new());
        session.pipeline_mut().push_rewrite(downgrade());

        let url = Url::parse("https://example.com/page").unwrap();
        let response = session
            .dispatch(&transport, &Method::GET, &url, &[], None)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.seen_urls(), vec!["http://example.com/page"]);
    }

    #[tokio::test]
    async fn resends_once_when_redirects_are_disallowed() {
        let transport = StubTransport::scripted(vec![
            StubReply::redirect(301, "https://example.com/final"),
            StubReply::status(200),
        ]);
        let mut session = Session::new(no_redirects(), &HeaderList::new());
        session.pipeline_mut().push_rewrite(downgrade());
        session.pipeline_mut().enable_redirect_resend();

        let url = Url::parse("https://example.com/").unwrap();
        let response = session
            .dispatch(&transport, &Method::GET, &url, &[], None)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(
            transport.seen_urls(),
            vec!["http://example.com/", "https://example.com/final"]
        );
    }

    #[tokio::test]
    async fn resent_request_keeps_session_headers() {
        let transport = StubTransport::scripted(vec![
            StubReply::redirect(302, "/landing"),
            StubReply::status(200),
        ]);
        let caller: HeaderList = [("X-Token", "abc")].into_iter().collect();
        let mut session = Session::new(no_redirects(), &caller);
        session.pipeline_mut().enable_redirect_resend();

        let url = Url::parse("http://example.com/").unwrap();
        session
            .dispatch(&transport, &Method::GET, &url, &[], None)
            .await
            .unwrap();

        let seen = transport.seen();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].url.as_str(), "http://example.com/landing");
        assert_eq!(seen[1].headers.get("x-token"), Some("abc"));
        assert!(Arc::ptr_eq(&seen[0].cookies, &seen[1].cookies));
        assert!(Arc::ptr_eq(&seen[1].cookies, session.cookies()));
    }

    #[test]
    fn sessions_do_not_share_cookies() {
        let first = Session::new(SessionSettings::default(), &HeaderList::new());
        let second = Session::new(SessionSettings::default(), &HeaderList::new());

        assert!(!Arc::ptr_eq(first.cookies(), second.cookies()));
    }

    #[tokio::test]
    async fn resends_at_most_once() {
        let transport = StubTransport::scripted(vec![
            StubReply::redirect(302, "/second"),
            StubReply::redirect(302, "/third"),
        ]);
        let mut session = Session::new(no_redirects(), &HeaderList::new());
        session.pipeline_mut().enable_redirect_resend();

        let url = Url::parse("http://example.com/first").unwrap();
        let response = session
            .dispatch(&transport, &Method::GET, &url, &[], None)
            .await
            .unwrap();

        assert_eq!(response.status, 302);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn leaves_redirects_to_transport_when_allowed() {
        let transport = StubTransport::scripted(vec![StubReply::redirect(302, "/elsewhere")]);
        let mut session = Session::new(SessionSettings::default(), &HeaderList::new());
        session.pipeline_mut().enable_redirect_resend();

        let url = Url::parse("http://example.com/").unwrap();
        let response = session
            .dispatch(&transport, &Method::GET, &url, &[], None)
            .await
            .unwrap();

        assert_eq!(response.status, 302);
        assert_eq!(transport.calls(), 1);
    }
}
