//! Reqwest-based implementation of the `HttpTransport` trait.
//!
//! Provides a thin adapter that turns a [`DispatchRequest`] into a freshly
//! configured `reqwest::Client` call and converts the result back into the
//! shared [`HttpResponse`] representation. Cookies live in the request's
//! jar, not in the client.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use hyper::ext::ReasonPhrase;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::cookie::Jar;
use reqwest::{Client, redirect::Policy};

use super::headers::{HeaderList, is_title_case};
use super::transport::{
    DispatchRequest, HttpResponse, HttpTransport, SentRequest, SessionSettings, TransportError,
};

const MAX_REDIRECTS: usize = 10;

/// Reqwest-backed transport. Every dispatch builds its own client; cookie
/// state is scoped by the jar carried in the request.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReqwestTransport;

impl ReqwestTransport {
    pub fn new() -> Self {
        Self
    }

    fn client_for(
        settings: &SessionSettings,
        headers: &HeaderList,
        cookies: Arc<Jar>,
    ) -> Result<Client, TransportError> {
        let policy = if settings.allow_redirects {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };

        let mut builder = Client::builder()
            .cookie_provider(cookies)
            .danger_accept_invalid_certs(!settings.verify)
            .redirect(policy);

        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }

        // HTTP/1 names go out lowercase unless title casing is switched on.
        if !headers.is_empty() && headers.names().all(is_title_case) {
            builder = builder.http1_title_case_headers();
        }

        builder
            .build()
            .map_err(|err| TransportError::Build(err.to_string()))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: DispatchRequest) -> Result<HttpResponse, TransportError> {
        let client = Self::client_for(
            &request.settings,
            &request.headers,
            request.cookies.clone(),
        )?;
        let req_headers = convert_headers(&request.headers)?;

        let mut builder = client
            .request(request.method.clone(), request.url.clone())
            .headers(req_headers);

        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }

        if let Some(body) = request.body.clone() {
            builder = builder.body(body);
        }

        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|err| TransportError::Request(err.to_string()))?;
        let elapsed = started.elapsed();

        let status = response.status().as_u16();
        let reason_phrase = response
            .extensions()
            .get::<ReasonPhrase>()
            .map(|phrase| String::from_utf8_lossy(phrase.as_bytes()).into_owned());
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| TransportError::Request(err.to_string()))?;

        Ok(HttpResponse {
            status,
            reason_phrase,
            headers,
            url,
            elapsed,
            body,
            request: SentRequest {
                method: request.method,
                url: request.url,
                headers: request.headers,
            },
        })
    }
}

fn convert_headers(headers: &HeaderList) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers.iter() {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| TransportError::InvalidHeader(name.to_string()))?;
        let header_value = HeaderValue::from_bytes(value.as_bytes())
            .map_err(|_| TransportError::InvalidHeader(name.to_string()))?;
        map.append(header_name, header_value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_headers_in_order() {
        let headers: HeaderList = [("Zeta", "1"), ("Alpha", "2"), ("Mid", "3")]
            .into_iter()
            .collect();

        let map = convert_headers(&headers).unwrap();
        let names: Vec<_> = map.keys().map(|name| name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn accepts_non_ascii_header_values() {
        let mut headers = HeaderList::new();
        headers.push("X-Name", "café");

        let map = convert_headers(&headers).unwrap();
        assert_eq!(map.get("x-name").unwrap().as_bytes(), "café".as_bytes());
    }

    #[test]
    fn rejects_invalid_header_names() {
        let mut headers = HeaderList::new();
        headers.push("bad header", "x");

        assert!(matches!(
            convert_headers(&headers),
            Err(TransportError::InvalidHeader(name)) if name == "bad header"
        ));
    }
}
