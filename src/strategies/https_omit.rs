//! HTTPS omission strategy.
//!
//! Some origins only gate their `https` endpoint. This strategy installs a
//! before-send rewrite that downgrades the request to plain `http`. When the
//! caller disallows redirects it also turns on the pipeline's one-shot
//! redirect re-issue, so an `http` -> `https` bounce still reaches content.

use std::sync::Arc;

use url::Url;

use super::Strategy;

/// Rewrites an `https` URL to `http`, leaving every other URL untouched.
pub fn downgrade_https(mut url: Url) -> Url {
    if url.scheme() == "https" && url.set_scheme("http").is_err() {
        log::warn!("could not downgrade {url} to http");
    }
    url
}

pub fn https_omitting_strategy() -> Strategy {
    Strategy::pipeline("HttpsOmittingStrategy", 0b01, |pipeline, settings| {
        let mut next = pipeline.clone();
        next.push_rewrite(Arc::new(downgrade_https));
        if !settings.allow_redirects {
            next.enable_redirect_resend();
        }
        Ok(Some(next))
    })
    .restrict_schemes(["https"])
    .with_goal("Attempts to convert HTTPS to HTTP before sending the request.")
}
