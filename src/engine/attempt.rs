//! Attempt executor.
//!
//! Execution steps for one candidate set:
//! 1. Build a fresh [`Session`] from the caller's settings and headers.
//! 2. Apply the members in ascending priority order; a strategy that fails
//!    is recorded and skipped, the rest still apply.
//! 3. Dispatch exactly one logical request through the session.
//! 4. Report the response (or transport error) with the strategies that
//!    actually applied. The session is dropped on return.

use chrono::Utc;
use url::Url;

use crate::config::RequestSpec;
use crate::core::{HttpResponse, HttpTransport, Session, TransportError};
use crate::modules::events::{
    EventDispatcher, StrategistEvent, StrategyEvent, StrategyFailureEvent,
};
use crate::strategies::{Strategy, StrategyFailure};

use super::combinations::CandidateSet;

/// Everything that happened during one attempt.
#[derive(Debug)]
pub struct AttemptReport<'a> {
    pub index: usize,
    pub candidate: CandidateSet<'a>,
    pub applied: Vec<&'a Strategy>,
    pub failed: Vec<(&'a Strategy, StrategyFailure)>,
    pub result: Result<HttpResponse, TransportError>,
}

impl<'a> AttemptReport<'a> {
    /// `true` when a response came back with a non-error status.
    pub fn succeeded(&self) -> bool {
        matches!(&self.result, Ok(response) if response.is_ok())
    }

    pub fn response(&self) -> Option<&HttpResponse> {
        self.result.as_ref().ok()
    }

    pub fn applied_names(&self) -> Vec<String> {
        self.applied
            .iter()
            .map(|strategy| strategy.name().to_string())
            .collect()
    }
}

/// Runs one candidate set against the transport.
pub async fn execute_attempt<'a>(
    transport: &dyn HttpTransport,
    request: &RequestSpec,
    url: &Url,
    index: usize,
    candidate: CandidateSet<'a>,
    events: &EventDispatcher,
) -> AttemptReport<'a> {
    let mut session = Session::new(request.settings(), &request.headers);
    let mut applied = Vec::with_capacity(candidate.len());
    let mut failed = Vec::new();

    for strategy in candidate.by_priority() {
        events.dispatch(StrategistEvent::StrategyExecuting(StrategyEvent {
            index,
            strategy: strategy.name().to_string(),
            goal: strategy.goal().to_string(),
            timestamp: Utc::now(),
        }));

        match strategy.apply(&mut session) {
            Ok(()) => applied.push(strategy),
            Err(failure) => {
                events.dispatch(StrategistEvent::StrategyFailed(StrategyFailureEvent {
                    index,
                    strategy: strategy.name().to_string(),
                    reason: failure.to_string(),
                    timestamp: Utc::now(),
                }));
                failed.push((strategy, failure));
            }
        }
    }

    let result = session
        .dispatch(
            transport,
            &request.method,
            url,
            &request.params,
            request.body.as_ref(),
        )
        .await;

    AttemptReport {
        index,
        candidate,
        applied,
        failed,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HeaderList;
    use crate::core::stub::StubTransport;
    use crate::strategies::{
        StrategyCatalog, capitalised_header_strategy, ordered_header_strategy, referer_strategy,
        xhr_strategy,
    };

    fn marker(name: &'static str, priority: u8) -> Strategy {
        Strategy::headers(name, priority, move |headers| {
            let mut next = headers.clone();
            let trail = match headers.get("X-Trail") {
                Some(previous) => format!("{previous},{name}"),
                None => name.to_string(),
            };
            next.set("X-Trail", trail);
            Ok(Some(next))
        })
        .combinable(true)
    }

    fn url() -> Url {
        Url::parse("http://example.com/").unwrap()
    }

    #[tokio::test]
    async fn applies_members_in_priority_order() {
        let late = marker("Late", 9);
        let early = marker("Early", 0);
        let middle = marker("Middle", 4);
        let candidate = CandidateSet::new(vec![&late, &early, &middle]);
        let transport = StubTransport::always(200);
        let request = RequestSpec::builder("http://example.com/").build();

        let report = execute_attempt(
            &transport,
            &request,
            &url(),
            1,
            candidate,
            &EventDispatcher::new(),
        )
        .await;

        assert!(report.succeeded());
        assert_eq!(report.applied_names(), vec!["Early", "Middle", "Late"]);
        let seen = transport.seen();
        assert_eq!(seen[0].headers.get("x-trail"), Some("Early,Middle,Late"));
    }

    #[tokio::test]
    async fn header_conflict_does_not_block_other_strategies() {
        let duplicate = Strategy::headers("EarlyReferer", 0, |headers| {
            let mut next = headers.clone();
            next.push("referer", "https://first.example/");
            Ok(Some(next))
        })
        .combinable(true);
        let referer = referer_strategy();
        let xhr = xhr_strategy();
        let candidate = CandidateSet::new(vec![&referer, &duplicate, &xhr]);
        let transport = StubTransport::always(200);
        let request = RequestSpec::builder("http://example.com/").build();

        let report = execute_attempt(
            &transport,
            &request,
            &url(),
            1,
            candidate,
            &EventDispatcher::new(),
        )
        .await;

        assert_eq!(report.applied_names(), vec!["EarlyReferer", "XHRStrategy"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0.name(), "RefererStrategy");
        assert_eq!(
            report.failed[0].1,
            StrategyFailure::HeaderExists("Referer".into())
        );

        let sent = &transport.seen()[0].headers;
        assert_eq!(sent.get("referer"), Some("https://first.example/"));
        assert_eq!(sent.get("x-requested-with"), Some("XMLHttpRequest"));
    }

    #[tokio::test]
    async fn capitalise_then_order_produces_sorted_title_case_headers() {
        let ordered = ordered_header_strategy();
        let capitalised = capitalised_header_strategy();
        let candidate = CandidateSet::new(vec![&ordered, &capitalised]);
        let transport = StubTransport::always(200);
        let request = RequestSpec::builder("http://example.com/")
            .header("x-token", "abc")
            .build();

        let report = execute_attempt(
            &transport,
            &request,
            &url(),
            1,
            candidate,
            &EventDispatcher::new(),
        )
        .await;

        assert_eq!(
            report.applied_names(),
            vec!["CapitalisedHeaderStrategy", "OrderedHeaderStrategy"]
        );
        let names: Vec<String> = transport.seen()[0]
            .headers
            .names()
            .map(str::to_string)
            .collect();
        assert_eq!(
            names,
            vec!["Accept", "Accept-Encoding", "Connection", "X-Token"]
        );
    }

    #[tokio::test]
    async fn every_attempt_starts_from_a_clean_session() {
        let catalog = StrategyCatalog::standard();
        let xhr = catalog.get("XHRStrategy").unwrap();
        let transport = StubTransport::always(404);
        let request = RequestSpec::builder("http://example.com/").build();
        let events = EventDispatcher::new();

        let first = execute_attempt(
            &transport,
            &request,
            &url(),
            1,
            CandidateSet::new(vec![xhr]),
            &events,
        )
        .await;
        let second = execute_attempt(&transport, &request, &url(), 2, CandidateSet::new(vec![]), &events)
            .await;

        assert!(!first.succeeded());
        assert!(second.applied.is_empty());
        let seen = transport.seen();
        assert!(seen[0].headers.contains("x-requested-with"));
        assert!(!seen[1].headers.contains("x-requested-with"));
        assert_eq!(seen[1].headers, {
            let mut expected = HeaderList::new();
            expected.push("Accept-Encoding", "gzip, deflate");
            expected.push("Accept", "*/*");
            expected.push("Connection", "keep-alive");
            expected
        });
    }

    #[tokio::test]
    async fn transport_errors_are_reported_not_raised() {
        let transport =
            StubTransport::new(|_, _| Err(TransportError::Request("connection refused".into())));
        let request = RequestSpec::builder("http://example.com/").build();

        let report = execute_attempt(
            &transport,
            &request,
            &url(),
            1,
            CandidateSet::new(vec![]),
            &EventDispatcher::new(),
        )
        .await;

        assert!(!report.succeeded());
        assert!(report.response().is_none());
    }
}
