//! High level run orchestration.
//!
//! Wires the applicability filter, the combination enumerator and the
//! attempt executor into a two-state machine: `Running` walks the candidate
//! sets one at a time, `Done` is terminal and holds either the first
//! successful response or the exhaustion notice.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use url::Url;

use crate::config::RequestSpec;
use crate::core::{HttpResponse, HttpTransport, InvalidHeader, ReqwestTransport};
use crate::engine::{
    CandidateSet, FilterError, enumerate_candidates, execute_attempt, filter_applicable,
};
use crate::modules::events::{
    AttemptEvent, CandidateEvent, EventDispatcher, EventHandler, LoggingHandler, RunEvent,
    StrategistEvent,
};
use crate::strategies::StrategyCatalog;

/// Result alias used across the orchestration layer.
pub type StrategistResult<T> = Result<T, StrategistError>;

/// Fatal errors; they abort the run before any request is sent.
#[derive(Debug, Error)]
pub enum StrategistError {
    #[error("configuration error: {0}")]
    Filter(#[from] FilterError),
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("configuration error: {0}")]
    Header(#[from] InvalidHeader),
}

/// The attempt that got through.
#[derive(Debug, Clone)]
pub struct SuccessfulRun {
    /// 1-based number of the winning candidate, equal to the attempts made.
    pub attempts: usize,
    pub strategies: Vec<String>,
    pub applied: Vec<String>,
    pub response: HttpResponse,
}

/// Terminal outcome of a run.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Success(Box<SuccessfulRun>),
    Exhausted { attempts: usize },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success(_))
    }

    pub fn attempts(&self) -> usize {
        match self {
            RunOutcome::Success(run) => run.attempts,
            RunOutcome::Exhausted { attempts } => *attempts,
        }
    }
}

enum RunState {
    Running { attempts: usize },
    Done(RunOutcome),
}

/// Fluent builder for [`Strategist`].
pub struct StrategistBuilder {
    catalog: StrategyCatalog,
    transport: Option<Arc<dyn HttpTransport>>,
    handlers: Vec<Arc<dyn EventHandler>>,
    log_events: bool,
}

impl StrategistBuilder {
    pub fn new() -> Self {
        Self {
            catalog: StrategyCatalog::standard(),
            transport: None,
            handlers: Vec::new(),
            log_events: true,
        }
    }

    pub fn with_catalog(mut self, catalog: StrategyCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Skip the default [`LoggingHandler`].
    pub fn disable_logging(mut self) -> Self {
        self.log_events = false;
        self
    }

    pub fn build(self) -> Strategist {
        let mut events = EventDispatcher::new();
        if self.log_events {
            events.register_handler(Arc::new(LoggingHandler));
        }
        for handler in self.handlers {
            events.register_handler(handler);
        }

        Strategist {
            catalog: self.catalog,
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(ReqwestTransport::new())),
            events,
        }
    }
}

impl Default for StrategistBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Main orchestrator.
pub struct Strategist {
    catalog: StrategyCatalog,
    transport: Arc<dyn HttpTransport>,
    events: EventDispatcher,
}

impl Strategist {
    /// Standard catalog over the reqwest transport.
    pub fn new() -> Self {
        StrategistBuilder::new().build()
    }

    pub fn builder() -> StrategistBuilder {
        StrategistBuilder::new()
    }

    pub fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    /// Shorthand for a plain GET run.
    pub async fn get(&self, url: &str) -> StrategistResult<RunOutcome> {
        self.run(&RequestSpec::builder(url).build()).await
    }

    /// Tries candidate sets in order until one yields a non-error response.
    pub async fn run(&self, request: &RequestSpec) -> StrategistResult<RunOutcome> {
        let applicable = filter_applicable(&self.catalog, request)?;
        request.headers.validate()?;
        let url = Url::parse(&request.url)?;

        log::info!(
            "{} {} with {} combinable and {} standalone strategies",
            request.method,
            url,
            applicable.combinable.len(),
            applicable.standalone.len()
        );

        let mut candidates = enumerate_candidates(&applicable);
        let mut state = RunState::Running { attempts: 0 };

        loop {
            state = match state {
                RunState::Running { attempts } => match candidates.next() {
                    Some(candidate) => self.attempt(request, &url, attempts + 1, candidate).await,
                    None => RunState::Done(RunOutcome::Exhausted { attempts }),
                },
                RunState::Done(outcome) => {
                    self.events.dispatch(StrategistEvent::RunFinished(RunEvent {
                        attempts: outcome.attempts(),
                        success: outcome.is_success(),
                        timestamp: Utc::now(),
                    }));
                    return Ok(outcome);
                }
            };
        }
    }

    /// One `Running` step: try `candidate` and pick the next state.
    async fn attempt(
        &self,
        request: &RequestSpec,
        url: &Url,
        index: usize,
        candidate: CandidateSet<'_>,
    ) -> RunState {
        let strategies = candidate.names();
        self.events
            .dispatch(StrategistEvent::CandidateStarted(CandidateEvent {
                index,
                strategies: strategies.clone(),
                timestamp: Utc::now(),
            }));

        let report = execute_attempt(
            self.transport.as_ref(),
            request,
            url,
            index,
            candidate,
            &self.events,
        )
        .await;

        let success = report.succeeded();
        let applied = report.applied_names();
        self.events
            .dispatch(StrategistEvent::AttemptFinished(AttemptEvent {
                index,
                applied: applied.clone(),
                status: report.response().map(|response| response.status),
                error: report.result.as_ref().err().map(ToString::to_string),
                success,
                latency: report.response().map(|response| response.elapsed),
                timestamp: Utc::now(),
            }));

        match report.result {
            Ok(response) if success => RunState::Done(RunOutcome::Success(Box::new(SuccessfulRun {
                attempts: index,
                strategies,
                applied,
                response,
            }))),
            _ => RunState::Running { attempts: index },
        }
    }
}

impl Default for Strategist {
    fn default() -> Self {
        Self::new()
    }
}
