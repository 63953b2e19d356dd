//! Event system for run progress.
//!
//! The orchestrator and the attempt executor describe what they are doing as
//! [`StrategistEvent`]s; handlers decide how to surface them (log lines,
//! console output, test recorders).

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// A candidate set is about to be tried.
#[derive(Debug, Clone)]
pub struct CandidateEvent {
    pub index: usize,
    pub strategies: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// A strategy is about to be applied to the attempt's session.
#[derive(Debug, Clone)]
pub struct StrategyEvent {
    pub index: usize,
    pub strategy: String,
    pub goal: String,
    pub timestamp: DateTime<Utc>,
}

/// A strategy could not apply and was skipped.
#[derive(Debug, Clone)]
pub struct StrategyFailureEvent {
    pub index: usize,
    pub strategy: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// One attempt finished, with or without a response.
#[derive(Debug, Clone)]
pub struct AttemptEvent {
    pub index: usize,
    pub applied: Vec<String>,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub success: bool,
    pub latency: Option<Duration>,
    pub timestamp: DateTime<Utc>,
}

/// The run reached its terminal state.
#[derive(Debug, Clone)]
pub struct RunEvent {
    pub attempts: usize,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum StrategistEvent {
    CandidateStarted(CandidateEvent),
    StrategyExecuting(StrategyEvent),
    StrategyFailed(StrategyFailureEvent),
    AttemptFinished(AttemptEvent),
    RunFinished(RunEvent),
}

/// Trait implemented by event handlers.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &StrategistEvent);
}

/// Dispatcher that broadcasts events to registered handlers.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn dispatch(&self, event: StrategistEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}

/// Logs events using the `log` crate.
#[derive(Debug)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &StrategistEvent) {
        match event {
            StrategistEvent::CandidateStarted(candidate) => {
                log::debug!(
                    "combination {} using [{}]",
                    candidate.index,
                    candidate.strategies.join(", ")
                );
            }
            StrategistEvent::StrategyExecuting(strategy) => {
                log::debug!("executing {}: {}", strategy.strategy, strategy.goal);
            }
            StrategistEvent::StrategyFailed(failure) => {
                log::info!("{} skipped: {}", failure.strategy, failure.reason);
            }
            StrategistEvent::AttemptFinished(attempt) => match (&attempt.status, &attempt.error) {
                (Some(status), _) => log::debug!(
                    "combination {} -> {} ({:.2}s) success={}",
                    attempt.index,
                    status,
                    attempt.latency.unwrap_or_default().as_secs_f64(),
                    attempt.success
                ),
                (None, Some(error)) => {
                    log::warn!("combination {} failed: {}", attempt.index, error);
                }
                (None, None) => {}
            },
            StrategistEvent::RunFinished(run) => {
                log::info!("run finished after {} attempt(s) success={}", run.attempts, run.success);
            }
        }
    }
}
