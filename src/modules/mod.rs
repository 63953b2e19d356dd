//! Cross-cutting services module
//!
//! Progress events and their handlers.

pub mod events;

pub use events::{
    AttemptEvent, CandidateEvent, EventDispatcher, EventHandler, LoggingHandler, RunEvent,
    StrategistEvent, StrategyEvent, StrategyFailureEvent,
};
