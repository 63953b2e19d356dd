//! # content-access-strategies
//!
//! Finds a way to fetch a resource that refuses plain requests by retrying it
//! under combinations of request-shaping strategies.
//!
//! ## Features
//!
//! - Ordered and case-preserving header lists
//! - Header strategies: ordering, capitalisation, Referer, XHR and User-Agent
//! - HTTPS to HTTP downgrade with an optional one-shot redirect re-issue
//! - Lazy, priority-aware enumeration of strategy combinations
//! - Progress events with pluggable handlers
//!
//! ## Example
//!
//! ```no_run
//! use content_access_strategies::{RunOutcome, Strategist};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let strategist = Strategist::new();
//!     match strategist.get("https://example.com").await? {
//!         RunOutcome::Success(run) => println!("{}", run.response.status),
//!         RunOutcome::Exhausted { attempts } => println!("{attempts} attempts failed"),
//!     }
//!     Ok(())
//! }
//! ```

mod strategist;

pub mod config;
pub mod core;
pub mod engine;
pub mod modules;
pub mod strategies;

pub use crate::strategist::{
    RunOutcome,
    Strategist,
    StrategistBuilder,
    StrategistError,
    StrategistResult,
    SuccessfulRun,
};

pub use crate::config::{RequestSpec, RequestSpecBuilder, promote_method};

pub use crate::core::{
    DispatchPipeline,
    DispatchRequest,
    HeaderList,
    HttpResponse,
    HttpTransport,
    InvalidHeader,
    ReqwestTransport,
    SentRequest,
    Session,
    SessionSettings,
    TransportError,
};

pub use crate::strategies::{
    Applicability,
    SchemeConstraint,
    Strategy,
    StrategyCatalog,
    StrategyFailure,
    Transformation,
};

pub use crate::engine::{
    ApplicableStrategies,
    AttemptReport,
    CandidateSet,
    FilterError,
    enumerate_candidates,
    execute_attempt,
    filter_applicable,
};

pub use crate::modules::{EventDispatcher, EventHandler, LoggingHandler, StrategistEvent};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
