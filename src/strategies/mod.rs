//! Strategy descriptors and the catalog holding them.
//!
//! A [`Strategy`] is plain data: a name, a priority, a combinability flag, an
//! optional applicability constraint and a [`Transformation`] that reads one
//! slot of the [`Session`] (its header list or its dispatch pipeline) and may
//! hand back a replacement for that slot.

pub mod headers;
pub mod https_omit;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::core::{DispatchPipeline, HeaderList, Session, SessionSettings};

pub use headers::{
    REFERER, USER_AGENT, append_header_strategy, capitalise_header_name, capitalised_header_strategy,
    ordered_header_strategy, referer_strategy, user_agent_strategy, xhr_strategy,
};
pub use https_omit::{downgrade_https, https_omitting_strategy};

/// Raised by a transformation that cannot apply in the current session.
///
/// Recoverable: the executor skips the strategy and carries on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StrategyFailure {
    #[error("{0} header already exists")]
    HeaderExists(String),
    #[error("strategy not applicable: {0}")]
    NotApplicable(String),
}

/// Header transform. `Ok(None)` means the list was left as is.
pub type HeaderTransform =
    Arc<dyn Fn(&HeaderList) -> Result<Option<HeaderList>, StrategyFailure> + Send + Sync>;

/// Dispatch pipeline transform, given the session's connection settings.
pub type PipelineTransform = Arc<
    dyn Fn(&DispatchPipeline, &SessionSettings) -> Result<Option<DispatchPipeline>, StrategyFailure>
        + Send
        + Sync,
>;

/// Which session slot a strategy works on, and how.
#[derive(Clone)]
pub enum Transformation {
    Headers(HeaderTransform),
    Pipeline(PipelineTransform),
}

impl fmt::Debug for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transformation::Headers(_) => f.write_str("Transformation::Headers"),
            Transformation::Pipeline(_) => f.write_str("Transformation::Pipeline"),
        }
    }
}

/// URL schemes a strategy is restricted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeConstraint {
    schemes: Vec<String>,
}

impl SchemeConstraint {
    pub fn new<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schemes: schemes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, scheme: &str) -> bool {
        self.schemes.iter().any(|allowed| allowed == scheme)
    }

    pub fn schemes(&self) -> &[String] {
        &self.schemes
    }
}

/// Static eligibility rules evaluated once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applicability {
    /// Excluded when the caller already sets this header (any case).
    pub header_key: Option<String>,
    /// Excluded when the request URL's scheme is not listed.
    pub schemes: Option<SchemeConstraint>,
}

/// A named, self-contained request mutation.
#[derive(Debug, Clone)]
pub struct Strategy {
    name: String,
    goal: String,
    priority: u8,
    combinable: bool,
    applicability: Applicability,
    transformation: Transformation,
}

impl Strategy {
    fn new(name: impl Into<String>, priority: u8, transformation: Transformation) -> Self {
        Self {
            name: name.into(),
            goal: String::new(),
            priority,
            combinable: false,
            applicability: Applicability::default(),
            transformation,
        }
    }

    /// Strategy operating on the session header list.
    pub fn headers<F>(name: impl Into<String>, priority: u8, transform: F) -> Self
    where
        F: Fn(&HeaderList) -> Result<Option<HeaderList>, StrategyFailure> + Send + Sync + 'static,
    {
        Self::new(name, priority, Transformation::Headers(Arc::new(transform)))
    }

    /// Strategy operating on the session dispatch pipeline.
    pub fn pipeline<F>(name: impl Into<String>, priority: u8, transform: F) -> Self
    where
        F: Fn(&DispatchPipeline, &SessionSettings) -> Result<Option<DispatchPipeline>, StrategyFailure>
            + Send
            + Sync
            + 'static,
    {
        Self::new(name, priority, Transformation::Pipeline(Arc::new(transform)))
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    pub fn combinable(mut self, combinable: bool) -> Self {
        self.combinable = combinable;
        self
    }

    pub fn requires_absent_header(mut self, key: impl Into<String>) -> Self {
        self.applicability.header_key = Some(key.into());
        self
    }

    pub fn restrict_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.applicability.schemes = Some(SchemeConstraint::new(schemes));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn is_combinable(&self) -> bool {
        self.combinable
    }

    pub fn applicability(&self) -> &Applicability {
        &self.applicability
    }

    pub fn transformation(&self) -> &Transformation {
        &self.transformation
    }

    /// Reads the targeted slot, runs the transformation and writes back any
    /// replacement it produced.
    pub fn apply(&self, session: &mut Session) -> Result<(), StrategyFailure> {
        match &self.transformation {
            Transformation::Headers(transform) => {
                if let Some(headers) = transform(session.headers())? {
                    session.set_headers(headers);
                }
            }
            Transformation::Pipeline(transform) => {
                if let Some(pipeline) = transform(session.pipeline(), session.settings())? {
                    *session.pipeline_mut() = pipeline;
                }
            }
        }
        Ok(())
    }
}

/// Immutable, ordered registry of strategies. Position in the catalog is the
/// tie-break between strategies of equal priority.
#[derive(Debug, Clone)]
pub struct StrategyCatalog {
    strategies: Arc<[Strategy]>,
}

impl StrategyCatalog {
    pub fn new(strategies: Vec<Strategy>) -> Self {
        Self {
            strategies: strategies.into(),
        }
    }

    /// The built-in strategies.
    pub fn standard() -> Self {
        Self::new(vec![
            ordered_header_strategy(),
            capitalised_header_strategy(),
            referer_strategy(),
            xhr_strategy(),
            user_agent_strategy(),
            https_omitting_strategy(),
        ])
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Strategy> {
        self.strategies.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Strategy> {
        self.strategies.iter().find(|strategy| strategy.name == name)
    }
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl<'a> IntoIterator for &'a StrategyCatalog {
    type Item = &'a Strategy;
    type IntoIter = std::slice::Iter<'a, Strategy>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
