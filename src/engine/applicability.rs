//! Applicability filter.
//!
//! Runs once per run against the caller's original request and decides which
//! catalog entries are eligible at all, split into combinable and standalone
//! strategies. Catalog order is preserved in both partitions.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::config::RequestSpec;
use crate::strategies::{Strategy, StrategyCatalog};

static SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)://").expect("valid scheme regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("URL {url:?} does not have a scheme; provide a scheme [http/https].")]
    MissingScheme { url: String },
}

/// Eligible strategies for one run.
#[derive(Debug, Default)]
pub struct ApplicableStrategies<'a> {
    pub combinable: Vec<&'a Strategy>,
    pub standalone: Vec<&'a Strategy>,
}

impl ApplicableStrategies<'_> {
    pub fn len(&self) -> usize {
        self.combinable.len() + self.standalone.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Text before the first `://`, if any.
pub fn url_scheme(url: &str) -> Option<&str> {
    SCHEME
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|scheme| scheme.as_str())
}

/// Checks one strategy against the request.
///
/// The header constraint is evaluated first; a strategy excluded by it never
/// looks at the URL.
pub fn is_applicable(strategy: &Strategy, request: &RequestSpec) -> Result<bool, FilterError> {
    let applicability = strategy.applicability();

    if let Some(key) = &applicability.header_key
        && request.headers.contains(key)
    {
        return Ok(false);
    }

    if let Some(constraint) = &applicability.schemes {
        let scheme = url_scheme(&request.url).ok_or_else(|| FilterError::MissingScheme {
            url: request.url.clone(),
        })?;
        if !constraint.allows(scheme) {
            return Ok(false);
        }
    }

    Ok(true)
}

pub fn filter_applicable<'a>(
    catalog: &'a StrategyCatalog,
    request: &RequestSpec,
) -> Result<ApplicableStrategies<'a>, FilterError> {
    let mut applicable = ApplicableStrategies::default();

    for strategy in catalog {
        if !is_applicable(strategy, request)? {
            log::debug!("{} is not applicable to {}", strategy.name(), request.url);
            continue;
        }

        if strategy.is_combinable() {
            applicable.combinable.push(strategy);
        } else {
            applicable.standalone.push(strategy);
        }
    }

    Ok(applicable)
}
