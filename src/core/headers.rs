//! Ordered, case-preserving header list.
//!
//! `http::HeaderMap` lowercases names on insertion, which would erase the very
//! differences the header strategies are trying to produce. Sessions keep
//! their headers in a `HeaderList` instead and only convert to a transport map
//! at dispatch time.

use std::fmt;

use http::{HeaderName, HeaderValue};
use thiserror::Error;

/// A header that cannot be put on the wire.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid header {name:?}")]
pub struct InvalidHeader {
    pub name: String,
}

/// Ordered collection of `(name, value)` pairs with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<(String, String)>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` when a header matching `name` (ignoring ASCII case) exists.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Value of the first header matching `name`, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name)
            .map(|index| self.entries[index].1.as_str())
    }

    /// Sets a header, replacing a case-insensitive match in place.
    ///
    /// When a match exists its position is kept but the caller's spelling of
    /// the name is adopted. New names are appended.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => self.entries[index] = (name, value),
            None => self.entries.push((name, value)),
        }
    }

    /// Appends a header without checking for existing names.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Removes every header matching `name`, returning the first removed value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let mut removed = None;
        self.entries.retain(|(key, value)| {
            if key.eq_ignore_ascii_case(name) {
                if removed.is_none() {
                    removed = Some(value.clone());
                }
                false
            } else {
                true
            }
        });
        removed
    }

    /// Merges `other` into this list using [`HeaderList::set`] semantics.
    pub fn merge(&mut self, other: &HeaderList) {
        for (name, value) in other.iter() {
            self.set(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Checks every name and value against HTTP syntax.
    pub fn validate(&self) -> Result<(), InvalidHeader> {
        for (name, value) in self.iter() {
            let valid = HeaderName::from_bytes(name.as_bytes()).is_ok()
                && HeaderValue::from_bytes(value.as_bytes()).is_ok();
            if !valid {
                return Err(InvalidHeader {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderList
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut list = HeaderList::new();
        for (name, value) in iter {
            list.set(name, value);
        }
        list
    }
}

impl IntoIterator for HeaderList {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl fmt::Display for HeaderList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            writeln!(f, "\t{name:?}: {value:?}")?;
        }
        Ok(())
    }
}

/// Returns `true` when `name` starts each dash- or space-separated word with
/// an uppercase letter, e.g. `X-Requested-With`.
pub fn is_title_case(name: &str) -> bool {
    let mut word_start = true;
    for ch in name.chars() {
        if word_start && ch.is_ascii_lowercase() {
            return false;
        }
        word_start = ch == '-' || ch.is_whitespace();
    }
    true
}
