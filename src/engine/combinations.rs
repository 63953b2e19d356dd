//! Combination enumerator.
//!
//! Produces the candidate sets of a run lazily: every subset of the
//! combinable strategies by ascending size (the empty set, i.e. the plain
//! request, comes first), followed by each standalone strategy on its own.
//! For `n` combinable and `m` standalone strategies that is `2^n + m`
//! candidates.

use std::iter::FusedIterator;

use crate::strategies::Strategy;

use super::applicability::ApplicableStrategies;

/// All subsets of `items`, by ascending size, each size in lexicographic
/// index order.
#[derive(Debug, Clone)]
pub struct Subsets<T> {
    items: Vec<T>,
    size: usize,
    indices: Vec<usize>,
    fresh: bool,
    done: bool,
    emitted: u128,
}

impl<T: Clone> Subsets<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            size: 0,
            indices: Vec::new(),
            fresh: true,
            done: false,
            emitted: 0,
        }
    }

    fn total(&self) -> u128 {
        1u128.checked_shl(self.items.len() as u32).unwrap_or(u128::MAX)
    }

    fn emit(&mut self) -> Vec<T> {
        self.emitted += 1;
        self.indices
            .iter()
            .map(|&index| self.items[index].clone())
            .collect()
    }

    /// Moves `indices` to the next combination of the current size.
    fn advance(&mut self) -> bool {
        let n = self.items.len();
        let k = self.size;
        let Some(pivot) = (0..k).rev().find(|&i| self.indices[i] != i + n - k) else {
            return false;
        };

        self.indices[pivot] += 1;
        for next in pivot + 1..k {
            self.indices[next] = self.indices[next - 1] + 1;
        }
        true
    }
}

impl<T: Clone> Iterator for Subsets<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            if self.fresh {
                self.fresh = false;
                self.indices = (0..self.size).collect();
                return Some(self.emit());
            }

            if self.advance() {
                return Some(self.emit());
            }

            self.size += 1;
            if self.size > self.items.len() {
                self.done = true;
            } else {
                self.fresh = true;
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total().saturating_sub(self.emitted);
        match usize::try_from(remaining) {
            Ok(exact) => (exact, Some(exact)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl<T: Clone> FusedIterator for Subsets<T> {}

/// The strategies tried together in one attempt.
#[derive(Debug, Clone)]
pub struct CandidateSet<'a> {
    members: Vec<&'a Strategy>,
}

impl<'a> CandidateSet<'a> {
    pub fn new(members: Vec<&'a Strategy>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[&'a Strategy] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.members
            .iter()
            .map(|strategy| strategy.name().to_string())
            .collect()
    }

    /// Members in application order: ascending priority, ties kept in
    /// catalog order.
    pub fn by_priority(&self) -> Vec<&'a Strategy> {
        let mut ordered = self.members.clone();
        ordered.sort_by_key(|strategy| strategy.priority());
        ordered
    }
}

/// Lazy, single-pass sequence of candidate sets.
#[derive(Debug, Clone)]
pub struct CandidateSets<'a> {
    subsets: Subsets<&'a Strategy>,
    standalone: std::vec::IntoIter<&'a Strategy>,
}

impl<'a> CandidateSets<'a> {
    pub fn new(applicable: &ApplicableStrategies<'a>) -> Self {
        Self {
            subsets: Subsets::new(applicable.combinable.clone()),
            standalone: applicable.standalone.clone().into_iter(),
        }
    }
}

impl<'a> Iterator for CandidateSets<'a> {
    type Item = CandidateSet<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(members) = self.subsets.next() {
            return Some(CandidateSet::new(members));
        }
        self.standalone
            .next()
            .map(|strategy| CandidateSet::new(vec![strategy]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (low, high) = self.subsets.size_hint();
        let rest = self.standalone.len();
        (
            low.saturating_add(rest),
            high.and_then(|high| high.checked_add(rest)),
        )
    }
}

impl FusedIterator for CandidateSets<'_> {}

pub fn enumerate_candidates<'a>(applicable: &ApplicableStrategies<'a>) -> CandidateSets<'a> {
    CandidateSets::new(applicable)
}
