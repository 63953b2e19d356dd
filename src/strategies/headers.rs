//! Header-shaping strategies.
//!
//! - ordering: sort header names ascending
//! - capitalisation: `x-requested-with` -> `X-Requested-With`
//! - append family: add one fixed header unless it is already present

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{Strategy, StrategyFailure};
use crate::core::HeaderList;

pub const REFERER: &str = "https://www.google.com/";

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const APPEND_PRIORITY: u8 = 0b11;

static UNCAPITALISED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[-\s])([a-z])").expect("valid capitalisation regex"));

/// Uppercases the first letter of every dash- or space-separated word.
pub fn capitalise_header_name(name: &str) -> String {
    UNCAPITALISED
        .replace_all(name, |caps: &Captures<'_>| {
            format!("{}{}", &caps[1], caps[2].to_ascii_uppercase())
        })
        .into_owned()
}

fn ordered_headers(headers: &HeaderList) -> HeaderList {
    let mut entries: Vec<(String, String)> = headers.clone().into_iter().collect();
    entries.sort_by(|(left, _), (right, _)| left.cmp(right));

    let mut ordered = HeaderList::new();
    for (name, value) in entries {
        ordered.push(name, value);
    }
    ordered
}

fn capitalised_headers(headers: &HeaderList) -> HeaderList {
    let mut capitalised = HeaderList::new();
    for (name, value) in headers.iter() {
        // A clash after renaming collapses into the earlier slot, last value wins.
        capitalised.set(capitalise_header_name(name), value);
    }
    capitalised
}

pub fn ordered_header_strategy() -> Strategy {
    Strategy::headers("OrderedHeaderStrategy", 0b10, |headers| {
        Ok(Some(ordered_headers(headers)))
    })
    .combinable(true)
    .with_goal("Converts the headers to a sorted ordered header list.")
}

pub fn capitalised_header_strategy() -> Strategy {
    Strategy::headers("CapitalisedHeaderStrategy", 0b01, |headers| {
        Ok(Some(capitalised_headers(headers)))
    })
    .combinable(true)
    .with_goal("Capitalises the headers properly.")
}

/// Builds a combinable strategy that appends `key: value`.
///
/// The strategy is filtered out up front when the caller already sets `key`
/// and fails at apply time when an earlier strategy of the same candidate set
/// has added it.
pub fn append_header_strategy(name: &str, key: &'static str, value: &'static str) -> Strategy {
    Strategy::headers(name, APPEND_PRIORITY, move |headers| {
        if headers.contains(key) {
            return Err(StrategyFailure::HeaderExists(key.to_string()));
        }
        let mut next = headers.clone();
        next.push(key, value);
        Ok(Some(next))
    })
    .combinable(true)
    .requires_absent_header(key)
    .with_goal(format!("Sets headers: {key} => {value:?}"))
}

pub fn referer_strategy() -> Strategy {
    append_header_strategy("RefererStrategy", "Referer", REFERER)
}

pub fn xhr_strategy() -> Strategy {
    append_header_strategy("XHRStrategy", "X-Requested-With", "XMLHttpRequest")
}

pub fn user_agent_strategy() -> Strategy {
    append_header_strategy("UserAgentStrategy", "User-Agent", USER_AGENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Session, SessionSettings};

    fn session_with(headers: &[(&str, &str)]) -> Session {
        let caller: HeaderList = headers.iter().copied().collect();
        let mut session = Session::new(SessionSettings::default(), &HeaderList::new());
        session.set_headers(caller);
        session
    }

    #[test]
    fn ordering_sorts_names_and_keeps_values() {
        let mut session = session_with(&[
            ("User-Agent", "ua"),
            ("Accept", "*/*"),
            ("X-Token", "abc"),
            ("Cookie", "a=b"),
        ]);

        ordered_header_strategy().apply(&mut session).unwrap();

        let entries: Vec<_> = session.headers().iter().collect();
        assert_eq!(
            entries,
            vec![
                ("Accept", "*/*"),
                ("Cookie", "a=b"),
                ("User-Agent", "ua"),
                ("X-Token", "abc"),
            ]
        );
    }

    #[test]
    fn ordering_is_byte_wise() {
        let mut headers = HeaderList::new();
        headers.push("b", "1");
        headers.push("B", "2");
        headers.push("a", "3");
        let mut session = session_with(&[]);
        session.set_headers(headers);

        ordered_header_strategy().apply(&mut session).unwrap();

        let names: Vec<_> = session.headers().names().collect();
        assert_eq!(names, vec!["B", "a", "b"]);
    }

    #[test]
    fn capitalises_each_word() {
        assert_eq!(capitalise_header_name("x-requested-with"), "X-Requested-With");
        assert_eq!(capitalise_header_name("accept"), "Accept");
        assert_eq!(capitalise_header_name("Content-type"), "Content-Type");
        assert_eq!(capitalise_header_name("x--double"), "X--Double");
        assert_eq!(capitalise_header_name("X-Already"), "X-Already");
    }

    #[test]
    fn capitalisation_keeps_positions() {
        let mut session = session_with(&[("x-token", "abc"), ("Accept", "*/*"), ("dnt", "1")]);

        capitalised_header_strategy().apply(&mut session).unwrap();

        let entries: Vec<_> = session.headers().iter().collect();
        assert_eq!(
            entries,
            vec![("X-Token", "abc"), ("Accept", "*/*"), ("Dnt", "1")]
        );
    }

    #[test]
    fn append_adds_missing_header() {
        let mut session = session_with(&[("Accept", "*/*")]);

        xhr_strategy().apply(&mut session).unwrap();

        assert_eq!(
            session.headers().get("x-requested-with"),
            Some("XMLHttpRequest")
        );
        assert_eq!(session.headers().names().last(), Some("X-Requested-With"));
    }

    #[test]
    fn append_fails_when_header_present_in_any_case() {
        let mut session = session_with(&[("referer", "https://example.com/")]);

        let err = referer_strategy().apply(&mut session).unwrap_err();

        assert_eq!(err, StrategyFailure::HeaderExists("Referer".into()));
        assert_eq!(session.headers().get("Referer"), Some("https://example.com/"));
    }

    #[test]
    fn append_strategies_declare_header_key() {
        assert_eq!(
            user_agent_strategy().applicability().header_key.as_deref(),
            Some("User-Agent")
        );
        assert_eq!(
            user_agent_strategy().goal(),
            format!("Sets headers: User-Agent => {USER_AGENT:?}")
        );
    }
}
