use crate::random::{pick_index, RandomError, UniformSource};
use regex::Regex;
use std::collections::VecDeque;
use std::fmt;

/// Decides whether the latest emitted token ends generation.
pub enum Stop<T> {
    /// Only `max` ends generation.
    Never,
    /// Stop at a token equal to this one.
    Token(T),
    /// Stop at a token the predicate accepts.
    Matches(Box<dyn Fn(&T) -> bool + Send + Sync>),
}

impl<T: PartialEq> Stop<T> {
    pub fn is_match(&self, token: &T) -> bool {
        match self {
            Stop::Never => false,
            Stop::Token(stop) => stop == token,
            Stop::Matches(predicate) => predicate(token),
        }
    }
}

impl<T: AsRef<str>> Stop<T> {
    /// Stop at a token matched by `pattern`.
    pub fn pattern(pattern: Regex) -> Self {
        Stop::Matches(Box::new(move |token: &T| pattern.is_match(token.as_ref())))
    }
}

impl<T: fmt::Debug> fmt::Debug for Stop<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stop::Never => write!(f, "Never"),
            Stop::Token(token) => f.debug_tuple("Token").field(token).finish(),
            Stop::Matches(_) => write!(f, "Matches(..)"),
        }
    }
}

/// Produces a new sequence whose local transitions follow those of `tokens`.
///
/// Each step picks a random anchor in `tokens` and walks forward, wrapping at
/// the end, until the last `coherence` emitted tokens have been seen in a row.
/// The token right after that run is emitted. When the walk comes back to the
/// anchor without a full match, the anchor token itself is emitted, which is
/// what guarantees progress on every step.
///
/// Generation ends after `max` tokens, or earlier at the first token matching
/// `stop` once at least `min` tokens were emitted. The stop token is part of
/// the output.
///
/// `tokens` must not be empty; an empty input yields an empty output.
pub fn resequence<T, S>(
    tokens: &[T],
    coherence: usize,
    stop: &Stop<T>,
    min: usize,
    max: usize,
    source: &mut S,
) -> Result<Vec<T>, RandomError>
where
    T: Clone + PartialEq,
    S: UniformSource + ?Sized,
{
    let mut output = Vec::with_capacity(max.min(1024));
    if tokens.is_empty() {
        return Ok(output);
    }

    let mut history: VecDeque<T> = VecDeque::with_capacity(coherence + 1);

    while output.len() < max {
        let start = pick_index(source, tokens.len())?;
        let next = &tokens[find_successor(tokens, &history, start)];

        output.push(next.clone());
        history.push_back(next.clone());
        if history.len() > coherence {
            history.pop_front();
        }

        if output.len() >= min && stop.is_match(next) {
            break;
        }
    }

    Ok(output)
}

/// Index of the token following the first run equal to `history`, searching
/// cyclically from `start`. Falls back to `start` after a full lap.
fn find_successor<T: PartialEq>(tokens: &[T], history: &VecDeque<T>, start: usize) -> usize {
    let mut pos = start;
    let mut matched = 0;

    while matched < history.len() {
        // A mismatch restarts the window without re-testing the same token.
        if tokens[pos] == history[matched] {
            matched += 1;
        } else {
            matched = 0;
        }

        pos += 1;
        if pos == tokens.len() {
            pos = 0;
        }
        if pos == start {
            break;
        }
    }

    pos
}
