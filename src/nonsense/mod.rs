//! Nonsense generator.
//!
//! Re-sequences a token list so that tokens follow one another with roughly
//! the same probabilities as in the source, but in a different order. Fed
//! with a text split into words it produces nonsense in the style and
//! vocabulary of the original.

pub mod resequence;
pub mod token;

pub use resequence::{resequence, Stop};
pub use token::{chars, ends_sentence, join_chars, join_words, words};

use crate::random::{RandomError, UniformSource};
use serde::Deserialize;

/// Word level generation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Generator {
    /// Number of preceding words that must match. 2 reads well.
    pub coherence: usize,
    /// Sentence terminators are ignored before this many words.
    pub min_words: usize,
    /// Output is cut here even without a terminator.
    pub max_words: usize,
    /// When false only `max_words` ends the text.
    pub whole_sentences: bool,
}

/// Rough word length used to size letter level output.
const LETTERS_PER_WORD: usize = 6;

impl Default for Generator {
    fn default() -> Self {
        Self {
            coherence: 2,
            min_words: 5,
            max_words: 60,
            whole_sentences: true,
        }
    }
}

impl Generator {
    pub fn with_coherence(mut self, coherence: usize) -> Self {
        self.coherence = coherence;
        self
    }

    /// Generates text from `corpus` ending at the first sentence terminator
    /// once `min_words` is reached. Returns an empty string for an empty
    /// corpus.
    pub fn sentence<S>(&self, corpus: &[String], source: &mut S) -> Result<String, RandomError>
    where
        S: UniformSource + ?Sized,
    {
        let stop = if self.whole_sentences {
            Stop::Matches(Box::new(|word: &String| ends_sentence(word)))
        } else {
            Stop::Never
        };
        self.until(corpus, &stop, source)
    }

    /// Generates text from `corpus` ending at the first word accepted by
    /// `stop` once `min_words` is reached.
    pub fn until<S>(&self, corpus: &[String], stop: &Stop<String>, source: &mut S) -> Result<String, RandomError>
    where
        S: UniformSource + ?Sized,
    {
        let out = resequence(
            corpus,
            self.coherence,
            stop,
            self.min_words,
            self.max_words,
            source,
        )?;
        Ok(join_words(&out))
    }

    /// Letter level variant of [`Generator::sentence`]: re-sequences the code
    /// points of `text` and stops after a full stop. Needs a higher coherence
    /// than word level generation to stay readable.
    pub fn letters<S>(&self, text: &str, source: &mut S) -> Result<String, RandomError>
    where
        S: UniformSource + ?Sized,
    {
        let stop = if self.whole_sentences {
            Stop::Token('.')
        } else {
            Stop::Never
        };
        let out = resequence(
            &chars(text),
            self.coherence,
            &stop,
            self.min_words * LETTERS_PER_WORD,
            self.max_words * LETTERS_PER_WORD,
            source,
        )?;
        Ok(join_chars(&out))
    }
}
