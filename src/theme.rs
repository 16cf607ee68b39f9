//! Theme guesser.
//!
//! A flat, ordered table of regex rules. The first rule whose pattern matches
//! the message decides its theme.

use regex::{Regex, RegexBuilder};

use crate::config::ThemeRuleConfig;

/// Built-in rules: `(pattern, theme, confidence)`.
const DEFAULT_RULES: &[(&str, &str, f32)] = &[
    (r"\b(привет|здравствуй\w*|хай|hello|hi|hey)\b", "greeting", 0.9),
    (r"\b(пока|до свидания|бывай|bye|goodbye)\b", "farewell", 0.9),
    (r"\b(спасибо|благодар\w*|thanks?|thank you)\b", "thanks", 0.8),
    (r"\?\s*$", "question", 0.5),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ThemeGuess {
    pub theme: String,
    pub confidence: f32,
}

#[derive(Debug, Clone)]
struct ThemeRule {
    pattern: Regex,
    theme: String,
    confidence: f32,
}

#[derive(Debug, Clone)]
pub struct ThemeTable {
    rules: Vec<ThemeRule>,
}

impl ThemeTable {
    /// Compiles `rules` in order. Matching is case-insensitive.
    pub fn new<'a, I>(rules: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = (&'a str, &'a str, f32)>,
    {
        let rules = rules
            .into_iter()
            .map(|(pattern, theme, confidence)| {
                Ok(ThemeRule {
                    pattern: RegexBuilder::new(pattern).case_insensitive(true).build()?,
                    theme: theme.to_string(),
                    confidence,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    pub fn builtin() -> Result<Self, regex::Error> {
        Self::new(DEFAULT_RULES.iter().copied())
    }

    pub fn from_config(rules: &[ThemeRuleConfig]) -> Result<Self, regex::Error> {
        Self::new(
            rules
                .iter()
                .map(|rule| (rule.pattern.as_str(), rule.theme.as_str(), rule.confidence)),
        )
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn guess(&self, text: &str) -> Option<ThemeGuess> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(text))
            .map(|rule| ThemeGuess {
                theme: rule.theme.clone(),
                confidence: rule.confidence,
            })
    }
}
