//! Reply corpus loaded from static text resources.
//!
//! Layout of the corpus directory:
//! - `<theme>.txt`: scripted replies for a theme, one per non-empty line;
//! - `nonsense.txt`: source text for generated replies.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::nonsense::words;
use crate::random::{pick_index, RandomError, UniformSource};

const NONSENSE_FILE: &str = "nonsense";

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("Failed to read corpus {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    replies: HashMap<String, Vec<String>>,
    nonsense: Vec<String>,
}

impl Corpus {
    /// Loads every `.txt` file in `dir`. A missing directory yields an empty
    /// corpus.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, CorpusError> {
        let dir = dir.as_ref();
        let io_err = |source| CorpusError::Io {
            path: dir.to_path_buf(),
            source,
        };

        if !dir.is_dir() {
            warn!("Corpus directory {:?} not found, replies disabled", dir);
            return Ok(Self::default());
        }

        let mut corpus = Self::default();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("txt") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let text = fs::read_to_string(&path).map_err(|source| CorpusError::Io {
                path: path.clone(),
                source,
            })?;

            if name == NONSENSE_FILE {
                corpus.nonsense = words(&text);
                debug!("Loaded {} nonsense words", corpus.nonsense.len());
            } else {
                let lines: Vec<String> = text
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_owned)
                    .collect();
                debug!("Loaded {} replies for theme '{}'", lines.len(), name);
                corpus.replies.insert(name.to_string(), lines);
            }
        }

        info!(
            "Corpus loaded: {} themes, {} nonsense words",
            corpus.replies.len(),
            corpus.nonsense.len()
        );
        Ok(corpus)
    }

    #[cfg(test)]
    pub fn with_replies(mut self, theme: &str, replies: &[&str]) -> Self {
        self.replies
            .insert(theme.to_string(), replies.iter().map(|r| r.to_string()).collect());
        self
    }

    #[cfg(test)]
    pub fn with_nonsense(mut self, text: &str) -> Self {
        self.nonsense = words(text);
        self
    }

    pub fn replies(&self, theme: &str) -> &[String] {
        self.replies.get(theme).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn nonsense_words(&self) -> &[String] {
        &self.nonsense
    }

    /// Uniformly chosen scripted reply for `theme`, if there is any.
    pub fn pick_reply<S>(&self, theme: &str, source: &mut S) -> Result<Option<&str>, RandomError>
    where
        S: UniformSource + ?Sized,
    {
        let replies = self.replies(theme);
        if replies.is_empty() {
            return Ok(None);
        }
        let index = pick_index(source, replies.len())?;
        Ok(Some(replies[index].as_str()))
    }
}

/// Replaces every `{name}` in `template` with its value.
pub fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in values {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::tests::ScriptedSource;

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("greeting.txt"), "Привет, {user}!\n\n  Здорово!  \n").unwrap();
        fs::write(dir.path().join("nonsense.txt"), "Раз два.\nТри  четыре!").unwrap();
        fs::write(dir.path().join("README.md"), "ignored").unwrap();

        let corpus = Corpus::load(dir.path()).unwrap();
        assert_eq!(corpus.replies("greeting"), ["Привет, {user}!", "Здорово!"]);
        assert_eq!(corpus.nonsense_words(), ["Раз", "два.", "Три", "четыре!"]);
        assert!(corpus.replies("README").is_empty());
        assert!(corpus.replies("nonsense").is_empty());
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = Corpus::load(dir.path().join("absent")).unwrap();
        assert!(corpus.nonsense_words().is_empty());
        assert!(corpus.replies("greeting").is_empty());
    }

    #[test]
    fn test_pick_reply() {
        let corpus = Corpus::default().with_replies("thanks", &["Пожалуйста", "Не за что"]);
        let mut source = ScriptedSource::new(&[0.7]);
        assert_eq!(corpus.pick_reply("thanks", &mut source).unwrap(), Some("Не за что"));
        assert_eq!(corpus.pick_reply("unknown", &mut source).unwrap(), None);
    }

    #[test]
    fn test_fill_placeholders() {
        let text = fill_placeholders(
            "**{user}**, привет от {bot}! {user}, {missing}",
            &[("user", "Вася"), ("bot", "Usher")],
        );
        assert_eq!(text, "**Вася**, привет от Usher! Вася, {missing}");
    }
}
