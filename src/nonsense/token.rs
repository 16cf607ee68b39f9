//! Splitting text into tokens and joining generated tokens back.

/// Code points of `text`.
pub fn chars(text: &str) -> Vec<char> {
    text.chars().collect()
}

/// Whitespace separated words of `text`. Punctuation stays attached to its
/// word so sentence terminators remain visible to a stop predicate.
pub fn words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_owned).collect()
}

pub fn join_chars(tokens: &[char]) -> String {
    tokens.iter().collect()
}

pub fn join_words<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut out = String::new();
    for token in tokens {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(token.as_ref());
    }
    out
}

/// True for a word that closes a sentence.
pub fn ends_sentence(word: &str) -> bool {
    word.ends_with(['.', '!', '?', '…'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_keep_punctuation() {
        assert_eq!(
            words("  Привет,  мир!\nкак дела? "),
            vec!["Привет,", "мир!", "как", "дела?"]
        );
    }

    #[test]
    fn test_chars_are_code_points() {
        assert_eq!(chars("ёж"), vec!['ё', 'ж']);
        assert_eq!(join_chars(&chars("ёж")), "ёж");
    }

    #[test]
    fn test_join_words() {
        assert_eq!(join_words(&["a", "b", "c."]), "a b c.");
        assert_eq!(join_words::<String>(&[]), "");
    }

    #[test]
    fn test_ends_sentence() {
        assert!(ends_sentence("конец."));
        assert!(ends_sentence("what?!"));
        assert!(ends_sentence("хм…"));
        assert!(!ends_sentence("word,"));
    }
}
