use std::collections::HashSet;

use crate::forms::WORD_MAX_LEN;

/// Words parsed from a newline-separated list
#[derive(Debug, Default, PartialEq)]
pub struct WordList {
    words: Vec<String>,
    /// Lines dropped for being too long or duplicated
    skipped: usize,
}

impl WordList {
    /// Parse a word list: one word per line, trimmed and lowercased.
    /// Blank lines and `#` comments are ignored; duplicates keep their first
    /// occurrence.
    pub fn parse(content: &str) -> Self {
        let mut seen = HashSet::new();
        let mut list = Self::default();

        for line in content.lines() {
            let word = line.trim().to_lowercase();
            if word.is_empty() || word.starts_with('#') {
                continue;
            }
            if word.chars().count() > WORD_MAX_LEN || !seen.insert(word.clone()) {
                list.skipped += 1;
                continue;
            }
            list.words.push(word);
        }

        tracing::debug!(
            "Parsed word list: {} words, {} skipped",
            list.words.len(),
            list.skipped
        );
        list
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
