//! Keyword normalization and phrase matching.
//!
//! Keyword rules carry a comma-separated phrase spec. The spec is normalized
//! once at table build time and each phrase gets a precompiled word-boundary
//! pattern, so the per-record hot path is pure matching against the row's
//! searchable text.

use crate::error::{GpacError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How a phrase is located inside the haystack. Whole-word requires token
/// boundaries on both sides of the occurrence ("bond" must not hit inside
/// "vagabond"); substring is naive containment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    #[default]
    WholeWord,
    Substring,
}

/// Splits a comma-separated keyword spec into cleaned phrases: trimmed,
/// lower-cased, blanks and stop words dropped. Duplicate phrases survive
/// normalization; each duplicate counts toward the frequency threshold.
pub fn normalize_keywords(spec: &str, stop_words: &HashSet<String>) -> Vec<String> {
    spec.split(',')
        .map(|piece| piece.trim().to_lowercase())
        .filter(|piece| !piece.is_empty() && !stop_words.contains(piece))
        .collect()
}

/// A normalized phrase with its precompiled word-boundary pattern.
#[derive(Debug, Clone)]
pub struct Phrase {
    text: String,
    pattern: Regex,
}

impl Phrase {
    pub fn compile(text: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(text))).map_err(|e| {
            GpacError::InvalidPattern {
                phrase: text.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Self {
            text: text.to_string(),
            pattern,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn occurs_in(&self, haystack: &str, mode: MatchMode) -> bool {
        match mode {
            MatchMode::WholeWord => self.pattern.is_match(haystack),
            MatchMode::Substring => haystack.contains(&self.text),
        }
    }
}

/// Counts phrases that occur in `haystack`. Each phrase counts at most once
/// no matter how often it repeats in the haystack.
pub fn count_matches(phrases: &[Phrase], haystack: &str, mode: MatchMode) -> usize {
    phrases
        .iter()
        .filter(|phrase| phrase.occurs_in(haystack, mode))
        .count()
}

pub fn is_match(phrases: &[Phrase], haystack: &str, mode: MatchMode, threshold: usize) -> bool {
    count_matches(phrases, haystack, mode) >= threshold
}
