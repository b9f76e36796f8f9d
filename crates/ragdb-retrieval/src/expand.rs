//! Bounded, deterministic query expansion.
//!
//! Rule-based rewrites only: the same query always expands to the same
//! variant list, which keeps cached branch results valid. The original
//! query is always first.

use ragdb_core::config::SearchConfig;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "that", "the", "to", "with",
];

const QUESTION_PREFIXES: &[&str] = &[
    "what is", "what are", "how do i", "how do", "how to", "why does", "why is", "where is",
    "where are", "when did", "who is", "tell me about", "explain",
];

pub struct QueryExpander {
    enabled: bool,
    max_expansions: usize,
}

impl QueryExpander {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            enabled: config.enable_query_expansion,
            max_expansions: config.max_query_expansions,
        }
    }

    /// Expand `query` into 1..=max_expansions+1 variants, original first.
    pub fn expand(&self, query: &str) -> Vec<String> {
        let original = query.trim().to_string();
        if !self.enabled {
            return vec![original];
        }
        let mut variants = vec![original.clone()];
        push_unique(&mut variants, strip_question_prefix(&original));
        push_unique(&mut variants, keywords_only(&original));
        variants.truncate(self.max_expansions + 1);
        variants
    }
}

fn push_unique(variants: &mut Vec<String>, candidate: Option<String>) {
    if let Some(c) = candidate {
        if !c.is_empty() && !variants.iter().any(|v| v.eq_ignore_ascii_case(&c)) {
            variants.push(c);
        }
    }
}

/// "what is crop rotation?" -> "crop rotation"
fn strip_question_prefix(query: &str) -> Option<String> {
    let lower = query.to_lowercase();
    for prefix in QUESTION_PREFIXES {
        if let Some(rest) = lower.strip_prefix(prefix) {
            let rest = rest.trim_start().trim_end_matches(['?', '.', '!']).trim();
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
        }
    }
    None
}

/// Lowercased content words only, stopwords and punctuation removed.
fn keywords_only(query: &str) -> Option<String> {
    let words: Vec<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty() && !STOPWORDS.contains(&w.as_str()))
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}
