//! Reversible scrubbing of sensitive spans before text crosses the
//! generation boundary.
//!
//! All pattern classes are matched against the untouched input in one
//! coordinated scan, and overlapping candidates are resolved
//! longest-match-first across classes. A token inserted for one class can
//! therefore never be re-matched by another class, which a sequential
//! substitution pass per class cannot guarantee.

use std::collections::BTreeMap;
use std::fmt;

use crate::pii::patterns::PatternSet;

/// Per-request mapping from synthetic token to the original sensitive text.
/// Lives for one request only and is consumed by [`detokenize`] at the end;
/// it must never be persisted or echoed into a later generation call.
///
/// `Debug` deliberately redacts the originals.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenMap {
    entries: BTreeMap<String, String>,
}

impl TokenMap {
    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn insert(&mut self, token: String, original: String) {
        self.entries.insert(token, original);
    }
}

impl FromIterator<(String, String)> for TokenMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

impl fmt::Debug for TokenMap {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "TokenMap({} entries, originals redacted)", self.entries.len())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct MatchSpan {
    start: usize,
    end: usize,
    class_index: usize,
}

impl MatchSpan {
    fn len(&self) -> usize {
        self.end - self.start
    }

    fn overlaps(&self, other: &MatchSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Scans text with an injected, immutable pattern set. Stateless between
/// calls; the token ordinal counter is local to each call, so any number of
/// requests can share one instance without synchronization.
#[derive(Clone, Debug, Default)]
pub struct Tokenizer {
    patterns: PatternSet,
}

impl Tokenizer {
    pub fn new(patterns: PatternSet) -> Self {
        Self { patterns }
    }

    /// Replaces every sensitive span with a `{LABEL}_{ordinal}` token and
    /// returns the sanitized text plus the reversible map. Ordinals are
    /// assigned in document order from one counter shared by all classes, so
    /// repeated matches of the same class stay individually reversible.
    ///
    /// Never fails: empty input yields empty output, and text with no
    /// matches (including already-tokenized text) passes through unchanged.
    pub fn tokenize(&self, text: &str) -> (String, TokenMap) {
        let mut token_map = TokenMap::default();
        if text.is_empty() || self.patterns.is_empty() {
            return (text.to_string(), token_map);
        }

        let spans = self.resolve_spans(text);
        let mut sanitized = String::with_capacity(text.len());
        let mut cursor = 0;
        for (ordinal, span) in spans.iter().enumerate() {
            let label = self.patterns.classes()[span.class_index].label();
            let token = format!("{label}_{ordinal}");
            sanitized.push_str(&text[cursor..span.start]);
            sanitized.push_str(&token);
            token_map.insert(token, text[span.start..span.end].to_string());
            cursor = span.end;
        }
        sanitized.push_str(&text[cursor..]);

        (sanitized, token_map)
    }

    /// One-way variant for fields that are only ever sent onward. The map is
    /// discarded, so the result cannot be reversed.
    pub fn tokenize_opaque(&self, text: &str) -> String {
        let (sanitized, _) = self.tokenize(text);
        sanitized
    }

    /// Collects candidate spans from every class over the original text and
    /// keeps a non-overlapping subset, preferring longer matches regardless
    /// of class (ties: earlier span, then earlier class order). Returned in
    /// document order.
    fn resolve_spans(&self, text: &str) -> Vec<MatchSpan> {
        let mut candidates = Vec::new();
        for (class_index, class) in self.patterns.classes().iter().enumerate() {
            for found in class.regex().find_iter(text) {
                if found.start() < found.end() {
                    candidates.push(MatchSpan {
                        start: found.start(),
                        end: found.end(),
                        class_index,
                    });
                }
            }
        }

        candidates.sort_by(|a, b| {
            b.len()
                .cmp(&a.len())
                .then(a.start.cmp(&b.start))
                .then(a.class_index.cmp(&b.class_index))
        });

        let mut accepted: Vec<MatchSpan> = Vec::new();
        for candidate in candidates {
            if accepted.iter().all(|span| !span.overlaps(&candidate)) {
                accepted.push(candidate);
            }
        }
        accepted.sort_by_key(|span| span.start);
        accepted
    }
}

/// Restores the originals for every token occurring in `text`. Longer tokens
/// are substituted first so `EMAIL_1` can never clobber part of `EMAIL_10`.
///
/// Only for text about to be shown to the end user; never for text headed
/// back to the generation service.
pub fn detokenize(text: &str, token_map: &TokenMap) -> String {
    let mut tokens: Vec<&String> = token_map.entries.keys().collect();
    tokens.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let mut restored = text.to_string();
    for token in tokens {
        if restored.contains(token.as_str()) {
            restored = restored.replace(token.as_str(), &token_map.entries[token]);
        }
    }
    restored
}
