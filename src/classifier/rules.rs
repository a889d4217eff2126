//! Deterministic rule sets for the three classifier stages that never touch
//! the model: the pre-filter, the safety net, and the fallback heuristic.
//!
//! The pre-filter and the safety net both target "needs current data" but are
//! deliberately kept as two separate lists: the pre-filter runs on every query
//! and must stay cheap and obvious, while the safety net only runs after the
//! model has said SIMPLE and is tuned to implicit phrasings the first list
//! would over-trigger on. They live side by side here so edits to one are
//! made in sight of the other.

use regex::Regex;
use std::sync::LazyLock;

use crate::core::constants::FALLBACK_WORD_LIMIT;

/// Wording that pins a query to the present moment. Shared by the pre-filter
/// and the fallback heuristic.
const TIME_SENSITIVE_PATTERN: &str =
    r"(?i)\b(?:today|tonight|yesterday|recent(?:ly)?|latest|breaking|right now|this (?:week|month|year))\b";

pub(crate) struct RuleHit {
    pub class: &'static str,
    pub confidence: f32,
}

struct PatternRule {
    class: &'static str,
    confidence: f32,
    pattern: Regex,
}

impl PatternRule {
    fn new(class: &'static str, confidence: f32, pattern: &str) -> Self {
        Self {
            class,
            confidence,
            pattern: Regex::new(pattern).expect("invalid built-in classifier pattern"),
        }
    }
}

/// Pre-filter rules, checked in order; the first match decides. Mutually
/// exclusive outcomes by construction: every rule maps to COMPLEX.
static CURRENT_DATA_RULES: LazyLock<Vec<PatternRule>> = LazyLock::new(|| {
    vec![
        PatternRule::new("year token", 0.9, r"\b20(?:24|25)\b"),
        PatternRule::new("time-sensitive wording", 0.85, TIME_SENSITIVE_PATTERN),
        PatternRule::new(
            "news pattern",
            0.85,
            r"(?i)\b(?:news|headlines?)\b|\bwhat(?:'s| is) (?:new|in the news)\b",
        ),
        PatternRule::new(
            "market/financial pattern",
            0.88,
            r"(?i)\b(?:stocks?|share price|stock market|earnings|ipo|m&a|mergers?|acquisitions?|interest rates?|inflation|crypto(?:currency)?|bitcoin|nasdaq|s&p 500|dow jones)\b",
        ),
    ]
});

/// Safety-net rules: implicit current-data phrasings a model tends to wave
/// through as SIMPLE. Only consulted after a successful SIMPLE classification.
static SAFETY_NET_RULES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        (
            "implicit world-state question",
            r"(?i)\bwhat(?:'s| is) (?:happening|going on)\b",
        ),
        ("summarize-the-day request", r"(?i)\bsummari[sz]e today\b"),
        ("major-events question", r"(?i)\bmajor (?:world )?events\b"),
        (
            "current-affairs wording",
            r"(?i)\bcurrent (?:events|affairs|situation)\b",
        ),
        ("freshness requirement", r"(?i)\bup[- ]to[- ]date\b"),
    ]
    .into_iter()
    .map(|(reason, pattern)| {
        (
            reason,
            Regex::new(pattern).expect("invalid built-in safety-net pattern"),
        )
    })
    .collect()
});

static ANALYSIS_VERBS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:compare|analy[sz]e|research|investigate|strateg(?:y|ies|ize)|evaluate|assess|pros and cons|deep dive)\b",
    )
    .expect("invalid built-in analysis pattern")
});

static FALLBACK_TIME_SENSITIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(TIME_SENSITIVE_PATTERN).expect("invalid built-in time pattern")
});

/// Stage 1: returns the first pre-filter rule the message trips, if any.
pub(crate) fn current_data_match(message: &str) -> Option<RuleHit> {
    CURRENT_DATA_RULES
        .iter()
        .find(|rule| rule.pattern.is_match(message))
        .map(|rule| RuleHit {
            class: rule.class,
            confidence: rule.confidence,
        })
}

/// Stage 3: returns the reason string for the first safety-net match, if any.
pub(crate) fn safety_net_match(message: &str) -> Option<&'static str> {
    SAFETY_NET_RULES
        .iter()
        .find(|(_, pattern)| pattern.is_match(message))
        .map(|(reason, _)| *reason)
}

/// Stage 4: independent heuristic used when the model stage fails. Returns a
/// reason when the message looks complex, `None` when it looks simple.
pub(crate) fn fallback_complex_reason(message: &str) -> Option<&'static str> {
    if message.split_whitespace().count() > FALLBACK_WORD_LIMIT {
        return Some("long query");
    }
    if message.matches('?').count() > 1 {
        return Some("multiple questions");
    }
    if ANALYSIS_VERBS.is_match(message) {
        return Some("analysis verb");
    }
    if FALLBACK_TIME_SENSITIVE.is_match(message) {
        return Some("time-sensitive wording");
    }
    None
}
