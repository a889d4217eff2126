//! Three-stage query-complexity classification.
//!
//! `classify` decides whether a user query gets a direct answer or a
//! multi-step learning loop with external tools. The stages run in order and
//! the first one that produces a decision wins:
//!
//! 1. a deterministic pre-filter for queries that need current data,
//! 2. a model classification with a strict-JSON contract,
//! 3. a safety-net re-check applied only to a model `SIMPLE`,
//!
//! with an independent fallback heuristic covering any stage-2 failure.
//! `classify` is total: every transport or format failure is absorbed here
//! and the caller always receives a valid decision.

pub mod invoker;
pub mod prompt;
mod rules;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::Config;
use crate::core::constants::{
    CLASSIFIER_MAX_TOKENS, CLASSIFIER_TEMPERATURE, FALLBACK_CONFIDENCE, HISTORY_WINDOW,
    SAFETY_NET_CONFIDENCE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Complexity {
    #[serde(rename = "SIMPLE")]
    Simple,
    #[serde(rename = "COMPLEX")]
    Complex,
}

/// Outcome of one classification. Produced once per user turn and consumed
/// once to pick the response path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityDecision {
    pub classification: Complexity,
    pub reasoning: String,
    pub confidence: f32,
}

/// One prior user/assistant exchange, oldest first in history slices.
#[derive(Debug, Clone)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Number of prior turns included in the classification prompt.
    pub history_window: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            temperature: CLASSIFIER_TEMPERATURE,
            max_tokens: CLASSIFIER_MAX_TOKENS,
            history_window: HISTORY_WINDOW,
        }
    }
}

impl ModelSettings {
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        Self {
            temperature: config
                .classifier
                .temperature
                .unwrap_or(defaults.temperature),
            max_tokens: config.classifier.max_tokens.unwrap_or(defaults.max_tokens),
            history_window: config
                .classifier
                .history_window
                .unwrap_or(defaults.history_window),
        }
    }
}

/// Seam to the concrete LLM transport. Implementations must be side-effect
/// free on failure; errors are strings, matching the other transport seams in
/// this codebase.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(&self, prompt: &str, settings: &ModelSettings) -> Result<String, String>;
}

/// Classifies `message` as SIMPLE or COMPLEX. Total: never returns an error,
/// never panics, and only awaits inside the stage-2 model call.
pub async fn classify(
    message: &str,
    recent_history: &[Turn],
    invoker: &dyn ModelInvoker,
    settings: &ModelSettings,
) -> ComplexityDecision {
    // Stage 1: queries that need fresh external facts must never be answered
    // from static model knowledge, and that is cheaper to decide here than
    // with a model call.
    if let Some(hit) = rules::current_data_match(message) {
        debug!(class = hit.class, "pre-filter classified query as complex");
        return ComplexityDecision {
            classification: Complexity::Complex,
            reasoning: format!("current-data heuristic: {}", hit.class),
            confidence: hit.confidence,
        };
    }

    // Stage 2.
    let start = recent_history.len().saturating_sub(settings.history_window);
    let prompt = prompt::build_classification_prompt(message, &recent_history[start..]);
    let raw = match invoker.invoke(&prompt, settings).await {
        Ok(raw) => raw,
        Err(err) => {
            debug!(error = %err, "model classification transport failed, using fallback");
            return fallback_classification(message);
        }
    };

    let decision = match parse_model_decision(&raw) {
        Ok(decision) => decision,
        Err(err) => {
            debug!(error = %err, "model classification response invalid, using fallback");
            return fallback_classification(message);
        }
    };

    // Stage 3: second guess a model SIMPLE against the original message.
    if decision.classification == Complexity::Simple {
        if let Some(reason) = rules::safety_net_match(message) {
            debug!(reason, "safety net overrode model SIMPLE");
            return ComplexityDecision {
                classification: Complexity::Complex,
                reasoning: format!("safety net override: {reason}"),
                confidence: SAFETY_NET_CONFIDENCE,
            };
        }
    }

    decision
}

#[derive(Deserialize)]
struct ModelReply {
    classification: String,
    reasoning: String,
    confidence: f32,
}

fn parse_model_decision(raw: &str) -> Result<ComplexityDecision, String> {
    let payload = strip_code_fence(raw);
    let reply: ModelReply = serde_json::from_str(payload)
        .map_err(|err| format!("malformed classification JSON: {err}"))?;

    let classification = match reply.classification.as_str() {
        "SIMPLE" => Complexity::Simple,
        "COMPLEX" => Complexity::Complex,
        other => return Err(format!("unexpected classification value: {other}")),
    };

    Ok(ComplexityDecision {
        classification,
        reasoning: reply.reasoning,
        confidence: reply.confidence.clamp(0.0, 1.0),
    })
}

/// Models sometimes wrap the JSON in a markdown fence despite the contract.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}

/// Stage 4: independent heuristic used when the model stage fails.
fn fallback_classification(message: &str) -> ComplexityDecision {
    match rules::fallback_complex_reason(message) {
        Some(reason) => ComplexityDecision {
            classification: Complexity::Complex,
            reasoning: format!("fallback heuristic: {reason}"),
            confidence: FALLBACK_CONFIDENCE,
        },
        None => ComplexityDecision {
            classification: Complexity::Simple,
            reasoning: "fallback heuristic: no complexity signals".to_string(),
            confidence: FALLBACK_CONFIDENCE,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedInvoker {
        reply: Result<String, String>,
        calls: AtomicUsize,
    }

    impl ScriptedInvoker {
        fn returning(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(error: &str) -> Self {
            Self {
                reply: Err(error.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn simple() -> Self {
            Self::returning(
                r#"{"classification":"SIMPLE","reasoning":"direct answer","confidence":0.95}"#,
            )
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelInvoker for ScriptedInvoker {
        async fn invoke(&self, _prompt: &str, _settings: &ModelSettings) -> Result<String, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    #[derive(Default)]
    struct CapturingInvoker {
        seen: std::sync::Mutex<Option<String>>,
    }

    #[async_trait]
    impl ModelInvoker for CapturingInvoker {
        async fn invoke(&self, prompt: &str, _settings: &ModelSettings) -> Result<String, String> {
            *self.seen.lock().unwrap() = Some(prompt.to_string());
            Ok(
                r#"{"classification":"SIMPLE","reasoning":"direct","confidence":0.9}"#
                    .to_string(),
            )
        }
    }

    #[tokio::test]
    async fn heuristic_keywords_skip_the_model() {
        let invoker = ScriptedInvoker::simple();
        for message in [
            "What are the biggest M&A deals of 2025?",
            "Summarize today's top tech news",
            "Any breaking stories?",
        ] {
            let decision =
                classify(message, &[], &invoker, &ModelSettings::default()).await;
            assert_eq!(decision.classification, Complexity::Complex, "{message}");
            assert!(decision.confidence >= 0.85);
        }
        assert_eq!(invoker.call_count(), 0);
    }

    #[tokio::test]
    async fn plain_questions_follow_the_model() {
        let invoker = ScriptedInvoker::simple();
        let decision = classify(
            "What is the capital of France?",
            &[],
            &invoker,
            &ModelSettings::default(),
        )
        .await;
        assert_eq!(decision.classification, Complexity::Simple);
        assert_eq!(invoker.call_count(), 1);
    }

    #[tokio::test]
    async fn safety_net_overrides_a_model_simple() {
        let invoker = ScriptedInvoker::simple();
        let decision = classify(
            "What's happening in the world?",
            &[],
            &invoker,
            &ModelSettings::default(),
        )
        .await;
        assert_eq!(invoker.call_count(), 1);
        assert_eq!(decision.classification, Complexity::Complex);
        assert!(decision.reasoning.starts_with("safety net override:"));
        assert!((decision.confidence - SAFETY_NET_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn transport_failure_falls_back_to_a_valid_decision() {
        let invoker = ScriptedInvoker::failing("connection refused");
        let decision = classify(
            "What is the capital of France?",
            &[],
            &invoker,
            &ModelSettings::default(),
        )
        .await;
        assert_eq!(decision.classification, Complexity::Simple);
        assert!((0.0..=1.0).contains(&decision.confidence));
    }

    #[tokio::test]
    async fn transport_failure_on_analytic_query_falls_back_to_complex() {
        let invoker = ScriptedInvoker::failing("timeout");
        let decision = classify(
            "Compare the tradeoffs between SQL and NoSQL databases",
            &[],
            &invoker,
            &ModelSettings::default(),
        )
        .await;
        assert_eq!(decision.classification, Complexity::Complex);
        assert!((decision.confidence - FALLBACK_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn malformed_model_output_falls_back() {
        for reply in ["not json at all", r#"{"classification":"MEDIUM","reasoning":"?","confidence":0.5}"#]
        {
            let invoker = ScriptedInvoker::returning(reply);
            let decision = classify(
                "Explain recursion",
                &[],
                &invoker,
                &ModelSettings::default(),
            )
            .await;
            assert!((0.0..=1.0).contains(&decision.confidence));
            assert!(decision.reasoning.starts_with("fallback heuristic:"));
        }
    }

    #[tokio::test]
    async fn fenced_model_output_is_accepted() {
        let invoker = ScriptedInvoker::returning(
            "```json\n{\"classification\":\"COMPLEX\",\"reasoning\":\"multi-step\",\"confidence\":0.7}\n```",
        );
        let decision = classify(
            "Explain recursion",
            &[],
            &invoker,
            &ModelSettings::default(),
        )
        .await;
        assert_eq!(decision.classification, Complexity::Complex);
        assert_eq!(decision.reasoning, "multi-step");
    }

    #[test]
    fn out_of_range_confidence_is_clamped() {
        let decision = parse_model_decision(
            r#"{"classification":"SIMPLE","reasoning":"sure","confidence":1.7}"#,
        )
        .unwrap();
        assert!((decision.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn history_window_setting_caps_prompt_history() {
        let invoker = CapturingInvoker::default();
        let history = vec![
            Turn {
                user: "one".to_string(),
                assistant: "a".to_string(),
            },
            Turn {
                user: "two".to_string(),
                assistant: "b".to_string(),
            },
        ];
        let settings = ModelSettings {
            history_window: 1,
            ..ModelSettings::default()
        };
        classify("Explain recursion", &history, &invoker, &settings).await;

        let prompt = invoker.seen.lock().unwrap().clone().unwrap();
        assert!(!prompt.contains("User: one"));
        assert!(prompt.contains("User: two"));
    }

    #[test]
    fn settings_honor_config_overrides() {
        let mut config = Config::default();
        config.classifier.temperature = Some(0.3);
        config.classifier.history_window = Some(5);
        let settings = ModelSettings::from_config(&config);
        assert!((settings.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(settings.max_tokens, CLASSIFIER_MAX_TOKENS);
        assert_eq!(settings.history_window, 5);
    }
}
