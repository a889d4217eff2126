//! Builds the classification prompt sent to the model in stage 2.

use std::fmt::Write;

use crate::classifier::Turn;

const RUBRIC: &str = "You triage user queries for a chat assistant. Classify the query below as \
SIMPLE or COMPLEX.\n\
\n\
SIMPLE: answerable in one step from general knowledge. Definitions, \
explanations, translations, small calculations, casual conversation.\n\
COMPLEX: needs multi-step research, external tools, comparison across \
sources, planning, or data newer than your training.\n\
\n\
Respond with strict JSON and nothing else:\n\
{\"classification\": \"SIMPLE\" | \"COMPLEX\", \"reasoning\": \"<one sentence>\", \"confidence\": <0.0-1.0>}";

/// Assembles the rubric, the supplied prior turns, and the query. The caller
/// caps the history at the configured window before handing it over.
pub fn build_classification_prompt(message: &str, recent_history: &[Turn]) -> String {
    let mut prompt = String::from(RUBRIC);

    if !recent_history.is_empty() {
        prompt.push_str("\n\nRecent conversation:");
        for turn in recent_history {
            let _ = write!(prompt, "\nUser: {}", turn.user);
            if !turn.assistant.is_empty() {
                let _ = write!(prompt, "\nAssistant: {}", turn.assistant);
            }
        }
    }

    let _ = write!(prompt, "\n\nQuery: {message}");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(user: &str, assistant: &str) -> Turn {
        Turn {
            user: user.to_string(),
            assistant: assistant.to_string(),
        }
    }

    #[test]
    fn prompt_contains_rubric_and_query() {
        let prompt = build_classification_prompt("What is an isotope?", &[]);
        assert!(prompt.contains("SIMPLE"));
        assert!(prompt.contains("strict JSON"));
        assert!(prompt.ends_with("Query: What is an isotope?"));
        assert!(!prompt.contains("Recent conversation"));
    }

    #[test]
    fn prompt_lists_every_supplied_turn_in_order() {
        let history = vec![turn("one", "a"), turn("two", "b")];
        let prompt = build_classification_prompt("next", &history);
        let first = prompt.find("User: one").unwrap();
        let second = prompt.find("User: two").unwrap();
        assert!(first < second);
        assert!(prompt.contains("Assistant: b"));
    }

    #[test]
    fn empty_assistant_halves_are_omitted() {
        let history = vec![turn("hello", "")];
        let prompt = build_classification_prompt("next", &history);
        assert!(prompt.contains("User: hello"));
        assert!(!prompt.contains("Assistant:"));
    }
}
