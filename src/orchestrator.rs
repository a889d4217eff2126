//! Turn-level glue between the classifier and the tool tracker.
//!
//! The orchestrator owns the per-turn tool state and exposes pure-ish entry
//! points the surrounding application calls from its event loop: classify the
//! incoming message to pick a response path, re-derive tool progress whenever
//! the log changes, and hand read-only progress to the renderer.

use crate::classifier::{classify, Complexity, ComplexityDecision, ModelInvoker, ModelSettings, Turn};
use crate::core::message::{Message, TranscriptRole};
use crate::tools::{MessageStreamParser, ToolExecutionRecord, ToolExecutionTracker};

/// How the assistant should answer the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePath {
    /// Answer directly from the model, no tools.
    Direct,
    /// Run the multi-step learning loop with external tools.
    LearningLoop,
}

impl From<&ComplexityDecision> for ResponsePath {
    fn from(decision: &ComplexityDecision) -> Self {
        match decision.classification {
            Complexity::Simple => ResponsePath::Direct,
            Complexity::Complex => ResponsePath::LearningLoop,
        }
    }
}

/// Classification outcome plus the path chosen from it.
#[derive(Debug, Clone)]
pub struct TurnPlan {
    pub decision: ComplexityDecision,
    pub path: ResponsePath,
}

pub struct ConversationOrchestrator {
    tracker: ToolExecutionTracker,
    settings: ModelSettings,
}

impl ConversationOrchestrator {
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            tracker: ToolExecutionTracker::new(),
            settings,
        }
    }

    /// Classifies the incoming message against the recent log and picks the
    /// response path. Infallible; see [`classify`].
    pub async fn begin_turn(
        &mut self,
        message: &str,
        log: &[Message],
        invoker: &dyn ModelInvoker,
    ) -> TurnPlan {
        let history = recent_turns(log, self.settings.history_window);
        let decision = classify(message, &history, invoker, &self.settings).await;
        let path = ResponsePath::from(&decision);
        TurnPlan { decision, path }
    }

    /// Re-derives tool progress from the full log. Call on every log update;
    /// replays are no-ops for events already applied.
    pub fn observe(&mut self, log: &[Message]) {
        MessageStreamParser::replay(log, &mut self.tracker);
    }

    pub fn tracker(&self) -> &ToolExecutionTracker {
        &self.tracker
    }

    pub fn records(&self) -> &[ToolExecutionRecord] {
        self.tracker.records()
    }

    pub fn is_active(&self) -> bool {
        self.tracker.is_active()
    }

    /// Plain-text progress card per record, for renderers without structured
    /// display.
    pub fn progress_lines(&self) -> Vec<String> {
        self.tracker
            .records()
            .iter()
            .map(ToolExecutionRecord::summary)
            .collect()
    }
}

/// Pairs user messages with the assistant replies that follow them, newest
/// last, capped at `window` turns. Tool-status entries are not conversation
/// content and are skipped.
fn recent_turns(log: &[Message], window: usize) -> Vec<Turn> {
    let mut turns: Vec<Turn> = Vec::new();
    let mut pending_user: Option<String> = None;

    for message in log {
        match message.role {
            TranscriptRole::User => {
                if let Some(user) = pending_user.take() {
                    turns.push(Turn {
                        user,
                        assistant: String::new(),
                    });
                }
                pending_user = Some(message.content.clone());
            }
            TranscriptRole::Assistant => {
                if let Some(user) = pending_user.take() {
                    turns.push(Turn {
                        user,
                        assistant: message.content.clone(),
                    });
                }
            }
            TranscriptRole::ToolExecuting => {}
        }
    }
    if let Some(user) = pending_user {
        turns.push(Turn {
            user,
            assistant: String::new(),
        });
    }

    let start = turns.len().saturating_sub(window);
    turns.split_off(start)
}
