//! Rebuilds tracker state from the conversation log.
//!
//! The upstream event source gives no delivery-ordering guarantees and keeps
//! no cursor, so the parser re-runs over the entire log on every update.
//! That is safe because the tracker's idempotent admission and terminal-state
//! checks turn already-applied events into no-ops.

use tracing::warn;

use crate::core::message::{has_user_message, Message};
use crate::tools::events::{parse_tool_event, ToolStatusEvent};
use crate::tools::tracker::{ToolExecutionTracker, ToolExecutionUpdate, ToolStatus};

pub struct MessageStreamParser;

impl MessageStreamParser {
    /// Replays every tool-status event in `messages` into `tracker`.
    /// Malformed entries are skipped with a diagnostic; the rest of the log is
    /// still processed. A log without any user message marks a fresh session
    /// and wipes the tracker first.
    pub fn replay(messages: &[Message], tracker: &mut ToolExecutionTracker) {
        if !has_user_message(messages) {
            tracker.clear();
        }

        for message in messages.iter().filter(|message| message.is_tool_executing()) {
            match parse_tool_event(&message.content) {
                Ok(event) => Self::apply(tracker, event),
                Err(err) => {
                    warn!(error = %err, "skipping unreadable tool-status event");
                }
            }
        }
    }

    fn apply(tracker: &mut ToolExecutionTracker, event: ToolStatusEvent) {
        match event.status {
            ToolStatus::Pending | ToolStatus::Starting | ToolStatus::Executing => {
                // An id-less progress event for a tool whose latest record is
                // already terminal was applied on an earlier pass; admitting
                // it again would duplicate the record.
                if event.id.is_none() {
                    if let Some(latest) = tracker.latest_record_for(&event.name) {
                        if latest.status.is_terminal() {
                            return;
                        }
                    }
                }
                let id = tracker.start_with(
                    event.id.as_deref(),
                    &event.name,
                    event.display_name.as_deref(),
                    event.parameters.clone(),
                    event.start_time,
                );
                tracker.update(
                    &id,
                    ToolExecutionUpdate {
                        status: Some(event.status),
                        progress: event.progress,
                        parameters: if event.parameters.is_empty() {
                            None
                        } else {
                            Some(event.parameters)
                        },
                    },
                );
            }
            ToolStatus::Completed => {
                let id = Self::terminal_target(tracker, &event);
                tracker.complete_at(&id, event.result, event.end_time);
            }
            ToolStatus::Failed => {
                let id = Self::terminal_target(tracker, &event);
                let error = event
                    .error
                    .unwrap_or_else(|| "tool execution failed".to_string());
                tracker.fail_at(&id, error, event.end_time);
            }
        }
    }

    /// Resolves which record a terminal event targets. When nothing matches,
    /// a start is synthesized first so the UI never shows a completion with
    /// no corresponding start.
    fn terminal_target(tracker: &mut ToolExecutionTracker, event: &ToolStatusEvent) -> String {
        if let Some(id) = event.id.as_deref() {
            if tracker.record(id).is_some() {
                return id.to_string();
            }
            // Progress events sometimes arrive id-less while the terminal
            // event carries the wire id. The active record adopts that id so
            // later replays resolve it directly instead of admitting a
            // duplicate.
            if let Some(active) = tracker.active_record_for(&event.name) {
                let current = active.id.clone();
                tracker.rebind_id(&current, id);
                return id.to_string();
            }
        } else {
            if let Some(active) = tracker.active_record_for(&event.name) {
                return active.id.clone();
            }
            // Id-less replays of a terminal event land on the record they
            // finished the first time around.
            if let Some(latest) = tracker.latest_record_for(&event.name) {
                return latest.id.clone();
            }
        }
        tracker.start_with(
            event.id.as_deref(),
            &event.name,
            event.display_name.as_deref(),
            event.parameters.clone(),
            event.start_time,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tracker::ToolStatus;
    use serde_json::json;

    fn event_message(body: serde_json::Value) -> Message {
        Message::tool_executing(body.to_string())
    }

    fn log_with(events: Vec<serde_json::Value>) -> Vec<Message> {
        let mut messages = vec![Message::user("look this up"), Message::assistant("on it")];
        messages.extend(events.into_iter().map(event_message));
        messages
    }

    #[test]
    fn start_update_complete_yields_one_completed_record() {
        let log = log_with(vec![
            json!({"toolName": "web-search", "status": "executing", "displayName": "Web Search"}),
            json!({"toolName": "web-search", "status": "executing", "progress": 50}),
            json!({"toolName": "web-search", "status": "completed", "result": {"hits": 3}}),
        ]);
        let mut tracker = ToolExecutionTracker::new();
        MessageStreamParser::replay(&log, &mut tracker);

        assert_eq!(tracker.records().len(), 1);
        let record = &tracker.records()[0];
        assert_eq!(record.status, ToolStatus::Completed);
        assert_eq!(record.display_name, "Web Search");
        assert_eq!(record.result, Some(json!({"hits": 3})));
        assert!(record.end_time.is_some());
        assert!(!tracker.is_active());
    }

    #[test]
    fn replaying_the_same_log_is_a_noop() {
        let log = log_with(vec![
            json!({"toolName": "web-search", "status": "executing", "id": "call-1"}),
            json!({"toolName": "web-search", "status": "completed", "id": "call-1"}),
        ]);
        let mut tracker = ToolExecutionTracker::new();
        MessageStreamParser::replay(&log, &mut tracker);
        MessageStreamParser::replay(&log, &mut tracker);

        assert_eq!(tracker.records().len(), 1);
        assert_eq!(tracker.records()[0].id, "call-1");
        assert_eq!(tracker.records()[0].status, ToolStatus::Completed);
    }

    #[test]
    fn idless_replays_do_not_duplicate_records() {
        let log = log_with(vec![
            json!({"toolName": "web-search", "status": "executing"}),
            json!({"toolName": "web-search", "status": "completed"}),
        ]);
        let mut tracker = ToolExecutionTracker::new();
        MessageStreamParser::replay(&log, &mut tracker);
        MessageStreamParser::replay(&log, &mut tracker);

        assert_eq!(tracker.records().len(), 1);
        assert_eq!(tracker.records()[0].status, ToolStatus::Completed);
    }

    #[test]
    fn idless_progress_with_idful_completion_replays_as_noop() {
        let log = log_with(vec![
            json!({"toolName": "web-search", "status": "executing"}),
            json!({"toolName": "web-search", "status": "executing", "progress": 80}),
            json!({"toolName": "web-search", "status": "completed", "id": "call-1", "result": "done"}),
        ]);
        let mut tracker = ToolExecutionTracker::new();
        MessageStreamParser::replay(&log, &mut tracker);
        MessageStreamParser::replay(&log, &mut tracker);

        assert_eq!(tracker.records().len(), 1);
        let record = &tracker.records()[0];
        assert_eq!(record.id, "call-1");
        assert_eq!(record.status, ToolStatus::Completed);
        assert_eq!(record.result, Some(json!("done")));
    }

    #[test]
    fn unreadable_content_is_skipped_without_mutation() {
        let mut log = log_with(vec![]);
        log.push(Message::tool_executing("not-json"));
        let mut tracker = ToolExecutionTracker::new();
        MessageStreamParser::replay(&log, &mut tracker);
        assert!(tracker.records().is_empty());
    }

    #[test]
    fn bad_entries_do_not_stop_later_ones() {
        let log = log_with(vec![
            json!({"status": "executing"}),
            json!({"toolName": "file-read", "status": "executing"}),
        ]);
        let mut tracker = ToolExecutionTracker::new();
        MessageStreamParser::replay(&log, &mut tracker);
        assert_eq!(tracker.records().len(), 1);
        assert_eq!(tracker.records()[0].name, "file-read");
    }

    #[test]
    fn out_of_order_completion_synthesizes_a_start() {
        let log = log_with(vec![
            json!({"toolName": "web-search", "status": "completed", "id": "call-9", "result": "done"}),
        ]);
        let mut tracker = ToolExecutionTracker::new();
        MessageStreamParser::replay(&log, &mut tracker);

        assert_eq!(tracker.records().len(), 1);
        let record = &tracker.records()[0];
        assert_eq!(record.id, "call-9");
        assert_eq!(record.status, ToolStatus::Completed);
        assert!(record.end_time.is_some());
    }

    #[test]
    fn failure_events_carry_their_error() {
        let log = log_with(vec![
            json!({"toolName": "web-search", "status": "executing"}),
            json!({"toolName": "web-search", "status": "failed", "error": "quota exceeded"}),
        ]);
        let mut tracker = ToolExecutionTracker::new();
        MessageStreamParser::replay(&log, &mut tracker);

        let record = &tracker.records()[0];
        assert_eq!(record.status, ToolStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("quota exceeded"));
    }

    #[test]
    fn fresh_session_log_clears_prior_state() {
        let mut tracker = ToolExecutionTracker::new();
        tracker.start("web-search", "Web Search", Default::default());
        assert!(tracker.is_active());

        let fresh_log = vec![Message::assistant("welcome back")];
        MessageStreamParser::replay(&fresh_log, &mut tracker);
        assert!(tracker.records().is_empty());
        assert!(!tracker.is_active());
    }

    #[test]
    fn wire_timestamps_are_honored() {
        let log = log_with(vec![
            json!({
                "toolName": "web-search",
                "status": "executing",
                "startTime": "2025-03-01T10:00:00Z"
            }),
            json!({
                "toolName": "web-search",
                "status": "completed",
                "endTime": "2025-03-01T10:00:05Z"
            }),
        ]);
        let mut tracker = ToolExecutionTracker::new();
        MessageStreamParser::replay(&log, &mut tracker);

        let record = &tracker.records()[0];
        assert_eq!(record.start_time.to_rfc3339(), "2025-03-01T10:00:00+00:00");
        assert_eq!(
            record.end_time.unwrap().to_rfc3339(),
            "2025-03-01T10:00:05+00:00"
        );
    }
}
