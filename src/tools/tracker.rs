//! Per-turn registry of tool-invocation lifecycle records.
//!
//! The tracker is plain owned state mutated from the event loop; nothing else
//! touches it, so there is no locking. Lifecycle:
//! `pending → starting → executing → {completed | failed}`, with the two
//! terminal states immutable once reached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Pending,
    Starting,
    Executing,
    Completed,
    Failed,
}

impl ToolStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ToolStatus::Completed | ToolStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ToolStatus::Pending => "pending",
            ToolStatus::Starting => "starting",
            ToolStatus::Executing => "executing",
            ToolStatus::Completed => "completed",
            ToolStatus::Failed => "failed",
        }
    }

    /// Position in the lifecycle; updates never move a record backwards.
    fn rank(self) -> u8 {
        match self {
            ToolStatus::Pending => 0,
            ToolStatus::Starting => 1,
            ToolStatus::Executing => 2,
            ToolStatus::Completed | ToolStatus::Failed => 3,
        }
    }
}

/// One external tool invocation's lifecycle, as shown to the rendering layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolExecutionRecord {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub status: ToolStatus,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub parameters: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl ToolExecutionRecord {
    /// One-line progress card fallback for renderers that want plain text.
    pub fn summary(&self) -> String {
        match (self.status, self.progress, self.error.as_deref()) {
            (ToolStatus::Executing, Some(progress), _) => {
                format!("{}: executing ({progress}%)", self.display_name)
            }
            (ToolStatus::Failed, _, Some(error)) => {
                format!("{}: failed ({error})", self.display_name)
            }
            (status, _, _) => format!("{}: {}", self.display_name, status.as_str()),
        }
    }
}

/// Mutable fields accepted by [`ToolExecutionTracker::update`]. Terminal
/// statuses are ignored here; use `complete`/`fail` for those transitions.
#[derive(Debug, Default)]
pub struct ToolExecutionUpdate {
    pub status: Option<ToolStatus>,
    pub progress: Option<u8>,
    pub parameters: Option<Map<String, Value>>,
}

#[derive(Debug, Default)]
pub struct ToolExecutionTracker {
    records: Vec<ToolExecutionRecord>,
    next_id: u64,
}

impl ToolExecutionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool invocation and returns its record id. Idempotent: if a
    /// non-terminal record with the same `name` exists, its id is returned and
    /// nothing changes.
    pub fn start(&mut self, name: &str, display_name: &str, parameters: Map<String, Value>) -> String {
        self.start_with(None, name, Some(display_name), parameters, None)
    }

    /// Event-replay variant of [`start`](Self::start): admits the record under
    /// an upstream id and start time when the wire supplies them. A known `id`
    /// is returned untouched regardless of record state, which is what keeps
    /// whole-log replays no-ops.
    pub fn start_with(
        &mut self,
        id: Option<&str>,
        name: &str,
        display_name: Option<&str>,
        parameters: Map<String, Value>,
        start_time: Option<DateTime<Utc>>,
    ) -> String {
        if let Some(id) = id {
            if self.records.iter().any(|record| record.id == id) {
                return id.to_string();
            }
        }
        if let Some(existing) = self
            .records
            .iter()
            .find(|record| record.name == name && !record.status.is_terminal())
        {
            return existing.id.clone();
        }

        let id = match id {
            Some(id) => id.to_string(),
            None => {
                self.next_id += 1;
                format!("tool-{}", self.next_id)
            }
        };
        let display_name = display_name
            .filter(|value| !value.is_empty())
            .unwrap_or(name)
            .to_string();
        debug!(id = %id, name, "tool execution started");
        self.records.push(ToolExecutionRecord {
            id: id.clone(),
            name: name.to_string(),
            display_name,
            status: ToolStatus::Starting,
            start_time: start_time.unwrap_or_else(Utc::now),
            end_time: None,
            parameters,
            result: None,
            error: None,
            progress: None,
        });
        id
    }

    /// Applies non-terminal field changes. No-op on unknown ids and on
    /// terminal records.
    pub fn update(&mut self, id: &str, update: ToolExecutionUpdate) {
        let Some(record) = self.records.iter_mut().find(|record| record.id == id) else {
            return;
        };
        if record.status.is_terminal() {
            return;
        }
        if let Some(status) = update.status {
            if !status.is_terminal() && status.rank() > record.status.rank() {
                record.status = status;
            }
        }
        if let Some(progress) = update.progress {
            record.progress = Some(progress.min(100));
        }
        if let Some(parameters) = update.parameters {
            record.parameters = parameters;
        }
    }

    /// Terminal transition to `completed`. Returns false when the id is
    /// unknown or the record already reached a terminal state.
    pub fn complete(&mut self, id: &str, result: Option<Value>) -> bool {
        self.complete_at(id, result, None)
    }

    /// Terminal transition to `failed`; symmetric to [`complete`](Self::complete).
    pub fn fail(&mut self, id: &str, error: impl Into<String>) -> bool {
        self.fail_at(id, error, None)
    }

    pub(crate) fn complete_at(
        &mut self,
        id: &str,
        result: Option<Value>,
        end_time: Option<DateTime<Utc>>,
    ) -> bool {
        self.finish(id, ToolStatus::Completed, result, None, end_time)
    }

    pub(crate) fn fail_at(
        &mut self,
        id: &str,
        error: impl Into<String>,
        end_time: Option<DateTime<Utc>>,
    ) -> bool {
        self.finish(id, ToolStatus::Failed, None, Some(error.into()), end_time)
    }

    fn finish(
        &mut self,
        id: &str,
        status: ToolStatus,
        result: Option<Value>,
        error: Option<String>,
        end_time: Option<DateTime<Utc>>,
    ) -> bool {
        let Some(record) = self.records.iter_mut().find(|record| record.id == id) else {
            return false;
        };
        if record.status.is_terminal() {
            return false;
        }
        record.status = status;
        record.end_time = Some(end_time.unwrap_or_else(Utc::now));
        record.result = result;
        record.error = error;
        debug!(id = %id, status = status.as_str(), "tool execution finished");
        true
    }

    /// Drops all records. Called when the active turn has no user-authored
    /// message, i.e. a fresh session.
    pub fn clear(&mut self) {
        self.records.clear();
        self.next_id = 0;
    }

    /// True while any record is still pending, starting, or executing.
    pub fn is_active(&self) -> bool {
        self.records
            .iter()
            .any(|record| !record.status.is_terminal())
    }

    pub fn records(&self) -> &[ToolExecutionRecord] {
        &self.records
    }

    pub fn record(&self, id: &str) -> Option<&ToolExecutionRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    /// The non-terminal record for `name`, if one exists. The tracker keeps at
    /// most one per name.
    pub fn active_record_for(&self, name: &str) -> Option<&ToolExecutionRecord> {
        self.records
            .iter()
            .find(|record| record.name == name && !record.status.is_terminal())
    }

    /// Most recently admitted record for `name`, terminal or not.
    pub(crate) fn latest_record_for(&self, name: &str) -> Option<&ToolExecutionRecord> {
        self.records
            .iter()
            .rev()
            .find(|record| record.name == name)
    }

    /// Rebinds a record to the id the wire assigned to it later than its
    /// admission. Ids already in use are never stolen.
    pub(crate) fn rebind_id(&mut self, old_id: &str, new_id: &str) {
        if self.records.iter().any(|record| record.id == new_id) {
            return;
        }
        if let Some(record) = self.records.iter_mut().find(|record| record.id == old_id) {
            debug!(old_id, new_id, "tool record adopted wire id");
            record.id = new_id.to_string();
        }
    }
}
