//! Wire envelope for tool-status events embedded in `tool-executing`
//! messages. Parsing is defensive: anything malformed is rejected here with a
//! typed error and never reaches the tracker.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::tools::tracker::ToolStatus;

/// Validated tool-status event. Key spellings vary upstream (`toolName` vs
/// `name`, `params` vs `parameters`, `toolCallId` vs `id`); all are accepted.
#[derive(Debug, Clone)]
pub struct ToolStatusEvent {
    pub name: String,
    pub status: ToolStatus,
    pub display_name: Option<String>,
    pub parameters: Map<String, Value>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub progress: Option<u8>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawToolEvent {
    #[serde(alias = "toolName")]
    name: String,
    status: ToolStatus,
    display_name: Option<String>,
    #[serde(alias = "params")]
    parameters: Option<Map<String, Value>>,
    result: Option<Value>,
    error: Option<String>,
    progress: Option<f64>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    #[serde(alias = "toolCallId")]
    id: Option<String>,
}

#[derive(Debug)]
pub enum ToolEventError {
    /// Content was not JSON, or required fields were missing or mistyped.
    Malformed(String),
    /// The tool name was present but empty.
    MissingName,
    /// Progress must lie in 0..=100.
    ProgressOutOfRange(f64),
}

impl fmt::Display for ToolEventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolEventError::Malformed(detail) => write!(f, "malformed tool event: {detail}"),
            ToolEventError::MissingName => write!(f, "tool event has an empty tool name"),
            ToolEventError::ProgressOutOfRange(value) => {
                write!(f, "tool event progress out of range: {value}")
            }
        }
    }
}

impl std::error::Error for ToolEventError {}

/// Parses one message's content into a validated event.
pub fn parse_tool_event(content: &str) -> Result<ToolStatusEvent, ToolEventError> {
    let raw: RawToolEvent = serde_json::from_str(content)
        .map_err(|err| ToolEventError::Malformed(err.to_string()))?;

    let name = raw.name.trim().to_string();
    if name.is_empty() {
        return Err(ToolEventError::MissingName);
    }

    let progress = match raw.progress {
        Some(value) => {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(ToolEventError::ProgressOutOfRange(value));
            }
            Some(value.round() as u8)
        }
        None => None,
    };

    Ok(ToolStatusEvent {
        name,
        status: raw.status,
        display_name: raw.display_name.filter(|value| !value.is_empty()),
        parameters: raw.parameters.unwrap_or_default(),
        result: raw.result,
        error: raw.error,
        progress,
        start_time: raw.start_time,
        end_time: raw.end_time,
        id: raw.id.filter(|value| !value.is_empty()),
    })
}
