//! Tool-execution progress: wire events, the per-turn tracker, and the
//! log-replay parser that connects them.

pub mod events;
pub mod parser;
pub mod tracker;

pub use events::{parse_tool_event, ToolEventError, ToolStatusEvent};
pub use parser::MessageStreamParser;
pub use tracker::{ToolExecutionRecord, ToolExecutionTracker, ToolExecutionUpdate, ToolStatus};
