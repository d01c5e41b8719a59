//! Events emitted while a question is being answered.

use serde::{Deserialize, Serialize};

use crate::types::{FinalAnswer, ToolCallRequest, ToolCallResult};

/// Progress of the orchestration loop, for display and logging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoopEvent {
    QuestionReceived {
        question: String,
    },
    ToolCallStarted {
        call: ToolCallRequest,
        round_trip: usize,
    },
    ToolResult {
        tool_name: String,
        result: ToolCallResult,
    },
    CorrectiveRetry {
        detail: String,
    },
    Answered {
        answer: FinalAnswer,
        round_trips: usize,
    },
    Failed {
        error: String,
    },
}
