//! Core types shared across the crate.

pub mod generation;
pub mod message;

pub use generation::GenerationSettings;
pub use message::{
    AnswerKind, FinalAnswer, JsonObject, ModelReply, ToolCallRequest, ToolCallResult,
};
