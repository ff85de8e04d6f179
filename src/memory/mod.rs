//! 记忆层：模型消息与单次调用内的 scratchpad

pub mod conversation;
pub mod scratchpad;

pub use conversation::{FunctionCall, Message, Role};
pub use scratchpad::{Transcript, TranscriptEntry};
