//! 核心层：错误类型、会话监管（取消）

pub mod error;
pub mod session_supervisor;

pub use error::{AgentError, ConversationError};
pub use session_supervisor::SessionSupervisor;
