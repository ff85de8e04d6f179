//! 会话层：步骤式状态机、共享状态、人设语气、输入来源，以及旅行规划对话的具体配置

pub mod input;
pub mod machine;
pub mod persona;
pub mod state;
pub mod travel;

pub use input::{InputSource, ScriptedInput, StdinInput};
pub use machine::{
    ConversationBuilder, ConversationSession, ConversationSpec, FnStep, Phase, StepHandler,
    DEFAULT_MAX_INPUT_ATTEMPTS,
};
pub use persona::{LlmPersonaVoice, PersonaVoice, PlainVoice};
pub use state::SharedState;
pub use travel::{travel_conversation, CreateItinerary};
