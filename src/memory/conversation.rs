//! 对话消息：发往模型的消息序列
//!
//! 除 system / user / assistant 外，还需表达「assistant 发起函数调用」与「函数返回结果」两类消息，
//! 以便把工具调用历史（scratchpad）按顺序回放给模型。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
    /// 函数（工具）返回结果
    Function,
}

/// 模型发出的函数调用：name + 原始 JSON 参数串
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// 调用 ID（tools API 返回；回放时用于关联结果消息）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// 参数：JSON 字符串，由解析器负责反序列化
    pub arguments: String,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// assistant 消息：本轮发起的函数调用
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    /// function 消息：函数名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// function 消息：对应的调用 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

impl Message {
    fn plain(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            function_call: None,
            name: None,
            call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content.into())
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content.into())
    }

    /// assistant 发起函数调用（content 为空）
    pub fn assistant_call(call: FunctionCall) -> Self {
        Self {
            function_call: Some(call),
            ..Self::plain(Role::Assistant, String::new())
        }
    }

    /// 函数返回结果，关联到 call 的 name / id
    pub fn function_result(call: &FunctionCall, content: impl Into<String>) -> Self {
        Self {
            name: Some(call.name.clone()),
            call_id: call.id.clone(),
            ..Self::plain(Role::Function, content.into())
        }
    }
}
