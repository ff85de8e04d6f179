//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用 chat/completions（可配置 base_url，支持 DeepSeek、OpenAI、自建代理等）。
//! 函数调用：工具与目标 Schema 以 tools 形式绑定；scratchpad 回放为 assistant tool_calls + tool 结果消息。

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls,
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestToolMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionResponseMessage, ChatCompletionTool,
    ChatCompletionToolChoiceOption, ChatCompletionTools, CreateChatCompletionRequestArgs,
    FunctionCall as ChatFunctionCall, FunctionObject, ToolChoiceOptions,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::{FunctionSpec, LlmClient, ModelReply};
use crate::memory::{FunctionCall, Message, Role};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI 兼容客户端
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());
        let base_url = base_url.unwrap_or(OPENAI_BASE_URL).trim_end_matches('/').to_string();

        let config = OpenAIConfig::new()
            .with_api_base(base_url)
            .with_api_key(api_key);

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// 内部消息 -> async_openai 请求消息；函数调用与结果按 tool_call_id 关联
fn to_openai_messages(messages: &[Message]) -> Result<Vec<ChatCompletionRequestMessage>, String> {
    messages
        .iter()
        .map(|m| {
            let msg: ChatCompletionRequestMessage = match m.role {
                Role::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(m.content.clone())
                    .build()
                    .map_err(|e| e.to_string())?
                    .into(),
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(m.content.clone())
                    .build()
                    .map_err(|e| e.to_string())?
                    .into(),
                Role::Assistant => {
                    let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                    match &m.function_call {
                        Some(call) => {
                            builder.tool_calls(vec![ChatCompletionMessageToolCalls::Function(
                                ChatCompletionMessageToolCall {
                                    id: call.id.clone().unwrap_or_else(|| "call_0".to_string()),
                                    function: ChatFunctionCall {
                                        name: call.name.clone(),
                                        arguments: call.arguments.clone(),
                                    },
                                },
                            )]);
                        }
                        None => {
                            builder.content(m.content.clone());
                        }
                    }
                    builder.build().map_err(|e| e.to_string())?.into()
                }
                Role::Function => ChatCompletionRequestToolMessageArgs::default()
                    .content(m.content.clone())
                    .tool_call_id(m.call_id.clone().unwrap_or_else(|| "call_0".to_string()))
                    .build()
                    .map_err(|e| e.to_string())?
                    .into(),
            };
            Ok(msg)
        })
        .collect()
}

fn to_openai_tools(functions: &[FunctionSpec]) -> Vec<ChatCompletionTools> {
    functions
        .iter()
        .map(|f| {
            ChatCompletionTools::Function(ChatCompletionTool {
                function: FunctionObject {
                    name: f.name.clone(),
                    description: Some(f.description.clone()),
                    parameters: Some(f.parameters.clone()),
                    ..Default::default()
                },
            })
        })
        .collect()
}

/// 取响应中的文本与第一个函数调用
fn reply_from_message(message: ChatCompletionResponseMessage) -> ModelReply {
    let mut calls: Vec<FunctionCall> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .filter_map(|tc| match tc {
            ChatCompletionMessageToolCalls::Function(f) => {
                Some(FunctionCall::new(f.function.name, f.function.arguments).with_id(f.id))
            }
            _ => None,
        })
        .collect();
    if calls.len() > 1 {
        tracing::warn!(count = calls.len(), "model returned parallel tool calls, only the first is used");
    }
    let function_call = if calls.is_empty() { None } else { Some(calls.swap_remove(0)) };
    ModelReply {
        content: message.content,
        function_call,
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(to_openai_messages(messages)?)
            .build()
            .map_err(|e| e.to_string())?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| e.to_string())?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(content)
    }

    async fn complete_with_functions(
        &self,
        messages: &[Message],
        functions: &[FunctionSpec],
    ) -> Result<ModelReply, String> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone())
            .messages(to_openai_messages(messages)?)
            .temperature(0.0);
        if !functions.is_empty() {
            args.tools(to_openai_tools(functions))
                .tool_choice(ChatCompletionToolChoiceOption::Mode(ToolChoiceOptions::Auto));
        }
        let request = args.build().map_err(|e| e.to_string())?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| format!("OpenAI API error: {e}"))?;

        let message = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| "Response contained no choices".to_string())?;
        Ok(reply_from_message(message))
    }
}
