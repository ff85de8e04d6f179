//! Agent 主循环
//!
//! 拼请求（prompt + scratchpad）-> 调模型 -> parse_model_reply ->
//! ToolInvocation：查目录、执行、观察写回 scratchpad，继续；FinalAnswer：校验 Schema 后返回。
//! 有最大步数限制；取消令牌在每轮开始时检查，并与模型/工具调用竞争。

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::core::AgentError;
use crate::memory::Transcript;
use crate::react::{parse_model_reply, AgentEvent, AgentStep, FinalAnswer, Planner};
use crate::tools::{OutputSchema, ToolExecutor, ToolRegistry};

/// 单次调用内默认最大步数，防止模型永远不给最终答案
pub const DEFAULT_MAX_STEPS: usize = 12;
/// Observation 预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// 一次 invoke 的输入：prompt、目标 Schema、工具目录、取消令牌
pub struct AgentRequest {
    pub prompt: String,
    pub schema: OutputSchema,
    pub tools: ToolRegistry,
    pub cancel_token: CancellationToken,
}

impl AgentRequest {
    pub fn new(prompt: impl Into<String>, schema: OutputSchema) -> Self {
        Self {
            prompt: prompt.into(),
            schema,
            tools: ToolRegistry::new(),
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }
}

/// invoke 结果：最终答案与本次的 scratchpad
#[derive(Debug)]
pub struct AgentResult {
    pub answer: FinalAnswer,
    pub transcript: Transcript,
    /// 调用模型的次数
    pub steps: usize,
}

/// Agent 循环：Planner + 工具执行器 + 步数上限
pub struct AgentLoop {
    planner: Planner,
    executor: ToolExecutor,
    max_steps: usize,
    validate_schema: bool,
    event_tx: Option<UnboundedSender<AgentEvent>>,
}

impl AgentLoop {
    pub fn new(planner: Planner, executor: ToolExecutor) -> Self {
        Self {
            planner,
            executor,
            max_steps: DEFAULT_MAX_STEPS,
            validate_schema: true,
            event_tx: None,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// 是否校验最终答案字段与 Schema 完全一致（默认开启）
    pub fn with_schema_validation(mut self, enabled: bool) -> Self {
        self.validate_schema = enabled;
        self
    }

    /// 设置事件推送通道
    pub fn with_event_tx(mut self, tx: UnboundedSender<AgentEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn send(&self, ev: AgentEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(ev);
        }
    }

    fn fail(&self, err: AgentError) -> AgentError {
        tracing::warn!(error = %err, "agent loop failed");
        self.send(AgentEvent::Error {
            text: err.to_string(),
        });
        err
    }

    /// 执行 Agent 循环直到得到最终答案或出错
    pub async fn invoke(&self, request: AgentRequest) -> Result<AgentResult, AgentError> {
        let AgentRequest {
            prompt,
            schema,
            tools,
            cancel_token,
        } = request;

        // 目标 Schema 与工具同名时无法区分「调用工具」与「最终答案」
        if tools.contains(schema.name()) {
            return Err(self.fail(AgentError::DuplicateTool(schema.name().to_string())));
        }
        let mut functions = tools.function_specs();
        functions.push(schema.function_spec());

        let mut transcript = Transcript::new();

        for step in 0..self.max_steps {
            self.send(AgentEvent::StepUpdate {
                step,
                max_steps: self.max_steps,
            });
            if cancel_token.is_cancelled() {
                return Err(self.fail(AgentError::Cancelled));
            }

            self.send(AgentEvent::Thinking);
            let reply = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => return Err(self.fail(AgentError::Cancelled)),
                r = self.planner.plan(&prompt, &transcript, &functions) => r.map_err(|e| self.fail(e))?,
            };

            match parse_model_reply(&reply, schema.name()) {
                Ok(AgentStep::ToolInvocation(invocation)) => {
                    tracing::info!(step, tool = %invocation.tool_name, "tool invocation");
                    self.send(AgentEvent::ToolCall {
                        tool: invocation.tool_name.clone(),
                        args: invocation.arguments.clone(),
                    });
                    let Some(tool) = tools.get(&invocation.tool_name) else {
                        return Err(self.fail(AgentError::ToolNotFound(invocation.tool_name)));
                    };
                    let result = tokio::select! {
                        biased;
                        _ = cancel_token.cancelled() => return Err(self.fail(AgentError::Cancelled)),
                        r = self.executor.execute(tool.as_ref(), invocation.arguments.clone()) => r,
                    };
                    // 工具失败不终止循环：错误描述作为观察交给模型
                    let observation = match result {
                        Ok(obs) => obs,
                        Err(e) => {
                            tracing::warn!(tool = %invocation.tool_name, error = %e, "tool failed");
                            self.send(AgentEvent::ToolFailure {
                                tool: invocation.tool_name.clone(),
                                reason: e.to_string(),
                            });
                            format!("Error: {e}")
                        }
                    };
                    let mut preview: String =
                        observation.chars().take(OBSERVATION_PREVIEW_CHARS).collect();
                    if observation.chars().count() > OBSERVATION_PREVIEW_CHARS {
                        preview.push_str("...");
                    }
                    self.send(AgentEvent::Observation {
                        tool: invocation.tool_name.clone(),
                        preview,
                    });
                    transcript.push(invocation, observation);
                }
                Ok(AgentStep::FinalAnswer(answer)) => {
                    if self.validate_schema {
                        schema.validate(&answer.fields).map_err(|e| self.fail(e))?;
                    }
                    tracing::info!(step, schema = %schema.name(), tools_used = transcript.len(), "final answer");
                    self.send(AgentEvent::FinalAnswer {
                        schema: schema.name().to_string(),
                    });
                    return Ok(AgentResult {
                        answer,
                        transcript,
                        steps: step + 1,
                    });
                }
                Err(e) => return Err(self.fail(e)),
            }
        }

        Err(self.fail(AgentError::LoopExceeded(self.max_steps)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tokio::sync::mpsc;

    use crate::llm::{FunctionSpec, LlmClient, ModelReply, ScriptedLlmClient};
    use crate::memory::Message;
    use crate::tools::Tool;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the arguments back"
        }

        async fn execute(&self, args: Value) -> Result<Value, String> {
            Ok(args)
        }
    }

    struct Slow;

    #[async_trait]
    impl LlmClient for Slow {
        async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
            Ok(String::new())
        }

        async fn complete_with_functions(
            &self,
            _messages: &[Message],
            _functions: &[FunctionSpec],
        ) -> Result<ModelReply, String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(ModelReply::text("{}"))
        }
    }

    fn pin_schema() -> OutputSchema {
        OutputSchema::new(
            "Pin",
            "A point",
            json!({"type": "object", "properties": {"label": {"type": "string"}}}),
        )
    }

    fn agent(llm: Arc<dyn LlmClient>) -> AgentLoop {
        AgentLoop::new(Planner::new(llm, "system", 5), ToolExecutor::new(5))
    }

    #[tokio::test]
    async fn test_events_follow_the_loop() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            ModelReply::call("echo", r#"{"text":"hi"}"#),
            ModelReply::call("Pin", r#"{"label":"home"}"#),
        ]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let agent = agent(llm).with_event_tx(tx);
        let mut tools = ToolRegistry::new();
        tools.register(Echo).unwrap();

        let result = agent
            .invoke(AgentRequest::new("Where is home?", pin_schema()).with_tools(tools))
            .await
            .unwrap();
        assert_eq!(result.steps, 2);
        drop(agent);

        let mut kinds = Vec::new();
        while let Some(ev) = rx.recv().await {
            let v = serde_json::to_value(&ev).unwrap();
            kinds.push(v["type"].as_str().unwrap_or_default().to_string());
        }
        assert_eq!(
            kinds,
            vec![
                "step_update",
                "thinking",
                "tool_call",
                "observation",
                "step_update",
                "thinking",
                "final_answer"
            ]
        );
    }

    #[tokio::test]
    async fn test_schema_name_colliding_with_tool() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![]));
        let agent = agent(llm.clone());
        let mut tools = ToolRegistry::new();
        tools.register(Echo).unwrap();
        let schema = OutputSchema::new("echo", "clash", json!({"type": "object", "properties": {}}));
        let err = agent
            .invoke(AgentRequest::new("hi", schema).with_tools(tools))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::DuplicateTool(name) if name == "echo"));
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_validation_can_be_disabled() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![ModelReply::call("Pin", r#"{"other":1}"#)]));
        let agent = agent(llm).with_schema_validation(false);
        let result = agent.invoke(AgentRequest::new("hi", pin_schema())).await.unwrap();
        assert_eq!(result.answer.fields, json!({"other": 1}));
    }

    #[tokio::test]
    async fn test_provider_error_is_typed() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![]));
        llm.push_error("503 Service Unavailable");
        let err = agent(llm).invoke(AgentRequest::new("hi", pin_schema())).await.unwrap_err();
        assert!(matches!(err, AgentError::LlmError(msg) if msg.contains("503")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_model_timeout() {
        let err = agent(Arc::new(Slow))
            .invoke(AgentRequest::new("hi", pin_schema()))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ModelTimeout(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_waiting_for_model() {
        let token = CancellationToken::new();
        let agent = AgentLoop::new(Planner::new(Arc::new(Slow), "system", 7200), ToolExecutor::new(5));
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });
        let err = agent
            .invoke(AgentRequest::new("hi", pin_schema()).with_cancel_token(token))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Cancelled));
    }
}
