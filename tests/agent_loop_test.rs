//! Agent 循环集成测试：脚本化 LLM + 测试工具，覆盖解析分支、工具观察与终止条件

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tokio_util::sync::CancellationToken;

    use wander::itinerary::Coordinates;
    use wander::llm::{ModelReply, ScriptedLlmClient};
    use wander::memory::Role;
    use wander::react::{AgentLoop, AgentRequest, Planner};
    use wander::tools::{OutputSchema, Tool, ToolExecutor, ToolRegistry};
    use wander::AgentError;

    const PARIS: &str = r#"{"location":"Paris, France","latitude":48.8566,"longitude":2.3522}"#;

    /// 记录调用次数的工具
    #[derive(Default)]
    struct Counter {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Tool for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn description(&self) -> &str {
            "Counts how often it was called"
        }

        async fn execute(&self, _args: Value) -> Result<Value, String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(json!({ "count": n }))
        }
    }

    struct Failing;

    #[async_trait]
    impl Tool for Failing {
        fn name(&self) -> &str {
            "fail"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        async fn execute(&self, _args: Value) -> Result<Value, String> {
            Err("boom".to_string())
        }
    }

    struct Sleepy;

    #[async_trait]
    impl Tool for Sleepy {
        fn name(&self) -> &str {
            "sleepy"
        }

        fn description(&self) -> &str {
            "Never answers in time"
        }

        async fn execute(&self, _args: Value) -> Result<Value, String> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(Value::Null)
        }
    }

    fn agent_with(replies: Vec<ModelReply>) -> (AgentLoop, Arc<ScriptedLlmClient>) {
        let llm = Arc::new(ScriptedLlmClient::new(replies));
        let agent = AgentLoop::new(Planner::new(llm.clone(), "You are a geocoder.", 30), ToolExecutor::new(1));
        (agent, llm)
    }

    fn coordinates() -> OutputSchema {
        OutputSchema::of::<Coordinates>()
    }

    #[tokio::test]
    async fn test_coordinates_function_call_is_final_answer() {
        let (agent, llm) = agent_with(vec![ModelReply::call("Coordinates", PARIS)]);
        let result = agent
            .invoke(AgentRequest::new("Find the coordinates for Paris, France", coordinates()))
            .await
            .unwrap();

        let expected: Value = serde_json::from_str(PARIS).unwrap();
        assert_eq!(result.answer.fields, expected);
        assert!(result.transcript.is_empty());
        assert_eq!(result.steps, 1);
        assert_eq!(llm.calls()[0].function_names, vec!["Coordinates"]);

        let typed: Coordinates = result.answer.into_typed().unwrap();
        assert_eq!(typed.location, "Paris, France");
    }

    #[tokio::test]
    async fn test_tool_call_grows_transcript_by_one_before_next_call() {
        let (agent, llm) = agent_with(vec![
            ModelReply::call("counter", "{}"),
            ModelReply::call("Coordinates", PARIS),
        ]);
        let counter = Arc::new(Counter::default());
        let mut tools = ToolRegistry::new();
        tools.register_arc(counter.clone()).unwrap();

        let result = agent
            .invoke(AgentRequest::new("Where is Paris?", coordinates()).with_tools(tools))
            .await
            .unwrap();

        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.transcript.len(), 1);
        assert_eq!(result.transcript.tool_names(), vec!["counter"]);
        assert_eq!(result.transcript.entries()[0].observation, r#"{"count":1}"#);

        let calls = llm.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].function_names, vec!["counter", "Coordinates"]);
        // 第二次请求多出一对 assistant(function_call) + function(result)
        assert_eq!(calls[1].messages.len(), calls[0].messages.len() + 2);
        let replay = &calls[1].messages[calls[0].messages.len()..];
        assert_eq!(replay[0].role, Role::Assistant);
        assert_eq!(replay[0].function_call.as_ref().unwrap().name, "counter");
        assert_eq!(replay[1].role, Role::Function);
        assert_eq!(replay[1].call_id.as_deref(), Some("call_0"));
        assert_eq!(replay[1].content, r#"{"count":1}"#);
    }

    #[tokio::test]
    async fn test_plain_json_reply_is_final_answer() {
        let (agent, _) = agent_with(vec![ModelReply::text(PARIS)]);
        let result = agent
            .invoke(AgentRequest::new("Where is Paris?", coordinates()))
            .await
            .unwrap();
        assert_eq!(result.answer.fields, serde_json::from_str::<Value>(PARIS).unwrap());
        assert!(result.transcript.is_empty());
    }

    #[tokio::test]
    async fn test_fenced_json_reply_is_malformed() {
        let (agent, llm) = agent_with(vec![ModelReply::text(format!("```json\n{PARIS}\n```"))]);
        let err = agent
            .invoke(AgentRequest::new("Where is Paris?", coordinates()))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::MalformedOutput { .. }), "got {err:?}");
        assert_eq!(llm.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed_without_side_effects() {
        let (agent, llm) = agent_with(vec![ModelReply::text("Paris is at roughly 48N, 2E.")]);
        let counter = Arc::new(Counter::default());
        let mut tools = ToolRegistry::new();
        tools.register_arc(counter.clone()).unwrap();

        let err = agent
            .invoke(AgentRequest::new("Where is Paris?", coordinates()).with_tools(tools))
            .await
            .unwrap_err();
        match err {
            AgentError::MalformedOutput { raw, .. } => assert_eq!(raw, "Paris is at roughly 48N, 2E."),
            other => panic!("expected MalformedOutput, got {other:?}"),
        }
        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
        assert_eq!(llm.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_fatal() {
        let (agent, llm) = agent_with(vec![
            ModelReply::call("weather", r#"{"city":"Paris"}"#),
            ModelReply::call("Coordinates", PARIS),
        ]);
        let err = agent
            .invoke(AgentRequest::new("Where is Paris?", coordinates()))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ToolNotFound(name) if name == "weather"));
        assert_eq!(llm.remaining(), 1);
    }

    #[tokio::test]
    async fn test_step_budget_is_enforced() {
        let (agent, _) = agent_with(vec![
            ModelReply::call("counter", "{}"),
            ModelReply::call("counter", "{}"),
            ModelReply::call("counter", "{}"),
            ModelReply::call("Coordinates", PARIS),
        ]);
        let agent = agent.with_max_steps(3);
        let counter = Arc::new(Counter::default());
        let mut tools = ToolRegistry::new();
        tools.register_arc(counter.clone()).unwrap();

        let err = agent
            .invoke(AgentRequest::new("Count forever", coordinates()).with_tools(tools))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::LoopExceeded(3)));
        assert_eq!(counter.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_tool_failure_becomes_observation() {
        let (agent, _) = agent_with(vec![ModelReply::call("fail", "{}"), ModelReply::call("Coordinates", PARIS)]);
        let mut tools = ToolRegistry::new();
        tools.register(Failing).unwrap();

        let result = agent
            .invoke(AgentRequest::new("Where is Paris?", coordinates()).with_tools(tools))
            .await
            .unwrap();
        assert_eq!(result.transcript.len(), 1);
        assert_eq!(
            result.transcript.entries()[0].observation,
            "Error: Tool execution failed: fail: boom"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_tool_timeout_becomes_observation() {
        let (agent, _) = agent_with(vec![ModelReply::call("sleepy", "{}"), ModelReply::call("Coordinates", PARIS)]);
        let mut tools = ToolRegistry::new();
        tools.register(Sleepy).unwrap();

        let result = agent
            .invoke(AgentRequest::new("Where is Paris?", coordinates()).with_tools(tools))
            .await
            .unwrap();
        assert_eq!(result.transcript.entries()[0].observation, "Error: Tool timeout: sleepy");
    }

    #[tokio::test]
    async fn test_cancelled_before_first_model_call() {
        let (agent, llm) = agent_with(vec![ModelReply::call("Coordinates", PARIS)]);
        let token = CancellationToken::new();
        token.cancel();
        let err = agent
            .invoke(AgentRequest::new("Where is Paris?", coordinates()).with_cancel_token(token))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Cancelled));
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_final_answer_must_match_schema_fields() {
        let (agent, _) = agent_with(vec![ModelReply::call(
            "Coordinates",
            r#"{"location":"Paris, France","altitude":35}"#,
        )]);
        let err = agent
            .invoke(AgentRequest::new("Where is Paris?", coordinates()))
            .await
            .unwrap_err();
        match err {
            AgentError::SchemaMismatch { schema, missing, extra } => {
                assert_eq!(schema, "Coordinates");
                assert_eq!(missing, vec!["latitude", "longitude"]);
                assert_eq!(extra, vec!["altitude"]);
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }
}
