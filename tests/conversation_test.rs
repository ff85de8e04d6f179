//! 会话状态机集成测试：入口轮转、终止步骤、跳转、未知入口、重新提示与人设改写

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::Value;

    use wander::conversation::{
        ConversationSession, ConversationSpec, FnStep, LlmPersonaVoice, Phase, ScriptedInput, SharedState,
    };
    use wander::llm::{ModelReply, ScriptedLlmClient};
    use wander::ConversationError;

    type Log = Arc<Mutex<Vec<String>>>;

    /// 记录调用顺序与输入的处理器
    fn logging(
        log: &Log,
        name: &'static str,
    ) -> FnStep<impl Fn(&mut SharedState, Option<&str>) -> Result<(), ConversationError>> {
        let log = log.clone();
        FnStep::new(move |state: &mut SharedState, input: Option<&str>| {
            if let Ok(mut l) = log.lock() {
                l.push(name.to_string());
            }
            if let Some(text) = input {
                state.set(name, text);
            }
            Ok(())
        })
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn five_steps(log: &Log) -> ConversationSpec {
        ConversationSpec::builder()
            .entry_step("s0", "Step 0? ", "activities", logging(log, "s0"))
            .step("s1", "Step 1? ", logging(log, "s1"))
            .entry_step("s2", "Step 2? ", "destination", logging(log, "s2"))
            .step("s3", "Step 3? ", logging(log, "s3"))
            .step("s4", "Step 4? ", logging(log, "s4"))
            .finish("finalize", logging(log, "finalize"))
            .unwrap()
    }

    #[tokio::test]
    async fn test_entry_rotation_visits_each_step_once() {
        let log = Log::default();
        let mut session = ConversationSession::new(Arc::new(five_steps(&log)));
        let mut input = ScriptedInput::new(["a", "b", "c", "d", "e"]);

        session.start("destination", &mut input).await.unwrap();

        assert_eq!(entries(&log), vec!["s2", "s3", "s4", "s0", "s1", "finalize"]);
        assert_eq!(
            input.prompts(),
            &["Step 2? ", "Step 3? ", "Step 4? ", "Step 0? ", "Step 1? "]
        );
        assert_eq!(session.state().get_str("s2"), Some("a"));
        assert_eq!(session.state().get_str("s1"), Some("e"));
        assert_eq!(session.phase(), Phase::Done);
    }

    #[tokio::test]
    async fn test_three_step_controller() {
        let log = Log::default();
        let spec = ConversationSpec::builder()
            .entry_step("collect_activities", "Activities? ", "activities", logging(&log, "collect_activities"))
            .entry_step("collect_destination", "Destination? ", "destination", logging(&log, "collect_destination"))
            .finish("finalize", logging(&log, "finalize"))
            .unwrap();
        let mut session = ConversationSession::new(Arc::new(spec));
        let mut input = ScriptedInput::new(["Lisbon", "fado"]);

        session.start("destination", &mut input).await.unwrap();

        assert_eq!(
            entries(&log),
            vec!["collect_destination", "collect_activities", "finalize"]
        );
        assert_eq!(session.state().get_str("collect_destination"), Some("Lisbon"));
        assert_eq!(session.state().get_str("collect_activities"), Some("fado"));
    }

    #[tokio::test]
    async fn test_jump_to_last_runs_only_terminal_step() {
        let log = Log::default();
        let mut state = SharedState::new();
        state.set("s2", "Kyoto");
        let mut session = ConversationSession::new(Arc::new(five_steps(&log))).with_state(state);

        session.jump_to_last().await.unwrap();

        assert_eq!(entries(&log), vec!["finalize"]);
        assert_eq!(session.state().get_str("s2"), Some("Kyoto"));
        assert_eq!(session.phase(), Phase::Done);
    }

    #[tokio::test]
    async fn test_unknown_entry_point_leaves_session_untouched() {
        let log = Log::default();
        let mut state = SharedState::new();
        state.set("s0", "before");
        let mut session = ConversationSession::new(Arc::new(five_steps(&log))).with_state(state.clone());
        let mut input = ScriptedInput::new(["x"]);

        let err = session.start("budget", &mut input).await.unwrap_err();

        assert!(matches!(err, ConversationError::UnknownEntryPoint(name) if name == "budget"));
        assert_eq!(err_text("budget"), "Invalid entry point: budget");
        assert!(entries(&log).is_empty());
        assert!(input.prompts().is_empty());
        assert_eq!(session.state(), &state);
        assert_eq!(session.phase(), Phase::AwaitingEntry);
        assert_eq!(session.current_step(), 0);

        // 同一会话仍可从合法入口开始
        let mut input = ScriptedInput::new(["a", "b", "c", "d", "e"]);
        session.start("activities", &mut input).await.unwrap();
        assert_eq!(entries(&log).len(), 6);
    }

    fn err_text(name: &str) -> String {
        ConversationError::UnknownEntryPoint(name.to_string()).to_string()
    }

    #[tokio::test]
    async fn test_invalid_input_reprompts_same_step() {
        let log = Log::default();
        let numeric = FnStep::new(|state: &mut SharedState, input: Option<&str>| {
            let n: u32 = input
                .unwrap_or_default()
                .trim()
                .parse()
                .map_err(|_| ConversationError::InvalidInput("Please enter a number.".into()))?;
            state.set("adults", n);
            Ok(())
        });
        let spec = ConversationSpec::builder()
            .entry_step("collect_adults", "Adults? ", "adults", numeric)
            .finish("finalize", logging(&log, "finalize"))
            .unwrap();
        let mut session = ConversationSession::new(Arc::new(spec));
        let mut input = ScriptedInput::new(["two", "2"]);

        session.start("adults", &mut input).await.unwrap();

        assert_eq!(input.prompts(), &["Adults? ", "Adults? "]);
        assert_eq!(input.messages(), &["Please enter a number."]);
        assert_eq!(session.state().get("adults"), Some(&Value::from(2)));
        assert_eq!(entries(&log), vec!["finalize"]);
    }

    #[tokio::test]
    async fn test_persona_voice_rewrites_descriptions() {
        let log = Log::default();
        let spec = ConversationSpec::builder()
            .entry_step("collect_destination", "Destination? ", "destination", logging(&log, "d"))
            .finish("finalize", logging(&log, "finalize"))
            .unwrap();
        let llm = Arc::new(ScriptedLlmClient::new(vec![ModelReply::text(
            "Whither, friend, shall thy journey lead?",
        )]));
        let voice = Arc::new(LlmPersonaVoice::new(llm.clone(), "The voice of Socrates, the Greek philosopher"));
        let mut session = ConversationSession::new(Arc::new(spec)).with_voice(voice);
        let mut input = ScriptedInput::new(["Athens"]);

        session.start("destination", &mut input).await.unwrap();

        assert_eq!(input.prompts(), &["Whither, friend, shall thy journey lead?\n"]);
        assert_eq!(
            llm.calls()[0].messages[0].content,
            "Rewrite the following prompt in The voice of Socrates, the Greek philosopher: Destination? "
        );
    }
}
