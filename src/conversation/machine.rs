//! 步骤式会话状态机
//!
//! ConversationSpec：有序的采集步骤（名称、描述、处理器）+ 一个终止步骤 + 入口表（名称 -> 采集步骤下标）。
//! ConversationSession：从入口开始按 (i + 1) mod (n - 1) 轮转，恰好执行 n - 1 个采集步骤，
//! 然后以无输入调用终止步骤一次；jump_to_last 只执行终止步骤。
//!
//! 状态：AwaitingEntry -> Collecting(i) -> Finalizing -> Done

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::conversation::input::InputSource;
use crate::conversation::persona::{PersonaVoice, PlainVoice};
use crate::conversation::state::SharedState;
use crate::core::ConversationError;

/// 默认每步最多接受的无效输入次数
pub const DEFAULT_MAX_INPUT_ATTEMPTS: usize = 3;

/// 步骤处理器：读写共享状态；采集步骤收到 Some(输入)，终止步骤收到 None
#[async_trait]
pub trait StepHandler: Send + Sync {
    async fn handle(
        &self,
        state: &mut SharedState,
        input: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<(), ConversationError>;
}

/// 同步闭包处理器
pub struct FnStep<F>(F);

impl<F> FnStep<F>
where
    F: Fn(&mut SharedState, Option<&str>) -> Result<(), ConversationError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> StepHandler for FnStep<F>
where
    F: Fn(&mut SharedState, Option<&str>) -> Result<(), ConversationError> + Send + Sync,
{
    async fn handle(
        &self,
        state: &mut SharedState,
        input: Option<&str>,
        _cancel: &CancellationToken,
    ) -> Result<(), ConversationError> {
        (self.0)(state, input)
    }
}

struct CollectionStep {
    name: String,
    description: String,
    handler: Arc<dyn StepHandler>,
}

struct TerminalStep {
    name: String,
    handler: Arc<dyn StepHandler>,
}

/// 会话定义（只读，可在多个会话间共享）
pub struct ConversationSpec {
    steps: Vec<CollectionStep>,
    terminal: TerminalStep,
    entry_points: HashMap<String, usize>,
}

impl ConversationSpec {
    pub fn builder() -> ConversationBuilder {
        ConversationBuilder::default()
    }

    /// 步骤总数 n（含终止步骤）
    pub fn len(&self) -> usize {
        self.steps.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// 采集步骤数 n - 1
    pub fn collection_len(&self) -> usize {
        self.steps.len()
    }

    pub fn entry_index(&self, name: &str) -> Option<usize> {
        self.entry_points.get(name).copied()
    }

    pub fn entry_names(&self) -> Vec<&str> {
        let mut names: Vec<(&str, usize)> = self.entry_points.iter().map(|(k, &v)| (k.as_str(), v)).collect();
        names.sort_by_key(|&(_, i)| i);
        names.into_iter().map(|(k, _)| k).collect()
    }
}

/// 显式构建：步骤、描述、入口均由调用方给出
#[derive(Default)]
pub struct ConversationBuilder {
    steps: Vec<CollectionStep>,
    entry_points: Vec<(String, usize)>,
}

impl ConversationBuilder {
    /// 添加采集步骤
    pub fn step(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl StepHandler + 'static,
    ) -> Self {
        self.steps.push(CollectionStep {
            name: name.into(),
            description: description.into(),
            handler: Arc::new(handler),
        });
        self
    }

    /// 添加采集步骤，并以 entry_key 作为指向它的入口
    pub fn entry_step(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        entry_key: impl Into<String>,
        handler: impl StepHandler + 'static,
    ) -> Self {
        self.entry_points.push((entry_key.into(), self.steps.len()));
        self.step(name, description, handler)
    }

    /// 显式入口：名称 -> 采集步骤下标
    pub fn entry_point(mut self, name: impl Into<String>, index: usize) -> Self {
        self.entry_points.push((name.into(), index));
        self
    }

    /// 添加终止步骤并校验入口
    pub fn finish(
        self,
        name: impl Into<String>,
        handler: impl StepHandler + 'static,
    ) -> Result<ConversationSpec, ConversationError> {
        let limit = self.steps.len();
        let mut entry_points = HashMap::new();
        for (name, index) in self.entry_points {
            if index >= limit {
                return Err(ConversationError::InvalidEntryPoint { name, index, limit });
            }
            if entry_points.insert(name.clone(), index).is_some() {
                return Err(ConversationError::DuplicateEntryPoint(name));
            }
        }
        Ok(ConversationSpec {
            steps: self.steps,
            terminal: TerminalStep {
                name: name.into(),
                handler: Arc::new(handler),
            },
            entry_points,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingEntry,
    Collecting(usize),
    Finalizing,
    Done,
}

/// 一次对话：独占共享状态
pub struct ConversationSession {
    spec: Arc<ConversationSpec>,
    state: SharedState,
    current_step: usize,
    phase: Phase,
    voice: Arc<dyn PersonaVoice>,
    max_input_attempts: usize,
    cancel_token: CancellationToken,
}

impl ConversationSession {
    pub fn new(spec: Arc<ConversationSpec>) -> Self {
        Self {
            spec,
            state: SharedState::new(),
            current_step: 0,
            phase: Phase::AwaitingEntry,
            voice: Arc::new(PlainVoice),
            max_input_attempts: DEFAULT_MAX_INPUT_ATTEMPTS,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn with_state(mut self, state: SharedState) -> Self {
        self.state = state;
        self
    }

    pub fn with_voice(mut self, voice: Arc<dyn PersonaVoice>) -> Self {
        self.voice = voice;
        self
    }

    pub fn with_max_input_attempts(mut self, attempts: usize) -> Self {
        self.max_input_attempts = attempts.max(1);
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SharedState {
        &mut self.state
    }

    pub fn into_state(self) -> SharedState {
        self.state
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn check_cancelled(&self) -> Result<(), ConversationError> {
        if self.cancel_token.is_cancelled() {
            Err(ConversationError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// 从命名入口开始，依次完成所有采集步骤并执行终止步骤
    pub async fn start(&mut self, entry: &str, input: &mut dyn InputSource) -> Result<(), ConversationError> {
        if self.phase == Phase::Done {
            return Err(ConversationError::SessionFinished);
        }
        let index = self
            .spec
            .entry_index(entry)
            .ok_or_else(|| ConversationError::UnknownEntryPoint(entry.to_string()))?;
        let count = self.spec.collection_len();
        tracing::info!(entry, index, steps = count, "conversation started");

        self.current_step = index;
        self.phase = Phase::Collecting(index);
        for _ in 0..count {
            self.process_step(input).await?;
            self.current_step = (self.current_step + 1) % count;
            self.phase = Phase::Collecting(self.current_step);
        }
        self.finalize().await
    }

    /// 执行当前采集步骤：展示（经人设改写的）描述、读一行输入、交给处理器；无效输入时重新提示
    pub async fn process_step(&mut self, input: &mut dyn InputSource) -> Result<(), ConversationError> {
        self.check_cancelled()?;
        let spec = self.spec.clone();
        let step = spec
            .steps
            .get(self.current_step)
            .ok_or(ConversationError::SessionFinished)?;
        let prompt = self.voice.transform(&step.description).await;

        for attempt in 1..=self.max_input_attempts {
            let line = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => return Err(ConversationError::Cancelled),
                r = input.read_line(&prompt) => r?,
            };
            match step.handler.handle(&mut self.state, Some(&line), &self.cancel_token).await {
                Ok(()) => {
                    tracing::info!(step = %step.name, input = %line, "step collected");
                    return Ok(());
                }
                Err(ConversationError::InvalidInput(reason)) => {
                    tracing::warn!(step = %step.name, attempt, %reason, "invalid input");
                    input.show(&reason).await?;
                }
                Err(e) => return Err(e),
            }
        }
        Err(ConversationError::TooManyAttempts {
            step: step.name.clone(),
            attempts: self.max_input_attempts,
        })
    }

    /// 跳过采集，直接执行终止步骤
    pub async fn jump_to_last(&mut self) -> Result<(), ConversationError> {
        if self.phase == Phase::Done {
            return Err(ConversationError::SessionFinished);
        }
        tracing::info!("jumping to terminal step");
        self.finalize().await
    }

    async fn finalize(&mut self) -> Result<(), ConversationError> {
        self.check_cancelled()?;
        self.phase = Phase::Finalizing;
        self.current_step = self.spec.collection_len();
        let spec = self.spec.clone();
        let terminal = &spec.terminal;
        tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => return Err(ConversationError::Cancelled),
            r = terminal.handler.handle(&mut self.state, None, &self.cancel_token) => r?,
        }
        tracing::info!(step = %terminal.name, "conversation finished");
        self.phase = Phase::Done;
        Ok(())
    }
}
