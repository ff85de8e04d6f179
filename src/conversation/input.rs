//! 用户输入来源：终端（stdin）或脚本化输入（测试）

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};

use crate::core::ConversationError;

/// 每步展示提示并读取一行输入
#[async_trait]
pub trait InputSource: Send {
    /// 展示 prompt 后读取一行（去掉行尾换行）；输入结束时返回 InputClosed
    async fn read_line(&mut self, prompt: &str) -> Result<String, ConversationError>;

    /// 展示一条提示信息（例如输入无效的原因）
    async fn show(&mut self, message: &str) -> Result<(), ConversationError>;
}

/// 终端输入
pub struct StdinInput {
    reader: BufReader<Stdin>,
}

impl StdinInput {
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
        }
    }
}

impl Default for StdinInput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InputSource for StdinInput {
    async fn read_line(&mut self, prompt: &str) -> Result<String, ConversationError> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(ConversationError::InputClosed);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    async fn show(&mut self, message: &str) -> Result<(), ConversationError> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(format!("{message}\n").as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }
}

/// 脚本化输入：按顺序给出预设行，并记录看到的提示与消息
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
    prompts: Vec<String>,
    messages: Vec<String>,
}

impl ScriptedInput {
    pub fn new<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> Self {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

#[async_trait]
impl InputSource for ScriptedInput {
    async fn read_line(&mut self, prompt: &str) -> Result<String, ConversationError> {
        self.prompts.push(prompt.to_string());
        self.lines.pop_front().ok_or(ConversationError::InputClosed)
    }

    async fn show(&mut self, message: &str) -> Result<(), ConversationError> {
        self.messages.push(message.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_input_records_and_closes() {
        let mut input = ScriptedInput::new(["Paris"]);
        assert_eq!(input.read_line("Where? ").await.unwrap(), "Paris");
        assert!(matches!(input.read_line("When? ").await, Err(ConversationError::InputClosed)));
        assert_eq!(input.prompts(), &["Where? ", "When? "]);
    }
}
