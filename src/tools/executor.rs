//! 工具执行器
//!
//! 对每次调用施加超时，结果统一转为观察字符串；超时或失败时返回 AgentError（ToolTimeout / ToolExecutionFailed），
//! 由 Agent 循环决定吸收为观察结果。每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::time::timeout;

use crate::core::AgentError;
use crate::tools::Tool;

/// 工具执行器：只负责超时与审计，工具目录由每次请求提供
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 执行工具；成功时返回观察文本（字符串原样，其它 JSON 紧凑序列化）
    pub async fn execute(&self, tool: &dyn Tool, args: Value) -> Result<String, AgentError> {
        let start = Instant::now();
        let args_preview = args_preview(&args);
        let result = timeout(self.timeout, tool.execute(args)).await;

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool.name(),
            "ok": ok,
            "outcome": outcome,
            "duration_ms": duration_ms,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(Ok(value)) => Ok(observation_text(value)),
            Ok(Err(e)) => Err(AgentError::ToolExecutionFailed(format!("{}: {}", tool.name(), e))),
            Err(_) => Err(AgentError::ToolTimeout(tool.name().to_string())),
        }
    }
}

fn observation_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
