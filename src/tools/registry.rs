//! 工具注册表（tool catalog）
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），
//! ToolRegistry 按注册顺序保存并按名查找；同名工具注册失败，保证目录内名称唯一。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::AgentError;
use crate::llm::FunctionSpec;

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 为 JSON）
///
/// 失败约定：execute 返回 Err(描述) 而不是 panic；Agent 循环把它当作一条观察结果继续。
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（函数调用中的 name）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema（供 LLM 生成正确的参数格式）
    /// 默认返回空对象，表示无参数
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 执行工具：文本结果用 Value::String，结构化结果直接返回 JSON
    async fn execute(&self, args: Value) -> Result<Value, String>;

    fn function_spec(&self) -> FunctionSpec {
        FunctionSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// 工具目录：保持注册顺序，名称唯一
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), AgentError> {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), AgentError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(AgentError::DuplicateTool(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// 返回 (name, description) 列表
    pub fn tool_descriptions(&self) -> Vec<(String, String)> {
        self.tools
            .iter()
            .map(|t| (t.name().to_string(), t.description().to_string()))
            .collect()
    }

    /// 按注册顺序生成函数列表
    pub fn function_specs(&self) -> Vec<FunctionSpec> {
        self.tools.iter().map(|t| t.function_spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl Tool for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test tool"
        }

        async fn execute(&self, _args: Value) -> Result<Value, String> {
            Ok(Value::String(self.0.to_string()))
        }
    }

    #[test]
    fn test_register_keeps_order() {
        let mut reg = ToolRegistry::new();
        reg.register(Named("ticketmaster_events")).unwrap();
        reg.register(Named("amadeus_hotel_list")).unwrap();
        reg.register(Named("location_coordinates")).unwrap();
        assert_eq!(
            reg.tool_names(),
            vec!["ticketmaster_events", "amadeus_hotel_list", "location_coordinates"]
        );
        let specs = reg.function_specs();
        assert_eq!(specs[1].name, "amadeus_hotel_list");
        assert_eq!(specs[1].parameters["type"], "object");
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut reg = ToolRegistry::new();
        reg.register(Named("free_busy")).unwrap();
        let err = reg.register(Named("free_busy")).unwrap_err();
        assert!(matches!(err, AgentError::DuplicateTool(n) if n == "free_busy"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_get_unknown_is_none() {
        let reg = ToolRegistry::new();
        assert!(reg.get("nope").is_none());
        assert!(reg.is_empty());
    }
}
