//! Schema 生成（schemars）：工具参数 Schema 与最终输出 Schema
//!
//! 工具参数由带 serde 默认值的参数结构体派生；OutputSchema 描述最终答案必须恰好填满的字段集合，
//! 同时作为一个函数暴露给模型（调用它即视为给出最终答案）。

use std::collections::BTreeSet;

use schemars::gen::SchemaSettings;
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::AgentError;
use crate::llm::FunctionSpec;

/// 生成内联（无 $ref）的根 Schema，便于直接作为函数参数发送
fn root_schema_for<T: JsonSchema>() -> RootSchema {
    SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
        })
        .into_generator()
        .into_root_schema_for::<T>()
}

/// 将根 Schema 转为函数 parameters（去掉 title / $schema）
fn to_parameters(root: &RootSchema) -> Value {
    let mut value = serde_json::to_value(&root.schema).unwrap_or_else(|_| serde_json::json!({}));
    if let Value::Object(map) = &mut value {
        map.remove("title");
        map.remove("$schema");
        map.remove("definitions");
    }
    value
}

/// 工具参数 Schema：由参数结构体派生
pub fn parameters_for<T: JsonSchema>() -> Value {
    to_parameters(&root_schema_for::<T>())
}

/// 解析工具参数；null 视为空对象，从而使用 serde 默认值
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, String> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| format!("Invalid arguments: {e}"))
}

/// 最终输出 Schema：名称 + 有序字段集合 + JSON Schema
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    name: String,
    description: String,
    parameters: Value,
    fields: Vec<String>,
}

impl OutputSchema {
    /// 由 Rust 类型派生（名称取类型名，描述取文档注释）
    pub fn of<T: JsonSchema>() -> Self {
        let root = root_schema_for::<T>();
        let metadata = root.schema.metadata.as_deref();
        let name = metadata
            .and_then(|m| m.title.clone())
            .unwrap_or_else(T::schema_name);
        let description = metadata
            .and_then(|m| m.description.clone())
            .unwrap_or_else(|| format!("Final answer in the {name} format"));
        let fields = root
            .schema
            .object
            .as_deref()
            .map(|o| o.properties.keys().cloned().collect())
            .unwrap_or_default();
        Self {
            name,
            description,
            parameters: to_parameters(&root),
            fields,
        }
    }

    /// 手工构造：字段集合取 parameters.properties 的键
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        let fields = parameters
            .get("properties")
            .and_then(|p| p.as_object())
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default();
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    pub fn function_spec(&self) -> FunctionSpec {
        FunctionSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }

    /// 校验最终答案：必须是对象，且键集合与声明字段完全一致
    pub fn validate(&self, answer: &Value) -> Result<(), AgentError> {
        let declared: BTreeSet<&str> = self.fields.iter().map(String::as_str).collect();
        let present: BTreeSet<&str> = match answer {
            Value::Object(map) => map.keys().map(String::as_str).collect(),
            _ => BTreeSet::new(),
        };
        let missing: Vec<String> = declared.difference(&present).map(|s| s.to_string()).collect();
        let extra: Vec<String> = present.difference(&declared).map(|s| s.to_string()).collect();
        if answer.is_object() && missing.is_empty() && extra.is_empty() {
            Ok(())
        } else {
            Err(AgentError::SchemaMismatch {
                schema: self.name.clone(),
                missing,
                extra,
            })
        }
    }
}
