//! 会话共享状态：键 -> JSON 值，由各步骤处理器读写

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SharedState {
    values: BTreeMap<String, Value>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置若干键（值为 null）
    pub fn with_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            values: keys.into_iter().map(|k| (k.to_string(), Value::Null)).collect(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// 有意义的值：非 null、非空白字符串（数字一律视为已设置，包括 0）
    pub fn is_set(&self, key: &str) -> bool {
        match self.values.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.values.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_set_semantics() {
        let mut state = SharedState::with_keys(["destination", "adults", "children", "notes"]);
        assert!(!state.is_set("destination"));
        state.set("destination", "Lisbon");
        state.set("adults", 2);
        state.set("children", 0);
        state.set("notes", "  ");
        assert!(state.is_set("destination"));
        assert!(state.is_set("adults"));
        assert!(state.is_set("children"));
        assert!(!state.is_set("notes"));
        assert!(!state.is_set("missing"));
        assert_eq!(state.len(), 4);
    }

    #[test]
    fn test_to_json() {
        let mut state = SharedState::new();
        state.set("dates", "2024-07-01 to 2024-07-05");
        assert_eq!(state.to_json(), json!({"dates": "2024-07-01 to 2024-07-05"}));
        assert_eq!(serde_json::to_value(&state).unwrap(), state.to_json());
    }
}
