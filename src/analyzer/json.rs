use itertools::Itertools;
use serde_json::Value;

use crate::analyzer::{PayloadAnalyzer, PayloadStructure};
use crate::error::{Error, Result};
use crate::websocket::Payload;

/// Number of array elements / object entries shown in a leaf name.
const LEAF_NAME_ITEMS: usize = 3;

/// Recognises JSON documents: objects, arrays and bare scalars.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAnalyzer;

impl JsonAnalyzer {
    pub const NAME: &'static str = "json";

    fn parse(payload: &Payload) -> Result<Value> {
        let text = payload.as_text().ok_or_else(|| Error::Analysis {
            format: Self::NAME,
            reason: "payload is not valid UTF-8".to_string(),
        })?;
        serde_json::from_str(text.trim()).map_err(|e| Error::Analysis {
            format: Self::NAME,
            reason: e.to_string(),
        })
    }
}

impl PayloadAnalyzer for JsonAnalyzer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn recognizer(&self, payload: &Payload) -> bool {
        Self::parse(payload).is_ok()
    }

    fn payload_structure(&self, payload: &Payload) -> Result<PayloadStructure> {
        Self::parse(payload).map(PayloadStructure::Json)
    }

    fn leaf_name(&self, structure: &PayloadStructure) -> String {
        match structure {
            PayloadStructure::Json(value) => value_label(value),
        }
    }
}

fn scalar_label(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("null".to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn nested_label(value: &Value) -> String {
    match value {
        Value::Array(_) => "[..]".to_string(),
        Value::Object(_) => "{..}".to_string(),
        scalar => scalar_label(scalar).unwrap_or_default(),
    }
}

fn value_label(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let shown = items.iter().take(LEAF_NAME_ITEMS).map(nested_label).join(", ");
            let more = if items.len() > LEAF_NAME_ITEMS { ", ..." } else { "" };
            format!("[{}{}]", shown, more)
        }
        Value::Object(entries) => {
            let shown = entries
                .iter()
                .take(LEAF_NAME_ITEMS)
                .map(|(key, value)| format!("{}: {}", key, nested_label(value)))
                .join(", ");
            let more = if entries.len() > LEAF_NAME_ITEMS { ", ..." } else { "" };
            format!("{{{}{}}}", shown, more)
        }
        scalar => scalar_label(scalar).unwrap_or_default(),
    }
}

/// Shape of a JSON value: types and keys, no scalar values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JsonShape {
    Null,
    Bool,
    Number,
    String,
    Array(Vec<JsonShape>),
    Object(Vec<(String, JsonShape)>),
}

impl JsonShape {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonShape::Null,
            Value::Bool(_) => JsonShape::Bool,
            Value::Number(_) => JsonShape::Number,
            Value::String(_) => JsonShape::String,
            Value::Array(items) => JsonShape::Array(items.iter().map(JsonShape::of).collect()),
            Value::Object(entries) => JsonShape::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), JsonShape::of(value)))
                    .collect(),
            ),
        }
    }
}
