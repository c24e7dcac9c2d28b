use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// A single node of a template document tree.
///
/// The shape is deliberately narrower than general JSON: there is no
/// boolean tag and no number tag. Booleans travel as the exact strings
/// `"true"` and `"false"`, numbers as their decimal text, which keeps
/// every scalar comparison a plain string comparison. Object entries
/// preserve insertion order so a document survives a
/// parse/evaluate/serialize round trip without reshuffling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TemplateValue {
    #[default]
    Null,
    Text(String),
    Array(Vec<TemplateValue>),
    Object(IndexMap<String, TemplateValue>),
}

impl TemplateValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TemplateValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TemplateValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[TemplateValue]> {
        match self {
            TemplateValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, TemplateValue>> {
        match self {
            TemplateValue::Object(entries) => Some(entries),
            _ => None,
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(text: &str) -> Self {
        TemplateValue::Text(text.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(text: String) -> Self {
        TemplateValue::Text(text)
    }
}

impl From<bool> for TemplateValue {
    fn from(value: bool) -> Self {
        // The sole boolean encoding in a document tree.
        TemplateValue::Text(if value { "true" } else { "false" }.to_string())
    }
}

impl From<Vec<TemplateValue>> for TemplateValue {
    fn from(items: Vec<TemplateValue>) -> Self {
        TemplateValue::Array(items)
    }
}

impl From<serde_json::Value> for TemplateValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => TemplateValue::Null,
            serde_json::Value::Bool(flag) => TemplateValue::from(flag),
            serde_json::Value::Number(number) => TemplateValue::Text(number.to_string()),
            serde_json::Value::String(text) => TemplateValue::Text(text),
            serde_json::Value::Array(items) => {
                TemplateValue::Array(items.into_iter().map(TemplateValue::from).collect())
            }
            serde_json::Value::Object(entries) => TemplateValue::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, TemplateValue::from(value)))
                    .collect(),
            ),
        }
    }
}

impl<'de> Deserialize<'de> for TemplateValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Funnel through serde_json so booleans and numbers fold into
        // the text encoding at the parse boundary.
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(TemplateValue::from(raw))
    }
}

impl fmt::Display for TemplateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}
