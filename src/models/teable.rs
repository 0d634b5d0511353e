// src/models/teable.rs
//
// Wire shapes of the Teable REST API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Fields = serde_json::Map<String, Value>;

/// Field map of a `json!({...})` literal; anything but an object yields an empty map.
pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_number: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
}

impl Record {
    /// Non-empty string value of a field.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn text_or_default(&self, key: &str) -> String {
        self.text(key).unwrap_or_default().to_string()
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.fields.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text or numeric cell rendered as a string, as auto-number codes come back either way.
    pub fn code(&self, key: &str) -> String {
        match self.fields.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(i) => i.to_string(),
                None => n.to_string(),
            },
            _ => String::new(),
        }
    }

    /// First linked record id. Link cells come back as `{id, title}` or `[{id, title}]`.
    pub fn link_id(&self, key: &str) -> Option<&str> {
        link_ids(self.fields.get(key)?).into_iter().next()
    }

    pub fn link_ids(&self, key: &str) -> Vec<String> {
        self.fields
            .get(key)
            .map(|v| link_ids(v).into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

fn link_ids(value: &Value) -> Vec<&str> {
    match value {
        Value::String(id) => vec![id.as_str()],
        Value::Object(obj) => obj.get("id").and_then(Value::as_str).into_iter().collect(),
        Value::Array(items) => items.iter().flat_map(link_ids).collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordList {
    #[serde(default)]
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub db_field_name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

impl FieldInfo {
    /// Target table of a link field.
    pub fn link_target(&self) -> Option<&str> {
        if self.kind != "link" {
            return None;
        }
        self.options.as_ref()?.get("foreignTableId")?.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTable {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_table_name: Option<String>,
    pub description: String,
    pub icon: String,
    pub field_key_type: &'static str,
    pub fields: Vec<NewField>,
    pub records: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewField {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub db_field_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_lookup: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_options: Option<LookupOptions>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LookupOptions {
    pub foreign_table_id: String,
    pub link_field_id: String,
    pub lookup_field_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenRequest {
    pub name: String,
    pub description: String,
    pub scopes: Vec<&'static str>,
    pub expired_time: String,
    pub space_ids: Vec<String>,
    pub base_ids: Option<Vec<String>>,
    pub has_full_access: bool,
}

#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}
