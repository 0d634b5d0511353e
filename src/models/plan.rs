// src/models/plan.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::teable::Record;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PlanStatusPayload {
    #[validate(length(min = 1, message = "Thiếu plan_status_id"))]
    pub plan_status_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LinkedTitle {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[allow(non_snake_case)]
#[derive(Debug, Serialize, ToSchema)]
pub struct PlanStatusFields {
    pub Nhan: Option<i64>,
    pub So: Option<LinkedTitle>,
    pub started_time: Option<DateTime<Utc>>,
    pub cycle: Option<i64>,
    pub time_expired: Option<DateTime<Utc>>,
    pub Ngay: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub credit_value: Option<i64>,
    pub Tai_khoan: Option<LinkedTitle>,
    pub name_plan: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanStatusData {
    pub id: String,
    pub name: String,
    pub auto_number: i64,
    pub created_time: Option<DateTime<Utc>>,
    pub last_modified_time: Option<DateTime<Utc>>,
    pub created_by: String,
    pub last_modified_by: String,
    pub fields: PlanStatusFields,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlanStatusResponse {
    pub status: String,
    pub message: String,
    pub data: PlanStatusData,
}

pub(crate) fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw?)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn linked(value: Option<&Value>) -> Option<LinkedTitle> {
    let value = match value? {
        Value::Array(items) => items.first()?,
        other => other,
    };
    serde_json::from_value(value.clone()).ok()
}

impl From<&Record> for PlanStatusData {
    fn from(record: &Record) -> Self {
        let f = &record.fields;
        let int = |key: &str| record.number(key).map(|n| n as i64);
        let text = |key: &str| record.text(key).map(str::to_string);
        let date = |key: &str| parse_timestamp(f.get(key).and_then(Value::as_str));
        Self {
            id: record.id.clone(),
            name: record.name.clone().unwrap_or_default(),
            auto_number: record.auto_number.unwrap_or_default(),
            created_time: parse_timestamp(record.created_time.as_deref()),
            last_modified_time: parse_timestamp(record.last_modified_time.as_deref()),
            created_by: record.created_by.clone().unwrap_or_default(),
            last_modified_by: record.last_modified_by.clone().unwrap_or_default(),
            fields: PlanStatusFields {
                Nhan: int("Nhan"),
                So: linked(f.get("So")),
                started_time: date("started_time"),
                cycle: int("cycle"),
                time_expired: date("time_expired"),
                Ngay: date("Ngay"),
                status: text("status"),
                credit_value: int("credit_value"),
                Tai_khoan: linked(f.get("Tai_khoan")),
                name_plan: text("name_plan"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plan_record_maps_links_and_dates() {
        let record: Record = serde_json::from_value(json!({
            "id": "recPlan",
            "name": "Gói cơ bản",
            "autoNumber": 3,
            "createdTime": "2025-01-02T03:04:05.000Z",
            "fields": {
                "credit_value": 42,
                "So": { "id": "recSo", "title": "S1" },
                "Tai_khoan": [{ "id": "recAcc", "title": "0316316874" }],
                "time_expired": "2026-01-01T00:00:00.000Z",
                "name_plan": "Basic",
            }
        }))
        .unwrap();

        let data = PlanStatusData::from(&record);
        assert_eq!(data.auto_number, 3);
        assert_eq!(data.fields.credit_value, Some(42));
        assert_eq!(data.fields.So.as_ref().unwrap().title, "S1");
        assert_eq!(data.fields.Tai_khoan.as_ref().unwrap().id, "recAcc");
        assert!(data.fields.time_expired.is_some());
        assert!(data.created_time.is_some());
        assert!(data.fields.Ngay.is_none());
    }
}
