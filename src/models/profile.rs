// src/models/profile.rs

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{plan::parse_timestamp, tenant::TenantRow};

/// Profile timestamps are shown in Vietnam time.
const GMT7_SECONDS: i32 = 7 * 3600;

fn to_gmt7(raw: Option<&str>) -> Option<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(GMT7_SECONDS)?;
    parse_timestamp(raw).map(|dt| dt.with_timezone(&offset))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfile {
    pub username: String,
    pub business_name: String,
    pub current_plan_name: Option<String>,
    pub last_login: Option<DateTime<FixedOffset>>,
    pub time_expired: Option<DateTime<FixedOffset>>,
    pub tax_code: Option<String>,
    pub bank_name: Option<String>,
    pub bank_number: Option<String>,
    pub account_name: Option<String>,
}

impl From<&TenantRow> for UserProfile {
    fn from(row: &TenantRow) -> Self {
        let text = |key: &str| row.field(key).map(str::to_string);
        // lookup cells may arrive as one-element arrays
        let first_text = |key: &str| match row.record().fields.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Array(items)) => items.first().and_then(Value::as_str).map(str::to_string),
            _ => None,
        };
        Self {
            username: row.username().to_string(),
            business_name: text("business_name").unwrap_or_default(),
            current_plan_name: first_text("current_plan_name"),
            last_login: to_gmt7(row.field("last_login")),
            time_expired: to_gmt7(first_text("time_expired").as_deref()),
            tax_code: text("tax_code"),
            bank_name: text("bank_name"),
            bank_number: text("bank_number"),
            account_name: text("account_name"),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub status: String,
    pub message: String,
    pub data: UserProfile,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfilePayload {
    #[validate(length(min = 2, message = "Tên doanh nghiệp phải có ít nhất 2 ký tự"))]
    pub business_name: Option<String>,
    pub tax_code: Option<String>,
    pub bank_name: Option<String>,
    pub bank_number: Option<String>,
    pub account_name: Option<String>,
}

impl UpdateProfilePayload {
    /// Only the supplied fields, keyed by registry column.
    pub fn changed_fields(&self) -> serde_json::Map<String, Value> {
        [
            ("business_name", &self.business_name),
            ("tax_code", &self.tax_code),
            ("bank_name", &self.bank_name),
            ("bank_number", &self.bank_number),
            ("account_name", &self.account_name),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .map(|v| (key.to_string(), Value::from(v.as_str())))
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::teable::Record;
    use serde_json::json;

    #[test]
    fn last_login_is_converted_to_gmt7() {
        let record: Record = serde_json::from_value(json!({
            "id": "recTenant",
            "fields": {
                "username": "0316316874",
                "business_name": "Shop_0316316874",
                "last_login": "2025-06-01T20:30:00.000Z",
                "current_plan_name": ["Basic"],
            }
        }))
        .unwrap();
        let profile = UserProfile::from(&TenantRow::from(record));
        let last_login = profile.last_login.unwrap();
        assert_eq!(last_login.offset().local_minus_utc(), GMT7_SECONDS);
        assert_eq!(last_login.to_rfc3339(), "2025-06-02T03:30:00+07:00");
        assert_eq!(profile.current_plan_name.as_deref(), Some("Basic"));
    }

    #[test]
    fn changed_fields_skips_absent_values() {
        let payload = UpdateProfilePayload {
            bank_name: Some("Vietcombank".into()),
            ..Default::default()
        };
        let fields = payload.changed_fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["bank_name"], "Vietcombank");
    }
}
