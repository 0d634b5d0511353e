// src/models/unit_conversions.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::validation::{non_negative, vat_percent},
    models::teable::Record,
};

fn default_vat() -> Decimal {
    Decimal::TEN
}

/// One packaging unit of a product. `vat` is a percentage.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UnitConversionPayload {
    #[validate(length(min = 1, message = "Tên đơn vị không được để trống"))]
    #[schema(example = "Thùng")]
    pub name_unit: String,

    #[validate(custom(function = "non_negative"))]
    #[schema(value_type = f64, example = 24)]
    pub conversion_factor: Decimal,

    #[schema(example = "Lon")]
    pub unit_default: String,

    #[serde(default)]
    #[validate(custom(function = "non_negative"))]
    #[schema(value_type = f64)]
    pub price: Decimal,

    #[serde(default = "default_vat")]
    #[validate(custom(function = "vat_percent"))]
    #[schema(value_type = f64, example = 10)]
    pub vat: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UnitConversionData {
    pub unit_conversion_id: String,
    pub name_unit: String,
    #[schema(value_type = f64)]
    pub conversion_factor: Decimal,
    pub unit_default: String,
    #[schema(value_type = f64)]
    pub price: Decimal,
    /// Percentage.
    #[schema(value_type = f64)]
    pub vat: Decimal,
}

impl From<&Record> for UnitConversionData {
    fn from(record: &Record) -> Self {
        let decimal = |key: &str| {
            record
                .number(key)
                .and_then(|n| Decimal::try_from(n).ok())
                .unwrap_or_default()
                .normalize()
        };
        Self {
            unit_conversion_id: record.id.clone(),
            name_unit: record.text_or_default("name_unit"),
            conversion_factor: decimal("conversion_factor"),
            unit_default: record.text_or_default("unit_default"),
            price: decimal("price"),
            // stored as a fraction
            vat: (decimal("vat_rate") * Decimal::ONE_HUNDRED).normalize(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateUnitConversionResponse {
    pub status: String,
    pub detail: String,
    pub unit_conversion_id: String,
    pub unit_conversion_data: UnitConversionData,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListUnitConversionsResponse {
    pub status: String,
    pub detail: String,
    pub unit_conversions: Vec<UnitConversionData>,
    pub total_found: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;
    use serde_json::json;

    #[test]
    fn stored_fraction_is_reported_as_percent() {
        let record: Record = serde_json::from_value(json!({
            "id": "recUnit",
            "fields": {
                "name_unit": "Thùng",
                "conversion_factor": 24,
                "unit_default": "Lon",
                "price": 240000,
                "vat_rate": 0.1,
            }
        }))
        .unwrap();
        let data = UnitConversionData::from(&record);
        assert_eq!(data.vat, dec!(10));
        assert_eq!(data.conversion_factor, dec!(24));
    }

    #[test]
    fn payload_defaults_vat_to_ten_percent() {
        let payload: UnitConversionPayload = serde_json::from_value(json!({
            "name_unit": "Lon",
            "conversion_factor": 1,
            "unit_default": "Lon",
        }))
        .unwrap();
        assert_eq!(payload.vat, dec!(10));
        assert_eq!(payload.price, Decimal::ZERO);
        assert!(payload.validate().is_ok());
    }
}
