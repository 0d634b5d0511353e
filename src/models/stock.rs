// src/models/stock.rs
//
// Import slips (stock in) and delivery notes (stock out).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::validation::{non_negative, vat_percent},
    services::totals::PricedLine,
};

fn default_vat() -> Decimal {
    Decimal::TEN
}

/// Choices of the import slip's "Loại nhập" select field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum ImportType {
    #[default]
    #[serde(rename = "Nhập mua")]
    Purchase,
    #[serde(rename = "Nhập trả")]
    Return,
    #[serde(rename = "Nhập điều chuyển")]
    Transfer,
}

impl ImportType {
    pub const LABELS: &'static [&'static str] = &["Nhập mua", "Nhập trả", "Nhập điều chuyển"];
}

/// Choices of the delivery note's "Loại xuất" select field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum DeliveryType {
    #[default]
    #[serde(rename = "Xuất bán")]
    Sale,
    #[serde(rename = "Xuất trả")]
    Return,
    #[serde(rename = "Xuất mượn")]
    Loan,
}

impl DeliveryType {
    pub const LABELS: &'static [&'static str] = &["Xuất bán", "Xuất trả", "Xuất mượn"];
}

// =============================================================================
//  IMPORT SLIPS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ImportSlipLine {
    #[validate(length(min = 1))]
    pub product_id: String,
    #[validate(length(min = 1))]
    pub unit_conversions_id: String,
    #[validate(custom(function = "non_negative"))]
    #[schema(value_type = f64)]
    pub quantity: Decimal,
    #[validate(custom(function = "non_negative"))]
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
    #[serde(default = "default_vat")]
    #[validate(custom(function = "vat_percent"))]
    #[schema(value_type = f64, example = 10)]
    pub vat: Decimal,
}

impl PricedLine for ImportSlipLine {
    fn unit_price(&self) -> Decimal {
        self.unit_price
    }
    fn quantity(&self) -> Decimal {
        self.quantity
    }
    fn vat(&self) -> Decimal {
        self.vat
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateImportSlipPayload {
    #[validate(length(min = 1, message = "Thiếu mã nhà cung cấp"))]
    pub supplier_id: String,

    #[serde(default)]
    pub import_type: ImportType,

    #[validate(length(min = 1, message = "Phiếu nhập phải có ít nhất một dòng"), nested)]
    pub import_slip_details: Vec<ImportSlipLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportSlipResponse {
    pub status: String,
    pub detail: String,
    pub import_slip_id: String,
    pub import_slip_code: String,
    pub import_slip_details_ids: Vec<String>,
    pub total_items: usize,
    #[schema(value_type = f64)]
    pub total_amount: Decimal,
}

// =============================================================================
//  DELIVERY NOTES
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct DeliveryNoteLine {
    #[validate(length(min = 1))]
    pub product_id: String,
    pub unit_conversions_id: Option<String>,
    #[validate(custom(function = "non_negative"))]
    #[schema(value_type = f64)]
    pub quantity: Decimal,
    #[validate(custom(function = "non_negative"))]
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
    #[serde(default = "default_vat")]
    #[validate(custom(function = "vat_percent"))]
    #[schema(value_type = f64, example = 10)]
    pub vat: Decimal,
}

impl PricedLine for DeliveryNoteLine {
    fn unit_price(&self) -> Decimal {
        self.unit_price
    }
    fn quantity(&self) -> Decimal {
        self.quantity
    }
    fn vat(&self) -> Decimal {
        self.vat
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDeliveryNotePayload {
    #[validate(length(min = 1, message = "Thiếu mã đơn hàng"))]
    pub order_id: String,

    #[validate(length(min = 1, message = "Thiếu mã khách hàng"))]
    pub customer_id: String,

    #[serde(default)]
    pub delivery_type: DeliveryType,

    #[validate(length(min = 1, message = "Phiếu xuất phải có ít nhất một dòng"), nested)]
    pub delivery_note_details: Vec<DeliveryNoteLine>,

    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryNoteResponse {
    pub status: String,
    pub detail: String,
    pub delivery_note_id: String,
    pub delivery_note_code: String,
    pub delivery_note_details_ids: Vec<String>,
    pub order_id: String,
    pub customer_id: String,
    pub total_items: usize,
    #[schema(value_type = f64)]
    pub total_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn types_use_their_vietnamese_labels() {
        let labels: Vec<String> = [ImportType::Purchase, ImportType::Return, ImportType::Transfer]
            .iter()
            .map(|t| serde_json::to_value(t).unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(labels, ImportType::LABELS);

        let labels: Vec<String> = [DeliveryType::Sale, DeliveryType::Return, DeliveryType::Loan]
            .iter()
            .map(|t| serde_json::to_value(t).unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(labels, DeliveryType::LABELS);
    }

    #[test]
    fn unknown_import_type_is_rejected() {
        let body = json!({
            "supplier_id": "recSupplier",
            "import_type": "Nhập bừa",
            "import_slip_details": [],
        });
        assert!(serde_json::from_value::<CreateImportSlipPayload>(body).is_err());
    }

    #[test]
    fn missing_types_default_to_purchase_and_sale() {
        let slip: CreateImportSlipPayload = serde_json::from_value(json!({
            "supplier_id": "recSupplier",
            "import_slip_details": [],
        }))
        .unwrap();
        assert_eq!(slip.import_type, ImportType::Purchase);

        let note: CreateDeliveryNotePayload = serde_json::from_value(json!({
            "order_id": "recOrder",
            "customer_id": "recCustomer",
            "delivery_type": "Xuất mượn",
            "delivery_note_details": [],
        }))
        .unwrap();
        assert_eq!(note.delivery_type, DeliveryType::Loan);

        let bad = json!({
            "order_id": "recOrder",
            "customer_id": "recCustomer",
            "delivery_type": "Xuất bừa",
            "delivery_note_details": [],
        });
        assert!(serde_json::from_value::<CreateDeliveryNotePayload>(bad).is_err());
    }

    #[test]
    fn slip_lines_are_validated_as_a_list_and_one_by_one() {
        let empty: CreateImportSlipPayload = serde_json::from_value(json!({
            "supplier_id": "recSupplier",
            "import_slip_details": [],
        }))
        .unwrap();
        let errors = empty.validate().unwrap_err();
        assert!(errors.errors().contains_key("import_slip_details"));

        let negative: CreateImportSlipPayload = serde_json::from_value(json!({
            "supplier_id": "recSupplier",
            "import_slip_details": [{
                "product_id": "recProduct",
                "unit_conversions_id": "recUnit",
                "quantity": -1,
                "unit_price": 1000,
            }],
        }))
        .unwrap();
        let errors = negative.validate().unwrap_err();
        assert!(errors.errors().contains_key("import_slip_details"));
        assert_eq!(negative.import_slip_details[0].vat, default_vat());
    }
}
