// src/models/orders.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::validation::{non_negative, vat_percent},
    models::stock::DeliveryType,
    services::totals::PricedLine,
};

pub const BANK_TRANSFER: &str = "Chuyển khoản";
pub const UNPAID_STATUS: &str = "Chưa Thanh Toán";

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderLine {
    #[validate(length(min = 1))]
    pub product_id: String,

    #[validate(length(min = 1))]
    pub unit_conversions_id: String,

    #[validate(custom(function = "non_negative"))]
    #[schema(value_type = f64, example = 15000000)]
    pub unit_price: Decimal,

    #[validate(custom(function = "non_negative"))]
    #[schema(value_type = f64, example = 2)]
    pub quantity: Decimal,

    #[validate(custom(function = "vat_percent"))]
    #[schema(value_type = f64, example = 10)]
    pub vat: Decimal,
}

impl PricedLine for OrderLine {
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
pub struct CreateOrderPayload {
    #[validate(length(min = 1, message = "Thiếu mã khách hàng"))]
    pub customer_id: String,

    #[validate(length(min = 1, message = "Đơn hàng phải có ít nhất một dòng"), nested)]
    pub order_details: Vec<OrderLine>,

    #[serde(default)]
    pub delivery_type: DeliveryType,

    pub payment_method: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateOrderResponse {
    pub status: String,
    pub detail: String,
    pub order_id: String,
    pub order_code: String,
    pub delivery_note_id: String,
    pub delivery_note_code: String,
    pub customer_id: String,
    pub total_items: usize,
    #[schema(value_type = f64)]
    pub total_temp: Decimal,
    #[schema(value_type = f64)]
    pub total_vat: Decimal,
    #[schema(value_type = f64)]
    pub total_after_vat: Decimal,
}
