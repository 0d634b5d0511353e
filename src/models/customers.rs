// src/models/customers.rs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::teable::Record;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCustomerPayload {
    #[validate(length(min = 1, message = "Số điện thoại không được để trống"))]
    #[schema(example = "0901234567")]
    pub phone_number: String,

    #[validate(length(min = 1, message = "Họ tên không được để trống"))]
    #[schema(example = "Nguyễn Văn An")]
    pub fullname: String,

    pub address: Option<String>,

    #[validate(email(message = "Email không hợp lệ"))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct FindCustomersQuery {
    pub name: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

pub(crate) fn default_limit() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustomerData {
    pub customer_id: String,
    pub phone_number: String,
    pub fullname: String,
    pub address: String,
    pub email: String,
}

impl From<&Record> for CustomerData {
    fn from(record: &Record) -> Self {
        Self {
            customer_id: record.id.clone(),
            phone_number: record.text_or_default("phone_number"),
            fullname: record.text_or_default("fullname"),
            address: record.text_or_default("address"),
            email: record.text_or_default("email"),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateCustomerResponse {
    pub status: String,
    pub detail: String,
    pub customer_id: String,
    pub customer_data: CustomerData,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FindCustomersResponse {
    pub status: String,
    pub detail: String,
    pub customers: Vec<CustomerData>,
    pub total_found: usize,
}
