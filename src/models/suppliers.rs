// src/models/suppliers.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierPayload {
    #[validate(length(min = 1, message = "Tên nhà cung cấp không được để trống"))]
    pub supplier_name: String,
    pub address: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateSupplierResponse {
    pub status: String,
    pub detail: String,
    pub supplier_id: String,
    pub supplier_name: String,
    pub address: String,
}
