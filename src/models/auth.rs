// src/models/auth.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

// Signup body; the username doubles as the business tax code
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupPayload {
    #[validate(length(min = 3, message = "Tên đăng nhập phải có ít nhất 3 ký tự"))]
    #[schema(example = "0316316874")]
    pub username: String,

    #[validate(length(min = 6, message = "Mật khẩu phải có ít nhất 6 ký tự"))]
    #[schema(example = "cubable2025")]
    pub password: String,

    #[validate(length(min = 2, message = "Tên doanh nghiệp phải có ít nhất 2 ký tự"))]
    pub business_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SigninPayload {
    #[validate(length(min = 1, message = "Tên đăng nhập không được để trống"))]
    pub username: String,
    #[validate(length(min = 1, message = "Mật khẩu không được để trống"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordPayload {
    #[validate(length(min = 1, message = "Tên đăng nhập không được để trống"))]
    pub username: String,
    #[validate(length(min = 1, message = "Mật khẩu cũ không được để trống"))]
    pub old_password: String,
    #[validate(length(min = 6, message = "Mật khẩu mới phải có ít nhất 6 ký tự"))]
    pub new_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WorkspaceSummary {
    pub space_id: String,
    pub base_id: String,
    /// First 20 characters of the workspace token.
    pub access_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignupResponse {
    pub status: String,
    pub detail: String,
    pub account_id: String,
    pub business_name: String,
    pub taxcode: String,
    pub workspace: WorkspaceSummary,
    pub tables: BTreeMap<String, String>,
    pub upload_file_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SigninResponse {
    pub status: String,
    #[serde(rename = "accessToken")]
    pub access_token: String,
    pub detail: String,
    #[schema(value_type = Vec<Object>)]
    pub record: Vec<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChangePasswordResponse {
    pub status: String,
    pub detail: String,
    pub username: String,
}
