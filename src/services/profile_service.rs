// src/services/profile_service.rs

use validator::Validate;

use crate::{
    common::error::AppError,
    db::TenantRepository,
    models::{
        profile::{ProfileResponse, UpdateProfilePayload, UserProfile},
        tenant::TenantRow,
    },
};

#[derive(Clone)]
pub struct ProfileService {
    tenants: TenantRepository,
}

impl ProfileService {
    pub fn new(tenants: TenantRepository) -> Self {
        Self { tenants }
    }

    pub fn me(&self, tenant: &TenantRow) -> ProfileResponse {
        ProfileResponse {
            status: "success".into(),
            message: "Lấy thông tin người dùng thành công".into(),
            data: UserProfile::from(tenant),
        }
    }

    /// Writes only the supplied business fields back to the registry row.
    pub async fn update(
        &self,
        tenant: &TenantRow,
        payload: UpdateProfilePayload,
    ) -> Result<ProfileResponse, AppError> {
        payload.validate()?;
        let changed = payload.changed_fields();
        if changed.is_empty() {
            return Ok(ProfileResponse {
                status: "success".into(),
                message: "Không có thông tin nào được cập nhật".into(),
                data: UserProfile::from(tenant),
            });
        }

        let keys: Vec<String> = changed.keys().cloned().collect();
        let updated = self
            .tenants
            .update_fields(tenant.id(), changed)
            .await
            .map_err(|e| AppError::store("Không thể cập nhật thông tin người dùng", e))?;
        tracing::info!("Profile of {} updated: {}", tenant.username(), keys.join(", "));

        Ok(ProfileResponse {
            status: "success".into(),
            message: "Cập nhật thông tin thành công".into(),
            data: UserProfile::from(&updated),
        })
    }
}
