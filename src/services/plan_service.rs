// src/services/plan_service.rs

use validator::Validate;

use crate::{
    common::error::AppError,
    db::PlanStatusRepository,
    models::{
        plan::{PlanStatusData, PlanStatusPayload, PlanStatusResponse},
        tenant::TenantRow,
    },
};

#[derive(Clone)]
pub struct PlanService {
    plans: PlanStatusRepository,
}

impl PlanService {
    pub fn new(plans: PlanStatusRepository) -> Self {
        Self { plans }
    }

    pub async fn get_status(
        &self,
        payload: PlanStatusPayload,
    ) -> Result<PlanStatusResponse, AppError> {
        payload.validate()?;
        let record = self
            .plans
            .get(&payload.plan_status_id)
            .await
            .map_err(|e| AppError::store("Không thể lấy thông tin plan status", e))?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Không tìm thấy plan status với ID: {}",
                    payload.plan_status_id
                ))
            })?;

        Ok(PlanStatusResponse {
            status: "success".into(),
            message: "Lấy thông tin plan status thành công".into(),
            data: PlanStatusData::from(&record),
        })
    }

    /// Takes one credit from the tenant's plan. Never fails the caller; `false` when nothing
    /// was taken.
    pub async fn consume_credit(&self, tenant: &TenantRow) -> bool {
        let Some(plan_id) = tenant.plan_id() else {
            tracing::warn!("Tenant {} has no current_plan, credit not consumed", tenant.username());
            return false;
        };

        let record = match self.plans.get(plan_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!("Plan status {} not found, credit not consumed", plan_id);
                return false;
            }
            Err(e) => {
                tracing::warn!("Could not read plan status {}: {}", plan_id, e);
                return false;
            }
        };

        let credit = record.number("credit_value").unwrap_or_default() as i64;
        if credit <= 0 {
            tracing::info!("Plan {} has no credit left", plan_id);
            return false;
        }

        match self.plans.set_credit(plan_id, credit - 1).await {
            Ok(()) => {
                tracing::info!("Credit consumed on plan {}: {} -> {}", plan_id, credit, credit - 1);
                true
            }
            Err(e) => {
                tracing::warn!("Could not update credit on plan {}: {}", plan_id, e);
                false
            }
        }
    }
}
