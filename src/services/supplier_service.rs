// src/services/supplier_service.rs

use std::sync::Arc;

use serde_json::json;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::table_store::TableStore,
    models::{
        suppliers::{CreateSupplierPayload, CreateSupplierResponse},
        teable::fields,
        tenant::{TableKey, TenantRow},
    },
};

#[derive(Clone)]
pub struct SupplierService {
    store: Arc<dyn TableStore>,
}

impl SupplierService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        tenant: &TenantRow,
        payload: CreateSupplierPayload,
    ) -> Result<CreateSupplierResponse, AppError> {
        payload.validate()?;
        let ws = tenant.workspace(&[TableKey::Supplier])?;

        let record = self
            .store
            .create_record(
                &ws.credential,
                ws.table(TableKey::Supplier)?,
                fields(json!({
                    "supplier_name": payload.supplier_name,
                    "address": payload.address,
                })),
            )
            .await
            .map_err(|e| AppError::store("Không thể tạo nhà cung cấp", e))?;

        tracing::info!("Supplier {} created for {}", record.id, ws.username);
        Ok(CreateSupplierResponse {
            status: "success".into(),
            detail: "Nhà cung cấp đã được tạo thành công".into(),
            supplier_name: record
                .text("supplier_name")
                .unwrap_or(&payload.supplier_name)
                .to_string(),
            address: record.text("address").unwrap_or(&payload.address).to_string(),
            supplier_id: record.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::FakeStore;

    #[tokio::test]
    async fn creates_supplier_row() {
        let store = Arc::new(FakeStore::default());
        let tenant = store.tenant(1);
        let service = SupplierService::new(store.clone());

        let response = service
            .create(
                &tenant,
                CreateSupplierPayload {
                    supplier_name: "Công ty Bia Sài Gòn".into(),
                    address: "187 Nguyễn Chí Thanh, Q.5".into(),
                },
            )
            .await
            .unwrap();

        assert!(response.supplier_id.starts_with("rec"));
        assert_eq!(response.supplier_name, "Công ty Bia Sài Gòn");
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn tenant_without_supplier_table_is_a_bad_request() {
        let store = Arc::new(FakeStore::default());
        let tenant = crate::models::tenant::TenantRow::from(
            store.seed("tblUsers", json!({ "username": "u", "access_token": "teable_x" })),
        );
        let service = SupplierService::new(store);

        let err = service
            .create(
                &tenant,
                CreateSupplierPayload {
                    supplier_name: "NCC".into(),
                    address: String::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::MissingTenantTables(ref keys) if keys == &["table_supplier_id"]
        ));
    }
}
