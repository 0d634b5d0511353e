// src/services/customer_service.rs

use std::sync::Arc;

use serde_json::json;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::table_store::{RecordQuery, TableStore},
    models::{
        customers::{
            CreateCustomerPayload, CreateCustomerResponse, CustomerData, FindCustomersQuery,
            FindCustomersResponse,
        },
        teable::fields,
        tenant::{TableKey, TenantRow},
    },
};

#[derive(Clone)]
pub struct CustomerService {
    store: Arc<dyn TableStore>,
}

impl CustomerService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        tenant: &TenantRow,
        payload: CreateCustomerPayload,
    ) -> Result<CreateCustomerResponse, AppError> {
        payload.validate()?;
        let ws = tenant.workspace(&[TableKey::Customer])?;
        let table_id = ws.table(TableKey::Customer)?;

        let fields = fields(json!({
            "phone_number": payload.phone_number.trim(),
            "fullname": payload.fullname.trim(),
            "address": payload.address.unwrap_or_default(),
            "email": payload.email.unwrap_or_default(),
        }));

        let record = self
            .store
            .create_record(&ws.credential, table_id, fields)
            .await
            .map_err(|e| AppError::store("Không thể tạo khách hàng", e))?;

        tracing::info!("Customer {} created for {}", record.id, ws.username);
        Ok(CreateCustomerResponse {
            status: "success".into(),
            detail: "Khách hàng đã được tạo thành công".into(),
            customer_id: record.id.clone(),
            customer_data: CustomerData::from(&record),
        })
    }

    pub async fn find_by_name(
        &self,
        tenant: &TenantRow,
        query: FindCustomersQuery,
    ) -> Result<FindCustomersResponse, AppError> {
        let ws = tenant.workspace(&[TableKey::Customer])?;
        let table_id = ws.table(TableKey::Customer)?;

        let filter = RecordQuery::new()
            .contains("fullname", query.name.trim())
            .take(query.limit);
        let records = self
            .store
            .query_records(&ws.credential, table_id, &filter)
            .await
            .map_err(|e| AppError::store("Không thể tìm kiếm khách hàng", e))?;

        let customers: Vec<CustomerData> = records.iter().map(CustomerData::from).collect();
        tracing::info!(
            "Found {} customers matching '{}' for {}",
            customers.len(),
            query.name,
            ws.username
        );
        Ok(FindCustomersResponse {
            status: "success".into(),
            detail: format!("Tìm thấy {} khách hàng", customers.len()),
            total_found: customers.len(),
            customers,
        })
    }
}
