// src/services/unit_conversion_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::table_store::{RecordQuery, TableStore},
    models::{
        products::UnitSpec,
        teable::{Fields, fields},
        tenant::{TableKey, TenantRow},
        unit_conversions::{
            CreateUnitConversionResponse, ListUnitConversionsResponse, UnitConversionData,
            UnitConversionPayload,
        },
    },
};

/// Row written to the unit conversion table. VAT goes in as a fraction.
pub(crate) fn unit_fields(unit: &UnitSpec) -> Fields {
    fields(json!({
        "name_unit": unit.name_unit,
        "conversion_factor": unit.conversion_factor,
        "unit_default": unit.unit_default,
        "price": unit.price,
        "vat_rate": unit.vat / Decimal::ONE_HUNDRED,
    }))
}

#[derive(Clone)]
pub struct UnitConversionService {
    store: Arc<dyn TableStore>,
}

impl UnitConversionService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        tenant: &TenantRow,
        payload: UnitConversionPayload,
    ) -> Result<CreateUnitConversionResponse, AppError> {
        payload.validate()?;
        let ws = tenant.workspace(&[TableKey::UnitConversion])?;
        let table_id = ws.table(TableKey::UnitConversion)?;

        let record = self
            .store
            .create_record(&ws.credential, table_id, unit_fields(&UnitSpec::from(&payload)))
            .await
            .map_err(|e| AppError::store("Không thể tạo đơn vị tính", e))?;

        tracing::info!(
            "Unit conversion {} ({}) created for {}",
            record.id,
            payload.name_unit,
            ws.username
        );
        Ok(CreateUnitConversionResponse {
            status: "success".into(),
            detail: "Đơn vị tính đã được tạo thành công".into(),
            unit_conversion_id: record.id.clone(),
            unit_conversion_data: UnitConversionData::from(&record),
        })
    }

    pub async fn list(&self, tenant: &TenantRow) -> Result<ListUnitConversionsResponse, AppError> {
        let ws = tenant.workspace(&[TableKey::UnitConversion])?;
        let table_id = ws.table(TableKey::UnitConversion)?;

        let records = self
            .store
            .query_records(&ws.credential, table_id, &RecordQuery::new())
            .await
            .map_err(|e| AppError::store("Không thể lấy danh sách đơn vị tính", e))?;

        let unit_conversions: Vec<UnitConversionData> =
            records.iter().map(UnitConversionData::from).collect();
        Ok(ListUnitConversionsResponse {
            status: "success".into(),
            detail: format!("Tìm thấy {} đơn vị tính", unit_conversions.len()),
            total_found: unit_conversions.len(),
            unit_conversions,
        })
    }
}
