// src/services/stock_service.rs
//
// Stock movements: import slips in, delivery notes out. Detail rows are written
// before the header row that links them.

use std::sync::Arc;

use serde_json::json;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::table_store::TableStore,
    models::{
        stock::{
            CreateDeliveryNotePayload, CreateImportSlipPayload, DeliveryNoteResponse,
            ImportSlipResponse,
        },
        teable::{Fields, Record, fields},
        tenant::{TableKey, TenantRow, TenantWorkspace},
    },
    services::{
        plan_service::PlanService,
        saga::{Compensation, Saga},
        totals::{DocumentTotals, PricedLine},
    },
};

/// One detail row. Totals are left to the table's formulas.
pub(crate) fn detail_fields(
    product_id: &str,
    unit_id: Option<&str>,
    line: &impl PricedLine,
) -> Fields {
    let mut row = fields(json!({
        "product_link": [product_id],
        "quantity": line.quantity(),
        "unit_price": line.unit_price(),
        "vat": line.vat(),
    }));
    if let Some(unit_id) = unit_id.filter(|id| !id.is_empty()) {
        row.insert("unit_conversions".into(), json!([unit_id]));
    }
    row
}

/// Creates detail rows in one batch and records each for rollback.
pub(crate) async fn create_details(
    store: &dyn TableStore,
    ws: &TenantWorkspace,
    table_id: &str,
    rows: Vec<Fields>,
    saga: &mut Saga,
    context: &str,
) -> Result<Vec<String>, AppError> {
    let created = store
        .create_records(&ws.credential, table_id, rows)
        .await
        .map_err(|e| AppError::store(context, e))?;
    let ids: Vec<String> = created.into_iter().map(|r| r.id).collect();
    for id in &ids {
        saga.record(Compensation::delete_record(&ws.credential, table_id, id));
    }
    Ok(ids)
}

#[derive(Clone)]
pub struct StockService {
    store: Arc<dyn TableStore>,
    plans: PlanService,
}

impl StockService {
    pub fn new(store: Arc<dyn TableStore>, plans: PlanService) -> Self {
        Self { store, plans }
    }

    // =========================================================================
    //  IMPORT SLIPS
    // =========================================================================

    pub async fn create_import_slip(
        &self,
        tenant: &TenantRow,
        payload: CreateImportSlipPayload,
    ) -> Result<ImportSlipResponse, AppError> {
        payload.validate()?;
        let totals = DocumentTotals::of(&payload.import_slip_details)?;
        let ws = tenant.workspace(&[
            TableKey::ImportSlipDetail,
            TableKey::ImportSlip,
            TableKey::Product,
        ])?;

        let mut saga = Saga::new("create_import_slip");
        let (slip, detail_ids) = match self.write_import_slip(&ws, &payload, &mut saga).await {
            Ok(created) => {
                saga.complete();
                created
            }
            Err(e) => {
                saga.compensate(self.store.as_ref()).await;
                return Err(e);
            }
        };

        if !self.plans.consume_credit(tenant).await {
            tracing::warn!("No credit consumed for {} after import slip creation", ws.username);
        }

        tracing::info!("Import slip {} created for {}", slip.id, ws.username);
        Ok(ImportSlipResponse {
            status: "success".into(),
            detail: "Phiếu nhập đã được tạo thành công".into(),
            import_slip_code: slip.code("import_slip_code"),
            import_slip_id: slip.id,
            import_slip_details_ids: detail_ids,
            total_items: totals.total_items,
            total_amount: totals.total_after_vat,
        })
    }

    async fn write_import_slip(
        &self,
        ws: &TenantWorkspace,
        payload: &CreateImportSlipPayload,
        saga: &mut Saga,
    ) -> Result<(Record, Vec<String>), AppError> {
        let rows = payload
            .import_slip_details
            .iter()
            .map(|line| {
                detail_fields(&line.product_id, Some(line.unit_conversions_id.as_str()), line)
            })
            .collect();
        let detail_ids = create_details(
            self.store.as_ref(),
            ws,
            ws.table(TableKey::ImportSlipDetail)?,
            rows,
            saga,
            "Không thể tạo chi tiết phiếu nhập",
        )
        .await?;

        let slip = self
            .store
            .create_record(
                &ws.credential,
                ws.table(TableKey::ImportSlip)?,
                fields(json!({
                    "import_slip_details": detail_ids,
                    "supplier_link": [payload.supplier_id],
                    "import_type": payload.import_type,
                })),
            )
            .await
            .map_err(|e| AppError::store("Không thể tạo phiếu nhập", e))?;
        Ok((slip, detail_ids))
    }

    // =========================================================================
    //  DELIVERY NOTES
    // =========================================================================

    pub async fn create_delivery_note(
        &self,
        tenant: &TenantRow,
        payload: CreateDeliveryNotePayload,
    ) -> Result<DeliveryNoteResponse, AppError> {
        payload.validate()?;
        let ws = tenant.workspace(&[
            TableKey::DeliveryNoteDetail,
            TableKey::DeliveryNote,
            TableKey::Product,
        ])?;

        let mut saga = Saga::new("create_delivery_note");
        match self.write_delivery_note(&ws, &payload, &mut saga).await {
            Ok(response) => {
                saga.complete();
                Ok(response)
            }
            Err(e) => {
                saga.compensate(self.store.as_ref()).await;
                Err(e)
            }
        }
    }

    /// Writes a delivery note and its details, recording every row on `saga`.
    pub(crate) async fn write_delivery_note(
        &self,
        ws: &TenantWorkspace,
        payload: &CreateDeliveryNotePayload,
        saga: &mut Saga,
    ) -> Result<DeliveryNoteResponse, AppError> {
        let totals = DocumentTotals::of(&payload.delivery_note_details)?;
        let rows = payload
            .delivery_note_details
            .iter()
            .map(|line| detail_fields(&line.product_id, line.unit_conversions_id.as_deref(), line))
            .collect();
        let detail_table = ws.table(TableKey::DeliveryNoteDetail)?;
        let detail_ids = create_details(
            self.store.as_ref(),
            ws,
            detail_table,
            rows,
            saga,
            "Không thể tạo chi tiết phiếu xuất",
        )
        .await?;

        let mut header = fields(json!({
            "order_link": [payload.order_id],
            "customer_link": [payload.customer_id],
            "delivery_note_details": detail_ids,
            "delivery_type": payload.delivery_type,
        }));
        if let Some(notes) = payload.notes.as_deref().filter(|n| !n.is_empty()) {
            header.insert("notes".into(), json!(notes));
        }

        let table_id = ws.table(TableKey::DeliveryNote)?;
        let note = self
            .store
            .create_record(&ws.credential, table_id, header)
            .await
            .map_err(|e| AppError::store("Không thể tạo phiếu xuất", e))?;
        saga.record(Compensation::delete_record(&ws.credential, table_id, &note.id));

        tracing::info!(
            "Delivery note {} created for order {} by {}",
            note.id,
            payload.order_id,
            ws.username
        );
        Ok(DeliveryNoteResponse {
            status: "success".into(),
            detail: "Phiếu xuất đã được tạo thành công".into(),
            delivery_note_code: note.code("delivery_note_code"),
            delivery_note_id: note.id,
            delivery_note_details_ids: detail_ids,
            order_id: payload.order_id.clone(),
            customer_id: payload.customer_id.clone(),
            total_items: totals.total_items,
            total_amount: totals.total_after_vat,
        })
    }
}
