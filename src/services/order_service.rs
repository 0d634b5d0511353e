// src/services/order_service.rs

use std::sync::Arc;

use serde_json::json;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::table_store::TableStore,
    models::{
        orders::{BANK_TRANSFER, CreateOrderPayload, CreateOrderResponse, UNPAID_STATUS},
        stock::{CreateDeliveryNotePayload, DeliveryNoteLine, DeliveryNoteResponse},
        teable::{Record, fields},
        tenant::{TableKey, TenantRow, TenantWorkspace},
    },
    services::{
        plan_service::PlanService,
        saga::{Compensation, Saga},
        stock_service::{StockService, create_details, detail_fields},
        totals::DocumentTotals,
    },
};

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn TableStore>,
    stock: StockService,
    plans: PlanService,
}

impl OrderService {
    pub fn new(store: Arc<dyn TableStore>, stock: StockService, plans: PlanService) -> Self {
        Self { store, stock, plans }
    }

    /// Creates the order, its details and the matching delivery note.
    ///
    /// Totals are checked before anything is written. Nothing is left behind if any of the
    /// three writes fails. Credit is taken afterwards and never fails the order.
    pub async fn create(
        &self,
        tenant: &TenantRow,
        payload: CreateOrderPayload,
    ) -> Result<CreateOrderResponse, AppError> {
        payload.validate()?;
        let totals = DocumentTotals::of(&payload.order_details)?;
        let ws = tenant.workspace(&[
            TableKey::Order,
            TableKey::OrderDetail,
            TableKey::DeliveryNote,
            TableKey::DeliveryNoteDetail,
        ])?;

        let mut saga = Saga::new("create_order");
        let (order, note) = match self.write_order(&ws, &payload, &mut saga).await {
            Ok(created) => {
                saga.complete();
                created
            }
            Err(e) => {
                tracing::error!("Order for {} failed, rolling back: {}", ws.username, e);
                saga.compensate(self.store.as_ref()).await;
                return Err(e);
            }
        };

        if !self.plans.consume_credit(tenant).await {
            tracing::warn!("No credit consumed for {}, order {} kept", ws.username, order.id);
        }

        let order_code = match order.code("order_code") {
            code if code.is_empty() => order.code("order_number"),
            code => code,
        };
        tracing::info!(
            "Order {} and delivery note {} created for {}",
            order.id,
            note.delivery_note_id,
            ws.username
        );

        Ok(CreateOrderResponse {
            status: "success".into(),
            detail: "Đơn hàng và phiếu xuất đã được tạo thành công".into(),
            order_id: order.id,
            order_code,
            delivery_note_id: note.delivery_note_id,
            delivery_note_code: note.delivery_note_code,
            customer_id: payload.customer_id,
            total_items: totals.total_items,
            total_temp: totals.total_temp,
            total_vat: totals.total_vat,
            total_after_vat: totals.total_after_vat,
        })
    }

    async fn write_order(
        &self,
        ws: &TenantWorkspace,
        payload: &CreateOrderPayload,
        saga: &mut Saga,
    ) -> Result<(Record, DeliveryNoteResponse), AppError> {
        let rows = payload
            .order_details
            .iter()
            .map(|line| {
                detail_fields(&line.product_id, Some(line.unit_conversions_id.as_str()), line)
            })
            .collect();
        let detail_ids = create_details(
            self.store.as_ref(),
            ws,
            ws.table(TableKey::OrderDetail)?,
            rows,
            saga,
            "Không thể tạo chi tiết đơn hàng",
        )
        .await?;

        let mut header = fields(json!({
            "customer_link": [payload.customer_id],
            "order_details": detail_ids,
        }));
        if let Some(method) = payload.payment_method.as_deref().filter(|m| !m.is_empty()) {
            header.insert("payment_method".into(), json!(method));
            if method == BANK_TRANSFER {
                header.insert("status".into(), json!(UNPAID_STATUS));
            }
        }

        let order_table = ws.table(TableKey::Order)?;
        let order = self
            .store
            .create_record(&ws.credential, order_table, header)
            .await
            .map_err(|e| AppError::store("Không thể tạo đơn hàng", e))?;
        saga.record(Compensation::delete_record(&ws.credential, order_table, &order.id));

        let delivery = CreateDeliveryNotePayload {
            order_id: order.id.clone(),
            customer_id: payload.customer_id.clone(),
            delivery_type: payload.delivery_type,
            delivery_note_details: payload
                .order_details
                .iter()
                .map(|line| DeliveryNoteLine {
                    product_id: line.product_id.clone(),
                    unit_conversions_id: Some(line.unit_conversions_id.clone()),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    vat: line.vat,
                })
                .collect(),
            notes: None,
        };
        let note = self.stock.write_delivery_note(ws, &delivery, saga).await?;
        Ok((order, note))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::PlanStatusRepository,
        models::{orders::OrderLine, stock::DeliveryType},
        services::testing::{FakeStore, PLAN_TABLE, table_of},
    };
    use rust_decimal::dec;

    fn service(store: &Arc<FakeStore>) -> OrderService {
        let plans = PlanService::new(PlanStatusRepository::new(store.clone(), PLAN_TABLE.into()));
        let stock = StockService::new(store.clone(), plans.clone());
        OrderService::new(store.clone(), stock, plans)
    }

    fn payload(payment_method: Option<&str>) -> CreateOrderPayload {
        CreateOrderPayload {
            customer_id: "recCustomer".into(),
            order_details: vec![OrderLine {
                product_id: "recLaptop".into(),
                unit_conversions_id: "recCai".into(),
                unit_price: dec!(15000000),
                quantity: dec!(2),
                vat: dec!(10),
            }],
            delivery_type: DeliveryType::Sale,
            payment_method: payment_method.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn order_totals_and_delivery_note() {
        let store = Arc::new(FakeStore::default());
        let tenant = store.tenant(5);

        let response = service(&store).create(&tenant, payload(None)).await.unwrap();

        assert_eq!(response.total_temp, dec!(30000000));
        assert_eq!(response.total_vat, dec!(3000000));
        assert_eq!(response.total_after_vat, dec!(33000000));
        assert_eq!(response.total_items, 1);
        assert!(!response.delivery_note_id.is_empty());

        let notes = store.records(&table_of(TableKey::DeliveryNote));
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].link_id("order_link"), Some(response.order_id.as_str()));

        let note_details = store.records(&table_of(TableKey::DeliveryNoteDetail));
        assert_eq!(note_details.len(), 1);
        assert_eq!(note_details[0].link_id("product_link"), Some("recLaptop"));
        assert_eq!(note_details[0].number("quantity"), Some(2.0));
        assert_eq!(store.credit(), Some(4.0));
    }

    #[tokio::test]
    async fn bank_transfer_orders_start_unpaid() {
        let store = Arc::new(FakeStore::default());
        let tenant = store.tenant(5);

        let response = service(&store)
            .create(&tenant, payload(Some(BANK_TRANSFER)))
            .await
            .unwrap();

        let order = store.record(&table_of(TableKey::Order), &response.order_id).unwrap();
        assert_eq!(order.text("payment_method"), Some(BANK_TRANSFER));
        assert_eq!(order.text("status"), Some(UNPAID_STATUS));

        let cash = service(&store).create(&tenant, payload(Some("Tiền mặt"))).await.unwrap();
        let order = store.record(&table_of(TableKey::Order), &cash.order_id).unwrap();
        assert!(order.text("status").is_none());
    }

    #[tokio::test]
    async fn delivery_note_failure_rolls_back_order_and_details() {
        let store = Arc::new(FakeStore::default());
        let tenant = store.tenant(5);
        store.fail_on(&format!("create_records:{}", table_of(TableKey::DeliveryNote)));

        let err = service(&store).create(&tenant, payload(None)).await.unwrap_err();

        assert!(err.to_string().starts_with("Không thể tạo phiếu xuất"));
        for key in [TableKey::Order, TableKey::OrderDetail, TableKey::DeliveryNoteDetail] {
            assert!(store.records(&table_of(key)).is_empty(), "{key:?} left behind");
        }
        assert_eq!(store.deletions().len(), 3);
        assert_eq!(store.credit(), Some(5.0));
    }

    #[tokio::test]
    async fn exhausted_credit_does_not_fail_the_order() {
        let store = Arc::new(FakeStore::default());
        let tenant = store.tenant(0);

        let response = service(&store).create(&tenant, payload(None)).await.unwrap();
        assert!(!response.order_id.is_empty());
        assert_eq!(store.credit(), Some(0.0));
    }

    #[tokio::test]
    async fn overflowing_totals_fail_before_any_write() {
        let store = Arc::new(FakeStore::default());
        let tenant = store.tenant(5);
        let huge = rust_decimal::Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0);
        let mut order = payload(None);
        order.order_details[0].unit_price = huge;
        order.order_details[0].quantity = huge;

        let err = service(&store).create(&tenant, order).await.unwrap_err();

        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(store.writes(), 0);
        assert_eq!(store.credit(), Some(5.0));
    }
}
