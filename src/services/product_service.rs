// src/services/product_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::table_store::{RecordQuery, TableStore},
    models::{
        products::{
            CreateProductPayload, CreateProductResponse, CreateProductWithUnitsPayload,
            CreateProductWithUnitsResponse, FindProductsQuery, FindProductsResponse, ProductData,
            ProductPricing, ProductWithUnitsData, UnitSpec,
        },
        teable::{Fields, Record, fields},
        tenant::{TableKey, TenantRow, TenantWorkspace},
        unit_conversions::UnitConversionData,
    },
    services::{
        plan_service::PlanService,
        saga::{Compensation, Saga},
        unit_conversion_service::unit_fields,
    },
};

#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn TableStore>,
    plans: PlanService,
}

impl ProductService {
    pub fn new(store: Arc<dyn TableStore>, plans: PlanService) -> Self {
        Self { store, plans }
    }

    pub async fn create(
        &self,
        tenant: &TenantRow,
        payload: CreateProductPayload,
    ) -> Result<CreateProductResponse, AppError> {
        payload.validate()?;
        let ws = tenant.workspace(&[TableKey::Product])?;

        let record = self
            .store
            .create_record(
                &ws.credential,
                ws.table(TableKey::Product)?,
                fields(json!({
                    "product_name": payload.product_name,
                    "unit_conversions": payload.unit_conversions,
                })),
            )
            .await
            .map_err(|e| AppError::store("Không thể tạo sản phẩm", e))?;

        self.charge(tenant, "product creation").await;
        tracing::info!("Product {} created for {}", record.id, ws.username);
        Ok(CreateProductResponse {
            status: "success".into(),
            detail: "Sản phẩm đã được tạo thành công".into(),
            product_id: record.id.clone(),
            product_data: ProductData::from(&record),
        })
    }

    pub async fn find_by_name(
        &self,
        tenant: &TenantRow,
        query: FindProductsQuery,
    ) -> Result<FindProductsResponse, AppError> {
        let ws = tenant.workspace(&[TableKey::Product])?;

        let mut filter = RecordQuery::new().contains("product_name", query.name.trim());
        if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
            filter = filter.is("category", category);
        }
        let records = self
            .store
            .query_records(&ws.credential, ws.table(TableKey::Product)?, &filter.take(query.limit))
            .await
            .map_err(|e| AppError::store("Không thể tìm kiếm sản phẩm", e))?;

        let products: Vec<ProductData> = records.iter().map(ProductData::from).collect();
        tracing::info!(
            "Found {} products matching '{}' for {}",
            products.len(),
            query.name,
            ws.username
        );
        Ok(FindProductsResponse {
            status: "success".into(),
            detail: format!("Tìm thấy {} sản phẩm", products.len()),
            total_found: products.len(),
            products,
        })
    }

    /// Creates a product together with its packaging units.
    ///
    /// A single unit is flattened onto the product row. Several units become
    /// unit-conversion rows first; those are deleted again if the product row fails.
    pub async fn create_with_units(
        &self,
        tenant: &TenantRow,
        payload: CreateProductWithUnitsPayload,
    ) -> Result<CreateProductWithUnitsResponse, AppError> {
        payload.validate()?;
        let ws = tenant.workspace(&[TableKey::Product, TableKey::UnitConversion])?;
        let pricing = ProductPricing::from_units(&payload.unit_conversions)
            .ok_or_else(|| AppError::BadRequest("Cần ít nhất một đơn vị tính".into()))?;

        let mut saga = Saga::new("create_product_with_units");
        let result = self.write_product(&ws, &payload, &pricing, &mut saga).await;
        let (record, units) = match result {
            Ok(created) => {
                saga.complete();
                created
            }
            Err(e) => {
                saga.compensate(self.store.as_ref()).await;
                return Err(e);
            }
        };

        self.charge(tenant, "product with units creation").await;
        tracing::info!(
            "Product {} created with {} unit conversion(s) for {}",
            record.id,
            units.len(),
            ws.username
        );

        let decimal = |key: &str| record.number(key).and_then(|n| Decimal::try_from(n).ok());
        let product_data = match pricing {
            ProductPricing::Flat { .. } => ProductWithUnitsData {
                unit_conversions: None,
                unit_default: record.text("unit_default").map(str::to_string),
                price: decimal("price").map(|d| d.normalize()),
                vat_rate: decimal("vat_rate").map(|d| d.normalize()),
                ..linked_ids(&record)
            },
            ProductPricing::Multi(_) => ProductWithUnitsData {
                unit_conversions: Some(units),
                unit_default: None,
                price: None,
                vat_rate: None,
                ..linked_ids(&record)
            },
        };

        Ok(CreateProductWithUnitsResponse {
            status: "success".into(),
            detail: "Sản phẩm và đơn vị tính đã được tạo thành công".into(),
            product_id: record.id.clone(),
            product_data,
        })
    }

    async fn write_product(
        &self,
        ws: &TenantWorkspace,
        payload: &CreateProductWithUnitsPayload,
        pricing: &ProductPricing,
        saga: &mut Saga,
    ) -> Result<(Record, Vec<UnitConversionData>), AppError> {
        let mut product = fields(json!({ "product_name": payload.product_name }));
        let mut units = Vec::new();

        match pricing {
            ProductPricing::Flat { unit, price, vat } => {
                product.insert("unit_default".into(), json!(unit));
                product.insert("price".into(), json!(price));
                product.insert("vat_rate".into(), json!(*vat / Decimal::ONE_HUNDRED));
            }
            ProductPricing::Multi(specs) => {
                let unit_table = ws.table(TableKey::UnitConversion)?;
                for spec in specs {
                    let record = self.create_unit(ws, unit_table, spec).await?;
                    saga.record(Compensation::delete_record(
                        &ws.credential,
                        unit_table,
                        &record.id,
                    ));
                    units.push(UnitConversionData::from(&record));
                }
                let ids: Vec<&str> = units.iter().map(|u| u.unit_conversion_id.as_str()).collect();
                product.insert("unit_conversions".into(), json!(ids));
                if let Some(first) = specs.first() {
                    product.insert("unit_default".into(), json!(first.name_unit));
                }
            }
        }
        insert_links(&mut product, payload);

        let record = self
            .store
            .create_record(&ws.credential, ws.table(TableKey::Product)?, product)
            .await
            .map_err(|e| AppError::store("Không thể tạo sản phẩm", e))?;
        Ok((record, units))
    }

    async fn create_unit(
        &self,
        ws: &TenantWorkspace,
        table_id: &str,
        spec: &UnitSpec,
    ) -> Result<Record, AppError> {
        self.store
            .create_record(&ws.credential, table_id, unit_fields(spec))
            .await
            .map_err(|e| {
                AppError::store(format!("Không thể tạo đơn vị tính '{}'", spec.name_unit), e)
            })
    }

    async fn charge(&self, tenant: &TenantRow, what: &str) {
        if !self.plans.consume_credit(tenant).await {
            tracing::warn!("No credit consumed for {} after {}", tenant.username(), what);
        }
    }
}

fn insert_links(product: &mut Fields, payload: &CreateProductWithUnitsPayload) {
    if let Some(brand) = payload.brand_id.as_deref().filter(|b| !b.is_empty()) {
        product.insert("brand".into(), json!([brand]));
    }
    if let Some(catalogs) = payload.catalogs_ids.as_ref().filter(|c| !c.is_empty()) {
        product.insert("catalogs".into(), json!(catalogs));
    }
    if let Some(attributes) = payload.attributes_ids.as_ref().filter(|a| !a.is_empty()) {
        product.insert("attributes".into(), json!(attributes));
    }
}

fn linked_ids(record: &Record) -> ProductWithUnitsData {
    ProductWithUnitsData {
        product_id: record.id.clone(),
        product_name: record.text_or_default("product_name"),
        brand_id: record.link_id("brand").map(str::to_string),
        catalogs_ids: record.link_ids("catalogs"),
        attributes_ids: record.link_ids("attributes"),
        unit_conversions: None,
        unit_default: None,
        price: None,
        vat_rate: None,
    }
}
