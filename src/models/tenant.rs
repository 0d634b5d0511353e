// src/models/tenant.rs

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::{
    common::error::AppError,
    db::table_store::Credential,
    models::teable::Record,
};

/// Logical per-tenant tables. Each one is stored as a `table_<x>_id` column on the registry row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TableKey {
    Customer,
    UnitConversion,
    Brand,
    Supplier,
    Product,
    OrderDetail,
    ImportSlipDetail,
    DeliveryNoteDetail,
    Order,
    ImportSlip,
    DeliveryNote,
    InvoiceInfo,
    Catalog,
    ProductLine,
    Attribute,
    AttributeType,
}

impl TableKey {
    pub const ALL: [TableKey; 16] = [
        TableKey::Customer,
        TableKey::UnitConversion,
        TableKey::Brand,
        TableKey::Supplier,
        TableKey::Product,
        TableKey::OrderDetail,
        TableKey::ImportSlipDetail,
        TableKey::DeliveryNoteDetail,
        TableKey::Order,
        TableKey::ImportSlip,
        TableKey::DeliveryNote,
        TableKey::InvoiceInfo,
        TableKey::Catalog,
        TableKey::ProductLine,
        TableKey::Attribute,
        TableKey::AttributeType,
    ];

    pub fn registry_field(self) -> &'static str {
        match self {
            TableKey::Customer => "table_customer_id",
            TableKey::UnitConversion => "table_unit_conversions_id",
            TableKey::Brand => "table_brand_id",
            TableKey::Supplier => "table_supplier_id",
            TableKey::Product => "table_product_id",
            TableKey::OrderDetail => "table_order_detail_id",
            TableKey::ImportSlipDetail => "table_import_slip_details_id",
            TableKey::DeliveryNoteDetail => "table_delivery_note_details_id",
            TableKey::Order => "table_order_id",
            TableKey::ImportSlip => "table_import_slip_id",
            TableKey::DeliveryNote => "table_delivery_note_id",
            TableKey::InvoiceInfo => "table_invoice_info_id",
            TableKey::Catalog => "table_catalog_id",
            TableKey::ProductLine => "table_product_line_id",
            TableKey::Attribute => "table_attribute_id",
            TableKey::AttributeType => "table_attribute_type_id",
        }
    }

    /// Display name of the table inside the workspace template.
    pub fn template_name(self) -> &'static str {
        match self {
            TableKey::Customer => "Khách Hàng",
            TableKey::UnitConversion => "Đơn Vị Tính Chuyển Đổi",
            TableKey::Brand => "Thương Hiệu",
            TableKey::Supplier => "Nhà Cung Cấp",
            TableKey::Product => "Sản Phẩm",
            TableKey::OrderDetail => "Chi Tiết Đơn Hàng",
            TableKey::ImportSlipDetail => "Chi Tiết Phiếu Nhập",
            TableKey::DeliveryNoteDetail => "Chi Tiết Phiếu Xuất",
            TableKey::Order => "Đơn Hàng",
            TableKey::ImportSlip => "Phiếu Nhập",
            TableKey::DeliveryNote => "Phiếu Xuất",
            TableKey::InvoiceInfo => "Thông Tin Hóa Đơn",
            TableKey::Catalog => "Danh Mục",
            TableKey::ProductLine => "Ngành Hàng",
            TableKey::Attribute => "Thuộc Tính",
            TableKey::AttributeType => "Tên Thuộc Tính",
        }
    }

    pub fn from_template_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.template_name() == name)
    }
}

/// One row of the tenant registry table.
#[derive(Debug, Clone)]
pub struct TenantRow {
    record: Record,
}

impl From<Record> for TenantRow {
    fn from(record: Record) -> Self {
        Self { record }
    }
}

impl TenantRow {
    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn username(&self) -> &str {
        self.record.text("username").unwrap_or_default()
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.record.text(key)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.record.text("access_token")
    }

    pub fn invoice_token(&self) -> Option<&str> {
        self.record.text("invoice_token")
    }

    pub fn encoded_password(&self) -> Option<&str> {
        self.record.text("password")
    }

    pub fn upload_file_id(&self) -> Option<&str> {
        self.record.text("upload_file_id")
    }

    /// Linked plan-status record id.
    pub fn plan_id(&self) -> Option<&str> {
        self.record.link_id("current_plan")
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    /// The registry row with secrets stripped, as returned on sign-in.
    pub fn public_record(&self) -> Value {
        let mut fields = self.record.fields.clone();
        fields.remove("password");
        fields.remove("invoice_token");
        json!({ "id": self.record.id, "fields": fields })
    }

    /// Resolves the workspace token and the given tables, failing with every missing key listed.
    pub fn workspace(&self, required: &[TableKey]) -> Result<TenantWorkspace, AppError> {
        let mut missing: Vec<String> = required
            .iter()
            .filter(|key| self.record.text(key.registry_field()).is_none())
            .map(|key| key.registry_field().to_string())
            .collect();
        let token = self.access_token();
        if token.is_none() {
            missing.push("access_token".to_string());
        }
        if !missing.is_empty() {
            return Err(AppError::MissingTenantTables(missing));
        }

        let tables = TableKey::ALL
            .into_iter()
            .filter_map(|key| {
                self.record
                    .text(key.registry_field())
                    .map(|id| (key, id.to_string()))
            })
            .collect();

        Ok(TenantWorkspace {
            username: self.username().to_string(),
            credential: Credential::Workspace(token.unwrap_or_default().to_string()),
            tables,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TenantWorkspace {
    pub username: String,
    pub credential: Credential,
    tables: BTreeMap<TableKey, String>,
}

impl TenantWorkspace {
    pub fn table(&self, key: TableKey) -> Result<&str, AppError> {
        self.tables
            .get(&key)
            .map(String::as_str)
            .ok_or_else(|| AppError::MissingTenantTables(vec![key.registry_field().to_string()]))
    }
}
