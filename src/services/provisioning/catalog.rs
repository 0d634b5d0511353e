// src/services/provisioning/catalog.rs
//
// Declarative description of the per-tenant schema: tables with their base fields, then the
// computed fields (formulas, lookups, rollups) that can only be added once their inputs exist.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::models::{
    stock::{DeliveryType, ImportType},
    teable::{LookupOptions, NewField, NewTable},
    tenant::TableKey,
};

use super::graph::{GraphError, topological_order};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    ManyOne,
    OneMany,
    ManyMany,
}

impl Relationship {
    fn as_str(self) -> &'static str {
        match self {
            Relationship::ManyOne => "manyOne",
            Relationship::OneMany => "oneMany",
            Relationship::ManyMany => "manyMany",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text { unique: bool },
    LongText,
    Number,
    Checkbox,
    AutoNumber,
    Attachment,
    /// Expression over built-in functions only; no field references.
    Formula(&'static str),
    SingleSelect(&'static [&'static str]),
    MultipleSelect,
    Link {
        target: TableKey,
        relationship: Relationship,
        one_way: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: &'static str,
    pub db_name: &'static str,
    pub kind: FieldKind,
}

impl FieldDef {
    fn link_target(&self) -> Option<TableKey> {
        match self.kind {
            FieldKind::Link { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Wire payload, with link targets resolved from already-created tables.
    pub fn to_new_field(&self, ids: &BTreeMap<TableKey, String>) -> Result<NewField, TableKey> {
        let (kind, options, unique) = match &self.kind {
            FieldKind::Text { unique } => ("singleLineText", None, unique.then_some(true)),
            FieldKind::LongText => ("longText", None, None),
            FieldKind::Number => ("number", None, None),
            FieldKind::Checkbox => ("checkbox", None, None),
            FieldKind::AutoNumber => ("autoNumber", None, None),
            FieldKind::Attachment => ("attachment", None, None),
            FieldKind::MultipleSelect => ("multipleSelect", None, None),
            FieldKind::Formula(expression) => {
                ("formula", Some(json!({ "expression": expression })), None)
            }
            FieldKind::SingleSelect(choices) => {
                let choices: Vec<Value> = choices.iter().map(|c| json!({ "name": c })).collect();
                ("singleSelect", Some(json!({ "choices": choices })), None)
            }
            FieldKind::Link {
                target,
                relationship,
                one_way,
            } => {
                let foreign = ids.get(target).ok_or(*target)?;
                let mut options = json!({
                    "foreignTableId": foreign,
                    "relationship": relationship.as_str(),
                });
                if *one_way {
                    options["isOneWay"] = json!(true);
                }
                ("link", Some(options), None)
            }
        };
        Ok(NewField {
            kind,
            name: self.name.to_string(),
            db_field_name: self.db_name.to_string(),
            unique,
            is_lookup: None,
            options,
            lookup_options: None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TableDef {
    pub key: TableKey,
    pub name: &'static str,
    pub db_table_name: Option<&'static str>,
    pub description: &'static str,
    pub icon: &'static str,
    pub fields: Vec<FieldDef>,
}

impl TableDef {
    pub fn dependencies(&self) -> Vec<TableKey> {
        let mut deps: Vec<TableKey> =
            self.fields.iter().filter_map(FieldDef::link_target).collect();
        deps.dedup();
        deps
    }

    pub fn to_new_table(&self, ids: &BTreeMap<TableKey, String>) -> Result<NewTable, TableKey> {
        let fields = self
            .fields
            .iter()
            .map(|f| f.to_new_field(ids))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NewTable {
            name: self.name.to_string(),
            db_table_name: self.db_table_name.map(str::to_string),
            description: self.description.to_string(),
            icon: self.icon.to_string(),
            field_key_type: "dbFieldName",
            fields,
            records: Vec::new(),
        })
    }
}

/// Link field a lookup or rollup travels through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRef {
    /// A link field declared on the table itself.
    Field(&'static str),
    /// The symmetric field the store adds when another table links to this one.
    ReverseOf(TableKey),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Derivation {
    /// `{db_name}` placeholders are rewritten to `{fldId}` at build time.
    Formula(&'static str),
    Lookup {
        link: &'static str,
        foreign: TableKey,
        field: &'static str,
        value_type: &'static str,
    },
    Rollup {
        link: LinkRef,
        foreign: TableKey,
        field: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedField {
    pub table: TableKey,
    pub name: &'static str,
    pub db_name: &'static str,
    pub derivation: Derivation,
}

pub type FieldKey = (TableKey, &'static str);

impl DerivedField {
    pub fn key(&self) -> FieldKey {
        (self.table, self.db_name)
    }

    /// Every field this one reads, derived or not.
    pub fn inputs(&self) -> Vec<FieldKey> {
        match &self.derivation {
            Derivation::Formula(expression) => formula_references(*expression)
                .into_iter()
                .map(|name| (self.table, name))
                .collect(),
            Derivation::Lookup { foreign, field, .. }
            | Derivation::Rollup { foreign, field, .. } => vec![(*foreign, *field)],
        }
    }
}

/// Field names referenced as `{name}` in a formula.
pub fn formula_references(expression: &'static str) -> Vec<&'static str> {
    let mut refs = Vec::new();
    let mut rest = expression;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else { break };
        let name = &after[..close];
        if !refs.contains(&name) {
            refs.push(name);
        }
        rest = &after[close + 1..];
    }
    refs
}

/// Rewrites `{db_name}` placeholders to `{fldId}`; returns the first unresolved name on failure.
pub fn render_formula<'a>(
    expression: &'a str,
    resolve: impl Fn(&str) -> Option<String>,
) -> Result<String, &'a str> {
    let mut out = String::with_capacity(expression.len());
    let mut rest = expression;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else { break };
        let name = &after[..close];
        let id = resolve(name).ok_or(name)?;
        out.push_str(&rest[..open]);
        out.push('{');
        out.push_str(&id);
        out.push('}');
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

pub fn formula_field(name: &str, db_name: &str, expression: String) -> NewField {
    NewField {
        kind: "formula",
        name: name.to_string(),
        db_field_name: db_name.to_string(),
        unique: None,
        is_lookup: None,
        options: Some(json!({ "expression": expression })),
        lookup_options: None,
    }
}

pub fn lookup_field(
    name: &str,
    db_name: &str,
    value_type: &'static str,
    lookup: LookupOptions,
) -> NewField {
    NewField {
        kind: value_type,
        name: name.to_string(),
        db_field_name: db_name.to_string(),
        unique: None,
        is_lookup: Some(true),
        options: None,
        lookup_options: Some(lookup),
    }
}

pub fn rollup_field(name: &str, db_name: &str, lookup: LookupOptions) -> NewField {
    NewField {
        kind: "rollup",
        name: name.to_string(),
        db_field_name: db_name.to_string(),
        unique: None,
        is_lookup: None,
        options: Some(json!({ "expression": "sum({values})" })),
        lookup_options: Some(lookup),
    }
}

#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    pub tables: Vec<TableDef>,
    pub derived: Vec<DerivedField>,
    /// Reverse link columns hidden from the first view of their table.
    pub hidden_reverse_links: Vec<(TableKey, TableKey)>,
}

impl SchemaCatalog {
    pub fn table_order(&self) -> Result<Vec<&TableDef>, GraphError<TableKey>> {
        let nodes: Vec<(TableKey, Vec<TableKey>)> =
            self.tables.iter().map(|t| (t.key, t.dependencies())).collect();
        let order = topological_order(&nodes)?;
        Ok(order
            .into_iter()
            .filter_map(|key| self.tables.iter().find(|t| t.key == key))
            .collect())
    }

    /// Computed fields ordered so every derived input is created before its readers.
    pub fn derived_order(&self) -> Result<Vec<&DerivedField>, GraphError<FieldKey>> {
        let derived_keys: Vec<FieldKey> = self.derived.iter().map(DerivedField::key).collect();
        let nodes: Vec<(FieldKey, Vec<FieldKey>)> = self
            .derived
            .iter()
            .map(|d| {
                let deps = d
                    .inputs()
                    .into_iter()
                    .filter(|input| derived_keys.contains(input))
                    .collect();
                (d.key(), deps)
            })
            .collect();
        let order = topological_order(&nodes)?;
        Ok(order
            .into_iter()
            .filter_map(|key| self.derived.iter().find(|d| d.key() == key))
            .collect())
    }

    pub fn table(&self, key: TableKey) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.key == key)
    }

    pub fn has_field(&self, (table, db_name): FieldKey) -> bool {
        self.table(table)
            .is_some_and(|t| t.fields.iter().any(|f| f.db_name == db_name))
            || self.derived.iter().any(|d| d.key() == (table, db_name))
    }

    /// The retail schema every tenant workspace gets.
    pub fn retail() -> Self {
        Self {
            tables: retail_tables(),
            derived: retail_derived_fields(),
            hidden_reverse_links: vec![
                (TableKey::Product, TableKey::ImportSlipDetail),
                (TableKey::Product, TableKey::DeliveryNoteDetail),
            ],
        }
    }
}

// =============================================================================
//  RETAIL SCHEMA
// =============================================================================

fn field(name: &'static str, db_name: &'static str, kind: FieldKind) -> FieldDef {
    FieldDef { name, db_name, kind }
}

fn text(name: &'static str, db_name: &'static str) -> FieldDef {
    field(name, db_name, FieldKind::Text { unique: false })
}

fn number(name: &'static str, db_name: &'static str) -> FieldDef {
    field(name, db_name, FieldKind::Number)
}

fn link(
    name: &'static str,
    db_name: &'static str,
    target: TableKey,
    relationship: Relationship,
    one_way: bool,
) -> FieldDef {
    field(
        name,
        db_name,
        FieldKind::Link {
            target,
            relationship,
            one_way,
        },
    )
}

fn priced_detail_fields(
    number_name: &'static str,
    number_db: &'static str,
    one_way: bool,
) -> Vec<FieldDef> {
    vec![
        field(number_name, number_db, FieldKind::AutoNumber),
        link("Sản phẩm", "product_link", TableKey::Product, Relationship::ManyOne, one_way),
        link(
            "Đơn vị tính",
            "unit_conversions",
            TableKey::UnitConversion,
            Relationship::ManyOne,
            one_way,
        ),
        number("Đơn Giá", "unit_price"),
        number("Số lượng", "quantity"),
        number("VAT", "vat"),
    ]
}

fn retail_tables() -> Vec<TableDef> {
    vec![
        TableDef {
            key: TableKey::Customer,
            name: "Khách Hàng",
            db_table_name: Some("customers"),
            description: "Bảng quản lý khách hàng",
            icon: "👥",
            fields: vec![
                field("Số điện thoại", "phone_number", FieldKind::Text { unique: true }),
                text("Họ và tên", "fullname"),
                field("Địa chỉ", "address", FieldKind::LongText),
                text("Email", "email"),
            ],
        },
        TableDef {
            key: TableKey::UnitConversion,
            name: "Đơn Vị Tính Chuyển Đổi",
            db_table_name: Some("unit_conversions"),
            description: "Bảng quản lý đơn vị tính chuyển đổi",
            icon: "⚖️",
            fields: vec![
                text("Tên đơn vị", "name_unit"),
                number("Hệ số chuyển đổi", "conversion_factor"),
                text("Đơn vị mặc định", "unit_default"),
                number("Giá đơn vị", "price"),
                number("VAT(%)", "vat_rate"),
            ],
        },
        TableDef {
            key: TableKey::Brand,
            name: "Thương Hiệu",
            db_table_name: None,
            description: "Bảng quản lý thương hiệu sản phẩm",
            icon: "🔖",
            fields: vec![text("Tên thương hiệu", "brand_name")],
        },
        TableDef {
            key: TableKey::Supplier,
            name: "Nhà Cung Cấp",
            db_table_name: None,
            description: "Quản lý thông tin nhà cung cấp",
            icon: "🏭",
            fields: vec![
                field("Mã nhà cung cấp", "supplier_number", FieldKind::AutoNumber),
                text("Tên nhà cung cấp", "supplier_name"),
                field("Địa chỉ", "address", FieldKind::LongText),
            ],
        },
        TableDef {
            key: TableKey::ProductLine,
            name: "Ngành Hàng",
            db_table_name: Some("product_lines"),
            description: "Bảng quản lý ngành hàng",
            icon: "🗂️",
            fields: vec![text("Tên ngành hàng", "product_line_name")],
        },
        TableDef {
            key: TableKey::Catalog,
            name: "Danh Mục",
            db_table_name: Some("catalogs"),
            description: "Bảng quản lý danh mục sản phẩm",
            icon: "📚",
            fields: vec![
                text("Tên danh mục", "catalog_name"),
                link(
                    "Ngành hàng",
                    "product_line",
                    TableKey::ProductLine,
                    Relationship::ManyOne,
                    false,
                ),
            ],
        },
        TableDef {
            key: TableKey::AttributeType,
            name: "Tên Thuộc Tính",
            db_table_name: Some("attribute_types"),
            description: "Bảng quản lý loại thuộc tính",
            icon: "🏷️",
            fields: vec![text("Tên thuộc tính", "attribute_type_name")],
        },
        TableDef {
            key: TableKey::Attribute,
            name: "Thuộc Tính",
            db_table_name: Some("attributes"),
            description: "Bảng quản lý giá trị thuộc tính sản phẩm",
            icon: "🎨",
            fields: vec![
                text("Giá trị", "attribute_value"),
                link(
                    "Tên thuộc tính",
                    "attribute_type",
                    TableKey::AttributeType,
                    Relationship::ManyOne,
                    false,
                ),
            ],
        },
        TableDef {
            key: TableKey::Product,
            name: "Sản Phẩm",
            db_table_name: Some("products"),
            description: "Bảng quản lý sản phẩm",
            icon: "📦",
            fields: vec![
                text("Tên sản phẩm", "product_name"),
                link(
                    "Đơn vị tính",
                    "unit_conversions",
                    TableKey::UnitConversion,
                    Relationship::ManyMany,
                    false,
                ),
                link("Thương hiệu", "brand", TableKey::Brand, Relationship::ManyOne, false),
                text("Phân loại", "category"),
                link("Danh mục", "catalogs", TableKey::Catalog, Relationship::ManyMany, false),
                link(
                    "Thuộc tính",
                    "attributes",
                    TableKey::Attribute,
                    Relationship::ManyMany,
                    false,
                ),
                text("Đơn vị mặc định", "unit_default"),
                number("Giá", "price"),
                number("VAT(%)", "vat_rate"),
            ],
        },
        TableDef {
            key: TableKey::OrderDetail,
            name: "Chi Tiết Đơn Hàng",
            db_table_name: None,
            description: "Chi tiết đơn hàng",
            icon: "🧾",
            fields: priced_detail_fields("Số đơn hàng chi tiết", "number_order_detail", true),
        },
        TableDef {
            key: TableKey::ImportSlipDetail,
            name: "Chi Tiết Phiếu Nhập",
            db_table_name: Some("import_slip_details"),
            description: "Bảng chi tiết phiếu nhập kho",
            icon: "📝",
            fields: priced_detail_fields("Số Chi Tiết Phiếu Nhập", "number_detail", false),
        },
        TableDef {
            key: TableKey::DeliveryNoteDetail,
            name: "Chi Tiết Phiếu Xuất",
            db_table_name: Some("delivery_note_details"),
            description: "Bảng chi tiết phiếu xuất kho",
            icon: "📤",
            fields: priced_detail_fields("Số Chi Tiết Phiếu Xuất", "number_detail", false),
        },
        TableDef {
            key: TableKey::Order,
            name: "Đơn Hàng",
            db_table_name: None,
            description: "Bảng lưu thông tin các đơn hàng",
            icon: "📦",
            fields: vec![
                field(
                    "Số đơn hàng",
                    "order_number",
                    FieldKind::Formula(
                        "concatenate('DH-', DATETIME_FORMAT(CREATED_TIME(), 'DDMMYYYY'), '-', AUTO_NUMBER())",
                    ),
                ),
                link(
                    "Khách Hàng",
                    "customer_link",
                    TableKey::Customer,
                    Relationship::ManyOne,
                    false,
                ),
                link(
                    "Chi Tiết Đơn Hàng",
                    "order_details",
                    TableKey::OrderDetail,
                    Relationship::OneMany,
                    false,
                ),
                text("Phương thức thanh toán", "payment_method"),
                text("Trạng thái", "status"),
                field("Xuất hoá đơn", "invoice_state", FieldKind::Checkbox),
                text("Mã hoá đơn", "invoice_code"),
                field("File hoá đơn", "invoice_file", FieldKind::Attachment),
            ],
        },
        TableDef {
            key: TableKey::ImportSlip,
            name: "Phiếu Nhập",
            db_table_name: Some("import_slips"),
            description: "Bảng quản lý phiếu nhập kho",
            icon: "📥",
            fields: vec![
                field(
                    "Mã phiếu nhập",
                    "import_slip_code",
                    FieldKind::Formula(
                        "concatenate('PN-', DATETIME_FORMAT(CREATED_TIME(), 'DDMMYYYY'), '-', AUTO_NUMBER())",
                    ),
                ),
                link(
                    "Chi tiết phiếu nhập",
                    "import_slip_details",
                    TableKey::ImportSlipDetail,
                    Relationship::OneMany,
                    false,
                ),
                link(
                    "Nhà cung cấp",
                    "supplier_link",
                    TableKey::Supplier,
                    Relationship::ManyOne,
                    false,
                ),
                field("Loại nhập", "import_type", FieldKind::SingleSelect(ImportType::LABELS)),
            ],
        },
        TableDef {
            key: TableKey::DeliveryNote,
            name: "Phiếu Xuất",
            db_table_name: Some("delivery_notes"),
            description: "Bảng quản lý phiếu xuất kho",
            icon: "📤",
            fields: vec![
                field(
                    "Mã phiếu xuất",
                    "delivery_note_code",
                    FieldKind::Formula(
                        "concatenate('PX-', DATETIME_FORMAT(CREATED_TIME(), 'DDMMYYYY'), '-', AUTO_NUMBER())",
                    ),
                ),
                link(
                    "Chi tiết phiếu xuất",
                    "delivery_note_details",
                    TableKey::DeliveryNoteDetail,
                    Relationship::OneMany,
                    false,
                ),
                link(
                    "Khách hàng",
                    "customer_link",
                    TableKey::Customer,
                    Relationship::ManyOne,
                    false,
                ),
                link("Đơn Hàng", "order_link", TableKey::Order, Relationship::ManyOne, false),
                field("Loại xuất", "delivery_type", FieldKind::SingleSelect(DeliveryType::LABELS)),
                field("Ghi chú", "notes", FieldKind::LongText),
            ],
        },
        TableDef {
            key: TableKey::InvoiceInfo,
            name: "Invoice Table",
            db_table_name: Some("invoice_table"),
            description: "Bảng lưu thông tin hóa đơn",
            icon: "🧾",
            fields: vec![
                field("Mã Hóa Đơn", "invoice_template", FieldKind::Text { unique: true }),
                text("Mã Mẫu", "template_code"),
                field("Sê-ri Hóa Đơn", "invoice_series", FieldKind::MultipleSelect),
            ],
        },
    ]
}

fn derived(
    table: TableKey,
    name: &'static str,
    db_name: &'static str,
    derivation: Derivation,
) -> DerivedField {
    DerivedField {
        table,
        name,
        db_name,
        derivation,
    }
}

fn retail_derived_fields() -> Vec<DerivedField> {
    let mut fields = Vec::new();

    // line amounts
    for table in [TableKey::OrderDetail, TableKey::ImportSlipDetail, TableKey::DeliveryNoteDetail] {
        fields.push(derived(
            table,
            "Tạm Tính",
            "temp_total",
            Derivation::Formula("{unit_price} * {quantity}"),
        ));
        fields.push(derived(
            table,
            "Tiền VAT",
            "vat_amount",
            Derivation::Formula("({unit_price} * {quantity}) * ({vat} / 100)"),
        ));
        fields.push(derived(
            table,
            "Thành Tiền",
            "final_total",
            Derivation::Formula("{temp_total} + {vat_amount}"),
        ));
    }

    // document totals
    for (main, details_link, detail) in [
        (TableKey::Order, "order_details", TableKey::OrderDetail),
        (TableKey::ImportSlip, "import_slip_details", TableKey::ImportSlipDetail),
        (TableKey::DeliveryNote, "delivery_note_details", TableKey::DeliveryNoteDetail),
    ] {
        for (name, db_name, source) in [
            ("Tổng Tạm Tính", "total_temp", "temp_total"),
            ("Tổng VAT", "total_vat", "vat_amount"),
            ("Tổng Sau VAT", "total_after_vat", "final_total"),
        ] {
            fields.push(derived(
                main,
                name,
                db_name,
                Derivation::Rollup {
                    link: LinkRef::Field(details_link),
                    foreign: detail,
                    field: source,
                },
            ));
        }
    }

    for table in [TableKey::Order, TableKey::DeliveryNote] {
        fields.push(derived(
            table,
            "Tên Khách Hàng",
            "customer_name",
            Derivation::Lookup {
                link: "customer_link",
                foreign: TableKey::Customer,
                field: "fullname",
                value_type: "singleLineText",
            },
        ));
        fields.push(derived(
            table,
            "Số Điện Thoại KH",
            "customer_phone",
            Derivation::Lookup {
                link: "customer_link",
                foreign: TableKey::Customer,
                field: "phone_number",
                value_type: "singleLineText",
            },
        ));
    }

    // stock movements expressed in the default unit
    for table in [TableKey::ImportSlipDetail, TableKey::DeliveryNoteDetail] {
        fields.push(derived(
            table,
            "Hệ số chuyển đổi",
            "conversion_factor_lookup",
            Derivation::Lookup {
                link: "unit_conversions",
                foreign: TableKey::UnitConversion,
                field: "conversion_factor",
                value_type: "number",
            },
        ));
        fields.push(derived(
            table,
            "Số lượng đơn vị mặc định",
            "quantity_unit_default",
            Derivation::Formula("{conversion_factor_lookup} * {quantity}"),
        ));
    }

    for (name, db_name, detail) in [
        ("Tổng nhập", "total_imported", TableKey::ImportSlipDetail),
        ("Tổng xuất", "total_exported", TableKey::DeliveryNoteDetail),
    ] {
        fields.push(derived(
            TableKey::Product,
            name,
            db_name,
            Derivation::Rollup {
                link: LinkRef::ReverseOf(detail),
                foreign: detail,
                field: "quantity_unit_default",
            },
        ));
    }
    fields.push(derived(
        TableKey::Product,
        "Tồn kho hiện tại",
        "inventory",
        Derivation::Formula(
            "IF(BLANK({total_imported}), 0, {total_imported}) - IF(BLANK({total_exported}), 0, {total_exported})",
        ),
    ));

    fields
}
