// src/models/products.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::{
    customers::default_limit,
    teable::Record,
    unit_conversions::{UnitConversionData, UnitConversionPayload},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductPayload {
    #[validate(length(min = 1, message = "Tên sản phẩm không được để trống"))]
    #[schema(example = "Bia Tiger")]
    pub product_name: String,

    /// Ids of existing unit conversion records.
    #[serde(default)]
    pub unit_conversions: Vec<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct FindProductsQuery {
    pub name: String,
    pub category: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductWithUnitsPayload {
    #[validate(length(min = 1, message = "Tên sản phẩm không được để trống"))]
    pub product_name: String,

    #[validate(length(min = 1, message = "Cần ít nhất một đơn vị tính"), nested)]
    pub unit_conversions: Vec<UnitConversionPayload>,

    pub catalogs_ids: Option<Vec<String>>,
    pub attributes_ids: Option<Vec<String>>,
    pub brand_id: Option<String>,
}

/// How a product carries its price: inline on the product row, or through unit-conversion children.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductPricing {
    Flat {
        unit: String,
        price: Decimal,
        vat: Decimal,
    },
    Multi(Vec<UnitSpec>),
}

/// Owned copy of one unit to create.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSpec {
    pub name_unit: String,
    pub conversion_factor: Decimal,
    pub unit_default: String,
    pub price: Decimal,
    pub vat: Decimal,
}

impl From<&UnitConversionPayload> for UnitSpec {
    fn from(p: &UnitConversionPayload) -> Self {
        Self {
            name_unit: p.name_unit.clone(),
            conversion_factor: p.conversion_factor,
            unit_default: p.unit_default.clone(),
            price: p.price,
            vat: p.vat,
        }
    }
}

impl ProductPricing {
    /// A single unit is flattened onto the product row.
    pub fn from_units(units: &[UnitConversionPayload]) -> Option<Self> {
        match units {
            [] => None,
            [only] => Some(ProductPricing::Flat {
                unit: only.name_unit.clone(),
                price: only.price,
                vat: only.vat,
            }),
            many => Some(ProductPricing::Multi(many.iter().map(Into::into).collect())),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductData {
    pub product_id: String,
    pub product_name: String,
    pub unit_conversions: Vec<String>,
}

impl From<&Record> for ProductData {
    fn from(record: &Record) -> Self {
        Self {
            product_id: record.id.clone(),
            product_name: record.text_or_default("product_name"),
            unit_conversions: record.link_ids("unit_conversions"),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateProductResponse {
    pub status: String,
    pub detail: String,
    pub product_id: String,
    pub product_data: ProductData,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FindProductsResponse {
    pub status: String,
    pub detail: String,
    pub products: Vec<ProductData>,
    pub total_found: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductWithUnitsData {
    pub product_id: String,
    pub product_name: String,
    pub brand_id: Option<String>,
    pub catalogs_ids: Vec<String>,
    pub attributes_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_conversions: Option<Vec<UnitConversionData>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    /// Fraction, as stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<f64>)]
    pub vat_rate: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateProductWithUnitsResponse {
    pub status: String,
    pub detail: String,
    pub product_id: String,
    pub product_data: ProductWithUnitsData,
}
