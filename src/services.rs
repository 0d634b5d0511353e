pub mod auth;
pub mod customer_service;
pub mod invoice_service;
pub mod order_service;
pub mod password;
pub mod plan_service;
pub mod product_service;
pub mod profile_service;
pub mod provisioning;
pub mod saga;
pub mod stock_service;
pub mod supplier_service;
pub mod totals;
pub mod transcription_service;
pub mod unit_conversion_service;

#[cfg(test)]
pub(crate) mod testing;
