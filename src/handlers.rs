pub mod auth;
pub mod customers;
pub mod invoices;
pub mod orders;
pub mod plan_status;
pub mod products;
pub mod stock;
pub mod suppliers;
pub mod transcription;
pub mod unit_conversions;
pub mod user;
