pub mod auth;
pub mod customers;
pub mod invoices;
pub mod orders;
pub mod plan;
pub mod products;
pub mod profile;
pub mod stock;
pub mod suppliers;
pub mod teable;
pub mod tenant;
pub mod transcription;
pub mod unit_conversions;
