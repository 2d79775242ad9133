pub mod chat;
pub mod config;
pub mod ledger;
pub mod models;
pub mod pricing;
