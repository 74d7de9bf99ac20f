// Core services
pub mod activity;
pub mod catalog;
pub mod inventory;
pub mod invoicing;
pub mod notifications;
pub mod purchase_orders;
pub mod sales;
pub mod suppliers;
pub mod users;
