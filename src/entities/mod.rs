pub mod activity_log;
pub mod inventory_item;
pub mod medicine;
pub mod money;
pub mod notification;
pub mod purchase_order;
pub mod purchase_order_item;
pub mod sale;
pub mod sale_item;
pub mod supplier;
pub mod user;
