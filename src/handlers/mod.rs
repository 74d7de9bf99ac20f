pub mod activity_logs;
pub mod common;
pub mod inventory;
pub mod medicines;
pub mod notifications;
pub mod purchase_orders;
pub mod reports;
pub mod sales;
pub mod suppliers;
pub mod users;

use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::services::activity::ActivityService;
use crate::services::catalog::CatalogService;
use crate::services::inventory::InventoryService;
use crate::services::invoicing::InvoiceService;
use crate::services::notifications::NotificationService;
use crate::services::purchase_orders::PurchaseOrderService;
use crate::services::sales::SaleService;
use crate::services::suppliers::SupplierService;
use crate::services::users::UserService;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: CatalogService,
    pub inventory: InventoryService,
    pub sales: SaleService,
    pub invoicing: InvoiceService,
    pub suppliers: SupplierService,
    pub purchase_orders: PurchaseOrderService,
    pub users: UserService,
    pub notifications: NotificationService,
    pub activity: ActivityService,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            catalog: CatalogService::new(db_pool.clone()),
            inventory: InventoryService::new(db_pool.clone()),
            sales: SaleService::new(db_pool.clone()),
            invoicing: InvoiceService::new(db_pool.clone()),
            suppliers: SupplierService::new(db_pool.clone()),
            purchase_orders: PurchaseOrderService::new(db_pool.clone()),
            users: UserService::new(db_pool.clone()),
            notifications: NotificationService::new(db_pool.clone()),
            activity: ActivityService::new(db_pool),
        }
    }
}

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: AppConfig,
    pub services: AppServices,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: AppConfig, auth: Arc<AuthService>) -> Self {
        Self {
            services: AppServices::new(db.clone()),
            db,
            config,
            auth,
        }
    }
}
