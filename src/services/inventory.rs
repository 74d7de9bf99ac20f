use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;
use tracing::instrument;

use crate::db::DbPool;
use crate::entities::{inventory_item, medicine};
use crate::errors::ServiceError;

/// Stock position of one medicine after a mutation
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StockLevel {
    pub medicine_id: i32,
    pub new_stock: i32,
    pub reorder_level: i32,
}

impl StockLevel {
    /// Boundary included: stock equal to the reorder level is a breach.
    pub fn is_breach(&self) -> bool {
        self.new_stock <= self.reorder_level
    }
}

/// Atomically subtract `quantity` from a medicine's stock.
///
/// The read-modify-write is a single conditional UPDATE
/// (`current_stock = current_stock - ? WHERE ... AND current_stock >= ?`),
/// so stock cannot go negative under concurrent sales. Runs on a plain
/// connection or inside an enclosing transaction.
pub async fn decrement_stock_on<C: ConnectionTrait>(
    conn: &C,
    medicine_id: i32,
    quantity: i32,
) -> Result<StockLevel, ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::ValidationError(
            "quantity must be positive".to_string(),
        ));
    }

    let result = inventory_item::Entity::update_many()
        .col_expr(
            inventory_item::Column::CurrentStock,
            Expr::col(inventory_item::Column::CurrentStock).sub(quantity),
        )
        .col_expr(inventory_item::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(inventory_item::Column::MedicineId.eq(medicine_id))
        .filter(inventory_item::Column::CurrentStock.gte(quantity))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        // Distinguish a missing item from an overdraft attempt
        let item = inventory_item::Entity::find()
            .filter(inventory_item::Column::MedicineId.eq(medicine_id))
            .one(conn)
            .await?;
        return match item {
            None => Err(ServiceError::NotFound(format!(
                "Inventory for medicine {} not found",
                medicine_id
            ))),
            Some(item) => Err(ServiceError::InsufficientStock(format!(
                "medicine {}: requested {}, available {}",
                medicine_id, quantity, item.current_stock
            ))),
        };
    }

    let updated = inventory_item::Entity::find()
        .filter(inventory_item::Column::MedicineId.eq(medicine_id))
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::InternalError(format!(
                "inventory row for medicine {} vanished after update",
                medicine_id
            ))
        })?;

    Ok(StockLevel {
        medicine_id,
        new_stock: updated.current_stock,
        reorder_level: updated.reorder_level,
    })
}

/// Fields of an inventory row that may be edited directly
#[derive(Debug, Default, Clone)]
pub struct UpdateInventoryItem {
    pub current_stock: Option<i32>,
    pub reorder_level: Option<i32>,
}

/// One low-stock line in the stats report
#[derive(Debug, Serialize)]
pub struct LowStockEntry {
    pub medicine_id: i32,
    pub medicine_name: String,
    pub category: String,
    pub current_stock: i32,
    pub reorder_level: i32,
}

/// Read-only inventory overview
#[derive(Debug, Serialize)]
pub struct InventoryStats {
    pub total_items: u64,
    pub low_stock_count: u64,
    pub low_stock: Vec<LowStockEntry>,
}

/// Service for tracking per-medicine stock
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list_items(&self) -> Result<Vec<inventory_item::Model>, ServiceError> {
        Ok(inventory_item::Entity::find()
            .order_by_asc(inventory_item::Column::Id)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, id: i32) -> Result<inventory_item::Model, ServiceError> {
        inventory_item::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn get_item_by_medicine(
        &self,
        medicine_id: i32,
    ) -> Result<inventory_item::Model, ServiceError> {
        inventory_item::Entity::find()
            .filter(inventory_item::Column::MedicineId.eq(medicine_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inventory for medicine {} not found", medicine_id))
            })
    }

    /// Edit stock and reorder level directly
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        id: i32,
        update: UpdateInventoryItem,
    ) -> Result<inventory_item::Model, ServiceError> {
        use sea_orm::{ActiveModelTrait, Set};

        if update.current_stock.map_or(false, |v| v < 0)
            || update.reorder_level.map_or(false, |v| v < 0)
        {
            return Err(ServiceError::ValidationError(
                "stock and reorder level cannot be negative".to_string(),
            ));
        }

        let item = self.get_item(id).await?;
        let mut active: inventory_item::ActiveModel = item.into();
        if let Some(stock) = update.current_stock {
            active.current_stock = Set(stock);
        }
        if let Some(level) = update.reorder_level {
            active.reorder_level = Set(level);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_item(&self, id: i32) -> Result<(), ServiceError> {
        let result = inventory_item::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Inventory item {} not found",
                id
            )));
        }
        Ok(())
    }

    /// All items at or below their reorder level, as a single filtered query.
    #[instrument(skip(self))]
    pub async fn get_low_stock(&self) -> Result<Vec<inventory_item::Model>, ServiceError> {
        Ok(inventory_item::Entity::find()
            .filter(
                Expr::col(inventory_item::Column::CurrentStock)
                    .lte(Expr::col(inventory_item::Column::ReorderLevel)),
            )
            .order_by_asc(inventory_item::Column::CurrentStock)
            .all(&*self.db_pool)
            .await?)
    }

    /// Atomically subtract stock; overdrafts are rejected.
    #[instrument(skip(self))]
    pub async fn decrement_stock(
        &self,
        medicine_id: i32,
        quantity: i32,
    ) -> Result<StockLevel, ServiceError> {
        decrement_stock_on(&*self.db_pool, medicine_id, quantity).await
    }

    /// Additive counterpart used by restocking
    #[instrument(skip(self))]
    pub async fn restock(
        &self,
        medicine_id: i32,
        quantity: i32,
    ) -> Result<StockLevel, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "quantity must be positive".to_string(),
            ));
        }

        let result = inventory_item::Entity::update_many()
            .col_expr(
                inventory_item::Column::CurrentStock,
                Expr::col(inventory_item::Column::CurrentStock).add(quantity),
            )
            .col_expr(inventory_item::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(inventory_item::Column::MedicineId.eq(medicine_id))
            .exec(&*self.db_pool)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Inventory for medicine {} not found",
                medicine_id
            )));
        }

        let updated = self.get_item_by_medicine(medicine_id).await?;
        Ok(StockLevel {
            medicine_id,
            new_stock: updated.current_stock,
            reorder_level: updated.reorder_level,
        })
    }

    /// Totals plus the categorized low-stock listing (joined with medicines)
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<InventoryStats, ServiceError> {
        let total_items = inventory_item::Entity::find()
            .count(&*self.db_pool)
            .await?;

        let low_rows = inventory_item::Entity::find()
            .find_also_related(medicine::Entity)
            .filter(
                Expr::col(inventory_item::Column::CurrentStock)
                    .lte(Expr::col(inventory_item::Column::ReorderLevel)),
            )
            .order_by_asc(inventory_item::Column::CurrentStock)
            .all(&*self.db_pool)
            .await?;

        let low_stock: Vec<LowStockEntry> = low_rows
            .into_iter()
            .filter_map(|(item, medicine)| {
                medicine.map(|m| LowStockEntry {
                    medicine_id: item.medicine_id,
                    medicine_name: m.name,
                    category: m.category,
                    current_stock: item.current_stock,
                    reorder_level: item.reorder_level,
                })
            })
            .collect();

        Ok(InventoryStats {
            low_stock_count: low_stock.len() as u64,
            total_items,
            low_stock,
        })
    }
}
