use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::instrument;

use crate::db::DbPool;
use crate::entities::purchase_order::{self, PoStatus};
use crate::entities::{purchase_order_item, supplier};
use crate::errors::ServiceError;

/// One requested purchase order line. The medicine name is free text so
/// orders can cover products not yet in the catalog.
#[derive(Debug, Clone)]
pub struct CreatePurchaseOrderItem {
    pub medicine_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Input for placing a purchase order
#[derive(Debug, Clone)]
pub struct CreatePurchaseOrder {
    pub supplier_id: i32,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
    /// When absent, computed as the sum of line subtotals
    pub total_amount: Option<Decimal>,
    pub items: Vec<CreatePurchaseOrderItem>,
}

/// Partial update for a purchase order; line items are fixed at creation.
#[derive(Debug, Default, Clone)]
pub struct UpdatePurchaseOrder {
    pub status: Option<PoStatus>,
    pub expected_delivery: Option<Option<NaiveDate>>,
    pub notes: Option<Option<String>>,
    pub total_amount: Option<Decimal>,
}

/// A purchase order together with its line items
#[derive(Debug, Serialize)]
pub struct PurchaseOrderWithItems {
    #[serde(flatten)]
    pub order: purchase_order::Model,
    pub items: Vec<purchase_order_item::Model>,
}

/// Service for supplier purchase orders
#[derive(Clone)]
pub struct PurchaseOrderService {
    db_pool: Arc<DbPool>,
}

impl PurchaseOrderService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Place an order with its items in one transaction. New orders start
    /// in the pending status.
    #[instrument(skip(self))]
    pub async fn create_order(
        &self,
        input: CreatePurchaseOrder,
    ) -> Result<PurchaseOrderWithItems, ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "a purchase order needs at least one item".to_string(),
            ));
        }
        for line in &input.items {
            if line.medicine_name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "item names cannot be empty".to_string(),
                ));
            }
            if line.quantity <= 0 {
                return Err(ServiceError::ValidationError(
                    "item quantities must be positive".to_string(),
                ));
            }
            if line.unit_price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "unit prices cannot be negative".to_string(),
                ));
            }
        }

        let supplier = supplier::Entity::find_by_id(input.supplier_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "supplier {} does not exist",
                    input.supplier_id
                ))
            })?;
        if !supplier.is_active {
            return Err(ServiceError::ValidationError(format!(
                "supplier {} is inactive",
                supplier.id
            )));
        }

        let computed_total: Decimal = input
            .items
            .iter()
            .map(|line| line.unit_price * Decimal::from(line.quantity))
            .sum();
        let total_amount = input.total_amount.unwrap_or(computed_total);

        let txn = self.db_pool.begin().await?;

        let created = purchase_order::ActiveModel {
            supplier_id: Set(input.supplier_id),
            order_date: Set(Utc::now()),
            expected_delivery: Set(input.expected_delivery),
            status: Set(PoStatus::Pending),
            total_amount: Set(total_amount),
            notes: Set(input.notes),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(input.items.len());
        for line in input.items {
            let item = purchase_order_item::ActiveModel {
                purchase_order_id: Set(created.id),
                medicine_name: Set(line.medicine_name),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }

        txn.commit().await?;

        Ok(PurchaseOrderWithItems {
            order: created,
            items,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, id: i32) -> Result<PurchaseOrderWithItems, ServiceError> {
        let order = purchase_order::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Purchase order {} not found", id)))?;
        let items = purchase_order_item::Entity::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(id))
            .all(&*self.db_pool)
            .await?;
        Ok(PurchaseOrderWithItems { order, items })
    }

    /// All orders, newest first, optionally narrowed to one status
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        status: Option<PoStatus>,
    ) -> Result<Vec<PurchaseOrderWithItems>, ServiceError> {
        let mut select = purchase_order::Entity::find()
            .find_with_related(purchase_order_item::Entity)
            .order_by_desc(purchase_order::Column::OrderDate);
        if let Some(status) = status {
            select = select.filter(purchase_order::Column::Status.eq(status));
        }
        let rows = select.all(&*self.db_pool).await?;
        Ok(rows
            .into_iter()
            .map(|(order, items)| PurchaseOrderWithItems { order, items })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn update_order(
        &self,
        id: i32,
        update: UpdatePurchaseOrder,
    ) -> Result<PurchaseOrderWithItems, ServiceError> {
        if update.total_amount.map_or(false, |t| t < Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "total amount cannot be negative".to_string(),
            ));
        }

        let order = purchase_order::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Purchase order {} not found", id)))?;

        let mut active: purchase_order::ActiveModel = order.into();
        if let Some(status) = update.status {
            active.status = Set(status);
        }
        if let Some(expected_delivery) = update.expected_delivery {
            active.expected_delivery = Set(expected_delivery);
        }
        if let Some(notes) = update.notes {
            active.notes = Set(notes);
        }
        if let Some(total_amount) = update.total_amount {
            active.total_amount = Set(total_amount);
        }
        let updated = active.update(&*self.db_pool).await?;

        let items = purchase_order_item::Entity::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(id))
            .all(&*self.db_pool)
            .await?;
        Ok(PurchaseOrderWithItems {
            order: updated,
            items,
        })
    }

    /// Delete an order and (via cascade) its items
    #[instrument(skip(self))]
    pub async fn delete_order(&self, id: i32) -> Result<(), ServiceError> {
        let result = purchase_order::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Purchase order {} not found",
                id
            )));
        }
        Ok(())
    }
}
