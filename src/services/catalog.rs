use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::instrument;

use crate::db::DbPool;
use crate::entities::{inventory_item, medicine, supplier};
use crate::errors::ServiceError;

const DEFAULT_REORDER_LEVEL: i32 = 10;

/// Input for creating a medicine
#[derive(Debug, Clone)]
pub struct CreateMedicine {
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub quantity: i32,
    pub batch_number: Option<String>,
    pub expiration_date: NaiveDate,
    pub supplier_id: Option<i32>,
    pub reorder_level: Option<i32>,
}

/// Partial update for a medicine. Double options distinguish "leave
/// unchanged" from "set to null".
#[derive(Debug, Default, Clone)]
pub struct UpdateMedicine {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub batch_number: Option<Option<String>>,
    pub expiration_date: Option<NaiveDate>,
    pub supplier_id: Option<Option<i32>>,
}

/// Service for the medicine catalog
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Create a medicine and provision its inventory item in one
    /// transaction. Initial stock equals the creation quantity; the reorder
    /// level defaults to 10 unless overridden.
    #[instrument(skip(self))]
    pub async fn create_medicine(
        &self,
        input: CreateMedicine,
    ) -> Result<(medicine::Model, inventory_item::Model), ServiceError> {
        if input.quantity < 0 {
            return Err(ServiceError::ValidationError(
                "quantity cannot be negative".to_string(),
            ));
        }
        if input.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "price cannot be negative".to_string(),
            ));
        }
        if input.reorder_level.map_or(false, |level| level < 0) {
            return Err(ServiceError::ValidationError(
                "reorder level cannot be negative".to_string(),
            ));
        }

        if let Some(supplier_id) = input.supplier_id {
            let exists = supplier::Entity::find_by_id(supplier_id)
                .one(&*self.db_pool)
                .await?
                .is_some();
            if !exists {
                return Err(ServiceError::ValidationError(format!(
                    "supplier {} does not exist",
                    supplier_id
                )));
            }
        }

        let txn = self.db_pool.begin().await?;
        let now = Utc::now();

        let created = medicine::ActiveModel {
            name: Set(input.name),
            category: Set(input.category),
            price: Set(input.price),
            quantity: Set(input.quantity),
            batch_number: Set(input.batch_number),
            expiration_date: Set(input.expiration_date),
            supplier_id: Set(input.supplier_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let item = inventory_item::ActiveModel {
            medicine_id: Set(created.id),
            current_stock: Set(input.quantity),
            reorder_level: Set(input.reorder_level.unwrap_or(DEFAULT_REORDER_LEVEL)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        Ok((created, item))
    }

    #[instrument(skip(self))]
    pub async fn list_medicines(&self) -> Result<Vec<medicine::Model>, ServiceError> {
        Ok(medicine::Entity::find()
            .order_by_asc(medicine::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get_medicine(&self, id: i32) -> Result<medicine::Model, ServiceError> {
        medicine::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Medicine {} not found", id)))
    }

    /// Medicines whose expiration date is strictly before today
    #[instrument(skip(self))]
    pub async fn list_expired(&self) -> Result<Vec<medicine::Model>, ServiceError> {
        let today = Utc::now().date_naive();
        Ok(medicine::Entity::find()
            .filter(medicine::Column::ExpirationDate.lt(today))
            .order_by_asc(medicine::Column::ExpirationDate)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn update_medicine(
        &self,
        id: i32,
        update: UpdateMedicine,
    ) -> Result<medicine::Model, ServiceError> {
        if update.price.map_or(false, |p| p < Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "price cannot be negative".to_string(),
            ));
        }
        if let Some(Some(supplier_id)) = update.supplier_id {
            let exists = supplier::Entity::find_by_id(supplier_id)
                .one(&*self.db_pool)
                .await?
                .is_some();
            if !exists {
                return Err(ServiceError::ValidationError(format!(
                    "supplier {} does not exist",
                    supplier_id
                )));
            }
        }

        let found = self.get_medicine(id).await?;
        let mut active: medicine::ActiveModel = found.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(category) = update.category {
            active.category = Set(category);
        }
        if let Some(price) = update.price {
            active.price = Set(price);
        }
        if let Some(batch_number) = update.batch_number {
            active.batch_number = Set(batch_number);
        }
        if let Some(expiration_date) = update.expiration_date {
            active.expiration_date = Set(expiration_date);
        }
        if let Some(supplier_id) = update.supplier_id {
            active.supplier_id = Set(supplier_id);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db_pool).await?)
    }

    /// Delete a medicine. The inventory item goes with it (cascade); sale
    /// history referencing the medicine blocks the delete.
    #[instrument(skip(self))]
    pub async fn delete_medicine(&self, id: i32) -> Result<(), ServiceError> {
        let result = medicine::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(|e| {
                if e.to_string().to_uppercase().contains("FOREIGN KEY") {
                    ServiceError::Conflict(format!(
                        "Medicine {} is referenced by sale history and cannot be deleted",
                        id
                    ))
                } else {
                    ServiceError::DatabaseError(e)
                }
            })?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Medicine {} not found", id)));
        }
        Ok(())
    }
}
