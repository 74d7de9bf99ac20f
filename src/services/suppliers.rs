use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::instrument;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::supplier;
use crate::errors::ServiceError;

/// Input for registering a supplier
#[derive(Debug, Clone, Validate)]
pub struct CreateSupplier {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: String,
    pub contact_info: Option<String>,
    pub address: Option<String>,
    #[validate(email(message = "invalid email address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Partial update for a supplier. Double options distinguish "leave
/// unchanged" from "set to null".
#[derive(Debug, Default, Clone)]
pub struct UpdateSupplier {
    pub name: Option<String>,
    pub contact_info: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
}

/// Service for the supplier registry. Deletion is soft: suppliers are
/// deactivated so purchase history stays intact.
#[derive(Clone)]
pub struct SupplierService {
    db_pool: Arc<DbPool>,
}

impl SupplierService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn create_supplier(
        &self,
        input: CreateSupplier,
    ) -> Result<supplier::Model, ServiceError> {
        input.validate()?;

        Ok(supplier::ActiveModel {
            name: Set(input.name),
            contact_info: Set(input.contact_info),
            address: Set(input.address),
            email: Set(input.email),
            phone: Set(input.phone),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?)
    }

    /// Active suppliers by default; `include_inactive` widens to all.
    #[instrument(skip(self))]
    pub async fn list_suppliers(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<supplier::Model>, ServiceError> {
        let mut select = supplier::Entity::find().order_by_asc(supplier::Column::Name);
        if !include_inactive {
            select = select.filter(supplier::Column::IsActive.eq(true));
        }
        Ok(select.all(&*self.db_pool).await?)
    }

    /// Lookup by id regardless of active flag
    #[instrument(skip(self))]
    pub async fn get_supplier(&self, id: i32) -> Result<supplier::Model, ServiceError> {
        supplier::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Supplier {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn update_supplier(
        &self,
        id: i32,
        update: UpdateSupplier,
    ) -> Result<supplier::Model, ServiceError> {
        if update.name.as_deref().map_or(false, |n| n.trim().is_empty()) {
            return Err(ServiceError::ValidationError(
                "name cannot be empty".to_string(),
            ));
        }

        let found = self.get_supplier(id).await?;
        let mut active: supplier::ActiveModel = found.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(contact_info) = update.contact_info {
            active.contact_info = Set(contact_info);
        }
        if let Some(address) = update.address {
            active.address = Set(address);
        }
        if let Some(email) = update.email {
            active.email = Set(email);
        }
        if let Some(phone) = update.phone {
            active.phone = Set(phone);
        }
        Ok(active.update(&*self.db_pool).await?)
    }

    /// Soft delete: mark the supplier inactive. Medicines and purchase
    /// orders keep their references.
    #[instrument(skip(self))]
    pub async fn deactivate_supplier(&self, id: i32) -> Result<supplier::Model, ServiceError> {
        let found = self.get_supplier(id).await?;
        let mut active: supplier::ActiveModel = found.into();
        active.is_active = Set(false);
        Ok(active.update(&*self.db_pool).await?)
    }

    /// Reverse a soft delete
    #[instrument(skip(self))]
    pub async fn reactivate_supplier(&self, id: i32) -> Result<supplier::Model, ServiceError> {
        let found = self.get_supplier(id).await?;
        let mut active: supplier::ActiveModel = found.into();
        active.is_active = Set(true);
        Ok(active.update(&*self.db_pool).await?)
    }
}
