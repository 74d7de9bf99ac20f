use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tracing::{instrument, warn};

use crate::db::DbPool;
use crate::entities::notification::{self, NotificationType, Priority};
use crate::entities::user::{self, Role};
use crate::entities::medicine;
use crate::errors::ServiceError;
use crate::services::inventory::StockLevel;

const RECENT_COUNT: u64 = 10;

/// Alert priority for a breached stock level.
///
/// Zero stock is critical; at or below half the reorder level (integer
/// division) is high; anything else at or below the level is medium.
pub fn grade_priority(new_stock: i32, reorder_level: i32) -> Priority {
    if new_stock == 0 {
        Priority::Critical
    } else if new_stock <= reorder_level / 2 {
        Priority::High
    } else {
        Priority::Medium
    }
}

/// Service for creating and managing user notifications
#[derive(Clone)]
pub struct NotificationService {
    db_pool: Arc<DbPool>,
}

impl NotificationService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Fan a low-stock alert out to every active admin.
    ///
    /// A recipient is skipped when they already hold an unread low-stock
    /// notification for the same medicine. Returns the number of
    /// notifications created.
    #[instrument(skip(self))]
    pub async fn notify_low_stock(&self, level: StockLevel) -> Result<u64, ServiceError> {
        let medicine = medicine::Entity::find_by_id(level.medicine_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Medicine {} not found", level.medicine_id))
            })?;

        let admins = user::Entity::find()
            .filter(user::Column::Role.eq(Role::Admin))
            .filter(user::Column::IsActive.eq(true))
            .all(&*self.db_pool)
            .await?;

        let priority = grade_priority(level.new_stock, level.reorder_level);
        let title = format!("Low Stock Alert: {}", medicine.name);
        let message = format!(
            "{} is running low. Current stock: {}, reorder level: {}.",
            medicine.name, level.new_stock, level.reorder_level
        );

        let mut created = 0;
        for admin in admins {
            let already_alerted = notification::Entity::find()
                .filter(notification::Column::UserId.eq(admin.id))
                .filter(notification::Column::NotificationType.eq(NotificationType::LowStock))
                .filter(notification::Column::RelatedObjectId.eq(level.medicine_id))
                .filter(notification::Column::IsRead.eq(false))
                .count(&*self.db_pool)
                .await?
                > 0;
            if already_alerted {
                continue;
            }

            notification::ActiveModel {
                user_id: Set(admin.id),
                notification_type: Set(NotificationType::LowStock),
                title: Set(title.clone()),
                message: Set(message.clone()),
                priority: Set(priority),
                is_read: Set(false),
                related_object_id: Set(Some(level.medicine_id)),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(&*self.db_pool)
            .await?;
            created += 1;
        }

        Ok(created)
    }

    /// Low-stock alerts never fail the mutation that triggered them.
    pub async fn notify_low_stock_best_effort(&self, level: StockLevel) {
        if !level.is_breach() {
            return;
        }
        if let Err(e) = self.notify_low_stock(level).await {
            warn!(
                medicine_id = level.medicine_id,
                error = %e,
                "failed to create low-stock notifications"
            );
        }
    }

    /// All of a user's notifications, newest first
    #[instrument(skip(self))]
    pub async fn list_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<notification::Model>, ServiceError> {
        Ok(notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn unread_count(&self, user_id: i32) -> Result<u64, ServiceError> {
        Ok(notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(&*self.db_pool)
            .await?)
    }

    /// The user's ten most recent notifications
    #[instrument(skip(self))]
    pub async fn recent(&self, user_id: i32) -> Result<Vec<notification::Model>, ServiceError> {
        Ok(notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .limit(RECENT_COUNT)
            .all(&*self.db_pool)
            .await?)
    }

    /// Mark one of the user's notifications read
    #[instrument(skip(self))]
    pub async fn mark_read(
        &self,
        user_id: i32,
        notification_id: i32,
    ) -> Result<notification::Model, ServiceError> {
        let found = notification::Entity::find_by_id(notification_id)
            .filter(notification::Column::UserId.eq(user_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Notification {} not found", notification_id))
            })?;

        let mut active: notification::ActiveModel = found.into();
        active.is_read = Set(true);
        Ok(active.update(&*self.db_pool).await?)
    }

    /// Mark all of the user's notifications read; returns how many changed
    #[instrument(skip(self))]
    pub async fn mark_all_read(&self, user_id: i32) -> Result<u64, ServiceError> {
        let result = notification::Entity::update_many()
            .col_expr(
                notification::Column::IsRead,
                sea_orm::sea_query::Expr::value(true),
            )
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(&*self.db_pool)
            .await?;
        Ok(result.rows_affected)
    }

    /// Delete all of the user's read notifications; returns how many
    #[instrument(skip(self))]
    pub async fn delete_read(&self, user_id: i32) -> Result<u64, ServiceError> {
        let result = notification::Entity::delete_many()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(true))
            .exec(&*self.db_pool)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 10 => Priority::Critical ; "zero stock is critical")]
    #[test_case(5, 10 => Priority::High ; "at half level is high")]
    #[test_case(3, 10 => Priority::High ; "below half level is high")]
    #[test_case(6, 10 => Priority::Medium ; "above half level is medium")]
    #[test_case(10, 10 => Priority::Medium ; "at level is medium")]
    #[test_case(1, 3 => Priority::High ; "integer division rounds down")]
    fn priority_grading(new_stock: i32, reorder_level: i32) -> Priority {
        grade_priority(new_stock, reorder_level)
    }
}
