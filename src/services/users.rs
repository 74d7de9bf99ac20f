use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::instrument;

use crate::db::DbPool;
use crate::entities::user::{self, Role};
use crate::errors::ServiceError;

/// Partial update for a user account. Password changes go through the auth
/// service so hashing stays in one place.
#[derive(Debug, Default, Clone)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Service for administering user accounts
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<user::Model>, ServiceError> {
        Ok(user::Entity::find()
            .order_by_asc(user::Column::Username)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, id: i32) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn update_user(
        &self,
        id: i32,
        update: UpdateUser,
    ) -> Result<user::Model, ServiceError> {
        if update
            .username
            .as_deref()
            .map_or(false, |u| u.trim().is_empty())
        {
            return Err(ServiceError::ValidationError(
                "username cannot be empty".to_string(),
            ));
        }

        let found = self.get_user(id).await?;

        if let Some(username) = update.username.as_deref() {
            let taken = user::Entity::find()
                .filter(user::Column::Username.eq(username))
                .filter(user::Column::Id.ne(id))
                .one(&*self.db_pool)
                .await?
                .is_some();
            if taken {
                return Err(ServiceError::Conflict(format!(
                    "username '{}' is already taken",
                    username
                )));
            }
        }

        let mut active: user::ActiveModel = found.into();
        if let Some(username) = update.username {
            active.username = Set(username);
        }
        if let Some(email) = update.email {
            active.email = Set(email);
        }
        if let Some(role) = update.role {
            active.role = Set(role);
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db_pool).await?)
    }

    /// Hard delete. Refresh tokens, notifications and activity entries go
    /// with the account (cascade).
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: i32) -> Result<(), ServiceError> {
        let result = user::Entity::delete_by_id(id).exec(&*self.db_pool).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }
}
