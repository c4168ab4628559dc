use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::config::Config;
use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};

/// Subject prefix for accounts created before their owner ever logged in
pub const SEED_SUBJECT_PREFIX: &str = "seed|";

pub async fn connect(config: &Config) -> AppResult<DatabaseConnection> {
    Database::connect(&config.database_url)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to connect to database: {}", e)))
}

/// Seed a manager account for `email` if no user has it yet.
/// The placeholder subject is replaced on that person's first sync.
pub async fn seed_manager(db: &DatabaseConnection, email: &str) -> AppResult<()> {
    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    let now = Utc::now();
    let manager = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        auth_subject: Set(format!("{}{}", SEED_SUBJECT_PREFIX, email)),
        email: Set(email.to_string()),
        name: Set(None),
        role: Set(UserRole::Manager),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    manager.insert(db).await?;
    tracing::info!("Manager account seeded: {}", email);
    Ok(())
}
