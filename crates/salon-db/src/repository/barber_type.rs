//! Barber types (junior, senior, stylist...), a global catalogue.

use chrono::Utc;
use salon_core::validation::validate_name;
use salon_core::{BarberType, Page, Pagination};
use sqlx::SqlitePool;
use tracing::info;

use super::{fetch_page, generate_id, require};
use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct BarberTypeRepository {
    pool: SqlitePool,
}

impl BarberTypeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BarberTypeRepository { pool }
    }

    pub async fn create(&self, name: &str, description: &str) -> DbResult<BarberType> {
        let now = Utc::now();
        let barber_type = BarberType {
            id: generate_id(),
            name: validate_name(name)?,
            description: description.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO barber_types (id, name, description, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&barber_type.id)
        .bind(&barber_type.name)
        .bind(&barber_type.description)
        .bind(barber_type.created_at)
        .bind(barber_type.updated_at)
        .execute(&self.pool)
        .await?;

        info!(name = %barber_type.name, "Barber type created");
        Ok(barber_type)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<BarberType> {
        require(&self.pool, "barber_types", "BarberType", id).await
    }

    pub async fn list(&self, pagination: Pagination) -> DbResult<Page<BarberType>> {
        fetch_page(&self.pool, "barber_types", "name ASC", pagination, |_| {}).await
    }
}
