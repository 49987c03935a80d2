//! # Payment Type Repository
//!
//! Global catalogue of payout kinds (salary, bonus, advance...). A type used
//! by any payment can't be deleted.

use chrono::Utc;
use salon_core::validation::validate_name;
use salon_core::{Page, Pagination, PaymentType, DEFAULT_PAYMENT_TYPE};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{fetch_page, generate_id, like, require, search};
use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct PaymentTypeRepository {
    pool: SqlitePool,
}

impl PaymentTypeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentTypeRepository { pool }
    }

    pub async fn create(&self, name: &str, description: &str) -> DbResult<PaymentType> {
        let name = validate_name(name)?;
        let mut conn = self.pool.acquire().await?;
        let payment_type = insert(&mut conn, &name, description.trim()).await?;

        info!(name = %payment_type.name, "Payment type created");
        Ok(payment_type)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<PaymentType> {
        require(&self.pool, "payment_types", "PaymentType", id).await
    }

    /// Name contains `query` (case-insensitive through SQLite's LIKE).
    pub async fn list(&self, query: Option<&str>, pagination: Pagination) -> DbResult<Page<PaymentType>> {
        let query = search("q", query)?;
        fetch_page(&self.pool, "payment_types", "name ASC", pagination, |qb| {
            if let Some(q) = &query {
                qb.push(" AND name LIKE ");
                qb.push_bind(like(q));
            }
        })
        .await
    }

    pub async fn update(
        &self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
        is_active: Option<bool>,
    ) -> DbResult<PaymentType> {
        let current = self.get_by_id(id).await?;
        let name = match name {
            Some(n) => validate_name(n)?,
            None => current.name,
        };
        let description = description.map(|d| d.trim().to_string()).unwrap_or(current.description);
        let is_active = is_active.unwrap_or(current.is_active);

        sqlx::query(
            "UPDATE payment_types SET name = ?2, description = ?3, is_active = ?4, updated_at = ?5 \
             WHERE id = ?1",
        )
        .bind(id)
        .bind(&name)
        .bind(&description)
        .bind(is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("name", &name),
            other => other,
        })?;

        debug!(id = %id, "Payment type updated");
        self.get_by_id(id).await
    }

    /// Refused while any payment references the type.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let payment_type = self.get_by_id(id).await?;

        let used: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE payment_type_id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        if used > 0 {
            return Err(DbError::in_use(
                "PaymentType",
                &payment_type.name,
                format!("used by {} payment(s)", used),
            ));
        }

        sqlx::query("DELETE FROM payment_types WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        info!(name = %payment_type.name, "Payment type deleted");
        Ok(())
    }

    /// The `SALARY` type, created on first use.
    pub async fn default_salary(&self) -> DbResult<PaymentType> {
        let mut conn = self.pool.acquire().await?;
        default_in(&mut conn).await
    }
}

async fn insert(conn: &mut SqliteConnection, name: &str, description: &str) -> DbResult<PaymentType> {
    let now = Utc::now();
    let payment_type = PaymentType {
        id: generate_id(),
        name: name.to_string(),
        description: description.to_string(),
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO payment_types (id, name, description, is_active, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&payment_type.id)
    .bind(&payment_type.name)
    .bind(&payment_type.description)
    .bind(payment_type.is_active)
    .bind(payment_type.created_at)
    .bind(payment_type.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { .. } => DbError::duplicate("name", name),
        other => other,
    })?;

    Ok(payment_type)
}

/// The default payment type on an open connection, get-or-create.
pub(crate) async fn default_in(conn: &mut SqliteConnection) -> DbResult<PaymentType> {
    let existing = sqlx::query_as::<_, PaymentType>("SELECT * FROM payment_types WHERE name = ?1")
        .bind(DEFAULT_PAYMENT_TYPE)
        .fetch_optional(&mut *conn)
        .await?;

    match existing {
        Some(payment_type) => Ok(payment_type),
        None => {
            info!(name = DEFAULT_PAYMENT_TYPE, "Creating default payment type");
            insert(conn, DEFAULT_PAYMENT_TYPE, "Regular salary").await
        }
    }
}
