//! # Currency Repository
//!
//! Currencies and the single default currency.
//!
//! ## Default Currency Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  • Exactly one row has is_default = 1 (partial unique index)           │
//! │  • default() get-or-creates USD when none is flagged                   │
//! │  • Promoting a currency demotes the previous default in the same tx    │
//! │  • The default can't be demoted directly or deleted                    │
//! │  • Deleting another currency:                                          │
//! │      - refused while a cash register holds it                          │
//! │      - events and catalogue rows are repointed to the default          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use salon_core::validation::{validate_currency_code, validate_currency_name};
use salon_core::{CoreError, Currency, Page, Pagination, DEFAULT_CURRENCY_CODE, DEFAULT_CURRENCY_NAME};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{fetch_page, generate_id, like, require, search};
use crate::error::{DbError, DbResult};

/// Search form for the currency list.
#[derive(Debug, Clone, Default)]
pub struct CurrencyFilter {
    pub code: Option<String>,
    pub name: Option<String>,
    pub is_default: Option<bool>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct CurrencyUpdate {
    pub code: Option<String>,
    pub name: Option<String>,
    pub is_default: Option<bool>,
}

/// Tables whose `currency_id` is repointed when a currency is deleted.
const CURRENCY_REFERENCES: [&str; 6] = [
    "payments",
    "transalons",
    "shaves",
    "items",
    "item_purchases",
    "hairstyles",
];

#[derive(Debug, Clone)]
pub struct CurrencyRepository {
    pool: SqlitePool,
}

impl CurrencyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CurrencyRepository { pool }
    }

    /// Creates a currency. `is_default` demotes the current default.
    pub async fn create(&self, code: &str, name: &str, is_default: bool) -> DbResult<Currency> {
        let code = validate_currency_code(code)?;
        let name = validate_currency_name(name)?;

        let mut tx = self.pool.begin().await?;
        let currency = insert(&mut tx, &code, &name, is_default).await?;
        tx.commit().await?;

        info!(code = %currency.code, is_default = currency.is_default, "Currency created");
        Ok(currency)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Currency> {
        require(&self.pool, "currencies", "Currency", id).await
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Currency>> {
        let currency = sqlx::query_as::<_, Currency>("SELECT * FROM currencies WHERE code = ?1")
            .bind(code.trim().to_ascii_uppercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(currency)
    }

    /// The default currency, created as USD on first use.
    pub async fn default(&self) -> DbResult<Currency> {
        let mut tx = self.pool.begin().await?;
        let currency = default_in(&mut tx).await?;
        tx.commit().await?;
        Ok(currency)
    }

    pub async fn list(&self, filter: &CurrencyFilter, pagination: Pagination) -> DbResult<Page<Currency>> {
        debug!(?filter, "Listing currencies");
        let code = search("code", filter.code.as_deref())?;
        let name = search("name", filter.name.as_deref())?;

        fetch_page(&self.pool, "currencies", "code ASC", pagination, |qb| {
            if let Some(code) = &code {
                qb.push(" AND code LIKE ");
                qb.push_bind(like(&code.to_ascii_uppercase()));
            }
            if let Some(name) = &name {
                qb.push(" AND name LIKE ");
                qb.push_bind(like(name));
            }
            if let Some(is_default) = filter.is_default {
                qb.push(" AND is_default = ");
                qb.push_bind(is_default);
            }
        })
        .await
    }

    pub async fn update(&self, id: &str, update: CurrencyUpdate) -> DbResult<Currency> {
        let mut tx = self.pool.begin().await?;
        let current: Currency = require(&mut *tx, "currencies", "Currency", id).await?;

        let code = match &update.code {
            Some(code) => validate_currency_code(code)?,
            None => current.code.clone(),
        };
        let name = match &update.name {
            Some(name) => validate_currency_name(name)?,
            None => current.name.clone(),
        };
        let is_default = update.is_default.unwrap_or(current.is_default);

        if current.is_default && !is_default {
            return Err(CoreError::DefaultCurrencyLocked.into());
        }
        if is_default && !current.is_default {
            demote_default(&mut tx).await?;
        }

        sqlx::query(
            "UPDATE currencies SET code = ?2, name = ?3, is_default = ?4, updated_at = ?5 WHERE id = ?1",
        )
        .bind(id)
        .bind(&code)
        .bind(&name)
        .bind(is_default)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let updated: Currency = require(&mut *tx, "currencies", "Currency", id).await?;
        tx.commit().await?;

        debug!(id = %id, code = %updated.code, "Currency updated");
        Ok(updated)
    }

    /// Deletes a non-default currency that no cash register holds.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let currency: Currency = require(&mut *tx, "currencies", "Currency", id).await?;

        if currency.is_default {
            return Err(CoreError::DefaultCurrencyLocked.into());
        }

        let registers: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cash_registers WHERE currency_id = ?1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if registers > 0 {
            return Err(DbError::in_use(
                "Currency",
                &currency.code,
                format!("held by {} cash register(s)", registers),
            ));
        }

        let fallback = default_in(&mut tx).await?;
        for table in CURRENCY_REFERENCES {
            let sql = format!("UPDATE {} SET currency_id = ?2 WHERE currency_id = ?1", table);
            sqlx::query(&sql)
                .bind(id)
                .bind(&fallback.id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM currencies WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(code = %currency.code, fallback = %fallback.code, "Currency deleted");
        Ok(())
    }
}

// =============================================================================
// Connection-level helpers
// =============================================================================

async fn insert(
    conn: &mut SqliteConnection,
    code: &str,
    name: &str,
    is_default: bool,
) -> DbResult<Currency> {
    if is_default {
        demote_default(conn).await?;
    }

    let now = Utc::now();
    let currency = Currency {
        id: generate_id(),
        code: code.to_string(),
        name: name.to_string(),
        is_default,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO currencies (id, code, name, is_default, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&currency.id)
    .bind(&currency.code)
    .bind(&currency.name)
    .bind(currency.is_default)
    .bind(currency.created_at)
    .bind(currency.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } if field.contains("code") => {
            DbError::duplicate("code", code)
        }
        DbError::UniqueViolation { field, .. } if field.contains("name") => {
            DbError::duplicate("name", name)
        }
        other => other,
    })?;

    Ok(currency)
}

async fn demote_default(conn: &mut SqliteConnection) -> DbResult<()> {
    sqlx::query("UPDATE currencies SET is_default = 0, updated_at = ?1 WHERE is_default = 1")
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// The default currency on an open connection, get-or-create.
///
/// An existing USD row without the flag is promoted rather than duplicated.
pub(crate) async fn default_in(conn: &mut SqliteConnection) -> DbResult<Currency> {
    if let Some(currency) =
        sqlx::query_as::<_, Currency>("SELECT * FROM currencies WHERE is_default = 1")
            .fetch_optional(&mut *conn)
            .await?
    {
        return Ok(currency);
    }

    let existing = sqlx::query_as::<_, Currency>("SELECT * FROM currencies WHERE code = ?1")
        .bind(DEFAULT_CURRENCY_CODE)
        .fetch_optional(&mut *conn)
        .await?;

    match existing {
        Some(mut usd) => {
            sqlx::query("UPDATE currencies SET is_default = 1, updated_at = ?2 WHERE id = ?1")
                .bind(&usd.id)
                .bind(Utc::now())
                .execute(&mut *conn)
                .await?;
            usd.is_default = true;
            info!(code = %usd.code, "Promoted existing currency to default");
            Ok(usd)
        }
        None => {
            info!(code = DEFAULT_CURRENCY_CODE, "Creating default currency");
            insert(conn, DEFAULT_CURRENCY_CODE, DEFAULT_CURRENCY_NAME, true).await
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
