//! # Transalon Repository
//!
//! Free-form salon transactions: named incomes and expenses on a register.
//! Names are unique per salon.

use chrono::{NaiveDate, Utc};
use salon_core::ledger::Direction;
use salon_core::validation::{validate_name, validate_optional_date_range, validate_positive_amount};
use salon_core::{ExchangeRate, Money, Page, Pagination, TransactionKind, Transalon};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::booking::{self, Priced};
use super::{fetch_page, generate_id, like, require, require_scoped, search};
use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct NewTransalon {
    pub name: String,
    pub amount: Money,
    pub currency_id: Option<String>,
    pub exchange_rate: ExchangeRate,
    pub transaction_date: NaiveDate,
    pub kind: TransactionKind,
    pub cash_register_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct TransalonFilter {
    pub name: Option<String>,
    pub kind: Option<TransactionKind>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

struct Resolved {
    name: String,
    register_id: String,
    priced: Priced,
    booked_cents: i64,
}

#[derive(Debug, Clone)]
pub struct TransalonRepository {
    pool: SqlitePool,
}

impl TransalonRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransalonRepository { pool }
    }

    pub async fn create(&self, salon_id: &str, input: NewTransalon) -> DbResult<Transalon> {
        let mut tx = self.pool.begin().await?;
        let resolved = resolve_and_book(&mut tx, salon_id, &input).await?;

        let now = Utc::now();
        let transalon = Transalon {
            id: generate_id(),
            name: resolved.name,
            amount_cents: input.amount.cents(),
            currency_id: resolved.priced.currency.id.clone(),
            exchange_rate_micros: resolved.priced.rate.micros(),
            amount_in_default_cents: resolved.priced.amount_in_default.cents(),
            transaction_date: input.transaction_date,
            kind: input.kind,
            cash_register_id: resolved.register_id,
            booked_cents: resolved.booked_cents,
            salon_id: salon_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO transalons (id, name, amount_cents, currency_id, exchange_rate_micros, \
             amount_in_default_cents, transaction_date, kind, cash_register_id, booked_cents, \
             salon_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .bind(&transalon.id)
        .bind(&transalon.name)
        .bind(transalon.amount_cents)
        .bind(&transalon.currency_id)
        .bind(transalon.exchange_rate_micros)
        .bind(transalon.amount_in_default_cents)
        .bind(transalon.transaction_date)
        .bind(transalon.kind)
        .bind(&transalon.cash_register_id)
        .bind(transalon.booked_cents)
        .bind(&transalon.salon_id)
        .bind(transalon.created_at)
        .bind(transalon.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("name", &transalon.name),
            other => other,
        })?;
        tx.commit().await?;

        info!(
            transalon_id = %transalon.id,
            kind = transalon.kind.as_str(),
            booked_cents = transalon.booked_cents,
            "Transaction created"
        );
        Ok(transalon)
    }

    pub async fn get(&self, salon_id: &str, id: &str) -> DbResult<Transalon> {
        require_scoped(&self.pool, "transalons", "Transalon", salon_id, id).await
    }

    pub async fn list(
        &self,
        salon_id: &str,
        filter: &TransalonFilter,
        pagination: Pagination,
    ) -> DbResult<Page<Transalon>> {
        validate_optional_date_range(filter.start_date, filter.end_date)?;
        let name = search("name", filter.name.as_deref())?;
        let salon_id = salon_id.to_string();

        fetch_page(
            &self.pool,
            "transalons",
            "transaction_date DESC, created_at DESC",
            pagination,
            |qb| {
                qb.push(" AND salon_id = ");
                qb.push_bind(salon_id.clone());
                if let Some(n) = &name {
                    qb.push(" AND name LIKE ");
                    qb.push_bind(like(n));
                }
                if let Some(kind) = filter.kind {
                    qb.push(" AND kind = ");
                    qb.push_bind(kind);
                }
                if let Some(start) = filter.start_date {
                    qb.push(" AND transaction_date >= ");
                    qb.push_bind(start);
                }
                if let Some(end) = filter.end_date {
                    qb.push(" AND transaction_date <= ");
                    qb.push_bind(end);
                }
            },
        )
        .await
    }

    pub async fn update(&self, salon_id: &str, id: &str, input: NewTransalon) -> DbResult<Transalon> {
        let mut tx = self.pool.begin().await?;
        let current: Transalon =
            require_scoped(&mut *tx, "transalons", "Transalon", salon_id, id).await?;

        booking::unbook(&mut tx, &current.cash_register_id, current.booked_cents).await?;
        let resolved = resolve_and_book(&mut tx, salon_id, &input).await?;

        sqlx::query(
            "UPDATE transalons SET name = ?2, amount_cents = ?3, currency_id = ?4, \
             exchange_rate_micros = ?5, amount_in_default_cents = ?6, transaction_date = ?7, \
             kind = ?8, cash_register_id = ?9, booked_cents = ?10, updated_at = ?11 WHERE id = ?1",
        )
        .bind(id)
        .bind(&resolved.name)
        .bind(input.amount.cents())
        .bind(&resolved.priced.currency.id)
        .bind(resolved.priced.rate.micros())
        .bind(resolved.priced.amount_in_default.cents())
        .bind(input.transaction_date)
        .bind(input.kind)
        .bind(&resolved.register_id)
        .bind(resolved.booked_cents)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("name", &resolved.name),
            other => other,
        })?;

        let updated: Transalon = require(&mut *tx, "transalons", "Transalon", id).await?;
        tx.commit().await?;

        debug!(transalon_id = %id, booked_cents = updated.booked_cents, "Transaction updated");
        Ok(updated)
    }

    pub async fn delete(&self, salon_id: &str, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let transalon: Transalon =
            require_scoped(&mut *tx, "transalons", "Transalon", salon_id, id).await?;

        booking::unbook(&mut tx, &transalon.cash_register_id, transalon.booked_cents).await?;
        sqlx::query("DELETE FROM transalons WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(transalon_id = %id, reverted_cents = -transalon.booked_cents, "Transaction deleted");
        Ok(())
    }
}

async fn resolve_and_book(
    conn: &mut SqliteConnection,
    salon_id: &str,
    input: &NewTransalon,
) -> DbResult<Resolved> {
    let name = validate_name(&input.name)?;
    validate_positive_amount("amount", input.amount.cents())?;

    let register = booking::register_in_salon(conn, &input.cash_register_id, salon_id).await?;
    let priced = booking::price(
        conn,
        input.currency_id.as_deref(),
        input.amount,
        input.exchange_rate,
    )
    .await?;
    let direction = Direction::for_transalon(input.kind);
    let booked_cents = booking::book(conn, &register, direction, &priced, input.amount).await?;

    Ok(Resolved {
        name,
        register_id: register.id,
        priced,
        booked_cents,
    })
}
