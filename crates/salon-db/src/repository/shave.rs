//! # Shave Repository
//!
//! A shave is one service performed by a barber. Only completed shaves are
//! booked on their register, so changing the status is an update that moves
//! money:
//!
//! ```text
//! scheduled ──update──► completed     balance += amount
//! completed ──update──► cancelled     balance -= amount
//! completed ──delete                  balance -= amount
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use salon_core::ledger::{self, Direction};
use salon_core::validation::{validate_non_negative_amount, validate_optional_date_range};
use salon_core::{
    Barber, Client, ExchangeRate, Hairstyle, Money, Page, Pagination, Shave, ShaveStatus,
};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::booking::{self, Priced};
use super::hairstyle::history_in;
use super::{ensure_same_salon, fetch_page, generate_id, require, require_scoped};
use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct NewShave {
    pub barber_id: String,
    pub hairstyle_id: String,
    /// Falls back to the hairstyle's current tariff.
    pub amount: Option<Money>,
    /// Falls back to the hairstyle's currency.
    pub currency_id: Option<String>,
    pub exchange_rate: ExchangeRate,
    pub client_id: Option<String>,
    pub cash_register_id: String,
    pub shave_date: NaiveDate,
    pub status: ShaveStatus,
}

#[derive(Debug, Clone, Default)]
pub struct ShaveFilter {
    pub barber_id: Option<String>,
    pub hairstyle_id: Option<String>,
    pub client_id: Option<String>,
    pub status: Option<ShaveStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Derived figures for one shave.
#[derive(Debug, Clone, Serialize)]
pub struct ShaveSummary {
    pub shave: Shave,
    /// Amount plus the value of the items it consumed.
    pub total_amount_cents: i64,
    pub tariff_at_date_cents: i64,
    /// Amount minus the tariff in force on the shave date.
    pub tariff_difference_cents: i64,
}

struct Resolved {
    amount: Money,
    register_id: String,
    priced: Priced,
    booked_cents: i64,
}

#[derive(Debug, Clone)]
pub struct ShaveRepository {
    pool: SqlitePool,
}

impl ShaveRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ShaveRepository { pool }
    }

    pub async fn create(&self, salon_id: &str, input: NewShave) -> DbResult<Shave> {
        let mut tx = self.pool.begin().await?;
        let resolved = resolve_and_book(&mut tx, salon_id, &input).await?;

        let now = Utc::now();
        let shave = Shave {
            id: generate_id(),
            barber_id: input.barber_id,
            hairstyle_id: input.hairstyle_id,
            amount_cents: resolved.amount.cents(),
            currency_id: resolved.priced.currency.id.clone(),
            exchange_rate_micros: resolved.priced.rate.micros(),
            amount_in_default_cents: resolved.priced.amount_in_default.cents(),
            client_id: input.client_id,
            cash_register_id: resolved.register_id,
            booked_cents: resolved.booked_cents,
            shave_date: input.shave_date,
            salon_id: salon_id.to_string(),
            status: input.status,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO shaves (id, barber_id, hairstyle_id, amount_cents, currency_id, \
             exchange_rate_micros, amount_in_default_cents, client_id, cash_register_id, \
             booked_cents, shave_date, salon_id, status, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )
        .bind(&shave.id)
        .bind(&shave.barber_id)
        .bind(&shave.hairstyle_id)
        .bind(shave.amount_cents)
        .bind(&shave.currency_id)
        .bind(shave.exchange_rate_micros)
        .bind(shave.amount_in_default_cents)
        .bind(&shave.client_id)
        .bind(&shave.cash_register_id)
        .bind(shave.booked_cents)
        .bind(shave.shave_date)
        .bind(&shave.salon_id)
        .bind(shave.status)
        .bind(shave.created_at)
        .bind(shave.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(
            shave_id = %shave.id,
            status = shave.status.as_str(),
            booked_cents = shave.booked_cents,
            "Shave created"
        );
        Ok(shave)
    }

    pub async fn get(&self, salon_id: &str, id: &str) -> DbResult<Shave> {
        require_scoped(&self.pool, "shaves", "Shave", salon_id, id).await
    }

    pub async fn list(
        &self,
        salon_id: &str,
        filter: &ShaveFilter,
        pagination: Pagination,
    ) -> DbResult<Page<Shave>> {
        validate_optional_date_range(filter.start_date, filter.end_date)?;
        let salon_id = salon_id.to_string();

        fetch_page(
            &self.pool,
            "shaves",
            "shave_date DESC, created_at DESC",
            pagination,
            |qb| {
                qb.push(" AND salon_id = ");
                qb.push_bind(salon_id.clone());
                if let Some(b) = &filter.barber_id {
                    qb.push(" AND barber_id = ");
                    qb.push_bind(b.clone());
                }
                if let Some(h) = &filter.hairstyle_id {
                    qb.push(" AND hairstyle_id = ");
                    qb.push_bind(h.clone());
                }
                if let Some(c) = &filter.client_id {
                    qb.push(" AND client_id = ");
                    qb.push_bind(c.clone());
                }
                if let Some(status) = filter.status {
                    qb.push(" AND status = ");
                    qb.push_bind(status);
                }
                if let Some(start) = filter.start_date {
                    qb.push(" AND shave_date >= ");
                    qb.push_bind(start);
                }
                if let Some(end) = filter.end_date {
                    qb.push(" AND shave_date <= ");
                    qb.push_bind(end);
                }
            },
        )
        .await
    }

    pub async fn update(&self, salon_id: &str, id: &str, input: NewShave) -> DbResult<Shave> {
        let mut tx = self.pool.begin().await?;
        let current: Shave = require_scoped(&mut *tx, "shaves", "Shave", salon_id, id).await?;

        booking::unbook(&mut tx, &current.cash_register_id, current.booked_cents).await?;
        let resolved = resolve_and_book(&mut tx, salon_id, &input).await?;

        sqlx::query(
            "UPDATE shaves SET barber_id = ?2, hairstyle_id = ?3, amount_cents = ?4, \
             currency_id = ?5, exchange_rate_micros = ?6, amount_in_default_cents = ?7, \
             client_id = ?8, cash_register_id = ?9, booked_cents = ?10, shave_date = ?11, \
             status = ?12, updated_at = ?13 WHERE id = ?1",
        )
        .bind(id)
        .bind(&input.barber_id)
        .bind(&input.hairstyle_id)
        .bind(resolved.amount.cents())
        .bind(&resolved.priced.currency.id)
        .bind(resolved.priced.rate.micros())
        .bind(resolved.priced.amount_in_default.cents())
        .bind(&input.client_id)
        .bind(&resolved.register_id)
        .bind(resolved.booked_cents)
        .bind(input.shave_date)
        .bind(input.status)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let updated: Shave = require(&mut *tx, "shaves", "Shave", id).await?;
        tx.commit().await?;

        debug!(
            shave_id = %id,
            from = current.status.as_str(),
            to = updated.status.as_str(),
            booked_cents = updated.booked_cents,
            "Shave updated"
        );
        Ok(updated)
    }

    pub async fn delete(&self, salon_id: &str, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let shave: Shave = require_scoped(&mut *tx, "shaves", "Shave", salon_id, id).await?;

        booking::unbook(&mut tx, &shave.cash_register_id, shave.booked_cents).await?;
        sqlx::query("DELETE FROM shaves WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(shave_id = %id, reverted_cents = -shave.booked_cents, "Shave deleted");
        Ok(())
    }

    // =========================================================================
    // Derived figures
    // =========================================================================

    pub async fn summary(&self, salon_id: &str, id: &str) -> DbResult<ShaveSummary> {
        let shave = self.get(salon_id, id).await?;
        let mut conn = self.pool.acquire().await?;

        let usages: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT i.price_cents, u.quantity FROM item_usages u \
             JOIN items i ON i.id = u.item_id WHERE u.shave_id = ?1",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
        let usages: Vec<(Money, i64)> = usages
            .into_iter()
            .map(|(price, qty)| (Money::from_cents(price), qty))
            .collect();

        let hairstyle: Hairstyle = require(&mut *conn, "hairstyles", "Hairstyle", &shave.hairstyle_id).await?;
        let history = history_in(&mut conn, &hairstyle.id).await?;
        let tariff = hairstyle.tariff_at(&history, end_of_day(shave.shave_date));

        let total = ledger::shave_total_amount(&shave, &usages)?;
        let difference = shave.amount().checked_sub(tariff)?;

        Ok(ShaveSummary {
            total_amount_cents: total.cents(),
            tariff_at_date_cents: tariff.cents(),
            tariff_difference_cents: difference.cents(),
            shave,
        })
    }

    /// Σ default-currency amounts of completed shaves in the date range.
    pub async fn revenue(
        &self,
        salon_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> DbResult<Money> {
        validate_optional_date_range(start, end)?;

        let shaves = sqlx::query_as::<_, Shave>(
            "SELECT * FROM shaves WHERE salon_id = ?1 AND status = ?2",
        )
        .bind(salon_id)
        .bind(ShaveStatus::Completed)
        .fetch_all(&self.pool)
        .await?;

        let revenue = ledger::revenue(&shaves, start, end)?;
        debug!(salon_id = %salon_id, revenue_cents = revenue.cents(), "Revenue computed");
        Ok(revenue)
    }
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(23, 59, 59)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(Utc::now)
}

async fn resolve_and_book(
    conn: &mut SqliteConnection,
    salon_id: &str,
    input: &NewShave,
) -> DbResult<Resolved> {
    let barber: Barber = require(&mut *conn, "barbers", "Barber", &input.barber_id).await?;
    ensure_same_salon("Barber", &barber.id, &barber.salon_id, salon_id)?;

    let hairstyle: Hairstyle = require(&mut *conn, "hairstyles", "Hairstyle", &input.hairstyle_id).await?;
    ensure_same_salon("Hairstyle", &hairstyle.id, &hairstyle.salon_id, salon_id)?;

    if let Some(client_id) = &input.client_id {
        let client: Client = require(&mut *conn, "clients", "Client", client_id).await?;
        ensure_same_salon("Client", &client.id, &client.salon_id, salon_id)?;
    }

    let register = booking::register_in_salon(conn, &input.cash_register_id, salon_id).await?;

    let amount = input.amount.unwrap_or(hairstyle.current_tariff());
    validate_non_negative_amount("amount", amount.cents())?;

    let currency_id = input.currency_id.as_deref().unwrap_or(&hairstyle.currency_id);
    let priced = booking::price(conn, Some(currency_id), amount, input.exchange_rate).await?;
    let booked_cents =
        booking::book(conn, &register, Direction::for_shave(input.status), &priced, amount).await?;

    Ok(Resolved {
        amount,
        register_id: register.id,
        priced,
        booked_cents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::test_support::*;
    use salon_core::CoreError;

    fn shave(barber: &str, hairstyle: &str, register: &str, status: ShaveStatus) -> NewShave {
        NewShave {
            barber_id: barber.to_string(),
            hairstyle_id: hairstyle.to_string(),
            amount: None,
            currency_id: None,
            exchange_rate: ExchangeRate::one(),
            client_id: None,
            cash_register_id: register.to_string(),
            shave_date: date(2024, 6, 1),
            status,
        }
    }

    #[tokio::test]
    async fn test_only_completed_shaves_are_booked() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let r = register(&db, &s, "Till", None, 0).await;
        let b = barber(&db, &s, "dave@salon.test").await;
        let h = hairstyle(&db, &s, "Fade", 2_000).await;

        let scheduled = db
            .shaves()
            .create(&s.id, shave(&b.id, &h.id, &r.id, ShaveStatus::Scheduled))
            .await
            .unwrap();
        assert_eq!(scheduled.amount_cents, 2_000);
        assert_eq!(scheduled.booked_cents, 0);
        assert_eq!(balance(&db, &r.id).await, 0);

        let done = db
            .shaves()
            .update(&s.id, &scheduled.id, shave(&b.id, &h.id, &r.id, ShaveStatus::Completed))
            .await
            .unwrap();
        assert_eq!(done.booked_cents, 2_000);
        assert_eq!(balance(&db, &r.id).await, 2_000);

        db.shaves()
            .update(&s.id, &done.id, shave(&b.id, &h.id, &r.id, ShaveStatus::Cancelled))
            .await
            .unwrap();
        assert_eq!(balance(&db, &r.id).await, 0);
    }

    #[tokio::test]
    async fn test_delete_and_hairstyle_cascade_revert() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let r = register(&db, &s, "Till", None, 0).await;
        let b = barber(&db, &s, "dave@salon.test").await;
        let h = hairstyle(&db, &s, "Fade", 2_000).await;

        let first = db
            .shaves()
            .create(&s.id, shave(&b.id, &h.id, &r.id, ShaveStatus::Completed))
            .await
            .unwrap();
        db.shaves()
            .create(&s.id, shave(&b.id, &h.id, &r.id, ShaveStatus::Completed))
            .await
            .unwrap();
        assert_eq!(balance(&db, &r.id).await, 4_000);

        db.shaves().delete(&s.id, &first.id).await.unwrap();
        assert_eq!(balance(&db, &r.id).await, 2_000);

        db.hairstyles().delete(&s.id, &h.id).await.unwrap();
        assert_eq!(balance(&db, &r.id).await, 0);
        let page = db
            .shaves()
            .list(&s.id, &ShaveFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_hairstyle_of_another_salon_rejected() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let other = salon(&db, &owner, "Other", None).await;
        let r = register(&db, &s, "Till", None, 0).await;
        let b = barber(&db, &s, "dave@salon.test").await;
        let foreign = hairstyle(&db, &other, "Fade", 2_000).await;

        let err = db
            .shaves()
            .create(&s.id, shave(&b.id, &foreign.id, &r.id, ShaveStatus::Completed))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::ForeignSalon { .. })));
    }

    #[tokio::test]
    async fn test_summary_and_revenue() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let r = register(&db, &s, "Till", None, 0).await;
        let b = barber(&db, &s, "dave@salon.test").await;
        let h = hairstyle(&db, &s, "Fade", 2_000).await;

        let mut discounted = shave(&b.id, &h.id, &r.id, ShaveStatus::Completed);
        discounted.amount = Some(Money::from_cents(1_800));
        discounted.shave_date = chrono::Utc::now().date_naive();
        let done = db.shaves().create(&s.id, discounted).await.unwrap();

        let summary = db.shaves().summary(&s.id, &done.id).await.unwrap();
        assert_eq!(summary.total_amount_cents, 1_800);
        assert_eq!(summary.tariff_at_date_cents, 2_000);
        assert_eq!(summary.tariff_difference_cents, -200);

        db.shaves()
            .create(&s.id, shave(&b.id, &h.id, &r.id, ShaveStatus::Scheduled))
            .await
            .unwrap();
        let revenue = db.shaves().revenue(&s.id, None, None).await.unwrap();
        assert_eq!(revenue.cents(), 1_800);

        let none = db
            .shaves()
            .revenue(&s.id, Some(date(2000, 1, 1)), Some(date(2000, 12, 31)))
            .await
            .unwrap();
        assert!(none.is_zero());
    }
}
