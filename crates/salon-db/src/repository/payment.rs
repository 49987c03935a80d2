//! # Payment Repository
//!
//! Barber payouts. Every payment is an expense on its cash register.
//!
//! ## Create / Update / Delete
//! ```text
//! create:  BEGIN → check refs → convert → book −amount → INSERT → COMMIT
//! update:  BEGIN → unbook old booked_cents → check refs → convert
//!                → book −amount (maybe another register) → UPDATE → COMMIT
//! delete:  BEGIN → unbook booked_cents → DELETE → COMMIT
//! ```

use chrono::{NaiveDate, Utc};
use salon_core::ledger::Direction;
use salon_core::validation::{validate_date_range, validate_optional_date_range, validate_positive_amount};
use salon_core::{Barber, ExchangeRate, Money, Page, Pagination, Payment, PaymentType};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::booking::{self, Priced};
use super::{ensure_same_salon, fetch_page, generate_id, payment_type, require, require_scoped};
use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub barber_id: String,
    pub amount: Money,
    /// Falls back to the default currency.
    pub currency_id: Option<String>,
    /// Ignored for the default currency.
    pub exchange_rate: ExchangeRate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Falls back to `SALARY`.
    pub payment_type_id: Option<String>,
    pub cash_register_id: String,
    pub payment_date: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub barber_id: Option<String>,
    pub payment_type_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// References and amounts of a payment, checked and converted.
struct Resolved {
    payment_type_id: String,
    register_id: String,
    priced: Priced,
    booked_cents: i64,
}

#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    pub async fn create(&self, salon_id: &str, input: NewPayment) -> DbResult<Payment> {
        let mut tx = self.pool.begin().await?;
        let resolved = resolve_and_book(&mut tx, salon_id, &input).await?;

        let now = Utc::now();
        let payment = Payment {
            id: generate_id(),
            barber_id: input.barber_id,
            amount_cents: input.amount.cents(),
            currency_id: resolved.priced.currency.id.clone(),
            exchange_rate_micros: resolved.priced.rate.micros(),
            amount_in_default_cents: resolved.priced.amount_in_default.cents(),
            start_date: input.start_date,
            end_date: input.end_date,
            payment_type_id: resolved.payment_type_id,
            cash_register_id: resolved.register_id,
            booked_cents: resolved.booked_cents,
            payment_date: input.payment_date,
            salon_id: salon_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO payments (id, barber_id, amount_cents, currency_id, exchange_rate_micros, \
             amount_in_default_cents, start_date, end_date, payment_type_id, cash_register_id, \
             booked_cents, payment_date, salon_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )
        .bind(&payment.id)
        .bind(&payment.barber_id)
        .bind(payment.amount_cents)
        .bind(&payment.currency_id)
        .bind(payment.exchange_rate_micros)
        .bind(payment.amount_in_default_cents)
        .bind(payment.start_date)
        .bind(payment.end_date)
        .bind(&payment.payment_type_id)
        .bind(&payment.cash_register_id)
        .bind(payment.booked_cents)
        .bind(payment.payment_date)
        .bind(&payment.salon_id)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(
            payment_id = %payment.id,
            barber_id = %payment.barber_id,
            amount_cents = payment.amount_cents,
            booked_cents = payment.booked_cents,
            "Payment created"
        );
        Ok(payment)
    }

    pub async fn get(&self, salon_id: &str, id: &str) -> DbResult<Payment> {
        require_scoped(&self.pool, "payments", "Payment", salon_id, id).await
    }

    pub async fn list(
        &self,
        salon_id: &str,
        filter: &PaymentFilter,
        pagination: Pagination,
    ) -> DbResult<Page<Payment>> {
        validate_optional_date_range(filter.start_date, filter.end_date)?;
        let salon_id = salon_id.to_string();

        fetch_page(
            &self.pool,
            "payments",
            "payment_date DESC, created_at DESC",
            pagination,
            |qb| {
                qb.push(" AND salon_id = ");
                qb.push_bind(salon_id.clone());
                if let Some(b) = &filter.barber_id {
                    qb.push(" AND barber_id = ");
                    qb.push_bind(b.clone());
                }
                if let Some(t) = &filter.payment_type_id {
                    qb.push(" AND payment_type_id = ");
                    qb.push_bind(t.clone());
                }
                if let Some(start) = filter.start_date {
                    qb.push(" AND payment_date >= ");
                    qb.push_bind(start);
                }
                if let Some(end) = filter.end_date {
                    qb.push(" AND payment_date <= ");
                    qb.push_bind(end);
                }
            },
        )
        .await
    }

    /// Replaces the payment, moving its booking to the new amount/register.
    pub async fn update(&self, salon_id: &str, id: &str, input: NewPayment) -> DbResult<Payment> {
        let mut tx = self.pool.begin().await?;
        let current: Payment = require_scoped(&mut *tx, "payments", "Payment", salon_id, id).await?;

        booking::unbook(&mut tx, &current.cash_register_id, current.booked_cents).await?;
        let resolved = resolve_and_book(&mut tx, salon_id, &input).await?;

        sqlx::query(
            "UPDATE payments SET barber_id = ?2, amount_cents = ?3, currency_id = ?4, \
             exchange_rate_micros = ?5, amount_in_default_cents = ?6, start_date = ?7, \
             end_date = ?8, payment_type_id = ?9, cash_register_id = ?10, booked_cents = ?11, \
             payment_date = ?12, updated_at = ?13 WHERE id = ?1",
        )
        .bind(id)
        .bind(&input.barber_id)
        .bind(input.amount.cents())
        .bind(&resolved.priced.currency.id)
        .bind(resolved.priced.rate.micros())
        .bind(resolved.priced.amount_in_default.cents())
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&resolved.payment_type_id)
        .bind(&resolved.register_id)
        .bind(resolved.booked_cents)
        .bind(input.payment_date)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let updated: Payment = require(&mut *tx, "payments", "Payment", id).await?;
        tx.commit().await?;

        debug!(
            payment_id = %id,
            old_booked = current.booked_cents,
            new_booked = updated.booked_cents,
            "Payment updated"
        );
        Ok(updated)
    }

    pub async fn delete(&self, salon_id: &str, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let payment: Payment = require_scoped(&mut *tx, "payments", "Payment", salon_id, id).await?;

        booking::unbook(&mut tx, &payment.cash_register_id, payment.booked_cents).await?;
        sqlx::query("DELETE FROM payments WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(payment_id = %id, reverted_cents = -payment.booked_cents, "Payment deleted");
        Ok(())
    }
}

async fn resolve_and_book(
    conn: &mut SqliteConnection,
    salon_id: &str,
    input: &NewPayment,
) -> DbResult<Resolved> {
    validate_positive_amount("amount", input.amount.cents())?;
    validate_date_range(input.start_date, input.end_date)?;

    let barber: Barber = require(&mut *conn, "barbers", "Barber", &input.barber_id).await?;
    ensure_same_salon("Barber", &barber.id, &barber.salon_id, salon_id)?;

    let register = booking::register_in_salon(conn, &input.cash_register_id, salon_id).await?;

    let payment_type: PaymentType = match &input.payment_type_id {
        Some(id) => require(&mut *conn, "payment_types", "PaymentType", id).await?,
        None => payment_type::default_in(conn).await?,
    };

    let priced = booking::price(
        conn,
        input.currency_id.as_deref(),
        input.amount,
        input.exchange_rate,
    )
    .await?;
    let booked_cents =
        booking::book(conn, &register, Direction::for_payment(), &priced, input.amount).await?;

    Ok(Resolved {
        payment_type_id: payment_type.id,
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

    fn payment(barber_id: &str, register_id: &str, cents: i64) -> NewPayment {
        NewPayment {
            barber_id: barber_id.to_string(),
            amount: Money::from_cents(cents),
            currency_id: None,
            exchange_rate: ExchangeRate::one(),
            start_date: date(2024, 5, 1),
            end_date: date(2024, 5, 31),
            payment_type_id: None,
            cash_register_id: register_id.to_string(),
            payment_date: date(2024, 6, 1),
        }
    }

    #[tokio::test]
    async fn test_create_debits_and_delete_restores() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let r = register(&db, &s, "Till", None, 100_000).await;
        let b = barber(&db, &s, "dave@salon.test").await;

        let p = db.payments().create(&s.id, payment(&b.id, &r.id, 25_000)).await.unwrap();
        assert_eq!(p.booked_cents, -25_000);
        assert_eq!(balance(&db, &r.id).await, 75_000);

        let salary = db.payment_types().default_salary().await.unwrap();
        assert_eq!(p.payment_type_id, salary.id);

        // Payment type in use can't be deleted
        assert!(matches!(
            db.payment_types().delete(&salary.id).await.unwrap_err(),
            DbError::InUse { .. }
        ));

        db.payments().delete(&s.id, &p.id).await.unwrap();
        assert_eq!(balance(&db, &r.id).await, 100_000);
    }

    #[tokio::test]
    async fn test_foreign_currency_converted_into_default_register() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let r = register(&db, &s, "Till", None, 10_000).await;
        let b = barber(&db, &s, "dave@salon.test").await;
        let eur = currency(&db, "EUR", "Euro").await;

        let mut input = payment(&b.id, &r.id, 920);
        input.currency_id = Some(eur.id.clone());
        input.exchange_rate = "0.92".parse().unwrap();

        let p = db.payments().create(&s.id, input).await.unwrap();
        assert_eq!(p.amount_in_default_cents, 1000);
        assert_eq!(p.booked_cents, -1000);
        assert_eq!(balance(&db, &r.id).await, 9_000);
    }

    #[tokio::test]
    async fn test_currency_mismatch_rolls_back() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let eur = currency(&db, "EUR", "Euro").await;
        let gbp = currency(&db, "GBP", "Pound").await;
        let r = register(&db, &s, "Euro till", Some(&eur.id), 5_000).await;
        let b = barber(&db, &s, "dave@salon.test").await;

        let mut input = payment(&b.id, &r.id, 1_000);
        input.currency_id = Some(gbp.id.clone());
        input.exchange_rate = "0.8".parse().unwrap();

        let err = db.payments().create(&s.id, input).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::CurrencyMismatch { .. })));
        assert_eq!(balance(&db, &r.id).await, 5_000);

        let page = db
            .payments()
            .list(&s.id, &PaymentFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_update_moves_booking_between_registers() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let r1 = register(&db, &s, "Till 1", None, 10_000).await;
        let r2 = register(&db, &s, "Till 2", None, 10_000).await;
        let b = barber(&db, &s, "dave@salon.test").await;

        let p = db.payments().create(&s.id, payment(&b.id, &r1.id, 3_000)).await.unwrap();
        let p = db
            .payments()
            .update(&s.id, &p.id, payment(&b.id, &r2.id, 4_000))
            .await
            .unwrap();

        assert_eq!(p.cash_register_id, r2.id);
        assert_eq!(balance(&db, &r1.id).await, 10_000);
        assert_eq!(balance(&db, &r2.id).await, 6_000);
    }

    #[tokio::test]
    async fn test_references_must_share_the_salon() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let other = salon(&db, &owner, "Other", None).await;
        let foreign_register = register(&db, &other, "Till", None, 0).await;
        let b = barber(&db, &s, "dave@salon.test").await;

        let err = db
            .payments()
            .create(&s.id, payment(&b.id, &foreign_register.id, 100))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::ForeignSalon { .. })));
    }

    #[tokio::test]
    async fn test_deleting_barber_reverts_payments() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let r = register(&db, &s, "Till", None, 10_000).await;
        let b = barber(&db, &s, "dave@salon.test").await;

        db.payments().create(&s.id, payment(&b.id, &r.id, 2_500)).await.unwrap();
        db.payments().create(&s.id, payment(&b.id, &r.id, 1_500)).await.unwrap();
        assert_eq!(balance(&db, &r.id).await, 6_000);

        db.barbers().delete(&s.id, &b.id).await.unwrap();
        assert_eq!(balance(&db, &r.id).await, 10_000);
    }

    #[tokio::test]
    async fn test_validation_and_filters() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let r = register(&db, &s, "Till", None, 10_000).await;
        let b = barber(&db, &s, "dave@salon.test").await;

        let err = db.payments().create(&s.id, payment(&b.id, &r.id, 0)).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Validation(_))));

        let mut early = payment(&b.id, &r.id, 100);
        early.payment_date = date(2024, 1, 15);
        db.payments().create(&s.id, early).await.unwrap();
        db.payments().create(&s.id, payment(&b.id, &r.id, 200)).await.unwrap();

        let page = db
            .payments()
            .list(
                &s.id,
                &PaymentFilter {
                    start_date: Some(date(2024, 6, 1)),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].amount_cents, 200);
    }
}
