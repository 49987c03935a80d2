//! Cash register bookings and currency resolution shared by the money-event
//! repositories. Every function takes the open transaction's connection.

use chrono::Utc;
use salon_core::ledger::{self, Direction, EventAmount};
use salon_core::money::convert_to_default;
use salon_core::{CashRegister, Currency, ExchangeRate, Money};
use sqlx::SqliteConnection;
use tracing::debug;

use super::{currency, ensure_same_salon, require};
use crate::error::{DbError, DbResult};

/// An event amount resolved against its currency.
#[derive(Debug, Clone)]
pub(crate) struct Priced {
    pub currency: Currency,
    pub rate: ExchangeRate,
    pub amount_in_default: Money,
}

/// Resolves the event currency (default when absent) and converts the amount.
///
/// The default currency always carries the identity rate.
pub(crate) async fn price(
    conn: &mut SqliteConnection,
    currency_id: Option<&str>,
    amount: Money,
    rate: ExchangeRate,
) -> DbResult<Priced> {
    let currency = match currency_id {
        Some(id) => require::<Currency, _>(&mut *conn, "currencies", "Currency", id).await?,
        None => currency::default_in(&mut *conn).await?,
    };
    let rate = if currency.is_default {
        ExchangeRate::one()
    } else {
        rate
    };
    let amount_in_default = convert_to_default(amount, rate, currency.is_default)?;

    Ok(Priced {
        currency,
        rate,
        amount_in_default,
    })
}

/// Loads a register and checks it belongs to `salon_id`.
pub(crate) async fn register_in_salon(
    conn: &mut SqliteConnection,
    register_id: &str,
    salon_id: &str,
) -> DbResult<CashRegister> {
    let register: CashRegister =
        require(&mut *conn, "cash_registers", "CashRegister", register_id).await?;
    ensure_same_salon("CashRegister", &register.id, &register.salon_id, salon_id)?;
    Ok(register)
}

/// Applies an event's effect to its register and returns the booked delta.
pub(crate) async fn book(
    conn: &mut SqliteConnection,
    register: &CashRegister,
    direction: Direction,
    priced: &Priced,
    amount: Money,
) -> DbResult<i64> {
    let register_currency: Currency =
        require(&mut *conn, "currencies", "Currency", &register.currency_id).await?;

    let event = EventAmount {
        currency: &priced.currency,
        amount,
        amount_in_default: priced.amount_in_default,
    };
    let delta = ledger::effect(direction, &event, &register_currency)?;

    adjust_balance(conn, &register.id, delta.cents()).await?;
    Ok(delta.cents())
}

/// Takes a previously booked delta back off its register.
pub(crate) async fn unbook(
    conn: &mut SqliteConnection,
    register_id: &str,
    booked_cents: i64,
) -> DbResult<()> {
    adjust_balance(conn, register_id, -booked_cents).await
}

async fn adjust_balance(conn: &mut SqliteConnection, register_id: &str, delta: i64) -> DbResult<()> {
    if delta == 0 {
        return Ok(());
    }

    debug!(register_id = %register_id, delta = delta, "Adjusting cash register balance");

    // Summed here rather than in SQL: SQLite turns an overflowing integer
    // sum into a REAL.
    let balance: i64 = sqlx::query_scalar("SELECT balance_cents FROM cash_registers WHERE id = ?1")
        .bind(register_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("CashRegister", register_id))?;
    let balance = Money::from_cents(balance).checked_add(Money::from_cents(delta))?;

    sqlx::query("UPDATE cash_registers SET balance_cents = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(register_id)
        .bind(balance.cents())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Sets an item's stock to an already validated value.
pub(crate) async fn set_stock(conn: &mut SqliteConnection, item_id: &str, stock: i64) -> DbResult<()> {
    debug!(item_id = %item_id, stock = stock, "Setting item stock");

    let result = sqlx::query("UPDATE items SET current_stock = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(item_id)
        .bind(stock)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Item", item_id));
    }
    Ok(())
}

/// Reverts the booked deltas of every row matched by `where_sql`, before a
/// delete that would cascade those rows away.
pub(crate) async fn unbook_all(
    conn: &mut SqliteConnection,
    table: &str,
    where_sql: &str,
    bind: &str,
) -> DbResult<()> {
    let sql = format!(
        "SELECT cash_register_id, booked_cents FROM {} WHERE {} AND booked_cents != 0",
        table, where_sql
    );
    let rows: Vec<(String, i64)> = sqlx::query_as(&sql)
        .bind(bind)
        .fetch_all(&mut *conn)
        .await?;

    debug!(table = table, count = rows.len(), "Reverting cascaded bookings");

    for (register_id, booked) in rows {
        unbook(conn, &register_id, booked).await?;
    }
    Ok(())
}
