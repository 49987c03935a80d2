//! # Ledger Module
//!
//! How money events move cash register balances and how inventory events
//! move stock. salon-db applies these deltas inside the same SQL transaction
//! that writes the event row.
//!
//! ## Effects
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Event                      On create              On delete           │
//! │  ─────────────────────────  ─────────────────────  ─────────────────── │
//! │  Payment                    − amount               + amount            │
//! │  Transalon (income)         + amount               − amount            │
//! │  Transalon (expenses)       − amount               + amount            │
//! │  Shave (completed)          + amount               − amount            │
//! │  Shave (any other status)   0                      0                   │
//! │  ItemPurchase               − price × quantity     + price × quantity  │
//! │                                                                         │
//! │  The applied delta is stored on the event (`booked_cents`); delete     │
//! │  subtracts exactly that, whatever happened to currencies since.        │
//! │  Update = revert(old) + apply(new), possibly on two registers.         │
//! │                                                                         │
//! │  Invariant:                                                             │
//! │    balance = opening balance + Σ effect(live events)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Currency of a Delta
//! ```text
//! event currency == register currency  → raw amount
//! register currency is the default     → amount in default currency
//! anything else                        → CurrencyMismatch
//! ```

use chrono::NaiveDate;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::validate_stock;
use crate::types::{Currency, Item, ItemPurchase, Shave, ShaveStatus, TransactionKind, Transalon};

// =============================================================================
// Direction
// =============================================================================

/// Which way an event moves its register when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Money comes in.
    Credit,
    /// Money goes out.
    Debit,
    /// The event doesn't touch the register.
    Neutral,
}

impl Direction {
    pub fn for_payment() -> Self {
        Direction::Debit
    }

    pub fn for_transalon(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Income => Direction::Credit,
            TransactionKind::Expenses => Direction::Debit,
        }
    }

    pub fn for_shave(status: ShaveStatus) -> Self {
        match status {
            ShaveStatus::Completed => Direction::Credit,
            _ => Direction::Neutral,
        }
    }

    pub fn for_purchase() -> Self {
        Direction::Debit
    }

    /// Signs an unsigned amount.
    pub fn signed(&self, amount: Money) -> Money {
        match self {
            Direction::Credit => amount,
            Direction::Debit => -amount,
            Direction::Neutral => Money::zero(),
        }
    }
}

// =============================================================================
// Effect
// =============================================================================

/// The amount of an event, in its own currency and in the default one.
#[derive(Debug, Clone, Copy)]
pub struct EventAmount<'a> {
    pub currency: &'a Currency,
    pub amount: Money,
    pub amount_in_default: Money,
}

/// Expresses an event amount in the currency of a register.
pub fn amount_in_register_currency(
    event: &EventAmount<'_>,
    register_currency: &Currency,
) -> CoreResult<Money> {
    if event.currency.id == register_currency.id {
        return Ok(event.amount);
    }
    if register_currency.is_default {
        return Ok(event.amount_in_default);
    }
    Err(CoreError::CurrencyMismatch {
        event_currency: event.currency.code.clone(),
        register_currency: register_currency.code.clone(),
    })
}

/// Signed balance delta produced by creating the event.
///
/// Neutral events skip the currency check: a scheduled shave may name any
/// register and only has to be bookable once it completes.
///
/// ```rust
/// use chrono::Utc;
/// use salon_core::ledger::{effect, Direction, EventAmount};
/// use salon_core::{Currency, Money};
///
/// let usd = Currency {
///     id: "usd".into(), code: "USD".into(), name: "US Dollar".into(),
///     is_default: true, created_at: Utc::now(), updated_at: Utc::now(),
/// };
/// let event = EventAmount {
///     currency: &usd,
///     amount: Money::from_cents(2500),
///     amount_in_default: Money::from_cents(2500),
/// };
/// let delta = effect(Direction::for_payment(), &event, &usd).unwrap();
/// assert_eq!(delta.cents(), -2500);
/// ```
pub fn effect(
    direction: Direction,
    event: &EventAmount<'_>,
    register_currency: &Currency,
) -> CoreResult<Money> {
    if direction == Direction::Neutral {
        return Ok(Money::zero());
    }
    let amount = amount_in_register_currency(event, register_currency)?;
    Ok(direction.signed(amount))
}

// =============================================================================
// Stock
// =============================================================================

/// Stock left after consuming `quantity` units.
pub fn stock_after_usage(item: &Item, quantity: i64) -> CoreResult<i64> {
    if item.current_stock < quantity {
        return Err(CoreError::InsufficientStock {
            item: item.name.clone(),
            available: item.current_stock,
            requested: quantity,
        });
    }
    Ok(item.current_stock - quantity)
}

/// Stock after `quantity` units come back in (a purchase, or a deleted usage).
pub fn stock_after_restock(item: &Item, quantity: i64) -> CoreResult<i64> {
    let stock = item
        .current_stock
        .checked_add(quantity)
        .ok_or_else(|| CoreError::AmountOverflow {
            what: format!("the stock of {}", item.name),
        })?;
    validate_stock(stock)?;
    Ok(stock)
}

/// Stock after removing a purchase that had added `quantity` units.
pub fn stock_after_purchase_revert(item: &Item, quantity: i64) -> CoreResult<i64> {
    stock_after_usage(item, quantity)
}

/// Items may only be recorded against completed shaves.
pub fn ensure_shave_completed(shave: &Shave) -> CoreResult<()> {
    if !shave.is_completed() {
        return Err(CoreError::ShaveNotCompleted {
            shave_id: shave.id.clone(),
            status: shave.status.as_str().to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Aggregates
// =============================================================================

/// Income and expense sums over a register's transalons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterTotals {
    pub income: Money,
    pub expenses: Money,
}

impl RegisterTotals {
    pub fn net(&self) -> CoreResult<Money> {
        self.income.checked_sub(self.expenses)
    }
}

pub fn register_totals(transalons: &[Transalon]) -> CoreResult<RegisterTotals> {
    let of_kind = |kind: TransactionKind| {
        Money::try_sum(
            transalons
                .iter()
                .filter(move |t| t.kind == kind)
                .map(Transalon::amount),
        )
    };
    Ok(RegisterTotals {
        income: of_kind(TransactionKind::Income)?,
        expenses: of_kind(TransactionKind::Expenses)?,
    })
}

/// Σ(price × qty) / Σqty over purchases, truncated to the cent; zero when
/// nothing was bought.
pub fn average_purchase_price(purchases: &[ItemPurchase]) -> CoreResult<Money> {
    let quantity = purchases
        .iter()
        .try_fold(0_i64, |acc, p| acc.checked_add(p.quantity))
        .ok_or_else(|| CoreError::AmountOverflow {
            what: "the purchased quantity".to_string(),
        })?;
    if quantity == 0 {
        return Ok(Money::zero());
    }
    let costs = purchases
        .iter()
        .map(ItemPurchase::total_cost)
        .collect::<CoreResult<Vec<_>>>()?;
    let cost = Money::try_sum(costs)?;
    Ok(Money::from_cents(cost.cents() / quantity))
}

/// Σ price × stock over a salon's items.
pub fn inventory_value(items: &[Item]) -> CoreResult<Money> {
    let values = items
        .iter()
        .map(Item::total_value)
        .collect::<CoreResult<Vec<_>>>()?;
    Money::try_sum(values)
}

/// Shave amount plus the value of the items it consumed.
///
/// `usages` pairs each consumed quantity with the item's current unit price.
pub fn shave_total_amount(shave: &Shave, usages: &[(Money, i64)]) -> CoreResult<Money> {
    let consumed = usages
        .iter()
        .map(|(price, qty)| price.multiply_quantity(*qty))
        .collect::<CoreResult<Vec<_>>>()?;
    shave.amount().checked_add(Money::try_sum(consumed)?)
}

/// Σ default-currency amounts of completed shaves inside the optional bounds.
pub fn revenue(
    shaves: &[Shave],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> CoreResult<Money> {
    Money::try_sum(
        shaves
            .iter()
            .filter(|s| s.is_completed())
            .filter(|s| start.map_or(true, |d| s.shave_date >= d))
            .filter(|s| end.map_or(true, |d| s.shave_date <= d))
            .map(Shave::amount_in_default),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::MAX_QUANTITY;
    use chrono::Utc;

    fn currency(id: &str, is_default: bool) -> Currency {
        Currency {
            id: id.to_string(),
            code: id.to_uppercase(),
            name: id.to_string(),
            is_default,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(stock: i64, price: i64) -> Item {
        Item {
            id: "i1".to_string(),
            name: "Pomade".to_string(),
            price_cents: price,
            currency_id: "usd".to_string(),
            exchange_rate_micros: 1_000_000,
            amount_in_default_cents: price,
            salon_id: "s1".to_string(),
            current_stock: stock,
            purposes: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn shave(amount: i64, status: ShaveStatus, day: u32) -> Shave {
        Shave {
            id: format!("sh{}", day),
            barber_id: "b1".to_string(),
            hairstyle_id: "h1".to_string(),
            amount_cents: amount,
            currency_id: "usd".to_string(),
            exchange_rate_micros: 1_000_000,
            amount_in_default_cents: amount,
            client_id: None,
            cash_register_id: "r1".to_string(),
            booked_cents: 0,
            shave_date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            salon_id: "s1".to_string(),
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn transalon(kind: TransactionKind, amount: i64) -> Transalon {
        Transalon {
            id: "t1".to_string(),
            name: "rent".to_string(),
            amount_cents: amount,
            currency_id: "usd".to_string(),
            exchange_rate_micros: 1_000_000,
            amount_in_default_cents: amount,
            transaction_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            kind,
            cash_register_id: "r1".to_string(),
            booked_cents: 0,
            salon_id: "s1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn purchase(qty: i64, unit: i64) -> ItemPurchase {
        ItemPurchase {
            id: "p1".to_string(),
            item_id: "i1".to_string(),
            quantity: qty,
            purchase_price_cents: unit,
            currency_id: "usd".to_string(),
            exchange_rate_micros: 1_000_000,
            purchase_price_in_default_cents: unit,
            purchase_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            supplier: String::new(),
            cash_register_id: "r1".to_string(),
            booked_cents: 0,
            salon_id: "s1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_directions() {
        let ten = Money::from_cents(1000);
        assert_eq!(Direction::for_payment().signed(ten).cents(), -1000);
        assert_eq!(Direction::for_transalon(TransactionKind::Income).signed(ten).cents(), 1000);
        assert_eq!(Direction::for_transalon(TransactionKind::Expenses).signed(ten).cents(), -1000);
        assert_eq!(Direction::for_shave(ShaveStatus::Completed).signed(ten).cents(), 1000);
        assert_eq!(Direction::for_shave(ShaveStatus::Scheduled).signed(ten).cents(), 0);
        assert_eq!(Direction::for_purchase().signed(ten).cents(), -1000);
    }

    #[test]
    fn test_same_currency_uses_raw_amount() {
        let eur = currency("eur", false);
        let event = EventAmount {
            currency: &eur,
            amount: Money::from_cents(1000),
            amount_in_default: Money::from_cents(1087),
        };
        assert_eq!(amount_in_register_currency(&event, &eur).unwrap().cents(), 1000);
    }

    #[test]
    fn test_default_register_uses_converted_amount() {
        let eur = currency("eur", false);
        let usd = currency("usd", true);
        let event = EventAmount {
            currency: &eur,
            amount: Money::from_cents(1000),
            amount_in_default: Money::from_cents(1087),
        };
        assert_eq!(effect(Direction::Credit, &event, &usd).unwrap().cents(), 1087);
    }

    #[test]
    fn test_foreign_register_mismatch() {
        let eur = currency("eur", false);
        let gbp = currency("gbp", false);
        let event = EventAmount {
            currency: &eur,
            amount: Money::from_cents(1000),
            amount_in_default: Money::from_cents(1087),
        };
        let err = effect(Direction::Debit, &event, &gbp).unwrap_err();
        assert!(matches!(err, CoreError::CurrencyMismatch { .. }));

        // Neutral events are never rejected
        assert!(effect(Direction::Neutral, &event, &gbp).unwrap().is_zero());
    }

    #[test]
    fn test_stock_rules() {
        assert_eq!(stock_after_usage(&item(5, 100), 3).unwrap(), 2);
        assert_eq!(stock_after_usage(&item(3, 100), 3).unwrap(), 0);
        let err = stock_after_usage(&item(2, 100), 3).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { available: 2, requested: 3, .. }));
        assert!(stock_after_purchase_revert(&item(1, 100), 2).is_err());
    }

    #[test]
    fn test_ensure_shave_completed() {
        assert!(ensure_shave_completed(&shave(100, ShaveStatus::Completed, 1)).is_ok());
        let err = ensure_shave_completed(&shave(100, ShaveStatus::InProgress, 1)).unwrap_err();
        assert!(matches!(err, CoreError::ShaveNotCompleted { .. }));
    }

    #[test]
    fn test_register_totals() {
        let totals = register_totals(&[
            transalon(TransactionKind::Income, 5000),
            transalon(TransactionKind::Income, 1500),
            transalon(TransactionKind::Expenses, 2000),
        ])
        .unwrap();
        assert_eq!(totals.income.cents(), 6500);
        assert_eq!(totals.expenses.cents(), 2000);
        assert_eq!(totals.net().unwrap().cents(), 4500);
    }

    #[test]
    fn test_average_purchase_price() {
        assert!(average_purchase_price(&[]).unwrap().is_zero());
        // (2 × 300 + 1 × 600) / 3 = 400
        let avg = average_purchase_price(&[purchase(2, 300), purchase(1, 600)]).unwrap();
        assert_eq!(avg.cents(), 400);
    }

    #[test]
    fn test_inventory_and_shave_totals() {
        assert_eq!(inventory_value(&[item(2, 450), item(1, 100)]).unwrap().cents(), 1000);

        let s = shave(2000, ShaveStatus::Completed, 1);
        let total = shave_total_amount(&s, &[(Money::from_cents(450), 2)]).unwrap();
        assert_eq!(total.cents(), 2900);
    }

    #[test]
    fn test_aggregates_report_overflow() {
        let huge = item(4, i64::MAX / 3);
        let err = inventory_value(&[huge]).unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow { .. }));

        let both = [item(1, i64::MAX), item(1, 1)];
        assert!(inventory_value(&both).is_err());

        let s = shave(2000, ShaveStatus::Completed, 1);
        assert!(shave_total_amount(&s, &[(Money::from_cents(i64::MAX), 2)]).is_err());

        let shaves = [
            shave(i64::MAX, ShaveStatus::Completed, 1),
            shave(1, ShaveStatus::Completed, 2),
        ];
        assert!(revenue(&shaves, None, None).is_err());
    }

    #[test]
    fn test_restock_is_bounded() {
        assert_eq!(stock_after_restock(&item(5, 100), 3).unwrap(), 8);
        assert!(stock_after_restock(&item(i64::MAX, 100), 1).is_err());
        assert!(stock_after_restock(&item(MAX_QUANTITY, 100), 1).is_err());
    }

    #[test]
    fn test_revenue_counts_completed_in_range() {
        let shaves = vec![
            shave(1000, ShaveStatus::Completed, 1),
            shave(2000, ShaveStatus::Completed, 10),
            shave(4000, ShaveStatus::Cancelled, 10),
            shave(8000, ShaveStatus::Completed, 20),
        ];
        assert_eq!(revenue(&shaves, None, None).unwrap().cents(), 11000);
        let start = NaiveDate::from_ymd_opt(2024, 3, 5);
        let end = NaiveDate::from_ymd_opt(2024, 3, 15);
        assert_eq!(revenue(&shaves, start, end).unwrap().cents(), 2000);
    }
}
