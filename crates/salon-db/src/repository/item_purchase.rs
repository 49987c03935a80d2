//! # Item Purchase Repository
//!
//! Restocking paid from a cash register.
//!
//! ```text
//! create   stock += quantity    balance -= unit price × quantity
//! delete   stock -= quantity    balance += unit price × quantity
//!          (refused when the units were already used up)
//! ```

use chrono::{NaiveDate, Utc};
use salon_core::ledger::{self, Direction};
use salon_core::money::convert_to_default;
use salon_core::validation::{
    validate_optional, validate_optional_date_range, validate_positive_amount, validate_quantity,
};
use salon_core::{ExchangeRate, Item, ItemPurchase, Money, Page, Pagination};
use sqlx::SqlitePool;
use tracing::info;

use super::booking::{self, Priced};
use super::{ensure_same_salon, fetch_page, generate_id, like, require, require_scoped, search};
use crate::error::DbResult;

const MAX_SUPPLIER_LEN: usize = 255;

#[derive(Debug, Clone)]
pub struct NewItemPurchase {
    pub item_id: String,
    pub quantity: i64,
    /// Unit price.
    pub purchase_price: Money,
    /// Falls back to the default currency.
    pub currency_id: Option<String>,
    pub exchange_rate: ExchangeRate,
    pub purchase_date: NaiveDate,
    pub supplier: String,
    pub cash_register_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct ItemPurchaseFilter {
    pub item_id: Option<String>,
    pub supplier: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct ItemPurchaseRepository {
    pool: SqlitePool,
}

impl ItemPurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ItemPurchaseRepository { pool }
    }

    pub async fn create(&self, salon_id: &str, input: NewItemPurchase) -> DbResult<ItemPurchase> {
        validate_quantity(input.quantity)?;
        validate_positive_amount("purchase_price", input.purchase_price.cents())?;
        let supplier = validate_optional("supplier", Some(&input.supplier), MAX_SUPPLIER_LEN)?
            .unwrap_or_default();

        let mut tx = self.pool.begin().await?;
        let item: Item = require(&mut *tx, "items", "Item", &input.item_id).await?;
        ensure_same_salon("Item", &item.id, &item.salon_id, salon_id)?;
        let register = booking::register_in_salon(&mut tx, &input.cash_register_id, salon_id).await?;

        let unit = booking::price(
            &mut tx,
            input.currency_id.as_deref(),
            input.purchase_price,
            input.exchange_rate,
        )
        .await?;
        let total = input.purchase_price.multiply_quantity(input.quantity)?;
        let total_priced = Priced {
            amount_in_default: convert_to_default(total, unit.rate, unit.currency.is_default)?,
            currency: unit.currency.clone(),
            rate: unit.rate,
        };
        let booked_cents =
            booking::book(&mut tx, &register, Direction::for_purchase(), &total_priced, total).await?;

        let stock = ledger::stock_after_restock(&item, input.quantity)?;
        booking::set_stock(&mut tx, &item.id, stock).await?;

        let now = Utc::now();
        let purchase = ItemPurchase {
            id: generate_id(),
            item_id: item.id.clone(),
            quantity: input.quantity,
            purchase_price_cents: input.purchase_price.cents(),
            currency_id: unit.currency.id.clone(),
            exchange_rate_micros: unit.rate.micros(),
            purchase_price_in_default_cents: unit.amount_in_default.cents(),
            purchase_date: input.purchase_date,
            supplier,
            cash_register_id: register.id.clone(),
            booked_cents,
            salon_id: salon_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO item_purchases (id, item_id, quantity, purchase_price_cents, currency_id, \
             exchange_rate_micros, purchase_price_in_default_cents, purchase_date, supplier, \
             cash_register_id, booked_cents, salon_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(&purchase.id)
        .bind(&purchase.item_id)
        .bind(purchase.quantity)
        .bind(purchase.purchase_price_cents)
        .bind(&purchase.currency_id)
        .bind(purchase.exchange_rate_micros)
        .bind(purchase.purchase_price_in_default_cents)
        .bind(purchase.purchase_date)
        .bind(&purchase.supplier)
        .bind(&purchase.cash_register_id)
        .bind(purchase.booked_cents)
        .bind(&purchase.salon_id)
        .bind(purchase.created_at)
        .bind(purchase.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(
            purchase_id = %purchase.id,
            item_id = %purchase.item_id,
            quantity = purchase.quantity,
            booked_cents = purchase.booked_cents,
            "Item purchase recorded"
        );
        Ok(purchase)
    }

    pub async fn get(&self, salon_id: &str, id: &str) -> DbResult<ItemPurchase> {
        require_scoped(&self.pool, "item_purchases", "ItemPurchase", salon_id, id).await
    }

    pub async fn list(
        &self,
        salon_id: &str,
        filter: &ItemPurchaseFilter,
        pagination: Pagination,
    ) -> DbResult<Page<ItemPurchase>> {
        validate_optional_date_range(filter.start_date, filter.end_date)?;
        let supplier = search("supplier", filter.supplier.as_deref())?;
        let salon_id = salon_id.to_string();

        fetch_page(
            &self.pool,
            "item_purchases",
            "purchase_date DESC, created_at DESC",
            pagination,
            |qb| {
                qb.push(" AND salon_id = ");
                qb.push_bind(salon_id.clone());
                if let Some(i) = &filter.item_id {
                    qb.push(" AND item_id = ");
                    qb.push_bind(i.clone());
                }
                if let Some(s) = &supplier {
                    qb.push(" AND supplier LIKE ");
                    qb.push_bind(like(s));
                }
                if let Some(start) = filter.start_date {
                    qb.push(" AND purchase_date >= ");
                    qb.push_bind(start);
                }
                if let Some(end) = filter.end_date {
                    qb.push(" AND purchase_date <= ");
                    qb.push_bind(end);
                }
            },
        )
        .await
    }

    /// Deletes the purchase: its units leave stock and its cost goes back
    /// to the register.
    pub async fn delete(&self, salon_id: &str, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let purchase: ItemPurchase =
            require_scoped(&mut *tx, "item_purchases", "ItemPurchase", salon_id, id).await?;
        let item: Item = require(&mut *tx, "items", "Item", &purchase.item_id).await?;

        let stock = ledger::stock_after_purchase_revert(&item, purchase.quantity)?;
        booking::set_stock(&mut tx, &item.id, stock).await?;
        booking::unbook(&mut tx, &purchase.cash_register_id, purchase.booked_cents).await?;

        sqlx::query("DELETE FROM item_purchases WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(purchase_id = %id, reverted_cents = -purchase.booked_cents, "Item purchase deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::item_usage::NewItemUsage;
    use crate::repository::test_support::*;
    use salon_core::validation::{MAX_AMOUNT_CENTS, MAX_QUANTITY};
    use salon_core::CoreError;

    fn purchase(item_id: &str, register_id: &str, quantity: i64, unit_cents: i64) -> NewItemPurchase {
        NewItemPurchase {
            item_id: item_id.to_string(),
            quantity,
            purchase_price: Money::from_cents(unit_cents),
            currency_id: None,
            exchange_rate: ExchangeRate::one(),
            purchase_date: date(2024, 6, 1),
            supplier: "Barber Supply Co".to_string(),
            cash_register_id: register_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_purchase_adds_stock_and_pays() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let r = register(&db, &s, "Till", None, 10_000).await;
        let wax = item(&db, &s, "Wax", 500, 0).await;

        let p = db
            .item_purchases()
            .create(&s.id, purchase(&wax.id, &r.id, 4, 300))
            .await
            .unwrap();
        assert_eq!(p.booked_cents, -1_200);
        assert_eq!(p.purchase_price_in_default_cents, 300);
        assert_eq!(balance(&db, &r.id).await, 8_800);
        assert_eq!(db.items().get(&s.id, &wax.id).await.unwrap().current_stock, 4);

        db.item_purchases().delete(&s.id, &p.id).await.unwrap();
        assert_eq!(balance(&db, &r.id).await, 10_000);
        assert_eq!(db.items().get(&s.id, &wax.id).await.unwrap().current_stock, 0);
    }

    #[tokio::test]
    async fn test_delete_refused_when_units_used() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let r = register(&db, &s, "Till", None, 10_000).await;
        let wax = item(&db, &s, "Wax", 500, 0).await;

        let p = db
            .item_purchases()
            .create(&s.id, purchase(&wax.id, &r.id, 2, 300))
            .await
            .unwrap();
        db.item_usages()
            .create(
                &s.id,
                NewItemUsage {
                    item_id: wax.id.clone(),
                    shave_id: None,
                    barber_id: None,
                    quantity: 1,
                    note: "tester".to_string(),
                },
            )
            .await
            .unwrap();

        let err = db.item_purchases().delete(&s.id, &p.id).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::InsufficientStock { .. })));
        assert_eq!(balance(&db, &r.id).await, 9_400);
    }

    #[tokio::test]
    async fn test_foreign_currency_on_default_register() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let eur = currency(&db, "EUR", "Euro").await;
        let r = register(&db, &s, "Till", None, 10_000).await;
        let wax = item(&db, &s, "Wax", 500, 0).await;

        let mut input = purchase(&wax.id, &r.id, 2, 460);
        input.currency_id = Some(eur.id);
        input.exchange_rate = "0.92".parse().unwrap();
        let p = db.item_purchases().create(&s.id, input).await.unwrap();

        assert_eq!(p.purchase_price_in_default_cents, 500);
        assert_eq!(p.booked_cents, -1_000);
        assert_eq!(balance(&db, &r.id).await, 9_000);

        let avg = db.items().average_purchase_price(&s.id, &wax.id).await.unwrap();
        assert_eq!(avg.cents(), 460);

        let page = db
            .item_purchases()
            .list(
                &s.id,
                &ItemPurchaseFilter {
                    supplier: Some("supply".to_string()),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_oversized_purchase_is_rejected_without_side_effects() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let r = register(&db, &s, "Till", None, 10_000).await;
        let wax = item(&db, &s, "Wax", 500, 1).await;

        // Unit price beyond the amount cap
        let err = db
            .item_purchases()
            .create(&s.id, purchase(&wax.id, &r.id, 4, i64::MAX / 3))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Validation(_))));

        // Each field in range, the product is not
        let err = db
            .item_purchases()
            .create(&s.id, purchase(&wax.id, &r.id, MAX_QUANTITY, MAX_AMOUNT_CENTS))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::AmountOverflow { .. })));

        assert_eq!(balance(&db, &r.id).await, 10_000);
        assert_eq!(db.items().get(&s.id, &wax.id).await.unwrap().current_stock, 1);
    }

    #[tokio::test]
    async fn test_conversion_overflow_is_rejected() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let eur = currency(&db, "EUR", "Euro").await;
        let r = register(&db, &s, "Till", None, 10_000).await;
        let wax = item(&db, &s, "Wax", 500, 0).await;

        let mut input = purchase(&wax.id, &r.id, 1, MAX_AMOUNT_CENTS);
        input.currency_id = Some(eur.id);
        input.exchange_rate = ExchangeRate::from_micros(1).unwrap();
        let err = db.item_purchases().create(&s.id, input).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::AmountOverflow { .. })));

        assert_eq!(balance(&db, &r.id).await, 10_000);
        let page = db
            .item_purchases()
            .list(&s.id, &ItemPurchaseFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_long_supplier_search_is_rejected() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;

        let filter = ItemPurchaseFilter {
            supplier: Some("x".repeat(101)),
            ..Default::default()
        };
        let err = db
            .item_purchases()
            .list(&s.id, &filter, Pagination::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Validation(_))));
    }
}
