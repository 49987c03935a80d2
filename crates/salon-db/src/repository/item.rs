//! # Item Repository
//!
//! Inventory items of a salon. Stock moves through usages (down) and
//! purchases (up); an update may also set it directly after a count.
//! Each item lists the hairstyles it is meant for in `item_purposes`.

use std::collections::HashMap;

use chrono::Utc;
use salon_core::ledger;
use salon_core::validation::{validate_name, validate_non_negative_amount, validate_stock};
use salon_core::{ExchangeRate, Hairstyle, Item, ItemPurchase, Money, Page, Pagination};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::booking;
use super::{ensure_same_salon, fetch_page, generate_id, like, require, require_scoped, search};
use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub price: Money,
    /// Falls back to the default currency.
    pub currency_id: Option<String>,
    pub exchange_rate: ExchangeRate,
    pub current_stock: i64,
    /// Hairstyle ids of the same salon.
    pub purposes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub name: Option<String>,
    /// Only items meant for this hairstyle.
    pub hairstyle_id: Option<String>,
    /// Only items with at most this many units left.
    pub max_stock: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    pub async fn create(&self, salon_id: &str, input: NewItem) -> DbResult<Item> {
        let name = validate_name(&input.name)?;
        validate_non_negative_amount("price", input.price.cents())?;
        validate_stock(input.current_stock)?;

        let mut tx = self.pool.begin().await?;
        let priced = booking::price(
            &mut tx,
            input.currency_id.as_deref(),
            input.price,
            input.exchange_rate,
        )
        .await?;
        check_purposes(&mut tx, salon_id, &input.purposes).await?;

        let now = Utc::now();
        let mut item = Item {
            id: generate_id(),
            name,
            price_cents: input.price.cents(),
            currency_id: priced.currency.id.clone(),
            exchange_rate_micros: priced.rate.micros(),
            amount_in_default_cents: priced.amount_in_default.cents(),
            salon_id: salon_id.to_string(),
            current_stock: input.current_stock,
            purposes: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO items (id, name, price_cents, currency_id, exchange_rate_micros, \
             amount_in_default_cents, salon_id, current_stock, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(item.price_cents)
        .bind(&item.currency_id)
        .bind(item.exchange_rate_micros)
        .bind(item.amount_in_default_cents)
        .bind(&item.salon_id)
        .bind(item.current_stock)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("name", &item.name),
            other => other,
        })?;

        item.purposes = replace_purposes(&mut tx, &item.id, &input.purposes).await?;
        tx.commit().await?;

        info!(item_id = %item.id, name = %item.name, stock = item.current_stock, "Item created");
        Ok(item)
    }

    pub async fn get(&self, salon_id: &str, id: &str) -> DbResult<Item> {
        let mut item: Item = require_scoped(&self.pool, "items", "Item", salon_id, id).await?;
        item.purposes = sqlx::query_scalar(
            "SELECT hairstyle_id FROM item_purposes WHERE item_id = ?1 ORDER BY hairstyle_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(item)
    }

    pub async fn list(
        &self,
        salon_id: &str,
        filter: &ItemFilter,
        pagination: Pagination,
    ) -> DbResult<Page<Item>> {
        let name = search("name", filter.name.as_deref())?;
        let owner = salon_id.to_string();

        let mut page: Page<Item> = fetch_page(&self.pool, "items", "name ASC", pagination, |qb| {
            qb.push(" AND salon_id = ");
            qb.push_bind(owner.clone());
            if let Some(n) = &name {
                qb.push(" AND name LIKE ");
                qb.push_bind(like(n));
            }
            if let Some(h) = &filter.hairstyle_id {
                qb.push(" AND id IN (SELECT item_id FROM item_purposes WHERE hairstyle_id = ");
                qb.push_bind(h.clone());
                qb.push(")");
            }
            if let Some(max) = filter.max_stock {
                qb.push(" AND current_stock <= ");
                qb.push_bind(max);
            }
        })
        .await?;

        let mut purposes = self.purposes_by_item(salon_id).await?;
        for item in &mut page.items {
            item.purposes = purposes.remove(&item.id).unwrap_or_default();
        }
        Ok(page)
    }

    /// Replaces every editable field, purposes included.
    pub async fn update(&self, salon_id: &str, id: &str, input: NewItem) -> DbResult<Item> {
        let name = validate_name(&input.name)?;
        validate_non_negative_amount("price", input.price.cents())?;
        validate_stock(input.current_stock)?;

        let mut tx = self.pool.begin().await?;
        let _: Item = require_scoped(&mut *tx, "items", "Item", salon_id, id).await?;
        let priced = booking::price(
            &mut tx,
            input.currency_id.as_deref(),
            input.price,
            input.exchange_rate,
        )
        .await?;
        check_purposes(&mut tx, salon_id, &input.purposes).await?;

        sqlx::query(
            "UPDATE items SET name = ?2, price_cents = ?3, currency_id = ?4, \
             exchange_rate_micros = ?5, amount_in_default_cents = ?6, current_stock = ?7, \
             updated_at = ?8 WHERE id = ?1",
        )
        .bind(id)
        .bind(&name)
        .bind(input.price.cents())
        .bind(&priced.currency.id)
        .bind(priced.rate.micros())
        .bind(priced.amount_in_default.cents())
        .bind(input.current_stock)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("name", &name),
            other => other,
        })?;

        let purposes = replace_purposes(&mut tx, id, &input.purposes).await?;
        let mut item: Item = require(&mut *tx, "items", "Item", id).await?;
        item.purposes = purposes;
        tx.commit().await?;

        debug!(item_id = %id, stock = item.current_stock, "Item updated");
        Ok(item)
    }

    /// Deletes the item with its usages and purchases; purchase payments
    /// go back to their registers.
    pub async fn delete(&self, salon_id: &str, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let _: Item = require_scoped(&mut *tx, "items", "Item", salon_id, id).await?;

        booking::unbook_all(&mut tx, "item_purchases", "item_id = ?1", id).await?;
        sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(item_id = %id, "Item deleted");
        Ok(())
    }

    // =========================================================================
    // Valuation
    // =========================================================================

    /// Average unit price paid over the item's purchases.
    pub async fn average_purchase_price(&self, salon_id: &str, id: &str) -> DbResult<Money> {
        let _: Item = require_scoped(&self.pool, "items", "Item", salon_id, id).await?;
        let purchases =
            sqlx::query_as::<_, ItemPurchase>("SELECT * FROM item_purchases WHERE item_id = ?1")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;
        Ok(ledger::average_purchase_price(&purchases)?)
    }

    /// Σ price × stock over the salon's items.
    pub async fn inventory_value(&self, salon_id: &str) -> DbResult<Money> {
        let items = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE salon_id = ?1")
            .bind(salon_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ledger::inventory_value(&items)?)
    }

    async fn purposes_by_item(&self, salon_id: &str) -> DbResult<HashMap<String, Vec<String>>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT p.item_id, p.hairstyle_id FROM item_purposes p \
             JOIN items i ON i.id = p.item_id WHERE i.salon_id = ?1 \
             ORDER BY p.hairstyle_id",
        )
        .bind(salon_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_item: HashMap<String, Vec<String>> = HashMap::new();
        for (item_id, hairstyle_id) in rows {
            by_item.entry(item_id).or_default().push(hairstyle_id);
        }
        Ok(by_item)
    }
}

async fn check_purposes(
    conn: &mut SqliteConnection,
    salon_id: &str,
    hairstyle_ids: &[String],
) -> DbResult<()> {
    for id in hairstyle_ids {
        let hairstyle: Hairstyle = require(&mut *conn, "hairstyles", "Hairstyle", id).await?;
        ensure_same_salon("Hairstyle", &hairstyle.id, &hairstyle.salon_id, salon_id)?;
    }
    Ok(())
}

async fn replace_purposes(
    conn: &mut SqliteConnection,
    item_id: &str,
    hairstyle_ids: &[String],
) -> DbResult<Vec<String>> {
    sqlx::query("DELETE FROM item_purposes WHERE item_id = ?1")
        .bind(item_id)
        .execute(&mut *conn)
        .await?;

    let mut purposes: Vec<String> = hairstyle_ids.to_vec();
    purposes.sort();
    purposes.dedup();

    for hairstyle_id in &purposes {
        sqlx::query("INSERT INTO item_purposes (item_id, hairstyle_id) VALUES (?1, ?2)")
            .bind(item_id)
            .bind(hairstyle_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(purposes)
}
