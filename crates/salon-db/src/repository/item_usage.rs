//! # Item Usage Repository
//!
//! Units of stock consumed, usually by a completed shave. Creating a usage
//! takes the units off the item; deleting it puts them back.

use chrono::{NaiveDate, Utc};
use salon_core::ledger;
use salon_core::validation::{validate_optional, validate_optional_date_range, validate_quantity};
use salon_core::{Barber, Item, ItemUsage, Page, Pagination, Shave};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::booking;
use super::{ensure_same_salon, fetch_page, generate_id, require, require_scoped};
use crate::error::{DbError, DbResult};

const MAX_NOTE_LEN: usize = 1000;

#[derive(Debug, Clone)]
pub struct NewItemUsage {
    pub item_id: String,
    pub shave_id: Option<String>,
    pub barber_id: Option<String>,
    pub quantity: i64,
    pub note: String,
}

#[derive(Debug, Clone, Default)]
pub struct ItemUsageFilter {
    pub item_id: Option<String>,
    pub barber_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct ItemUsageRepository {
    pool: SqlitePool,
}

impl ItemUsageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ItemUsageRepository { pool }
    }

    pub async fn create(&self, salon_id: &str, input: NewItemUsage) -> DbResult<ItemUsage> {
        validate_quantity(input.quantity)?;
        let note = validate_optional("note", Some(&input.note), MAX_NOTE_LEN)?.unwrap_or_default();

        let mut tx = self.pool.begin().await?;
        let item: Item = require(&mut *tx, "items", "Item", &input.item_id).await?;
        ensure_same_salon("Item", &item.id, &item.salon_id, salon_id)?;

        if let Some(shave_id) = &input.shave_id {
            let shave: Shave = require(&mut *tx, "shaves", "Shave", shave_id).await?;
            ensure_same_salon("Shave", &shave.id, &shave.salon_id, salon_id)?;
            ledger::ensure_shave_completed(&shave)?;
        }
        if let Some(barber_id) = &input.barber_id {
            let barber: Barber = require(&mut *tx, "barbers", "Barber", barber_id).await?;
            ensure_same_salon("Barber", &barber.id, &barber.salon_id, salon_id)?;
        }

        let stock = ledger::stock_after_usage(&item, input.quantity)?;
        booking::set_stock(&mut tx, &item.id, stock).await?;

        let now = Utc::now();
        let usage = ItemUsage {
            id: generate_id(),
            item_id: input.item_id,
            shave_id: input.shave_id,
            barber_id: input.barber_id,
            quantity: input.quantity,
            note,
            salon_id: salon_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO item_usages (id, item_id, shave_id, barber_id, quantity, note, \
             salon_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&usage.id)
        .bind(&usage.item_id)
        .bind(&usage.shave_id)
        .bind(&usage.barber_id)
        .bind(usage.quantity)
        .bind(&usage.note)
        .bind(&usage.salon_id)
        .bind(usage.created_at)
        .bind(usage.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("shave_id", usage.shave_id.clone().unwrap_or_default())
            }
            other => other,
        })?;
        tx.commit().await?;

        info!(
            usage_id = %usage.id,
            item_id = %usage.item_id,
            quantity = usage.quantity,
            stock_left = stock,
            "Item usage recorded"
        );
        Ok(usage)
    }

    pub async fn get(&self, salon_id: &str, id: &str) -> DbResult<ItemUsage> {
        require_scoped(&self.pool, "item_usages", "ItemUsage", salon_id, id).await
    }

    pub async fn list(
        &self,
        salon_id: &str,
        filter: &ItemUsageFilter,
        pagination: Pagination,
    ) -> DbResult<Page<ItemUsage>> {
        validate_optional_date_range(filter.start_date, filter.end_date)?;
        let salon_id = salon_id.to_string();
        let start = filter.start_date.map(|d| d.to_string());
        let end = filter.end_date.map(|d| d.to_string());

        fetch_page(&self.pool, "item_usages", "created_at DESC", pagination, |qb| {
            qb.push(" AND salon_id = ");
            qb.push_bind(salon_id.clone());
            if let Some(i) = &filter.item_id {
                qb.push(" AND item_id = ");
                qb.push_bind(i.clone());
            }
            if let Some(b) = &filter.barber_id {
                qb.push(" AND barber_id = ");
                qb.push_bind(b.clone());
            }
            if let Some(s) = &start {
                qb.push(" AND substr(created_at, 1, 10) >= ");
                qb.push_bind(s.clone());
            }
            if let Some(e) = &end {
                qb.push(" AND substr(created_at, 1, 10) <= ");
                qb.push_bind(e.clone());
            }
        })
        .await
    }

    /// Deletes the usage and returns its units to stock.
    pub async fn delete(&self, salon_id: &str, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let usage: ItemUsage =
            require_scoped(&mut *tx, "item_usages", "ItemUsage", salon_id, id).await?;
        let item: Item = require(&mut *tx, "items", "Item", &usage.item_id).await?;

        let stock = ledger::stock_after_restock(&item, usage.quantity)?;
        booking::set_stock(&mut tx, &item.id, stock).await?;
        sqlx::query("DELETE FROM item_usages WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!(usage_id = %id, restored = usage.quantity, "Item usage deleted");
        Ok(())
    }
}
