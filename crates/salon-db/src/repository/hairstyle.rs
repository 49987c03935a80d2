//! # Hairstyle Repository
//!
//! Services a salon offers, with their tariff history.
//!
//! ## Tariff History
//! ```text
//! create(tariff 20.00)        → history: [20.00 @ t0]
//! update(tariff 25.00)        → history: [25.00 @ t1, 20.00 @ t0]
//! update(name only)           → history unchanged
//! tariff_at(t)                → latest entry with effective_at ≤ t,
//!                               else the current tariff
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use salon_core::validation::{validate_name, validate_non_negative_amount, validate_optional_date_range};
use salon_core::{Currency, Hairstyle, HairstyleTariff, Money, Page, Pagination};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{booking, currency, fetch_page, generate_id, like, require, require_scoped, search};
use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct NewHairstyle {
    pub name: String,
    pub current_tariff: Money,
    /// Falls back to the default currency.
    pub currency_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HairstyleUpdate {
    pub name: Option<String>,
    pub current_tariff: Option<Money>,
    pub currency_id: Option<String>,
}

/// Search form for the tariff history. Dates bound `effective_at`'s day.
#[derive(Debug, Clone, Default)]
pub struct TariffFilter {
    pub hairstyle_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct HairstyleRepository {
    pool: SqlitePool,
}

impl HairstyleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        HairstyleRepository { pool }
    }

    /// Creates the hairstyle and its first tariff history entry.
    pub async fn create(&self, salon_id: &str, input: NewHairstyle) -> DbResult<Hairstyle> {
        let name = validate_name(&input.name)?;
        validate_non_negative_amount("current_tariff", input.current_tariff.cents())?;

        let mut tx = self.pool.begin().await?;
        let currency: Currency = match &input.currency_id {
            Some(id) => require(&mut *tx, "currencies", "Currency", id).await?,
            None => currency::default_in(&mut tx).await?,
        };

        let now = Utc::now();
        let hairstyle = Hairstyle {
            id: generate_id(),
            name,
            current_tariff_cents: input.current_tariff.cents(),
            currency_id: currency.id,
            salon_id: salon_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO hairstyles (id, name, current_tariff_cents, currency_id, salon_id, \
             created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&hairstyle.id)
        .bind(&hairstyle.name)
        .bind(hairstyle.current_tariff_cents)
        .bind(&hairstyle.currency_id)
        .bind(&hairstyle.salon_id)
        .bind(hairstyle.created_at)
        .bind(hairstyle.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("name", &hairstyle.name),
            other => other,
        })?;

        insert_tariff(&mut tx, &hairstyle.id, hairstyle.current_tariff_cents, now).await?;
        tx.commit().await?;

        info!(
            hairstyle_id = %hairstyle.id,
            name = %hairstyle.name,
            tariff_cents = hairstyle.current_tariff_cents,
            "Hairstyle created"
        );
        Ok(hairstyle)
    }

    pub async fn get(&self, salon_id: &str, id: &str) -> DbResult<Hairstyle> {
        require_scoped(&self.pool, "hairstyles", "Hairstyle", salon_id, id).await
    }

    pub async fn list(
        &self,
        salon_id: &str,
        name: Option<&str>,
        pagination: Pagination,
    ) -> DbResult<Page<Hairstyle>> {
        let salon_id = salon_id.to_string();
        let name = search("name", name)?;
        fetch_page(&self.pool, "hairstyles", "name ASC", pagination, |qb| {
            qb.push(" AND salon_id = ");
            qb.push_bind(salon_id.clone());
            if let Some(n) = &name {
                qb.push(" AND name LIKE ");
                qb.push_bind(like(n));
            }
        })
        .await
    }

    /// Updates fields; a tariff change appends a history entry.
    pub async fn update(&self, salon_id: &str, id: &str, update: HairstyleUpdate) -> DbResult<Hairstyle> {
        let mut tx = self.pool.begin().await?;
        let current: Hairstyle =
            require_scoped(&mut *tx, "hairstyles", "Hairstyle", salon_id, id).await?;

        let name = match &update.name {
            Some(n) => validate_name(n)?,
            None => current.name.clone(),
        };
        let tariff = update.current_tariff.unwrap_or(current.current_tariff());
        validate_non_negative_amount("current_tariff", tariff.cents())?;
        let currency_id = match &update.currency_id {
            Some(cid) => {
                let c: Currency = require(&mut *tx, "currencies", "Currency", cid).await?;
                c.id
            }
            None => current.currency_id.clone(),
        };

        let now = Utc::now();
        sqlx::query(
            "UPDATE hairstyles SET name = ?2, current_tariff_cents = ?3, currency_id = ?4, \
             updated_at = ?5 WHERE id = ?1",
        )
        .bind(id)
        .bind(&name)
        .bind(tariff.cents())
        .bind(&currency_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("name", &name),
            other => other,
        })?;

        if tariff != current.current_tariff() {
            insert_tariff(&mut tx, id, tariff.cents(), now).await?;
            debug!(
                hairstyle_id = %id,
                old_cents = current.current_tariff_cents,
                new_cents = tariff.cents(),
                "Tariff changed"
            );
        }

        let updated: Hairstyle = require(&mut *tx, "hairstyles", "Hairstyle", id).await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Deletes the hairstyle and its shaves, reverting their bookings first.
    pub async fn delete(&self, salon_id: &str, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let _: Hairstyle = require_scoped(&mut *tx, "hairstyles", "Hairstyle", salon_id, id).await?;

        booking::unbook_all(&mut tx, "shaves", "hairstyle_id = ?1", id).await?;
        sqlx::query("DELETE FROM hairstyles WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(hairstyle_id = %id, "Hairstyle deleted");
        Ok(())
    }

    // =========================================================================
    // Tariffs
    // =========================================================================

    /// Tariff history of the salon's hairstyles, newest first.
    pub async fn tariff_history(
        &self,
        salon_id: &str,
        filter: &TariffFilter,
        pagination: Pagination,
    ) -> DbResult<Page<HairstyleTariff>> {
        validate_optional_date_range(filter.start_date, filter.end_date)?;
        let salon_id = salon_id.to_string();

        fetch_page(
            &self.pool,
            "hairstyle_tariffs",
            "effective_at DESC",
            pagination,
            |qb| {
                qb.push(" AND hairstyle_id IN (SELECT id FROM hairstyles WHERE salon_id = ");
                qb.push_bind(salon_id.clone());
                qb.push(")");
                if let Some(h) = &filter.hairstyle_id {
                    qb.push(" AND hairstyle_id = ");
                    qb.push_bind(h.clone());
                }
                if let Some(start) = filter.start_date {
                    qb.push(" AND substr(effective_at, 1, 10) >= ");
                    qb.push_bind(start);
                }
                if let Some(end) = filter.end_date {
                    qb.push(" AND substr(effective_at, 1, 10) <= ");
                    qb.push_bind(end);
                }
            },
        )
        .await
    }

    /// Records a tariff effective at `effective_at`.
    ///
    /// The current tariff follows when the entry is already in force and no
    /// later entry exists.
    pub async fn add_tariff(
        &self,
        salon_id: &str,
        hairstyle_id: &str,
        tariff: Money,
        effective_at: DateTime<Utc>,
    ) -> DbResult<HairstyleTariff> {
        validate_non_negative_amount("tariff", tariff.cents())?;

        let mut tx = self.pool.begin().await?;
        let hairstyle: Hairstyle =
            require_scoped(&mut *tx, "hairstyles", "Hairstyle", salon_id, hairstyle_id).await?;

        let history = history_in(&mut tx, hairstyle_id).await?;
        let entry = insert_tariff(&mut tx, hairstyle_id, tariff.cents(), effective_at).await?;

        let now = Utc::now();
        let is_latest = history.iter().all(|h| h.effective_at <= effective_at);
        if effective_at <= now && is_latest && tariff != hairstyle.current_tariff() {
            sqlx::query("UPDATE hairstyles SET current_tariff_cents = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(hairstyle_id)
                .bind(tariff.cents())
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        info!(
            hairstyle_id = %hairstyle_id,
            tariff_cents = entry.tariff_cents,
            effective_at = %entry.effective_at,
            "Tariff recorded"
        );
        Ok(entry)
    }

    /// The tariff in force at `at`.
    pub async fn tariff_at(&self, salon_id: &str, id: &str, at: DateTime<Utc>) -> DbResult<Money> {
        let hairstyle = self.get(salon_id, id).await?;
        let mut conn = self.pool.acquire().await?;
        let history = history_in(&mut conn, id).await?;
        Ok(hairstyle.tariff_at(&history, at))
    }
}

async fn insert_tariff(
    conn: &mut SqliteConnection,
    hairstyle_id: &str,
    tariff_cents: i64,
    effective_at: DateTime<Utc>,
) -> DbResult<HairstyleTariff> {
    let entry = HairstyleTariff {
        id: generate_id(),
        hairstyle_id: hairstyle_id.to_string(),
        tariff_cents,
        effective_at,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO hairstyle_tariffs (id, hairstyle_id, tariff_cents, effective_at, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(&entry.id)
    .bind(&entry.hairstyle_id)
    .bind(entry.tariff_cents)
    .bind(entry.effective_at)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(entry)
}

pub(crate) async fn history_in(
    conn: &mut SqliteConnection,
    hairstyle_id: &str,
) -> DbResult<Vec<HairstyleTariff>> {
    let history = sqlx::query_as::<_, HairstyleTariff>(
        "SELECT * FROM hairstyle_tariffs WHERE hairstyle_id = ?1",
    )
    .bind(hairstyle_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::*;
    use chrono::{Duration, TimeZone};

    #[tokio::test]
    async fn test_tariff_change_appends_history() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let h = hairstyle(&db, &s, "Fade", 2_000).await;

        db.hairstyles()
            .update(
                &s.id,
                &h.id,
                HairstyleUpdate {
                    name: Some("Skin fade".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let updated = db
            .hairstyles()
            .update(
                &s.id,
                &h.id,
                HairstyleUpdate {
                    current_tariff: Some(Money::from_cents(2_500)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Skin fade");
        assert_eq!(updated.current_tariff_cents, 2_500);

        let history = db
            .hairstyles()
            .tariff_history(
                &s.id,
                &TariffFilter {
                    hairstyle_id: Some(h.id.clone()),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(history.total, 2);
    }

    #[tokio::test]
    async fn test_tariff_at_uses_backdated_entries() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let h = hairstyle(&db, &s, "Beard trim", 1_500).await;

        let jan = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mar = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        db.hairstyles().add_tariff(&s.id, &h.id, Money::from_cents(1_000), jan).await.unwrap();
        db.hairstyles().add_tariff(&s.id, &h.id, Money::from_cents(1_200), mar).await.unwrap();

        let feb = Utc.with_ymd_and_hms(2024, 2, 14, 12, 0, 0).unwrap();
        assert_eq!(db.hairstyles().tariff_at(&s.id, &h.id, feb).await.unwrap().cents(), 1_000);
        assert_eq!(
            db.hairstyles()
                .tariff_at(&s.id, &h.id, Utc::now() + Duration::hours(1))
                .await
                .unwrap()
                .cents(),
            1_500
        );

        // Backdated entries don't replace the current tariff
        let h = db.hairstyles().get(&s.id, &h.id).await.unwrap();
        assert_eq!(h.current_tariff_cents, 1_500);

        let page = db
            .hairstyles()
            .tariff_history(
                &s.id,
                &TariffFilter {
                    start_date: Some(date(2024, 1, 1)),
                    end_date: Some(date(2024, 1, 31)),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].tariff_cents, 1_000);
    }

    #[tokio::test]
    async fn test_name_unique_per_salon() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let other = salon(&db, &owner, "Other", None).await;
        hairstyle(&db, &s, "Fade", 2_000).await;
        hairstyle(&db, &other, "Fade", 2_000).await;

        let err = db
            .hairstyles()
            .create(
                &s.id,
                NewHairstyle {
                    name: "Fade".to_string(),
                    current_tariff: Money::from_cents(100),
                    currency_id: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let page = db.hairstyles().list(&s.id, Some("fa"), Pagination::default()).await.unwrap();
        assert_eq!(page.total, 1);
    }
}
