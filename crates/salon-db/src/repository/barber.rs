//! # Barber Repository
//!
//! A barber is a user working for one salon with a barber type. Deleting a
//! barber takes their payments and shaves with it, so their register
//! effects are reverted first.

use chrono::Utc;
use salon_core::validation::{validate_phone, validate_required, MAX_NAME_LEN, MAX_PHONE_LEN};
use salon_core::{Barber, BarberType, Page, Pagination, User};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::{booking, fetch_page, generate_id, require, require_scoped};
use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct NewBarber {
    pub user_id: String,
    pub barber_type_id: String,
    pub address: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default)]
pub struct BarberUpdate {
    pub barber_type_id: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BarberFilter {
    pub barber_type_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BarberRepository {
    pool: SqlitePool,
}

impl BarberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BarberRepository { pool }
    }

    pub async fn create(&self, salon_id: &str, input: NewBarber) -> DbResult<Barber> {
        let address = validate_required("address", &input.address, MAX_NAME_LEN)?;
        let phone = validate_phone(&input.phone, MAX_PHONE_LEN)?;
        let _: User = require(&self.pool, "users", "User", &input.user_id).await?;
        let _: BarberType = require(&self.pool, "barber_types", "BarberType", &input.barber_type_id).await?;

        let now = Utc::now();
        let barber = Barber {
            id: generate_id(),
            user_id: input.user_id,
            salon_id: salon_id.to_string(),
            barber_type_id: input.barber_type_id,
            address,
            phone,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO barbers (id, user_id, salon_id, barber_type_id, address, phone, \
             created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&barber.id)
        .bind(&barber.user_id)
        .bind(&barber.salon_id)
        .bind(&barber.barber_type_id)
        .bind(&barber.address)
        .bind(&barber.phone)
        .bind(barber.created_at)
        .bind(barber.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("user_id", &barber.user_id),
            other => other,
        })?;

        info!(barber_id = %barber.id, salon_id = %salon_id, "Barber created");
        Ok(barber)
    }

    pub async fn get(&self, salon_id: &str, id: &str) -> DbResult<Barber> {
        require_scoped(&self.pool, "barbers", "Barber", salon_id, id).await
    }

    pub async fn list(
        &self,
        salon_id: &str,
        filter: &BarberFilter,
        pagination: Pagination,
    ) -> DbResult<Page<Barber>> {
        let salon_id = salon_id.to_string();
        fetch_page(&self.pool, "barbers", "created_at ASC", pagination, |qb| {
            qb.push(" AND salon_id = ");
            qb.push_bind(salon_id.clone());
            if let Some(t) = &filter.barber_type_id {
                qb.push(" AND barber_type_id = ");
                qb.push_bind(t.clone());
            }
            if let Some(u) = &filter.user_id {
                qb.push(" AND user_id = ");
                qb.push_bind(u.clone());
            }
        })
        .await
    }

    pub async fn update(&self, salon_id: &str, id: &str, update: BarberUpdate) -> DbResult<Barber> {
        let current = self.get(salon_id, id).await?;

        let barber_type_id = match update.barber_type_id {
            Some(t) => {
                let _: BarberType = require(&self.pool, "barber_types", "BarberType", &t).await?;
                t
            }
            None => current.barber_type_id,
        };
        let address = match &update.address {
            Some(a) => validate_required("address", a, MAX_NAME_LEN)?,
            None => current.address,
        };
        let phone = match &update.phone {
            Some(p) => validate_phone(p, MAX_PHONE_LEN)?,
            None => current.phone,
        };

        sqlx::query(
            "UPDATE barbers SET barber_type_id = ?2, address = ?3, phone = ?4, updated_at = ?5 \
             WHERE id = ?1",
        )
        .bind(id)
        .bind(&barber_type_id)
        .bind(&address)
        .bind(&phone)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(barber_id = %id, "Barber updated");
        self.get(salon_id, id).await
    }

    /// Deletes the barber, reverting their payments and shaves first.
    pub async fn delete(&self, salon_id: &str, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let _: Barber = require_scoped(&mut *tx, "barbers", "Barber", salon_id, id).await?;

        booking::unbook_all(&mut tx, "payments", "barber_id = ?1", id).await?;
        booking::unbook_all(&mut tx, "shaves", "barber_id = ?1", id).await?;

        sqlx::query("DELETE FROM barbers WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(barber_id = %id, salon_id = %salon_id, "Barber deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::*;

    #[tokio::test]
    async fn test_one_barber_record_per_user_and_salon() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let b = barber(&db, &s, "dave@salon.test").await;

        let err = db
            .barbers()
            .create(
                &s.id,
                NewBarber {
                    user_id: b.user_id.clone(),
                    barber_type_id: b.barber_type_id.clone(),
                    address: "2 Main St".to_string(),
                    phone: "555-0101".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_scoped_to_salon() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let main = salon(&db, &owner, "Main", None).await;
        let other = salon(&db, &owner, "Other", None).await;
        let b = barber(&db, &main, "dave@salon.test").await;

        assert!(db.barbers().get(&main.id, &b.id).await.is_ok());
        assert!(matches!(
            db.barbers().get(&other.id, &b.id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));

        let updated = db
            .barbers()
            .update(
                &main.id,
                &b.id,
                BarberUpdate {
                    phone: Some("555-0199".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.phone, "555-0199");

        let page = db
            .barbers()
            .list(&main.id, &BarberFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }
}
