//! # Salon Assignment Repository
//!
//! Date ranges during which a barber works at a salon. A current, active
//! assignment gives the barber the assigned-barber permission set.
//!
//! Ranges of the same barber at the same salon never overlap (bounds are
//! inclusive, so one ending on the 30th and the next starting on the 30th
//! collide).

use chrono::{NaiveDate, Utc};
use salon_core::validation::validate_date_range;
use salon_core::{CoreError, Page, Pagination, SalonAssignment};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{fetch_page, generate_id, require, require_scoped};
use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub barber_user_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct AssignmentUpdate {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct AssignmentRepository {
    pool: SqlitePool,
}

impl AssignmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AssignmentRepository { pool }
    }

    pub async fn create(&self, salon_id: &str, input: NewAssignment) -> DbResult<SalonAssignment> {
        validate_date_range(input.start_date, input.end_date)?;

        let mut tx = self.pool.begin().await?;
        let _: salon_core::User = require(&mut *tx, "users", "User", &input.barber_user_id).await?;
        ensure_no_overlap(
            &mut tx,
            salon_id,
            &input.barber_user_id,
            input.start_date,
            input.end_date,
            None,
        )
        .await?;

        let now = Utc::now();
        let assignment = SalonAssignment {
            id: generate_id(),
            salon_id: salon_id.to_string(),
            barber_user_id: input.barber_user_id,
            start_date: input.start_date,
            end_date: input.end_date,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO salon_assignments (id, salon_id, barber_user_id, start_date, end_date, \
             is_active, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&assignment.id)
        .bind(&assignment.salon_id)
        .bind(&assignment.barber_user_id)
        .bind(assignment.start_date)
        .bind(assignment.end_date)
        .bind(assignment.is_active)
        .bind(assignment.created_at)
        .bind(assignment.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(
            salon_id = %salon_id,
            barber_user_id = %assignment.barber_user_id,
            start = %assignment.start_date,
            end = %assignment.end_date,
            "Barber assigned to salon"
        );
        Ok(assignment)
    }

    pub async fn get(&self, salon_id: &str, id: &str) -> DbResult<SalonAssignment> {
        require_scoped(&self.pool, "salon_assignments", "SalonAssignment", salon_id, id).await
    }

    pub async fn list(&self, salon_id: &str, pagination: Pagination) -> DbResult<Page<SalonAssignment>> {
        let salon_id = salon_id.to_string();
        fetch_page(
            &self.pool,
            "salon_assignments",
            "start_date DESC",
            pagination,
            |qb| {
                qb.push(" AND salon_id = ");
                qb.push_bind(salon_id.clone());
            },
        )
        .await
    }

    /// All assignments of one barber user, newest first.
    pub async fn for_user(&self, user_id: &str) -> DbResult<Vec<SalonAssignment>> {
        let rows = sqlx::query_as::<_, SalonAssignment>(
            "SELECT * FROM salon_assignments WHERE barber_user_id = ?1 ORDER BY start_date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn update(
        &self,
        salon_id: &str,
        id: &str,
        update: AssignmentUpdate,
    ) -> DbResult<SalonAssignment> {
        let mut tx = self.pool.begin().await?;
        let current: SalonAssignment =
            require_scoped(&mut *tx, "salon_assignments", "SalonAssignment", salon_id, id).await?;

        let start = update.start_date.unwrap_or(current.start_date);
        let end = update.end_date.unwrap_or(current.end_date);
        let is_active = update.is_active.unwrap_or(current.is_active);
        validate_date_range(start, end)?;
        ensure_no_overlap(&mut tx, salon_id, &current.barber_user_id, start, end, Some(id)).await?;

        sqlx::query(
            "UPDATE salon_assignments SET start_date = ?2, end_date = ?3, is_active = ?4, \
             updated_at = ?5 WHERE id = ?1",
        )
        .bind(id)
        .bind(start)
        .bind(end)
        .bind(is_active)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let updated: SalonAssignment = require(&mut *tx, "salon_assignments", "SalonAssignment", id).await?;
        tx.commit().await?;

        debug!(id = %id, "Assignment updated");
        Ok(updated)
    }

    pub async fn delete(&self, salon_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM salon_assignments WHERE id = ?1 AND salon_id = ?2")
            .bind(id)
            .bind(salon_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SalonAssignment", id));
        }

        info!(id = %id, salon_id = %salon_id, "Assignment deleted");
        Ok(())
    }
}

async fn ensure_no_overlap(
    conn: &mut SqliteConnection,
    salon_id: &str,
    barber_user_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    except_id: Option<&str>,
) -> DbResult<()> {
    let existing = sqlx::query_as::<_, SalonAssignment>(
        "SELECT * FROM salon_assignments WHERE salon_id = ?1 AND barber_user_id = ?2",
    )
    .bind(salon_id)
    .bind(barber_user_id)
    .fetch_all(&mut *conn)
    .await?;

    if let Some(clash) = existing
        .iter()
        .filter(|a| Some(a.id.as_str()) != except_id)
        .find(|a| a.overlaps(start, end))
    {
        return Err(CoreError::OverlappingAssignment {
            existing_id: clash.id.clone(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::*;

    fn range(start: NaiveDate, end: NaiveDate, user_id: &str) -> NewAssignment {
        NewAssignment {
            barber_user_id: user_id.to_string(),
            start_date: start,
            end_date: end,
        }
    }

    #[tokio::test]
    async fn test_overlap_rejected() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let dave = user(&db, "dave@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;

        let first = db
            .assignments()
            .create(&s.id, range(date(2024, 1, 1), date(2024, 6, 30), &dave.id))
            .await
            .unwrap();

        let err = db
            .assignments()
            .create(&s.id, range(date(2024, 6, 30), date(2024, 12, 31), &dave.id))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Rule(CoreError::OverlappingAssignment { ref existing_id }) if *existing_id == first.id
        ));

        db.assignments()
            .create(&s.id, range(date(2024, 7, 1), date(2024, 12, 31), &dave.id))
            .await
            .unwrap();
        assert_eq!(db.assignments().for_user(&dave.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_range_and_update() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let dave = user(&db, "dave@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;

        let err = db
            .assignments()
            .create(&s.id, range(date(2024, 2, 1), date(2024, 1, 1), &dave.id))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Validation(_))));

        let a = db
            .assignments()
            .create(&s.id, range(date(2024, 1, 1), date(2024, 1, 31), &dave.id))
            .await
            .unwrap();

        // Extending its own range is not an overlap with itself
        let a = db
            .assignments()
            .update(
                &s.id,
                &a.id,
                AssignmentUpdate {
                    end_date: Some(date(2024, 3, 31)),
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(a.end_date, date(2024, 3, 31));
        assert!(!a.is_active);

        db.assignments().delete(&s.id, &a.id).await.unwrap();
        assert!(db.assignments().get(&s.id, &a.id).await.is_err());
    }
}
