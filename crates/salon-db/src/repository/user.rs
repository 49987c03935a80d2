//! # User Repository
//!
//! Accounts. Password hashing happens in the API layer; this repository only
//! stores the PHC string.

use chrono::Utc;
use salon_core::validation::{validate_email, validate_person_name};
use salon_core::{Page, Pagination, User};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::booking;
use super::{fetch_page, generate_id, like, require, search};
use crate::error::{DbError, DbResult};

/// Input for [`UserRepository::create`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Search form for the user list. Each field is a substring match.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    pub async fn create(&self, input: NewUser) -> DbResult<User> {
        let email = validate_email("email", &input.email)?;
        let first_name = validate_person_name("first_name", &input.first_name)?;
        let last_name = validate_person_name("last_name", &input.last_name)?;

        let now = Utc::now();
        let user = User {
            id: generate_id(),
            email,
            first_name,
            last_name,
            password_hash: input.password_hash,
            is_active: input.is_active,
            is_staff: input.is_staff,
            is_superuser: input.is_superuser,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO users (id, email, first_name, last_name, password_hash, \
             is_active, is_staff, is_superuser, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("email", &user.email),
            other => other,
        })?;

        info!(user_id = %user.id, active = user.is_active, "User created");
        Ok(user)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<User> {
        require(&self.pool, "users", "User", id).await
    }

    /// Case-insensitive lookup, used by the token endpoint.
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?1")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn list(&self, filter: &UserFilter, pagination: Pagination) -> DbResult<Page<User>> {
        debug!(?filter, "Listing users");
        let email = search("email", filter.email.as_deref())?;
        let first_name = search("first_name", filter.first_name.as_deref())?;
        let last_name = search("last_name", filter.last_name.as_deref())?;

        fetch_page(&self.pool, "users", "email ASC", pagination, |qb| {
            if let Some(email) = &email {
                qb.push(" AND email LIKE ");
                qb.push_bind(like(&email.to_lowercase()));
            }
            if let Some(first) = &first_name {
                qb.push(" AND first_name LIKE ");
                qb.push_bind(like(first));
            }
            if let Some(last) = &last_name {
                qb.push(" AND last_name LIKE ");
                qb.push_bind(like(last));
            }
        })
        .await
    }

    /// Activates or deactivates an account. Inactive users resolve no
    /// permissions and can't obtain tokens.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<User> {
        let result = sqlx::query("UPDATE users SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(user_id = %id, active = active, "User activation changed");
        self.get_by_id(id).await
    }

    /// Deletes the account with its barber and client records.
    ///
    /// Payments and shaves of the user's barbers are unbooked first.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let barbers_of_user = "barber_id IN (SELECT id FROM barbers WHERE user_id = ?1)";
        booking::unbook_all(&mut tx, "payments", barbers_of_user, id).await?;
        booking::unbook_all(&mut tx, "shaves", barbers_of_user, id).await?;

        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }
        tx.commit().await?;

        info!(user_id = %id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::payment::NewPayment;
    use crate::repository::shave::NewShave;
    use crate::repository::test_support::*;
    use salon_core::{ExchangeRate, Money, ShaveStatus};

    #[tokio::test]
    async fn test_create_lowercases_email_and_rejects_duplicates() {
        let db = db().await;
        let u = user(&db, "Ada@Example.COM").await;
        assert_eq!(u.email, "ada@example.com");

        let found = db.users().get_by_email("ADA@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, u.id);
        assert_eq!(found.password_hash, "hash");

        let err = db
            .users()
            .create(NewUser {
                email: "ada@example.com".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Again".to_string(),
                password_hash: "x".to_string(),
                is_active: true,
                is_staff: false,
                is_superuser: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_set_active_and_search() {
        let db = db().await;
        let u = user(&db, "grace@example.com").await;
        user(&db, "linus@example.com").await;

        let u = db.users().set_active(&u.id, false).await.unwrap();
        assert!(!u.is_active);

        let page = db
            .users()
            .list(
                &UserFilter {
                    email: Some("grace".to_string()),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);

        let err = db.users().set_active("missing", true).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_reverts_bookings_of_the_users_barbers() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let r = register(&db, &s, "Till", None, 10_000).await;
        let b = barber(&db, &s, "dave@salon.test").await;
        let h = hairstyle(&db, &s, "Fade", 2_000).await;

        db.payments()
            .create(
                &s.id,
                NewPayment {
                    barber_id: b.id.clone(),
                    amount: Money::from_cents(2_500),
                    currency_id: None,
                    exchange_rate: ExchangeRate::one(),
                    start_date: date(2024, 5, 1),
                    end_date: date(2024, 5, 31),
                    payment_type_id: None,
                    cash_register_id: r.id.clone(),
                    payment_date: date(2024, 6, 1),
                },
            )
            .await
            .unwrap();
        db.shaves()
            .create(
                &s.id,
                NewShave {
                    barber_id: b.id.clone(),
                    hairstyle_id: h.id.clone(),
                    amount: None,
                    currency_id: None,
                    exchange_rate: ExchangeRate::one(),
                    client_id: None,
                    cash_register_id: r.id.clone(),
                    shave_date: date(2024, 6, 1),
                    status: ShaveStatus::Completed,
                },
            )
            .await
            .unwrap();
        // 10 000 - 2 500 paid out + 2 000 taken in
        assert_eq!(balance(&db, &r.id).await, 9_500);

        db.users().delete(&b.user_id).await.unwrap();
        assert_eq!(balance(&db, &r.id).await, 10_000);

        let err = db.barbers().get(&s.id, &b.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        let err = db.users().delete(&b.user_id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_long_search_text_is_rejected() {
        let db = db().await;
        let filter = UserFilter {
            last_name: Some("x".repeat(101)),
            ..Default::default()
        };
        let err = db.users().list(&filter, Pagination::default()).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(salon_core::CoreError::Validation(_))));
    }
}
