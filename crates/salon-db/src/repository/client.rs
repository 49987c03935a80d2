//! Clients: users known to a salon. Shaves keep their history when a client
//! is removed (`client_id` is set to NULL).

use chrono::Utc;
use salon_core::validation::{validate_optional, validate_optional_phone, MAX_NAME_LEN, MAX_PHONE_LEN};
use salon_core::{Client, Page, Pagination, User};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::{fetch_page, generate_id, require, require_scoped};
use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct NewClient {
    pub user_id: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    pub user_id: Option<String>,
    /// Substring of the phone number.
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    pub async fn create(&self, salon_id: &str, input: NewClient) -> DbResult<Client> {
        let address = validate_optional("address", input.address.as_deref(), MAX_NAME_LEN)?;
        let phone = validate_optional_phone(input.phone.as_deref(), MAX_PHONE_LEN)?;
        let _: User = require(&self.pool, "users", "User", &input.user_id).await?;

        let now = Utc::now();
        let client = Client {
            id: generate_id(),
            user_id: input.user_id,
            salon_id: salon_id.to_string(),
            address,
            phone,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO clients (id, user_id, salon_id, address, phone, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&client.id)
        .bind(&client.user_id)
        .bind(&client.salon_id)
        .bind(&client.address)
        .bind(&client.phone)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("user_id", &client.user_id),
            other => other,
        })?;

        info!(client_id = %client.id, salon_id = %salon_id, "Client created");
        Ok(client)
    }

    pub async fn get(&self, salon_id: &str, id: &str) -> DbResult<Client> {
        require_scoped(&self.pool, "clients", "Client", salon_id, id).await
    }

    pub async fn list(
        &self,
        salon_id: &str,
        filter: &ClientFilter,
        pagination: Pagination,
    ) -> DbResult<Page<Client>> {
        let phone = super::search("phone", filter.phone.as_deref())?;
        let salon_id = salon_id.to_string();
        fetch_page(&self.pool, "clients", "created_at ASC", pagination, |qb| {
            qb.push(" AND salon_id = ");
            qb.push_bind(salon_id.clone());
            if let Some(u) = &filter.user_id {
                qb.push(" AND user_id = ");
                qb.push_bind(u.clone());
            }
            if let Some(p) = &phone {
                qb.push(" AND phone LIKE ");
                qb.push_bind(super::like(p));
            }
        })
        .await
    }

    /// Replaces contact details; blank values clear them.
    pub async fn update(
        &self,
        salon_id: &str,
        id: &str,
        address: Option<&str>,
        phone: Option<&str>,
    ) -> DbResult<Client> {
        let _ = self.get(salon_id, id).await?;
        let address = validate_optional("address", address, MAX_NAME_LEN)?;
        let phone = validate_optional_phone(phone, MAX_PHONE_LEN)?;

        sqlx::query("UPDATE clients SET address = ?2, phone = ?3, updated_at = ?4 WHERE id = ?1")
            .bind(id)
            .bind(&address)
            .bind(&phone)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        debug!(client_id = %id, "Client updated");
        self.get(salon_id, id).await
    }

    pub async fn delete(&self, salon_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM clients WHERE id = ?1 AND salon_id = ?2")
            .bind(id)
            .bind(salon_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        info!(client_id = %id, "Client deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::*;

    #[tokio::test]
    async fn test_client_crud() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let eve = user(&db, "eve@salon.test").await;

        let c = db
            .clients()
            .create(
                &s.id,
                NewClient {
                    user_id: eve.id.clone(),
                    address: None,
                    phone: Some("555-0142".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(c.phone.as_deref(), Some("555-0142"));

        let c = db.clients().update(&s.id, &c.id, Some("3 Elm St"), Some("")).await.unwrap();
        assert_eq!(c.address.as_deref(), Some("3 Elm St"));
        assert!(c.phone.is_none());

        let page = db
            .clients()
            .list(&s.id, &ClientFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);

        db.clients().delete(&s.id, &c.id).await.unwrap();
        assert!(db.clients().delete(&s.id, &c.id).await.is_err());
    }
}
