//! # Cash Register Repository
//!
//! Named balances, one currency each. The balance is never written directly
//! after creation: it only moves through bookings of money events
//! (see `booking.rs`).
//!
//! ## Balance Invariant
//! ```text
//! balance = opening balance + Σ booked_cents of live events on the register
//! ```

use chrono::Utc;
use salon_core::ledger::{register_totals, RegisterTotals};
use salon_core::validation::{validate_name, validate_non_negative_amount};
use salon_core::{CashRegister, Currency, Money, Page, Pagination, Transalon};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::{currency, fetch_page, generate_id, like, require, require_scoped, search};
use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct NewCashRegister {
    pub name: String,
    /// Falls back to the default currency.
    pub currency_id: Option<String>,
    pub opening_balance: Money,
}

/// Register with its income and expense totals.
#[derive(Debug, Clone, Serialize)]
pub struct CashRegisterSummary {
    pub register: CashRegister,
    pub currency_code: String,
    pub total_income_cents: i64,
    pub total_expenses_cents: i64,
    pub net_cents: i64,
}

impl CashRegisterSummary {
    fn new(register: CashRegister, currency: &Currency, totals: RegisterTotals) -> DbResult<Self> {
        Ok(CashRegisterSummary {
            register,
            currency_code: currency.code.clone(),
            total_income_cents: totals.income.cents(),
            total_expenses_cents: totals.expenses.cents(),
            net_cents: totals.net()?.cents(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CashRegisterRepository {
    pool: SqlitePool,
}

impl CashRegisterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CashRegisterRepository { pool }
    }

    pub async fn create(&self, salon_id: &str, input: NewCashRegister) -> DbResult<CashRegister> {
        let name = validate_name(&input.name)?;
        validate_non_negative_amount("balance", input.opening_balance.cents())?;

        let mut tx = self.pool.begin().await?;
        let currency: Currency = match &input.currency_id {
            Some(id) => require(&mut *tx, "currencies", "Currency", id).await?,
            None => currency::default_in(&mut tx).await?,
        };

        let now = Utc::now();
        let register = CashRegister {
            id: generate_id(),
            name,
            balance_cents: input.opening_balance.cents(),
            currency_id: currency.id.clone(),
            salon_id: salon_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO cash_registers (id, name, balance_cents, currency_id, salon_id, \
             created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&register.id)
        .bind(&register.name)
        .bind(register.balance_cents)
        .bind(&register.currency_id)
        .bind(&register.salon_id)
        .bind(register.created_at)
        .bind(register.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("name", &register.name),
            other => other,
        })?;
        tx.commit().await?;

        info!(
            register_id = %register.id,
            salon_id = %salon_id,
            currency = %currency.code,
            opening_cents = register.balance_cents,
            "Cash register created"
        );
        Ok(register)
    }

    pub async fn get(&self, salon_id: &str, id: &str) -> DbResult<CashRegister> {
        require_scoped(&self.pool, "cash_registers", "CashRegister", salon_id, id).await
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<CashRegister> {
        require(&self.pool, "cash_registers", "CashRegister", id).await
    }

    pub async fn list(
        &self,
        salon_id: &str,
        name: Option<&str>,
        pagination: Pagination,
    ) -> DbResult<Page<CashRegister>> {
        let salon_id = salon_id.to_string();
        let name = search("name", name)?;
        fetch_page(&self.pool, "cash_registers", "name ASC", pagination, |qb| {
            qb.push(" AND salon_id = ");
            qb.push_bind(salon_id.clone());
            if let Some(n) = &name {
                qb.push(" AND name LIKE ");
                qb.push_bind(like(n));
            }
        })
        .await
    }

    /// Renames the register. Currency and balance are not editable.
    pub async fn rename(&self, salon_id: &str, id: &str, name: &str) -> DbResult<CashRegister> {
        let name = validate_name(name)?;

        let result = sqlx::query(
            "UPDATE cash_registers SET name = ?3, updated_at = ?4 WHERE id = ?1 AND salon_id = ?2",
        )
        .bind(id)
        .bind(salon_id)
        .bind(&name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("name", &name),
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CashRegister", id));
        }

        debug!(register_id = %id, name = %name, "Cash register renamed");
        self.get(salon_id, id).await
    }

    /// Deletes the register together with every event booked on it.
    pub async fn delete(&self, salon_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM cash_registers WHERE id = ?1 AND salon_id = ?2")
            .bind(id)
            .bind(salon_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CashRegister", id));
        }

        info!(register_id = %id, "Cash register deleted");
        Ok(())
    }

    /// Income and expense totals over the register's transalons.
    pub async fn summary(&self, salon_id: &str, id: &str) -> DbResult<CashRegisterSummary> {
        let register = self.get(salon_id, id).await?;
        let currency: Currency = require(&self.pool, "currencies", "Currency", &register.currency_id).await?;

        let transalons =
            sqlx::query_as::<_, Transalon>("SELECT * FROM transalons WHERE cash_register_id = ?1")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;

        let totals = register_totals(&transalons)?;
        CashRegisterSummary::new(register, &currency, totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::*;

    #[tokio::test]
    async fn test_create_uses_default_currency() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;

        let r = register(&db, &s, "Front desk", None, 5000).await;
        let usd = db.currencies().default().await.unwrap();
        assert_eq!(r.currency_id, usd.id);
        assert_eq!(balance(&db, &r.id).await, 5000);

        let err = db
            .cash_registers()
            .create(
                &s.id,
                NewCashRegister {
                    name: "Front desk".to_string(),
                    currency_id: None,
                    opening_balance: Money::zero(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_rename_and_scope() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let other = salon(&db, &owner, "Other", None).await;
        let r = register(&db, &s, "Front desk", None, 0).await;

        let renamed = db.cash_registers().rename(&s.id, &r.id, "Till 1").await.unwrap();
        assert_eq!(renamed.name, "Till 1");

        let err = db.cash_registers().rename(&other.id, &r.id, "Stolen").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let page = db
            .cash_registers()
            .list(&s.id, Some("till"), Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_empty_summary() {
        let db = db().await;
        let owner = user(&db, "owner@salon.test").await;
        let s = salon(&db, &owner, "Main", None).await;
        let r = register(&db, &s, "Front desk", None, 100).await;

        let summary = db.cash_registers().summary(&s.id, &r.id).await.unwrap();
        assert_eq!(summary.currency_code, "USD");
        assert_eq!(summary.total_income_cents, 0);
        assert_eq!(summary.net_cents, 0);
        assert_eq!(summary.register.balance_cents, 100);
    }
}
