//! # Repository Module
//!
//! One repository per aggregate, all sharing the helpers below.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP handler                                                          │
//! │       │  db.payments().create(salon_id, input)                         │
//! │       ▼                                                                 │
//! │  PaymentRepository                                                     │
//! │  ├── BEGIN                                                             │
//! │  ├── check references belong to the salon                             │
//! │  ├── convert amount to default currency (salon-core)                  │
//! │  ├── INSERT payment                                                    │
//! │  ├── book effect on the register (salon-core decides the delta)      │
//! │  └── COMMIT  (any error → ROLLBACK, nothing changed)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! | Repository | Tables |
//! |---|---|
//! | [`user::UserRepository`] | users |
//! | [`currency::CurrencyRepository`] | currencies |
//! | [`payment_type::PaymentTypeRepository`] | payment_types |
//! | [`barber_type::BarberTypeRepository`] | barber_types |
//! | [`salon::SalonRepository`] | salons, salon_permissions |
//! | [`assignment::AssignmentRepository`] | salon_assignments |
//! | [`barber::BarberRepository`] | barbers |
//! | [`client::ClientRepository`] | clients |
//! | [`cash_register::CashRegisterRepository`] | cash_registers |
//! | [`payment::PaymentRepository`] | payments |
//! | [`transalon::TransalonRepository`] | transalons |
//! | [`hairstyle::HairstyleRepository`] | hairstyles, hairstyle_tariffs |
//! | [`shave::ShaveRepository`] | shaves |
//! | [`item::ItemRepository`] | items, item_purposes |
//! | [`item_usage::ItemUsageRepository`] | item_usages |
//! | [`item_purchase::ItemPurchaseRepository`] | item_purchases |

pub mod assignment;
pub mod barber;
pub mod barber_type;
pub(crate) mod booking;
pub mod cash_register;
pub mod client;
pub mod currency;
pub mod hairstyle;
pub mod item;
pub mod item_purchase;
pub mod item_usage;
pub mod payment;
pub mod payment_type;
pub mod salon;
pub mod shave;
pub mod transalon;
pub mod user;

use salon_core::validation::validate_optional_search;
use salon_core::{CoreError, Page, Pagination};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Generates a new record ID (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// `%query%` for LIKE filters.
pub(crate) fn like(query: &str) -> String {
    format!("%{}%", query.trim())
}

/// Filter text checked against the search length cap; blank means no filter.
pub(crate) fn search(field: &str, query: Option<&str>) -> DbResult<Option<String>> {
    Ok(validate_optional_search(field, query)?)
}

/// Fetches one row by id, `None` if absent.
pub(crate) async fn find<'c, T, E>(executor: E, table: &str, id: &str) -> DbResult<Option<T>>
where
    E: Executor<'c, Database = Sqlite>,
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let sql = format!("SELECT * FROM {} WHERE id = ?1", table);
    let row = sqlx::query_as::<_, T>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

/// Fetches one row by id or fails with `NotFound`.
pub(crate) async fn require<'c, T, E>(executor: E, table: &str, entity: &str, id: &str) -> DbResult<T>
where
    E: Executor<'c, Database = Sqlite>,
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    find(executor, table, id)
        .await?
        .ok_or_else(|| DbError::not_found(entity, id))
}

/// Fetches one row by id within a salon; rows of other salons are `NotFound`.
pub(crate) async fn require_scoped<'c, T, E>(
    executor: E,
    table: &str,
    entity: &str,
    salon_id: &str,
    id: &str,
) -> DbResult<T>
where
    E: Executor<'c, Database = Sqlite>,
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let sql = format!("SELECT * FROM {} WHERE id = ?1 AND salon_id = ?2", table);
    sqlx::query_as::<_, T>(&sql)
        .bind(id)
        .bind(salon_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| DbError::not_found(entity, id))
}

/// A referenced record must live in the same salon as the referencing one.
pub(crate) fn ensure_same_salon(
    entity: &str,
    id: &str,
    owner_salon_id: &str,
    salon_id: &str,
) -> DbResult<()> {
    if owner_salon_id != salon_id {
        return Err(CoreError::ForeignSalon {
            entity: entity.to_string(),
            id: id.to_string(),
            salon_id: salon_id.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Runs a filtered, paginated `SELECT *` and its `COUNT(*)`.
///
/// `filters` appends ` AND ...` clauses after `WHERE 1 = 1`; it runs twice,
/// once per statement, so it must be deterministic.
pub(crate) async fn fetch_page<T, F>(
    pool: &SqlitePool,
    table: &str,
    order_by: &str,
    pagination: Pagination,
    filters: F,
) -> DbResult<Page<T>>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    F: for<'q> Fn(&mut QueryBuilder<'q, Sqlite>),
{
    let mut count = QueryBuilder::new(format!("SELECT COUNT(*) FROM {} WHERE 1 = 1", table));
    filters(&mut count);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut select = QueryBuilder::new(format!("SELECT * FROM {} WHERE 1 = 1", table));
    filters(&mut select);
    select.push(format!(" ORDER BY {} LIMIT ", order_by));
    select.push_bind(pagination.limit());
    select.push(" OFFSET ");
    select.push_bind(pagination.offset());
    let items = select.build_query_as::<T>().fetch_all(pool).await?;

    Ok(Page::new(items, pagination, total))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixtures shared by repository tests.

    use chrono::NaiveDate;
    use salon_core::{Barber, CashRegister, Currency, ExchangeRate, Hairstyle, Item, Money, Salon, User};

    use crate::repository::barber::NewBarber;
    use crate::repository::cash_register::NewCashRegister;
    use crate::repository::hairstyle::NewHairstyle;
    use crate::repository::item::NewItem;
    use crate::repository::salon::NewSalon;
    use crate::repository::user::NewUser;
    use crate::{Database, DbConfig};

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub async fn user(db: &Database, email: &str) -> User {
        db.users()
            .create(NewUser {
                email: email.to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                password_hash: "hash".to_string(),
                is_active: true,
                is_staff: false,
                is_superuser: false,
            })
            .await
            .unwrap()
    }

    pub async fn salon(db: &Database, owner: &User, name: &str, parent: Option<&str>) -> Salon {
        db.salons()
            .create(NewSalon {
                name: name.to_string(),
                description: String::new(),
                address: None,
                phone: None,
                email: None,
                parent_id: parent.map(str::to_string),
                owner_id: owner.id.clone(),
            })
            .await
            .unwrap()
    }

    pub async fn currency(db: &Database, code: &str, name: &str) -> Currency {
        db.currencies().create(code, name, false).await.unwrap()
    }

    pub async fn register(
        db: &Database,
        salon: &Salon,
        name: &str,
        currency_id: Option<&str>,
        opening_cents: i64,
    ) -> CashRegister {
        db.cash_registers()
            .create(
                &salon.id,
                NewCashRegister {
                    name: name.to_string(),
                    currency_id: currency_id.map(str::to_string),
                    opening_balance: Money::from_cents(opening_cents),
                },
            )
            .await
            .unwrap()
    }

    pub async fn barber(db: &Database, salon: &Salon, email: &str) -> Barber {
        let user = user(db, email).await;
        let kind = db.barber_types().create("Senior", "").await.unwrap();
        db.barbers()
            .create(
                &salon.id,
                NewBarber {
                    user_id: user.id,
                    barber_type_id: kind.id,
                    address: "1 Main St".to_string(),
                    phone: "555-0100".to_string(),
                },
            )
            .await
            .unwrap()
    }

    pub async fn hairstyle(db: &Database, salon: &Salon, name: &str, tariff_cents: i64) -> Hairstyle {
        db.hairstyles()
            .create(
                &salon.id,
                NewHairstyle {
                    name: name.to_string(),
                    current_tariff: Money::from_cents(tariff_cents),
                    currency_id: None,
                },
            )
            .await
            .unwrap()
    }

    pub async fn item(db: &Database, salon: &Salon, name: &str, price_cents: i64, stock: i64) -> Item {
        db.items()
            .create(
                &salon.id,
                NewItem {
                    name: name.to_string(),
                    price: Money::from_cents(price_cents),
                    currency_id: None,
                    exchange_rate: ExchangeRate::one(),
                    current_stock: stock,
                    purposes: Vec::new(),
                },
            )
            .await
            .unwrap()
    }

    pub async fn balance(db: &Database, register_id: &str) -> i64 {
        db.cash_registers()
            .get_by_id(register_id)
            .await
            .unwrap()
            .balance_cents
    }
}
