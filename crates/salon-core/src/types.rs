//! # Domain Types
//!
//! Records of the salon back office.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Domain Types                                  │
//! │                                                                         │
//! │  Tenancy          People              Finance           Services        │
//! │  ─────────        ──────────          ─────────         ─────────       │
//! │  Salon ◄─┐        User                Currency          Hairstyle       │
//! │   parent─┘        Barber ──► type     CashRegister      HairstyleTariff │
//! │  SalonAssignment  Client              PaymentType       Shave           │
//! │  SalonPermission                      Payment                           │
//! │                                       Transalon         Inventory       │
//! │                                                         ─────────       │
//! │                                                         Item            │
//! │                                                         ItemUsage       │
//! │                                                         ItemPurchase    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conventions
//! - `id`: UUID v4 string, immutable
//! - Money columns end in `_cents` and have a `Money` accessor
//! - Exchange rates are `exchange_rate_micros` with an `ExchangeRate` accessor
//! - Everything below a salon carries `salon_id`

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::{ExchangeRate, Money};
use crate::{DEFAULT_PER_PAGE, MAX_PAGE, MAX_PER_PAGE};

// =============================================================================
// Users
// =============================================================================

/// An account. Barbers and clients are role records pointing at a user.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    /// Always stored lowercased.
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Argon2 PHC string. Never leaves the server.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// =============================================================================
// Currency
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Currency {
    pub id: String,
    /// ISO-style three letter code, upper case.
    pub code: String,
    pub name: String,
    /// Exactly one currency is the default at any time.
    pub is_default: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Salon Tree
// =============================================================================

/// A tenant business unit, optionally nested under a parent salon.
///
/// ```text
/// Downtown Group            (owner: alice)
///  ├── Downtown North       (owner: bob)
///  └── Downtown South       (owner: alice)
///       └── South Kiosk
/// ```
/// Owning or managing a salon extends to every descendant.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Salon {
    pub id: String,
    pub name: String,
    pub description: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub parent_id: Option<String>,
    pub owner_id: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A barber (user) working at a salon for a date range.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalonAssignment {
    pub id: String,
    pub salon_id: String,
    pub barber_user_id: String,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl SalonAssignment {
    /// Active and `today` falls inside `[start_date, end_date]`.
    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.is_active && self.start_date <= today && today <= self.end_date
    }

    /// Whether two date ranges share at least one day.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && start <= self.end_date
    }
}

/// The permission kinds that can be granted on a salon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    /// Implies every other kind.
    Manage,
    Read,
    ManageFinance,
    ManageInventory,
    ManageShave,
    ManageHairstyle,
    ManageBarbers,
}

impl PermissionKind {
    pub const ALL: [PermissionKind; 7] = [
        PermissionKind::Manage,
        PermissionKind::Read,
        PermissionKind::ManageFinance,
        PermissionKind::ManageInventory,
        PermissionKind::ManageShave,
        PermissionKind::ManageHairstyle,
        PermissionKind::ManageBarbers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionKind::Manage => "manage",
            PermissionKind::Read => "read",
            PermissionKind::ManageFinance => "manage_finance",
            PermissionKind::ManageInventory => "manage_inventory",
            PermissionKind::ManageShave => "manage_shave",
            PermissionKind::ManageHairstyle => "manage_hairstyle",
            PermissionKind::ManageBarbers => "manage_barbers",
        }
    }

    /// Whether holding `self` is enough to exercise `wanted`.
    pub fn implies(&self, wanted: PermissionKind) -> bool {
        *self == PermissionKind::Manage || *self == wanted
    }
}

impl std::fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An explicit grant of one kind on one salon.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalonPermission {
    pub id: String,
    pub salon_id: String,
    pub user_id: String,
    pub permission: PermissionKind,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// People
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BarberType {
    pub id: String,
    pub name: String,
    pub description: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Barber {
    pub id: String,
    pub user_id: String,
    pub salon_id: String,
    pub barber_type_id: String,
    pub address: String,
    pub phone: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub user_id: String,
    pub salon_id: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Finance
// =============================================================================

/// A named balance per salon and currency.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashRegister {
    pub id: String,
    pub name: String,
    pub balance_cents: i64,
    pub currency_id: String,
    pub salon_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CashRegister {
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PaymentType {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A payout to a barber for a period. Always an expense on its register.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub barber_id: String,
    pub amount_cents: i64,
    pub currency_id: String,
    pub exchange_rate_micros: i64,
    pub amount_in_default_cents: i64,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    pub payment_type_id: String,
    pub cash_register_id: String,
    /// Signed delta applied to the register when the event was booked.
    pub booked_cents: i64,
    #[ts(as = "String")]
    pub payment_date: NaiveDate,
    pub salon_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    #[inline]
    pub fn amount_in_default(&self) -> Money {
        Money::from_cents(self.amount_in_default_cents)
    }

    #[inline]
    pub fn exchange_rate(&self) -> ExchangeRate {
        ExchangeRate::from_micros(self.exchange_rate_micros).unwrap_or_default()
    }
}

/// Direction of a free-form salon transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expenses,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expenses => "expenses",
        }
    }
}

/// A named income or expense booked on a cash register.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transalon {
    pub id: String,
    pub name: String,
    pub amount_cents: i64,
    pub currency_id: String,
    pub exchange_rate_micros: i64,
    pub amount_in_default_cents: i64,
    #[ts(as = "String")]
    pub transaction_date: NaiveDate,
    pub kind: TransactionKind,
    pub cash_register_id: String,
    /// Signed delta applied to the register when the event was booked.
    pub booked_cents: i64,
    pub salon_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Transalon {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    #[inline]
    pub fn amount_in_default(&self) -> Money {
        Money::from_cents(self.amount_in_default_cents)
    }
}

// =============================================================================
// Services
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Hairstyle {
    pub id: String,
    pub name: String,
    pub current_tariff_cents: i64,
    pub currency_id: String,
    pub salon_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Hairstyle {
    #[inline]
    pub fn current_tariff(&self) -> Money {
        Money::from_cents(self.current_tariff_cents)
    }

    /// Tariff in force at `at`: the latest history entry effective on or
    /// before it, else the current tariff.
    pub fn tariff_at(&self, history: &[HairstyleTariff], at: DateTime<Utc>) -> Money {
        history
            .iter()
            .filter(|h| h.hairstyle_id == self.id && h.effective_at <= at)
            .max_by_key(|h| h.effective_at)
            .map(|h| Money::from_cents(h.tariff_cents))
            .unwrap_or_else(|| self.current_tariff())
    }
}

/// One entry of a hairstyle's tariff history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct HairstyleTariff {
    pub id: String,
    pub hairstyle_id: String,
    pub tariff_cents: i64,
    #[ts(as = "String")]
    pub effective_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of a shave. Only `Completed` shaves touch the register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ShaveStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl ShaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShaveStatus::Scheduled => "scheduled",
            ShaveStatus::InProgress => "in_progress",
            ShaveStatus::Completed => "completed",
            ShaveStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for ShaveStatus {
    fn default() -> Self {
        ShaveStatus::Scheduled
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Shave {
    pub id: String,
    pub barber_id: String,
    pub hairstyle_id: String,
    pub amount_cents: i64,
    pub currency_id: String,
    pub exchange_rate_micros: i64,
    pub amount_in_default_cents: i64,
    pub client_id: Option<String>,
    pub cash_register_id: String,
    /// Signed delta applied to the register when the event was booked.
    pub booked_cents: i64,
    #[ts(as = "String")]
    pub shave_date: NaiveDate,
    pub salon_id: String,
    pub status: ShaveStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Shave {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    #[inline]
    pub fn amount_in_default(&self) -> Money {
        Money::from_cents(self.amount_in_default_cents)
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.status == ShaveStatus::Completed
    }
}

// =============================================================================
// Inventory
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub currency_id: String,
    pub exchange_rate_micros: i64,
    pub amount_in_default_cents: i64,
    pub salon_id: String,
    pub current_stock: i64,
    /// Hairstyles the item is meant for. Loaded separately from `item_purposes`.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub purposes: Vec<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Item {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Price × units on hand.
    #[inline]
    pub fn total_value(&self) -> CoreResult<Money> {
        self.price().multiply_quantity(self.current_stock)
    }
}

/// Units of an item consumed, usually by a completed shave.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ItemUsage {
    pub id: String,
    pub item_id: String,
    pub shave_id: Option<String>,
    pub barber_id: Option<String>,
    pub quantity: i64,
    pub note: String,
    pub salon_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Restocking of an item, paid from a cash register.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ItemPurchase {
    pub id: String,
    pub item_id: String,
    pub quantity: i64,
    /// Unit price.
    pub purchase_price_cents: i64,
    pub currency_id: String,
    pub exchange_rate_micros: i64,
    pub purchase_price_in_default_cents: i64,
    #[ts(as = "String")]
    pub purchase_date: NaiveDate,
    pub supplier: String,
    pub cash_register_id: String,
    /// Signed delta applied to the register when the event was booked.
    pub booked_cents: i64,
    pub salon_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl ItemPurchase {
    /// Unit price × quantity, in the purchase currency.
    #[inline]
    pub fn total_cost(&self) -> CoreResult<Money> {
        Money::from_cents(self.purchase_price_cents).multiply_quantity(self.quantity)
    }

    /// Unit price × quantity, in the default currency.
    #[inline]
    pub fn total_cost_in_default(&self) -> CoreResult<Money> {
        Money::from_cents(self.purchase_price_in_default_cents).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Page request, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    /// Builds a page request, filling defaults and clamping into range.
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Pagination {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    #[inline]
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    #[inline]
    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination::new(None, None)
    }
}

/// One page of a list response.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: Pagination, total: i64) -> Self {
        Page {
            items,
            page: pagination.page,
            per_page: pagination.per_page,
            total,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn assignment(start: NaiveDate, end: NaiveDate, active: bool) -> SalonAssignment {
        SalonAssignment {
            id: "a1".to_string(),
            salon_id: "s1".to_string(),
            barber_user_id: "u1".to_string(),
            start_date: start,
            end_date: end,
            is_active: active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_assignment_is_current() {
        let a = assignment(date(2024, 1, 1), date(2024, 12, 31), true);
        assert!(a.is_current(date(2024, 1, 1)));
        assert!(a.is_current(date(2024, 12, 31)));
        assert!(!a.is_current(date(2025, 1, 1)));

        let inactive = assignment(date(2024, 1, 1), date(2024, 12, 31), false);
        assert!(!inactive.is_current(date(2024, 6, 1)));
    }

    #[test]
    fn test_assignment_overlaps() {
        let a = assignment(date(2024, 1, 1), date(2024, 6, 30), true);
        assert!(a.overlaps(date(2024, 6, 30), date(2024, 7, 31)));
        assert!(a.overlaps(date(2023, 1, 1), date(2025, 1, 1)));
        assert!(!a.overlaps(date(2024, 7, 1), date(2024, 7, 31)));
    }

    #[test]
    fn test_permission_implies() {
        assert!(PermissionKind::Manage.implies(PermissionKind::ManageFinance));
        assert!(PermissionKind::Read.implies(PermissionKind::Read));
        assert!(!PermissionKind::Read.implies(PermissionKind::ManageShave));
    }

    #[test]
    fn test_enum_serialization() {
        assert_eq!(
            serde_json::to_string(&ShaveStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::to_string(&PermissionKind::ManageBarbers).unwrap(),
            "\"manage_barbers\""
        );
        let kind: TransactionKind = serde_json::from_str("\"expenses\"").unwrap();
        assert_eq!(kind, TransactionKind::Expenses);
    }

    #[test]
    fn test_pagination_defaults_and_clamping() {
        let p = Pagination::default();
        assert_eq!((p.page, p.per_page), (1, 10));

        let p = Pagination::new(Some(0), Some(500));
        assert_eq!((p.page, p.per_page), (1, 100));

        let p = Pagination::new(Some(3), Some(20));
        assert_eq!(p.offset(), 40);
        assert_eq!(p.limit(), 20);

        let p = Pagination::new(Some(i64::MAX), Some(100));
        assert_eq!(p.page, MAX_PAGE);
        assert!(p.offset() > 0);
    }

    #[test]
    fn test_user_password_hash_not_serialized() {
        let user = User {
            id: "u1".to_string(),
            email: "a@b.co".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert_eq!(user.full_name(), "Ada Lovelace");
    }

    #[test]
    fn test_tariff_at() {
        use chrono::TimeZone;

        let at = |d: u32| Utc.with_ymd_and_hms(2024, 5, d, 12, 0, 0).unwrap();
        let style = Hairstyle {
            id: "h1".to_string(),
            name: "Fade".to_string(),
            current_tariff_cents: 3000,
            currency_id: "usd".to_string(),
            salon_id: "s1".to_string(),
            created_at: at(1),
            updated_at: at(20),
        };
        let entry = |cents: i64, d: u32| HairstyleTariff {
            id: format!("t{}", d),
            hairstyle_id: "h1".to_string(),
            tariff_cents: cents,
            effective_at: at(d),
            created_at: at(d),
        };
        let history = vec![entry(3000, 20), entry(2000, 1), entry(2500, 10)];

        assert_eq!(style.tariff_at(&history, at(5)).cents(), 2000);
        assert_eq!(style.tariff_at(&history, at(10)).cents(), 2500);
        assert_eq!(style.tariff_at(&history, at(25)).cents(), 3000);
        // Before any history entry the current tariff is used
        assert_eq!(
            style.tariff_at(&history, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()).cents(),
            3000
        );
    }

    #[test]
    fn test_item_values() {
        let now = Utc::now();
        let item = Item {
            id: "i1".to_string(),
            name: "Pomade".to_string(),
            price_cents: 450,
            currency_id: "c1".to_string(),
            exchange_rate_micros: 1_000_000,
            amount_in_default_cents: 450,
            salon_id: "s1".to_string(),
            current_stock: 4,
            purposes: vec![],
            created_at: now,
            updated_at: now,
        };
        assert_eq!(item.total_value().unwrap().cents(), 1800);
    }
}
