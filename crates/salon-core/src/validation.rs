//! # Validation Module
//!
//! Field validators for the back office.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: HTTP (serde)        shape and types of the JSON body         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE          lengths, formats, signs, date ranges    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: salon-db             same-salon references, stock, overlap   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: SQLite               NOT NULL, UNIQUE, FOREIGN KEY, CHECK    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! String validators trim their input and return the cleaned value so the
//! caller stores exactly what was checked.
//!
//! ## Usage
//! ```rust
//! use salon_core::validation::{validate_currency_code, validate_quantity};
//!
//! assert_eq!(validate_currency_code(" eur ").unwrap(), "EUR");
//! assert!(validate_quantity(0).is_err());
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::types::Pagination;
use crate::{DEFAULT_PER_PAGE, MAX_PAGE, MAX_PER_PAGE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Generic name columns (salons, registers, items, hairstyles, ...).
pub const MAX_NAME_LEN: usize = 255;
/// First and last names on a user.
pub const MAX_PERSON_NAME_LEN: usize = 90;
pub const MAX_CURRENCY_NAME_LEN: usize = 50;
pub const MAX_SALON_PHONE_LEN: usize = 20;
pub const MAX_PHONE_LEN: usize = 255;
pub const MAX_SEARCH_LEN: usize = 100;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Largest amount accepted on any money field: 9 999 999 999 999.99.
pub const MAX_AMOUNT_CENTS: i64 = 999_999_999_999_999;
/// Largest quantity or stock count.
pub const MAX_QUANTITY: i64 = i32::MAX as i64;

// =============================================================================
// String Validators
// =============================================================================

/// Required text with an upper length bound. Returns the trimmed value.
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Optional text: blank becomes `None`, otherwise bounded by `max`.
pub fn validate_optional(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> ValidationResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => validate_required(field, v, max).map(Some),
    }
}

/// Validates a record name (salon, register, hairstyle, item, ...).
///
/// ```rust
/// use salon_core::validation::validate_name;
///
/// assert_eq!(validate_name("  Main register ").unwrap(), "Main register");
/// assert!(validate_name("").is_err());
/// ```
pub fn validate_name(name: &str) -> ValidationResult<String> {
    validate_required("name", name, MAX_NAME_LEN)
}

/// First or last name of a user.
pub fn validate_person_name(field: &str, name: &str) -> ValidationResult<String> {
    validate_required(field, name, MAX_PERSON_NAME_LEN)
}

/// Currency code: exactly three ASCII letters, returned upper-cased.
pub fn validate_currency_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must be exactly 3 letters".to_string(),
        });
    }

    Ok(code.to_ascii_uppercase())
}

pub fn validate_currency_name(name: &str) -> ValidationResult<String> {
    validate_required("name", name, MAX_CURRENCY_NAME_LEN)
}

/// Email: one `@`, non-empty local part, dotted domain. Returned lowercased.
///
/// ```rust
/// use salon_core::validation::validate_email;
///
/// assert_eq!(validate_email("email", "Bob@Salon.COM").unwrap(), "bob@salon.com");
/// assert!(validate_email("email", "bob@localhost").is_err());
/// ```
pub fn validate_email(field: &str, email: &str) -> ValidationResult<String> {
    let email = validate_required(field, email, MAX_NAME_LEN)?;

    let invalid = || ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid email address".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }

    Ok(email.to_lowercase())
}

pub fn validate_optional_email(field: &str, email: Option<&str>) -> ValidationResult<Option<String>> {
    match email.map(str::trim) {
        None | Some("") => Ok(None),
        Some(e) => validate_email(field, e).map(Some),
    }
}

/// Phone numbers: digits, spaces and `+-().` only, bounded by `max`.
pub fn validate_phone(value: &str, max: usize) -> ValidationResult<String> {
    let phone = validate_required("phone", value, max)?;

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')' | '.'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "may only contain digits, spaces and + - ( ) .".to_string(),
        });
    }

    Ok(phone)
}

pub fn validate_optional_phone(value: Option<&str>, max: usize) -> ValidationResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(p) => validate_phone(p, max).map(Some),
    }
}

/// Search text may be empty; trimmed and capped at 100 characters.
pub fn validate_search_query(field: &str, query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_SEARCH_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_SEARCH_LEN,
        });
    }

    Ok(query.to_string())
}

/// Optional filter text. Blank means "no filter".
pub fn validate_optional_search(field: &str, query: Option<&str>) -> ValidationResult<Option<String>> {
    match query {
        None => Ok(None),
        Some(q) => {
            let q = validate_search_query(field, q)?;
            Ok(if q.is_empty() { None } else { Some(q) })
        }
    }
}

pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Amount must be > 0 (payments, transactions, purchase prices).
pub fn validate_positive_amount(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    validate_at_most(field, cents, MAX_AMOUNT_CENTS)
}

/// Amount must be >= 0 (shave amounts, tariffs, item prices).
pub fn validate_non_negative_amount(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    validate_at_most(field, cents, MAX_AMOUNT_CENTS)
}

pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    validate_at_most("quantity", qty, MAX_QUANTITY)
}

/// Units on hand: zero allowed.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "current_stock".to_string(),
        });
    }
    validate_at_most("current_stock", stock, MAX_QUANTITY)
}

fn validate_at_most(field: &str, value: i64, max: i64) -> ValidationResult<()> {
    if value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max,
        });
    }
    Ok(())
}

pub fn validate_exchange_rate(micros: i64) -> ValidationResult<()> {
    if micros <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "exchange_rate".to_string(),
        });
    }
    Ok(())
}

/// Strict page request check, for clients that send explicit values.
pub fn validate_pagination(page: Option<i64>, per_page: Option<i64>) -> ValidationResult<Pagination> {
    let page = page.unwrap_or(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);

    if !(1..=MAX_PAGE).contains(&page) {
        return Err(ValidationError::OutOfRange {
            field: "page".to_string(),
            min: 1,
            max: MAX_PAGE,
        });
    }
    if !(1..=MAX_PER_PAGE).contains(&per_page) {
        return Err(ValidationError::OutOfRange {
            field: "per_page".to_string(),
            min: 1,
            max: MAX_PER_PAGE,
        });
    }

    Ok(Pagination { page, per_page })
}

// =============================================================================
// Date Validators
// =============================================================================

/// `start` must not be after `end`. Equal dates are a one-day range.
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> ValidationResult<()> {
    if start > end {
        return Err(ValidationError::InvalidDateRange {
            start_field: "start_date".to_string(),
            end_field: "end_date".to_string(),
        });
    }
    Ok(())
}

/// Same check for optional filter bounds; open ends always pass.
pub fn validate_optional_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> ValidationResult<()> {
    match (start, end) {
        (Some(s), Some(e)) => validate_date_range(s, e),
        _ => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name(" Fade ").unwrap(), "Fade");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"a".repeat(256)).is_err());
        assert!(validate_name(&"a".repeat(255)).is_ok());
    }

    #[test]
    fn test_validate_optional() {
        assert_eq!(validate_optional("address", None, 10).unwrap(), None);
        assert_eq!(validate_optional("address", Some("  "), 10).unwrap(), None);
        assert_eq!(
            validate_optional("address", Some(" Main St "), 10).unwrap(),
            Some("Main St".to_string())
        );
        assert!(validate_optional("address", Some("a very long street"), 10).is_err());
    }

    #[test]
    fn test_validate_currency_code() {
        assert_eq!(validate_currency_code("usd").unwrap(), "USD");
        assert!(validate_currency_code("").is_err());
        assert!(validate_currency_code("US").is_err());
        assert!(validate_currency_code("USDT").is_err());
        assert!(validate_currency_code("U5D").is_err());
    }

    #[test]
    fn test_validate_currency_name() {
        assert!(validate_currency_name("Euro").is_ok());
        assert!(validate_currency_name(&"x".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email("email", " A@B.io ").unwrap(), "a@b.io");
        assert!(validate_email("email", "").is_err());
        assert!(validate_email("email", "no-at-sign").is_err());
        assert!(validate_email("email", "@salon.com").is_err());
        assert!(validate_email("email", "a@@salon.com").is_err());
        assert!(validate_email("email", "a@salon.").is_err());
        assert_eq!(validate_optional_email("email", Some("")).unwrap(), None);
    }

    #[test]
    fn test_validate_phone() {
        assert_eq!(validate_phone("+1 (555) 010-9999", 20).unwrap(), "+1 (555) 010-9999");
        assert!(validate_phone("call me", 20).is_err());
        assert!(validate_phone(&"1".repeat(21), MAX_SALON_PHONE_LEN).is_err());
        assert!(validate_phone(&"1".repeat(21), MAX_PHONE_LEN).is_ok());
    }

    #[test]
    fn test_amount_validators() {
        assert!(validate_positive_amount("amount", 1).is_ok());
        assert!(validate_positive_amount("amount", 0).is_err());
        assert!(validate_non_negative_amount("amount", 0).is_ok());
        assert!(validate_non_negative_amount("amount", -1).is_err());
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_exchange_rate(1).is_ok());
        assert!(validate_exchange_rate(0).is_err());
    }

    #[test]
    fn test_amount_and_quantity_upper_bounds() {
        assert!(validate_positive_amount("amount", MAX_AMOUNT_CENTS).is_ok());
        let err = validate_positive_amount("amount", MAX_AMOUNT_CENTS + 1).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
        assert!(validate_non_negative_amount("price", i64::MAX / 3).is_err());

        assert!(validate_quantity(MAX_QUANTITY).is_ok());
        assert!(validate_quantity(MAX_QUANTITY + 1).is_err());
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-1).is_err());
        assert!(validate_stock(i64::MAX).is_err());
    }

    #[test]
    fn test_validate_pagination() {
        let p = validate_pagination(None, None).unwrap();
        assert_eq!((p.page, p.per_page), (1, 10));
        assert!(validate_pagination(Some(0), None).is_err());
        assert!(validate_pagination(None, Some(0)).is_err());
        assert!(validate_pagination(None, Some(101)).is_err());
        assert!(validate_pagination(Some(2), Some(100)).is_ok());

        assert!(validate_pagination(Some(i64::MAX), Some(10)).is_err());
        let last = validate_pagination(Some(MAX_PAGE), Some(MAX_PER_PAGE)).unwrap();
        assert!(last.offset() > 0);
    }

    #[test]
    fn test_validate_date_range() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let feb = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert!(validate_date_range(jan, feb).is_ok());
        assert!(validate_date_range(jan, jan).is_ok());
        assert!(validate_date_range(feb, jan).is_err());
        assert!(validate_optional_date_range(Some(feb), None).is_ok());
        assert!(validate_optional_date_range(Some(feb), Some(jan)).is_err());
    }

    #[test]
    fn test_validate_search_and_password() {
        assert_eq!(validate_search_query("name", "  fade ").unwrap(), "fade");
        assert!(validate_search_query("name", &"q".repeat(101)).is_err());
        assert_eq!(validate_optional_search("name", Some("  ")).unwrap(), None);
        assert_eq!(validate_optional_search("name", None).unwrap(), None);
        assert_eq!(
            validate_optional_search("name", Some(" Fade ")).unwrap(),
            Some("Fade".to_string())
        );
        assert!(validate_optional_search("name", Some(&"q".repeat(101))).is_err());
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }
}
