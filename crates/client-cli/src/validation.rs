//! Client-side form checks. These only gate submission; the API validates again.

use once_cell::sync::Lazy;
use regex::Regex;
use shared::PackInput;
use thiserror::Error;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_NAME_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a valid email and a password with 6+ characters.")]
    Login,
    #[error("Please complete the form with valid details.")]
    Registration,
    #[error("Please fill in name, SKU, a numeric price and validity in months.")]
    Pack,
    #[error("Please enter a name and a valid email.")]
    Customer,
    #[error("Please choose both a customer and a pack.")]
    Assignment,
}

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

/// Length is counted in UTF-16 code units, the way browser forms count it.
pub fn is_valid_password(value: &str) -> bool {
    value.encode_utf16().count() >= MIN_PASSWORD_LEN
}

pub fn is_valid_name(value: &str) -> bool {
    value.trim().chars().count() >= MIN_NAME_LEN
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationError> {
    if is_valid_email(email) && is_valid_password(password) {
        Ok(())
    } else {
        Err(ValidationError::Login)
    }
}

pub fn validate_registration(name: &str, email: &str, password: &str) -> Result<(), ValidationError> {
    if is_valid_name(name) && is_valid_email(email) && is_valid_password(password) {
        Ok(())
    } else {
        Err(ValidationError::Registration)
    }
}

/// Parse the pack form. Name and SKU must be non-blank, price a finite
/// non-negative number and validity a whole number of months.
pub fn parse_pack(
    name: &str,
    sku: &str,
    price: &str,
    validity_months: &str,
    description: &str,
) -> Result<PackInput, ValidationError> {
    let price = price
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p >= 0.0);
    let validity = validity_months.trim().parse::<u32>().ok();

    match (price, validity) {
        (Some(price), Some(validity_months)) if !name.trim().is_empty() && !sku.trim().is_empty() => {
            Ok(PackInput {
                name: name.trim().to_string(),
                description: description.trim().to_string(),
                sku: sku.trim().to_string(),
                price,
                validity_months,
            })
        }
        _ => Err(ValidationError::Pack),
    }
}

pub fn validate_customer(name: &str, email: &str) -> Result<(), ValidationError> {
    if !name.trim().is_empty() && is_valid_email(email) {
        Ok(())
    } else {
        Err(ValidationError::Customer)
    }
}

pub fn validate_assignment(customer_id: &str, pack_id: &str) -> Result<(), ValidationError> {
    if customer_id.trim().is_empty() || pack_id.trim().is_empty() {
        Err(ValidationError::Assignment)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_accepts_plain_address() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.co"));
    }

    #[test]
    fn test_email_rejects_malformed() {
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_short_password_blocks_login_even_with_good_email() {
        assert_eq!(validate_login("user@example.com", "12345"), Err(ValidationError::Login));
        assert_eq!(validate_login("user@example.com", "123456"), Ok(()));
    }

    #[test]
    fn test_password_length_counts_utf16_units() {
        assert!(is_valid_password("pässwö"));
        assert!(!is_valid_password("äöü"));
        // Each key is a surrogate pair
        assert!(is_valid_password("🔑🔑🔑"));
        assert!(!is_valid_password("🔑🔑"));
    }

    #[test]
    fn test_registration_requires_trimmed_name() {
        assert_eq!(
            validate_registration(" J ", "jane@example.com", "secret1"),
            Err(ValidationError::Registration)
        );
        assert_eq!(validate_registration("Jo", "jane@example.com", "secret1"), Ok(()));
    }

    #[test]
    fn test_pack_form_parses_numbers() {
        let pack = parse_pack(" Pro ", "PRO-1", "29.5", "12", "").unwrap();
        assert_eq!(pack.name, "Pro");
        assert_eq!(pack.price, 29.5);
        assert_eq!(pack.validity_months, 12);
    }

    #[test]
    fn test_pack_form_rejects_missing_or_bad_fields() {
        assert_eq!(parse_pack("", "S", "1", "1", ""), Err(ValidationError::Pack));
        assert_eq!(parse_pack("N", " ", "1", "1", ""), Err(ValidationError::Pack));
        assert_eq!(parse_pack("N", "S", "abc", "1", ""), Err(ValidationError::Pack));
        assert_eq!(parse_pack("N", "S", "-3", "1", ""), Err(ValidationError::Pack));
        assert_eq!(parse_pack("N", "S", "1", "1.5", ""), Err(ValidationError::Pack));
    }

    #[test]
    fn test_assignment_needs_both_ids() {
        assert_eq!(validate_assignment("1", ""), Err(ValidationError::Assignment));
        assert_eq!(validate_assignment("1", "2"), Ok(()));
    }
}
