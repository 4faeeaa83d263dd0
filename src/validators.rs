//! Input validation for quantities and phone numbers.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// Largest quantity accepted for one cart line
pub const MAX_QUANTITY: f64 = 100.0;

/// Longest name, city or branch accepted during checkout, in characters
pub const MAX_FIELD_LENGTH: usize = 255;

lazy_static! {
    static ref QUANTITY_REGEX: Regex =
        Regex::new(r"[0-9]+(?:[.,][0-9]+)?").expect("Quantity pattern should be valid");
    static ref PHONE_REGEX: Regex =
        Regex::new(r"^(?:\+38|38)?(0[0-9]{9})$").expect("Phone pattern should be valid");
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("expects a number")]
    NotANumber,
    #[error("must be positive")]
    NotPositive,
    #[error("maximum 100")]
    TooLarge,
    #[error("invalid phone number")]
    InvalidPhone,
    #[error("empty")]
    EmptyField,
    #[error("too long")]
    FieldTooLong,
}

impl ValidationError {
    /// Localization key of the message shown to the user
    pub fn message_key(&self) -> &'static str {
        match self {
            ValidationError::NotANumber => "error-quantity-not-number",
            ValidationError::NotPositive => "error-quantity-not-positive",
            ValidationError::TooLarge => "error-quantity-too-large",
            ValidationError::InvalidPhone => "error-phone-invalid",
            ValidationError::EmptyField => "error-field-empty",
            ValidationError::FieldTooLong => "error-field-too-long",
        }
    }
}

/// Parse a quantity such as `"2"`, `"1,5"` or `"3 л"`.
///
/// Whitespace is ignored and the first number in the text wins.
pub fn parse_quantity(input: &str) -> Result<f64, ValidationError> {
    let compact: String = input.trim().chars().filter(|c| !c.is_whitespace()).collect();

    let number = QUANTITY_REGEX
        .find(&compact)
        .ok_or(ValidationError::NotANumber)?
        .as_str()
        .replace(',', ".");
    let quantity: f64 = number.parse().map_err(|_| ValidationError::NotANumber)?;

    if quantity <= 0.0 {
        return Err(ValidationError::NotPositive);
    }
    if quantity > MAX_QUANTITY {
        return Err(ValidationError::TooLarge);
    }
    Ok(quantity)
}

/// Normalize a Ukrainian phone number to `+380XXXXXXXXX`
pub fn normalize_phone(input: &str) -> Result<String, ValidationError> {
    let compact: String = input
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    PHONE_REGEX
        .captures(&compact)
        .and_then(|caps| caps.get(1))
        .map(|local| format!("+38{}", local.as_str()))
        .ok_or(ValidationError::InvalidPhone)
}

/// Trim a free-text checkout field and bound its length
pub fn validate_field(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField);
    }

    if trimmed.chars().count() > MAX_FIELD_LENGTH {
        return Err(ValidationError::FieldTooLong);
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_accepts_integers_and_decimals() {
        assert_eq!(parse_quantity("2"), Ok(2.0));
        assert_eq!(parse_quantity("1.5"), Ok(1.5));
        assert_eq!(parse_quantity("1,5"), Ok(1.5));
        assert_eq!(parse_quantity("  3 л "), Ok(3.0));
        assert_eq!(parse_quantity("100"), Ok(100.0));
    }

    #[test]
    fn test_quantity_strips_internal_whitespace() {
        assert_eq!(parse_quantity("1 0"), Ok(10.0));
        assert_eq!(parse_quantity("2 , 5"), Ok(2.5));
    }

    #[test]
    fn test_quantity_rejections() {
        assert_eq!(parse_quantity("abc"), Err(ValidationError::NotANumber));
        assert_eq!(parse_quantity(""), Err(ValidationError::NotANumber));
        assert_eq!(parse_quantity("0"), Err(ValidationError::NotPositive));
        assert_eq!(parse_quantity("0,0"), Err(ValidationError::NotPositive));
        assert_eq!(parse_quantity("100.5"), Err(ValidationError::TooLarge));
        assert_eq!(parse_quantity("1 000"), Err(ValidationError::TooLarge));
    }

    #[test]
    fn test_quantity_error_messages() {
        assert_eq!(ValidationError::NotANumber.to_string(), "expects a number");
        assert_eq!(ValidationError::NotPositive.to_string(), "must be positive");
        assert_eq!(ValidationError::TooLarge.to_string(), "maximum 100");
    }

    #[test]
    fn test_phone_accepted_forms() {
        for input in [
            "0932599103",
            "380932599103",
            "+380932599103",
            "+38 (093) 259-91-03",
            " 093 259 91 03 ",
        ] {
            assert_eq!(normalize_phone(input), Ok("+380932599103".to_string()), "{input}");
        }
    }

    #[test]
    fn test_phone_rejected_forms() {
        for input in ["", "93259910", "1932599103", "+390932599103", "09325991034", "phone"] {
            assert_eq!(normalize_phone(input), Err(ValidationError::InvalidPhone), "{input}");
        }
    }

    #[test]
    fn test_non_ascii_digits_are_not_digits() {
        for input in ["0٩٣٢٥٩٩١٠٣", "+380٩٣٢٥٩٩١٠٣", "０９３２５９９１０３"] {
            assert_eq!(normalize_phone(input), Err(ValidationError::InvalidPhone), "{input}");
        }
        assert_eq!(parse_quantity("٢"), Err(ValidationError::NotANumber));
        assert_eq!(parse_quantity("٢ 3"), Ok(3.0));
    }

    #[test]
    fn test_phone_normalization_is_idempotent() {
        for input in ["0932599103", "38 067 123 45 67", "+380501112233"] {
            let once = normalize_phone(input).unwrap();
            assert_eq!(normalize_phone(&once).unwrap(), once);
            assert_eq!(once.len(), 13);
        }
    }

    #[test]
    fn test_field_validation() {
        assert_eq!(validate_field("  Іваненко Іван "), Ok("Іваненко Іван".to_string()));
        assert_eq!(validate_field("   "), Err(ValidationError::EmptyField));

        // Limit counts characters, not bytes
        let cyrillic = "я".repeat(MAX_FIELD_LENGTH);
        assert_eq!(validate_field(&cyrillic), Ok(cyrillic.clone()));
        assert_eq!(
            validate_field(&format!("{cyrillic}я")),
            Err(ValidationError::FieldTooLong)
        );
    }
}
