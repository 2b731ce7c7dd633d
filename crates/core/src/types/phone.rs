//! Delivery phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input contains something other than ASCII digits.
    #[error("phone number must contain digits only")]
    NonDigit,
    /// The input does not have exactly the required number of digits.
    #[error("phone number must be exactly {expected} digits")]
    WrongLength {
        /// Required number of digits.
        expected: usize,
    },
}

/// A delivery phone number.
///
/// ## Constraints
///
/// - Exactly 10 ASCII digits
/// - Surrounding whitespace is ignored; inner separators are not accepted
///
/// ## Examples
///
/// ```
/// use food_order_core::Phone;
///
/// assert!(Phone::parse("9876543210").is_ok());
/// assert!(Phone::parse(" 9876543210 ").is_ok());
///
/// assert!(Phone::parse("").is_err());            // empty
/// assert!(Phone::parse("98765").is_err());       // too short
/// assert!(Phone::parse("98765-43210").is_err()); // separator
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Number of digits in a phone number.
    pub const DIGITS: usize = 10;

    /// Parse a `Phone` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, contains anything
    /// other than ASCII digits, or is not exactly 10 digits long.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();

        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PhoneError::NonDigit);
        }

        if s.len() != Self::DIGITS {
            return Err(PhoneError::WrongLength {
                expected: Self::DIGITS,
            });
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the phone number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Phone` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Phone {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_phone() {
        let phone = Phone::parse("0123456789").expect("valid phone");
        assert_eq!(phone.as_str(), "0123456789");
    }

    #[test]
    fn test_phone_trims_whitespace() {
        let phone = Phone::parse("  9876543210\n").expect("valid phone");
        assert_eq!(phone.to_string(), "9876543210");
    }

    #[test]
    fn test_phone_errors() {
        assert_eq!(Phone::parse("   "), Err(PhoneError::Empty));
        assert_eq!(Phone::parse("98765abcde"), Err(PhoneError::NonDigit));
        assert_eq!(Phone::parse("+919876543210"), Err(PhoneError::NonDigit));
        assert_eq!(
            Phone::parse("98765432101"),
            Err(PhoneError::WrongLength { expected: 10 })
        );
    }
}
