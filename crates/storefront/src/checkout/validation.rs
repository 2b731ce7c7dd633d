//! Delivery detail validation.
//!
//! Runs before anything is sent to the order service. Field keys match the
//! order service's own `fieldErrors` so both can be shown on the same form.

use serde::Deserialize;

use food_order_core::{Phone, PhoneError};

use crate::orders::FieldErrors;

/// Field key for the delivery address.
pub const ADDRESS_FIELD: &str = "deliveryAddress";
/// Field key for the delivery phone.
pub const PHONE_FIELD: &str = "deliveryPhone";
/// Field key for the delivery instructions.
pub const INSTRUCTIONS_FIELD: &str = "deliveryInstructions";

const ADDRESS_MIN_CHARS: usize = 10;
const ADDRESS_MAX_CHARS: usize = 200;
const INSTRUCTIONS_MAX_CHARS: usize = 500;

/// Delivery details as entered by the shopper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeliveryDetails {
    pub address: String,
    pub phone: String,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// Delivery details that passed validation, trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDelivery {
    pub address: String,
    pub phone: Phone,
    /// Empty when the shopper gave none.
    pub instructions: String,
}

/// Validate delivery details, collecting every field error.
///
/// # Errors
///
/// Returns the field errors keyed by field name if any field is invalid.
pub fn validate_delivery(details: &DeliveryDetails) -> Result<ValidatedDelivery, FieldErrors> {
    let mut errors = FieldErrors::new();

    let address = details.address.trim();
    let address_len = address.chars().count();
    if address.is_empty() {
        errors.insert(
            ADDRESS_FIELD.to_string(),
            "Delivery address is required".to_string(),
        );
    } else if !(ADDRESS_MIN_CHARS..=ADDRESS_MAX_CHARS).contains(&address_len) {
        errors.insert(
            ADDRESS_FIELD.to_string(),
            format!(
                "Delivery address must be between {ADDRESS_MIN_CHARS} and {ADDRESS_MAX_CHARS} characters"
            ),
        );
    }

    let phone = Phone::parse(&details.phone)
        .map_err(|e| {
            let message = match e {
                PhoneError::Empty => "Delivery phone is required".to_string(),
                PhoneError::NonDigit => "Delivery phone must contain digits only".to_string(),
                PhoneError::WrongLength { expected } => {
                    format!("Delivery phone must be exactly {expected} digits")
                }
            };
            errors.insert(PHONE_FIELD.to_string(), message);
        })
        .ok();

    let instructions = details.instructions.as_deref().unwrap_or_default().trim();
    if instructions.chars().count() > INSTRUCTIONS_MAX_CHARS {
        errors.insert(
            INSTRUCTIONS_FIELD.to_string(),
            format!("Delivery instructions must be at most {INSTRUCTIONS_MAX_CHARS} characters"),
        );
    }

    match phone {
        Some(phone) if errors.is_empty() => Ok(ValidatedDelivery {
            address: address.to_string(),
            phone,
            instructions: instructions.to_string(),
        }),
        _ => Err(errors),
    }
}
