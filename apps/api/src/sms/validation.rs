//! Input checks for `POST /api/sms/send`, plus phone masking for history and logs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;

static US_PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{3}-\d{3}-\d{4}$").expect("static phone regex is valid"));

static MASKABLE_PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{3})-(\d{3})-(\d{4})").expect("static mask regex is valid"));

pub const MISSING_FIELDS_MESSAGE: &str =
    "All fields are required: cityId, technicianId, customerName, customerPhone";
pub const INVALID_PHONE_MESSAGE: &str =
    "Invalid phone number format. Please use XXX-XXX-XXXX format";

/// Raw send request. Every field is optional so a missing one yields our own 400
/// instead of the extractor's rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSmsRequest {
    pub city_id: Option<String>,
    pub technician_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
}

/// A send request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSend {
    pub city_id: Uuid,
    pub technician_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
}

pub fn is_valid_us_phone(phone: &str) -> bool {
    US_PHONE_REGEX.is_match(phone)
}

/// `404-555-1234` → `XXX-XXX-1234`. Anything not in that shape is returned unchanged.
pub fn mask_phone(phone: &str) -> String {
    MASKABLE_PHONE_REGEX
        .replace(phone, "XXX-XXX-$3")
        .into_owned()
}

pub fn validate_send_request(req: &SendSmsRequest) -> Result<ValidatedSend, AppError> {
    let present = |field: &Option<String>| {
        field
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
    };

    let (Some(city_id), Some(technician_id), Some(customer_name), Some(customer_phone)) = (
        present(&req.city_id),
        present(&req.technician_id),
        present(&req.customer_name),
        present(&req.customer_phone),
    ) else {
        return Err(AppError::Validation(MISSING_FIELDS_MESSAGE.to_string()));
    };

    if !is_valid_us_phone(&customer_phone) {
        return Err(AppError::Validation(INVALID_PHONE_MESSAGE.to_string()));
    }

    Ok(ValidatedSend {
        city_id: parse_id("cityId", &city_id)?,
        technician_id: parse_id("technicianId", &technician_id)?,
        customer_name,
        customer_phone,
    })
}

fn parse_id(field: &str, raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation(format!("Invalid {field} format")))
}
