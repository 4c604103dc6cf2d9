pub mod product;
pub mod review;
pub mod user;

use validator::ValidationError;

use crate::error::ApiError;

pub const PAGE_SIZE: u64 = 10;

pub fn total_pages(count: u64) -> u64 {
    count.div_ceil(PAGE_SIZE)
}

/// Missing or non-numeric pages fall back to the first page. Page 0 does not
/// exist.
pub fn parse_page(raw: Option<&str>) -> Result<u64, ApiError> {
    match raw.map(str::trim).and_then(|raw| raw.parse::<i64>().ok()) {
        None => Ok(1),
        Some(page) if page >= 1 => Ok(page as u64),
        Some(_) => Err(ApiError::field("page", "Page must be 1 or greater")),
    }
}

pub fn parse_id(raw: &str, what: &str) -> Result<i32, ApiError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {what} ID")))
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Numbers arrive either as JSON numbers or numeric strings from form inputs.
pub(crate) fn number_from(value: Option<&serde_json::Value>) -> Option<f64> {
    let number = match value? {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}
