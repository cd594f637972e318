//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::{EngineError, ResultEngine};

/// Render a decimal for a TEXT column.
pub(crate) fn decimal_to_db(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Render an optional decimal for a nullable TEXT column.
pub(crate) fn optional_decimal_to_db(value: Option<Decimal>) -> Option<String> {
    value.map(decimal_to_db)
}

/// Parse a decimal from storage and return a labeled error on failure.
pub(crate) fn parse_decimal(value: &str, label: &str) -> ResultEngine<Decimal> {
    Decimal::from_str(value.trim())
        .map_err(|_| EngineError::InvalidStoredValue(format!("invalid {label}: {value}")))
}

/// Parse a nullable decimal column.
pub(crate) fn parse_optional_decimal(
    value: Option<&str>,
    label: &str,
) -> ResultEngine<Option<Decimal>> {
    value.map(|v| parse_decimal(v, label)).transpose()
}

/// Trim a required name and reject empty values.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidAmount(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim optional free text, mapping blank input to `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}
