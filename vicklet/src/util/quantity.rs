//! Kubernetes resource quantity parsing and formatting.
//!
//! Accepts the quantity grammar: a decimal number followed by an optional
//! decimal SI suffix (`m k M G T P E`), binary suffix (`Ki Mi Gi Ti Pi Ei`)
//! or exponent (`e3`, `E-2`).

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use vicklet_shared::errors::{VickletError, VickletResult};

const BINARY_SUFFIXES: [(&str, i32); 6] = [
    ("Ki", 10),
    ("Mi", 20),
    ("Gi", 30),
    ("Ti", 40),
    ("Pi", 50),
    ("Ei", 60),
];

const DECIMAL_SUFFIXES: [(&str, i32); 7] = [
    ("m", -3),
    ("k", 3),
    ("M", 6),
    ("G", 9),
    ("T", 12),
    ("P", 15),
    ("E", 18),
];

/// Parse a quantity string into its numeric value.
pub fn parse(raw: &str) -> VickletResult<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(invalid(raw));
    }

    for (suffix, power) in BINARY_SUFFIXES {
        if let Some(number) = s.strip_suffix(suffix) {
            return Ok(parse_number(number, raw)? * 2f64.powi(power));
        }
    }

    // Exponent form must be checked before the `E` suffix.
    if let Some((mantissa, exponent)) = s.split_once(['e', 'E'])
        && !exponent.is_empty()
        && let Ok(exponent) = exponent.parse::<i32>()
    {
        return Ok(parse_number(mantissa, raw)? * 10f64.powi(exponent));
    }

    for (suffix, power) in DECIMAL_SUFFIXES {
        if let Some(number) = s.strip_suffix(suffix) {
            return Ok(parse_number(number, raw)? * 10f64.powi(power));
        }
    }

    parse_number(s, raw)
}

fn parse_number(number: &str, raw: &str) -> VickletResult<f64> {
    let valid = !number.is_empty()
        && number
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-'));
    if !valid {
        return Err(invalid(raw));
    }
    number.parse::<f64>().map_err(|_| invalid(raw))
}

fn invalid(raw: &str) -> VickletError {
    VickletError::InvalidArgument(format!("invalid quantity {:?}", raw))
}

/// Integer value of a quantity, rounded up (`500m` is 1, `1.5Gi` is exact).
///
/// Values that do not fit in an `i64` are rejected.
pub fn value(quantity: &Quantity) -> VickletResult<i64> {
    let value = parse(&quantity.0)?.ceil();
    // 2^63 is exactly representable; anything at or above it overflows.
    if !value.is_finite() || value >= i64::MAX as f64 || value < i64::MIN as f64 {
        return Err(VickletError::InvalidArgument(format!(
            "quantity {:?} out of range",
            quantity.0
        )));
    }
    Ok(value as i64)
}

/// Format a byte count using the largest binary suffix that divides it.
pub fn format_binary(bytes: i64) -> Quantity {
    if bytes != 0 {
        for (suffix, power) in BINARY_SUFFIXES.iter().rev() {
            let unit = 1i64 << power;
            if bytes % unit == 0 {
                return Quantity(format!("{}{}", bytes / unit, suffix));
            }
        }
    }
    Quantity(bytes.to_string())
}

/// Format a plain integer count.
pub fn format_count(count: i64) -> Quantity {
    Quantity(count.to_string())
}
