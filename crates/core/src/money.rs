//! Monetary conversion from major units (dollars) to minor units (cents).
//!
//! Rounding is half-up (away from zero) on the decimal value the caller
//! sent, not on the binary float: `19.995` becomes `2000` even though
//! `19.995 * 100.0` is `1999.4999..` in `f64`.

/// Convert a major-unit amount to minor units, rounding half-up.
///
/// Non-finite input yields `0`; amounts beyond `i64` saturate.
pub fn to_minor_units(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }

    // Display for f64 is the shortest representation that round-trips and
    // never uses exponent notation.
    let repr = value.abs().to_string();
    let (whole, frac) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    let whole: i64 = whole.parse().unwrap_or(i64::MAX);
    let digits: Vec<i64> = frac
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(i64::from)
        .collect();

    let cents = digits.first().copied().unwrap_or(0) * 10 + digits.get(1).copied().unwrap_or(0);
    let carry = i64::from(digits.get(2).is_some_and(|d| *d >= 5));

    let minor = whole.saturating_mul(100).saturating_add(cents + carry);
    if value.is_sign_negative() {
        -minor
    } else {
        minor
    }
}
