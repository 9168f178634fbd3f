use crate::error::{Error, Result};

/// Two-character prefix the game writes in front of every float it stores
/// as a string, e.g. `"~f12.5"`.
pub const GAME_FLOAT_MARKER: &str = "~f";

/// Decode a marker-prefixed float string.
///
/// The remainder after the marker is parsed with Rust's float grammar, which
/// always uses `.` as the decimal point regardless of the process locale.
pub fn decode(raw: &str) -> Result<f32> {
    let digits = raw.strip_prefix(GAME_FLOAT_MARKER).ok_or_else(|| Error::Encoding {
        raw: raw.to_string(),
        reason: format!("missing {GAME_FLOAT_MARKER:?} marker"),
    })?;
    let invalid = |reason: String| Error::Encoding {
        raw: raw.to_string(),
        reason,
    };
    if !is_decimal_text(digits) {
        return Err(invalid("not a decimal number".to_string()));
    }
    let value = digits.parse::<f32>().map_err(|e| invalid(e.to_string()))?;
    if !value.is_finite() {
        return Err(invalid("out of range".to_string()));
    }
    Ok(value)
}

/// Optional minus sign, digits with at most one point, optional exponent.
/// Rules out `inf`, `NaN` and a leading `+`, which the game cannot read.
fn is_decimal_text(digits: &str) -> bool {
    let unsigned = digits.strip_prefix('-').unwrap_or(digits);
    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, Some(exponent)),
        None => (unsigned, None),
    };

    let mut parts = mantissa.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let fraction = parts.next().unwrap_or("");
    let mantissa_ok = (!whole.is_empty() || !fraction.is_empty())
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit());

    let exponent_ok = exponent.map_or(true, |exp| {
        let exp = exp.strip_prefix(['-', '+']).unwrap_or(exp);
        !exp.is_empty() && exp.bytes().all(|b| b.is_ascii_digit())
    });
    mantissa_ok && exponent_ok
}

/// Encode a float in the game's string format.
///
/// `Display` for `f32` emits the shortest decimal text that parses back to
/// the same value, never uses exponent notation and never groups digits.
pub fn encode(value: f32) -> String {
    format!("{GAME_FLOAT_MARKER}{value}")
}
