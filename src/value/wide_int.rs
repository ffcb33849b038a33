//! 64-bit integers across a boundary whose numbers are IEEE doubles.
//!
//! A double represents every integer in `[-2^53, 2^53]` exactly; outside that range a
//! value crosses as decimal text instead of silently losing precision.

use crate::error::ParseIntError;

pub const JS_MAX_INT: i64 = 9_007_199_254_740_992;
pub const JS_MIN_INT: i64 = -9_007_199_254_740_992;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WideInt {
    Exact(i64),
    Text(String),
}

impl WideInt {
    pub fn from_i64(v: i64) -> Self {
        if (JS_MIN_INT..=JS_MAX_INT).contains(&v) {
            Self::Exact(v)
        } else {
            Self::Text(v.to_string())
        }
    }

    pub fn from_u64(v: u64) -> Self {
        if v <= JS_MAX_INT as u64 {
            Self::Exact(v as i64)
        } else {
            Self::Text(v.to_string())
        }
    }
}

/// Result of scanning an integer literal: sign, magnitude, and whether the magnitude
/// overflowed `u64`.
struct Scanned {
    negative: bool,
    magnitude: u64,
    overflow: bool,
}

/// Scans like C `strto*` with base 0: leading whitespace, optional sign, `0x`/`0X` for
/// hex, a leading `0` for octal, then the longest run of valid digits. Trailing text is
/// ignored.
fn scan(text: &str) -> Result<Scanned, ParseIntError> {
    let bytes = text.trim_start().as_bytes();
    let mut i = 0;
    let mut negative = false;
    if let Some(&sign @ (b'+' | b'-')) = bytes.first() {
        negative = sign == b'-';
        i += 1;
    }

    let mut radix = 10;
    if bytes.get(i) == Some(&b'0') {
        let hex_prefix = matches!(bytes.get(i + 1), Some(b'x' | b'X'))
            && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
        if hex_prefix {
            radix = 16;
            i += 2;
        } else {
            radix = 8;
        }
    }

    let mut magnitude: u64 = 0;
    let mut overflow = false;
    let mut digits = 0;
    while let Some(d) = bytes.get(i).and_then(|b| (*b as char).to_digit(radix)) {
        match magnitude
            .checked_mul(radix as u64)
            .and_then(|m| m.checked_add(d as u64))
        {
            Some(m) => magnitude = m,
            None => overflow = true,
        }
        digits += 1;
        i += 1;
    }

    if digits == 0 {
        return Err(ParseIntError::NoDigits);
    }
    Ok(Scanned {
        negative,
        magnitude,
        overflow,
    })
}

/// Parses a signed literal with `strtoll` rules.
pub fn parse_i64(text: &str) -> Result<i64, ParseIntError> {
    let s = scan(text)?;
    if s.overflow {
        return Err(ParseIntError::OutOfRange);
    }
    if s.negative {
        if s.magnitude > i64::MAX as u64 + 1 {
            return Err(ParseIntError::OutOfRange);
        }
        Ok((s.magnitude as i64).wrapping_neg())
    } else {
        i64::try_from(s.magnitude).map_err(|_| ParseIntError::OutOfRange)
    }
}

/// Parses an unsigned literal with `strtoull` rules: a leading `-` negates modulo 2^64.
pub fn parse_u64(text: &str) -> Result<u64, ParseIntError> {
    let s = scan(text)?;
    if s.overflow {
        return Err(ParseIntError::OutOfRange);
    }
    Ok(if s.negative {
        s.magnitude.wrapping_neg()
    } else {
        s.magnitude
    })
}
