//! Colombian NIT helpers: cleaning, display formatting and the DIAN
//! modulo-11 check digit.

use crate::error::NitError;

/// Prime weights applied right-to-left over the NIT base digits.
const WEIGHTS: [u32; 15] = [3, 7, 13, 17, 19, 23, 29, 37, 41, 43, 47, 53, 59, 67, 71];

/// Digits only.
pub fn clean_nit(nit: &str) -> String {
    nit.chars().filter(char::is_ascii_digit).collect()
}

/// Check digit for a NIT base (digits without the verification digit).
///
/// Returns `None` for empty input, non-digits, or bases longer than the
/// weight table.
pub fn check_digit(base: &str) -> Option<u8> {
    if base.is_empty() || base.len() > WEIGHTS.len() {
        return None;
    }

    let mut sum = 0u32;
    for (digit, weight) in base.chars().rev().zip(WEIGHTS.iter()) {
        sum += digit.to_digit(10)? * weight;
    }

    let remainder = sum % 11;
    let digit = if remainder >= 2 {
        11 - remainder
    } else {
        remainder
    };
    Some(digit as u8)
}

/// Validate and clean a NIT.
///
/// 9 digits are accepted as a bare base. 10 digits are read as base plus
/// check digit and the check digit must match.
pub fn validate_nit(nit: &str) -> Result<String, NitError> {
    let clean = clean_nit(nit);
    match clean.len() {
        0 => Err(NitError::Empty),
        len if len < 9 => Err(NitError::TooShort { len }),
        len if len > 10 => Err(NitError::TooLong { len }),
        10 => {
            let (base, dv) = clean.split_at(9);
            let found = dv.parse::<u8>().unwrap_or(u8::MAX);
            let expected = check_digit(base).unwrap_or(u8::MAX);
            if expected != found {
                return Err(NitError::CheckDigit { expected, found });
            }
            Ok(clean)
        }
        _ => Ok(clean),
    }
}

/// `"9001234568"` → `"900.123.456-8"`. The last digit is taken as the check
/// digit.
pub fn format_nit(nit: &str) -> String {
    let clean = clean_nit(nit);
    if clean.len() < 2 {
        return clean;
    }

    let (base, dv) = clean.split_at(clean.len() - 1);
    let mut grouped = String::with_capacity(base.len() + base.len() / 3);
    for (i, ch) in base.chars().enumerate() {
        if i > 0 && (base.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    format!("{grouped}-{dv}")
}
