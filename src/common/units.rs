// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::error::ActionError;
use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::{Address, U256};

/// Strip whitespace and thousands separators from user input.
pub fn sanitize_amount(raw: &str) -> String {
    raw.trim().replace(',', "")
}

/// Syntax-only check (`123` or `123.45`), no sign, no exponent.
pub fn is_plain_decimal(raw: &str) -> bool {
    let s = sanitize_amount(raw);
    let (int, frac) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s.as_str(), None),
    };
    if int.is_empty() || !int.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match frac {
        Some(f) => !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()),
        None => true,
    }
}

/// Validate shape and positivity without knowing the asset's precision.
pub fn check_amount_syntax(field: &str, raw: &str) -> Result<String, ActionError> {
    let s = sanitize_amount(raw);
    if s.is_empty() {
        return Err(ActionError::validation(field, "amount is empty"));
    }
    if !is_plain_decimal(&s) {
        return Err(ActionError::validation(
            field,
            format!("'{raw}' is not a plain decimal number"),
        ));
    }
    if s.bytes().all(|b| b == b'0' || b == b'.') {
        return Err(ActionError::validation(field, "amount must be greater than zero"));
    }
    Ok(s)
}

/// Convert a positive decimal string into base units at `decimals` precision.
pub fn parse_amount(field: &str, raw: &str, decimals: u8) -> Result<U256, ActionError> {
    let s = check_amount_syntax(field, raw)?;
    if let Some((_, frac)) = s.split_once('.')
        && frac.len() > decimals as usize
    {
        return Err(ActionError::validation(
            field,
            format!("at most {decimals} decimal places allowed"),
        ));
    }
    let parsed = parse_units(&s, decimals)
        .map_err(|e| ActionError::validation(field, format!("cannot parse '{raw}': {e}")))?;
    let value = parsed.get_absolute();
    if value.is_zero() {
        return Err(ActionError::validation(field, "amount must be greater than zero"));
    }
    Ok(value)
}

/// Exact decimal rendering, trailing zeros removed.
pub fn format_plain(value: U256, decimals: u8) -> String {
    let full = format_units(value, decimals).unwrap_or_else(|_| value.to_string());
    trim_fraction(&full, usize::MAX)
}

/// Human rendering: at most `max_frac` fractional digits, grouped thousands.
pub fn format_amount(value: U256, decimals: u8, max_frac: usize) -> String {
    let full = format_units(value, decimals).unwrap_or_else(|_| value.to_string());
    let trimmed = trim_fraction(&full, max_frac);
    let (int, frac) = match trimmed.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (trimmed.clone(), None),
    };
    let grouped = group_thousands(&int);
    match frac {
        Some(f) => format!("{grouped}.{f}"),
        None => grouped,
    }
}

fn trim_fraction(full: &str, max_frac: usize) -> String {
    let Some((int, frac)) = full.split_once('.') else {
        return full.to_string();
    };
    let cut = &frac[..frac.len().min(max_frac)];
    let cut = cut.trim_end_matches('0');
    if cut.is_empty() {
        int.to_string()
    } else {
        format!("{int}.{cut}")
    }
}

fn group_thousands(int: &str) -> String {
    let len = int.len();
    let mut out = String::with_capacity(len + len / 3);
    for (idx, ch) in int.chars().enumerate() {
        if idx > 0 && (len - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `0x1234...abcd`
pub fn short_addr(addr: &Address) -> String {
    let full = format!("{addr:#x}");
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_rejects_signs_and_garbage() {
        assert!(is_plain_decimal("10"));
        assert!(is_plain_decimal("1,000.5"));
        assert!(!is_plain_decimal("-1"));
        assert!(!is_plain_decimal("1e5"));
        assert!(!is_plain_decimal(".5"));
        assert!(!is_plain_decimal("5."));
        assert!(!is_plain_decimal(""));
    }

    #[test]
    fn parse_amount_respects_precision() {
        assert_eq!(parse_amount("amount", "1.5", 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(
            parse_amount("amount", "10", 18).unwrap(),
            U256::from(10u64) * U256::from(10u64).pow(U256::from(18u64))
        );
        assert!(matches!(
            parse_amount("amount", "0.0000001", 6),
            Err(ActionError::Validation { .. })
        ));
    }

    #[test]
    fn parse_amount_rejects_zero() {
        assert!(matches!(
            parse_amount("amount", "0.000", 18),
            Err(ActionError::Validation { .. })
        ));
        assert!(matches!(
            check_amount_syntax("amount", "  "),
            Err(ActionError::Validation { .. })
        ));
    }

    #[test]
    fn format_amount_truncates_and_groups() {
        let v = U256::from(1_234_567_891_234u64);
        assert_eq!(format_amount(v, 6, 4), "1,234,567.8912");
        assert_eq!(format_amount(U256::from(5_000_000u64), 6, 4), "5");
        assert_eq!(format_amount(U256::ZERO, 18, 4), "0");
        assert_eq!(format_plain(U256::from(1_500_000u64), 6), "1.5");
    }

    #[test]
    fn short_addr_keeps_prefix_and_suffix() {
        let addr: Address = "0x038A2f1abe221d403834aa775669169Ef5eb120A".parse().unwrap();
        assert_eq!(short_addr(&addr), "0x038a...120a");
    }
}
