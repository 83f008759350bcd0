//! Formatting and parsing helpers shared by the CLI
//!
//! Money is shown the Brazilian way: `.` groups thousands and `,` separates
//! decimals.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use itertools::Itertools;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Format a number with `places` decimals: "1.234,56"
///
/// # Examples
/// ```
/// use importa::utils::format_decimal_br;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_decimal_br(dec!(1234567.891), 2), "1.234.567,89");
/// assert_eq!(format_decimal_br(dec!(-0.5), 0), "-1");
/// ```
pub fn format_decimal_br(value: Decimal, places: u32) -> String {
    let rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    let plain = format!("{:.*}", places as usize, rounded.abs());
    let (integer, fraction) = match plain.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (plain.as_str(), None),
    };

    let grouped = integer
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
        .join(".");

    match fraction {
        Some(f) => format!("{sign}{grouped},{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Format as Brazilian Real: "R$ 1.234,56"
///
/// # Examples
/// ```
/// use importa::utils::format_brl;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_brl(dec!(77875)), "R$ 77.875,00");
/// ```
pub fn format_brl(value: Decimal) -> String {
    let body = format_decimal_br(value.abs(), 2);
    if value < Decimal::ZERO && body != "0,00" {
        format!("-R$ {}", body)
    } else {
        format!("R$ {}", body)
    }
}

/// Exchange rates are shown with four decimals, as PTAX publishes them
pub fn format_rate(rate: Decimal) -> String {
    format_decimal_br(rate, 4)
}

/// Ratio as a percentage: 0.5575 -> "55,75%"
pub fn format_percent(ratio: Decimal) -> String {
    format!("{}%", format_decimal_br(ratio * Decimal::ONE_HUNDRED, 2))
}

/// Parse `YYYY-MM-DD` or `DD/MM/YYYY`
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD or DD/MM/YYYY", s))
}

/// Parse an amount written either as `1234.56` or as `1.234,56`
pub fn parse_decimal(s: &str) -> Result<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        bail!("Empty amount");
    }

    let normalized = if s.contains(',') {
        s.replace('.', "").replace(',', ".")
    } else {
        s.to_string()
    };

    Decimal::from_str(&normalized).with_context(|| format!("Invalid amount '{}'", s))
}
