// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::MAX_AMOUNT;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use rusqlite::types::Type;
use rusqlite::Row;
use rust_decimal::{Decimal, RoundingStrategy};

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// Accepts `12.50` as well as `12,50`.
pub fn parse_decimal(s: &str) -> Result<Decimal> {
    let norm = s.trim().replace(',', ".");
    norm.parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

/// Final figures handed back to callers are rounded half away from zero.
pub fn round_money(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds an amount supplied by the user and checks it lies in
/// `(0, MAX_AMOUNT]` after rounding.
pub fn money_amount(d: Decimal) -> Result<Decimal> {
    let rounded = round_money(d);
    if rounded <= Decimal::ZERO {
        bail!("Amount must be positive, got {}", d);
    }
    if rounded > Decimal::from(MAX_AMOUNT) {
        bail!("Amount {} exceeds the maximum of {}", d, MAX_AMOUNT);
    }
    Ok(rounded)
}

pub fn fmt_money(d: &Decimal, label: &str) -> String {
    format!("{:.2}{}", round_money(*d), label)
}

/// Fixed-width UTC timestamp; sorts lexicographically in SQL.
pub fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Start of the given calendar day in UTC.
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

pub fn decimal_col(r: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let s: String = r.get(idx)?;
    s.trim()
        .parse::<Decimal>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn ts_col(r: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = r.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn opt_ts_col(r: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let s: Option<String> = r.get(idx)?;
    match s {
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|d| Some(d.with_timezone(&Utc)))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(None),
    }
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_amount_bounds() {
        assert_eq!(money_amount(Decimal::new(12345, 3)).unwrap(), Decimal::new(1235, 2));
        assert!(money_amount(Decimal::new(1, 3)).is_err());
        assert!(money_amount(Decimal::ZERO).is_err());
        assert!(money_amount(Decimal::from(MAX_AMOUNT)).is_ok());
        assert!(money_amount(Decimal::from(MAX_AMOUNT) + Decimal::new(1, 2)).is_err());
    }
}
