// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::DEFAULT_CURRENCIES;
use crate::errors::MoneyError;
use crate::models::Currency;
use crate::utils::{decimal_col, maybe_print_json, parse_decimal, pretty_table};
use anyhow::{bail, Result};
use rusqlite::{params, Connection, OptionalExtension};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => {
            let data = list_currencies(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .iter()
                    .map(|c| {
                        vec![
                            c.code.clone(),
                            c.name.clone(),
                            c.symbol.clone().unwrap_or_default(),
                            c.rate_to_base.to_string(),
                        ]
                    })
                    .collect();
                println!("{}", pretty_table(&["Code", "Name", "Symbol", "Rate"], rows));
            }
        }
        Some(("set-rate", sub)) => {
            let code = sub.get_one::<String>("code").unwrap();
            let rate = parse_decimal(sub.get_one::<String>("rate").unwrap())?;
            let name = sub.get_one::<String>("name").map(|s| s.trim());
            let symbol = sub.get_one::<String>("symbol").map(|s| s.trim());
            set_rate(conn, code, rate, name, symbol)?;
            println!("{} rate_to_base = {}", code.trim().to_uppercase(), rate);
        }
        _ => {}
    }
    Ok(())
}

pub fn seed_default_currencies(conn: &Connection) -> Result<()> {
    for c in DEFAULT_CURRENCIES {
        conn.execute(
            "INSERT OR IGNORE INTO currencies(code, rate_to_base, name, symbol) VALUES (?1,?2,?3,?4)",
            params![c.code, c.rate_to_base, c.name, c.symbol],
        )?;
    }
    Ok(())
}

/// Inserts or updates a currency. A zero rate is stored as-is and simply
/// makes the currency unconvertible.
pub fn set_rate(
    conn: &Connection,
    code: &str,
    rate: rust_decimal::Decimal,
    name: Option<&str>,
    symbol: Option<&str>,
) -> Result<i64> {
    let code = code.trim().to_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        bail!("Currency code '{}' must be three letters", code);
    }
    if rate.is_sign_negative() {
        bail!("Rate for {} must not be negative", code);
    }
    conn.execute(
        "INSERT INTO currencies(code, rate_to_base, name, symbol) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(code) DO UPDATE SET
            rate_to_base=excluded.rate_to_base,
            name=COALESCE(?5, currencies.name),
            symbol=COALESCE(?4, currencies.symbol)",
        params![code, rate.to_string(), name.unwrap_or(&code), symbol, name],
    )?;
    let id = currency_by_code(conn, &code)?.id;
    Ok(id)
}

fn currency_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Currency> {
    Ok(Currency {
        id: r.get(0)?,
        code: r.get(1)?,
        rate_to_base: decimal_col(r, 2)?,
        name: r.get(3)?,
        symbol: r.get(4)?,
    })
}

pub fn list_currencies(conn: &Connection) -> Result<Vec<Currency>> {
    let mut stmt =
        conn.prepare("SELECT id, code, rate_to_base, name, symbol FROM currencies ORDER BY code")?;
    let rows = stmt.query_map([], currency_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn currency_by_code(conn: &Connection, code: &str) -> Result<Currency> {
    let code = code.trim().to_uppercase();
    conn.query_row(
        "SELECT id, code, rate_to_base, name, symbol FROM currencies WHERE code=?1",
        params![code],
        currency_from_row,
    )
    .optional()?
    .ok_or_else(|| MoneyError::UnknownCurrency(code).into())
}

pub fn currency_by_id(conn: &Connection, id: i64) -> Result<Option<Currency>> {
    let c = conn
        .query_row(
            "SELECT id, code, rate_to_base, name, symbol FROM currencies WHERE id=?1",
            params![id],
            currency_from_row,
        )
        .optional()?;
    Ok(c)
}
