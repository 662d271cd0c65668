// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::categories::add_category;
use crate::commands::currencies::{currency_by_code, seed_default_currencies};
use crate::config::{DEFAULT_CATEGORIES, DEFAULT_CURRENCY};
use crate::errors::MoneyError;
use crate::models::{Currency, User};
use crate::utils::{decimal_col, fmt_ts};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("register", sub)) => {
            let tg_id = *sub.get_one::<i64>("tg-id").unwrap();
            let username = sub.get_one::<String>("username").unwrap().trim();
            if user_by_tg_id(conn, tg_id)?.is_some() {
                println!("User {} is already registered", tg_id);
            } else {
                let id = register_user(conn, tg_id, username)?;
                println!("Registered '{}' (tg id {}, user #{})", username, tg_id, id);
            }
        }
        Some(("delete", sub)) => {
            let user = require_user(conn, sub)?;
            delete_user(conn, user.id)?;
            println!("Deleted user {} and all of their data", user.tg_id);
        }
        Some(("currency", sub)) => {
            let user = require_user(conn, sub)?;
            if let Some(code) = sub.get_one::<String>("code") {
                let ccy = currency_by_code(conn, code)?;
                set_user_currency(conn, user.id, ccy.id)?;
                println!("Reporting currency set to {}", ccy.code);
            } else {
                match user_currency(conn, user.id)? {
                    Some(c) => println!("{} ({})", c.code, c.name),
                    None => println!("No reporting currency configured"),
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Resolves the acting user from the global `--user` flag.
pub fn require_user(conn: &Connection, m: &clap::ArgMatches) -> Result<User> {
    let tg_id = *m
        .get_one::<i64>("user")
        .context("No user selected; pass --user <TG_ID> or set FINTRACK_USER")?;
    user_by_tg_id(conn, tg_id)?.ok_or_else(|| MoneyError::UnknownUser(tg_id).into())
}

pub fn user_by_tg_id(conn: &Connection, tg_id: i64) -> Result<Option<User>> {
    let u = conn
        .query_row(
            "SELECT id, tg_id, username FROM users WHERE tg_id=?1",
            params![tg_id],
            |r| {
                Ok(User {
                    id: r.get(0)?,
                    tg_id: r.get(1)?,
                    username: r.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(u)
}

/// Creates the user with default categories and a default reporting
/// currency. Returns the existing id when `tg_id` is already registered.
pub fn register_user(conn: &mut Connection, tg_id: i64, username: &str) -> Result<i64> {
    if let Some(u) = user_by_tg_id(conn, tg_id)? {
        return Ok(u.id);
    }
    let tx = conn.transaction()?;
    seed_default_currencies(&tx)?;
    tx.execute(
        "INSERT INTO users(tg_id, username, created) VALUES (?1, ?2, ?3)",
        params![tg_id, username, fmt_ts(&Utc::now())],
    )?;
    let user_id = tx.last_insert_rowid();
    for name in DEFAULT_CATEGORIES {
        add_category(&tx, user_id, name)?;
    }
    let ccy = currency_by_code(&tx, DEFAULT_CURRENCY)?;
    tx.execute(
        "INSERT INTO settings(user_id, currency_id) VALUES (?1, ?2)",
        params![user_id, ccy.id],
    )?;
    tx.commit()?;
    tracing::info!(user_id, tg_id, "registered user");
    Ok(user_id)
}

/// Removes the user; categories, transactions, limits and settings cascade.
pub fn delete_user(conn: &Connection, user_id: i64) -> Result<()> {
    conn.execute("DELETE FROM users WHERE id=?1", params![user_id])?;
    Ok(())
}

pub fn set_user_currency(conn: &Connection, user_id: i64, currency_id: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(user_id, currency_id) VALUES (?1, ?2)
         ON CONFLICT(user_id) DO UPDATE SET currency_id=excluded.currency_id",
        params![user_id, currency_id],
    )?;
    Ok(())
}

pub fn user_currency(conn: &Connection, user_id: i64) -> Result<Option<Currency>> {
    let c = conn
        .query_row(
            "SELECT c.id, c.code, c.rate_to_base, c.name, c.symbol
             FROM settings s JOIN currencies c ON s.currency_id=c.id
             WHERE s.user_id=?1",
            params![user_id],
            |r| {
                Ok(Currency {
                    id: r.get(0)?,
                    code: r.get(1)?,
                    rate_to_base: decimal_col(r, 2)?,
                    name: r.get(3)?,
                    symbol: r.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(c)
}
