// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::categories::id_for_active_category;
use crate::commands::currencies::currency_by_code;
use crate::commands::limits::{check_limit, limit_notice};
use crate::commands::users::{require_user, user_currency};
use crate::errors::MoneyError;
use crate::models::Transaction;
use crate::utils::{
    decimal_col, fmt_ts, maybe_print_json, money_amount, parse_decimal, pretty_table, round_money,
    ts_col,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: i64,
    pub category_id: i64,
    pub currency_id: i64,
    pub amount: Decimal,
    pub is_expense: bool,
    pub comment: Option<String>,
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user = require_user(conn, sub)?;
    let raw = sub.get_one::<String>("amount").unwrap().trim();
    let income = sub.get_flag("income") || raw.starts_with('+');
    let amount = parse_decimal(raw.trim_start_matches('+'))?;
    let category = sub.get_one::<String>("category").unwrap().trim();
    let comment = sub
        .get_one::<String>("comment")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "-");

    let category_id = id_for_active_category(conn, user.id, category)?;
    let currency_id = match sub.get_one::<String>("currency") {
        Some(code) => currency_by_code(conn, code)?.id,
        None => {
            user_currency(conn, user.id)?
                .ok_or(MoneyError::NoReportingCurrency(user.id))?
                .id
        }
    };

    let tx = NewTransaction {
        user_id: user.id,
        category_id,
        currency_id,
        amount,
        is_expense: !income,
        comment,
    };
    record_transaction(conn, &tx)?;
    println!(
        "Recorded {}{} in '{}'",
        if income { "+" } else { "-" },
        round_money(amount),
        category
    );

    if tx.is_expense {
        if let Some(line) = limit_notice(check_limit(conn, user.id, category_id)?) {
            println!("{}", line);
        }
    }
    Ok(())
}

/// Appends a transaction stamped with the current time.
pub fn record_transaction(conn: &Connection, tx: &NewTransaction) -> Result<i64> {
    record_transaction_at(conn, tx, Utc::now())
}

pub fn record_transaction_at(
    conn: &Connection,
    tx: &NewTransaction,
    created: DateTime<Utc>,
) -> Result<i64> {
    let amount = money_amount(tx.amount)?;
    conn.execute(
        "INSERT INTO transactions(user_id, category_id, currency_id, amount, is_expense, comment, created)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            tx.user_id,
            tx.category_id,
            tx.currency_id,
            amount.to_string(),
            tx.is_expense,
            tx.comment,
            fmt_ts(&created)
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::debug!(
        id,
        user_id = tx.user_id,
        category_id = tx.category_id,
        "recorded transaction"
    );
    Ok(id)
}

fn transaction_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: r.get(0)?,
        user_id: r.get(1)?,
        category_id: r.get(2)?,
        currency_id: r.get(3)?,
        amount: decimal_col(r, 4)?,
        is_expense: r.get(5)?,
        comment: r.get(6)?,
        created: ts_col(r, 7)?,
    })
}

/// Newest first.
pub fn recent_transactions(
    conn: &Connection,
    user_id: i64,
    category_id: i64,
    limit: usize,
) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, category_id, currency_id, amount, is_expense, comment, created
         FROM transactions WHERE user_id=?1 AND category_id=?2
         ORDER BY created DESC, id DESC LIMIT ?3",
    )?;
    let rows = stmt.query_map(params![user_id, category_id, limit as i64], transaction_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub created: String,
    pub category: String,
    pub kind: String,
    pub amount: String,
    pub currency: String,
    pub comment: String,
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.created.clone(),
                    r.category.clone(),
                    r.kind.clone(),
                    r.amount.clone(),
                    r.currency.clone(),
                    r.comment.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Created", "Category", "Kind", "Amount", "CCY", "Comment"], rows)
        );
    }
    Ok(())
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let user = require_user(conn, sub)?;
    let mut sql = String::from(
        "SELECT t.created, c.name, t.is_expense, t.amount, cu.code, t.comment
         FROM transactions t
         JOIN categories c ON t.category_id=c.id
         JOIN currencies cu ON t.currency_id=cu.id
         WHERE t.user_id=?",
    );
    let mut params_vec: Vec<String> = vec![user.id.to_string()];

    if let Some(cat) = sub.get_one::<String>("category") {
        sql.push_str(" AND c.name=?");
        params_vec.push(cat.trim().into());
    }
    if let Some(month) = sub.get_one::<String>("month") {
        sql.push_str(" AND substr(t.created,1,7)=?");
        params_vec.push(month.trim().into());
    }
    sql.push_str(" ORDER BY t.created DESC, t.id DESC");
    if let Some(limit) = sub.get_one::<usize>("limit") {
        sql.push_str(" LIMIT ?");
        params_vec.push(limit.to_string());
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(params_vec.iter()))?;

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let created = ts_col(r, 0)?;
        let category: String = r.get(1)?;
        let is_expense: bool = r.get(2)?;
        let amount: String = r.get(3)?;
        let currency: String = r.get(4)?;
        let comment: Option<String> = r.get(5)?;
        data.push(TransactionRow {
            created: created.format("%Y-%m-%d %H:%M").to_string(),
            category,
            kind: if is_expense { "expense" } else { "income" }.into(),
            amount,
            currency,
            comment: comment.unwrap_or_default(),
        });
    }
    Ok(data)
}
