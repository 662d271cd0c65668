// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::categories::{category_by_id, id_for_category};
use crate::commands::limits::{check_limit, get_limit, LimitStatus};
use crate::commands::stats::reporting_currency;
use crate::commands::transactions::recent_transactions;
use crate::commands::users::require_user;
use crate::config::RECENT_TRANSACTIONS;
use crate::ledger::CurrencyLedger;
use crate::models::{Category, Limit, Transaction};
use crate::utils::{maybe_print_json, round_money};
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("category", sub)) => category(conn, sub)?,
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct LimitReport {
    pub limit: Limit,
    pub status: LimitStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub category: Category,
    pub currency_id: i64,
    pub limit: Option<LimitReport>,
    /// All-time expenses in the reporting currency.
    pub total_spent: Decimal,
    /// Raw expense sums keyed by the currency they were recorded in.
    pub totals_by_currency: BTreeMap<i64, Decimal>,
    pub recent_transactions: Vec<Transaction>,
    pub skipped: usize,
}

pub fn category_report(
    conn: &Connection,
    user_id: i64,
    category_id: i64,
) -> Result<Option<CategoryReport>> {
    let category = match category_by_id(conn, category_id)? {
        Some(c) if c.user_id == user_id => c,
        _ => return Ok(None),
    };
    let ledger = CurrencyLedger::load(conn)?;
    let target = reporting_currency(conn, &ledger, user_id)?;

    let mut stmt = conn.prepare(
        "SELECT amount, currency_id FROM transactions
         WHERE user_id=?1 AND category_id=?2 AND is_expense=1",
    )?;
    let mut cur = stmt.query(params![user_id, category_id])?;
    let mut items = Vec::new();
    let mut totals_by_currency: BTreeMap<i64, Decimal> = BTreeMap::new();
    while let Some(r) = cur.next()? {
        let a_s: String = r.get(0)?;
        let currency_id: i64 = r.get(1)?;
        let amount = a_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid amount '{}' in transactions", a_s))?;
        *totals_by_currency.entry(currency_id).or_insert(Decimal::ZERO) += amount;
        items.push((amount, currency_id));
    }
    let converted = ledger.convert_sum(items, target)?;

    let limit = match get_limit(conn, user_id, category_id)? {
        Some(limit) => Some(LimitReport {
            status: check_limit(conn, user_id, category_id)?.unwrap_or_else(LimitStatus::none),
            limit,
        }),
        None => None,
    };

    Ok(Some(CategoryReport {
        category,
        currency_id: target,
        limit,
        total_spent: converted.rounded(),
        totals_by_currency: totals_by_currency
            .into_iter()
            .map(|(k, v)| (k, round_money(v)))
            .collect(),
        recent_transactions: recent_transactions(conn, user_id, category_id, RECENT_TRANSACTIONS)?,
        skipped: converted.skipped,
    }))
}

fn category(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user = require_user(conn, sub)?;
    let name = sub.get_one::<String>("category").unwrap().trim();
    let id = id_for_category(conn, user.id, name)?;
    let report = category_report(conn, user.id, id)?
        .with_context(|| format!("Category '{}' not found", name))?;
    if maybe_print_json(sub.get_flag("json"), false, &report)? {
        return Ok(());
    }

    let currencies = crate::commands::currencies::list_currencies(conn)?;
    let label = |id: i64| {
        currencies
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.label().to_string())
            .unwrap_or_default()
    };

    println!("Category: {}", report.category.name);
    match &report.limit {
        Some(lr) => {
            let l = label(lr.limit.currency_id);
            println!("Limit: {:.2}{} ({})", lr.limit.limit_amount, l, lr.limit.period);
            match lr.status.percent_used {
                Some(p) => {
                    println!("Spent this period: {:.2}{} ({:.1}%)", lr.status.spent, l, p)
                }
                None => println!("Spent this period: not measured"),
            }
        }
        None => println!("Limit: none"),
    }
    println!("Total spent: {:.2}{}", report.total_spent, label(report.currency_id));
    if report.totals_by_currency.len() > 1 {
        println!("By currency:");
        for (id, amount) in &report.totals_by_currency {
            println!("  • {:.2}{}", amount, label(*id));
        }
    }
    if report.recent_transactions.is_empty() {
        println!("No transactions in this category.");
    } else {
        println!("Recent transactions:");
        for t in &report.recent_transactions {
            let comment = t.comment.as_deref().map(|c| format!(" - {}", c)).unwrap_or_default();
            println!(
                "  {}{:.2}{} ({}){}",
                if t.is_expense { "-" } else { "+" },
                t.amount,
                label(t.currency_id),
                t.created.format("%d-%m-%Y %H:%M"),
                comment
            );
        }
    }
    Ok(())
}
