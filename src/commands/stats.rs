// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::users::require_user;
use crate::config::{DAYS_PER_MONTH, TRAILING_MONTHS};
use crate::errors::MoneyError;
use crate::ledger::{add, CurrencyLedger};
use crate::utils::{day_start, fmt_ts, maybe_print_json, pretty_table, round_money};
use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    AllExpenses,
    AllIncome,
    MonthlyExpenses,
    MonthlyIncome,
    TrailingMonths(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTotal {
    pub month: String, // YYYY-MM
    pub is_expense: bool,
    pub category: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatRows {
    ByCategory(Vec<CategoryTotal>),
    ByMonth(Vec<MonthTotal>),
}

/// Totals in the user's reporting currency. `skipped` counts transactions
/// left out because their currency has no valid rate or the total would
/// overflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub currency_id: i64,
    pub rows: StatRows,
    pub skipped: usize,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let (kind, sub) = match m.subcommand() {
        Some(("expenses", sub)) => (StatKind::AllExpenses, sub),
        Some(("income", sub)) => (StatKind::AllIncome, sub),
        Some(("monthly-expenses", sub)) => (StatKind::MonthlyExpenses, sub),
        Some(("monthly-income", sub)) => (StatKind::MonthlyIncome, sub),
        Some(("trailing", sub)) => {
            let months = *sub.get_one::<u32>("months").unwrap_or(&TRAILING_MONTHS);
            (StatKind::TrailingMonths(months), sub)
        }
        _ => return Ok(()),
    };
    let user = require_user(conn, sub)?;
    let stats = statistics(conn, user.id, kind, Utc::now())?;
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");

    match &stats.rows {
        StatRows::ByCategory(rows) => {
            if !maybe_print_json(json_flag, jsonl_flag, rows)? {
                let data = rows
                    .iter()
                    .map(|r| vec![r.category.clone(), format!("{:.2}", r.amount)])
                    .collect();
                println!("{}", pretty_table(&["Category", "Total"], data));
            }
        }
        StatRows::ByMonth(rows) => {
            if !maybe_print_json(json_flag, jsonl_flag, rows)? {
                let data = rows
                    .iter()
                    .map(|r| {
                        vec![
                            r.month.clone(),
                            if r.is_expense { "expense" } else { "income" }.into(),
                            r.category.clone(),
                            format!("{:.2}", r.amount),
                        ]
                    })
                    .collect();
                println!("{}", pretty_table(&["Month", "Kind", "Category", "Total"], data));
            }
        }
    }
    if stats.skipped > 0 {
        eprintln!(
            "note: {} transaction(s) skipped, no valid rate or amount out of range",
            stats.skipped
        );
    }
    Ok(())
}

/// Reporting currency of the user, validated against the ledger.
pub fn reporting_currency(conn: &Connection, ledger: &CurrencyLedger, user_id: i64) -> Result<i64> {
    let currency_id: Option<i64> = conn
        .query_row(
            "SELECT currency_id FROM settings WHERE user_id=?1",
            params![user_id],
            |r| r.get(0),
        )
        .optional()?;
    let currency_id = currency_id.ok_or(MoneyError::NoReportingCurrency(user_id))?;
    if !ledger.is_convertible(currency_id) {
        return Err(MoneyError::InvalidReportingRate(currency_id).into());
    }
    Ok(currency_id)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn next_month_start(date: NaiveDate) -> NaiveDate {
    let (y, m) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1).unwrap_or(date)
}

type Range = (Option<DateTime<Utc>>, Option<DateTime<Utc>>);

/// `[from, to)` range covered by a statistics kind.
fn range_for(kind: StatKind, now: DateTime<Utc>) -> Result<Range> {
    let today = now.date_naive();
    let range = match kind {
        StatKind::AllExpenses | StatKind::AllIncome => (None, None),
        StatKind::MonthlyExpenses | StatKind::MonthlyIncome => {
            (Some(day_start(month_start(today))), None)
        }
        StatKind::TrailingMonths(n) => {
            let back = Duration::try_days(i64::from(n) * DAYS_PER_MONTH)
                .and_then(|d| today.checked_sub_signed(d))
                .with_context(|| format!("Trailing window of {} months is out of range", n))?;
            (
                Some(day_start(month_start(back))),
                Some(day_start(next_month_start(today))),
            )
        }
    };
    Ok(range)
}

pub fn statistics(
    conn: &Connection,
    user_id: i64,
    kind: StatKind,
    now: DateTime<Utc>,
) -> Result<Statistics> {
    let ledger = CurrencyLedger::load(conn)?;
    let target = reporting_currency(conn, &ledger, user_id)?;
    let (from, to) = range_for(kind, now)?;

    let mut sql = String::from(
        "SELECT substr(t.created,1,7), t.is_expense, c.name, t.amount, t.currency_id
         FROM transactions t JOIN categories c ON t.category_id=c.id
         WHERE t.user_id=?1 AND c.is_deleted=0",
    );
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];
    match kind {
        StatKind::AllExpenses | StatKind::MonthlyExpenses => sql.push_str(" AND t.is_expense=1"),
        StatKind::AllIncome | StatKind::MonthlyIncome => sql.push_str(" AND t.is_expense=0"),
        StatKind::TrailingMonths(_) => {}
    }
    if let Some(from) = from {
        args.push(Box::new(fmt_ts(&from)));
        sql.push_str(&format!(" AND t.created>=?{}", args.len()));
    }
    if let Some(to) = to {
        args.push(Box::new(fmt_ts(&to)));
        sql.push_str(&format!(" AND t.created<?{}", args.len()));
    }
    sql.push_str(" ORDER BY t.created, t.id");

    let mut stmt = conn.prepare(&sql)?;
    let mut cur = stmt.query(rusqlite::params_from_iter(args.iter()))?;

    let mut order: Vec<String> = Vec::new();
    let mut by_category: HashMap<String, Decimal> = HashMap::new();
    let mut by_month: BTreeMap<(String, bool, String), Decimal> = BTreeMap::new();
    let mut skipped = 0usize;

    while let Some(r) = cur.next()? {
        let month: String = r.get(0)?;
        let is_expense: bool = r.get(1)?;
        let category: String = r.get(2)?;
        let a_s: String = r.get(3)?;
        let currency_id: i64 = r.get(4)?;
        let amount = a_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid amount '{}' in transactions", a_s))?;
        let converted = match ledger.convert(amount, currency_id, target) {
            Ok(v) => v,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        let slot = match kind {
            StatKind::TrailingMonths(_) => by_month
                .entry((month, is_expense, category))
                .or_insert(Decimal::ZERO),
            _ => {
                if !by_category.contains_key(&category) {
                    order.push(category.clone());
                }
                by_category.entry(category).or_insert(Decimal::ZERO)
            }
        };
        match add(*slot, converted) {
            Ok(total) => *slot = total,
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::warn!(
            user_id,
            skipped,
            "transactions left out of statistics"
        );
    }

    let rows = match kind {
        StatKind::TrailingMonths(_) => StatRows::ByMonth(
            by_month
                .into_iter()
                .map(|((month, is_expense, category), total)| MonthTotal {
                    month,
                    is_expense,
                    category,
                    amount: round_money(total),
                })
                .collect(),
        ),
        _ => StatRows::ByCategory(
            order
                .into_iter()
                .map(|category| {
                    let total = by_category.get(&category).copied().unwrap_or_default();
                    CategoryTotal {
                        category,
                        amount: round_money(total),
                    }
                })
                .collect(),
        ),
    };
    Ok(Statistics {
        currency_id: target,
        rows,
        skipped,
    })
}
