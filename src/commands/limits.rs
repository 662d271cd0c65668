// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::categories::{id_for_active_category, id_for_category};
use crate::commands::currencies::{currency_by_code, currency_by_id};
use crate::commands::users::{require_user, user_currency};
use crate::config::WARN_PERCENT;
use crate::errors::MoneyError;
use crate::ledger::CurrencyLedger;
use crate::models::Limit;
use crate::utils::{
    day_start, decimal_col, fmt_money, fmt_ts, maybe_print_json, opt_ts_col, parse_date,
    money_amount, parse_decimal, pretty_table, round_money, ts_col,
};
use crate::window::{initial_end_date, LimitWindow, Period};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => set(conn, sub)?,
        Some(("show", sub)) => show(conn, sub)?,
        Some(("check", sub)) => check(conn, sub)?,
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewLimit {
    pub user_id: i64,
    pub category_id: i64,
    pub currency_id: i64,
    pub amount: Decimal,
    pub period: Period,
    pub auto_renew: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitAlert {
    Ok,
    Warning,
    Exceeded,
}

/// Outcome of a limit check. `percent_used` is `None` when no limit is in
/// effect and `Some(0.0)` when a limit exists but nothing was spent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LimitStatus {
    pub exceeded: bool,
    pub percent_used: Option<f64>,
    pub spent: Decimal,
}

impl LimitStatus {
    pub fn none() -> Self {
        Self {
            exceeded: false,
            percent_used: None,
            spent: Decimal::ZERO,
        }
    }

    pub fn alert(&self) -> LimitAlert {
        match self.percent_used {
            _ if self.exceeded => LimitAlert::Exceeded,
            Some(p) if p >= WARN_PERCENT => LimitAlert::Warning,
            _ => LimitAlert::Ok,
        }
    }
}

fn set(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user = require_user(conn, sub)?;
    let category = sub.get_one::<String>("category").unwrap().trim();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let period = Period::from_input(sub.get_one::<String>("period").unwrap())?;
    let auto_renew = sub.get_flag("auto-renew");
    let category_id = id_for_active_category(conn, user.id, category)?;
    let currency = match sub.get_one::<String>("currency") {
        Some(code) => currency_by_code(conn, code)?,
        None => user_currency(conn, user.id)?.ok_or(MoneyError::NoReportingCurrency(user.id))?,
    };
    let start_date = match sub.get_one::<String>("start") {
        Some(s) => day_start(parse_date(s.trim())?),
        None => Utc::now(),
    };
    let end_date = match sub.get_one::<String>("end") {
        Some(s) => Some(day_start(parse_date(s.trim())?)),
        None => None,
    };

    set_limit(
        conn,
        &NewLimit {
            user_id: user.id,
            category_id,
            currency_id: currency.id,
            amount,
            period,
            auto_renew,
            start_date,
            end_date,
        },
    )?;
    println!(
        "Limit set: {} on '{}' for {} ({})",
        fmt_money(&amount, currency.label()),
        category,
        period,
        if auto_renew { "auto-renew" } else { "no auto-renew" }
    );
    Ok(())
}

/// Replaces any existing limit on the (user, category) pair.
pub fn set_limit(conn: &mut Connection, new: &NewLimit) -> Result<i64> {
    let amount = money_amount(new.amount).context("Invalid limit amount")?;
    let end_date = match new.period {
        Period::Days(_) => initial_end_date(new.period, new.start_date, new.end_date),
        Period::Custom => match new.end_date {
            Some(end) if end > new.start_date => Some(end),
            Some(_) => bail!("Custom limit must end after it starts"),
            None => bail!("Custom limit requires an end date"),
        },
        Period::Unrecognized => {
            return Err(MoneyError::InvalidPeriod(new.period.to_string()).into());
        }
    };

    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM limits WHERE user_id=?1 AND category_id=?2",
        params![new.user_id, new.category_id],
    )?;
    tx.execute(
        "INSERT INTO limits(user_id, category_id, currency_id, limit_amount, period, is_updating, start_date, end_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            new.user_id,
            new.category_id,
            new.currency_id,
            amount.to_string(),
            new.period.to_string(),
            new.auto_renew,
            fmt_ts(&new.start_date),
            end_date.as_ref().map(fmt_ts)
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    tracing::info!(
        id,
        user_id = new.user_id,
        category_id = new.category_id,
        period = %new.period,
        "limit set"
    );
    Ok(id)
}

pub(crate) fn limit_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Limit> {
    Ok(Limit {
        id: r.get(0)?,
        user_id: r.get(1)?,
        category_id: r.get(2)?,
        currency_id: r.get(3)?,
        limit_amount: decimal_col(r, 4)?,
        period: r.get(5)?,
        is_updating: r.get(6)?,
        start_date: ts_col(r, 7)?,
        end_date: opt_ts_col(r, 8)?,
    })
}

pub const LIMIT_COLUMNS: &str =
    "id, user_id, category_id, currency_id, limit_amount, period, is_updating, start_date, end_date";

pub fn get_limit(conn: &Connection, user_id: i64, category_id: i64) -> Result<Option<Limit>> {
    let l = conn
        .query_row(
            &format!("SELECT {LIMIT_COLUMNS} FROM limits WHERE user_id=?1 AND category_id=?2"),
            params![user_id, category_id],
            limit_from_row,
        )
        .optional()?;
    Ok(l)
}

/// Recomputes from the raw transaction log how much of the category's limit
/// is used in its current window.
pub fn evaluate_limit(conn: &Connection, user_id: i64, category_id: i64) -> Result<LimitStatus> {
    let limit = match get_limit(conn, user_id, category_id)? {
        Some(l) if l.limit_amount > Decimal::ZERO => l,
        _ => return Ok(LimitStatus::none()),
    };
    let window = match LimitWindow::of(&limit) {
        Some(w) => w,
        None => return Ok(LimitStatus::none()),
    };

    let mut stmt = conn.prepare(
        "SELECT amount, currency_id FROM transactions
         WHERE user_id=?1 AND category_id=?2 AND is_expense=1
           AND created>=?3 AND created<=?4",
    )?;
    let mut cur = stmt.query(params![
        user_id,
        category_id,
        fmt_ts(&window.start),
        fmt_ts(&window.end)
    ])?;
    let mut items = Vec::new();
    while let Some(r) = cur.next()? {
        let a_s: String = r.get(0)?;
        let amount = a_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid amount '{}' in transactions", a_s))?;
        items.push((amount, r.get::<_, i64>(1)?));
    }
    if items.is_empty() {
        return Ok(LimitStatus {
            exceeded: false,
            percent_used: Some(0.0),
            spent: Decimal::ZERO,
        });
    }

    let ledger = CurrencyLedger::load(conn)?;
    let spent = ledger.convert_sum(items, limit.currency_id)?.total;
    let status = LimitStatus {
        exceeded: spent > limit.limit_amount,
        percent_used: Some(percent_of(spent, limit.limit_amount)),
        spent: round_money(spent),
    };
    tracing::debug!(user_id, category_id, %spent, exceeded = status.exceeded, "limit evaluated");
    Ok(status)
}

fn percent_of(spent: Decimal, limit: Decimal) -> f64 {
    spent
        .checked_div(limit)
        .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
        .and_then(|p| p.to_f64())
        .unwrap_or_else(|| {
            let (s, l) = (spent.to_f64().unwrap_or(f64::MAX), limit.to_f64().unwrap_or(1.0));
            s / l * 100.0
        })
}

/// Advisory check run after an expense is recorded. A limit that cannot be
/// measured (its currency lost its rate, or the sum overflows) counts as no
/// limit in effect and yields `None`.
pub fn check_limit(
    conn: &Connection,
    user_id: i64,
    category_id: i64,
) -> Result<Option<LimitStatus>> {
    match evaluate_limit(conn, user_id, category_id) {
        Ok(status) => Ok(Some(status)),
        Err(e) => match e.downcast_ref::<MoneyError>() {
            Some(MoneyError::Unconvertible(_) | MoneyError::Overflow) => {
                tracing::warn!(user_id, category_id, error = %e, "limit not checked");
                Ok(None)
            }
            _ => Err(e),
        },
    }
}

/// Line shown to the user after an expense is recorded, if any.
pub fn limit_notice(status: Option<LimitStatus>) -> Option<String> {
    let Some(status) = status else {
        return Some("⚠ Limit could not be checked: no usable exchange rate".into());
    };
    let p = status.percent_used.unwrap_or_default();
    match status.alert() {
        LimitAlert::Exceeded => Some(format!("❗ Limit exceeded: {:.1}% used", p)),
        LimitAlert::Warning => Some(format!("⚠ {:.1}% of the limit used", p)),
        LimitAlert::Ok => None,
    }
}

#[derive(Serialize)]
struct LimitRow {
    category: String,
    limit: String,
    period: String,
    auto_renew: bool,
    start: String,
    end: String,
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user = require_user(conn, sub)?;
    let mut stmt = conn.prepare(
        "SELECT c.name, l.limit_amount, cu.code, l.period, l.is_updating, l.start_date, l.end_date
         FROM limits l
         JOIN categories c ON l.category_id=c.id
         JOIN currencies cu ON l.currency_id=cu.id
         WHERE l.user_id=?1 ORDER BY c.name",
    )?;
    let mut cur = stmt.query(params![user.id])?;
    let mut data = Vec::new();
    while let Some(r) = cur.next()? {
        let amount = decimal_col(r, 1)?;
        let code: String = r.get(2)?;
        data.push(LimitRow {
            category: r.get(0)?,
            limit: format!("{:.2} {}", amount, code),
            period: r.get(3)?,
            auto_renew: r.get(4)?,
            start: ts_col(r, 5)?.format("%Y-%m-%d").to_string(),
            end: opt_ts_col(r, 6)?
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        });
    }
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|l| {
                vec![
                    l.category.clone(),
                    l.limit.clone(),
                    l.period.clone(),
                    if l.auto_renew { "yes" } else { "no" }.into(),
                    l.start.clone(),
                    l.end.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Category", "Limit", "Period", "Auto", "Start", "End"], rows)
        );
    }
    Ok(())
}

fn check(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user = require_user(conn, sub)?;
    let category = sub.get_one::<String>("category").unwrap().trim();
    let category_id = id_for_category(conn, user.id, category)?;
    let status = evaluate_limit(conn, user.id, category_id)?;
    if maybe_print_json(sub.get_flag("json"), false, &status)? {
        return Ok(());
    }
    match (status.percent_used, get_limit(conn, user.id, category_id)?) {
        (Some(p), Some(limit)) => {
            let label = currency_by_id(conn, limit.currency_id)?
                .map(|c| c.label().to_string())
                .unwrap_or_default();
            println!(
                "'{}': spent {} of {} ({:.1}%){}",
                category,
                fmt_money(&status.spent, &label),
                fmt_money(&limit.limit_amount, &label),
                p,
                if status.exceeded { " - exceeded" } else { "" }
            );
        }
        _ => println!("'{}': no limit in effect", category),
    }
    Ok(())
}
