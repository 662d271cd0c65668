// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Line-oriented conversational front-end over the session state machine.

use crate::commands::categories::{
    add_category, id_for_active_category, id_for_category, rename_category, restore_category,
    soft_delete_category,
};
use crate::commands::limits::{check_limit, limit_notice, set_limit, NewLimit};
use crate::commands::stats::{statistics, StatKind, StatRows};
use crate::commands::transactions::{record_transaction, NewTransaction};
use crate::commands::users::{require_user, user_currency};
use crate::errors::MoneyError;
use crate::session::{CategoryAction, SessionStore, Step};
use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use std::io::{BufRead, Write};

const HELP: &str = "Commands: /spend <category>, /limit <category>, /newcat, /rename <category>, \
/delete <category>, /restore <category>, /stats, /cancel, /quit";

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    let user = require_user(conn, m)?;
    let stdin = std::io::stdin();
    let mut out = std::io::stdout();
    run(conn, user.id, stdin.lock(), &mut out)
}

/// Drives one user's conversation until EOF or `/quit`.
pub fn run<R: BufRead, W: Write>(
    conn: &mut Connection,
    user_id: i64,
    input: R,
    out: &mut W,
) -> Result<()> {
    let mut store = SessionStore::default();
    writeln!(out, "{}", HELP)?;
    for line in input.lines() {
        let line = line?;
        let text = line.trim();
        if text == "/quit" {
            break;
        }
        let step = match text.split_once(' ').unwrap_or((text, "")) {
            ("/cancel", _) => store.session(user_id).cancel(),
            ("/help", _) => Step::Prompt(HELP),
            ("/stats", _) => {
                print_stats(conn, user_id, out)?;
                continue;
            }
            ("/newcat", _) => store.session(user_id).begin_add_category(),
            (cmd @ ("/spend" | "/limit" | "/rename" | "/delete" | "/restore"), name) => {
                let lookup = if cmd == "/restore" {
                    id_for_category(conn, user_id, name.trim())
                } else {
                    id_for_active_category(conn, user_id, name.trim())
                };
                let category_id = match lookup {
                    Ok(id) => id,
                    Err(e) => {
                        writeln!(out, "❌ {}", e)?;
                        continue;
                    }
                };
                let session = store.session(user_id);
                match cmd {
                    "/spend" => session.begin_transaction(category_id),
                    "/limit" => session.begin_limit(category_id),
                    "/rename" => session.begin_rename(category_id),
                    "/delete" => session.begin_confirm(category_id, CategoryAction::Delete),
                    _ => session.begin_confirm(category_id, CategoryAction::Restore),
                }
            }
            _ => store.session(user_id).feed(text),
        };
        if let Err(e) = apply(conn, user_id, step, out) {
            writeln!(out, "❌ {}", e)?;
        }
    }
    Ok(())
}

fn apply<W: Write>(conn: &mut Connection, user_id: i64, step: Step, out: &mut W) -> Result<()> {
    match step {
        Step::Prompt(p) => writeln!(out, "{}", p)?,
        Step::Retry(p) => writeln!(out, "❌ {}", p)?,
        Step::Ignored => writeln!(out, "{}", HELP)?,
        Step::Cancelled => writeln!(out, "Cancelled")?,
        Step::Record { category_id, amount, is_expense, comment } => {
            let currency_id = user_currency(conn, user_id)?
                .ok_or(MoneyError::NoReportingCurrency(user_id))?
                .id;
            record_transaction(
                conn,
                &NewTransaction { user_id, category_id, currency_id, amount, is_expense, comment },
            )?;
            writeln!(out, "✅ Saved")?;
            if is_expense {
                if let Some(line) = limit_notice(check_limit(conn, user_id, category_id)?) {
                    writeln!(out, "{}", line)?;
                }
            }
        }
        Step::SetLimit { category_id, amount, period, auto_renew } => {
            let currency_id = user_currency(conn, user_id)?
                .ok_or(MoneyError::NoReportingCurrency(user_id))?
                .id;
            set_limit(
                conn,
                &NewLimit {
                    user_id,
                    category_id,
                    currency_id,
                    amount,
                    period,
                    auto_renew,
                    start_date: Utc::now(),
                    end_date: None,
                },
            )?;
            writeln!(out, "✅ Limit set: {} for {}", amount, period)?;
        }
        Step::AddCategory { name } => {
            add_category(conn, user_id, &name)?;
            writeln!(out, "✅ Category '{}' added", name)?;
        }
        Step::RenameCategory { category_id, name } => {
            rename_category(conn, category_id, &name)?;
            writeln!(out, "✅ Renamed to '{}'", name)?;
        }
        Step::Category { category_id, action: CategoryAction::Delete } => {
            soft_delete_category(conn, category_id, Utc::now())?;
            writeln!(out, "✅ Category deleted")?;
        }
        Step::Category { category_id, action: CategoryAction::Restore } => {
            restore_category(conn, category_id)?;
            writeln!(out, "✅ Category restored")?;
        }
    }
    Ok(())
}

fn print_stats<W: Write>(conn: &Connection, user_id: i64, out: &mut W) -> Result<()> {
    match statistics(conn, user_id, StatKind::MonthlyExpenses, Utc::now()) {
        Ok(stats) => {
            if let StatRows::ByCategory(rows) = stats.rows {
                if rows.is_empty() {
                    writeln!(out, "No expenses this month")?;
                }
                for r in rows {
                    writeln!(out, "{}: {:.2}", r.category, r.amount)?;
                }
            }
        }
        Err(e) => writeln!(out, "❌ {}", e)?,
    }
    Ok(())
}
