// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::CurrencyLedger;
use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection) -> Result<()> {
    let rows = diagnose(conn)?;
    if rows.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

/// Lists data problems that make totals silently incomplete.
pub fn diagnose(conn: &Connection) -> Result<Vec<Vec<String>>> {
    let ledger = CurrencyLedger::load(conn)?;
    let mut rows = Vec::new();

    // 1) Currencies in use without a usable rate
    for (sql, issue) in [
        (
            "SELECT c.id, c.code, COUNT(*) FROM transactions t JOIN currencies c ON t.currency_id=c.id GROUP BY c.id",
            "txn_currency_no_rate",
        ),
        (
            "SELECT c.id, c.code, COUNT(*) FROM limits l JOIN currencies c ON l.currency_id=c.id GROUP BY c.id",
            "limit_currency_no_rate",
        ),
        (
            "SELECT c.id, c.code, COUNT(*) FROM settings s JOIN currencies c ON s.currency_id=c.id GROUP BY c.id",
            "reporting_currency_no_rate",
        ),
    ] {
        let mut stmt = conn.prepare(sql)?;
        let mut cur = stmt.query([])?;
        while let Some(r) = cur.next()? {
            let id: i64 = r.get(0)?;
            let code: String = r.get(1)?;
            let n: i64 = r.get(2)?;
            if !ledger.is_convertible(id) {
                rows.push(vec![issue.into(), format!("{} ({} rows)", code, n)]);
            }
        }
    }

    // 2) Users without a reporting currency
    let mut stmt = conn.prepare(
        "SELECT u.tg_id FROM users u LEFT JOIN settings s ON s.user_id=u.id WHERE s.id IS NULL",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let tg_id: i64 = r.get(0)?;
        rows.push(vec!["user_without_setting".into(), tg_id.to_string()]);
    }
    Ok(rows)
}
