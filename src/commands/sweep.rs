// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Periodic maintenance, meant to be driven by cron or a systemd timer.

use crate::commands::limits::{limit_from_row, LIMIT_COLUMNS};
use crate::config::CATEGORY_RETENTION_DAYS;
use crate::utils::fmt_ts;
use crate::window::roll_forward;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("rollover", _)) => {
            let n = rollover_all_limits(conn, Utc::now())?;
            println!("Rolled over {} limit(s)", n);
        }
        Some(("purge", sub)) => {
            let days = *sub
                .get_one::<i64>("retention-days")
                .unwrap_or(&CATEGORY_RETENTION_DAYS);
            let n = purge_soft_deleted_categories(conn, Utc::now(), days)?;
            println!("Purged {} categor{}", n, if n == 1 { "y" } else { "ies" });
        }
        _ => {}
    }
    Ok(())
}

/// Moves every expired auto-updating limit forward to the window containing
/// `now`. Idempotent; returns the number of limits changed.
pub fn rollover_all_limits(conn: &mut Connection, now: DateTime<Utc>) -> Result<usize> {
    let tx = conn.transaction()?;
    let limits = {
        let mut stmt = tx.prepare(&format!(
            "SELECT {LIMIT_COLUMNS} FROM limits WHERE is_updating=1 ORDER BY id"
        ))?;
        let rows = stmt.query_map([], limit_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        out
    };

    let mut changed = 0;
    for mut limit in limits {
        if !roll_forward(&mut limit, now) {
            continue;
        }
        tx.execute(
            "UPDATE limits SET start_date=?1, end_date=?2 WHERE id=?3",
            params![
                fmt_ts(&limit.start_date),
                limit.end_date.as_ref().map(fmt_ts),
                limit.id
            ],
        )?;
        changed += 1;
    }
    tx.commit()?;
    tracing::info!(changed, "limit rollover finished");
    Ok(changed)
}

/// Hard-deletes categories soft-deleted more than `retention_days` ago.
/// Their transactions and limits go with them.
pub fn purge_soft_deleted_categories(
    conn: &mut Connection,
    now: DateTime<Utc>,
    retention_days: i64,
) -> Result<usize> {
    if retention_days < 0 {
        bail!("Retention must not be negative, got {} days", retention_days);
    }
    let threshold = Duration::try_days(retention_days)
        .and_then(|d| now.checked_sub_signed(d))
        .with_context(|| format!("Retention of {} days is out of range", retention_days))?;
    let tx = conn.transaction()?;
    let n = tx.execute(
        "DELETE FROM categories WHERE is_deleted=1 AND deleted_at IS NOT NULL AND deleted_at<?1",
        params![fmt_ts(&threshold)],
    )?;
    tx.commit()?;
    tracing::info!(purged = n, retention_days, "soft-deleted categories purged");
    Ok(n)
}
