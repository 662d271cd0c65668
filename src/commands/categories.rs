// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::users::require_user;
use crate::config::CATEGORY_RETENTION_DAYS;
use crate::models::Category;
use crate::utils::{fmt_ts, maybe_print_json, opt_ts_col, pretty_table};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let user = require_user(conn, m)?;
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            add_category(conn, user.id, name)?;
            println!("Added category '{}'", name);
        }
        Some(("list", sub)) => {
            let deleted = sub.get_flag("deleted");
            let data: Vec<Category> = list_categories(conn, user.id)?
                .into_iter()
                .filter(|c| c.is_deleted == deleted)
                .collect();
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .iter()
                    .map(|c| {
                        vec![
                            c.name.clone(),
                            c.deleted_at
                                .map(|d| d.format("%Y-%m-%d").to_string())
                                .unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!("{}", pretty_table(&["Category", "Deleted"], rows));
            }
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let id = id_for_active_category(conn, user.id, name)?;
            soft_delete_category(conn, id, Utc::now())?;
            println!(
                "Removed category '{}' (restorable for {} days)",
                name, CATEGORY_RETENTION_DAYS
            );
        }
        Some(("restore", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let id = id_for_category(conn, user.id, name)?;
            restore_category(conn, id)?;
            println!("Restored category '{}'", name);
        }
        Some(("rename", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let to = sub.get_one::<String>("to").unwrap().trim();
            let id = id_for_active_category(conn, user.id, name)?;
            rename_category(conn, id, to)?;
            println!("Renamed '{}' to '{}'", name, to);
        }
        _ => {}
    }
    Ok(())
}

pub fn add_category(conn: &Connection, user_id: i64, name: &str) -> Result<i64> {
    if name.trim().is_empty() {
        bail!("Category name must not be empty");
    }
    conn.execute(
        "INSERT INTO categories(user_id, name) VALUES (?1, ?2)",
        params![user_id, name.trim()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn rename_category(conn: &Connection, category_id: i64, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Category name must not be empty");
    }
    conn.execute(
        "UPDATE categories SET name=?1 WHERE id=?2",
        params![name.trim(), category_id],
    )?;
    Ok(())
}

pub fn soft_delete_category(conn: &Connection, category_id: i64, at: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE categories SET is_deleted=1, deleted_at=?1 WHERE id=?2",
        params![fmt_ts(&at), category_id],
    )?;
    Ok(())
}

pub fn restore_category(conn: &Connection, category_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE categories SET is_deleted=0, deleted_at=NULL WHERE id=?1",
        params![category_id],
    )?;
    Ok(())
}

fn category_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: r.get(0)?,
        user_id: r.get(1)?,
        name: r.get(2)?,
        is_deleted: r.get(3)?,
        deleted_at: opt_ts_col(r, 4)?,
    })
}

/// All categories of the user, soft-deleted ones included.
pub fn list_categories(conn: &Connection, user_id: i64) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, is_deleted, deleted_at FROM categories WHERE user_id=?1 ORDER BY name",
    )?;
    let rows = stmt.query_map(params![user_id], category_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn category_by_id(conn: &Connection, category_id: i64) -> Result<Option<Category>> {
    let c = conn
        .query_row(
            "SELECT id, user_id, name, is_deleted, deleted_at FROM categories WHERE id=?1",
            params![category_id],
            category_from_row,
        )
        .optional()?;
    Ok(c)
}

pub fn id_for_category(conn: &Connection, user_id: i64, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare(
        "SELECT id FROM categories WHERE user_id=?1 AND name=?2 ORDER BY is_deleted, id LIMIT 1",
    )?;
    let id: i64 = stmt
        .query_row(params![user_id, name], |r| r.get(0))
        .with_context(|| format!("Category '{}' not found", name))?;
    Ok(id)
}

/// Like `id_for_category`, but soft-deleted categories are not found. Used by
/// the flows that write into a category.
pub fn id_for_active_category(conn: &Connection, user_id: i64, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare(
        "SELECT id FROM categories WHERE user_id=?1 AND name=?2 AND is_deleted=0 ORDER BY id LIMIT 1",
    )?;
    let id: i64 = stmt
        .query_row(params![user_id, name], |r| r.get(0))
        .with_context(|| format!("Category '{}' not found", name))?;
    Ok(id)
}
