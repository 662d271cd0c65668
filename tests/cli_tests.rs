// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Duration, Utc};
use fintrack::cli::build_cli;
use fintrack::commands::categories::{id_for_category, list_categories, soft_delete_category};
use fintrack::commands::currencies::{currency_by_code, set_rate};
use fintrack::commands::limits::{evaluate_limit, get_limit, set_limit, NewLimit};
use fintrack::commands::transactions::recent_transactions;
use fintrack::commands::users::register_user;
use fintrack::commands::{chat, limits, transactions};
use fintrack::db;
use fintrack::window::Period;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::io::Cursor;

fn setup() -> (Connection, i64) {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    let user_id = register_user(&mut conn, 42, "alice").unwrap();
    (conn, user_id)
}

fn chat_output(conn: &mut Connection, user_id: i64, script: &str) -> String {
    let mut out = Vec::new();
    chat::run(conn, user_id, Cursor::new(script.to_string()), &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn limit_set_and_tx_add_from_args() {
    let (mut conn, user_id) = setup();
    let m = build_cli()
        .try_get_matches_from([
            "fintrack", "-u", "42", "limit", "set", "-c", "Food", "--amount", "100", "--period",
            "week", "--auto-renew",
        ])
        .unwrap();
    let (_, sub) = m.subcommand().unwrap();
    limits::handle(&mut conn, sub).unwrap();

    let food = id_for_category(&conn, user_id, "Food").unwrap();
    let limit = get_limit(&conn, user_id, food).unwrap().unwrap();
    assert_eq!(limit.period, "7d");
    assert!(limit.is_updating);

    let m = build_cli()
        .try_get_matches_from([
            "fintrack", "tx", "add", "--user", "42", "-c", "Food", "--amount", "85,5", "--comment",
            "lunch",
        ])
        .unwrap();
    let (_, sub) = m.subcommand().unwrap();
    transactions::handle(&conn, sub).unwrap();

    let recent = recent_transactions(&conn, user_id, food, 5).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].amount, Decimal::new(855, 1));
    assert_eq!(recent[0].comment.as_deref(), Some("lunch"));
    assert_eq!(evaluate_limit(&conn, user_id, food).unwrap().percent_used, Some(85.5));
}

#[test]
fn bad_period_is_rejected() {
    let (mut conn, _) = setup();
    let m = build_cli()
        .try_get_matches_from([
            "fintrack", "-u", "42", "limit", "set", "-c", "Food", "--amount", "100", "--period",
            "fortnight",
        ])
        .unwrap();
    let (_, sub) = m.subcommand().unwrap();
    assert!(limits::handle(&mut conn, sub).is_err());
}

#[test]
fn unknown_user_is_rejected() {
    let (conn, _) = setup();
    let m = build_cli()
        .try_get_matches_from(["fintrack", "-u", "7", "tx", "add", "-c", "Food", "--amount", "1"])
        .unwrap();
    let (_, sub) = m.subcommand().unwrap();
    assert!(transactions::handle(&conn, sub).is_err());
}

#[test]
fn trailing_months_are_bounded() {
    assert!(build_cli()
        .try_get_matches_from(["fintrack", "stats", "trailing", "--months", "0"])
        .is_err());
}

#[test]
fn chat_records_expense() {
    let (mut conn, user_id) = setup();
    let out = chat_output(&mut conn, user_id, "/spend Food\nabc\n15\n-\n/quit\n");
    assert!(out.contains("Enter a valid positive number"));
    assert!(out.contains("Saved"));

    let food = id_for_category(&conn, user_id, "Food").unwrap();
    let recent = recent_transactions(&conn, user_id, food, 5).unwrap();
    assert_eq!(recent.len(), 1);
    assert!(recent[0].is_expense);
    assert!(recent[0].comment.is_none());
}

#[test]
fn chat_limit_then_warning() {
    let (mut conn, user_id) = setup();
    let out = chat_output(
        &mut conn,
        user_id,
        "/limit Food\n100\nfortnight\nweek\nyes\n/spend Food\n90\ncoffee\n",
    );
    assert!(out.contains("Invalid period"));
    assert!(out.contains("Limit set"));
    assert!(out.contains("90.0% of the limit used"));

    let out = chat_output(&mut conn, user_id, "/spend Food\n20\n-\n");
    assert!(out.contains("Limit exceeded: 110.0% used"));
}

#[test]
fn chat_category_lifecycle() {
    let (mut conn, user_id) = setup();
    let out = chat_output(
        &mut conn,
        user_id,
        "/newcat\nBooks\n/rename Books\nNovels\n/delete Novels\nno\n\
         /delete Novels\nyes\n/restore Nope\n",
    );
    assert!(out.contains("Cancelled"));
    assert!(out.contains("Category deleted"));
    assert!(out.contains("Category 'Nope' not found"));

    let novels = list_categories(&conn, user_id)
        .unwrap()
        .into_iter()
        .find(|c| c.name == "Novels")
        .unwrap();
    assert!(novels.is_deleted);
    assert!(novels.deleted_at.is_some());
}

#[test]
fn chat_ignores_free_text_when_idle() {
    let (mut conn, user_id) = setup();
    let out = chat_output(&mut conn, user_id, "hello\n/cancel\n");
    assert!(out.matches("Commands:").count() >= 2);
    assert!(out.contains("Cancelled"));
}

fn kzt_limit_without_rate(conn: &mut Connection, user_id: i64) -> i64 {
    let food = id_for_category(conn, user_id, "Food").unwrap();
    let kzt = currency_by_code(conn, "KZT").unwrap().id;
    set_limit(
        conn,
        &NewLimit {
            user_id,
            category_id: food,
            currency_id: kzt,
            amount: Decimal::new(5000, 0),
            period: Period::Days(30),
            auto_renew: true,
            start_date: Utc::now() - Duration::days(1),
            end_date: None,
        },
    )
    .unwrap();
    set_rate(conn, "KZT", Decimal::ZERO, None, None).unwrap();
    food
}

#[test]
fn chat_spend_survives_limit_without_rate() {
    let (mut conn, user_id) = setup();
    let food = kzt_limit_without_rate(&mut conn, user_id);

    let out = chat_output(&mut conn, user_id, "/spend Food\n10\n-\n/spend Food\n5\n-\n");
    assert_eq!(out.matches("Saved").count(), 2);
    assert_eq!(out.matches("Limit could not be checked").count(), 2);
    assert_eq!(recent_transactions(&conn, user_id, food, 5).unwrap().len(), 2);
}

#[test]
fn tx_add_survives_limit_without_rate() {
    let (mut conn, user_id) = setup();
    let food = kzt_limit_without_rate(&mut conn, user_id);

    let m = build_cli()
        .try_get_matches_from(["fintrack", "-u", "42", "tx", "add", "-c", "Food", "--amount", "10"])
        .unwrap();
    let (_, sub) = m.subcommand().unwrap();
    transactions::handle(&conn, sub).unwrap();
    assert_eq!(recent_transactions(&conn, user_id, food, 5).unwrap().len(), 1);
}

#[test]
fn deleted_category_takes_no_records() {
    let (mut conn, user_id) = setup();
    let food = id_for_category(&conn, user_id, "Food").unwrap();
    soft_delete_category(&conn, food, Utc::now()).unwrap();

    let out = chat_output(&mut conn, user_id, "/spend Food\n/limit Food\n");
    assert_eq!(out.matches("Category 'Food' not found").count(), 2);

    let m = build_cli()
        .try_get_matches_from(["fintrack", "-u", "42", "tx", "add", "-c", "Food", "--amount", "10"])
        .unwrap();
    let (_, sub) = m.subcommand().unwrap();
    assert!(transactions::handle(&conn, sub).is_err());
    assert!(recent_transactions(&conn, user_id, food, 5).unwrap().is_empty());

    let m = build_cli()
        .try_get_matches_from([
            "fintrack", "-u", "42", "limit", "set", "-c", "Food", "--amount", "100", "--period",
            "week",
        ])
        .unwrap();
    let (_, sub) = m.subcommand().unwrap();
    assert!(limits::handle(&mut conn, sub).is_err());
    assert!(get_limit(&conn, user_id, food).unwrap().is_none());

    let out = chat_output(&mut conn, user_id, "/restore Food\nyes\n/spend Food\n3\n-\n");
    assert!(out.contains("Saved"));
}

#[test]
fn chat_rejects_amount_that_rounds_to_zero() {
    let (mut conn, user_id) = setup();
    let out = chat_output(&mut conn, user_id, "/spend Food\n0.001\n0.01\n-\n");
    assert!(out.contains("Enter a valid positive number"));
    assert!(out.contains("Saved"));

    let food = id_for_category(&conn, user_id, "Food").unwrap();
    let recent = recent_transactions(&conn, user_id, food, 5).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].amount, Decimal::new(1, 2));
}
