// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, Duration, TimeZone, Utc};
use fintrack::commands::categories::{id_for_category, list_categories, soft_delete_category};
use fintrack::commands::currencies::currency_by_code;
use fintrack::commands::limits::{get_limit, set_limit, NewLimit};
use fintrack::commands::sweep::{purge_soft_deleted_categories, rollover_all_limits};
use fintrack::commands::transactions::{record_transaction_at, NewTransaction};
use fintrack::commands::users::register_user;
use fintrack::db;
use fintrack::window::Period;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap()
}

fn setup() -> (Connection, i64) {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    let user_id = register_user(&mut conn, 7, "bob").unwrap();
    (conn, user_id)
}

fn add_limit(
    conn: &mut Connection,
    user_id: i64,
    category: &str,
    period: Period,
    auto_renew: bool,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> i64 {
    let category_id = id_for_category(conn, user_id, category).unwrap();
    let rub = currency_by_code(conn, "RUB").unwrap().id;
    set_limit(
        conn,
        &NewLimit {
            user_id,
            category_id,
            currency_id: rub,
            amount: Decimal::new(1000, 0),
            period,
            auto_renew,
            start_date: start,
            end_date: end,
        },
    )
    .unwrap();
    category_id
}

#[test]
fn rollover_catches_up_to_now() {
    let (mut conn, user_id) = setup();
    let start = now() - Duration::days(95);
    let food = add_limit(&mut conn, user_id, "Food", Period::Days(30), true, start, None);

    assert_eq!(rollover_all_limits(&mut conn, now()).unwrap(), 1);
    let l = get_limit(&conn, user_id, food).unwrap().unwrap();
    let end = l.end_date.unwrap();
    assert!(end >= now());
    assert!(l.start_date <= now());
    assert_eq!(end - l.start_date, Duration::days(30));
    assert_eq!(l.start_date, start + Duration::days(90));
}

#[test]
fn rollover_is_idempotent() {
    let (mut conn, user_id) = setup();
    let start = now() - Duration::days(50);
    let food = add_limit(&mut conn, user_id, "Food", Period::Days(7), true, start, None);

    rollover_all_limits(&mut conn, now()).unwrap();
    let first = get_limit(&conn, user_id, food).unwrap().unwrap();
    assert_eq!(rollover_all_limits(&mut conn, now()).unwrap(), 0);
    let second = get_limit(&conn, user_id, food).unwrap().unwrap();
    assert_eq!(first.start_date, second.start_date);
    assert_eq!(first.end_date, second.end_date);
}

#[test]
fn rollover_leaves_custom_and_manual_limits() {
    let (mut conn, user_id) = setup();
    let old = now() - Duration::days(60);
    let custom_end = now() - Duration::days(30);
    let food = add_limit(&mut conn, user_id, "Food", Period::Custom, true, old, Some(custom_end));
    let transport = add_limit(&mut conn, user_id, "Transport", Period::Days(10), false, old, None);
    let housing = add_limit(&mut conn, user_id, "Housing", Period::Days(10), true, old, None);
    conn.execute(
        "UPDATE limits SET period='10 days' WHERE category_id=?1",
        params![housing],
    )
    .unwrap();

    assert_eq!(rollover_all_limits(&mut conn, now()).unwrap(), 0);
    let f = get_limit(&conn, user_id, food).unwrap().unwrap();
    assert_eq!(f.start_date, old);
    assert_eq!(f.end_date, Some(custom_end));
    let t = get_limit(&conn, user_id, transport).unwrap().unwrap();
    assert_eq!(t.start_date, old);
    let h = get_limit(&conn, user_id, housing).unwrap().unwrap();
    assert_eq!(h.start_date, old);
}

#[test]
fn rollover_fills_missing_end_date() {
    let (mut conn, user_id) = setup();
    let start = now() - Duration::days(1);
    let food = add_limit(&mut conn, user_id, "Food", Period::Days(30), true, start, None);
    conn.execute("UPDATE limits SET end_date=NULL, period='30D'", []).unwrap();

    assert_eq!(rollover_all_limits(&mut conn, now()).unwrap(), 1);
    let l = get_limit(&conn, user_id, food).unwrap().unwrap();
    assert_eq!(l.start_date, start);
    assert_eq!(l.end_date, Some(start + Duration::days(30)));
}

#[test]
fn purge_removes_only_expired_soft_deletes() {
    let (mut conn, user_id) = setup();
    let food = add_limit(&mut conn, user_id, "Food", Period::Days(30), true, now(), None);
    let transport = id_for_category(&conn, user_id, "Transport").unwrap();
    let rub = currency_by_code(&conn, "RUB").unwrap().id;
    record_transaction_at(
        &conn,
        &NewTransaction {
            user_id,
            category_id: food,
            currency_id: rub,
            amount: Decimal::new(500, 0),
            is_expense: true,
            comment: Some("groceries".into()),
        },
        now() - Duration::days(40),
    )
    .unwrap();
    soft_delete_category(&conn, food, now() - Duration::days(31)).unwrap();
    soft_delete_category(&conn, transport, now() - Duration::days(29)).unwrap();

    assert_eq!(purge_soft_deleted_categories(&mut conn, now(), 30).unwrap(), 1);

    let names: Vec<String> = list_categories(&conn, user_id)
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert!(!names.contains(&"Food".to_string()));
    assert!(names.contains(&"Transport".to_string()));

    let txs: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM transactions WHERE category_id=?1",
            params![food],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(txs, 0);
    assert!(get_limit(&conn, user_id, food).unwrap().is_none());
}

#[test]
fn purge_rejects_out_of_range_retention() {
    let (mut conn, user_id) = setup();
    let food = id_for_category(&conn, user_id, "Food").unwrap();
    soft_delete_category(&conn, food, now() - Duration::days(400)).unwrap();

    assert!(purge_soft_deleted_categories(&mut conn, now(), -1).is_err());
    assert!(purge_soft_deleted_categories(&mut conn, now(), i64::MAX).is_err());
    assert!(purge_soft_deleted_categories(&mut conn, now(), 100_000_000).is_err());
    assert!(list_categories(&conn, user_id).unwrap().iter().any(|c| c.id == food));

    assert_eq!(purge_soft_deleted_categories(&mut conn, now(), 0).unwrap(), 1);
}
