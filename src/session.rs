// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Per-user conversation state for the interactive front-end.
//!
//! Each state expects one kind of input line:
//!
//! | state            | input                              | next state       |
//! |------------------|------------------------------------|------------------|
//! | `TxAmount`       | amount, `+` prefix marks income    | `TxComment`      |
//! | `TxComment`      | free text, `-` for none            | `Idle` (record)  |
//! | `LimitAmount`    | amount                             | `LimitPeriod`    |
//! | `LimitPeriod`    | `<N>d`, day, week, month, year     | `LimitRenew`     |
//! | `LimitRenew`     | yes / no                           | `Idle` (set)     |
//! | `CategoryName`   | non-empty name                     | `Idle` (add)     |
//! | `CategoryRename` | non-empty name                     | `Idle` (rename)  |
//! | `CategoryConfirm`| yes / no                           | `Idle`           |
//!
//! Invalid input keeps the current state.

use crate::utils::{money_amount, parse_decimal};
use crate::window::Period;
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryAction {
    Delete,
    Restore,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Idle,
    TxAmount { category_id: i64 },
    TxComment { category_id: i64, amount: Decimal, is_expense: bool },
    LimitAmount { category_id: i64 },
    LimitPeriod { category_id: i64, amount: Decimal },
    LimitRenew { category_id: i64, amount: Decimal, period: Period },
    CategoryName,
    CategoryRename { category_id: i64 },
    CategoryConfirm { category_id: i64, action: CategoryAction },
}

/// What the front-end should do after feeding a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Prompt(&'static str),
    Retry(&'static str),
    Record { category_id: i64, amount: Decimal, is_expense: bool, comment: Option<String> },
    SetLimit { category_id: i64, amount: Decimal, period: Period, auto_renew: bool },
    AddCategory { name: String },
    RenameCategory { category_id: i64, name: String },
    Category { category_id: i64, action: CategoryAction },
    Cancelled,
    Ignored,
}

#[derive(Debug, Default)]
pub struct Session {
    state: State,
}

fn parse_amount(input: &str) -> Option<(Decimal, bool)> {
    let s = input.trim();
    let (s, is_expense) = match s.strip_prefix('+') {
        Some(rest) => (rest, false),
        None => (s, true),
    };
    let amount = parse_decimal(s).ok()?;
    money_amount(amount).ok().map(|d| (d, is_expense))
}

fn parse_yes_no(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "yes" | "y" | "да" => Some(true),
        "no" | "n" | "нет" => Some(false),
        _ => None,
    }
}

impl Session {
    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    pub fn begin_transaction(&mut self, category_id: i64) -> Step {
        self.state = State::TxAmount { category_id };
        Step::Prompt("Enter the amount (prefix with + for income)")
    }

    pub fn begin_limit(&mut self, category_id: i64) -> Step {
        self.state = State::LimitAmount { category_id };
        Step::Prompt("Enter the limit amount")
    }

    pub fn begin_add_category(&mut self) -> Step {
        self.state = State::CategoryName;
        Step::Prompt("Enter the name of the new category")
    }

    pub fn begin_rename(&mut self, category_id: i64) -> Step {
        self.state = State::CategoryRename { category_id };
        Step::Prompt("Enter the new name")
    }

    pub fn begin_confirm(&mut self, category_id: i64, action: CategoryAction) -> Step {
        self.state = State::CategoryConfirm { category_id, action };
        Step::Prompt("Are you sure? (yes/no)")
    }

    pub fn cancel(&mut self) -> Step {
        self.state = State::Idle;
        Step::Cancelled
    }

    pub fn feed(&mut self, input: &str) -> Step {
        let state = std::mem::take(&mut self.state);
        let (next, step) = match state {
            State::Idle => (State::Idle, Step::Ignored),
            State::TxAmount { category_id } => match parse_amount(input) {
                Some((amount, is_expense)) => (
                    State::TxComment { category_id, amount, is_expense },
                    Step::Prompt("Enter a comment ('-' for none)"),
                ),
                None => (
                    State::TxAmount { category_id },
                    Step::Retry("Enter a valid positive number"),
                ),
            },
            State::TxComment { category_id, amount, is_expense } => {
                let text = input.trim();
                let comment = (!text.is_empty() && text != "-").then(|| text.to_string());
                (State::Idle, Step::Record { category_id, amount, is_expense, comment })
            }
            State::LimitAmount { category_id } => match parse_amount(input) {
                Some((amount, true)) => (
                    State::LimitPeriod { category_id, amount },
                    Step::Prompt("Enter the period: <N>d, day, week, month or year"),
                ),
                _ => (
                    State::LimitAmount { category_id },
                    Step::Retry("Enter a valid positive number"),
                ),
            },
            State::LimitPeriod { category_id, amount } => match Period::from_input(input) {
                Ok(period @ Period::Days(_)) => (
                    State::LimitRenew { category_id, amount, period },
                    Step::Prompt("Renew the limit automatically when the period ends? (yes/no)"),
                ),
                _ => (
                    State::LimitPeriod { category_id, amount },
                    Step::Retry("Invalid period, use e.g. 30d or one of day, week, month, year"),
                ),
            },
            State::LimitRenew { category_id, amount, period } => match parse_yes_no(input) {
                Some(auto_renew) => (
                    State::Idle,
                    Step::SetLimit { category_id, amount, period, auto_renew },
                ),
                None => (
                    State::LimitRenew { category_id, amount, period },
                    Step::Retry("Answer yes or no"),
                ),
            },
            State::CategoryName => match input.trim() {
                "" => (State::CategoryName, Step::Retry("Category name must not be empty")),
                name => (State::Idle, Step::AddCategory { name: name.to_string() }),
            },
            State::CategoryRename { category_id } => match input.trim() {
                "" => (
                    State::CategoryRename { category_id },
                    Step::Retry("Category name must not be empty"),
                ),
                name => (
                    State::Idle,
                    Step::RenameCategory { category_id, name: name.to_string() },
                ),
            },
            State::CategoryConfirm { category_id, action } => match parse_yes_no(input) {
                Some(true) => (State::Idle, Step::Category { category_id, action }),
                Some(false) => (State::Idle, Step::Cancelled),
                None => (
                    State::CategoryConfirm { category_id, action },
                    Step::Retry("Answer yes or no"),
                ),
            },
        };
        self.state = next;
        step
    }
}

/// Sessions keyed by user id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<i64, Session>,
}

impl SessionStore {
    pub fn session(&mut self, user_id: i64) -> &mut Session {
        self.sessions.entry(user_id).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_flow() {
        let mut s = Session::default();
        s.begin_transaction(7);
        assert!(matches!(s.feed("abc"), Step::Retry(_)));
        assert!(matches!(s.feed("12,50"), Step::Prompt(_)));
        assert_eq!(
            s.feed("-"),
            Step::Record {
                category_id: 7,
                amount: Decimal::new(1250, 2),
                is_expense: true,
                comment: None
            }
        );
        assert!(s.is_idle());
    }

    #[test]
    fn amounts_that_round_to_zero_are_retried() {
        let mut s = Session::default();
        s.begin_transaction(7);
        assert!(matches!(s.feed("0.001"), Step::Retry(_)));
        assert!(matches!(s.feed("10000000000000"), Step::Retry(_)));
        assert!(matches!(s.feed("0.005"), Step::Prompt(_)));
        match s.feed("-") {
            Step::Record { amount, .. } => assert_eq!(amount, Decimal::new(1, 2)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn income_prefix() {
        let mut s = Session::default();
        s.begin_transaction(1);
        s.feed("+100");
        match s.feed("salary") {
            Step::Record { is_expense, comment, .. } => {
                assert!(!is_expense);
                assert_eq!(comment.as_deref(), Some("salary"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn limit_flow_with_alias() {
        let mut s = Session::default();
        s.begin_limit(3);
        s.feed("1000");
        assert!(matches!(s.feed("fortnight"), Step::Retry(_)));
        s.feed("Month");
        assert_eq!(
            s.feed("да"),
            Step::SetLimit {
                category_id: 3,
                amount: Decimal::new(1000, 0),
                period: Period::Days(30),
                auto_renew: true
            }
        );
    }

    #[test]
    fn declined_confirmation_cancels() {
        let mut s = Session::default();
        s.begin_confirm(4, CategoryAction::Delete);
        assert!(matches!(s.feed("maybe"), Step::Retry(_)));
        assert_eq!(s.feed("no"), Step::Cancelled);
        assert_eq!(s.feed("anything"), Step::Ignored);
    }

    #[test]
    fn store_keeps_sessions_apart() {
        let mut store = SessionStore::default();
        store.session(1).begin_add_category();
        assert!(store.session(2).is_idle());
        assert_eq!(
            store.session(1).feed(" Pets "),
            Step::AddCategory { name: "Pets".into() }
        );
    }
}
