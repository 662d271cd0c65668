// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Evaluation windows of category limits and their rollover.

use crate::errors::MoneyError;
use crate::models::Limit;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static DAYS_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)d$").expect("valid regex"));
static DAYS_INPUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,3}d$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// Rolling window of N days.
    Days(u32),
    /// Explicit end date, never rolls over.
    Custom,
    Unrecognized,
}

impl Period {
    /// Parses a stored period token. Case-insensitive; never fails.
    pub fn parse(s: &str) -> Self {
        let s = s.trim().to_lowercase();
        if s == "custom" {
            return Period::Custom;
        }
        match DAYS_TOKEN.captures(&s).and_then(|c| c[1].parse::<u32>().ok()) {
            Some(n) if n > 0 => Period::Days(n),
            _ => Period::Unrecognized,
        }
    }

    /// Validates user input for a new limit. Accepts `<1-3 digits>d` and the
    /// aliases day, week, month and year.
    pub fn from_input(s: &str) -> Result<Self, MoneyError> {
        let norm = s.trim().to_lowercase();
        let period = match norm.as_str() {
            "day" => Period::Days(1),
            "week" => Period::Days(7),
            "month" => Period::Days(30),
            "year" => Period::Days(365),
            "custom" => Period::Custom,
            other if DAYS_INPUT.is_match(other) => Period::parse(other),
            _ => Period::Unrecognized,
        };
        match period {
            Period::Unrecognized => Err(MoneyError::InvalidPeriod(s.trim().to_string())),
            p => Ok(p),
        }
    }

    pub fn length(&self) -> Option<Duration> {
        match self {
            Period::Days(n) => Some(Duration::days(i64::from(*n))),
            _ => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Days(n) => write!(f, "{}d", n),
            Period::Custom => write!(f, "custom"),
            Period::Unrecognized => write!(f, "?"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    NoWindow,
    Active,
    ExpiredPendingRollover,
}

/// Closed interval `[start, end]` over which a limit is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl LimitWindow {
    /// The window a limit currently covers, or `None` when the period is not
    /// recognized or a custom limit lacks its end date.
    pub fn of(limit: &Limit) -> Option<Self> {
        match Period::parse(&limit.period) {
            Period::Days(n) => Some(Self {
                start: limit.start_date,
                end: limit.start_date + Duration::days(i64::from(n)),
            }),
            Period::Custom => limit.end_date.map(|end| Self {
                start: limit.start_date,
                end,
            }),
            Period::Unrecognized => None,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// End date assigned when a rolling limit is created without one.
pub fn initial_end_date(
    period: Period,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match (period, end) {
        (_, Some(end)) => Some(end),
        (Period::Days(n), None) => Some(start + Duration::days(i64::from(n))),
        _ => None,
    }
}

pub fn state(limit: &Limit, now: DateTime<Utc>) -> WindowState {
    let end = match Period::parse(&limit.period) {
        Period::Unrecognized => return WindowState::NoWindow,
        p => match initial_end_date(p, limit.start_date, limit.end_date) {
            Some(end) => end,
            None => return WindowState::NoWindow,
        },
    };
    if end < now && limit.is_updating && matches!(Period::parse(&limit.period), Period::Days(_)) {
        WindowState::ExpiredPendingRollover
    } else if now >= limit.start_date && now <= end {
        WindowState::Active
    } else {
        WindowState::NoWindow
    }
}

/// Advances an auto-updating rolling limit until its window contains `now`.
/// Returns whether the limit changed. Custom, unparseable and non-updating
/// limits are left alone.
pub fn roll_forward(limit: &mut Limit, now: DateTime<Utc>) -> bool {
    if !limit.is_updating {
        return false;
    }
    let step = match Period::parse(&limit.period).length() {
        Some(step) => step,
        None => return false,
    };
    let mut changed = false;
    let mut end = match limit.end_date {
        Some(end) => end,
        None => {
            changed = true;
            limit.start_date + step
        }
    };
    let mut start = limit.start_date;
    while end < now {
        start += step;
        end += step;
        changed = true;
    }
    limit.start_date = start;
    limit.end_date = Some(end);
    changed
}
