// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

/// Percent of a limit at which the front-end starts warning.
pub const WARN_PERCENT: f64 = 80.0;

/// Soft-deleted categories older than this are purged by the sweep.
pub const CATEGORY_RETENTION_DAYS: i64 = 30;

/// Largest amount accepted for a transaction or a limit.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

pub const RECENT_TRANSACTIONS: usize = 5;

pub const TRAILING_MONTHS: u32 = 6;

/// Approximate month length used to place the trailing statistics window.
pub const DAYS_PER_MONTH: i64 = 30;

/// Reporting currency assigned to new users.
pub const DEFAULT_CURRENCY: &str = "RUB";

pub struct DefaultCurrency {
    pub code: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
    pub rate_to_base: &'static str,
}

/// Static rates, expressed in RUB per unit.
pub const DEFAULT_CURRENCIES: &[DefaultCurrency] = &[
    DefaultCurrency { code: "RUB", name: "Russian Ruble", symbol: "₽", rate_to_base: "1" },
    DefaultCurrency { code: "USD", name: "US Dollar", symbol: "$", rate_to_base: "90" },
    DefaultCurrency { code: "EUR", name: "Euro", symbol: "€", rate_to_base: "100" },
    DefaultCurrency { code: "KZT", name: "Kazakhstani Tenge", symbol: "₸", rate_to_base: "0.18" },
    DefaultCurrency { code: "CNY", name: "Chinese Yuan", symbol: "¥", rate_to_base: "12.5" },
];

pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Food",
    "Transport",
    "Housing",
    "Health",
    "Entertainment",
    "Salary",
];
