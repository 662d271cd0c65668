// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Failures the caller is expected to branch on. Everything else travels as
/// `anyhow::Error` with context attached.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("no reporting currency configured for user {0}")]
    NoReportingCurrency(i64),
    #[error("reporting currency {0} has no valid exchange rate")]
    InvalidReportingRate(i64),
    #[error("currency {0} has no valid exchange rate")]
    Unconvertible(i64),
    #[error("amount is too large to convert")]
    Overflow,
    #[error("user with tg id {0} is not registered")]
    UnknownUser(i64),
    #[error("currency '{0}' not found")]
    UnknownCurrency(String),
    #[error("invalid period '{0}', expected <N>d, custom, day, week, month or year")]
    InvalidPeriod(String),
}
