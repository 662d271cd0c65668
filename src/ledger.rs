// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Currency rate snapshot and conversion between currencies.
//!
//! Every currency stores `rate_to_base`: the value of one unit expressed in a
//! common base unit. Converting from A to B multiplies by `rate(A) / rate(B)`,
//! so the base unit cancels out. A rate that is missing or not positive makes
//! the currency unconvertible.

use crate::errors::MoneyError;
use crate::utils::{decimal_col, round_money};
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct CurrencyLedger {
    rates: HashMap<i64, Decimal>,
}

/// Result of a batch conversion. `total` is kept at full precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Converted {
    pub total: Decimal,
    pub converted: usize,
    pub skipped: usize,
}

impl Converted {
    pub fn rounded(&self) -> Decimal {
        round_money(self.total)
    }
}

impl CurrencyLedger {
    /// Reads the current rate of every currency. Not cached between calls.
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut stmt = conn.prepare("SELECT id, rate_to_base FROM currencies")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, decimal_col(r, 1)?)))?;
        let mut rates = HashMap::new();
        for row in rows {
            let (id, rate) = row?;
            rates.insert(id, rate);
        }
        Ok(Self { rates })
    }

    pub fn from_rates<I: IntoIterator<Item = (i64, Decimal)>>(rates: I) -> Self {
        Self {
            rates: rates.into_iter().collect(),
        }
    }

    pub fn rate_of(&self, currency_id: i64) -> Option<Decimal> {
        self.rates
            .get(&currency_id)
            .copied()
            .filter(|r| *r > Decimal::ZERO)
    }

    pub fn is_convertible(&self, currency_id: i64) -> bool {
        self.rate_of(currency_id).is_some()
    }

    /// Single-amount conversion. Unrounded; fails when either side has no rate.
    pub fn convert(&self, amount: Decimal, from: i64, to: i64) -> Result<Decimal, MoneyError> {
        let from_rate = self.rate_of(from).ok_or(MoneyError::Unconvertible(from))?;
        let to_rate = self.rate_of(to).ok_or(MoneyError::Unconvertible(to))?;
        if from == to {
            return Ok(amount);
        }
        scale(amount, from_rate, to_rate)
    }

    /// Sums `(amount, currency_id)` pairs into `to`, skipping entries whose
    /// currency has no rate. The target itself must be convertible.
    pub fn convert_sum<I>(&self, items: I, to: i64) -> Result<Converted, MoneyError>
    where
        I: IntoIterator<Item = (Decimal, i64)>,
    {
        let to_rate = self.rate_of(to).ok_or(MoneyError::Unconvertible(to))?;
        let mut out = Converted::default();
        for (amount, from) in items {
            let Some(from_rate) = self.rate_of(from) else {
                tracing::warn!(
                    currency_id = from,
                    %amount,
                    "skipping amount without a valid rate"
                );
                out.skipped += 1;
                continue;
            };
            match scale(amount, from_rate, to_rate).and_then(|v| add(out.total, v)) {
                Ok(total) => {
                    out.total = total;
                    out.converted += 1;
                }
                Err(_) => {
                    tracing::warn!(
                        currency_id = from,
                        %amount,
                        "skipping amount that overflows the total"
                    );
                    out.skipped += 1;
                }
            }
        }
        Ok(out)
    }
}

/// `amount * from_rate / to_rate` without panicking on overflow.
fn scale(amount: Decimal, from_rate: Decimal, to_rate: Decimal) -> Result<Decimal, MoneyError> {
    amount
        .checked_mul(from_rate)
        .and_then(|v| v.checked_div(to_rate))
        .ok_or(MoneyError::Overflow)
}

/// Overflow-checked sum used by every running total.
pub fn add(total: Decimal, amount: Decimal) -> Result<Decimal, MoneyError> {
    total.checked_add(amount).ok_or(MoneyError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    fn ledger() -> CurrencyLedger {
        CurrencyLedger::from_rates([(1, dec("1")), (2, dec("90")), (3, dec("0"))])
    }

    #[test]
    fn converts_through_base_unit() {
        let l = ledger();
        assert_eq!(l.convert(dec("15"), 2, 1).unwrap(), dec("1350"));
        assert_eq!(l.convert(dec("180"), 1, 2).unwrap(), dec("2"));
    }

    #[test]
    fn zero_rate_is_unconvertible() {
        let l = ledger();
        assert_eq!(l.rate_of(3), None);
        assert_eq!(l.rate_of(42), None);
        assert_eq!(
            l.convert(dec("1"), 3, 1).unwrap_err(),
            MoneyError::Unconvertible(3)
        );
    }

    #[test]
    fn batch_skips_bad_rates() {
        let l = ledger();
        let c = l
            .convert_sum([(dec("10"), 1), (dec("5"), 3), (dec("1"), 2)], 1)
            .unwrap();
        assert_eq!(c.total, dec("100"));
        assert_eq!(c.converted, 2);
        assert_eq!(c.skipped, 1);
    }

    #[test]
    fn round_trip_restores_amount_after_rounding() {
        let l = CurrencyLedger::from_rates([(1, dec("7")), (2, dec("3"))]);
        for x in ["0.01", "10", "123.45", "99999.99"] {
            let there = l.convert(dec(x), 1, 2).unwrap();
            let back = l.convert(there, 2, 1).unwrap();
            assert_eq!(round_money(back), dec(x));
        }
    }

    #[test]
    fn overflow_is_an_error_not_a_panic() {
        let l = CurrencyLedger::from_rates([(1, dec("1")), (2, dec("1000000"))]);
        let huge = Decimal::MAX - dec("10");
        assert_eq!(l.convert(huge, 2, 1).unwrap_err(), MoneyError::Overflow);

        let c = l
            .convert_sum([(huge, 1), (huge, 1), (dec("5"), 1), (huge, 2)], 1)
            .unwrap();
        assert_eq!(c.total, huge + dec("5"));
        assert_eq!(c.converted, 2);
        assert_eq!(c.skipped, 2);
    }
}
