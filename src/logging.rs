// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "FINTRACK_LOG";

static INIT_TRACING: Once = Once::new();

/// Installs the global subscriber once. Output goes to stderr so that
/// `--json` output on stdout stays machine readable.
pub fn init() {
    INIT_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
        tracing::debug!("tracing initialized");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_is_repeatable() {
        super::init();
        super::init();
    }
}
