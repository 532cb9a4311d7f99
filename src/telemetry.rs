// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Process-wide log output.
//!
//! Logs go to stderr so stdout stays reserved for protocol messages. `FRAMEBRIDGE_LOG` takes
//! `EnvFilter` directives; without it the level follows the resolved debug mode.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "FRAMEBRIDGE_LOG";

pub fn default_level(debug_mode: bool) -> LevelFilter {
    if debug_mode {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    }
}

/// Installs the global subscriber. Returns `false` if one was already installed.
pub fn init(debug_mode: bool) -> bool {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level(debug_mode).into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_mode_lowers_the_default_level() {
        assert_eq!(default_level(true), LevelFilter::DEBUG);
        assert_eq!(default_level(false), LevelFilter::INFO);
    }

    #[test]
    fn second_init_is_rejected() {
        init(false);
        assert!(!init(true));
    }
}
