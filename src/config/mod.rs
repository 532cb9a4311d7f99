// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Effective configuration.
//!
//! Three layers, lowest precedence first: built-in defaults, the process-wide override object,
//! request-line (query string) parameters. A layer only overrides keys it sets with a valid
//! value; anything malformed is logged and skipped, so resolution never fails.

use std::collections::BTreeSet;
use std::time::Duration;

use serde_json::Value;

pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;
pub const DEFAULT_PARSE_TIMEOUT_MS: u64 = 10_000;
pub const WILDCARD_ORIGIN: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub max_message_size: usize,
    pub parse_timeout_ms: u64,
    pub debug_mode: bool,
    pub allowed_origins: BTreeSet<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            parse_timeout_ms: DEFAULT_PARSE_TIMEOUT_MS,
            debug_mode: false,
            allowed_origins: BTreeSet::from([WILDCARD_ORIGIN.to_owned()]),
        }
    }
}

impl Config {
    pub fn parse_timeout(&self) -> Duration {
        Duration::from_millis(self.parse_timeout_ms)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.contains(WILDCARD_ORIGIN)
    }
}

/// One configuration source. `None` means "not set by this layer".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub max_message_size: Option<usize>,
    pub parse_timeout_ms: Option<u64>,
    pub debug_mode: Option<bool>,
    pub allowed_origins: Option<BTreeSet<String>>,
}

impl ConfigLayer {
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(size) = self.max_message_size {
            config.max_message_size = size;
        }
        if let Some(timeout) = self.parse_timeout_ms {
            config.parse_timeout_ms = timeout;
        }
        if let Some(debug) = self.debug_mode {
            config.debug_mode = debug;
        }
        if let Some(origins) = &self.allowed_origins {
            config.allowed_origins = origins.clone();
        }
    }

    /// Reads the process-wide override object (`maxMessageSize`, `parseTimeout`, `debugMode`,
    /// `allowedOrigins`).
    pub fn from_global(value: &Value) -> Self {
        let mut layer = Self::default();
        let Some(object) = value.as_object() else {
            tracing::warn!("global config override is not an object, ignoring");
            return layer;
        };

        if let Some(raw) = object.get("maxMessageSize") {
            layer.max_message_size = positive_u64(raw).and_then(|n| usize::try_from(n).ok());
            if layer.max_message_size.is_none() {
                tracing::warn!(value = %raw, "invalid global maxMessageSize, ignoring");
            }
        }
        if let Some(raw) = object.get("parseTimeout") {
            layer.parse_timeout_ms = positive_u64(raw);
            if layer.parse_timeout_ms.is_none() {
                tracing::warn!(value = %raw, "invalid global parseTimeout, ignoring");
            }
        }
        if let Some(raw) = object.get("debugMode") {
            layer.debug_mode = raw.as_bool();
            if layer.debug_mode.is_none() {
                tracing::warn!(value = %raw, "invalid global debugMode, ignoring");
            }
        }
        if let Some(raw) = object.get("allowedOrigins") {
            let origins = raw
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .filter(|origin| !origin.is_empty())
                        .map(ToOwned::to_owned)
                        .collect::<BTreeSet<_>>()
                })
                .filter(|origins| !origins.is_empty());
            if origins.is_none() {
                tracing::warn!(value = %raw, "invalid global allowedOrigins, ignoring");
            }
            layer.allowed_origins = origins;
        }

        layer
    }

    /// Reads request-line parameters, e.g. `?parseTimeout=5000&allowedOrigins=a,b`.
    pub fn from_query(query: &str) -> Self {
        let mut layer = Self::default();
        let query = query.strip_prefix('?').unwrap_or(query);

        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
            let value = percent_decode(raw);
            match percent_decode(key).as_str() {
                "maxMessageSize" => match value.trim().parse::<usize>() {
                    Ok(size) if size > 0 => layer.max_message_size = Some(size),
                    _ => tracing::warn!(%value, "invalid maxMessageSize parameter, ignoring"),
                },
                "parseTimeout" => match value.trim().parse::<u64>() {
                    Ok(timeout) if timeout > 0 => layer.parse_timeout_ms = Some(timeout),
                    _ => tracing::warn!(%value, "invalid parseTimeout parameter, ignoring"),
                },
                "debugMode" => match value.trim() {
                    "true" | "1" => layer.debug_mode = Some(true),
                    "false" | "0" => layer.debug_mode = Some(false),
                    _ => tracing::warn!(%value, "invalid debugMode parameter, ignoring"),
                },
                "allowedOrigins" => {
                    let origins = value
                        .split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(ToOwned::to_owned)
                        .collect::<BTreeSet<_>>();
                    if origins.is_empty() {
                        tracing::warn!(%value, "empty allowedOrigins parameter, ignoring");
                    } else {
                        layer.allowed_origins = Some(origins);
                    }
                }
                _ => {}
            }
        }

        layer
    }
}

/// Builds the effective configuration: defaults < global override < query parameters.
pub fn resolve(global: Option<&Value>, query: Option<&str>) -> Config {
    let mut config = Config::default();
    if let Some(global) = global {
        ConfigLayer::from_global(global).apply_to(&mut config);
    }
    if let Some(query) = query {
        ConfigLayer::from_query(query).apply_to(&mut config);
    }
    config
}

fn positive_u64(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return (n > 0).then_some(n);
    }
    // Whole floats such as `5000.0` are accepted, fractional ones are not.
    let n = value.as_f64()?;
    (n.is_finite() && n >= 1.0 && n.fract() == 0.0 && n <= u64::MAX as f64).then_some(n as u64)
}

fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|hex| u8::from_str_radix(hex, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                        continue;
                    }
                    None => out.push(b'%'),
                }
            }
            byte => out.push(byte),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_allow_every_origin() {
        let config = resolve(None, None);
        assert_eq!(config, Config::default());
        assert!(config.allows_any_origin());
        assert_eq!(config.parse_timeout(), Duration::from_millis(10_000));
    }

    #[test]
    fn query_overrides_global_which_overrides_defaults() {
        let global = json!({
            "maxMessageSize": 2048,
            "parseTimeout": 3000,
            "debugMode": true,
            "allowedOrigins": ["https://global.example"]
        });
        let config = resolve(Some(&global), Some("?parseTimeout=50&allowedOrigins=https://a.example"));

        assert_eq!(config.max_message_size, 2048);
        assert_eq!(config.parse_timeout_ms, 50);
        assert!(config.debug_mode);
        assert_eq!(config.allowed_origins, BTreeSet::from(["https://a.example".to_owned()]));
    }

    #[test]
    fn malformed_values_fall_back_to_lower_layer() {
        let global = json!({
            "maxMessageSize": -1,
            "parseTimeout": "soon",
            "debugMode": "yes",
            "allowedOrigins": ["", 7]
        });
        let config = resolve(Some(&global), Some("maxMessageSize=0&parseTimeout=abc&debugMode=maybe&allowedOrigins=%20,"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn query_origins_are_split_trimmed_and_decoded() {
        let layer = ConfigLayer::from_query(
            "allowedOrigins=https%3A%2F%2Fa.example%2C%20https://b.example,,&debugMode=1",
        );
        assert_eq!(
            layer.allowed_origins,
            Some(BTreeSet::from(["https://a.example".to_owned(), "https://b.example".to_owned()]))
        );
        assert_eq!(layer.debug_mode, Some(true));
    }

    #[test]
    fn non_object_global_is_ignored() {
        assert_eq!(ConfigLayer::from_global(&json!([1, 2])), ConfigLayer::default());
    }
}
