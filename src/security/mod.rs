// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Admission checks for inbound messages.
//!
//! Checks run in a fixed order and the first failure wins. Structural checks come before the
//! size and injection scans so malformed input never reaches the expensive ones.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::protocol::{Action, ErrorKind, Rejection};

fn injection_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?is)<script[\s\S]*?>[\s\S]*?</script>",
            r"(?i)<script\b",
            r"(?i)javascript:",
            r"(?i)\bon\s*\w+\s*=",
            r"(?i)<iframe",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

/// Whether `text` contains a script tag, a `javascript:` URL, an inline event handler
/// attribute or an iframe tag.
pub fn contains_xss(text: &str) -> bool {
    injection_patterns().iter().any(|pattern| pattern.is_match(text))
}

#[derive(Debug, Clone)]
pub struct Validator {
    config: Arc<Config>,
}

impl Validator {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.config.allows_any_origin() || self.config.allowed_origins.contains(origin)
    }

    /// Runs every admission check against a decoded payload.
    pub fn validate(&self, origin: Option<&str>, payload: &Value) -> Result<(), Rejection> {
        let result = self.validate_inner(origin, payload);
        if let Err(rejection) = &result {
            tracing::warn!(
                origin = origin.unwrap_or(""),
                kind = %rejection.kind,
                "message rejected: {}",
                rejection.message
            );
        }
        result
    }

    fn validate_inner(&self, origin: Option<&str>, payload: &Value) -> Result<(), Rejection> {
        let origin = match origin {
            Some(origin) if !origin.is_empty() => origin,
            _ => {
                return Err(Rejection::new(ErrorKind::OriginDenied, "Message origin is missing"));
            }
        };
        if !self.is_origin_allowed(origin) {
            return Err(Rejection::new(
                ErrorKind::OriginDenied,
                format!("Origin not allowed: {origin}"),
            ));
        }

        let Some(object) = payload.as_object() else {
            return Err(Rejection::new(
                ErrorKind::InvalidFormat,
                "Invalid message format: data must be an object",
            ));
        };
        let Some(action) = object.get("action").and_then(Value::as_str) else {
            return Err(Rejection::new(
                ErrorKind::InvalidFormat,
                "Invalid message format: missing or invalid action field",
            ));
        };

        let action = Action::from_name(action);
        let mermaid = if action == Some(Action::GenerateMermaid) {
            let Some(mermaid) = object.get("mermaid").filter(|v| !v.is_null()) else {
                return Err(Rejection::new(
                    ErrorKind::InvalidFormat,
                    "Invalid message format: missing mermaid field",
                ));
            };
            let Some(mermaid) = mermaid.as_str() else {
                return Err(Rejection::new(
                    ErrorKind::InvalidFormat,
                    "Invalid message format: mermaid field must be a string",
                ));
            };
            if mermaid.trim().is_empty() {
                return Err(Rejection::new(
                    ErrorKind::EmptyMermaid,
                    "Mermaid text cannot be empty or contain only whitespace",
                ));
            }
            Some(mermaid)
        } else if action.is_some_and(Action::is_legacy) {
            legacy_mermaid_text(object)
        } else {
            None
        };

        let size = serialized_size(payload);
        if size > self.config.max_message_size {
            return Err(Rejection::new(
                ErrorKind::SizeExceeded,
                format!(
                    "Message size {size} exceeds maximum allowed size of {} bytes",
                    self.config.max_message_size
                ),
            ));
        }

        if mermaid.is_some_and(contains_xss) {
            return Err(Rejection::new(
                ErrorKind::XssDetected,
                "Potential XSS attack detected in mermaid text",
            ));
        }

        Ok(())
    }
}

/// The diagram text of a legacy request: the first set field of `mermaid` and `data`, when it
/// is a non-blank string.
pub fn legacy_mermaid_text(payload: &Map<String, Value>) -> Option<&str> {
    let is_set = |value: &&Value| match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(raw) => !raw.is_empty(),
        Value::Number(number) => number.as_f64() != Some(0.0),
        _ => true,
    };
    let raw = ["mermaid", "data"].into_iter().filter_map(|key| payload.get(key)).find(is_set)?;
    raw.as_str().filter(|text| !text.trim().is_empty())
}

/// Length in bytes of the compact JSON encoding of `payload`.
pub fn serialized_size(payload: &Value) -> usize {
    serde_json::to_vec(payload).map(|bytes| bytes.len()).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests;
