// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;
use std::fmt;

/// A cell style in the editor's `key=value;key=value;` notation.
///
/// Bare tokens without `=` (e.g. a leading `ellipse;`) are kept as keys with an empty value so
/// that a parse/format cycle does not lose them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Style {
    entries: BTreeMap<String, String>,
}

impl Style {
    pub fn parse(raw: &str) -> Self {
        let mut entries = BTreeMap::new();
        for token in raw.split(';') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match token.split_once('=') {
                Some((key, value)) => {
                    entries.insert(key.trim().to_owned(), value.trim().to_owned());
                }
                None => {
                    entries.insert(token.to_owned(), String::new());
                }
            }
        }
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            if value.is_empty() {
                write!(f, "{key};")?;
            } else {
                write!(f, "{key}={value};")?;
            }
        }
        Ok(())
    }
}

/// Whether `key` can be stored in a style string without corrupting it.
pub fn is_valid_style_key(key: &str) -> bool {
    !key.trim().is_empty() && !key.contains([';', '='])
}
