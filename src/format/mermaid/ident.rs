// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NodeIdError {
    #[error("must not be empty")]
    Empty,
    #[error("must not contain whitespace")]
    ContainsWhitespace,
    #[error("contains invalid character: '{ch}'")]
    InvalidChar { ch: char },
}

/// Node ids are ASCII letters, digits and `_`.
pub(super) fn validate_node_id(ident: &str) -> Result<(), NodeIdError> {
    if ident.is_empty() {
        return Err(NodeIdError::Empty);
    }
    if ident.chars().any(char::is_whitespace) {
        return Err(NodeIdError::ContainsWhitespace);
    }
    if let Some(ch) = ident.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
        return Err(NodeIdError::InvalidChar { ch });
    }
    Ok(())
}
