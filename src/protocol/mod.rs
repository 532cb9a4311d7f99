// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Wire-level protocol types shared by the validator, the handlers and the emitter.
//!
//! Every failure that crosses the frame boundary is reported as an [`ErrorKind`] tag, never as
//! a Rust error type.

mod types;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use types::{
    GenerateData, GenerateOptions, GenerateRequest, LegacyResponse, Position, PropertyError,
    ReadyNotice, Response, ResponseStatus, StyleData, READY_EVENT,
};

/// Machine-readable failure tag carried in `errorKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidFormat,
    EmptyMermaid,
    ParseError,
    Timeout,
    InsertFailed,
    OriginDenied,
    SizeExceeded,
    XssDetected,
    UnsupportedBrowser,
    InvalidTarget,
    NoTargetCells,
    InvalidProperty,
    InvalidValue,
    InvalidOperation,
    UnsupportedOperation,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::EmptyMermaid => "EMPTY_MERMAID",
            Self::ParseError => "PARSE_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::InsertFailed => "INSERT_FAILED",
            Self::OriginDenied => "ORIGIN_DENIED",
            Self::SizeExceeded => "SIZE_EXCEEDED",
            Self::XssDetected => "XSS_DETECTED",
            Self::UnsupportedBrowser => "UNSUPPORTED_BROWSER",
            Self::InvalidTarget => "INVALID_TARGET",
            Self::NoTargetCells => "NO_TARGET_CELLS",
            Self::InvalidProperty => "INVALID_PROPERTY",
            Self::InvalidValue => "INVALID_VALUE",
            Self::InvalidOperation => "INVALID_OPERATION",
            Self::UnsupportedOperation => "UNSUPPORTED_OPERATION",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A predictable failure, tagged for the response envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Rejection {
    pub kind: ErrorKind,
    pub message: String,
}

impl Rejection {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

/// The closed set of actions the router understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    GenerateMermaid,
    ModifyStyle,
    ImportMermaid,
    InsertMermaid,
}

impl Action {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "generateMermaid" => Some(Self::GenerateMermaid),
            "modifyStyle" => Some(Self::ModifyStyle),
            "importMermaid" => Some(Self::ImportMermaid),
            "insertMermaid" => Some(Self::InsertMermaid),
            _ => None,
        }
    }

    /// The action name, which is also the `event` name of its response.
    pub fn name(self) -> &'static str {
        match self {
            Self::GenerateMermaid => "generateMermaid",
            Self::ModifyStyle => "modifyStyle",
            Self::ImportMermaid => "importMermaid",
            Self::InsertMermaid => "insertMermaid",
        }
    }

    pub fn is_legacy(self) -> bool {
        matches!(self, Self::ImportMermaid | Self::InsertMermaid)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded inbound message whose action is known.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    action: Action,
    origin: Option<String>,
    payload: Map<String, Value>,
}

impl Envelope {
    pub fn new(action: Action, origin: Option<String>, payload: Map<String, Value>) -> Self {
        Self { action, origin, payload }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }
}
