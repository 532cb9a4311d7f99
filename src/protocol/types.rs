// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ErrorKind;

pub const READY_EVENT: &str = "mermaid-import-ready";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub event: String,
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "errorKind", skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    pub fn ok(event: &str, data: Option<Value>) -> Self {
        Self { event: event.to_owned(), status: ResponseStatus::Ok, error: None, error_kind: None, data }
    }

    pub fn error(event: &str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            event: event.to_owned(),
            status: ResponseStatus::Error,
            error: Some(message.into()),
            error_kind: Some(kind),
            data: None,
        }
    }
}

/// Response shape used by `importMermaid` and `insertMermaid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyResponse {
    pub event: String,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyNotice {
    pub event: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Position {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOptions {
    pub position: Option<Position>,
    pub scale: Option<f64>,
    pub select: Option<bool>,
    pub center: Option<bool>,
    pub editable: Option<bool>,
}

/// A `generateMermaid` request after the validator admitted it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenerateRequest {
    pub mermaid: String,
    #[serde(default)]
    pub options: Option<GenerateOptions>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateData {
    pub cell_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyError {
    pub property: String,
    pub error: String,
    #[serde(rename = "errorKind")]
    pub error_kind: ErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleData {
    pub modified_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<PropertyError>,
}
