// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Reply delivery.
//!
//! A [`PendingReply`] is created once per admitted request and consumed by the single response
//! it sends. Delivery is best-effort: failures are logged and never retried.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde_json::Value;

use crate::config::WILDCARD_ORIGIN;
use crate::protocol::{ErrorKind, LegacyResponse, ReadyNotice, Response, READY_EVENT};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplyError {
    #[error("reply channel closed")]
    Closed,
    #[error("failed to encode reply: {0}")]
    Encode(String),
    #[error("reply delivery failed: {0}")]
    Delivery(String),
}

/// The sender-side endpoint a response is posted back to.
pub trait ReplyHandle: Send + Sync {
    fn post(&self, message: &str, target_origin: &str) -> Result<(), ReplyError>;
}

/// The one response owed to a request.
pub struct PendingReply {
    handle: Option<Arc<dyn ReplyHandle>>,
    target_origin: String,
    event: String,
}

impl std::fmt::Debug for PendingReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingReply")
            .field("event", &self.event)
            .field("target_origin", &self.target_origin)
            .field("has_handle", &self.handle.is_some())
            .finish()
    }
}

impl PendingReply {
    /// Replies go back to the request's origin, or to any origin when it declared none.
    pub fn new(
        handle: Option<Arc<dyn ReplyHandle>>,
        origin: Option<&str>,
        event: impl Into<String>,
    ) -> Self {
        let target_origin = origin.filter(|origin| !origin.is_empty()).unwrap_or(WILDCARD_ORIGIN);
        Self { handle, target_origin: target_origin.to_owned(), event: event.into() }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn ok(self, data: Option<Value>) -> bool {
        let response = Response::ok(&self.event, data);
        self.send(&response)
    }

    pub fn error(self, kind: ErrorKind, message: impl Into<String>) -> bool {
        let response = Response::error(&self.event, kind, message);
        self.send(&response)
    }

    /// Sends the `{event, success, error}` shape used by the legacy actions.
    pub fn legacy(self, error: Option<String>) -> bool {
        let response =
            LegacyResponse { event: self.event.clone(), success: error.is_none(), error };
        self.send(&response)
    }

    fn send(self, response: &impl Serialize) -> bool {
        let Some(handle) = self.handle else {
            tracing::error!(event = %self.event, "cannot send response: event has no reply source");
            return false;
        };
        let result = serde_json::to_string(response)
            .map_err(|err| ReplyError::Encode(err.to_string()))
            .and_then(|message| handle.post(&message, &self.target_origin));
        match result {
            Ok(()) => {
                tracing::debug!(event = %self.event, target = %self.target_origin, "response sent");
                true
            }
            Err(err) => {
                tracing::error!(event = %self.event, error = %err, "failed to send response");
                false
            }
        }
    }
}

/// Tells the embedding frame that the command channel is listening.
pub fn announce_ready(parent: &dyn ReplyHandle) -> Result<(), ReplyError> {
    let notice = ReadyNotice { event: READY_EVENT.to_owned() };
    let message = serde_json::to_string(&notice).map_err(|err| ReplyError::Encode(err.to_string()))?;
    parent.post(&message, WILDCARD_ORIGIN)
}

/// A reply handle that keeps every posted message in memory.
#[derive(Debug, Default)]
pub struct RecordingReply {
    posted: Mutex<Vec<(String, String)>>,
}

impl RecordingReply {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every `(message, target_origin)` pair posted so far.
    pub fn posted(&self) -> Vec<(String, String)> {
        self.posted.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Posted messages decoded as JSON.
    pub fn messages(&self) -> Vec<Value> {
        self.posted()
            .iter()
            .filter_map(|(message, _)| serde_json::from_str(message).ok())
            .collect()
    }
}

impl ReplyHandle for RecordingReply {
    fn post(&self, message: &str, target_origin: &str) -> Result<(), ReplyError> {
        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((message.to_owned(), target_origin.to_owned()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct BrokenReply;

    impl ReplyHandle for BrokenReply {
        fn post(&self, _: &str, _: &str) -> Result<(), ReplyError> {
            Err(ReplyError::Closed)
        }
    }

    fn pending(recorder: &Arc<RecordingReply>, origin: Option<&str>, event: &str) -> PendingReply {
        let handle: Arc<dyn ReplyHandle> = recorder.clone();
        PendingReply::new(Some(handle), origin, event)
    }

    #[test]
    fn ok_reply_targets_the_request_origin() {
        let recorder = RecordingReply::new();
        assert!(pending(&recorder, Some("https://app.example"), "generateMermaid")
            .ok(Some(json!({"cellCount": 4}))));

        let posted = recorder.posted();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].1, "https://app.example");
        assert_eq!(
            recorder.messages(),
            vec![json!({"event": "generateMermaid", "status": "ok", "data": {"cellCount": 4}})]
        );
    }

    #[test]
    fn error_reply_without_origin_targets_wildcard() {
        let recorder = RecordingReply::new();
        pending(&recorder, None, "modifyStyle").error(ErrorKind::NoTargetCells, "No target cells found");

        assert_eq!(recorder.posted()[0].1, "*");
        assert_eq!(
            recorder.messages(),
            vec![json!({
                "event": "modifyStyle",
                "status": "error",
                "error": "No target cells found",
                "errorKind": "NO_TARGET_CELLS"
            })]
        );
    }

    #[test]
    fn legacy_reply_uses_success_flag() {
        let recorder = RecordingReply::new();
        pending(&recorder, Some("https://a.example"), "importMermaid")
            .legacy(Some("Missing mermaid payload".to_owned()));
        assert_eq!(
            recorder.messages(),
            vec![json!({"event": "importMermaid", "success": false, "error": "Missing mermaid payload"})]
        );
    }

    #[test]
    fn delivery_failures_and_missing_sources_are_swallowed() {
        let broken: Arc<dyn ReplyHandle> = Arc::new(BrokenReply);
        assert!(!PendingReply::new(Some(broken), Some("https://a.example"), "modifyStyle").ok(None));
        assert!(!PendingReply::new(None, Some("https://a.example"), "modifyStyle").ok(None));
    }

    #[test]
    fn ready_notice_is_broadcast() {
        let recorder = RecordingReply::new();
        announce_ready(recorder.as_ref()).expect("announce");
        assert_eq!(recorder.posted(), vec![(r#"{"event":"mermaid-import-ready"}"#.to_owned(), "*".to_owned())]);
    }
}
