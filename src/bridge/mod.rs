// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Deadline-bounded access to the diagram parser.
//!
//! The parser reports through a callback pair. [`parse_with_deadline`] races those callbacks
//! against a timer; whichever settles the shared [`Completion`] first decides the outcome and
//! every later settlement is discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::model::NativeDocument;
use crate::protocol::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseMode {
    /// Produce native, independently editable shapes.
    Editable,
    /// Keep the diagram tied to its source text so it can be converted back.
    PreserveSource,
}

/// A failure reported by the parser, either through its error callback or synchronously.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParserFault {
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub position: Option<u32>,
}

impl ParserFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Self::default() }
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

/// The success/error callback pair handed to the parser for one request.
///
/// Settling consumes the pair. The return value tells whether this settlement decided the
/// request (`false` once the deadline or another callback already did).
pub struct ParseCallbacks {
    completion: Arc<Completion>,
}

impl ParseCallbacks {
    pub fn succeed(self, document: NativeDocument) -> bool {
        let accepted = self.completion.settle(Ok(document));
        if !accepted {
            tracing::debug!("discarding parser success that arrived after the request settled");
        }
        accepted
    }

    pub fn fail(self, fault: ParserFault) -> bool {
        let accepted = self.completion.settle(Err(fault));
        if !accepted {
            tracing::debug!("discarding parser error that arrived after the request settled");
        }
        accepted
    }
}

impl std::fmt::Debug for ParseCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseCallbacks")
            .field("settled", &self.completion.is_settled())
            .finish()
    }
}

/// The opaque diagram-description parser.
pub trait DiagramParser: Send + Sync {
    /// Reports missing host capabilities. `Err` carries a human-readable reason.
    fn availability(&self) -> Result<(), String> {
        Ok(())
    }

    /// Starts parsing `text`. The outcome is delivered through `callbacks`, possibly later
    /// and from another thread. Returning `Err` is a synchronous failure.
    fn parse(
        &self,
        text: String,
        mode: ParseMode,
        callbacks: ParseCallbacks,
    ) -> Result<(), ParserFault>;
}

type Outcome = Result<NativeDocument, ParserFault>;

struct Completion {
    settled: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl Completion {
    fn new(sender: oneshot::Sender<Outcome>) -> Self {
        Self { settled: AtomicBool::new(false), sender: Mutex::new(Some(sender)) }
    }

    fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    fn claim(&self) -> bool {
        self.settled.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok()
    }

    fn settle(&self, outcome: Outcome) -> bool {
        if !self.claim() {
            return false;
        }
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(sender) = sender {
            let _ = sender.send(outcome);
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ErrorPosition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("{message}")]
    Parse { message: String, position: Option<ErrorPosition> },
    #[error("Mermaid parsing timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl ParseFailure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. } => ErrorKind::ParseError,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// The message reported to the requester, with the failing line appended when known.
    pub fn response_message(&self) -> String {
        match self {
            Self::Parse { message, position: Some(position) } => match position.line {
                Some(line) => format!("{message} (at line {line})"),
                None => format!("{message} (at line unknown)"),
            },
            other => other.to_string(),
        }
    }
}

fn position_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)line\s+(\d+)|position\s+(\d+)|at\s+(\d+)").ok())
        .as_ref()
}

/// Pulls a `line N`, `position N` or `at N` hint out of a parser message.
pub fn extract_position(message: &str) -> Option<ErrorPosition> {
    let captures = position_pattern()?.captures(message)?;
    let number = |index: usize| captures.get(index).and_then(|m| m.as_str().parse::<u32>().ok());
    Some(ErrorPosition {
        line: number(1),
        column: None,
        position: number(2).or_else(|| number(3)),
    })
}

fn classify(fault: ParserFault) -> ParseFailure {
    let message = if fault.message.trim().is_empty() {
        "Unknown parsing error".to_owned()
    } else {
        fault.message
    };
    let structured = (fault.line.is_some() || fault.column.is_some() || fault.position.is_some())
        .then_some(ErrorPosition { line: fault.line, column: fault.column, position: fault.position });
    let position = structured.or_else(|| extract_position(&message));
    ParseFailure::Parse { message, position }
}

/// Runs `parser` on `text` and waits at most `timeout` for it to report back.
///
/// Exactly one outcome is returned. A parser that keeps running after the deadline is not
/// stopped; its late callback is discarded.
pub async fn parse_with_deadline(
    parser: &dyn DiagramParser,
    text: String,
    timeout: Duration,
    editable: bool,
) -> Result<NativeDocument, ParseFailure> {
    let mode = if editable { ParseMode::Editable } else { ParseMode::PreserveSource };
    let (sender, mut receiver) = oneshot::channel();
    let completion = Arc::new(Completion::new(sender));

    let callbacks = ParseCallbacks { completion: completion.clone() };
    if let Err(fault) = parser.parse(text, mode, callbacks) {
        if !completion.settle(Err(fault)) {
            tracing::debug!("discarding synchronous parser error after the request settled");
        }
    }
    // From here on only the callbacks keep the sender alive.
    let completion = Arc::downgrade(&completion);

    let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    match tokio::time::timeout(timeout, &mut receiver).await {
        Ok(received) => received_outcome(received),
        Err(_elapsed) => settle_after_deadline(&completion, receiver, timeout_ms).await,
    }
}

fn received_outcome(
    received: Result<Outcome, oneshot::error::RecvError>,
) -> Result<NativeDocument, ParseFailure> {
    match received {
        Ok(outcome) => outcome.map_err(classify),
        Err(_) => {
            tracing::warn!("parser dropped its callbacks without reporting");
            Err(ParseFailure::Parse {
                message: "Parser dropped the request without reporting".to_owned(),
                position: None,
            })
        }
    }
}

/// Claims the request for the timer. When a callback already claimed it, its outcome is
/// on the way and is awaited instead.
async fn settle_after_deadline(
    completion: &Weak<Completion>,
    receiver: oneshot::Receiver<Outcome>,
    timeout_ms: u64,
) -> Result<NativeDocument, ParseFailure> {
    let claimed = completion.upgrade().is_some_and(|completion| completion.claim());
    if claimed {
        tracing::debug!(timeout_ms, "parser deadline elapsed");
        return Err(ParseFailure::Timeout { timeout_ms });
    }
    received_outcome(receiver.await)
}
