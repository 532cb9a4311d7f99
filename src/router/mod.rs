// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Entry point for inbound frame messages.
//!
//! One call to [`Router::handle`] runs one event through decoding, action lookup, validation
//! and its action handler. Events that cannot be decoded or name no known action are dropped
//! without a reply; every other event gets exactly one reply. The document model lock is only
//! taken after parsing and is released before the reply is sent.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::bridge::{parse_with_deadline, DiagramParser};
use crate::canvas::{self, InsertOptions};
use crate::config::Config;
use crate::model::DocumentModel;
use crate::protocol::{
    Action, Envelope, ErrorKind, GenerateData, GenerateRequest, Rejection, StyleData,
};
use crate::respond::{PendingReply, ReplyHandle};
use crate::security::{legacy_mermaid_text, Validator};
use crate::style;

/// One platform message as delivered to the frame.
#[derive(Clone)]
pub struct InboundEvent {
    pub origin: Option<String>,
    /// The message payload, either structured or pre-encoded as a JSON string.
    pub data: Value,
    pub source: Option<Arc<dyn ReplyHandle>>,
}

impl InboundEvent {
    pub fn new(origin: impl Into<String>, data: Value, source: Arc<dyn ReplyHandle>) -> Self {
        Self { origin: Some(origin.into()), data, source: Some(source) }
    }
}

impl std::fmt::Debug for InboundEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundEvent")
            .field("origin", &self.origin)
            .field("data", &self.data)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// A string payload that is not valid JSON.
    Undecodable,
    /// The payload is not an object or has no string `action`.
    MissingAction,
    UnknownAction,
}

/// How an event left the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Dropped(DropReason),
    Responded(Action),
}

pub struct Router<M> {
    config: Arc<Config>,
    validator: Validator,
    parser: Arc<dyn DiagramParser>,
    model: Arc<Mutex<M>>,
}

impl<M> Clone for Router<M> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            validator: self.validator.clone(),
            parser: self.parser.clone(),
            model: self.model.clone(),
        }
    }
}

impl<M: DocumentModel> Router<M> {
    pub fn new(config: Arc<Config>, parser: Arc<dyn DiagramParser>, model: Arc<Mutex<M>>) -> Self {
        let validator = Validator::new(config.clone());
        Self { config, validator, parser, model }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn model(&self) -> &Arc<Mutex<M>> {
        &self.model
    }

    pub async fn handle(&self, event: InboundEvent) -> Dispatch {
        let started = Instant::now();
        let InboundEvent { origin, data, source } = event;

        let payload = match decode(data) {
            Ok(payload) => payload,
            Err(reason) => {
                tracing::debug!(?reason, "dropping inbound message");
                return Dispatch::Dropped(reason);
            }
        };
        let Some(action) = payload.get("action").and_then(Value::as_str) else {
            tracing::debug!("dropping inbound message without action");
            return Dispatch::Dropped(DropReason::MissingAction);
        };
        let Some(action) = Action::from_name(action) else {
            tracing::debug!(action, "dropping message with unknown action");
            return Dispatch::Dropped(DropReason::UnknownAction);
        };

        let reply = PendingReply::new(source, origin.as_deref(), action.name());
        tracing::debug!(%action, origin = origin.as_deref().unwrap_or(""), "handling message");

        let validation_started = Instant::now();
        let validation = self.validator.validate(origin.as_deref(), &payload);
        self.timing("validation", validation_started);
        if let Err(rejection) = validation {
            self.reject(action, reply, rejection);
            return Dispatch::Responded(action);
        }

        let Value::Object(payload) = payload else {
            // The validator only admits objects.
            self.reject(action, reply, Rejection::new(ErrorKind::InvalidFormat, "Invalid message format"));
            return Dispatch::Responded(action);
        };
        let envelope = Envelope::new(action, origin, payload);

        match action {
            Action::GenerateMermaid => self.generate(&envelope, reply).await,
            Action::ModifyStyle => self.modify_style(&envelope, reply).await,
            Action::ImportMermaid | Action::InsertMermaid => self.legacy(&envelope, reply).await,
        }
        self.timing(action.name(), started);
        Dispatch::Responded(action)
    }

    fn reject(&self, action: Action, reply: PendingReply, rejection: Rejection) {
        if action.is_legacy() {
            reply.legacy(Some(rejection.message));
        } else {
            reply.error(rejection.kind, rejection.message);
        }
    }

    fn timing(&self, stage: &str, started: Instant) {
        if self.config.debug_mode {
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            tracing::debug!(stage, elapsed_ms, "performance");
        }
    }

    async fn generate(&self, envelope: &Envelope, reply: PendingReply) {
        if let Err(reason) = self.parser.availability() {
            tracing::error!(%reason, "diagram parser unavailable");
            reply.error(ErrorKind::UnsupportedBrowser, reason);
            return;
        }

        let request: GenerateRequest =
            match serde_json::from_value(Value::Object(envelope.payload().clone())) {
                Ok(request) => request,
                Err(err) => {
                    reply.error(ErrorKind::InvalidFormat, format!("Invalid message format: {err}"));
                    return;
                }
            };
        let options = request.options.unwrap_or_default();
        let editable = options.editable != Some(false);
        tracing::debug!(length = request.mermaid.len(), editable, "parsing diagram");

        let parse_started = Instant::now();
        let parsed = parse_with_deadline(
            self.parser.as_ref(),
            request.mermaid,
            self.config.parse_timeout(),
            editable,
        )
        .await;
        self.timing("parsing", parse_started);
        let document = match parsed {
            Ok(document) => document,
            Err(failure) => {
                tracing::error!(kind = %failure.kind(), "diagram parsing failed: {failure}");
                reply.error(failure.kind(), failure.response_message());
                return;
            }
        };

        let insert_started = Instant::now();
        let inserted = {
            let mut model = self.model.lock().await;
            canvas::insert(&mut *model, document, &InsertOptions::from(&options))
        };
        self.timing("insertion", insert_started);
        match inserted {
            Ok(outcome) => {
                tracing::info!(cell_count = outcome.cell_count, "diagram inserted");
                reply.ok(serde_json::to_value(GenerateData { cell_count: outcome.cell_count }).ok());
            }
            Err(err) => {
                reply.error(err.kind(), err.to_string());
            }
        }
    }

    async fn modify_style(&self, envelope: &Envelope, reply: PendingReply) {
        let request = match style::validate_request(envelope.payload()) {
            Ok(request) => request,
            Err(rejection) => {
                tracing::warn!(kind = %rejection.kind, "style request rejected: {}", rejection.message);
                reply.error(rejection.kind, rejection.message);
                return;
            }
        };

        let applied = {
            let mut model = self.model.lock().await;
            style::resolve_targets(request.target, &*model).map(|cells| {
                canvas::apply_styles(
                    &mut *model,
                    &cells,
                    request.styles.as_ref(),
                    request.operations.as_ref(),
                )
            })
        };
        let outcome = match applied {
            Ok(outcome) => outcome,
            Err(rejection) => {
                tracing::warn!(selector = %request.target, "{}", rejection.message);
                reply.error(rejection.kind, rejection.message);
                return;
            }
        };

        if outcome.is_clean() {
            tracing::info!(modified_count = outcome.modified_count, "styles modified");
        } else {
            tracing::warn!(
                modified_count = outcome.modified_count,
                errors = outcome.errors.len(),
                "styles modified with errors"
            );
        }
        let data = StyleData { modified_count: outcome.modified_count, errors: outcome.errors };
        reply.ok(serde_json::to_value(data).ok());
    }

    async fn legacy(&self, envelope: &Envelope, reply: PendingReply) {
        let payload = envelope.payload();
        let Some(text) = legacy_mermaid_text(payload).map(ToOwned::to_owned) else {
            reply.legacy(Some("Missing mermaid payload".to_owned()));
            return;
        };
        let editable = payload
            .get("options")
            .and_then(|options| options.get("editable"))
            .and_then(Value::as_bool)
            == Some(true);

        let document = match parse_with_deadline(
            self.parser.as_ref(),
            text,
            self.config.parse_timeout(),
            editable,
        )
        .await
        {
            Ok(document) => document,
            Err(failure) => {
                tracing::error!(action = %envelope.action(), "diagram parsing failed: {failure}");
                reply.legacy(Some(failure.to_string()));
                return;
            }
        };

        let applied = {
            let mut model = self.model.lock().await;
            match envelope.action() {
                Action::ImportMermaid => canvas::replace(&mut *model, document).map(|_| ()),
                _ => canvas::insert(&mut *model, document, &InsertOptions::default()).map(|_| ()),
            }
        };
        match applied {
            Ok(()) => {
                tracing::info!(action = %envelope.action(), "legacy diagram applied");
                reply.legacy(None);
            }
            Err(err) => {
                reply.legacy(Some(err.to_string()));
            }
        }
    }
}

fn decode(data: Value) -> Result<Value, DropReason> {
    match data {
        Value::String(raw) => serde_json::from_str(&raw).map_err(|_| DropReason::Undecodable),
        other => Ok(other),
    }
}
