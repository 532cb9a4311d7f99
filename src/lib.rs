// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Framebridge: the command channel of an embedded diagram editor.
//!
//! A host page posts JSON commands to the editor frame; [`router::Router`] validates each one,
//! runs it against the live document model and posts exactly one reply back.

pub mod bridge;
pub mod canvas;
pub mod config;
pub mod format;
pub mod model;
pub mod protocol;
pub mod respond;
pub mod router;
pub mod security;
pub mod style;
pub mod telemetry;
