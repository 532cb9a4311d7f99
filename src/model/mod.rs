// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Live document model surface.
//!
//! The protocol core only ever talks to the editor's graph through [`DocumentModel`]. The
//! in-memory [`MemoryGraph`] implements it for the bundled host binary and for tests.

pub mod document;
pub mod graph;
pub mod ids;
pub mod style;

pub use document::{CellKind, CellSpec, Geometry, NativeDocument};
pub use graph::{Cell, MemoryGraph};
pub use ids::{CellId, Id, IdError};
pub use style::{is_valid_style_key, Style};

/// Which direct children of the default layer to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildFilter {
    Vertices,
    Edges,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("unknown cell '{0}'")]
    UnknownCell(CellId),
    #[error("invalid style key '{0}'")]
    InvalidStyleKey(String),
    #[error("edge '{edge}' refers to missing terminal '{terminal}'")]
    DanglingTerminal { edge: String, terminal: String },
    #[error("duplicate local id '{0}' in document")]
    DuplicateLocalId(String),
}

/// Mutation surface of the editor's document model.
///
/// Mutations between [`begin_update`](Self::begin_update) and
/// [`end_update`](Self::end_update) are coalesced into one change notification and one undo
/// step. Calls nest; only the outermost `end_update` flushes.
pub trait DocumentModel: Send {
    fn begin_update(&mut self);

    fn end_update(&mut self);

    /// Merges `document` into the default layer, offsetting root geometry by `(dx, dy)`.
    ///
    /// Returns the inserted root cells in document order.
    fn import_document(
        &mut self,
        document: NativeDocument,
        dx: f64,
        dy: f64,
    ) -> Result<Vec<CellId>, ModelError>;

    /// Replaces the whole document with `document`.
    fn replace_document(&mut self, document: NativeDocument) -> Result<Vec<CellId>, ModelError>;

    /// All cells below `cell`, depth first, excluding `cell` itself.
    fn descendants(&self, cell: &CellId) -> Vec<CellId>;

    fn is_edge(&self, cell: &CellId) -> bool;

    /// The computed value of `key` for `cell` (explicit style first, then stylesheet default).
    fn style_value(&self, cell: &CellId, key: &str) -> Option<String>;

    fn set_cell_styles(&mut self, key: &str, value: &str, cells: &[CellId])
        -> Result<(), ModelError>;

    fn scale_cells(&mut self, cells: &[CellId], sx: f64, sy: f64) -> Result<(), ModelError>;

    fn selection(&self) -> Vec<CellId>;

    fn set_selection(&mut self, cells: &[CellId]);

    fn scroll_cell_to_visible(&mut self, cell: &CellId, center: bool);

    fn child_cells(&self, filter: ChildFilter) -> Vec<CellId>;

    fn set_modified(&mut self, modified: bool);
}
