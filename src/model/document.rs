// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::style::Style;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Vertex,
    Edge,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Geometry {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// One element of a parsed document, addressed by a document-local id.
///
/// Edges refer to their terminals by local id; the live model rewrites those references when
/// the document is imported.
#[derive(Debug, Clone, PartialEq)]
pub struct CellSpec {
    local_id: String,
    kind: CellKind,
    value: String,
    style: Style,
    geometry: Geometry,
    source: Option<String>,
    target: Option<String>,
    children: Vec<CellSpec>,
}

impl CellSpec {
    pub fn vertex(local_id: impl Into<String>, value: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            local_id: local_id.into(),
            kind: CellKind::Vertex,
            value: value.into(),
            style: Style::default(),
            geometry,
            source: None,
            target: None,
            children: Vec::new(),
        }
    }

    pub fn edge(
        local_id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            local_id: local_id.into(),
            kind: CellKind::Edge,
            value: value.into(),
            style: Style::default(),
            geometry: Geometry::default(),
            source: Some(source.into()),
            target: Some(target.into()),
            children: Vec::new(),
        }
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_child(mut self, child: CellSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn kind(&self) -> CellKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn children(&self) -> &[CellSpec] {
        &self.children
    }

    pub(crate) fn into_parts(self) -> CellSpecParts {
        CellSpecParts {
            local_id: self.local_id,
            kind: self.kind,
            value: self.value,
            style: self.style,
            geometry: self.geometry,
            source: self.source,
            target: self.target,
            children: self.children,
        }
    }
}

pub(crate) struct CellSpecParts {
    pub local_id: String,
    pub kind: CellKind,
    pub value: String,
    pub style: Style,
    pub geometry: Geometry,
    pub source: Option<String>,
    pub target: Option<String>,
    pub children: Vec<CellSpec>,
}

/// A parsed diagram that has not been merged into the live model yet.
///
/// The document is owned by whoever holds it; importing it into a model consumes it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NativeDocument {
    cells: Vec<CellSpec>,
}

impl NativeDocument {
    pub fn new(cells: Vec<CellSpec>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[CellSpec] {
        &self.cells
    }

    /// Number of root cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn into_cells(self) -> Vec<CellSpec> {
        self.cells
    }
}
