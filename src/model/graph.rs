// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeMap, HashMap};

use super::document::{CellKind, CellSpec, Geometry, NativeDocument};
use super::ids::CellId;
use super::style::{is_valid_style_key, Style};
use super::{ChildFilter, DocumentModel, ModelError};

const VERTEX_DEFAULTS: &[(&str, &str)] = &[
    ("fillColor", "#ffffff"),
    ("strokeColor", "#000000"),
    ("fontColor", "#000000"),
    ("strokeWidth", "1"),
    ("fontSize", "11"),
    ("opacity", "100"),
    ("rotation", "0"),
    ("align", "center"),
    ("verticalAlign", "middle"),
];

const EDGE_DEFAULTS: &[(&str, &str)] = &[
    ("strokeColor", "#000000"),
    ("fontColor", "#000000"),
    ("strokeWidth", "1"),
    ("fontSize", "11"),
    ("opacity", "100"),
    ("endArrow", "classic"),
    ("startArrow", "none"),
    ("endSize", "6"),
    ("startSize", "6"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    id: CellId,
    kind: CellKind,
    value: String,
    style: Style,
    geometry: Geometry,
    parent: Option<CellId>,
    children: Vec<CellId>,
    source: Option<CellId>,
    target: Option<CellId>,
}

impl Cell {
    pub fn id(&self) -> &CellId {
        &self.id
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

    pub fn parent(&self) -> Option<&CellId> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &[CellId] {
        &self.children
    }

    pub fn source(&self) -> Option<&CellId> {
        self.source.as_ref()
    }

    pub fn target(&self) -> Option<&CellId> {
        self.target.as_ref()
    }
}

/// An in-memory graph with one default layer.
///
/// Besides the [`DocumentModel`] surface it keeps counters for change notifications and undo
/// steps so callers can observe how mutations were batched.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    cells: BTreeMap<CellId, Cell>,
    layer: Vec<CellId>,
    next_id: u64,
    selection: Vec<CellId>,
    update_level: u32,
    pending_changes: usize,
    change_events: usize,
    undo_steps: usize,
    modified: bool,
    scroll_target: Option<(CellId, bool)>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(&self, id: &CellId) -> Option<&Cell> {
        self.cells.get(id)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn change_events(&self) -> usize {
        self.change_events
    }

    pub fn undo_steps(&self) -> usize {
        self.undo_steps
    }

    pub fn update_level(&self) -> u32 {
        self.update_level
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn scroll_target(&self) -> Option<(&CellId, bool)> {
        self.scroll_target.as_ref().map(|(id, center)| (id, *center))
    }

    /// Adds a vertex to the default layer.
    pub fn add_vertex(&mut self, value: &str, style: &str, geometry: Geometry) -> CellId {
        let id = self.allocate_id();
        self.insert_cell(Cell {
            id: id.clone(),
            kind: CellKind::Vertex,
            value: value.to_owned(),
            style: Style::parse(style),
            geometry,
            parent: None,
            children: Vec::new(),
            source: None,
            target: None,
        });
        id
    }

    /// Adds an edge between two existing cells to the default layer.
    pub fn add_edge(
        &mut self,
        source: &CellId,
        target: &CellId,
        style: &str,
    ) -> Result<CellId, ModelError> {
        for terminal in [source, target] {
            if !self.cells.contains_key(terminal) {
                return Err(ModelError::UnknownCell(terminal.clone()));
            }
        }
        let id = self.allocate_id();
        self.insert_cell(Cell {
            id: id.clone(),
            kind: CellKind::Edge,
            value: String::new(),
            style: Style::parse(style),
            geometry: Geometry::default(),
            parent: None,
            children: Vec::new(),
            source: Some(source.clone()),
            target: Some(target.clone()),
        });
        Ok(id)
    }

    fn allocate_id(&mut self) -> CellId {
        loop {
            self.next_id += 1;
            let candidate = format!("c{}", self.next_id);
            if let Ok(id) = CellId::new(candidate) {
                if !self.cells.contains_key(&id) {
                    return id;
                }
            }
        }
    }

    fn insert_cell(&mut self, cell: Cell) {
        match &cell.parent {
            Some(parent) => {
                if let Some(parent) = self.cells.get_mut(parent) {
                    parent.children.push(cell.id.clone());
                }
            }
            None => self.layer.push(cell.id.clone()),
        }
        self.cells.insert(cell.id.clone(), cell);
        self.record_change();
    }

    fn record_change(&mut self) {
        self.pending_changes += 1;
        if self.update_level == 0 {
            self.flush_changes();
        }
    }

    fn flush_changes(&mut self) {
        if self.pending_changes > 0 {
            self.change_events += 1;
            self.undo_steps += 1;
            self.pending_changes = 0;
        }
    }

    fn import_spec(
        &mut self,
        spec: CellSpec,
        parent: Option<&CellId>,
        offset: (f64, f64),
        local_ids: &mut HashMap<String, CellId>,
        pending_terminals: &mut Vec<(CellId, Option<String>, Option<String>)>,
    ) -> Result<CellId, ModelError> {
        let parts = spec.into_parts();
        if local_ids.contains_key(&parts.local_id) {
            return Err(ModelError::DuplicateLocalId(parts.local_id));
        }

        let id = self.allocate_id();
        let mut geometry = parts.geometry;
        geometry.x += offset.0;
        geometry.y += offset.1;
        self.insert_cell(Cell {
            id: id.clone(),
            kind: parts.kind,
            value: parts.value,
            style: parts.style,
            geometry,
            parent: parent.cloned(),
            children: Vec::new(),
            source: None,
            target: None,
        });
        local_ids.insert(parts.local_id, id.clone());

        if parts.kind == CellKind::Edge {
            pending_terminals.push((id.clone(), parts.source, parts.target));
        }

        for child in parts.children {
            self.import_spec(child, Some(&id), (0.0, 0.0), local_ids, pending_terminals)?;
        }

        Ok(id)
    }
}

impl DocumentModel for MemoryGraph {
    fn begin_update(&mut self) {
        self.update_level += 1;
    }

    fn end_update(&mut self) {
        self.update_level = self.update_level.saturating_sub(1);
        if self.update_level == 0 {
            self.flush_changes();
        }
    }

    fn import_document(
        &mut self,
        document: NativeDocument,
        dx: f64,
        dy: f64,
    ) -> Result<Vec<CellId>, ModelError> {
        let mut local_ids = HashMap::new();
        let mut pending_terminals = Vec::new();
        let mut roots = Vec::with_capacity(document.len());

        // Cells inserted before a failure stay in the model; callers bracket the import in a
        // transaction so the partial result is one undo step.
        for spec in document.into_cells() {
            let id = self.import_spec(spec, None, (dx, dy), &mut local_ids, &mut pending_terminals)?;
            roots.push(id);
        }

        for (edge, source, target) in pending_terminals {
            let resolve = |terminal: Option<String>| -> Result<Option<CellId>, ModelError> {
                match terminal {
                    None => Ok(None),
                    Some(local) => match local_ids.get(&local) {
                        Some(id) => Ok(Some(id.clone())),
                        None => Err(ModelError::DanglingTerminal {
                            edge: edge.to_string(),
                            terminal: local,
                        }),
                    },
                }
            };
            let source = resolve(source)?;
            let target = resolve(target)?;
            if let Some(cell) = self.cells.get_mut(&edge) {
                cell.source = source;
                cell.target = target;
            }
        }

        Ok(roots)
    }

    fn replace_document(&mut self, document: NativeDocument) -> Result<Vec<CellId>, ModelError> {
        self.cells.clear();
        self.layer.clear();
        self.selection.clear();
        self.scroll_target = None;
        self.record_change();
        self.import_document(document, 0.0, 0.0)
    }

    fn descendants(&self, cell: &CellId) -> Vec<CellId> {
        let mut out = Vec::new();
        let mut stack = match self.cells.get(cell) {
            Some(cell) => cell.children.iter().rev().cloned().collect::<Vec<_>>(),
            None => return out,
        };
        while let Some(id) = stack.pop() {
            if let Some(child) = self.cells.get(&id) {
                stack.extend(child.children.iter().rev().cloned());
            }
            out.push(id);
        }
        out
    }

    fn is_edge(&self, cell: &CellId) -> bool {
        self.cells.get(cell).is_some_and(|cell| cell.kind == CellKind::Edge)
    }

    fn style_value(&self, cell: &CellId, key: &str) -> Option<String> {
        let cell = self.cells.get(cell)?;
        if let Some(value) = cell.style.get(key) {
            return Some(value.to_owned());
        }
        let defaults = match cell.kind {
            CellKind::Vertex => VERTEX_DEFAULTS,
            CellKind::Edge => EDGE_DEFAULTS,
        };
        defaults
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| (*value).to_owned())
    }

    fn set_cell_styles(
        &mut self,
        key: &str,
        value: &str,
        cells: &[CellId],
    ) -> Result<(), ModelError> {
        if !is_valid_style_key(key) {
            return Err(ModelError::InvalidStyleKey(key.to_owned()));
        }
        if let Some(missing) = cells.iter().find(|id| !self.cells.contains_key(*id)) {
            return Err(ModelError::UnknownCell(missing.clone()));
        }
        for id in cells {
            if let Some(cell) = self.cells.get_mut(id) {
                cell.style.set(key, value);
            }
        }
        if !cells.is_empty() {
            self.record_change();
        }
        Ok(())
    }

    fn scale_cells(&mut self, cells: &[CellId], sx: f64, sy: f64) -> Result<(), ModelError> {
        if let Some(missing) = cells.iter().find(|id| !self.cells.contains_key(*id)) {
            return Err(ModelError::UnknownCell(missing.clone()));
        }
        for id in cells {
            if let Some(cell) = self.cells.get_mut(id) {
                if cell.kind == CellKind::Vertex {
                    cell.geometry.width *= sx;
                    cell.geometry.height *= sy;
                }
            }
        }
        self.record_change();
        Ok(())
    }

    fn selection(&self) -> Vec<CellId> {
        self.selection.clone()
    }

    fn set_selection(&mut self, cells: &[CellId]) {
        self.selection = cells.iter().filter(|id| self.cells.contains_key(*id)).cloned().collect();
    }

    fn scroll_cell_to_visible(&mut self, cell: &CellId, center: bool) {
        if self.cells.contains_key(cell) {
            self.scroll_target = Some((cell.clone(), center));
        }
    }

    fn child_cells(&self, filter: ChildFilter) -> Vec<CellId> {
        self.layer
            .iter()
            .filter(|id| match (filter, self.cells.get(*id).map(Cell::kind)) {
                (ChildFilter::All, Some(_)) => true,
                (ChildFilter::Vertices, Some(CellKind::Vertex)) => true,
                (ChildFilter::Edges, Some(CellKind::Edge)) => true,
                _ => false,
            })
            .cloned()
            .collect()
    }

    fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_node_document() -> NativeDocument {
        NativeDocument::new(vec![
            CellSpec::vertex("a", "A", Geometry::new(0.0, 0.0, 120.0, 50.0)),
            CellSpec::vertex("b", "B", Geometry::new(0.0, 100.0, 120.0, 50.0)),
            CellSpec::edge("ab", "a", "b", ""),
        ])
    }

    #[test]
    fn import_offsets_roots_and_links_terminals() {
        let mut graph = MemoryGraph::new();
        let roots = graph.import_document(two_node_document(), 20.0, 30.0).expect("import");

        assert_eq!(roots.len(), 3);
        let a = graph.cell(&roots[0]).expect("a");
        assert_eq!(a.geometry().x, 20.0);
        assert_eq!(a.geometry().y, 30.0);
        let edge = graph.cell(&roots[2]).expect("edge");
        assert_eq!(edge.source(), Some(&roots[0]));
        assert_eq!(edge.target(), Some(&roots[1]));
        assert_eq!(graph.child_cells(ChildFilter::Edges), vec![roots[2].clone()]);
        assert_eq!(graph.child_cells(ChildFilter::Vertices).len(), 2);
    }

    #[test]
    fn import_keeps_cells_inserted_before_a_dangling_edge() {
        let mut graph = MemoryGraph::new();
        let document = NativeDocument::new(vec![
            CellSpec::vertex("a", "A", Geometry::default()),
            CellSpec::edge("ax", "a", "missing", ""),
        ]);

        let err = graph.import_document(document, 0.0, 0.0).unwrap_err();
        assert!(matches!(err, ModelError::DanglingTerminal { .. }));
        assert_eq!(graph.cell_count(), 2);
    }

    #[test]
    fn nested_updates_flush_once() {
        let mut graph = MemoryGraph::new();
        graph.begin_update();
        graph.begin_update();
        graph.import_document(two_node_document(), 0.0, 0.0).expect("import");
        graph.end_update();
        assert_eq!(graph.change_events(), 0);
        graph.end_update();
        assert_eq!(graph.change_events(), 1);
        assert_eq!(graph.undo_steps(), 1);
    }

    #[test]
    fn descendants_walk_depth_first() {
        let mut graph = MemoryGraph::new();
        let group = CellSpec::vertex("g", "", Geometry::default())
            .with_child(
                CellSpec::vertex("g1", "", Geometry::default())
                    .with_child(CellSpec::vertex("g11", "", Geometry::default())),
            )
            .with_child(CellSpec::vertex("g2", "", Geometry::default()));
        let roots =
            graph.import_document(NativeDocument::new(vec![group]), 0.0, 0.0).expect("import");

        let descendants = graph.descendants(&roots[0]);
        let values = descendants.iter().map(|id| id.as_str().to_owned()).collect::<Vec<_>>();
        assert_eq!(values, vec!["c2", "c3", "c4"]);
        assert_eq!(graph.child_cells(ChildFilter::All), roots);
    }

    #[test]
    fn style_value_falls_back_to_stylesheet_defaults() {
        let mut graph = MemoryGraph::new();
        let v = graph.add_vertex("v", "fontSize=14;", Geometry::default());
        assert_eq!(graph.style_value(&v, "fontSize").as_deref(), Some("14"));
        assert_eq!(graph.style_value(&v, "strokeWidth").as_deref(), Some("1"));
        assert_eq!(graph.style_value(&v, "nope"), None);
    }

    #[test]
    fn set_cell_styles_rejects_separator_keys() {
        let mut graph = MemoryGraph::new();
        let v = graph.add_vertex("v", "", Geometry::default());
        let err = graph.set_cell_styles("a;b", "1", &[v]).unwrap_err();
        assert_eq!(err, ModelError::InvalidStyleKey("a;b".to_owned()));
    }
}
