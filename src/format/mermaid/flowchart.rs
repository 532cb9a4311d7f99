// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeMap, HashMap, VecDeque};

use super::ident::{validate_node_id, NodeIdError};
use crate::model::{CellSpec, Geometry, NativeDocument, Style};

pub const GAP_X: i64 = 150;
pub const GAP_Y: i64 = 120;
pub const CENTER_X: i64 = 280;
pub const START_Y: i64 = 80;

const PROCESS_STYLE: &str = "shape=rectangle;rounded=0;whiteSpace=wrap;html=1;fillColor=#FFFFFF;strokeColor=#000000;fontSize=12;";
const ROUNDED_STYLE: &str = "shape=rectangle;rounded=1;whiteSpace=wrap;html=1;fillColor=#FFFFFF;strokeColor=#000000;fontSize=12;";
const DECISION_STYLE: &str = "shape=rhombus;perimeter=rhombusPerimeter;whiteSpace=wrap;html=1;fillColor=#FFFFFF;strokeColor=#000000;fontSize=12;";
const EDGE_STYLE: &str =
    "edgeStyle=orthogonalEdgeStyle;rounded=1;endArrow=block;strokeColor=#000000;html=1;";
const BRANCH_EDGE_STYLE: &str =
    "edgeStyle=orthogonalEdgeStyle;rounded=1;curved=1;endArrow=block;strokeColor=#000000;html=1;";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowchartParseError {
    #[error("Parse error on line 1: diagram text is empty")]
    Empty,
    #[error("Parse error on line {line_no}: expected a 'flowchart' or 'graph' header, found '{keyword}'")]
    MissingHeader { line_no: usize, keyword: String },
    #[error("Parse error on line {line_no}: unsupported direction '{direction}'")]
    InvalidDirection { line_no: usize, direction: String },
    #[error("Parse error on line {line_no}: invalid node id '{name}': {reason}")]
    InvalidNodeId { line_no: usize, name: String, reason: NodeIdError },
    #[error("Parse error on line {line_no}: unclosed label in '{token}'")]
    UnclosedLabel { line_no: usize, token: String },
    #[error("Parse error on line {line_no}: unclosed edge label")]
    UnclosedEdgeLabel { line_no: usize },
    #[error("Parse error on line {line_no}: edge is missing its {end} node")]
    MissingEdgeEnd { line_no: usize, end: &'static str },
    #[error("Parse error on line {line_no}: flowchart has no nodes")]
    NoNodes { line_no: usize },
}

impl FlowchartParseError {
    pub fn line_no(&self) -> usize {
        match self {
            Self::Empty => 1,
            Self::MissingHeader { line_no, .. }
            | Self::InvalidDirection { line_no, .. }
            | Self::InvalidNodeId { line_no, .. }
            | Self::UnclosedLabel { line_no, .. }
            | Self::UnclosedEdgeLabel { line_no }
            | Self::MissingEdgeEnd { line_no, .. }
            | Self::NoNodes { line_no } => *line_no,
        }
    }
}

/// The direction declared in the header. Layout is always top-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    TopDown,
    BottomUp,
    LeftRight,
    RightLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeShape {
    /// `id[label]` or a bare id.
    #[default]
    Process,
    /// `id(label)`
    Rounded,
    /// `id{label}`
    Decision,
}

impl NodeShape {
    fn size(self) -> (f64, f64) {
        match self {
            Self::Decision => (110.0, 80.0),
            Self::Process | Self::Rounded => (120.0, 50.0),
        }
    }

    fn style(self) -> &'static str {
        match self {
            Self::Process => PROCESS_STYLE,
            Self::Rounded => ROUNDED_STYLE,
            Self::Decision => DECISION_STYLE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowNode {
    id: String,
    label: String,
    shape: NodeShape,
}

impl FlowNode {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn shape(&self) -> NodeShape {
        self.shape
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowEdge {
    from: String,
    to: String,
    label: Option<String>,
}

impl FlowEdge {
    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Nodes in order of first mention, edges in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Flowchart {
    direction: Direction,
    nodes: Vec<FlowNode>,
    edges: Vec<FlowEdge>,
    index: HashMap<String, usize>,
}

impl Flowchart {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[FlowEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.index.get(id).map(|&index| &self.nodes[index])
    }

    /// A later explicit label or shape replaces an earlier one.
    fn ensure_node(&mut self, spec: NodeSpec) -> usize {
        if let Some(&index) = self.index.get(&spec.id) {
            let node = &mut self.nodes[index];
            if let Some(label) = spec.label {
                node.label = label;
            }
            if let Some(shape) = spec.shape {
                node.shape = shape;
            }
            return index;
        }

        let index = self.nodes.len();
        self.index.insert(spec.id.clone(), index);
        let label = spec.label.unwrap_or_else(|| spec.id.clone());
        self.nodes.push(FlowNode { id: spec.id, label, shape: spec.shape.unwrap_or_default() });
        index
    }

    fn push_edge(&mut self, from: usize, to: usize, label: Option<String>, direction: EdgeDirection) {
        let (from, to) = match direction {
            EdgeDirection::Forward => (from, to),
            EdgeDirection::Reverse => (to, from),
        };
        self.edges.push(FlowEdge {
            from: self.nodes[from].id.clone(),
            to: self.nodes[to].id.clone(),
            label,
        });
    }
}

fn is_edge_op_start_char(ch: char) -> bool {
    matches!(ch, '<' | '-' | '=' | '.')
}

fn is_edge_op_char(ch: char) -> bool {
    matches!(ch, '<' | '>' | '-' | '=' | '.')
}

fn is_probable_edge_operator(op: &str) -> bool {
    let strokes = op.chars().filter(|ch| matches!(ch, '-' | '=' | '.')).count();
    strokes >= 2 || (strokes == 1 && op.ends_with('>'))
}

/// Splits `line` at the first edge operator outside a node label.
///
/// The left-hand side may be empty; callers report that as a missing source.
fn split_once_edge_operator(line: &str) -> Option<(&str, &str, &str)> {
    let mut closer: Option<char> = None;
    let mut start: Option<usize> = None;
    for (idx, ch) in line.char_indices() {
        if let Some(close) = closer {
            if ch == close {
                closer = None;
            }
            continue;
        }
        match ch {
            '[' => closer = Some(']'),
            '(' => closer = Some(')'),
            '{' => closer = Some('}'),
            _ if is_edge_op_start_char(ch) => {
                start = Some(idx);
                break;
            }
            _ => {}
        }
    }

    let start = start?;
    let end = line[start..]
        .char_indices()
        .find(|(_, ch)| !is_edge_op_char(*ch))
        .map_or(line.len(), |(idx, _)| start + idx);
    let op = &line[start..end];
    is_probable_edge_operator(op).then_some((&line[..start], op, &line[end..]))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeDirection {
    Forward,
    Reverse,
}

fn edge_direction(op: &str) -> EdgeDirection {
    if op.contains('<') && !op.contains('>') {
        EdgeDirection::Reverse
    } else {
        EdgeDirection::Forward
    }
}

fn unquote(raw: &str) -> &str {
    raw.strip_prefix('"').and_then(|inner| inner.strip_suffix('"')).unwrap_or(raw).trim()
}

/// Consumes a leading `|label|` after an edge operator.
fn take_edge_label(rest: &str, line_no: usize) -> Result<(Option<String>, &str), FlowchartParseError> {
    let Some(body) = rest.trim_start().strip_prefix('|') else {
        return Ok((None, rest));
    };
    let (label, after) =
        body.split_once('|').ok_or(FlowchartParseError::UnclosedEdgeLabel { line_no })?;
    let label = unquote(label.trim());
    Ok(((!label.is_empty()).then(|| label.to_owned()), after))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeSpec {
    id: String,
    label: Option<String>,
    shape: Option<NodeShape>,
}

fn parse_node_spec(token: &str, line_no: usize) -> Result<NodeSpec, FlowchartParseError> {
    let trimmed = token.trim();
    let invalid_id = |name: &str, reason| FlowchartParseError::InvalidNodeId {
        line_no,
        name: name.to_owned(),
        reason,
    };

    let open = trimmed.char_indices().find(|(_, ch)| matches!(ch, '[' | '(' | '{'));
    let Some((open_idx, open_ch)) = open else {
        validate_node_id(trimmed).map_err(|reason| invalid_id(trimmed, reason))?;
        return Ok(NodeSpec { id: trimmed.to_owned(), label: None, shape: None });
    };

    let (close_ch, shape) = match open_ch {
        '[' => (']', NodeShape::Process),
        '(' => (')', NodeShape::Rounded),
        _ => ('}', NodeShape::Decision),
    };

    let id = trimmed[..open_idx].trim();
    validate_node_id(id).map_err(|reason| invalid_id(id, reason))?;

    let label = trimmed[open_idx + open_ch.len_utf8()..].strip_suffix(close_ch).ok_or_else(|| {
        FlowchartParseError::UnclosedLabel { line_no, token: trimmed.to_owned() }
    })?;
    let label = unquote(label.trim());

    // An empty label falls back to the id.
    Ok(NodeSpec {
        id: id.to_owned(),
        label: (!label.is_empty()).then(|| label.to_owned()),
        shape: Some(shape),
    })
}

fn parse_header(trimmed: &str, line_no: usize) -> Result<Direction, FlowchartParseError> {
    let mut parts = trimmed.split_whitespace();
    let keyword = parts.next().unwrap_or_default();
    if keyword != "flowchart" && keyword != "graph" {
        return Err(FlowchartParseError::MissingHeader { line_no, keyword: keyword.to_owned() });
    }
    match parts.next() {
        None | Some("TD" | "TB") => Ok(Direction::TopDown),
        Some("BT") => Ok(Direction::BottomUp),
        Some("LR") => Ok(Direction::LeftRight),
        Some("RL") => Ok(Direction::RightLeft),
        Some(other) => {
            Err(FlowchartParseError::InvalidDirection { line_no, direction: other.to_owned() })
        }
    }
}

fn is_comment_line(trimmed: &str) -> bool {
    trimmed.starts_with("%%")
}

fn is_ignorable_line(trimmed: &str) -> bool {
    trimmed.starts_with("subgraph ")
        || trimmed == "end"
        || trimmed.starts_with("direction ")
        || trimmed.starts_with("style ")
        || trimmed.starts_with("class ")
        || trimmed.starts_with("classDef ")
        || trimmed.starts_with("click ")
        || trimmed.starts_with("linkStyle ")
}

fn parse_statement(
    chart: &mut Flowchart,
    line: &str,
    line_no: usize,
) -> Result<(), FlowchartParseError> {
    let Some((lhs, mut op, mut rest)) = split_once_edge_operator(line) else {
        chart.ensure_node(parse_node_spec(line, line_no)?);
        return Ok(());
    };
    if lhs.trim().is_empty() {
        return Err(FlowchartParseError::MissingEdgeEnd { line_no, end: "source" });
    }
    let mut from = chart.ensure_node(parse_node_spec(lhs, line_no)?);

    // Chains like `A --> B --> C` become one edge per hop.
    loop {
        let (label, after_label) = take_edge_label(rest, line_no)?;
        let (target, next) = match split_once_edge_operator(after_label) {
            Some((target, next_op, next_rest)) => (target, Some((next_op, next_rest))),
            None => (after_label, None),
        };
        if target.trim().is_empty() {
            return Err(FlowchartParseError::MissingEdgeEnd { line_no, end: "target" });
        }
        let to = chart.ensure_node(parse_node_spec(target, line_no)?);
        chart.push_edge(from, to, label, edge_direction(op));

        let Some((next_op, next_rest)) = next else {
            return Ok(());
        };
        from = to;
        op = next_op;
        rest = next_rest;
    }
}

/// Parses the supported Mermaid flowchart subset.
///
/// Supported:
/// - `flowchart`/`graph` header with optional direction (`TD`, `TB`, `BT`, `LR`, `RL`)
/// - `%%` comments and trailing `;`
/// - nodes: `<id>`, `<id>[<label>]`, `<id>(<label>)`, `<id>{<label>}`
/// - edges `A --> B`, `A -->|label| B`, `A <-- B`, chains `A --> B --> C`
///
/// Subgraph, style and interaction statements are skipped.
pub fn parse_flowchart(input: &str) -> Result<Flowchart, FlowchartParseError> {
    let mut chart = Flowchart::default();
    let mut header_line: Option<usize> = None;

    for (idx, raw_line) in input.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw_line.trim().trim_end_matches(';').trim_end();
        if trimmed.is_empty() || is_comment_line(trimmed) {
            continue;
        }
        if header_line.is_none() {
            chart.direction = parse_header(trimmed, line_no)?;
            header_line = Some(line_no);
            continue;
        }
        if is_ignorable_line(trimmed) {
            continue;
        }
        parse_statement(&mut chart, trimmed, line_no)?;
    }

    let header_line = header_line.ok_or(FlowchartParseError::Empty)?;
    if chart.nodes.is_empty() {
        return Err(FlowchartParseError::NoNodes { line_no: header_line });
    }
    Ok(chart)
}

/// Top-left corner of every node, indexed like [`Flowchart::nodes`].
///
/// Levels come from a longest-path walk over the edges; nodes only reachable through a cycle
/// keep the level their acyclic predecessors gave them. Each level is one row, centred on
/// [`CENTER_X`].
pub fn layered_positions(chart: &Flowchart) -> Vec<(f64, f64)> {
    let count = chart.nodes.len();
    let mut outgoing = vec![Vec::new(); count];
    let mut indegree = vec![0usize; count];
    for edge in &chart.edges {
        let (Some(&from), Some(&to)) = (chart.index.get(&edge.from), chart.index.get(&edge.to))
        else {
            continue;
        };
        outgoing[from].push(to);
        indegree[to] += 1;
    }

    let mut level = vec![0usize; count];
    let mut queue: VecDeque<usize> = (0..count).filter(|&node| indegree[node] == 0).collect();
    while let Some(node) = queue.pop_front() {
        let base = level[node];
        for &next in &outgoing[node] {
            level[next] = level[next].max(base + 1);
            indegree[next] -= 1;
            if indegree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    let mut rows: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (node, &row) in level.iter().enumerate() {
        rows.entry(row).or_default().push(node);
    }

    let mut positions = vec![(0.0, 0.0); count];
    for (row, members) in rows {
        let y = START_Y + row as i64 * GAP_Y;
        let total_width = (members.len() as i64 - 1) * GAP_X;
        let start_x = CENTER_X - total_width / 2;
        for (slot, node) in members.into_iter().enumerate() {
            positions[node] = ((start_x + slot as i64 * GAP_X) as f64, y as f64);
        }
    }
    positions
}

/// Lays out `chart` and turns it into editable cells.
///
/// Edges leaving a node with more than one outgoing edge are drawn curved.
pub fn to_document(chart: &Flowchart) -> NativeDocument {
    let positions = layered_positions(chart);
    let mut fanout: HashMap<&str, usize> = HashMap::new();
    for edge in &chart.edges {
        *fanout.entry(edge.from.as_str()).or_default() += 1;
    }

    let mut cells = Vec::with_capacity(chart.nodes.len() + chart.edges.len());
    for (node, (x, y)) in chart.nodes.iter().zip(positions) {
        let (width, height) = node.shape.size();
        cells.push(
            CellSpec::vertex(node.id.clone(), node.label.clone(), Geometry::new(x, y, width, height))
                .with_style(Style::parse(node.shape.style())),
        );
    }
    for (index, edge) in chart.edges.iter().enumerate() {
        let branches = fanout.get(edge.from.as_str()).copied().unwrap_or_default();
        let style = if branches > 1 { BRANCH_EDGE_STYLE } else { EDGE_STYLE };
        cells.push(
            CellSpec::edge(
                format!("edge:{index}"),
                edge.from.clone(),
                edge.to.clone(),
                edge.label.clone().unwrap_or_default(),
            )
            .with_style(Style::parse(style)),
        );
    }
    NativeDocument::new(cells)
}
