// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Style property rules, target selection and relative operations.
//!
//! Every property name maps to a [`PropertyRule`]. Names outside the table are
//! [`PropertyKind::Plain`]: any scalar value is accepted and every operation is allowed.

use std::fmt;

use serde_json::{Map, Value};

use crate::model::{is_valid_style_key, CellId, ChildFilter, DocumentModel};
use crate::protocol::{ErrorKind, Rejection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Color,
    Numeric,
    Boolean,
    Enum,
    Plain,
}

impl PropertyKind {
    fn label(self) -> &'static str {
        match self {
            Self::Color => "Color",
            Self::Numeric => "Numeric",
            Self::Boolean => "Boolean",
            Self::Enum => "Enum",
            Self::Plain => "Plain",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Set,
    Increase,
    Decrease,
    Multiply,
}

impl OpKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "set" => Some(Self::Set),
            "increase" => Some(Self::Increase),
            "decrease" => Some(Self::Decrease),
            "multiply" => Some(Self::Multiply),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Increase => "increase",
            Self::Decrease => "decrease",
            Self::Multiply => "multiply",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const ALL_OPS: &[OpKind] = &[OpKind::Set, OpKind::Increase, OpKind::Decrease, OpKind::Multiply];
const SET_ONLY: &[OpKind] = &[OpKind::Set];

const HORIZONTAL: &[&str] = &["left", "center", "right"];
const VERTICAL: &[&str] = &["top", "middle", "bottom"];
const ARROWS: &[&str] = &[
    "none",
    "classic",
    "classicThin",
    "block",
    "blockThin",
    "open",
    "openThin",
    "oval",
    "diamond",
    "diamondThin",
];

/// Classification of one style property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertyRule {
    pub kind: PropertyKind,
    pub ops: &'static [OpKind],
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub enum_values: &'static [&'static str],
    pub edge_only: bool,
}

impl PropertyRule {
    const fn of(kind: PropertyKind) -> Self {
        let ops = match kind {
            PropertyKind::Numeric | PropertyKind::Plain => ALL_OPS,
            PropertyKind::Color | PropertyKind::Boolean | PropertyKind::Enum => SET_ONLY,
        };
        Self { kind, ops, min: None, max: None, enum_values: &[], edge_only: false }
    }

    const fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    const fn values(mut self, values: &'static [&'static str]) -> Self {
        self.enum_values = values;
        self
    }

    const fn edges(mut self) -> Self {
        self.edge_only = true;
        self
    }

    pub fn supports(&self, op: OpKind) -> bool {
        self.ops.contains(&op)
    }

    pub fn clamp(&self, value: f64) -> f64 {
        let value = match self.min {
            Some(min) if value < min => min,
            _ => value,
        };
        match self.max {
            Some(max) if value > max => max,
            _ => value,
        }
    }
}

/// The rule for `name`. Unknown names are plain properties.
pub fn rule_for(name: &str) -> PropertyRule {
    use PropertyKind::{Boolean, Color, Enum, Numeric, Plain};

    const PERCENT: (Option<f64>, Option<f64>) = (Some(0.0), Some(100.0));
    let rule = PropertyRule::of;
    match name {
        "fillColor" | "strokeColor" | "fontColor" | "gradientColor" | "labelBackgroundColor"
        | "labelBorderColor" | "shadowColor" | "swimlaneFillColor" => rule(Color),

        "opacity" | "fillOpacity" | "strokeOpacity" | "textOpacity" | "shadowOpacity"
        | "arcSize" => rule(Numeric).range(PERCENT.0, PERCENT.1),
        "strokeWidth" => rule(Numeric).range(Some(0.0), None),
        "fontSize" => rule(Numeric).range(Some(1.0), None),
        "rotation" => rule(Numeric).range(Some(0.0), Some(360.0)),
        "startSize" | "endSize" => rule(Numeric).range(Some(0.0), None).edges(),
        "spacing" | "spacingTop" | "spacingBottom" | "spacingLeft" | "spacingRight" => {
            rule(Numeric)
        }

        "startFill" | "endFill" | "curved" => rule(Boolean).edges(),
        "dashed" | "rounded" | "shadow" | "editable" | "movable" | "resizable" | "rotatable"
        | "deletable" | "bendable" | "foldable" => rule(Boolean),

        "align" | "labelPosition" => rule(Enum).values(HORIZONTAL),
        "verticalAlign" | "verticalLabelPosition" => rule(Enum).values(VERTICAL),
        "startArrow" | "endArrow" => rule(Enum).values(ARROWS).edges(),

        _ => rule(Plain),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetSelector {
    Selected,
    Edges,
    Vertices,
    All,
}

impl TargetSelector {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "selected" => Some(Self::Selected),
            "edges" => Some(Self::Edges),
            "vertices" => Some(Self::Vertices),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Selected => "selected",
            Self::Edges => "edges",
            Self::Vertices => "vertices",
            Self::All => "all",
        }
    }
}

impl fmt::Display for TargetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded `modifyStyle` request.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRequest {
    pub target: TargetSelector,
    pub styles: Option<Map<String, Value>>,
    pub operations: Option<Map<String, Value>>,
}

/// Decodes and checks the request fields of a `modifyStyle` payload.
pub fn validate_request(payload: &Map<String, Value>) -> Result<StyleRequest, Rejection> {
    let target = match payload.get("target") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => None,
        Some(Value::String(raw)) if raw.is_empty() => None,
        Some(raw) => Some(raw),
    };
    let Some(target) = target else {
        return Err(Rejection::new(ErrorKind::InvalidFormat, "Missing target field"));
    };
    let Some(target) = target.as_str().and_then(TargetSelector::parse) else {
        return Err(Rejection::new(
            ErrorKind::InvalidTarget,
            format!("Invalid target: {}", display_value(target)),
        ));
    };

    let styles = object_field(payload, "styles")?;
    let operations = object_field(payload, "operations")?;
    let has_entries = |map: &Option<Map<String, Value>>| map.as_ref().is_some_and(|m| !m.is_empty());
    if !has_entries(&styles) && !has_entries(&operations) {
        return Err(Rejection::new(
            ErrorKind::InvalidFormat,
            "Missing styles or operations field",
        ));
    }

    Ok(StyleRequest { target, styles, operations })
}

fn object_field(
    payload: &Map<String, Value>,
    name: &str,
) -> Result<Option<Map<String, Value>>, Rejection> {
    match payload.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map.clone())),
        Some(_) => Err(Rejection::new(
            ErrorKind::InvalidFormat,
            format!("Invalid {name} field: expected an object"),
        )),
    }
}

/// The cells `selector` designates in `model`. An empty set is an error.
pub fn resolve_targets<M>(selector: TargetSelector, model: &M) -> Result<Vec<CellId>, Rejection>
where
    M: DocumentModel + ?Sized,
{
    let cells = match selector {
        TargetSelector::Selected => model.selection(),
        TargetSelector::Edges => model.child_cells(ChildFilter::Edges),
        TargetSelector::Vertices => model.child_cells(ChildFilter::Vertices),
        TargetSelector::All => model.child_cells(ChildFilter::All),
    };
    if cells.is_empty() {
        return Err(Rejection::new(ErrorKind::NoTargetCells, "No target cells found"));
    }
    Ok(cells)
}

/// Drops non-edges when `name` only applies to edges.
pub fn filter_for_property<M>(cells: &[CellId], name: &str, model: &M) -> Vec<CellId>
where
    M: DocumentModel + ?Sized,
{
    if !rule_for(name).edge_only {
        return cells.to_vec();
    }
    cells.iter().filter(|cell| model.is_edge(cell)).cloned().collect()
}

/// Checks an absolute style value and returns the string to store.
pub fn validate_property(name: &str, value: &Value) -> Result<String, Rejection> {
    if !is_valid_style_key(name) {
        return Err(Rejection::new(
            ErrorKind::InvalidProperty,
            format!("Invalid property name: {name:?}"),
        ));
    }
    if value.as_str().is_some_and(|raw| raw.contains(';')) {
        return Err(invalid_value(name, value, "must not contain ';'"));
    }

    let rule = rule_for(name);
    match rule.kind {
        PropertyKind::Enum => match value.as_str() {
            Some(raw) if rule.enum_values.contains(&raw) => Ok(raw.to_owned()),
            _ => Err(Rejection::new(
                ErrorKind::InvalidValue,
                format!(
                    "Invalid value for {name}: {}. Valid values: {}",
                    display_value(value),
                    rule.enum_values.join(", ")
                ),
            )),
        },
        PropertyKind::Numeric => match number_of(value) {
            Some(number) => Ok(format_number(rule.clamp(number))),
            None => Err(invalid_value(name, value, "expected a number")),
        },
        PropertyKind::Boolean => match flag_of(value) {
            Some(flag) => Ok(if flag { "1" } else { "0" }.to_owned()),
            None => Err(invalid_value(name, value, "expected true, false, 0 or 1")),
        },
        PropertyKind::Color => match value.as_str() {
            Some(raw) => Ok(raw.to_owned()),
            None => Err(invalid_value(name, value, "expected a color string")),
        },
        PropertyKind::Plain => match value {
            Value::String(raw) => Ok(raw.clone()),
            Value::Bool(flag) => Ok(if *flag { "1" } else { "0" }.to_owned()),
            Value::Number(_) => number_of(value)
                .map(format_number)
                .ok_or_else(|| invalid_value(name, value, "expected a finite number")),
            _ => Err(invalid_value(name, value, "expected a scalar value")),
        },
    }
}

/// Splits a relative operation object `{op, value}`.
pub fn parse_operation(raw: &Value) -> Result<(OpKind, Value), Rejection> {
    let object = raw.as_object().ok_or_else(invalid_structure)?;
    let op = match object.get("op") {
        Some(Value::String(op)) if !op.is_empty() => op,
        _ => return Err(invalid_structure()),
    };
    let value = object.get("value").ok_or_else(invalid_structure)?;
    let Some(op) = OpKind::from_name(op) else {
        return Err(Rejection::new(
            ErrorKind::InvalidOperation,
            format!("Invalid operation type: {op}"),
        ));
    };
    Ok((op, value.clone()))
}

fn invalid_structure() -> Rejection {
    Rejection::new(ErrorKind::InvalidOperation, "Invalid operation structure")
}

/// Applies `op` with operand `value` to `current` and clamps the result to the property range.
pub fn resolve_operation(
    name: &str,
    op: OpKind,
    value: f64,
    current: f64,
) -> Result<f64, Rejection> {
    let rule = rule_for(name);
    if !rule.supports(op) {
        return Err(unsupported_operation(rule.kind, op));
    }
    let next = match op {
        OpKind::Set => value,
        OpKind::Increase => current + value,
        OpKind::Decrease => current - value,
        OpKind::Multiply => current * value,
    };
    if !next.is_finite() {
        return Err(Rejection::new(
            ErrorKind::InvalidValue,
            format!("Operation {op} on {name} produced a non-finite value"),
        ));
    }
    Ok(rule.clamp(next))
}

pub fn unsupported_operation(kind: PropertyKind, op: OpKind) -> Rejection {
    Rejection::new(
        ErrorKind::UnsupportedOperation,
        format!("{} properties only support set operation, got {op}", kind.label()),
    )
}

/// Reads a stored style value as a number; anything unparsable counts as zero.
pub fn current_number(raw: Option<&str>) -> f64 {
    raw.and_then(|raw| raw.trim().parse::<f64>().ok()).filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// A finite number, given either as a JSON number or a numeric string.
pub fn number_of(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(raw) => raw.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn flag_of(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => match number.as_f64() {
            Some(n) if n == 0.0 => Some(false),
            Some(n) if n == 1.0 => Some(true),
            _ => None,
        },
        Value::String(raw) => match raw.trim() {
            "0" | "false" => Some(false),
            "1" | "true" => Some(true),
            _ => None,
        },
        _ => None,
    }
}

/// Renders a number the way style strings store it: `2` rather than `2.0`.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_owned();
    }
    value.to_string()
}

fn invalid_value(name: &str, value: &Value, expected: &str) -> Rejection {
    Rejection::new(
        ErrorKind::InvalidValue,
        format!("Invalid value for {name}: {}; {expected}", display_value(value)),
    )
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests;
