// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Transactions against the live document model.
//!
//! Every entry point brackets its mutations in one `begin_update`/`end_update` pair so a request
//! produces a single change notification and a single undo step.
//!
//! Insertion is all-or-nothing from the caller's point of view: it returns the inserted cells or
//! an [`InsertError`]. A failed import may still leave cells behind in the model; only the
//! selection is restored. Style application is best-effort and reports per-property failures in
//! its [`StyleOutcome`].

use serde_json::{Map, Value};

use crate::model::{CellId, DocumentModel, ModelError, NativeDocument};
use crate::protocol::{ErrorKind, GenerateOptions, PropertyError, Rejection};
use crate::style::{self, OpKind, PropertyKind};

pub const DEFAULT_OFFSET: (f64, f64) = (20.0, 20.0);
pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 10.0;

/// Style keys forced onto every inserted cell so parser output is always user-editable.
const EDITABLE_STYLES: &[(&str, &str)] = &[
    ("locked", "0"),
    ("movable", "1"),
    ("resizable", "1"),
    ("editable", "1"),
    ("deletable", "1"),
    ("rotatable", "1"),
    ("connectable", "1"),
];

/// Runs `f` inside one model transaction.
pub fn with_update<M, T>(model: &mut M, f: impl FnOnce(&mut M) -> T) -> T
where
    M: DocumentModel + ?Sized,
{
    model.begin_update();
    let out = f(model);
    model.end_update();
    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsertOptions {
    pub dx: f64,
    pub dy: f64,
    pub scale: Option<f64>,
    pub select: bool,
    pub center: bool,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self { dx: DEFAULT_OFFSET.0, dy: DEFAULT_OFFSET.1, scale: None, select: true, center: false }
    }
}

impl From<&GenerateOptions> for InsertOptions {
    fn from(options: &GenerateOptions) -> Self {
        let defaults = Self::default();
        let position = options.position.unwrap_or_default();
        Self {
            dx: position.x.filter(|x| x.is_finite()).unwrap_or(defaults.dx),
            dy: position.y.filter(|y| y.is_finite()).unwrap_or(defaults.dy),
            scale: options.scale,
            select: options.select.unwrap_or(defaults.select),
            center: options.center.unwrap_or(defaults.center),
        }
    }
}

impl InsertOptions {
    /// The scale factor to apply, if one was given and lies within [`MIN_SCALE`, `MAX_SCALE`].
    pub fn effective_scale(&self) -> Option<f64> {
        self.scale.filter(|scale| (MIN_SCALE..=MAX_SCALE).contains(scale))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertOutcome {
    pub cell_count: usize,
    pub cells: Vec<CellId>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InsertError {
    #[error("No cells were inserted")]
    Empty,
    #[error("Failed to insert diagram: {0}")]
    Model(#[from] ModelError),
}

impl InsertError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InsertFailed
    }
}

/// Inserts `document` into the default layer.
pub fn insert<M>(
    model: &mut M,
    document: NativeDocument,
    options: &InsertOptions,
) -> Result<InsertOutcome, InsertError>
where
    M: DocumentModel + ?Sized,
{
    let previous_selection = model.selection();
    with_update(model, |model| {
        let result = insert_cells(model, document, options);
        if let Err(err) = &result {
            tracing::error!(error = %err, "diagram insertion failed, restoring selection");
            model.set_selection(&previous_selection);
        }
        result
    })
}

fn insert_cells<M>(
    model: &mut M,
    document: NativeDocument,
    options: &InsertOptions,
) -> Result<InsertOutcome, InsertError>
where
    M: DocumentModel + ?Sized,
{
    let cells = model.import_document(document, options.dx, options.dy)?;
    let Some(first) = cells.first().cloned() else {
        return Err(InsertError::Empty);
    };

    let mut touched = Vec::with_capacity(cells.len());
    for cell in &cells {
        touched.push(cell.clone());
        touched.extend(model.descendants(cell));
    }
    for (key, value) in EDITABLE_STYLES {
        model.set_cell_styles(key, value, &touched)?;
    }

    match options.effective_scale() {
        Some(scale) => model.scale_cells(&cells, scale, scale)?,
        None if options.scale.is_some() => {
            tracing::debug!(scale = ?options.scale, "ignoring out-of-range scale");
        }
        None => {}
    }

    if options.select {
        model.set_selection(&cells);
    }
    model.scroll_cell_to_visible(&first, options.center);
    model.set_modified(true);

    Ok(InsertOutcome { cell_count: cells.len(), cells })
}

/// Replaces the whole document with `document`. Returns the number of root cells.
pub fn replace<M>(model: &mut M, document: NativeDocument) -> Result<usize, InsertError>
where
    M: DocumentModel + ?Sized,
{
    with_update(model, |model| {
        let cells = model.replace_document(document)?;
        model.set_modified(true);
        Ok(cells.len())
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyleOutcome {
    pub modified_count: usize,
    pub errors: Vec<PropertyError>,
}

impl StyleOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

fn property_error(property: &str, rejection: Rejection) -> PropertyError {
    PropertyError {
        property: property.to_owned(),
        error: rejection.message,
        error_kind: rejection.kind,
    }
}

/// Applies absolute `styles`, then relative `operations`, to `cells` in one transaction.
pub fn apply_styles<M>(
    model: &mut M,
    cells: &[CellId],
    styles: Option<&Map<String, Value>>,
    operations: Option<&Map<String, Value>>,
) -> StyleOutcome
where
    M: DocumentModel + ?Sized,
{
    let mut outcome = StyleOutcome::default();
    with_update(model, |model| {
        if let Some(styles) = styles {
            tracing::debug!(properties = styles.len(), cells = cells.len(), "applying absolute styles");
            let failed = apply_group(styles, &mut outcome.errors, |name, value| {
                apply_absolute(model, cells, name, value)
            });
            if failed < styles.len() {
                outcome.modified_count = cells.len();
            }
        }
        if let Some(operations) = operations {
            tracing::debug!(
                properties = operations.len(),
                cells = cells.len(),
                "applying relative operations"
            );
            let failed = apply_group(operations, &mut outcome.errors, |name, raw| {
                apply_operation(model, cells, name, raw)
            });
            if failed < operations.len() {
                outcome.modified_count = outcome.modified_count.max(cells.len());
            }
        }
        if outcome.modified_count > 0 {
            model.set_modified(true);
        }
    });
    outcome
}

fn apply_group(
    group: &Map<String, Value>,
    errors: &mut Vec<PropertyError>,
    mut apply: impl FnMut(&str, &Value) -> Result<(), Rejection>,
) -> usize {
    let mut failed = 0;
    for (name, value) in group {
        if let Err(rejection) = apply(name, value) {
            tracing::warn!(property = %name, kind = %rejection.kind, "{}", rejection.message);
            errors.push(property_error(name, rejection));
            failed += 1;
        }
    }
    failed
}

fn apply_absolute<M>(model: &mut M, cells: &[CellId], name: &str, value: &Value) -> Result<(), Rejection>
where
    M: DocumentModel + ?Sized,
{
    let stored = style::validate_property(name, value)?;
    let targets = style::filter_for_property(cells, name, &*model);
    if targets.is_empty() {
        return Ok(());
    }
    model
        .set_cell_styles(name, &stored, &targets)
        .map_err(|err| Rejection::new(ErrorKind::InvalidProperty, err.to_string()))
}

fn apply_operation<M>(model: &mut M, cells: &[CellId], name: &str, raw: &Value) -> Result<(), Rejection>
where
    M: DocumentModel + ?Sized,
{
    if !crate::model::is_valid_style_key(name) {
        return Err(Rejection::new(
            ErrorKind::InvalidProperty,
            format!("Invalid property name: {name:?}"),
        ));
    }
    let (op, value) = style::parse_operation(raw)?;
    let rule = style::rule_for(name);
    if !rule.supports(op) {
        return Err(style::unsupported_operation(rule.kind, op));
    }

    let targets = style::filter_for_property(cells, name, &*model);
    let model_error = |err: ModelError| Rejection::new(ErrorKind::InvalidOperation, err.to_string());

    if op == OpKind::Set && !matches!(rule.kind, PropertyKind::Numeric | PropertyKind::Plain) {
        let stored = style::validate_property(name, &value)?;
        if !targets.is_empty() {
            model.set_cell_styles(name, &stored, &targets).map_err(model_error)?;
        }
        return Ok(());
    }

    let Some(operand) = style::number_of(&value) else {
        return Err(Rejection::new(
            ErrorKind::InvalidOperation,
            format!("Operation {op} on {name} needs a numeric value"),
        ));
    };
    for cell in &targets {
        let current = style::current_number(model.style_value(cell, name).as_deref());
        let next = style::resolve_operation(name, op, operand, current)?;
        model
            .set_cell_styles(name, &style::format_number(next), std::slice::from_ref(cell))
            .map_err(model_error)?;
    }
    Ok(())
}
