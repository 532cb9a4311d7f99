// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Mermaid text to native documents.

pub mod flowchart;
mod ident;

pub use flowchart::{
    layered_positions, parse_flowchart, to_document, Direction, FlowEdge, FlowNode, Flowchart,
    FlowchartParseError, NodeShape,
};
pub use ident::NodeIdError;

use crate::bridge::{DiagramParser, ParseCallbacks, ParseMode, ParserFault};
use crate::model::{CellSpec, Geometry, NativeDocument, Style};

const SOURCE_STYLE: &str = "shape=mermaid;whiteSpace=wrap;html=1;";

/// Converts `text` for the given mode.
///
/// Both modes validate the text. `PreserveSource` returns one cell holding the source, sized to
/// the box the editable layout would occupy.
pub fn convert(text: &str, mode: ParseMode) -> Result<NativeDocument, FlowchartParseError> {
    let chart = parse_flowchart(text)?;
    let document = to_document(&chart);
    match mode {
        ParseMode::Editable => Ok(document),
        ParseMode::PreserveSource => Ok(source_document(text, &document)),
    }
}

fn source_document(text: &str, layout: &NativeDocument) -> NativeDocument {
    let mut bounds: Option<(f64, f64, f64, f64)> = None;
    for cell in layout.cells() {
        let g = cell.geometry();
        if g.width <= 0.0 || g.height <= 0.0 {
            continue;
        }
        let (x0, y0, x1, y1) = bounds.unwrap_or((g.x, g.y, g.x + g.width, g.y + g.height));
        bounds = Some((x0.min(g.x), y0.min(g.y), x1.max(g.x + g.width), y1.max(g.y + g.height)));
    }
    let (x0, y0, x1, y1) = bounds.unwrap_or_default();
    let cell = CellSpec::vertex("mermaid", text, Geometry::new(0.0, 0.0, x1 - x0, y1 - y0))
        .with_style(Style::parse(SOURCE_STYLE));
    NativeDocument::new(vec![cell])
}

fn fault(err: &FlowchartParseError) -> ParserFault {
    let line = u32::try_from(err.line_no()).unwrap_or(u32::MAX);
    ParserFault::new(err.to_string()).at_line(line)
}

fn settle(text: &str, mode: ParseMode, callbacks: ParseCallbacks) {
    match convert(text, mode) {
        Ok(document) => {
            tracing::debug!(cells = document.len(), ?mode, "flowchart converted");
            callbacks.succeed(document);
        }
        Err(err) => {
            tracing::debug!(line = err.line_no(), "flowchart rejected: {err}");
            callbacks.fail(fault(&err));
        }
    }
}

/// [`DiagramParser`] for Mermaid flowcharts.
///
/// Inside a tokio runtime the conversion runs on the blocking pool and reports through the
/// callbacks; elsewhere it settles before `parse` returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowchartParser;

impl DiagramParser for FlowchartParser {
    fn parse(
        &self,
        text: String,
        mode: ParseMode,
        callbacks: ParseCallbacks,
    ) -> Result<(), ParserFault> {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || settle(&text, mode, callbacks));
            }
            Err(_) => settle(&text, mode, callbacks),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::bridge::{parse_with_deadline, ErrorPosition, ParseFailure};
    use crate::model::CellKind;

    const TWO_STEP: &str = "flowchart TD\nA[Start] -->|go| B{Done?}";

    #[test]
    fn preserve_source_keeps_text_in_one_cell() {
        let document = convert(TWO_STEP, ParseMode::PreserveSource).expect("convert");
        assert_eq!(document.len(), 1);
        let cell = &document.cells()[0];
        assert_eq!(cell.kind(), CellKind::Vertex);
        assert_eq!(cell.value(), TWO_STEP);
        assert_eq!(cell.style().get("shape"), Some("mermaid"));
        // A spans x 280..400, B spans 280..390; rows start at y 80 and 200.
        assert_eq!((cell.geometry().width, cell.geometry().height), (120.0, 200.0));
    }

    #[test]
    fn preserve_source_still_rejects_bad_text() {
        assert!(matches!(
            convert("flowchart TD\nA -->", ParseMode::PreserveSource),
            Err(FlowchartParseError::MissingEdgeEnd { .. })
        ));
    }

    #[tokio::test]
    async fn parser_reports_through_callbacks() {
        let parser = FlowchartParser;
        let document = parse_with_deadline(&parser, TWO_STEP.to_owned(), Duration::from_secs(5), true)
            .await
            .expect("parse");
        assert_eq!(document.len(), 3);
    }

    #[tokio::test]
    async fn parser_errors_carry_the_line() {
        let parser = FlowchartParser;
        let failure = parse_with_deadline(
            &parser,
            "flowchart TD\nA --> B\nC -->|x D".to_owned(),
            Duration::from_secs(5),
            true,
        )
        .await
        .expect_err("unclosed label");
        assert_eq!(
            failure,
            ParseFailure::Parse {
                message: "Parse error on line 3: unclosed edge label".to_owned(),
                position: Some(ErrorPosition { line: Some(3), column: None, position: None }),
            }
        );
        assert_eq!(
            failure.response_message(),
            "Parse error on line 3: unclosed edge label (at line 3)"
        );
    }
}
