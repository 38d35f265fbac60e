//! Content handler callback trait for content stream interpretation.
//!
//! The interpreter reports what it finds on a page through a
//! [`ContentHandler`]: the operator stream as [`DrawOp`]s, the text stream as
//! [`TextRun`]s and any non-fatal anomalies as [`ExtractWarning`]s.

use tablegrid_core::{DrawOp, ExtractWarning, TextRun};

/// Callback handler for content stream interpretation.
///
/// All methods have default no-op implementations, allowing handlers to
/// subscribe only to the events they care about.
pub trait ContentHandler {
    /// Called for every drawing operation, in content stream order.
    ///
    /// Consecutive path construction operators arrive grouped in one
    /// [`DrawOp::ConstructPath`]. Form XObjects arrive inlined between a
    /// [`DrawOp::Save`] and a [`DrawOp::Restore`].
    fn on_draw_op(&mut self, _op: DrawOp) {}

    /// Called once per text showing operator with the decoded run.
    fn on_text_run(&mut self, _run: TextRun) {}

    /// Called when a non-fatal warning is encountered during interpretation.
    fn on_warning(&mut self, _warning: ExtractWarning) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablegrid_core::{ExtractWarningCode, PaintOp};

    #[derive(Default)]
    struct CollectingHandler {
        ops: Vec<DrawOp>,
        runs: Vec<TextRun>,
        warnings: Vec<ExtractWarning>,
    }

    impl ContentHandler for CollectingHandler {
        fn on_draw_op(&mut self, op: DrawOp) {
            self.ops.push(op);
        }

        fn on_text_run(&mut self, run: TextRun) {
            self.runs.push(run);
        }

        fn on_warning(&mut self, warning: ExtractWarning) {
            self.warnings.push(warning);
        }
    }

    struct NoopHandler;
    impl ContentHandler for NoopHandler {}

    #[test]
    fn noop_handler_accepts_everything() {
        let mut handler = NoopHandler;
        handler.on_draw_op(DrawOp::Save);
        handler.on_text_run(TextRun::at("x", 0.0, 0.0));
        handler.on_warning(ExtractWarning::with_code(
            ExtractWarningCode::MissingFont,
            "F1",
        ));
    }

    #[test]
    fn collecting_handler_via_trait_object() {
        let mut collector = CollectingHandler::default();
        {
            let handler: &mut dyn ContentHandler = &mut collector;
            handler.on_draw_op(DrawOp::Paint(PaintOp::Stroke));
            handler.on_text_run(TextRun::at("cell", 10.0, 20.0));
            handler.on_warning(ExtractWarning::with_code(
                ExtractWarningCode::UnsupportedOperator,
                "sh",
            ));
        }
        assert_eq!(collector.ops, vec![DrawOp::Paint(PaintOp::Stroke)]);
        assert_eq!(collector.runs[0].text, "cell");
        assert_eq!(collector.warnings.len(), 1);
    }
}
