//! Operator-level interpretation of page content.
//!
//! Walks a page's operators and reports them to a [`ContentHandler`]:
//! path construction, painting and graphics state operators become
//! [`DrawOp`]s, text showing operators become positioned [`TextRun`]s.
//! Form XObjects are inlined so the handler sees one flat operator stream.

use std::collections::HashMap;

use tablegrid_core::{
    Ctm, DrawOp, ExtractOptions, ExtractWarning, ExtractWarningCode, PaintOp, PathOp, TextRun,
};

use crate::cmap::{ToUnicode, code_of};
use crate::error::BackendError;
use crate::handler::ContentHandler;
use crate::tokenizer::{Operand, Operator, tokenize};

/// Glyph width used when a font has no `/Widths` entry for a code.
const FALLBACK_GLYPH_WIDTH: f64 = 500.0;

/// Interpret a content stream, reporting drawing operations and text runs.
///
/// `resources` is the page's resource dictionary, used to resolve fonts and
/// XObjects.
///
/// # Errors
///
/// Returns [`BackendError::Interpreter`] if the stream cannot be tokenized.
/// Problems inside nested Form XObjects and fonts are reported as warnings.
pub(crate) fn interpret_content_stream<'h>(
    doc: &lopdf::Document,
    content: &[u8],
    resources: &lopdf::Dictionary,
    handler: &'h mut dyn ContentHandler,
    options: &ExtractOptions,
) -> Result<(), BackendError> {
    let operators = tokenize(content)?;
    let mut interpreter = Interpreter {
        doc,
        options,
        handler,
        state: GraphicsState::default(),
        saved: Vec::new(),
    };
    interpreter.execute(&operators, resources, 0);
    Ok(())
}

/// Text state parameters (PDF 32000-1 §9.3) plus the text matrices.
#[derive(Debug, Clone)]
struct TextState {
    matrix: Ctm,
    line_matrix: Ctm,
    font: Option<String>,
    size: f64,
    char_spacing: f64,
    word_spacing: f64,
    /// `Tz` as a fraction (1.0 = 100%).
    horizontal_scaling: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            matrix: Ctm::identity(),
            line_matrix: Ctm::identity(),
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = self
            .line_matrix
            .compose(&Ctm::new(1.0, 0.0, 0.0, 1.0, tx, ty));
        self.matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn set_matrix(&mut self, m: Ctm) {
        self.matrix = m;
        self.line_matrix = m;
    }
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Ctm,
    text: TextState,
}

/// What the interpreter needs from a font: code length, widths and Unicode mapping.
#[derive(Debug, Clone)]
struct FontInfo {
    to_unicode: Option<ToUnicode>,
    code_len: usize,
    first_char: u32,
    widths: Vec<f64>,
    default_width: f64,
}

impl Default for FontInfo {
    fn default() -> Self {
        Self {
            to_unicode: None,
            code_len: 1,
            first_char: 0,
            widths: Vec::new(),
            default_width: FALLBACK_GLYPH_WIDTH,
        }
    }
}

impl FontInfo {
    fn load(doc: &lopdf::Document, dict: &lopdf::Dictionary) -> Self {
        let composite = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .is_some_and(|n| n == b"Type0");

        let to_unicode = dict
            .get(b"ToUnicode")
            .ok()
            .and_then(|o| resolve(doc, o).as_stream().ok())
            .and_then(|s| decode_stream(s).ok())
            .and_then(|bytes| ToUnicode::parse(&bytes).ok());

        if composite {
            let code_len = to_unicode
                .as_ref()
                .and_then(ToUnicode::code_len)
                .unwrap_or(2);
            let default_width = dict
                .get(b"DW")
                .ok()
                .and_then(|o| number(resolve(doc, o)))
                .unwrap_or(1000.0);
            return Self {
                to_unicode,
                code_len,
                first_char: 0,
                widths: Vec::new(),
                default_width,
            };
        }

        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| number(resolve(doc, o)))
            .map_or(0, |n| n.max(0.0) as u32);
        let widths = dict
            .get(b"Widths")
            .ok()
            .and_then(|o| resolve(doc, o).as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|w| number(resolve(doc, w)).unwrap_or(FALLBACK_GLYPH_WIDTH))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            to_unicode,
            code_len: 1,
            first_char,
            widths,
            default_width: FALLBACK_GLYPH_WIDTH,
        }
    }

    fn width(&self, code: u32) -> f64 {
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .unwrap_or(self.default_width)
    }

    fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        bytes.chunks(self.code_len.max(1)).map(code_of).collect()
    }

    fn decode(&self, bytes: &[u8]) -> String {
        if let Some(cmap) = &self.to_unicode {
            return self
                .codes(bytes)
                .into_iter()
                .map(|code| cmap.lookup(code).unwrap_or("\u{FFFD}"))
                .collect();
        }
        if self.code_len == 1 {
            let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
            return text.into_owned();
        }
        self.codes(bytes)
            .into_iter()
            .map(|code| char::from_u32(code).unwrap_or('\u{FFFD}'))
            .collect()
    }
}

struct Interpreter<'a, 'h> {
    doc: &'a lopdf::Document,
    options: &'a ExtractOptions,
    handler: &'h mut dyn ContentHandler,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
}

impl Interpreter<'_, '_> {
    fn emit(&mut self, op: DrawOp) {
        self.handler.on_draw_op(op);
    }

    fn warn(&mut self, code: ExtractWarningCode, description: impl Into<String>) {
        if self.options.collect_warnings {
            self.handler
                .on_warning(ExtractWarning::with_code(code, description));
        }
    }

    fn flush_path(&mut self, path: &mut Vec<PathOp>) {
        if !path.is_empty() {
            self.emit(DrawOp::ConstructPath(std::mem::take(path)));
        }
    }

    fn paint(&mut self, path: &mut Vec<PathOp>, paint: PaintOp) {
        self.flush_path(path);
        self.emit(DrawOp::Paint(paint));
    }

    fn save(&mut self) {
        self.saved.push(self.state.clone());
        self.emit(DrawOp::Save);
    }

    fn restore(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.state = state;
            self.emit(DrawOp::Restore);
        }
    }

    fn execute(&mut self, operators: &[Operator], resources: &lopdf::Dictionary, depth: usize) {
        // saves below this level belong to an enclosing stream
        let floor = self.saved.len();
        let mut fonts: HashMap<String, FontInfo> = HashMap::new();
        let mut path: Vec<PathOp> = Vec::new();

        for op in operators {
            match op.name.as_str() {
                "re" => match op.numbers::<4>() {
                    Some([x, y, width, height]) => path.push(PathOp::Rectangle {
                        x,
                        y,
                        width,
                        height,
                    }),
                    None => self.malformed(op),
                },
                "m" => match op.numbers::<2>() {
                    Some([x, y]) => path.push(PathOp::MoveTo { x, y }),
                    None => self.malformed(op),
                },
                "l" => match op.numbers::<2>() {
                    Some([x, y]) => path.push(PathOp::LineTo { x, y }),
                    None => self.malformed(op),
                },
                "h" => path.push(PathOp::ClosePath),
                // curves never form rulings; keep only the new current point
                "c" => match op.numbers::<6>() {
                    Some([_, _, _, _, x, y]) => path.push(PathOp::MoveTo { x, y }),
                    None => self.malformed(op),
                },
                "v" | "y" => match op.numbers::<4>() {
                    Some([_, _, x, y]) => path.push(PathOp::MoveTo { x, y }),
                    None => self.malformed(op),
                },
                "S" => self.paint(&mut path, PaintOp::Stroke),
                "s" => {
                    path.push(PathOp::ClosePath);
                    self.paint(&mut path, PaintOp::Stroke);
                }
                "f" | "F" | "f*" => self.paint(&mut path, PaintOp::Fill),
                "B" | "B*" => self.paint(&mut path, PaintOp::FillAndStroke),
                "b" | "b*" => {
                    path.push(PathOp::ClosePath);
                    self.paint(&mut path, PaintOp::FillAndStroke);
                }
                "n" => self.paint(&mut path, PaintOp::EndPath),
                // clipping is inert here; the following `n` ends the path
                "W" | "W*" => {}
                _ => {
                    self.flush_path(&mut path);
                    self.state_or_text_op(op, resources, depth, floor, &mut fonts);
                }
            }
        }

        self.flush_path(&mut path);
        while self.saved.len() > floor {
            self.restore();
        }
    }

    fn malformed(&mut self, op: &Operator) {
        self.warn(
            ExtractWarningCode::MalformedPath,
            format!("operator {} has invalid operands", op.name),
        );
    }

    fn state_or_text_op(
        &mut self,
        op: &Operator,
        resources: &lopdf::Dictionary,
        depth: usize,
        floor: usize,
        fonts: &mut HashMap<String, FontInfo>,
    ) {
        match op.name.as_str() {
            "q" => self.save(),
            "Q" => {
                if self.saved.len() > floor {
                    self.restore();
                } else {
                    self.warn(
                        ExtractWarningCode::UnbalancedRestore,
                        "Q without matching q",
                    );
                }
            }
            "cm" => {
                if let Some(m) = op.numbers::<6>() {
                    let m = Ctm::from_array(m);
                    self.state.ctm = self.state.ctm.compose(&m);
                    self.emit(DrawOp::Transform(m));
                }
            }
            "w" => {
                if let Some(width) = op.number(0) {
                    self.emit(DrawOp::SetLineWidth(width));
                }
            }
            "Do" => {
                if let Some(name) = op.operands.first().and_then(Operand::as_name) {
                    self.do_xobject(name, resources, depth);
                }
            }
            _ => {
                self.text_op(op, resources, fonts);
                tracing::trace!(operator = %op.name, "operator passed through");
                self.emit(DrawOp::Other(op.name.clone()));
            }
        }
    }

    fn text_op(
        &mut self,
        op: &Operator,
        resources: &lopdf::Dictionary,
        fonts: &mut HashMap<String, FontInfo>,
    ) {
        let text = &mut self.state.text;
        match op.name.as_str() {
            "BT" => text.set_matrix(Ctm::identity()),
            "Tf" => {
                if let (Some(name), Some(size)) =
                    (op.operands.first().and_then(Operand::as_name), op.number(1))
                {
                    text.font = Some(name.to_string());
                    text.size = size;
                }
            }
            "Tc" => text.char_spacing = op.number(0).unwrap_or(text.char_spacing),
            "Tw" => text.word_spacing = op.number(0).unwrap_or(text.word_spacing),
            "Tz" => {
                if let Some(scale) = op.number(0) {
                    text.horizontal_scaling = scale / 100.0;
                }
            }
            "TL" => text.leading = op.number(0).unwrap_or(text.leading),
            "Ts" => text.rise = op.number(0).unwrap_or(text.rise),
            "Td" => {
                if let Some([tx, ty]) = op.numbers::<2>() {
                    text.move_line(tx, ty);
                }
            }
            "TD" => {
                if let Some([tx, ty]) = op.numbers::<2>() {
                    text.leading = -ty;
                    text.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = op.numbers::<6>() {
                    text.set_matrix(Ctm::from_array(m));
                }
            }
            "T*" => text.next_line(),
            "Tj" => self.show(&op.operands[..op.operands.len().min(1)], resources, fonts),
            "'" => {
                text.next_line();
                self.show(&op.operands[..op.operands.len().min(1)], resources, fonts);
            }
            "\"" => {
                if let Some([aw, ac]) = op.numbers::<2>() {
                    text.word_spacing = aw;
                    text.char_spacing = ac;
                }
                text.next_line();
                self.show(op.operands.get(2..).unwrap_or_default(), resources, fonts);
            }
            "TJ" => {
                if let Some(Operand::Array(parts)) = op.operands.first() {
                    self.show(parts, resources, fonts);
                }
            }
            _ => {}
        }
    }

    fn load_font(
        &mut self,
        name: &str,
        resources: &lopdf::Dictionary,
        fonts: &mut HashMap<String, FontInfo>,
    ) {
        if fonts.contains_key(name) {
            return;
        }
        let info = match font_dict(self.doc, resources, name) {
            Some(dict) => FontInfo::load(self.doc, dict),
            None => {
                self.warn(
                    ExtractWarningCode::MissingFont,
                    format!("font /{name} not found in resources"),
                );
                FontInfo::default()
            }
        };
        fonts.insert(name.to_string(), info);
    }

    /// Emit one text run for the string (or `TJ` array) and advance the text matrix.
    fn show(
        &mut self,
        parts: &[Operand],
        resources: &lopdf::Dictionary,
        fonts: &mut HashMap<String, FontInfo>,
    ) {
        let font_name = self.state.text.font.clone();
        if let Some(name) = &font_name {
            self.load_font(name, resources, fonts);
        }
        let fallback = FontInfo::default();
        let font = font_name
            .as_ref()
            .and_then(|n| fonts.get(n.as_str()))
            .unwrap_or(&fallback);

        let ts = &self.state.text;
        let scaling = ts.horizontal_scaling;
        let rendering = self.state.ctm.compose(&ts.matrix).compose(&Ctm::new(
            ts.size * scaling,
            0.0,
            0.0,
            ts.size,
            0.0,
            ts.rise,
        ));

        let mut text = String::new();
        let mut advance = 0.0;
        for part in parts {
            match part {
                Operand::String(bytes) => {
                    text.push_str(&font.decode(bytes));
                    for code in font.codes(bytes) {
                        let mut tx = font.width(code) / 1000.0 * ts.size + ts.char_spacing;
                        if font.code_len == 1 && code == 32 {
                            tx += ts.word_spacing;
                        }
                        advance += tx * scaling;
                    }
                }
                Operand::Number(n) => advance -= n / 1000.0 * ts.size * scaling,
                _ => {}
            }
        }

        let text_matrix = &mut self.state.text.matrix;
        *text_matrix = text_matrix.compose(&Ctm::new(1.0, 0.0, 0.0, 1.0, advance, 0.0));

        if !text.is_empty() {
            self.handler
                .on_text_run(TextRun::new(text, rendering.to_array()));
        }
    }

    fn do_xobject(&mut self, name: &str, resources: &lopdf::Dictionary, depth: usize) {
        let doc = self.doc;
        let Some(stream) = xobject_stream(doc, resources, name) else {
            self.warn(
                ExtractWarningCode::Other("MISSING_XOBJECT".to_string()),
                format!("XObject /{name} not found in resources"),
            );
            return;
        };

        let is_form = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .is_some_and(|n| n == b"Form");
        if !is_form {
            self.emit(DrawOp::Other("Do".to_string()));
            return;
        }

        if depth + 1 > self.options.max_recursion_depth {
            tracing::warn!(xobject = name, depth, "form XObject nesting limit reached");
            self.warn(
                ExtractWarningCode::ResourceLimitReached,
                format!(
                    "Form XObject /{name} exceeds nesting depth {}",
                    self.options.max_recursion_depth
                ),
            );
            return;
        }

        let operators = match decode_stream(stream).and_then(|bytes| tokenize(&bytes)) {
            Ok(ops) => ops,
            Err(e) => {
                self.warn(
                    ExtractWarningCode::UnsupportedOperator,
                    format!("Form XObject /{name} skipped: {e}"),
                );
                return;
            }
        };

        let form_resources = stream
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|o| resolve(doc, o).as_dict().ok())
            .unwrap_or(resources);

        self.save();
        if let Some(m) = stream.dict.get(b"Matrix").ok().and_then(|o| matrix(doc, o)) {
            self.state.ctm = self.state.ctm.compose(&m);
            self.emit(DrawOp::Transform(m));
        }
        self.execute(&operators, form_resources, depth + 1);
        self.restore();
    }
}

/// Follow one level of indirection. Dangling references stay as they are.
pub(crate) fn resolve<'a>(doc: &'a lopdf::Document, obj: &'a lopdf::Object) -> &'a lopdf::Object {
    match obj {
        lopdf::Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Stream payload with its `/Filter` chain applied.
pub(crate) fn decode_stream(stream: &lopdf::Stream) -> Result<Vec<u8>, BackendError> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| BackendError::Interpreter(format!("stream decompression failed: {e}")))
    } else {
        Ok(stream.content.clone())
    }
}

fn number(obj: &lopdf::Object) -> Option<f64> {
    match obj {
        lopdf::Object::Integer(i) => Some(*i as f64),
        lopdf::Object::Real(f) => Some(f64::from(*f)),
        _ => None,
    }
}

fn matrix(doc: &lopdf::Document, obj: &lopdf::Object) -> Option<Ctm> {
    let arr = resolve(doc, obj).as_array().ok()?;
    if arr.len() != 6 {
        return None;
    }
    let mut m = [0.0; 6];
    for (slot, value) in m.iter_mut().zip(arr) {
        *slot = number(resolve(doc, value))?;
    }
    Some(Ctm::from_array(m))
}

fn named_entry<'a>(
    doc: &'a lopdf::Document,
    resources: &'a lopdf::Dictionary,
    category: &[u8],
    name: &str,
) -> Option<&'a lopdf::Object> {
    let entries = resolve(doc, resources.get(category).ok()?).as_dict().ok()?;
    Some(resolve(doc, entries.get(name.as_bytes()).ok()?))
}

fn font_dict<'a>(
    doc: &'a lopdf::Document,
    resources: &'a lopdf::Dictionary,
    name: &str,
) -> Option<&'a lopdf::Dictionary> {
    named_entry(doc, resources, b"Font", name)?.as_dict().ok()
}

fn xobject_stream<'a>(
    doc: &'a lopdf::Document,
    resources: &'a lopdf::Dictionary,
    name: &str,
) -> Option<&'a lopdf::Stream> {
    named_entry(doc, resources, b"XObject", name)?.as_stream().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Dictionary, Document, Object, Stream, dictionary};

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

    fn run_with(doc: &Document, content: &str, resources: &Dictionary) -> CollectingHandler {
        let mut handler = CollectingHandler::default();
        interpret_content_stream(
            doc,
            content.as_bytes(),
            resources,
            &mut handler,
            &ExtractOptions::default(),
        )
        .unwrap();
        handler
    }

    fn run(content: &str) -> CollectingHandler {
        run_with(&Document::with_version("1.5"), content, &Dictionary::new())
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    /// Resources with a Helvetica-like font /F1 whose glyphs are all 600 units wide.
    fn font_resources(doc: &mut Document) -> Dictionary {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "FirstChar" => 32,
            "Widths" => (32..=126).map(|_| Object::Integer(600)).collect::<Vec<_>>(),
        });
        dictionary! { "Font" => dictionary! { "F1" => font_id } }
    }

    #[test]
    fn path_operators_are_grouped() {
        let h = run("0.5 w 10 10 m 10 90 l 0 0 5 5 re h S");
        assert_eq!(
            h.ops,
            vec![
                DrawOp::SetLineWidth(0.5),
                DrawOp::ConstructPath(vec![
                    PathOp::MoveTo { x: 10.0, y: 10.0 },
                    PathOp::LineTo { x: 10.0, y: 90.0 },
                    PathOp::Rectangle {
                        x: 0.0,
                        y: 0.0,
                        width: 5.0,
                        height: 5.0
                    },
                    PathOp::ClosePath,
                ]),
                DrawOp::Paint(PaintOp::Stroke),
            ]
        );
    }

    #[test]
    fn paint_operator_variants() {
        let h = run("0 0 1 1 re f* 0 0 1 1 re B 0 0 1 1 re b 0 0 1 1 re W n 0 0 1 1 re s");
        let paints: Vec<&DrawOp> = h
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Paint(_)))
            .collect();
        assert_eq!(
            paints,
            vec![
                &DrawOp::Paint(PaintOp::Fill),
                &DrawOp::Paint(PaintOp::FillAndStroke),
                &DrawOp::Paint(PaintOp::FillAndStroke),
                &DrawOp::Paint(PaintOp::EndPath),
                &DrawOp::Paint(PaintOp::Stroke),
            ]
        );
        // b and s close the path first
        assert_eq!(
            h.ops[4],
            DrawOp::ConstructPath(vec![
                PathOp::Rectangle {
                    x: 0.0,
                    y: 0.0,
                    width: 1.0,
                    height: 1.0
                },
                PathOp::ClosePath,
            ])
        );
    }

    #[test]
    fn curves_keep_only_their_end_point() {
        let h = run("0 0 m 1 1 2 2 3 3 c 4 4 5 5 v S");
        assert_eq!(
            h.ops[0],
            DrawOp::ConstructPath(vec![
                PathOp::MoveTo { x: 0.0, y: 0.0 },
                PathOp::MoveTo { x: 3.0, y: 3.0 },
                PathOp::MoveTo { x: 5.0, y: 5.0 },
            ])
        );
    }

    #[test]
    fn state_operators_and_other() {
        let h = run("q 2 0 0 2 10 20 cm 1 0 0 RG Q");
        assert_eq!(
            h.ops,
            vec![
                DrawOp::Save,
                DrawOp::Transform(Ctm::new(2.0, 0.0, 0.0, 2.0, 10.0, 20.0)),
                DrawOp::Other("RG".to_string()),
                DrawOp::Restore,
            ]
        );
    }

    #[test]
    fn unbalanced_restore_warns_and_is_dropped() {
        let h = run("Q 0 0 1 1 re f");
        assert_eq!(
            h.ops[0],
            DrawOp::ConstructPath(vec![PathOp::Rectangle {
                x: 0.0,
                y: 0.0,
                width: 1.0,
                height: 1.0
            }])
        );
        assert_eq!(h.warnings.len(), 1);
        assert_eq!(h.warnings[0].code, ExtractWarningCode::UnbalancedRestore);
    }

    #[test]
    fn open_saves_are_closed_at_end_of_stream() {
        let h = run("q q 1 w");
        assert_eq!(
            h.ops,
            vec![
                DrawOp::Save,
                DrawOp::Save,
                DrawOp::SetLineWidth(1.0),
                DrawOp::Restore,
                DrawOp::Restore,
            ]
        );
    }

    #[test]
    fn malformed_path_operands_warn() {
        let h = run("10 m 0 0 1 1 re S");
        assert_eq!(h.warnings[0].code, ExtractWarningCode::MalformedPath);
        assert_eq!(h.ops.len(), 2);
    }

    #[test]
    fn tokenize_failure_is_an_error() {
        let mut handler = CollectingHandler::default();
        let result = interpret_content_stream(
            &Document::with_version("1.5"),
            b"(unterminated Tj",
            &Dictionary::new(),
            &mut handler,
            &ExtractOptions::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn text_run_position_and_decoding() {
        let mut doc = Document::with_version("1.5");
        let resources = font_resources(&mut doc);
        let h = run_with(
            &doc,
            "BT /F1 10 Tf 72 700 Td (Name) Tj (\\351t\\351) Tj ET",
            &resources,
        );
        assert_eq!(h.runs.len(), 2);
        assert_eq!(h.runs[0].text, "Name");
        assert_close(h.runs[0].x(), 72.0);
        assert_close(h.runs[0].y(), 700.0);
        assert_close(h.runs[0].transform[0], 10.0);
        // 4 glyphs of 600 units at 10pt
        assert_eq!(h.runs[1].text, "été");
        assert_close(h.runs[1].x(), 72.0 + 24.0);
        assert!(h.warnings.is_empty());
        assert!(h.ops.contains(&DrawOp::Other("Tj".to_string())));
    }

    #[test]
    fn text_run_follows_ctm_and_leading() {
        let mut doc = Document::with_version("1.5");
        let resources = font_resources(&mut doc);
        let h = run_with(
            &doc,
            "1 0 0 1 100 50 cm BT /F1 12 Tf 14 TL 0 0 Td (a) Tj T* (b) Tj 5 -2 TD (c) Tj (d) ' ET",
            &resources,
        );
        let positions: Vec<(f64, f64)> = h.runs.iter().map(|r| (r.x(), r.y())).collect();
        assert_eq!(
            positions,
            vec![(100.0, 50.0), (100.0, 36.0), (105.0, 34.0), (105.0, 32.0)]
        );
    }

    #[test]
    fn tj_array_is_one_run_with_kerning() {
        let mut doc = Document::with_version("1.5");
        let resources = font_resources(&mut doc);
        let h = run_with(
            &doc,
            "BT /F1 10 Tf 0 0 Td [(A) -1000 (B)] TJ (C) Tj ET",
            &resources,
        );
        assert_eq!(h.runs[0].text, "AB");
        // 2 glyphs * 6pt + 10pt kerning
        assert_close(h.runs[1].x(), 22.0);
    }

    #[test]
    fn tm_sets_absolute_matrix() {
        let h = run("BT 1 0 0 1 30 40 Tm (x) Tj ET");
        assert_close(h.runs[0].x(), 30.0);
        assert_close(h.runs[0].y(), 40.0);
    }

    #[test]
    fn missing_font_warns_once_and_falls_back() {
        let h = run("BT /F9 10 Tf 0 0 Td (a) Tj (b) Tj ET");
        assert_eq!(h.runs.len(), 2);
        assert_eq!(h.runs[0].text, "a");
        // fallback width 500 units at 10pt
        assert_close(h.runs[1].x(), 5.0);
        let missing: Vec<_> = h
            .warnings
            .iter()
            .filter(|w| w.code == ExtractWarningCode::MissingFont)
            .collect();
        assert_eq!(missing.len(), 1);
    }

    #[test]
    fn warnings_suppressed_when_not_collected() {
        let mut handler = CollectingHandler::default();
        let options = ExtractOptions {
            collect_warnings: false,
            ..ExtractOptions::default()
        };
        interpret_content_stream(
            &Document::with_version("1.5"),
            b"Q BT /F9 10 Tf (a) Tj ET",
            &Dictionary::new(),
            &mut handler,
            &options,
        )
        .unwrap();
        assert!(handler.warnings.is_empty());
        assert_eq!(handler.runs.len(), 1);
    }

    #[test]
    fn to_unicode_font_decodes_two_byte_codes() {
        let mut doc = Document::with_version("1.5");
        let cmap = b"begincmap 1 begincodespacerange <0000> <FFFF> endcodespacerange \
            2 beginbfchar <0001> <4E2D> <0002> <6587> endbfchar endcmap"
            .to_vec();
        let cmap_id = doc.add_object(Stream::new(Dictionary::new(), cmap));
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "SomeCJK",
            "ToUnicode" => cmap_id,
        });
        let resources = dictionary! { "Font" => dictionary! { "F2" => font_id } };
        let h = run_with(&doc, "BT /F2 10 Tf <00010002> Tj (x) Tj ET", &resources);
        assert_eq!(h.runs[0].text, "中文");
        // two codes at the default composite width of 1000 units
        assert_close(h.runs[1].x(), 20.0);
    }

    #[test]
    fn composite_font_takes_code_length_from_cmap() {
        let mut doc = Document::with_version("1.5");
        let cmap = b"begincmap 1 begincodespacerange <00> <FF> endcodespacerange \
            2 beginbfchar <01> <0058> <02> <0059> endbfchar endcmap"
            .to_vec();
        let cmap_id = doc.add_object(Stream::new(Dictionary::new(), cmap));
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "OneByteCID",
            "ToUnicode" => cmap_id,
        });
        let resources = dictionary! { "Font" => dictionary! { "F3" => font_id } };
        let h = run_with(&doc, "BT /F3 10 Tf <0102> Tj ET", &resources);
        assert_eq!(h.runs[0].text, "XY");
    }

    fn form_resources(doc: &mut Document, content: &str, matrix: Option<[i64; 6]>) -> Dictionary {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 100.into(), 100.into()],
        };
        if let Some(m) = matrix {
            dict.set("Matrix", m.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>());
        }
        let form_id = doc.add_object(Stream::new(dict, content.as_bytes().to_vec()));
        dictionary! { "XObject" => dictionary! { "Fm1" => form_id } }
    }

    #[test]
    fn form_xobject_is_inlined() {
        let mut doc = Document::with_version("1.5");
        let resources = form_resources(&mut doc, "0 0 10 1 re f", Some([1, 0, 0, 1, 50, 60]));
        let h = run_with(&doc, "/Fm1 Do", &resources);
        assert_eq!(
            h.ops,
            vec![
                DrawOp::Save,
                DrawOp::Transform(Ctm::new(1.0, 0.0, 0.0, 1.0, 50.0, 60.0)),
                DrawOp::ConstructPath(vec![PathOp::Rectangle {
                    x: 0.0,
                    y: 0.0,
                    width: 10.0,
                    height: 1.0
                }]),
                DrawOp::Paint(PaintOp::Fill),
                DrawOp::Restore,
            ]
        );
    }

    #[test]
    fn form_xobject_cannot_restore_past_its_own_save() {
        let mut doc = Document::with_version("1.5");
        let resources = form_resources(&mut doc, "Q Q", None);
        let h = run_with(&doc, "q /Fm1 Do Q", &resources);
        assert_eq!(
            h.ops,
            vec![DrawOp::Save, DrawOp::Save, DrawOp::Restore, DrawOp::Restore]
        );
        assert_eq!(h.warnings.len(), 2);
    }

    #[test]
    fn recursive_form_xobject_stops_at_depth_limit() {
        let mut doc = Document::with_version("1.5");
        let form_id = doc.new_object_id();
        let resources = dictionary! { "XObject" => dictionary! { "Fm1" => form_id } };
        doc.objects.insert(
            form_id,
            Object::Stream(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "Resources" => resources.clone(),
                },
                b"/Fm1 Do".to_vec(),
            )),
        );
        let options = ExtractOptions {
            max_recursion_depth: 3,
            ..ExtractOptions::default()
        };
        let mut handler = CollectingHandler::default();
        interpret_content_stream(&doc, b"/Fm1 Do", &resources, &mut handler, &options).unwrap();
        let saves = handler.ops.iter().filter(|op| **op == DrawOp::Save).count();
        let restores = handler.ops.iter().filter(|op| **op == DrawOp::Restore).count();
        assert_eq!(saves, 3);
        assert_eq!(restores, 3);
        assert_eq!(
            handler.warnings[0].code,
            ExtractWarningCode::ResourceLimitReached
        );
    }

    #[test]
    fn missing_xobject_warns() {
        let h = run("/Nope Do 0 0 1 1 re f");
        assert_eq!(h.warnings.len(), 1);
        assert_eq!(h.ops.len(), 2);
    }

    #[test]
    fn image_xobject_is_inert() {
        let mut doc = Document::with_version("1.5");
        let image_id = doc.add_object(Stream::new(
            dictionary! { "Type" => "XObject", "Subtype" => "Image", "Width" => 1, "Height" => 1 },
            vec![0],
        ));
        let resources = dictionary! { "XObject" => dictionary! { "Im1" => image_id } };
        let h = run_with(&doc, "/Im1 Do", &resources);
        assert_eq!(h.ops, vec![DrawOp::Other("Do".to_string())]);
        assert!(h.warnings.is_empty());
    }
}
