//! Content-stream text interpreter
//!
//! Walks the decoded operators of a page and emits one [`TextRun`] per text
//! showing operator, in content order, with marked-content boundaries kept as
//! marker items. Only the text and transform state is tracked; paths, images
//! and form XObjects are ignored.

use crate::fonts::PageFont;
use crate::text::{MarkedContent, Matrix, TextContentItem, TextRun};
use crate::EngineConfig;
use lopdf::content::Operation;
use lopdf::Object;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct TextState {
    font_id: Option<String>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horiz_scaling: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_id: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horiz_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Run being accumulated while a show operator is processed
struct PendingRun {
    text: String,
    transform: Matrix,
    advance: f32,
}

pub(crate) struct TextInterpreter<'a> {
    fonts: &'a BTreeMap<String, PageFont>,
    config: &'a EngineConfig,
    unknown_font: PageFont,
    ctm: Matrix,
    state: TextState,
    stack: Vec<(Matrix, TextState)>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    items: Vec<TextContentItem>,
}

fn operand(operands: &[Object], index: usize) -> f32 {
    operands
        .get(index)
        .and_then(|o| o.as_float().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn string_bytes(obj: &Object) -> Option<&[u8]> {
    match obj {
        Object::String(bytes, _) => Some(bytes.as_slice()),
        _ => None,
    }
}

fn name(obj: Option<&Object>) -> String {
    match obj {
        Some(Object::Name(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
        _ => String::new(),
    }
}

impl<'a> TextInterpreter<'a> {
    pub(crate) fn new(fonts: &'a BTreeMap<String, PageFont>, config: &'a EngineConfig) -> Self {
        Self {
            fonts,
            config,
            unknown_font: PageFont::unknown(),
            ctm: Matrix::IDENTITY,
            state: TextState::default(),
            stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            items: Vec::new(),
        }
    }

    pub(crate) fn run(mut self, operations: &[Operation]) -> Vec<TextContentItem> {
        for op in operations {
            self.apply(op);
        }
        self.items
    }

    fn apply(&mut self, op: &Operation) {
        let args = op.operands.as_slice();
        match op.operator.as_str() {
            "q" => self.stack.push((self.ctm, self.state.clone())),
            "Q" => {
                if let Some((ctm, state)) = self.stack.pop() {
                    self.ctm = ctm;
                    self.state = state;
                }
            }
            "cm" => {
                let m = Matrix::new(
                    operand(args, 0),
                    operand(args, 1),
                    operand(args, 2),
                    operand(args, 3),
                    operand(args, 4),
                    operand(args, 5),
                );
                self.ctm = m.concat(&self.ctm);
            }
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "Tf" => {
                self.state.font_id = Some(name(args.first()));
                self.state.font_size = operand(args, 1);
            }
            "Tc" => self.state.char_spacing = operand(args, 0),
            "Tw" => self.state.word_spacing = operand(args, 0),
            "Tz" => self.state.horiz_scaling = operand(args, 0) / 100.0,
            "TL" => self.state.leading = operand(args, 0),
            "Ts" => self.state.rise = operand(args, 0),
            "Td" => self.move_line(operand(args, 0), operand(args, 1)),
            "TD" => {
                self.state.leading = -operand(args, 1);
                self.move_line(operand(args, 0), operand(args, 1));
            }
            "Tm" => {
                self.line_matrix = Matrix::new(
                    operand(args, 0),
                    operand(args, 1),
                    operand(args, 2),
                    operand(args, 3),
                    operand(args, 4),
                    operand(args, 5),
                );
                self.text_matrix = self.line_matrix;
            }
            "T*" => self.move_line(0.0, -self.state.leading),
            "Tj" => {
                if let Some(bytes) = args.first().and_then(string_bytes) {
                    self.show(&[TextElement::Glyphs(bytes)]);
                }
            }
            "'" => {
                self.move_line(0.0, -self.state.leading);
                if let Some(bytes) = args.first().and_then(string_bytes) {
                    self.show(&[TextElement::Glyphs(bytes)]);
                }
            }
            "\"" => {
                self.state.word_spacing = operand(args, 0);
                self.state.char_spacing = operand(args, 1);
                self.move_line(0.0, -self.state.leading);
                if let Some(bytes) = args.get(2).and_then(string_bytes) {
                    self.show(&[TextElement::Glyphs(bytes)]);
                }
            }
            "TJ" => {
                let elements: Vec<TextElement> = match args.first() {
                    Some(Object::Array(list)) => list
                        .iter()
                        .filter_map(|item| match item {
                            Object::String(bytes, _) => Some(TextElement::Glyphs(bytes.as_slice())),
                            other => other.as_float().ok().map(TextElement::Adjust),
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                self.show(&elements);
            }
            "BMC" | "BDC" => self.items.push(TextContentItem::Marker(MarkedContent::Begin {
                tag: name(args.first()),
            })),
            "EMC" => self.items.push(TextContentItem::Marker(MarkedContent::End)),
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translate(tx, ty).concat(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn font(&self) -> &PageFont {
        self.state
            .font_id
            .as_ref()
            .and_then(|id| self.fonts.get(id))
            .unwrap_or(&self.unknown_font)
    }

    /// Text rendering matrix at the current text position
    fn rendering_matrix(&self) -> Matrix {
        let s = &self.state;
        Matrix::new(s.font_size * s.horiz_scaling, 0.0, 0.0, s.font_size, 0.0, s.rise)
            .concat(&self.text_matrix)
            .concat(&self.ctm)
    }

    fn advance(&mut self, tx: f32) {
        self.text_matrix = Matrix::translate(tx, 0.0).concat(&self.text_matrix);
    }

    fn show(&mut self, elements: &[TextElement<'_>]) {
        let font_id = self.state.font_id.clone().unwrap_or_default();
        let gap_threshold = self.config.space_gap_ratio * self.state.font_size * self.state.horiz_scaling;
        let mut pending: Option<PendingRun> = None;

        for element in elements {
            match element {
                TextElement::Glyphs(bytes) => {
                    let glyphs = self.font().decode(bytes);
                    let two_byte = self.font().is_two_byte();
                    for (code, text) in glyphs {
                        let width = self.font().glyph_width(code, self.config.fallback_glyph_width) / 1000.0;
                        let word_spacing = if !two_byte && code == 32 { self.state.word_spacing } else { 0.0 };
                        let tx = (width * self.state.font_size + self.state.char_spacing + word_spacing)
                            * self.state.horiz_scaling;

                        let run = pending.get_or_insert_with(|| PendingRun {
                            text: String::new(),
                            transform: self.rendering_matrix(),
                            advance: 0.0,
                        });
                        run.text.push_str(&text);
                        run.advance += tx;
                        self.advance(tx);
                    }
                }
                TextElement::Adjust(amount) => {
                    let tx = -amount / 1000.0 * self.state.font_size * self.state.horiz_scaling;
                    let splits = gap_threshold > 0.0 && tx > gap_threshold;

                    match pending.take() {
                        Some(run) if splits => {
                            self.emit(run, &font_id);
                            let gap = PendingRun {
                                text: " ".to_string(),
                                transform: self.rendering_matrix(),
                                advance: tx,
                            };
                            self.advance(tx);
                            self.emit(gap, &font_id);
                        }
                        Some(mut run) => {
                            run.advance += tx;
                            self.advance(tx);
                            pending = Some(run);
                        }
                        None => self.advance(tx),
                    }
                }
            }
        }

        if let Some(run) = pending {
            self.emit(run, &font_id);
        }
    }

    fn emit(&mut self, run: PendingRun, font_id: &str) {
        if run.text.is_empty() {
            return;
        }
        let scale = self.text_matrix.concat(&self.ctm).horizontal_scale();
        self.items.push(TextContentItem::Run(TextRun {
            text: run.text,
            transform: run.transform,
            width: run.advance * scale,
            font_id: font_id.to_string(),
        }));
    }
}

enum TextElement<'b> {
    Glyphs(&'b [u8]),
    Adjust(f32),
}
