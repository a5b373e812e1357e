//! Content-stream interpreter for the lopdf backend.
//!
//! Walks a page's decoded operators and produces positioned text fragments
//! and rectangle/line objects. Only the state that affects where text and
//! rectangles land is tracked:
//!
//! | Operator                 | Action                                  |
//! |--------------------------|-----------------------------------------|
//! | `q` `Q` `cm`             | graphics state stack, CTM               |
//! | `BT` `ET`                | reset text and line matrices            |
//! | `Tf` `Tc` `Tw` `Tz` `TL` `Ts` | text state parameters              |
//! | `Tm` `Td` `TD` `T*`      | text positioning                        |
//! | `Tj` `TJ` `'` `"`        | text showing                            |
//! | `m` `l` `re` `h`         | path construction                       |
//! | `S` `s` `f` `F` `f*` `B` `B*` `b` `b*` `n` | path painting         |
//! | `Do`                     | form XObjects, recursively              |

use std::collections::HashMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object};

use super::fonts::FontDecoder;
use super::lopdf_backend::{number, resolve, stream_bytes};
use super::{BBox, RectObject, TextFragment};
use crate::error::PdfRowsError;

/// Nested form XObjects deeper than this are skipped.
const MAX_FORM_DEPTH: usize = 8;

/// Glyph box extents relative to the baseline, in em.
const DESCENT: f64 = -0.2;
const ASCENT: f64 = 0.8;

/// A TJ adjustment of at least this many em starts a new fragment.
const FRAGMENT_BREAK_EM: f64 = 1.0;

/// A TJ adjustment of at least this many em is read as a space.
const SPACE_GAP_EM: f64 = 0.2;

/// Affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix([f64; 6]);

impl Matrix {
    pub const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Matrix([a, b, c, d, e, f])
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self` applied first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        if operands.len() < 6 {
            return None;
        }
        let mut m = [0.0; 6];
        for (slot, obj) in m.iter_mut().zip(operands) {
            *slot = number(obj)?;
        }
        Some(Matrix(m))
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Option<Vec<u8>>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    horiz_scale: f64,
    leading: f64,
    rise: f64,
}

impl GraphicsState {
    fn new(ctm: Matrix) -> Self {
        GraphicsState {
            ctm,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horiz_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum PathItem {
    Rect([(f64, f64); 4]),
    Line((f64, f64), (f64, f64)),
}

/// Text accumulated for one fragment, in device space (y up).
#[derive(Debug, Default)]
struct PendingText {
    text: String,
    bounds: Option<(f64, f64, f64, f64)>,
}

impl PendingText {
    fn extend(&mut self, points: &[(f64, f64)]) {
        for &(x, y) in points {
            self.bounds = Some(match self.bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
    }
}

/// Page-level output of the interpreter, in top-left page coordinates.
#[derive(Debug, Default)]
pub struct PageGraphics {
    pub fragments: Vec<TextFragment>,
    pub rects: Vec<RectObject>,
}

/// Interpret one page's content stream.
///
/// `media_box` is `[x0, y0, x1, y1]` in PDF user space; output coordinates
/// are relative to its top-left corner.
pub fn interpret_page<'a>(
    doc: &'a Document,
    content: &[u8],
    resources: Option<&'a Dictionary>,
    media_box: [f64; 4],
) -> Result<PageGraphics, PdfRowsError> {
    let content = Content::decode(content)
        .map_err(|e| PdfRowsError::document("failed to decode page content stream", e))?;

    let mut interpreter = Interpreter {
        doc,
        x_origin: media_box[0].min(media_box[2]),
        y_top: media_box[1].max(media_box[3]),
        output: PageGraphics::default(),
    };
    interpreter.run(
        &content.operations,
        resources,
        GraphicsState::new(Matrix::IDENTITY),
        0,
    );
    Ok(interpreter.output)
}

struct Interpreter<'a> {
    doc: &'a Document,
    x_origin: f64,
    y_top: f64,
    output: PageGraphics,
}

impl<'a> Interpreter<'a> {
    fn run(
        &mut self,
        operations: &[Operation],
        resources: Option<&'a Dictionary>,
        initial: GraphicsState,
        depth: usize,
    ) {
        let mut fonts: HashMap<Vec<u8>, FontDecoder> = HashMap::new();
        let fallback = FontDecoder::fallback();
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut gs = initial;
        let mut tm = Matrix::IDENTITY;
        let mut tlm = Matrix::IDENTITY;
        let mut path: Vec<PathItem> = Vec::new();
        let mut current_point: Option<(f64, f64)> = None;
        let mut subpath_start: Option<(f64, f64)> = None;

        for op in operations {
            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => stack.push(gs.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        gs = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        gs.ctm = m.then(&gs.ctm);
                    }
                }

                "BT" => {
                    tm = Matrix::IDENTITY;
                    tlm = Matrix::IDENTITY;
                }
                "ET" => {}
                "Tf" => {
                    if let [Object::Name(name), size, ..] = operands {
                        gs.font = Some(name.clone());
                        gs.font_size = number(size).unwrap_or(0.0);
                        if !fonts.contains_key(name) {
                            let decoder = self.load_font(resources, name);
                            fonts.insert(name.clone(), decoder);
                        }
                    }
                }
                "Tc" => set_number(operands, &mut gs.char_spacing),
                "Tw" => set_number(operands, &mut gs.word_spacing),
                "TL" => set_number(operands, &mut gs.leading),
                "Ts" => set_number(operands, &mut gs.rise),
                "Tz" => {
                    if let Some(v) = operands.first().and_then(number) {
                        gs.horiz_scale = v / 100.0;
                    }
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        tm = m;
                        tlm = m;
                    }
                }
                "Td" | "TD" => {
                    if let [tx, ty, ..] = operands {
                        let tx = number(tx).unwrap_or(0.0);
                        let ty = number(ty).unwrap_or(0.0);
                        if op.operator == "TD" {
                            gs.leading = -ty;
                        }
                        tlm = Matrix::translate(tx, ty).then(&tlm);
                        tm = tlm;
                    }
                }
                "T*" => {
                    tlm = Matrix::translate(0.0, -gs.leading).then(&tlm);
                    tm = tlm;
                }

                "Tj" | "'" | "\"" => {
                    let string_operand = match op.operator.as_str() {
                        "\"" => {
                            if let [aw, ac, ..] = operands {
                                gs.word_spacing = number(aw).unwrap_or(gs.word_spacing);
                                gs.char_spacing = number(ac).unwrap_or(gs.char_spacing);
                            }
                            operands.get(2)
                        }
                        _ => operands.first(),
                    };
                    if op.operator != "Tj" {
                        tlm = Matrix::translate(0.0, -gs.leading).then(&tlm);
                        tm = tlm;
                    }
                    if let Some(Object::String(bytes, _)) = string_operand {
                        let font = font_for(&fonts, &gs, &fallback);
                        let mut pending = PendingText::default();
                        self.show(&gs, font, &mut tm, bytes, &mut pending);
                        self.flush(&mut pending);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        let font = font_for(&fonts, &gs, &fallback);
                        let mut pending = PendingText::default();
                        for item in items {
                            match item {
                                Object::String(bytes, _) => {
                                    self.show(&gs, font, &mut tm, bytes, &mut pending);
                                }
                                other => {
                                    let Some(adjust) = number(other) else { continue };
                                    let gap_em = -adjust / 1000.0;
                                    if gap_em >= FRAGMENT_BREAK_EM {
                                        self.flush(&mut pending);
                                    } else if gap_em >= SPACE_GAP_EM && !pending.text.ends_with(' ')
                                    {
                                        pending.text.push(' ');
                                    }
                                    let tx = gap_em * gs.font_size * gs.horiz_scale;
                                    tm = Matrix::translate(tx, 0.0).then(&tm);
                                }
                            }
                        }
                        self.flush(&mut pending);
                    }
                }

                "m" => {
                    if let [x, y, ..] = operands {
                        let p = gs.ctm.apply(number(x).unwrap_or(0.0), number(y).unwrap_or(0.0));
                        current_point = Some(p);
                        subpath_start = Some(p);
                    }
                }
                "l" => {
                    if let [x, y, ..] = operands {
                        let p = gs.ctm.apply(number(x).unwrap_or(0.0), number(y).unwrap_or(0.0));
                        if let Some(from) = current_point {
                            path.push(PathItem::Line(from, p));
                        }
                        current_point = Some(p);
                    }
                }
                "h" => {
                    if let (Some(from), Some(start)) = (current_point, subpath_start) {
                        if from != start {
                            path.push(PathItem::Line(from, start));
                        }
                        current_point = Some(start);
                    }
                }
                "re" => {
                    if let [x, y, w, h, ..] = operands {
                        let (x, y) = (number(x).unwrap_or(0.0), number(y).unwrap_or(0.0));
                        let (w, h) = (number(w).unwrap_or(0.0), number(h).unwrap_or(0.0));
                        path.push(PathItem::Rect([
                            gs.ctm.apply(x, y),
                            gs.ctm.apply(x + w, y),
                            gs.ctm.apply(x + w, y + h),
                            gs.ctm.apply(x, y + h),
                        ]));
                        let start = gs.ctm.apply(x, y);
                        current_point = Some(start);
                        subpath_start = Some(start);
                    }
                }
                "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" | "n" => {
                    let operator = op.operator.as_str();
                    let stroke = matches!(operator, "S" | "s" | "B" | "B*" | "b" | "b*");
                    let fill = matches!(operator, "f" | "F" | "f*" | "B" | "B*" | "b" | "b*");
                    if stroke || fill {
                        self.paint(&path, fill, stroke);
                    }
                    path.clear();
                    current_point = None;
                    subpath_start = None;
                }

                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.draw_xobject(resources, name, &gs, depth);
                    }
                }
                _ => {}
            }
        }
    }

    fn load_font(&self, resources: Option<&Dictionary>, name: &[u8]) -> FontDecoder {
        let dict = resources
            .and_then(|r| r.get(b"Font").ok())
            .and_then(|fonts| match resolve(self.doc, fonts) {
                Object::Dictionary(d) => d.get(name).ok(),
                _ => None,
            })
            .and_then(|font| match resolve(self.doc, font) {
                Object::Dictionary(d) => Some(d),
                _ => None,
            });
        match dict {
            Some(d) => FontDecoder::from_dict(self.doc, d),
            None => {
                tracing::warn!(
                    font = %String::from_utf8_lossy(name),
                    "font resource not found, decoding as WinAnsi"
                );
                FontDecoder::fallback()
            }
        }
    }

    fn show(
        &mut self,
        gs: &GraphicsState,
        font: &FontDecoder,
        tm: &mut Matrix,
        bytes: &[u8],
        pending: &mut PendingText,
    ) {
        let fs = gs.font_size;
        let th = gs.horiz_scale;
        for glyph in font.decode(bytes) {
            let trm = Matrix::new(fs * th, 0.0, 0.0, fs, 0.0, gs.rise)
                .then(tm)
                .then(&gs.ctm);
            let w = glyph.width / 1000.0;
            pending.text.push_str(&glyph.text);
            pending.extend(&[
                trm.apply(0.0, DESCENT),
                trm.apply(0.0, ASCENT),
                trm.apply(w, DESCENT),
                trm.apply(w, ASCENT),
            ]);
            let spacing = gs.char_spacing + if glyph.is_space { gs.word_spacing } else { 0.0 };
            let tx = (w * fs + spacing) * th;
            *tm = Matrix::translate(tx, 0.0).then(tm);
        }
    }

    fn flush(&mut self, pending: &mut PendingText) {
        let done = std::mem::take(pending);
        let Some((x0, y0, x1, y1)) = done.bounds else {
            return;
        };
        if done.text.trim().is_empty() {
            return;
        }
        let bbox = self.to_page_box(x0, y0, x1, y1);
        self.output.fragments.push(TextFragment::new(done.text, bbox));
    }

    fn paint(&mut self, path: &[PathItem], fill: bool, stroke: bool) {
        for item in path {
            let bbox = match item {
                PathItem::Rect(corners) => {
                    let xs = corners.iter().map(|p| p.0);
                    let ys = corners.iter().map(|p| p.1);
                    let (x0, x1) = min_max(xs);
                    let (y0, y1) = min_max(ys);
                    self.to_page_box(x0, y0, x1, y1)
                }
                PathItem::Line(a, b) => {
                    let axis_aligned = (a.0 - b.0).abs() < 0.5 || (a.1 - b.1).abs() < 0.5;
                    if !axis_aligned {
                        continue;
                    }
                    self.to_page_box(a.0.min(b.0), a.1.min(b.1), a.0.max(b.0), a.1.max(b.1))
                }
            };
            self.output.rects.push(RectObject { bbox, fill, stroke });
        }
    }

    fn draw_xobject(
        &mut self,
        resources: Option<&'a Dictionary>,
        name: &[u8],
        gs: &GraphicsState,
        depth: usize,
    ) {
        if depth >= MAX_FORM_DEPTH {
            tracing::debug!("form XObject nesting too deep, skipping");
            return;
        }
        let doc = self.doc;
        let stream = resources
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|xobjects| match resolve(doc, xobjects) {
                Object::Dictionary(d) => d.get(name).ok(),
                _ => None,
            })
            .and_then(|x| match resolve(doc, x) {
                Object::Stream(s) => Some(s),
                _ => None,
            });
        let Some(stream) = stream else { return };

        let is_form = matches!(
            stream.dict.get(b"Subtype").map(|o| resolve(doc, o)),
            Ok(Object::Name(n)) if n == b"Form"
        );
        if !is_form {
            return;
        }

        let Some(bytes) = stream_bytes(stream) else { return };
        let content = match Content::decode(&bytes) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "failed to decode form XObject content");
                return;
            }
        };

        let form_matrix = match stream.dict.get(b"Matrix").map(|o| resolve(doc, o)) {
            Ok(Object::Array(arr)) => Matrix::from_operands(arr).unwrap_or(Matrix::IDENTITY),
            _ => Matrix::IDENTITY,
        };
        let form_resources = match stream.dict.get(b"Resources").map(|o| resolve(doc, o)) {
            Ok(Object::Dictionary(d)) => Some(d),
            _ => resources,
        };

        let mut inner = gs.clone();
        inner.ctm = form_matrix.then(&gs.ctm);
        self.run(&content.operations, form_resources, inner, depth + 1);
    }

    /// Convert device-space bounds (y up) to top-left page coordinates.
    fn to_page_box(&self, x0: f64, y0: f64, x1: f64, y1: f64) -> BBox {
        BBox::new(
            x0 - self.x_origin,
            self.y_top - y1,
            x1 - self.x_origin,
            self.y_top - y0,
        )
    }
}

fn font_for<'f>(
    fonts: &'f HashMap<Vec<u8>, FontDecoder>,
    gs: &GraphicsState,
    fallback: &'f FontDecoder,
) -> &'f FontDecoder {
    gs.font
        .as_ref()
        .and_then(|name| fonts.get(name))
        .unwrap_or(fallback)
}

fn set_number(operands: &[Object], target: &mut f64) {
    if let Some(v) = operands.first().and_then(number) {
        *target = v;
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}
