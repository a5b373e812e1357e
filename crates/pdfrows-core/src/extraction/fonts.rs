//! Font decoding for the lopdf backend.
//!
//! Turns the raw bytes of a show-text operand into unicode text and glyph
//! advances. Decoding prefers the font's `ToUnicode` CMap; simple fonts without
//! one fall back to their single-byte encoding (WinAnsi, MacRoman, or a
//! `Differences` array on top of either).

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object};

use super::lopdf_backend::{number, resolve, stream_bytes};

/// Width used when a font carries no metrics, in 1/1000 em.
const DEFAULT_GLYPH_WIDTH: f64 = 500.0;

/// Longest code range a `W` entry or `bfrange` line may cover. Longer
/// ranges are clamped.
const MAX_RANGE_SPAN: u32 = 0xFFFF;

/// One decoded character code.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub text: String,
    /// Horizontal advance in 1/1000 em.
    pub width: f64,
    /// Single-byte code 32, which receives word spacing.
    pub is_space: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BaseEncoding {
    WinAnsi,
    MacRoman,
}

/// Decoder for one font resource.
#[derive(Debug, Clone)]
pub struct FontDecoder {
    pub base_font: String,
    two_byte: bool,
    to_unicode: Option<ToUnicodeMap>,
    base_encoding: BaseEncoding,
    differences: HashMap<u32, char>,
    widths: HashMap<u32, f64>,
    default_width: f64,
}

impl FontDecoder {
    /// Decoder used when a `Tf` names a font missing from the resources.
    pub fn fallback() -> Self {
        FontDecoder {
            base_font: "unknown".into(),
            two_byte: false,
            to_unicode: None,
            base_encoding: BaseEncoding::WinAnsi,
            differences: HashMap::new(),
            widths: HashMap::new(),
            default_width: DEFAULT_GLYPH_WIDTH,
        }
    }

    pub fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let mut decoder = FontDecoder::fallback();

        if let Ok(Object::Name(name)) = dict.get(b"BaseFont").map(|o| resolve(doc, o)) {
            decoder.base_font = String::from_utf8_lossy(name).into_owned();
        }

        let subtype = match dict.get(b"Subtype").map(|o| resolve(doc, o)) {
            Ok(Object::Name(name)) => name.clone(),
            _ => Vec::new(),
        };
        decoder.two_byte = subtype == b"Type0";

        if let Ok(Object::Stream(stream)) = dict.get(b"ToUnicode").map(|o| resolve(doc, o)) {
            if let Some(bytes) = stream_bytes(stream) {
                let cmap = ToUnicodeMap::parse(&String::from_utf8_lossy(&bytes));
                if !cmap.is_empty() {
                    decoder.to_unicode = Some(cmap);
                }
            }
        }

        if decoder.two_byte {
            decoder.load_cid_widths(doc, dict);
        } else {
            decoder.load_simple_encoding(doc, dict);
            decoder.load_simple_widths(doc, dict);
        }

        if decoder.two_byte && decoder.to_unicode.is_none() {
            tracing::warn!(
                font = %decoder.base_font,
                "composite font without ToUnicode map, text may be garbled"
            );
        }

        decoder
    }

    fn load_simple_encoding(&mut self, doc: &Document, dict: &Dictionary) {
        let encoding = match dict.get(b"Encoding") {
            Ok(obj) => resolve(doc, obj),
            Err(_) => return,
        };
        match encoding {
            Object::Name(name) => self.base_encoding = base_encoding_from_name(name),
            Object::Dictionary(enc) => {
                if let Ok(Object::Name(name)) =
                    enc.get(b"BaseEncoding").map(|o| resolve(doc, o))
                {
                    self.base_encoding = base_encoding_from_name(name);
                }
                if let Ok(Object::Array(diffs)) =
                    enc.get(b"Differences").map(|o| resolve(doc, o))
                {
                    let mut code = 0u32;
                    for item in diffs {
                        match resolve(doc, item) {
                            Object::Integer(i) => {
                                code = u32::try_from((*i).max(0)).unwrap_or(u32::MAX)
                            }
                            Object::Name(glyph) => {
                                let glyph = String::from_utf8_lossy(glyph);
                                if let Some(ch) = glyph_name_to_char(&glyph) {
                                    self.differences.insert(code, ch);
                                }
                                code = code.saturating_add(1);
                            }
                            _ => {}
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn load_simple_widths(&mut self, doc: &Document, dict: &Dictionary) {
        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| number(resolve(doc, o)))
            .unwrap_or(0.0) as u32;
        if let Ok(Object::Array(widths)) = dict.get(b"Widths").map(|o| resolve(doc, o)) {
            for (i, w) in widths.iter().enumerate() {
                let Some(code) = u32::try_from(i)
                    .ok()
                    .and_then(|i| first_char.checked_add(i))
                else {
                    break;
                };
                if let Some(w) = number(resolve(doc, w)) {
                    self.widths.insert(code, w);
                }
            }
        }
    }

    fn load_cid_widths(&mut self, doc: &Document, dict: &Dictionary) {
        self.default_width = 1000.0;
        let descendant = match dict.get(b"DescendantFonts").map(|o| resolve(doc, o)) {
            Ok(Object::Array(arr)) => match arr.first().map(|o| resolve(doc, o)) {
                Some(Object::Dictionary(d)) => d,
                _ => return,
            },
            _ => return,
        };

        if let Some(dw) = descendant.get(b"DW").ok().and_then(|o| number(resolve(doc, o))) {
            self.default_width = dw;
        }

        let w = match descendant.get(b"W").map(|o| resolve(doc, o)) {
            Ok(Object::Array(w)) => w,
            _ => return,
        };
        let mut i = 0;
        while i < w.len() {
            let first = match number(resolve(doc, &w[i])) {
                Some(v) => v as u32,
                None => break,
            };
            match w.get(i + 1).map(|o| resolve(doc, o)) {
                Some(Object::Array(list)) => {
                    for (offset, width) in list.iter().enumerate() {
                        let Some(cid) =
                            u32::try_from(offset).ok().and_then(|o| first.checked_add(o))
                        else {
                            break;
                        };
                        if let Some(width) = number(resolve(doc, width)) {
                            self.widths.insert(cid, width);
                        }
                    }
                    i += 2;
                }
                Some(last) => {
                    let last = number(last).map(|v| v as u32).unwrap_or(first);
                    let width = w
                        .get(i + 2)
                        .and_then(|o| number(resolve(doc, o)))
                        .unwrap_or(self.default_width);
                    for cid in first..=clamp_range(first, last) {
                        self.widths.insert(cid, width);
                    }
                    i += 3;
                }
                None => break,
            }
        }
    }

    /// Split a string operand into glyphs.
    pub fn decode(&self, bytes: &[u8]) -> Vec<Glyph> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|pair| {
                    let code = pair.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
                    Glyph {
                        text: self.code_text(code),
                        width: self.width_of(code),
                        is_space: false,
                    }
                })
                .collect()
        } else {
            bytes
                .iter()
                .map(|b| {
                    let code = u32::from(*b);
                    Glyph {
                        text: self.code_text(code),
                        width: self.width_of(code),
                        is_space: *b == b' ',
                    }
                })
                .collect()
        }
    }

    fn code_text(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|m| m.get(code)) {
            return text.to_string();
        }
        if self.two_byte {
            return char::from_u32(code)
                .filter(|c| !c.is_control())
                .map(String::from)
                .unwrap_or_default();
        }
        if let Some(ch) = self.differences.get(&code) {
            return ch.to_string();
        }
        let byte = [code as u8];
        let decoded = match self.base_encoding {
            BaseEncoding::WinAnsi => encoding_rs::WINDOWS_1252.decode_without_bom_handling(&byte).0,
            BaseEncoding::MacRoman => encoding_rs::MACINTOSH.decode_without_bom_handling(&byte).0,
        };
        decoded.into_owned()
    }

    fn width_of(&self, code: u32) -> f64 {
        self.widths.get(&code).copied().unwrap_or(self.default_width)
    }
}

fn base_encoding_from_name(name: &[u8]) -> BaseEncoding {
    match name {
        b"MacRomanEncoding" => BaseEncoding::MacRoman,
        _ => BaseEncoding::WinAnsi,
    }
}

/// Map an Adobe glyph name to a character for the names producers commonly
/// put in `Differences` arrays.
fn glyph_name_to_char(name: &str) -> Option<char> {
    if let Some(hex) = name.strip_prefix("uni") {
        if hex.len() == 4 {
            return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
        }
    }
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(c);
    }
    let ch = match name {
        "space" => ' ',
        "exclam" => '!',
        "quotedbl" => '"',
        "numbersign" => '#',
        "dollar" => '$',
        "percent" => '%',
        "ampersand" => '&',
        "quotesingle" | "quoteright" => '\'',
        "parenleft" => '(',
        "parenright" => ')',
        "asterisk" => '*',
        "plus" => '+',
        "comma" => ',',
        "hyphen" | "minus" => '-',
        "period" => '.',
        "slash" => '/',
        "zero" => '0',
        "one" => '1',
        "two" => '2',
        "three" => '3',
        "four" => '4',
        "five" => '5',
        "six" => '6',
        "seven" => '7',
        "eight" => '8',
        "nine" => '9',
        "colon" => ':',
        "semicolon" => ';',
        "less" => '<',
        "equal" => '=',
        "greater" => '>',
        "question" => '?',
        "at" => '@',
        "bracketleft" => '[',
        "backslash" => '\\',
        "bracketright" => ']',
        "underscore" => '_',
        "endash" => '–',
        "emdash" => '—',
        "degree" => '°',
        "ordmasculine" => 'º',
        "ordfeminine" => 'ª',
        "section" => '§',
        "aacute" => 'á',
        "agrave" => 'à',
        "acircumflex" => 'â',
        "atilde" => 'ã',
        "eacute" => 'é',
        "ecircumflex" => 'ê',
        "iacute" => 'í',
        "oacute" => 'ó',
        "ocircumflex" => 'ô',
        "otilde" => 'õ',
        "uacute" => 'ú',
        "ccedilla" => 'ç',
        "Aacute" => 'Á',
        "Atilde" => 'Ã',
        "Eacute" => 'É',
        "Iacute" => 'Í',
        "Oacute" => 'Ó',
        "Uacute" => 'Ú',
        "Ccedilla" => 'Ç',
        _ => return None,
    };
    Some(ch)
}

/// Character code to unicode mapping read from a `ToUnicode` CMap.
#[derive(Debug, Clone, Default)]
pub struct ToUnicodeMap {
    map: HashMap<u32, String>,
}

#[derive(Debug, PartialEq)]
enum CMapToken {
    Hex(Vec<u8>),
    Word(String),
    ArrayStart,
    ArrayEnd,
}

impl ToUnicodeMap {
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    /// Parse the `bfchar` and `bfrange` sections of a CMap program.
    pub fn parse(program: &str) -> Self {
        let tokens = tokenize_cmap(program);
        let mut map = HashMap::new();
        let mut i = 0;
        while i < tokens.len() {
            match &tokens[i] {
                CMapToken::Word(w) if w == "beginbfchar" => {
                    i += 1;
                    while i + 1 < tokens.len() {
                        match (&tokens[i], &tokens[i + 1]) {
                            (CMapToken::Hex(src), CMapToken::Hex(dst)) => {
                                map.insert(code_of(src), utf16_text(dst));
                                i += 2;
                            }
                            _ => break,
                        }
                    }
                }
                CMapToken::Word(w) if w == "beginbfrange" => {
                    i += 1;
                    while i + 2 < tokens.len() {
                        let (lo, hi) = match (&tokens[i], &tokens[i + 1]) {
                            (CMapToken::Hex(lo), CMapToken::Hex(hi)) => {
                                let lo = code_of(lo);
                                (lo, clamp_range(lo, code_of(hi)))
                            }
                            _ => break,
                        };
                        match &tokens[i + 2] {
                            CMapToken::Hex(dst) => {
                                let base = utf16_units(dst);
                                for (offset, code) in (lo..=hi).enumerate() {
                                    let mut units = base.clone();
                                    if let Some(last) = units.last_mut() {
                                        *last = last.wrapping_add(offset as u16);
                                    }
                                    map.insert(code, String::from_utf16_lossy(&units));
                                }
                                i += 3;
                            }
                            CMapToken::ArrayStart => {
                                i += 3;
                                let mut code = Some(lo);
                                while i < tokens.len() && tokens[i] != CMapToken::ArrayEnd {
                                    if let CMapToken::Hex(dst) = &tokens[i] {
                                        if let Some(c) = code.filter(|c| *c <= hi) {
                                            map.insert(c, utf16_text(dst));
                                        }
                                        code = code.and_then(|c| c.checked_add(1));
                                    }
                                    i += 1;
                                }
                                i += 1;
                            }
                            _ => break,
                        }
                    }
                }
                _ => i += 1,
            }
        }
        ToUnicodeMap { map }
    }
}

fn tokenize_cmap(program: &str) -> Vec<CMapToken> {
    let mut tokens = Vec::new();
    let mut chars = program.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '<' => {
                let mut hex = String::new();
                for h in chars.by_ref() {
                    if h == '>' {
                        break;
                    }
                    if h.is_ascii_hexdigit() {
                        hex.push(h);
                    }
                }
                if hex.len() % 2 == 1 {
                    hex.push('0');
                }
                let bytes = (0..hex.len())
                    .step_by(2)
                    .filter_map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
                    .collect();
                tokens.push(CMapToken::Hex(bytes));
            }
            '[' => tokens.push(CMapToken::ArrayStart),
            ']' => tokens.push(CMapToken::ArrayEnd),
            '%' => {
                for h in chars.by_ref() {
                    if h == '\n' || h == '\r' {
                        break;
                    }
                }
            }
            c if c.is_whitespace() => {}
            c => {
                let mut word = String::from(c);
                while let Some(&n) = chars.peek() {
                    if n.is_whitespace() || matches!(n, '<' | '[' | ']' | '%') {
                        break;
                    }
                    word.push(n);
                    chars.next();
                }
                tokens.push(CMapToken::Word(word));
            }
        }
    }
    tokens
}

/// Upper end of `first..=last`, limited to `MAX_RANGE_SPAN` codes past `first`.
fn clamp_range(first: u32, last: u32) -> u32 {
    let capped = first.saturating_add(MAX_RANGE_SPAN);
    if last > capped {
        tracing::warn!(first, last, "font code range too long, clamping");
        capped
    } else {
        last
    }
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [single] => u16::from(*single),
            _ => 0,
        })
        .collect()
}

fn utf16_text(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}
