//! Font resource resolution for a single page
//!
//! Resolves the `/Font` entries of a page's resources into the pieces the
//! content interpreter needs: the display name, glyph advance widths and a way
//! to turn string bytes into (code, text) pairs.

use crate::cmap::{bytes_to_code, ToUnicodeMap};
use crate::metrics::helvetica_code_width;
use lopdf::{Dictionary, Document, Object};
use std::collections::BTreeMap;

const MAX_REFERENCE_DEPTH: usize = 16;
const MAX_PARENT_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq)]
enum GlyphWidths {
    Simple { first_char: u32, widths: Vec<f32> },
    Cid { default: f32, ranges: Vec<(u32, u32, f32)> },
    Standard,
    Unknown,
}

/// A font as referenced from a page's resource dictionary
#[derive(Debug, Clone, PartialEq)]
pub struct PageFont {
    /// `BaseFont` entry, including any subset prefix
    pub base_font: Option<String>,
    widths: GlyphWidths,
    to_unicode: Option<ToUnicodeMap>,
    two_byte: bool,
}

impl PageFont {
    /// Font with no resolvable metrics; every glyph uses the fallback width
    pub fn unknown() -> Self {
        Self { base_font: None, widths: GlyphWidths::Unknown, to_unicode: None, two_byte: false }
    }

    pub fn is_two_byte(&self) -> bool {
        self.two_byte
    }

    /// Split a shown string into character codes with their decoded text
    pub fn decode(&self, bytes: &[u8]) -> Vec<(u32, String)> {
        let code_len = if self.two_byte { 2 } else { 1 };

        bytes
            .chunks(code_len)
            .map(|chunk| {
                let code = bytes_to_code(chunk);
                let text = match self.to_unicode.as_ref().and_then(|map| map.lookup(code)) {
                    Some(mapped) => mapped.to_string(),
                    None if self.two_byte => char::from_u32(code).unwrap_or('\u{FFFD}').to_string(),
                    None => (code as u8 as char).to_string(),
                };
                (code, text)
            })
            .collect()
    }

    /// Advance width of a code in 1/1000 em
    pub fn glyph_width(&self, code: u32, fallback: f32) -> f32 {
        match &self.widths {
            GlyphWidths::Simple { first_char, widths } => code
                .checked_sub(*first_char)
                .and_then(|idx| widths.get(idx as usize).copied())
                .unwrap_or(fallback),
            GlyphWidths::Cid { default, ranges } => ranges
                .iter()
                .find(|(start, end, _)| (*start..=*end).contains(&code))
                .map(|(_, _, w)| *w)
                .unwrap_or(*default),
            GlyphWidths::Standard => helvetica_code_width(code).map(f32::from).unwrap_or(fallback),
            GlyphWidths::Unknown => fallback,
        }
    }
}

/// Follow indirect references until a direct object is reached
pub(crate) fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> &'a Object {
    for _ in 0..MAX_REFERENCE_DEPTH {
        match obj {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(target) => obj = target,
                Err(_) => return obj,
            },
            _ => return obj,
        }
    }
    obj
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, obj).as_dict().ok()
}

/// Look up a page attribute, walking `Parent` for inheritable keys
pub(crate) fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut current = page;
    for _ in 0..MAX_PARENT_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(resolve(doc, value));
        }
        current = current.get(b"Parent").ok().and_then(|parent| resolve_dict(doc, parent))?;
    }
    None
}

fn name_string(obj: &Object) -> Option<String> {
    match obj {
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

fn number(doc: &Document, obj: &Object) -> Option<f32> {
    resolve(doc, obj).as_float().ok()
}

fn simple_widths(doc: &Document, font: &Dictionary) -> Option<GlyphWidths> {
    let first_char = font.get(b"FirstChar").ok().and_then(|o| number(doc, o))?;
    let widths = font.get(b"Widths").ok().map(|o| resolve(doc, o))?.as_array().ok()?;
    let widths = widths.iter().map(|w| number(doc, w).unwrap_or(0.0)).collect();

    Some(GlyphWidths::Simple { first_char: first_char.max(0.0) as u32, widths })
}

fn cid_widths(doc: &Document, descendant: &Dictionary) -> GlyphWidths {
    let default = descendant.get(b"DW").ok().and_then(|o| number(doc, o)).unwrap_or(1000.0);
    let mut ranges = Vec::new();

    let entries = descendant
        .get(b"W")
        .ok()
        .and_then(|o| resolve(doc, o).as_array().ok())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut i = 0;
    while i < entries.len() {
        let Some(first) = number(doc, &entries[i]) else {
            i += 1;
            continue;
        };
        let first = first.max(0.0) as u32;

        match entries.get(i + 1).map(|o| resolve(doc, o)) {
            Some(Object::Array(list)) => {
                for (offset, width) in list.iter().enumerate() {
                    if let Some(w) = number(doc, width) {
                        let code = first.saturating_add(offset as u32);
                        ranges.push((code, code, w));
                    }
                }
                i += 2;
            }
            Some(last) => {
                let last = last.as_float().unwrap_or(first as f32).max(0.0) as u32;
                if let Some(w) = entries.get(i + 2).and_then(|o| number(doc, o)) {
                    ranges.push((first, last, w));
                }
                i += 3;
            }
            None => break,
        }
    }

    GlyphWidths::Cid { default, ranges }
}

fn to_unicode(doc: &Document, font: &Dictionary) -> Option<ToUnicodeMap> {
    let stream = resolve(doc, font.get(b"ToUnicode").ok()?).as_stream().ok()?;
    let data = stream.decompressed_content().unwrap_or_else(|_| stream.content.clone());
    let map = ToUnicodeMap::parse(&data);
    (!map.is_empty()).then_some(map)
}

fn page_font(doc: &Document, font: &Dictionary) -> PageFont {
    let base_font = font.get(b"BaseFont").ok().map(|o| resolve(doc, o)).and_then(name_string);
    let subtype = font.get(b"Subtype").ok().map(|o| resolve(doc, o)).and_then(name_string);
    let two_byte = subtype.as_deref() == Some("Type0");

    let widths = if two_byte {
        font.get(b"DescendantFonts")
            .ok()
            .and_then(|o| resolve(doc, o).as_array().ok())
            .and_then(|list| list.first())
            .and_then(|o| resolve_dict(doc, o))
            .map(|descendant| cid_widths(doc, descendant))
            .unwrap_or(GlyphWidths::Unknown)
    } else if let Some(widths) = simple_widths(doc, font) {
        widths
    } else if base_font.is_some() {
        GlyphWidths::Standard
    } else {
        GlyphWidths::Unknown
    };

    PageFont { base_font, widths, to_unicode: to_unicode(doc, font), two_byte }
}

/// Resolve every font in a resource dictionary, keyed by resource name
pub fn page_fonts(doc: &Document, resources: Option<&Dictionary>) -> BTreeMap<String, PageFont> {
    let mut fonts = BTreeMap::new();

    let Some(font_dict) = resources
        .and_then(|res| res.get(b"Font").ok())
        .and_then(|o| resolve_dict(doc, o))
    else {
        return fonts;
    };

    for (key, value) in font_dict.iter() {
        let id = String::from_utf8_lossy(key).into_owned();
        match resolve_dict(doc, value) {
            Some(font) => {
                fonts.insert(id, page_font(doc, font));
            }
            None => {
                log::warn!("font resource {id} is not a dictionary");
                fonts.insert(id, PageFont::unknown());
            }
        }
    }

    fonts
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    #[test]
    fn test_simple_font_widths() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "BaseFont" => "ABCDEF+Arial-BoldMT",
            "FirstChar" => 65,
            "Widths" => vec![722.into(), 600.into()],
        };

        let parsed = page_font(&doc, &font);
        assert_eq!(parsed.base_font.as_deref(), Some("ABCDEF+Arial-BoldMT"));
        assert_eq!(parsed.glyph_width(65, 500.0), 722.0);
        assert_eq!(parsed.glyph_width(66, 500.0), 600.0);
        assert_eq!(parsed.glyph_width(67, 500.0), 500.0);
        assert_eq!(parsed.glyph_width(10, 500.0), 500.0);
    }

    #[test]
    fn test_standard_font_uses_helvetica_widths() {
        let doc = Document::with_version("1.5");
        let font = dictionary! { "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Helvetica" };

        let parsed = page_font(&doc, &font);
        assert_eq!(parsed.glyph_width(b'A' as u32, 500.0), 667.0);
        assert_eq!(parsed.decode(b"Hi"), vec![(72, "H".to_string()), (105, "i".to_string())]);
    }

    #[test]
    fn test_type0_font_with_cid_widths_and_to_unicode() {
        let mut doc = Document::with_version("1.5");
        let cmap = doc.add_object(Stream::new(
            dictionary! {},
            b"begincodespacerange <0000> <FFFF> endcodespacerange \
              1 beginbfchar <0024> <0041> endbfchar"
                .to_vec(),
        ));
        let descendant = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "DW" => 1000,
            "W" => vec![
                36.into(),
                Object::Array(vec![650.into()]),
                40.into(),
                45.into(),
                300.into(),
            ],
        });
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "TimesNewRomanPS-ItalicMT",
            "DescendantFonts" => vec![descendant.into()],
            "ToUnicode" => cmap,
        };

        let parsed = page_font(&doc, &font);
        assert!(parsed.is_two_byte());
        assert_eq!(parsed.decode(&[0x00, 0x24]), vec![(0x24, "A".to_string())]);
        assert_eq!(parsed.glyph_width(36, 500.0), 650.0);
        assert_eq!(parsed.glyph_width(42, 500.0), 300.0);
        assert_eq!(parsed.glyph_width(99, 500.0), 1000.0);
    }

    #[test]
    fn test_cid_widths_starting_past_code_space() {
        let doc = Document::with_version("1.5");
        let descendant = dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "W" => vec![
                Object::Real(1.0e12),
                Object::Array(vec![100.into(), 200.into(), 300.into()]),
            ],
        };

        let widths = cid_widths(&doc, &descendant);
        let font = PageFont { widths, ..PageFont::unknown() };
        assert_eq!(font.glyph_width(u32::MAX, 500.0), 100.0);
        assert_eq!(font.glyph_width(7, 500.0), 1000.0);
    }

    #[test]
    fn test_inherited_resources() {
        let mut doc = Document::with_version("1.5");
        let parent_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Resources" => dictionary! { "Font" => dictionary! {} },
        });
        let page = dictionary! { "Type" => "Page", "Parent" => parent_id };

        assert!(inherited(&doc, &page, b"Resources").is_some());
        assert!(inherited(&doc, &page, b"MediaBox").is_none());
    }
}
