//! Font name resolution and style classification
//!
//! Style is read from the font name only: the overlay has no access to the
//! embedded font's weight or slant tables, so it relies on vendor naming such
//! as `Arial-BoldMT` or `TimesNewRomanPS-ItalicMT`.

use pdf_engine::FontObjects;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FontStyle {
    pub bold: bool,
    pub italic: bool,
}

/// Classify a font name by case-insensitive substring
///
/// Only "bold" and "italic" count; an "Oblique" face is not italic.
pub fn classify_font_name(name: &str) -> FontStyle {
    let lower = name.to_lowercase();
    FontStyle {
        bold: lower.contains("bold"),
        italic: lower.contains("italic"),
    }
}

/// Font identifier to font name table for one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontRecord {
    names: BTreeMap<String, String>,
}

impl FontRecord {
    pub fn new(names: FontObjects) -> Self {
        Self { names }
    }

    /// Font name for `font_id`, or the id itself when it has no name
    pub fn resolve<'a>(&'a self, font_id: &'a str) -> &'a str {
        match self.names.get(font_id) {
            Some(name) if !name.is_empty() => name,
            _ => font_id,
        }
    }

    pub fn classify(&self, font_id: &str) -> FontStyle {
        classify_font_name(self.resolve(font_id))
    }

    /// Resolved names, sorted and deduplicated
    pub fn distinct_fonts(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .names
            .iter()
            .map(|(id, _)| self.resolve(id).to_string())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl From<FontObjects> for FontRecord {
    fn from(names: FontObjects) -> Self {
        Self::new(names)
    }
}
