//! Standard sans-serif advance widths
//!
//! Helvetica AFM widths in 1/1000 em for printable ASCII. Used as the glyph
//! width source for standard-14 fonts that ship without a `Widths` array, and
//! by text measurement when laying out overlay text in a generic sans-serif
//! face.

/// Width used for characters outside the table (average lowercase advance)
pub const AVERAGE_WIDTH: u16 = 556;

const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32..47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48..63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64..79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80..95
    222, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96..111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112..126
];

/// Advance width of a character code in 1/1000 em, if it is printable ASCII
pub fn helvetica_code_width(code: u32) -> Option<u16> {
    if (32..=126).contains(&code) {
        Some(HELVETICA_ASCII[(code - 32) as usize])
    } else {
        None
    }
}

/// Advance width of a character in 1/1000 em
///
/// Control characters advance by zero; anything outside printable ASCII falls
/// back to [`AVERAGE_WIDTH`].
pub fn sans_serif_advance(ch: char) -> u16 {
    if ch.is_control() {
        return 0;
    }
    helvetica_code_width(ch as u32).unwrap_or(AVERAGE_WIDTH)
}
