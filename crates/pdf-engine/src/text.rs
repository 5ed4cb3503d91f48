//! Positioned text runs as produced by the content-stream interpreter

/// Affine transform `[a b c d e f]` in PDF row-vector convention
///
/// A point maps as `x' = a·x + c·y + e`, `y' = b·x + d·y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 };

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn from_array(values: [f32; 6]) -> Self {
        let [a, b, c, d, e, f] = values;
        Self { a, b, c, d, e, f }
    }

    pub fn to_array(self) -> [f32; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// `self × other`: apply `self` first, then `other`
    pub fn concat(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Length of the transformed x unit vector
    pub fn horizontal_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One contiguous string drawn with one transform and one font
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    /// Decoded text content
    pub text: String,

    /// Text rendering matrix at the start of the run (font size folded in)
    pub transform: Matrix,

    /// Advance width in PDF user space
    pub width: f32,

    /// Font resource key on the page (e.g. "F1")
    pub font_id: String,
}

impl TextRun {
    pub fn new(text: impl Into<String>, transform: Matrix, width: f32, font_id: impl Into<String>) -> Self {
        Self { text: text.into(), transform, width, font_id: font_id.into() }
    }
}

/// Marked-content boundary in the content stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkedContent {
    Begin { tag: String },
    End,
}

/// Item of a page's text content: a run or a non-text marker
#[derive(Debug, Clone, PartialEq)]
pub enum TextContentItem {
    Run(TextRun),
    Marker(MarkedContent),
}

impl TextContentItem {
    pub fn as_run(&self) -> Option<&TextRun> {
        match self {
            TextContentItem::Run(run) => Some(run),
            TextContentItem::Marker(_) => None,
        }
    }

    pub fn into_run(self) -> Option<TextRun> {
        match self {
            TextContentItem::Run(run) => Some(run),
            TextContentItem::Marker(_) => None,
        }
    }
}
