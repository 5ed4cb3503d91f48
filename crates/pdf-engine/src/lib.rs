//! PDF decoding and rasterization adapter
//!
//! The overlay core consumes a PDF engine as a black box: open a document,
//! ask for a page's size at a scale, rasterize it, and list its text runs and
//! font names. [`PdfEngine`] is that contract; [`LopdfEngine`] implements it in
//! pure Rust and the `pdfium` feature adds a backend that rasterizes with
//! PDFium.

mod cmap;
mod content;
pub mod fonts;
pub mod metrics;
pub mod text;

use image::{ImageBuffer, Rgba};
use lopdf::content::Content;
use lopdf::{Document, ObjectId};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use cmap::ToUnicodeMap;
pub use text::{MarkedContent, Matrix, TextContentItem, TextRun};

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Font identifier → font name for one page
pub type FontObjects = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    /// Handle with a backend-chosen id
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    /// Pixel dimensions of the page rendered at `scale`
    pub fn viewport(&self, scale: f32) -> (f32, f32) {
        (self.width_pt * scale, self.height_pt * scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub page_index: u32,
    pub scale: f32,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self { page_index: 0, scale: 1.0 }
    }
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
    Shared(Arc<[u8]>),
}

impl OpenSource {
    fn into_bytes(self) -> Result<Arc<[u8]>, PdfEngineError> {
        Ok(match self {
            OpenSource::Path(path) => Arc::from(fs::read(path)?),
            OpenSource::Bytes(bytes) => Arc::from(bytes),
            OpenSource::Shared(bytes) => bytes,
        })
    }
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<Arc<[u8]>> for OpenSource {
    fn from(value: Arc<[u8]>) -> Self {
        Self::Shared(value)
    }
}

/// Process-wide engine configuration
///
/// Built once at startup and handed to the backend constructor; backends never
/// read global state.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Directory holding the PDFium shared library (pdfium backend only)
    pub library_dir: Option<PathBuf>,

    /// Advance width in 1/1000 em for glyphs without metrics
    pub fallback_glyph_width: f32,

    /// TJ adjustment, in em, above which a run is split and a space run emitted
    pub space_gap_ratio: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { library_dir: None, fallback_glyph_width: 500.0, space_gap_ratio: 0.3 }
    }
}

impl EngineConfig {
    pub fn with_library_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.library_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_fallback_glyph_width(mut self, width: f32) -> Self {
        self.fallback_glyph_width = width;
        self
    }

    pub fn with_space_gap_ratio(mut self, ratio: f32) -> Self {
        self.space_gap_ratio = ratio;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported in the default backend")]
    EncryptedUnsupported,
    #[error("backend error: {0}")]
    Backend(String),
}

pub trait PdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError>;
    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError>;
    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError>;
    fn text_content(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<Vec<TextContentItem>, PdfEngineError>;
    fn font_objects(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<FontObjects, PdfEngineError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;
}

#[derive(Debug)]
struct DocumentRecord {
    doc: Document,
    page_ids: Vec<ObjectId>,
    page_sizes: Vec<PageSize>,
}

#[derive(Debug, Default)]
pub struct LopdfEngine {
    config: EngineConfig,
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self { config, ..Self::default() }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn load(bytes: &[u8]) -> Result<DocumentRecord, PdfEngineError> {
        let doc = Document::load_mem(bytes)?;
        if doc.trailer.get(b"Encrypt").is_ok() {
            return Err(PdfEngineError::EncryptedUnsupported);
        }

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(PdfEngineError::Backend("document has no pages".to_owned()));
        }

        let mut page_sizes = Vec::with_capacity(page_ids.len());
        for object_id in &page_ids {
            let dict = doc.get_dictionary(*object_id)?;
            let size = fonts::inherited(&doc, dict, b"MediaBox")
                .and_then(|obj| obj.as_array().ok())
                .and_then(|array| {
                    if array.len() != 4 {
                        return None;
                    }
                    let x0 = array[0].as_float().ok()?;
                    let y0 = array[1].as_float().ok()?;
                    let x1 = array[2].as_float().ok()?;
                    let y1 = array[3].as_float().ok()?;
                    Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
                })
                .unwrap_or(PageSize { width_pt: 612.0, height_pt: 792.0 });

            page_sizes.push(size);
        }

        Ok(DocumentRecord { doc, page_ids, page_sizes })
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord, PdfEngineError> {
        self.docs.get(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }

    fn page_id(&self, handle: DocumentHandle, page_index: u32) -> Result<(&DocumentRecord, ObjectId), PdfEngineError> {
        let record = self.record(handle)?;
        let id = record.page_ids.get(page_index as usize).copied().ok_or(
            PdfEngineError::PageOutOfRange {
                page: page_index,
                page_count: record.page_ids.len() as u32,
            },
        )?;
        Ok((record, id))
    }

    fn page_fonts(
        record: &DocumentRecord,
        page_id: ObjectId,
    ) -> Result<BTreeMap<String, fonts::PageFont>, PdfEngineError> {
        let page = record.doc.get_dictionary(page_id)?;
        let resources = fonts::inherited(&record.doc, page, b"Resources").and_then(|o| o.as_dict().ok());
        Ok(fonts::page_fonts(&record.doc, resources))
    }
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
        let bytes = source.into_bytes()?;
        let record = Self::load(&bytes)?;

        self.next_handle += 1;
        let handle = DocumentHandle::from_raw(self.next_handle);
        log::debug!("opened document {} with {} page(s)", handle.raw(), record.page_ids.len());
        self.docs.insert(handle, record);

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(self.record(handle)?.page_sizes.len() as u32)
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError> {
        let record = self.record(handle)?;
        record.page_sizes.get(page_index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: record.page_sizes.len() as u32,
        })
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError> {
        let page_size = self.page_size(handle, request.page_index)?;
        let scale = if request.scale <= 0.0 { 1.0 } else { request.scale };

        let width = (page_size.width_pt * scale).round().max(1.0) as u32;
        let height = (page_size.height_pt * scale).round().max(1.0) as u32;

        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

        if width >= 4 && height >= 4 {
            for x in 0..width {
                image.put_pixel(x, 0, Rgba([220, 220, 220, 255]));
                image.put_pixel(x, height - 1, Rgba([220, 220, 220, 255]));
            }
            for y in 0..height {
                image.put_pixel(0, y, Rgba([220, 220, 220, 255]));
                image.put_pixel(width - 1, y, Rgba([220, 220, 220, 255]));
            }
        }

        Ok(image)
    }

    fn text_content(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<Vec<TextContentItem>, PdfEngineError> {
        let (record, page_id) = self.page_id(handle, page_index)?;
        let fonts = Self::page_fonts(record, page_id)?;
        let data = record.doc.get_page_content(page_id)?;
        let content = Content::decode(&data)?;

        let items = content::TextInterpreter::new(&fonts, &self.config).run(&content.operations);
        log::debug!("page {page_index}: {} text item(s)", items.len());
        Ok(items)
    }

    fn font_objects(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<FontObjects, PdfEngineError> {
        let (record, page_id) = self.page_id(handle, page_index)?;
        let fonts = Self::page_fonts(record, page_id)?;

        Ok(fonts
            .into_iter()
            .map(|(id, font)| {
                let name = font.base_font.unwrap_or_else(|| id.clone());
                (id, name)
            })
            .collect())
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

#[cfg(feature = "pdfium")]
pub mod pdfium_backend {
    use super::*;
    use pdfium_render::prelude::*;

    /// PDFium rasterization on top of the lopdf text interpreter
    pub struct PdfiumEngine {
        pdfium: Pdfium,
        inner: LopdfEngine,
        sources: HashMap<DocumentHandle, Arc<[u8]>>,
    }

    impl PdfiumEngine {
        pub fn new(config: EngineConfig) -> Result<Self, PdfEngineError> {
            let bindings = match &config.library_dir {
                Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
                None => Pdfium::bind_to_system_library(),
            }
            .map_err(|err| PdfEngineError::Backend(format!("failed to bind pdfium library: {err}")))?;

            Ok(Self {
                pdfium: Pdfium::new(bindings),
                inner: LopdfEngine::with_config(config),
                sources: HashMap::new(),
            })
        }
    }

    impl PdfEngine for PdfiumEngine {
        fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
            let bytes = source.into_bytes()?;
            let handle = self.inner.open(OpenSource::Shared(bytes.clone()))?;
            self.sources.insert(handle, bytes);
            Ok(handle)
        }

        fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
            self.inner.page_count(handle)
        }

        fn page_size(
            &self,
            handle: DocumentHandle,
            page_index: u32,
        ) -> Result<PageSize, PdfEngineError> {
            self.inner.page_size(handle, page_index)
        }

        fn render_page(
            &self,
            handle: DocumentHandle,
            request: RenderRequest,
        ) -> Result<RgbaImage, PdfEngineError> {
            let bytes = self.sources.get(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))?;
            let size = self.inner.page_size(handle, request.page_index)?;
            let scale = if request.scale <= 0.0 { 1.0 } else { request.scale };
            let backend = |err: PdfiumError| PdfEngineError::Backend(err.to_string());

            let document = self.pdfium.load_pdf_from_byte_slice(bytes, None).map_err(backend)?;
            let page = document.pages().get(request.page_index as u16).map_err(backend)?;
            let config = PdfRenderConfig::new()
                .set_target_width((size.width_pt * scale).round().max(1.0) as i32);
            let bitmap = page.render_with_config(&config).map_err(backend)?;

            let (width, height) = (bitmap.width() as u32, bitmap.height() as u32);
            RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes().to_vec())
                .ok_or_else(|| PdfEngineError::Backend("bitmap size mismatch".to_owned()))
        }

        fn text_content(
            &self,
            handle: DocumentHandle,
            page_index: u32,
        ) -> Result<Vec<TextContentItem>, PdfEngineError> {
            self.inner.text_content(handle, page_index)
        }

        fn font_objects(
            &self,
            handle: DocumentHandle,
            page_index: u32,
        ) -> Result<FontObjects, PdfEngineError> {
            self.inner.font_objects(handle, page_index)
        }

        fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
            self.sources.remove(&handle);
            self.inner.close(handle)
        }
    }
}
