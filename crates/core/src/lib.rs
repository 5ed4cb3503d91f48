//! PDF text overlay core
//!
//! Rebuilds a selectable, annotatable text layer over a rasterized PDF page.
//! Text runs from the engine are filtered ([`run_filter`]), mapped into pixel
//! space ([`geometry`]), classified by font name ([`fonts`]) and published
//! together with the raster ([`builder`]). [`annotation`] rules restyle the
//! published nodes, and [`resize`] re-derives the layer once the container
//! stops changing size. [`viewer::PageViewer`] wires it all up for one file.

pub mod annotation;
pub mod builder;
pub mod config;
pub mod error;
pub mod fonts;
pub mod geometry;
pub mod measure;
pub mod overlay;
pub mod resize;
pub mod run_filter;
pub mod selection;
pub mod source;
pub mod viewer;

pub use pdf_engine;

pub use annotation::{AnnotationRule, FontEntry, FontPanel, RuleEngine, RulePalette, RuleState, UnknownRule};
pub use builder::{Derivation, PendingLayer, PublishOutcome, PublishedLayer, TextLayerBuilder};
pub use config::OverlayConfig;
pub use error::{ConfigError, LayerError, LayerResult, SourceError};
pub use fonts::{classify_font_name, FontRecord, FontStyle};
pub use geometry::{GeometryMapper, GlyphPlacement, ViewportGeometry};
pub use measure::{SansSerifMeasurer, TextMeasurer};
pub use overlay::{Color, NodeId, NodeStyle, OverlayLayer, OverlayNode, TextDecoration};
pub use resize::ResizeCoordinator;
pub use run_filter::RunFilter;
pub use selection::SelectionRect;
pub use source::{SourceLease, SourceRegistry, UploadedFile, PDF_MIME};
pub use viewer::{PageViewer, ViewerStatus};
