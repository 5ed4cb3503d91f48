//! Page to overlay derivation
//!
//! A derivation decodes the page, filters its runs, rasterizes it at the
//! target width and places one overlay node per retained run. The result is
//! published as one [`PublishedLayer`] value so readers never pair a raster
//! from one derivation with nodes from another.
//!
//! ```text
//! begin(lease, width) -> Derivation
//!     run(engine)     -> PendingLayer      (lease revoked, document closed)
//! publish(pending)    -> Published | Superseded
//! ```

use crate::config::OverlayConfig;
use crate::error::{LayerError, LayerResult};
use crate::fonts::FontRecord;
use crate::geometry::{GeometryMapper, ViewportGeometry};
use crate::measure::{SansSerifMeasurer, TextMeasurer};
use crate::overlay::OverlayNode;
use crate::run_filter::RunFilter;
use crate::source::SourceLease;
use pdf_engine::{DocumentHandle, PdfEngine, RenderRequest, RgbaImage, TextRun};
use pdf_overlay_scheduler::{GenerationGate, Ticket};
use std::sync::{Arc, PoisonError, RwLock};

/// Only the first page is derived
const PAGE_INDEX: u32 = 0;

/// Raster and overlay nodes of one derivation, published together
#[derive(Debug)]
pub struct PublishedLayer {
    pub generation: u64,
    pub viewport: ViewportGeometry,
    pub raster: Arc<RgbaImage>,
    pub nodes: Arc<[OverlayNode]>,
    pub fonts: Arc<FontRecord>,
}

/// A finished derivation waiting to be published
#[derive(Debug)]
pub struct PendingLayer {
    ticket: Ticket,
    layer: PublishedLayer,
}

impl PendingLayer {
    pub fn generation(&self) -> u64 {
        self.ticket.generation
    }

    pub fn layer(&self) -> &PublishedLayer {
        &self.layer
    }
}

#[derive(Debug, Clone)]
pub enum PublishOutcome {
    Published(Arc<PublishedLayer>),
    /// A newer derivation started or published first; the result was discarded
    Superseded { generation: u64 },
}

pub struct TextLayerBuilder {
    config: OverlayConfig,
    measurer: Arc<dyn TextMeasurer>,
    mapper: GeometryMapper,
    filter: RunFilter,
    gate: GenerationGate,
    current: RwLock<Option<Arc<PublishedLayer>>>,
}

impl TextLayerBuilder {
    pub fn new(config: OverlayConfig, measurer: Arc<dyn TextMeasurer>) -> Self {
        Self {
            mapper: GeometryMapper::from_config(&config),
            filter: RunFilter::from_config(&config),
            config,
            measurer,
            gate: GenerationGate::new(),
            current: RwLock::new(None),
        }
    }

    pub fn with_config(config: OverlayConfig) -> Self {
        Self::new(config, Arc::new(SansSerifMeasurer))
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Start a derivation for a container `container_width` pixels wide
    ///
    /// Supersedes any derivation begun earlier.
    pub fn begin(&self, lease: SourceLease, container_width: f32) -> Derivation<'_> {
        let ticket = self.gate.begin();
        let target_width = container_width * self.config.container_margin;
        log::debug!(
            "derivation {} begins (container {container_width}px, target {target_width}px)",
            ticket.generation
        );
        Derivation { builder: self, ticket, lease, target_width }
    }

    /// Swap `pending` in as the current layer unless something newer exists
    pub fn publish(&self, pending: PendingLayer) -> PublishOutcome {
        let generation = pending.generation();
        if pending.ticket.is_cancelled() || !self.gate.is_current(generation) {
            log::warn!("discarding result of superseded derivation {generation}");
            return PublishOutcome::Superseded { generation };
        }

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().is_some_and(|layer| layer.generation >= generation) {
            log::warn!("discarding result of derivation {generation}; a newer layer is published");
            return PublishOutcome::Superseded { generation };
        }

        let layer = Arc::new(pending.layer);
        *current = Some(Arc::clone(&layer));
        log::info!(
            "published layer {generation}: {} node(s) at {:.0}x{:.0}px",
            layer.nodes.len(),
            layer.viewport.width_px,
            layer.viewport.height_px
        );
        PublishOutcome::Published(layer)
    }

    /// Begin, run and publish in one call
    pub fn derive<E: PdfEngine + ?Sized>(
        &self,
        engine: &mut E,
        lease: SourceLease,
        container_width: f32,
    ) -> LayerResult<PublishOutcome> {
        let pending = self.begin(lease, container_width).run(engine)?;
        Ok(self.publish(pending))
    }

    pub fn current(&self) -> Option<Arc<PublishedLayer>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn node(&self, run: &TextRun, viewport: &ViewportGeometry, fonts: &FontRecord) -> OverlayNode {
        let placement = self.mapper.place(run, viewport.scale, viewport.height_px, self.measurer.as_ref());
        let style = fonts.classify(&run.font_id);

        OverlayNode {
            text: run.text.clone(),
            left_px: placement.left_px,
            top_px: placement.top_px,
            font_size_px: placement.font_size_px,
            width_px: placement.width_px,
            scale_x: placement.scale_x,
            bold: style.bold,
            italic: style.italic,
            raw_font_size: run.transform.d.abs(),
            font_name: fonts.resolve(&run.font_id).to_string(),
        }
    }
}

/// One in-flight derivation
pub struct Derivation<'b> {
    builder: &'b TextLayerBuilder,
    ticket: Ticket,
    lease: SourceLease,
    target_width: f32,
}

fn checkpoint(ticket: &Ticket) -> LayerResult<()> {
    if ticket.is_cancelled() {
        log::warn!("derivation {} superseded", ticket.generation);
        return Err(LayerError::Superseded { generation: ticket.generation });
    }
    Ok(())
}

impl Derivation<'_> {
    pub fn generation(&self) -> u64 {
        self.ticket.generation
    }

    pub fn target_width(&self) -> f32 {
        self.target_width
    }

    pub fn is_superseded(&self) -> bool {
        self.ticket.is_cancelled()
    }

    /// Decode, rasterize and build the overlay
    ///
    /// The source lease is revoked once the engine has decoded it, and the
    /// engine document is closed on every path out.
    pub fn run<E: PdfEngine + ?Sized>(self, engine: &mut E) -> LayerResult<PendingLayer> {
        let Derivation { builder, ticket, lease, target_width } = self;
        checkpoint(&ticket)?;

        if !(target_width.is_finite() && target_width > 0.0) {
            return Err(LayerError::RenderTargetUnavailable { width: target_width });
        }

        let handle = engine.open(lease.open_source()?).inspect_err(|err| {
            log::error!("derivation {}: failed to open document: {err}", ticket.generation);
        })?;
        lease.revoke();

        let result = builder.build(engine, handle, &ticket, target_width);
        if let Err(err) = engine.close(handle) {
            log::warn!("failed to close document {}: {err}", handle.raw());
        }
        if let Err(err) = &result {
            if !matches!(err, LayerError::Superseded { .. }) {
                log::error!("derivation {} failed: {err}", ticket.generation);
            }
        }

        result.map(|layer| PendingLayer { ticket, layer })
    }
}

impl TextLayerBuilder {
    fn build<E: PdfEngine + ?Sized>(
        &self,
        engine: &mut E,
        handle: DocumentHandle,
        ticket: &Ticket,
        target_width: f32,
    ) -> LayerResult<PublishedLayer> {
        let page = engine.page_size(handle, PAGE_INDEX)?;
        let viewport = ViewportGeometry::fit_width(page, target_width)
            .ok_or(LayerError::RenderTargetUnavailable { width: target_width })?;

        let fonts = Arc::new(FontRecord::new(engine.font_objects(handle, PAGE_INDEX)?));
        let runs = self.filter.apply(engine.text_content(handle, PAGE_INDEX)?);
        checkpoint(ticket)?;

        let raster = engine.render_page(
            handle,
            RenderRequest { page_index: PAGE_INDEX, scale: viewport.scale },
        )?;
        checkpoint(ticket)?;
        log::debug!(
            "derivation {}: rendered {}x{} raster at scale {:.3}",
            ticket.generation,
            raster.width(),
            raster.height(),
            viewport.scale
        );

        let nodes: Arc<[OverlayNode]> = runs
            .iter()
            .map(|run| self.node(run, &viewport, &fonts))
            .collect();

        Ok(PublishedLayer {
            generation: ticket.generation,
            viewport,
            raster: Arc::new(raster),
            nodes,
            fonts,
        })
    }
}
