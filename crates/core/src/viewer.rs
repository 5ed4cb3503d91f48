//! Single-page viewer
//!
//! Ties the builder, rule engine, resize coordinator and source registry
//! together for one uploaded file. All methods run on the caller's thread;
//! time is passed in so the caller's event loop drives the resize debounce.

use crate::annotation::{AnnotationRule, RuleEngine, RuleState};
use crate::builder::{PublishOutcome, PublishedLayer, TextLayerBuilder};
use crate::config::OverlayConfig;
use crate::error::{ConfigError, LayerError, LayerResult};
use crate::measure::{SansSerifMeasurer, TextMeasurer};
use crate::overlay::OverlayLayer;
use crate::resize::ResizeCoordinator;
use crate::selection::SelectionRect;
use crate::source::{SourceRegistry, UploadedFile};
use pdf_engine::PdfEngine;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerStatus {
    /// Nothing loaded yet
    Empty,
    /// A layer is published
    Ready { generation: u64 },
    /// The last load or re-derivation failed; any earlier layer stays shown
    Failed { message: String },
}

pub struct PageViewer<E: PdfEngine> {
    engine: E,
    builder: TextLayerBuilder,
    rules: RuleEngine,
    resize: ResizeCoordinator,
    sources: SourceRegistry,
    file: Option<UploadedFile>,
    status: ViewerStatus,
}

impl<E: PdfEngine> PageViewer<E> {
    pub fn new(engine: E, config: OverlayConfig) -> Result<Self, ConfigError> {
        Self::with_measurer(engine, config, Arc::new(SansSerifMeasurer))
    }

    pub fn with_measurer(
        engine: E,
        config: OverlayConfig,
        measurer: Arc<dyn TextMeasurer>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            engine,
            rules: RuleEngine::from_config(&config),
            resize: ResizeCoordinator::from_config(&config),
            builder: TextLayerBuilder::new(config, measurer),
            sources: SourceRegistry::new(),
            file: None,
            status: ViewerStatus::Empty,
        })
    }

    /// Validate `file` and derive its first page for the container width
    ///
    /// On failure the viewer reports [`ViewerStatus::Failed`] and keeps the
    /// previously loaded file and layer.
    pub fn load(&mut self, file: UploadedFile, container_width: f32) -> LayerResult<Arc<PublishedLayer>> {
        if let Err(err) = file.validate(self.builder.config().max_source_bytes) {
            log::error!("rejected {}: {err}", file.name);
            self.status = ViewerStatus::Failed { message: err.to_string() };
            return Err(err.into());
        }

        let layer = self.derive(&file, container_width)?;
        self.file = Some(file);
        self.resize.settle(container_width);
        Ok(layer)
    }

    fn derive(&mut self, file: &UploadedFile, container_width: f32) -> LayerResult<Arc<PublishedLayer>> {
        let lease = self.sources.lease(file);
        let outcome = self.builder.derive(&mut self.engine, lease, container_width);

        match outcome {
            Ok(PublishOutcome::Published(layer)) => {
                self.rules.rebind(&layer);
                self.status = ViewerStatus::Ready { generation: layer.generation };
                Ok(layer)
            }
            Ok(PublishOutcome::Superseded { generation }) => Err(LayerError::Superseded { generation }),
            Err(err) => {
                self.resize.unsettle();
                self.status = ViewerStatus::Failed { message: err.to_string() };
                Err(err)
            }
        }
    }

    /// Report a container size change
    pub fn on_resize(&mut self, container_width: f32, now: Instant) -> bool {
        self.file.is_some() && self.resize.observe(container_width, now)
    }

    /// Run the debounced re-derivation if its quiet window has passed
    ///
    /// `None` when nothing was due.
    pub fn tick(&mut self, now: Instant) -> Option<LayerResult<Arc<PublishedLayer>>> {
        let width = self.resize.poll(now)?;
        let file = self.file.clone()?;
        Some(self.derive(&file, width))
    }

    /// When [`tick`](Self::tick) next has work, if ever
    pub fn next_deadline(&self) -> Option<Instant> {
        self.resize.deadline()
    }

    pub fn activate(&mut self, rule: AnnotationRule) -> RuleState {
        self.rules.activate(rule)
    }

    pub fn deactivate(&mut self) {
        self.rules.deactivate();
    }

    pub fn rule_state(&self) -> RuleState {
        self.rules.state()
    }

    pub fn select_font(&mut self, name: &str) -> usize {
        self.rules.select_font(name)
    }

    pub fn select_in_rect(&mut self, rect: &SelectionRect) -> usize {
        self.rules.select_in_rect(rect)
    }

    pub fn clear_selection(&mut self) {
        self.rules.clear_selection();
    }

    /// Text to place on the clipboard
    pub fn copy_selection(&self) -> String {
        self.rules.selected_text()
    }

    pub fn status(&self) -> &ViewerStatus {
        &self.status
    }

    /// Published raster and nodes
    pub fn layer(&self) -> Option<Arc<PublishedLayer>> {
        self.builder.current()
    }

    /// Nodes with their current presentation
    pub fn overlay(&self) -> &OverlayLayer {
        self.rules.layer()
    }

    pub fn file(&self) -> Option<&UploadedFile> {
        self.file.as_ref()
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Stop reacting to resizes; the published layer stays readable
    pub fn close(&mut self) {
        self.resize.disconnect();
    }
}
