mod common;

use common::{broken_file, config, init_logging, sample_file, sample_pdf, RETAINED_TEXTS};
use pdf_overlay_core::pdf_engine::{LopdfEngine, OpenSource, PdfEngine};
use pdf_overlay_core::{
    LayerError, PageViewer, PublishOutcome, RunFilter, SelectionRect, SourceError, SourceRegistry,
    TextLayerBuilder, UploadedFile, ViewerStatus,
};

fn viewer() -> PageViewer<LopdfEngine> {
    init_logging();
    PageViewer::new(LopdfEngine::new(), config()).expect("default config should validate")
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

#[test]
fn load_builds_filtered_attributed_nodes() {
    let mut viewer = viewer();
    let layer = viewer.load(sample_file(), 1200.0).expect("sample should load");

    let texts: Vec<&str> = layer.nodes.iter().map(|n| n.text.as_str()).collect();
    assert_eq!(texts, RETAINED_TEXTS);

    let title = &layer.nodes[0];
    assert_eq!(title.font_name, "Helvetica-Bold");
    assert!(title.bold && !title.italic);

    let aside = &layer.nodes[6];
    assert_eq!(aside.font_name, "Times-Italic");
    assert!(aside.italic && !aside.bold);

    let raw_sizes: Vec<f32> = layer.nodes.iter().map(|n| n.raw_font_size).collect();
    assert_eq!(raw_sizes, vec![24.0, 12.0, 12.0, 12.0, 12.0, 12.0, 12.0, 14.0, 16.0]);

    assert_eq!(viewer.status(), &ViewerStatus::Ready { generation: 1 });
}

#[test]
fn title_geometry_follows_render_scale() {
    let mut viewer = viewer();
    let layer = viewer.load(sample_file(), 1200.0).expect("sample should load");

    assert!(close(layer.viewport.scale, 2.0));
    assert!(close(layer.viewport.width_px, 1200.0));
    assert!(close(layer.viewport.height_px, 1600.0));

    let title = &layer.nodes[0];
    assert!(close(title.font_size_px, 48.0));
    assert!(close(title.left_px, 144.0));
    // 1600 - 720*2 - 48*0.8
    assert!(close(title.top_px, 121.6));
    // standard fonts without Widths advance by Helvetica metrics
    let declared = (611.0 + 222.0 + 278.0 + 222.0 + 556.0) / 1000.0 * 24.0 * 2.0;
    assert!(close(title.width_px, declared));
    assert!(close(title.scale_x, 1.0));
}

#[test]
fn published_nodes_match_filtered_run_count() {
    let mut viewer = viewer();
    let layer = viewer.load(sample_file(), 900.0).expect("sample should load");

    let mut engine = LopdfEngine::new();
    let handle = engine.open(OpenSource::Bytes(sample_pdf())).expect("sample should open");
    let items = engine.text_content(handle, 0).expect("text should extract");
    let raw_runs = items.iter().filter(|item| item.as_run().is_some()).count();
    let retained = RunFilter::default().apply(items).len();

    assert_eq!(raw_runs, 11);
    assert_eq!(layer.nodes.len(), retained);
    assert_eq!(layer.raster.width(), layer.viewport.width_px.round() as u32);
    assert_eq!(layer.raster.height(), layer.viewport.height_px.round() as u32);
    assert_eq!(viewer.overlay().len(), layer.nodes.len());
    assert_eq!(viewer.overlay().generation(), layer.generation);
}

#[test]
fn source_lease_is_released_on_success_and_failure() {
    let mut viewer = viewer();

    viewer.load(sample_file(), 800.0).expect("sample should load");
    assert_eq!(viewer.sources().live_count(), 0);

    viewer.load(broken_file(), 800.0).expect_err("broken pdf should fail");
    assert_eq!(viewer.sources().live_count(), 0);
}

#[test]
fn decode_failure_surfaces_status_and_keeps_previous_layer() {
    let mut viewer = viewer();
    viewer.load(sample_file(), 800.0).expect("sample should load");

    let err = viewer.load(broken_file(), 800.0).expect_err("broken pdf should fail");
    assert!(matches!(err, LayerError::Engine(_)));
    assert!(matches!(viewer.status(), ViewerStatus::Failed { .. }));

    let layer = viewer.layer().expect("previous layer should remain");
    assert_eq!(layer.generation, 1);
    assert_eq!(viewer.overlay().len(), RETAINED_TEXTS.len());
    assert_eq!(viewer.file().map(|f| f.name.as_str()), Some("sample.pdf"));
}

#[test]
fn upload_checks_reject_before_decoding() {
    let mut viewer = PageViewer::new(LopdfEngine::new(), config().with_max_source_mb(1))
        .expect("config should validate");

    let err = viewer
        .load(UploadedFile::new("scan.png", "image/png", sample_pdf()), 800.0)
        .expect_err("png should be rejected");
    assert!(matches!(err, LayerError::Source(SourceError::UnsupportedType { .. })));
    assert_eq!(
        viewer.status(),
        &ViewerStatus::Failed { message: "Only PDF files are accepted".to_string() }
    );

    let mut big = sample_pdf();
    big.resize(2 * 1024 * 1024, b' ');
    let err = viewer.load(UploadedFile::pdf("big.pdf", big), 800.0).expect_err("2MB should be rejected");
    assert_eq!(err.to_string(), "File cannot exceed 1MB");
    assert!(viewer.layer().is_none());
}

#[test]
fn zero_width_container_fails_without_publishing() {
    let mut viewer = viewer();
    let err = viewer.load(sample_file(), 0.0).expect_err("no render target");

    assert!(matches!(err, LayerError::RenderTargetUnavailable { .. }));
    assert!(viewer.layer().is_none());
    assert_eq!(viewer.sources().live_count(), 0);
}

#[test]
fn stale_derivation_result_is_discarded() {
    init_logging();
    let builder = TextLayerBuilder::with_config(config());
    let registry = SourceRegistry::new();
    let mut engine = LopdfEngine::new();
    let file = sample_file();

    let older = builder.begin(registry.lease(&file), 600.0).run(&mut engine).expect("older run completes");
    let newer = builder.begin(registry.lease(&file), 900.0).run(&mut engine).expect("newer run completes");

    assert!(matches!(builder.publish(older), PublishOutcome::Superseded { generation: 1 }));
    let PublishOutcome::Published(layer) = builder.publish(newer) else {
        panic!("newest derivation should publish");
    };
    assert!(close(layer.viewport.width_px, 900.0));
    assert_eq!(registry.live_count(), 0);
}

#[test]
fn manual_selection_copies_line_text() {
    let mut viewer = viewer();
    viewer.load(sample_file(), 1200.0).expect("sample should load");

    // "Hello world" line: baseline 680pt, top at 1600 - 1360 - 24*0.8 = 220.8px
    let selected = viewer.select_in_rect(&SelectionRect::from_points((0.0, 225.0), (1200.0, 235.0)));
    assert_eq!(selected, 3);
    assert_eq!(viewer.copy_selection(), "Hello world");

    viewer.clear_selection();
    let selected = viewer.select_in_rect(&SelectionRect::from_points((0.0, 100.0), (1200.0, 250.0)));
    assert_eq!(selected, 4);
    assert_eq!(viewer.copy_selection(), "Title\nHello world");
}

#[test]
fn overlay_serializes_for_rendering_host() {
    let mut viewer = viewer();
    viewer.load(sample_file(), 600.0).expect("sample should load");

    let json: serde_json::Value =
        serde_json::from_str(&viewer.overlay().to_json().expect("overlay should serialize"))
            .expect("json should parse");
    assert_eq!(json.as_array().map(Vec::len), Some(RETAINED_TEXTS.len()));
    assert_eq!(json[0]["font_name"], "Helvetica-Bold");
    assert_eq!(json[0]["bold"], true);
}
