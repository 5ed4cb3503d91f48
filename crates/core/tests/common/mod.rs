#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdf_overlay_core::{OverlayConfig, UploadedFile};

pub const PAGE_WIDTH: f32 = 600.0;
pub const PAGE_HEIGHT: f32 = 800.0;

/// Texts the run filter keeps from [`sample_pdf`], in content order
pub const RETAINED_TEXTS: [&str; 9] =
    ["Title", "Hello", " ", "world", "tight", "spacing", "aside", "Heading", "Large"];

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Config whose render target is exactly the container width
pub fn config() -> OverlayConfig {
    OverlayConfig::default().with_container_margin(1.0)
}

fn line(font: &str, size: i64, y: i64, show: Operation) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font.into(), size.into()]),
        Operation::new("Td", vec![72.into(), y.into()]),
        show,
        Operation::new("ET", vec![]),
    ]
}

fn tj(text: &str) -> Operation {
    Operation::new("Tj", vec![Object::string_literal(text)])
}

fn tj_array(parts: Vec<Object>) -> Operation {
    Operation::new("TJ", vec![Object::Array(parts)])
}

/// One 600x800pt page exercising bold, italic, large text and spacing runs
pub fn sample_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font = |doc: &mut Document, base: &str| {
        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => base,
        })
    };
    let bold = font(&mut doc, "Helvetica-Bold");
    let regular = font(&mut doc, "Helvetica");
    let italic = font(&mut doc, "Times-Italic");

    let mut operations = Vec::new();
    operations.extend(line("F1", 24, 720, tj("Title")));
    operations.push(Operation::new("BMC", vec!["Span".into()]));
    // 3000/1000 em gap at 12pt: a 36pt space run, kept
    operations.extend(line(
        "F2",
        12,
        680,
        tj_array(vec![Object::string_literal("Hello"), (-3000).into(), Object::string_literal("world")]),
    ));
    operations.push(Operation::new("EMC", vec![]));
    // 1 em gap: a 12pt space run at 12pt size, dropped
    operations.extend(line(
        "F2",
        12,
        660,
        tj_array(vec![Object::string_literal("tight"), (-1000).into(), Object::string_literal("spacing")]),
    ));
    // lone space, 3.3pt wide, dropped
    operations.extend(line("F2", 12, 640, tj(" ")));
    operations.extend(line("F3", 12, 620, tj("aside")));
    operations.extend(line("F1", 14, 600, tj("Heading")));
    operations.extend(line("F2", 16, 580, tj("Large")));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().expect("content should encode")));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), 600.into(), 800.into()],
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => bold, "F2" => regular, "F3" => italic },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("pdf should serialize");
    bytes
}

pub fn sample_file() -> UploadedFile {
    UploadedFile::pdf("sample.pdf", sample_pdf())
}

pub fn broken_file() -> UploadedFile {
    UploadedFile::pdf("broken.pdf", b"%PDF-1.4\n1 0 obj << /Type /Catalog".to_vec())
}
