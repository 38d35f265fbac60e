//! Shared test utilities for the extraction integration tests.
//!
//! Test PDFs are created programmatically using lopdf. Every page shares a
//! resource dictionary with a Helvetica font named `/F1`.

#![allow(dead_code)]

use lopdf::{Document, Object, ObjectId, Stream, dictionary};

/// Create a PDF with one page per content stream.
pub fn pdf_with_pages(contents: &[String]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids: Vec<Object> = Vec::new();
    for content in contents {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => contents.len() as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("failed to save test PDF");
    buf
}

/// Single-page PDF.
pub fn pdf_with_content(content: impl Into<String>) -> Vec<u8> {
    pdf_with_pages(&[content.into()])
}

/// A text run at `(x, y)` in 10pt Helvetica.
pub fn text_at(text: &str, x: f64, y: f64) -> String {
    format!("BT /F1 10 Tf 1 0 0 1 {x} {y} Tm ({text}) Tj ET\n")
}

/// A box of thin filled rectangles: x 50..250, y 50..150.
pub fn single_box() -> String {
    "50 50 1 100 re 250 50 1 100 re 50 50 200 1 re 50 150 200 1 re f\n".to_string()
}

/// A 2x2 grid of thin filled rectangles spanning x 100..300 and y 100..300.
///
/// The interior vertical at x = 200 always covers the bottom row; it covers
/// the top row only when `top_interior_vertical` is set. Seven edges.
pub fn two_by_two(top_interior_vertical: bool) -> String {
    let mut ops = String::from(
        "100 100 1 200 re 300 100 1 200 re \
         100 100 200 1 re 100 200 200 1 re 100 300 200 1 re \
         200 100 1 100 re ",
    );
    if top_interior_vertical {
        ops.push_str("200 200 1 100 re ");
    }
    ops.push_str("f\n");
    ops
}

/// One run per cell of [`two_by_two`], reading A B / C D.
pub fn two_by_two_text() -> String {
    [
        text_at("A", 110.0, 250.0),
        text_at("B", 210.0, 250.0),
        text_at("C", 110.0, 150.0),
        text_at("D", 210.0, 150.0),
    ]
    .concat()
}
