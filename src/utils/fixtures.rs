// In-memory PDF builders for tests.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

/// Builds a PDF with one page per entry, each page showing its text once.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = build_document(pages);
    save(&mut doc)
}

/// Builds a one-page PDF whose trailer points at the given Info dictionary.
pub fn pdf_with_info(info: Dictionary) -> Vec<u8> {
    let mut doc = build_document(&["with metadata"]);
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", info_id);
    save(&mut doc)
}

/// Builds a multi-page PDF whose page `broken` (1-based) points its
/// `Contents` at an object that does not exist.
pub fn pdf_with_missing_contents(pages: &[&str], broken: u32) -> Vec<u8> {
    let mut doc = build_document(pages);
    let page_id = doc.get_pages()[&broken];
    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .expect("page dictionary");
    page.set("Contents", Object::Reference((9999, 0)));
    save(&mut doc)
}

fn build_document(pages: &[&str]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(24)]),
                Operation::new("Td", vec![Object::Integer(72), Object::Integer(700)]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let encoded = content.encode().expect("content stream encodes");
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

fn save(doc: &mut Document) -> Vec<u8> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("in-memory save");
    buf
}
