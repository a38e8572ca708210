//! In-memory PDFs for tests
//!
//! Built with `lopdf` directly so tests never depend on files on disk.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

fn literal(value: &str) -> Object {
    Object::String(value.as_bytes().to_vec(), StringFormat::Literal)
}

fn rect(llx: i64, lly: i64, urx: i64, ury: i64) -> Object {
    Object::Array(vec![
        Object::Integer(llx),
        Object::Integer(lly),
        Object::Integer(urx),
        Object::Integer(ury),
    ])
}

struct Skeleton {
    doc: Document,
    pages_id: ObjectId,
    page_id: ObjectId,
}

fn skeleton(label: &str) -> Skeleton {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", name("Font")),
        ("Subtype", name("Type1")),
        ("BaseFont", name("Helvetica")),
    ]));
    let content = format!("BT /F1 14 Tf 72 740 Td ({}) Tj ET", label);
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
    let resources = Dictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(Dictionary::from_iter(vec![("F1", Object::Reference(font_id))])),
    )]);
    let page_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", name("Page")),
        ("Parent", Object::Reference(pages_id)),
        ("MediaBox", rect(0, 0, 612, 792)),
        ("Resources", Object::Dictionary(resources)),
        ("Contents", Object::Reference(content_id)),
    ]));

    let pages = Dictionary::from_iter(vec![
        ("Type", name("Pages")),
        ("Count", Object::Integer(1)),
        ("Kids", Object::Array(vec![Object::Reference(page_id)])),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    Skeleton {
        doc,
        pages_id,
        page_id,
    }
}

fn finish(mut skeleton: Skeleton, acroform: Option<Dictionary>) -> Vec<u8> {
    let mut catalog = Dictionary::from_iter(vec![
        ("Type", name("Catalog")),
        ("Pages", Object::Reference(skeleton.pages_id)),
    ]);
    if let Some(acroform) = acroform {
        let acroform_id = skeleton.doc.add_object(acroform);
        catalog.set("AcroForm", Object::Reference(acroform_id));
    }
    let catalog_id = skeleton.doc.add_object(catalog);
    skeleton.doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    skeleton
        .doc
        .save_to(&mut buffer)
        .expect("fixture PDF serializes");
    buffer
}

fn widget(page_id: ObjectId, area: Object) -> Dictionary {
    Dictionary::from_iter(vec![
        ("Type", name("Annot")),
        ("Subtype", name("Widget")),
        ("Rect", area),
        ("P", Object::Reference(page_id)),
        ("F", Object::Integer(4)),
    ])
}

fn text_field(page_id: ObjectId, partial: &str, area: Object) -> Dictionary {
    let mut field = widget(page_id, area);
    field.set("FT", name("Tx"));
    field.set("T", literal(partial));
    field
}

/// Normal-appearance dictionary with an "on" state and `Off`
fn toggle_appearance(doc: &mut Document, on_state: &str, size: i64) -> Object {
    let bbox = rect(0, 0, size, size);
    let on = doc.add_object(Stream::new(
        Dictionary::from_iter(vec![
            ("Type", name("XObject")),
            ("Subtype", name("Form")),
            ("BBox", bbox.clone()),
        ]),
        b"0 0 1 rg 2 2 8 8 re f".to_vec(),
    ));
    let off = doc.add_object(Stream::new(
        Dictionary::from_iter(vec![
            ("Type", name("XObject")),
            ("Subtype", name("Form")),
            ("BBox", bbox),
        ]),
        b"0 G 0.5 0.5 11 11 re S".to_vec(),
    ));
    let states = Dictionary::from_iter(vec![
        (on_state, Object::Reference(on)),
        ("Off", Object::Reference(off)),
    ]);
    Object::Dictionary(Dictionary::from_iter(vec![("N", Object::Dictionary(states))]))
}

/// A one-page AcroForm with a field of every supported kind:
///
/// - `full_name`: required text
/// - `agree_to_terms`: checkbox, unchecked
/// - `sign_date`: text formatted with `AFDate_FormatEx`
/// - `state`: combo box with options CA, NY, TX
/// - `plan`: radio group with `basic` and `premium`
/// - `address.city`: text nested under a non-terminal parent
pub fn sample_form_pdf() -> Vec<u8> {
    let mut skeleton = skeleton("Sample form");
    let page_id = skeleton.page_id;
    let doc = &mut skeleton.doc;
    let mut annots = Vec::new();
    let mut fields = Vec::new();

    let mut full_name = text_field(page_id, "full_name", rect(100, 700, 300, 720));
    full_name.set("Ff", Object::Integer(1 << 1));
    let full_name = doc.add_object(full_name);
    annots.push(full_name);
    fields.push(full_name);

    let mut agree = widget(page_id, rect(100, 660, 112, 672));
    agree.set("FT", name("Btn"));
    agree.set("T", literal("agree_to_terms"));
    agree.set("V", name("Off"));
    agree.set("AS", name("Off"));
    agree.set("AP", toggle_appearance(doc, "Yes", 12));
    let agree = doc.add_object(agree);
    annots.push(agree);
    fields.push(agree);

    let mut sign_date = text_field(page_id, "sign_date", rect(100, 620, 200, 640));
    let format = Dictionary::from_iter(vec![
        ("S", name("JavaScript")),
        ("JS", literal("AFDate_FormatEx(\"mm/dd/yyyy\");")),
    ]);
    sign_date.set(
        "AA",
        Object::Dictionary(Dictionary::from_iter(vec![("F", Object::Dictionary(format))])),
    );
    let sign_date = doc.add_object(sign_date);
    annots.push(sign_date);
    fields.push(sign_date);

    let mut state = widget(page_id, rect(100, 580, 200, 600));
    state.set("FT", name("Ch"));
    state.set("T", literal("state"));
    state.set("Ff", Object::Integer(1 << 17));
    state.set(
        "Opt",
        Object::Array(vec![literal("CA"), literal("NY"), literal("TX")]),
    );
    let state = doc.add_object(state);
    annots.push(state);
    fields.push(state);

    let plan = doc.new_object_id();
    let mut plan_kids = Vec::new();
    for (index, option) in ["basic", "premium"].into_iter().enumerate() {
        let x = 100 + 40 * index as i64;
        let mut kid = widget(page_id, rect(x, 540, x + 12, 552));
        kid.set("Parent", Object::Reference(plan));
        kid.set("AS", name("Off"));
        kid.set("AP", toggle_appearance(doc, option, 12));
        let kid = doc.add_object(kid);
        annots.push(kid);
        plan_kids.push(Object::Reference(kid));
    }
    doc.objects.insert(
        plan,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("FT", name("Btn")),
            ("T", literal("plan")),
            ("Ff", Object::Integer(1 << 15)),
            ("V", name("Off")),
            ("Kids", Object::Array(plan_kids)),
        ])),
    );
    fields.push(plan);

    let address = doc.new_object_id();
    let mut city = text_field(page_id, "city", rect(100, 500, 300, 520));
    city.set("Parent", Object::Reference(address));
    let city = doc.add_object(city);
    annots.push(city);
    doc.objects.insert(
        address,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("T", literal("address")),
            ("Kids", Object::Array(vec![Object::Reference(city)])),
        ])),
    );
    fields.push(address);

    attach(skeleton, annots, fields)
}

/// A one-page AcroForm with one plain text field per name
pub fn text_form_pdf(names: &[String]) -> Vec<u8> {
    let mut skeleton = skeleton("Text form");
    let page_id = skeleton.page_id;
    let mut ids = Vec::with_capacity(names.len());
    for (index, field_name) in names.iter().enumerate() {
        let y = 740 - 24 * (index as i64 % 30);
        let field = text_field(page_id, field_name, rect(100, y - 20, 400, y));
        ids.push(skeleton.doc.add_object(field));
    }
    attach(skeleton, ids.clone(), ids)
}

fn attach(mut skeleton: Skeleton, annots: Vec<ObjectId>, fields: Vec<ObjectId>) -> Vec<u8> {
    let helv = skeleton.doc.add_object(Dictionary::from_iter(vec![
        ("Type", name("Font")),
        ("Subtype", name("Type1")),
        ("BaseFont", name("Helvetica")),
    ]));
    if let Ok(page) = skeleton
        .doc
        .get_object_mut(skeleton.page_id)
        .and_then(Object::as_dict_mut)
    {
        page.set(
            "Annots",
            Object::Array(annots.into_iter().map(Object::Reference).collect()),
        );
    }
    let acroform = Dictionary::from_iter(vec![
        (
            "Fields",
            Object::Array(fields.into_iter().map(Object::Reference).collect()),
        ),
        ("DA", literal("/Helv 0 Tf 0 g")),
        (
            "DR",
            Object::Dictionary(Dictionary::from_iter(vec![(
                "Font",
                Object::Dictionary(Dictionary::from_iter(vec![("Helv", Object::Reference(helv))])),
            )])),
        ),
    ]);
    finish(skeleton, Some(acroform))
}

/// A one-page PDF with no form at all
pub fn plain_pdf() -> Vec<u8> {
    finish(skeleton("Plain document"), None)
}

/// Concatenated (decompressed where possible) content of every stream,
/// for asserting on what a flattened page draws.
pub fn all_stream_text(doc: &Document) -> String {
    let mut text = String::new();
    for object in doc.objects.values() {
        if let Object::Stream(stream) = object {
            let content = stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone());
            text.push_str(&String::from_utf8_lossy(&content));
            text.push('\n');
        }
    }
    text
}
