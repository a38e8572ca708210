//! AcroForm detection, filling and flattening

mod appearance;
mod flatten;
mod text;
mod tree;

use std::collections::{BTreeMap, HashMap};

use shared_types::{Document, FieldSpec, FieldType, FieldValue};

use crate::error::FormError;
use flatten::Fill;
use text::is_encodable;
use tree::{collect_fields, widget_pages, FormField};

fn load(document: &Document) -> Result<lopdf::Document, FormError> {
    if !document.looks_like_pdf() {
        return Err(FormError::Corrupt("missing %PDF header".to_string()));
    }
    let doc = lopdf::Document::load_mem(document.bytes())?;
    if doc.trailer.has(b"Encrypt") {
        return Err(FormError::UnsupportedDocument(
            "encrypted documents are not supported".to_string(),
        ));
    }
    Ok(doc)
}

/// List the interactive form fields of a PDF.
///
/// Nested fields are reported with their fully qualified dotted name.
/// Documents without an AcroForm (or with an XFA-only form) are
/// `UnsupportedDocument`; unparseable bytes are `Corrupt`.
pub fn detect_fields(document: &Document) -> Result<Vec<FieldSpec>, FormError> {
    let doc = load(document)?;
    let fields = collect_fields(&doc)?;
    let pages = widget_pages(&doc);
    tracing::debug!("Detected {} form fields in {}", fields.len(), document.locator());
    Ok(fields.iter().map(|field| field.to_spec(&pages)).collect())
}

/// Fill the named fields and flatten the whole form into page content.
///
/// Every key must name an existing field and every value must suit that
/// field's type; nothing is written unless all of them do. The output has
/// no interactive fields left.
pub fn fill_and_flatten(
    document: &Document,
    values: &BTreeMap<String, FieldValue>,
) -> Result<Document, FormError> {
    let mut doc = load(document)?;
    let fields = collect_fields(&doc)?;
    let by_name: HashMap<&str, &FormField> = fields
        .iter()
        .map(|field| (field.name.as_str(), field))
        .collect();

    let mut fills = HashMap::with_capacity(values.len());
    for (name, value) in values {
        let field = by_name
            .get(name.as_str())
            .ok_or_else(|| FormError::UnknownField(name.clone()))?;
        fills.insert(name.clone(), coerce(field, value)?);
    }

    flatten::flatten(&mut doc, &fields, &fills)?;

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| FormError::Corrupt(format!("Save failed: {}", e)))?;

    tracing::info!(
        "Filled {} of {} fields in {} and flattened the form",
        fills.len(),
        fields.len(),
        document.locator()
    );
    Ok(Document::pdf(bytes, document.locator()))
}

/// Drawn values must be representable in the appearance font; nothing is
/// substituted.
fn coerce(field: &FormField, value: &FieldValue) -> Result<Fill, FormError> {
    let invalid = || FormError::InvalidValue(field.name.clone(), field.field_type);

    match (field.field_type, value) {
        (FieldType::Checkbox, FieldValue::Bool(checked)) => Ok(Fill::Checked(*checked)),
        (FieldType::Text, FieldValue::Text(_) | FieldValue::Number(_)) => {
            let text = value.display_text();
            match field.max_len {
                Some(max) if text.chars().count() > max => Err(invalid()),
                _ if !is_encodable(&text) => Err(invalid()),
                _ => Ok(Fill::Text(text)),
            }
        }
        (FieldType::Date, FieldValue::Text(text))
            if !text.trim().is_empty() && is_encodable(text) =>
        {
            Ok(Fill::Text(text.clone()))
        }
        (FieldType::Choice, FieldValue::Text(text)) => {
            if !is_encodable(text) {
                Err(invalid())
            } else if field.options.is_empty() || field.options.contains(text) {
                Ok(Fill::Text(text.clone()))
            } else {
                Err(invalid())
            }
        }
        (FieldType::Radio, FieldValue::Text(text)) if field.options.contains(text) => {
            Ok(Fill::Selected(text.clone()))
        }
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use pretty_assertions::assert_eq;

    fn sample() -> Document {
        Document::pdf(fixtures::sample_form_pdf(), "sample.pdf")
    }

    fn values(pairs: &[(&str, FieldValue)]) -> BTreeMap<String, FieldValue> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_detect_sample_fields() {
        let fields = detect_fields(&sample()).unwrap();
        let summary: Vec<(&str, FieldType, bool)> = fields
            .iter()
            .map(|f| (f.name.as_str(), f.field_type, f.required))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("full_name", FieldType::Text, true),
                ("agree_to_terms", FieldType::Checkbox, false),
                ("sign_date", FieldType::Date, false),
                ("state", FieldType::Choice, false),
                ("plan", FieldType::Radio, false),
                ("address.city", FieldType::Text, false),
            ]
        );
        assert!(fields.iter().all(|f| f.page == Some(1)));
    }

    #[test]
    fn test_detect_reports_options_and_values() {
        let fields = detect_fields(&sample()).unwrap();
        let state = fields.iter().find(|f| f.name == "state").unwrap();
        assert_eq!(state.options, vec!["CA", "NY", "TX"]);
        let plan = fields.iter().find(|f| f.name == "plan").unwrap();
        assert_eq!(plan.options, vec!["basic", "premium"]);
        let checkbox = fields.iter().find(|f| f.name == "agree_to_terms").unwrap();
        assert_eq!(checkbox.current_value, Some(FieldValue::Bool(false)));
    }

    #[test]
    fn test_detect_plain_pdf_is_unsupported() {
        let document = Document::pdf(fixtures::plain_pdf(), "plain.pdf");
        let err = detect_fields(&document).unwrap_err();
        assert!(matches!(err, FormError::UnsupportedDocument(_)));
    }

    #[test]
    fn test_detect_garbage_is_corrupt() {
        let document = Document::pdf(b"this is not a pdf".to_vec(), "junk.pdf");
        let err = detect_fields(&document).unwrap_err();
        assert_eq!(err.kind(), shared_types::ErrorKind::Corrupt);

        let truncated = Document::pdf(b"%PDF-1.7\n1 0 obj <<".to_vec(), "cut.pdf");
        assert!(matches!(
            detect_fields(&truncated).unwrap_err(),
            FormError::Corrupt(_)
        ));
    }

    #[test]
    fn test_fill_and_flatten_removes_form() {
        let filled = fill_and_flatten(
            &sample(),
            &values(&[
                ("full_name", FieldValue::Text("Jane Doe".into())),
                ("agree_to_terms", FieldValue::Bool(true)),
                ("state", FieldValue::Text("NY".into())),
                ("plan", FieldValue::Text("premium".into())),
            ]),
        )
        .unwrap();

        assert!(filled.looks_like_pdf());
        assert_eq!(filled.locator(), "sample.pdf");
        assert!(matches!(
            detect_fields(&filled).unwrap_err(),
            FormError::UnsupportedDocument(_)
        ));

        let doc = lopdf::Document::load_mem(filled.bytes()).unwrap();
        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        assert!(!page.has(b"Annots"));
        let text = fixtures::all_stream_text(&doc);
        assert!(text.contains("(Jane Doe) Tj"));
        assert!(text.contains("(NY) Tj"));
    }

    #[test]
    fn test_fill_unknown_field() {
        let err = fill_and_flatten(
            &sample(),
            &values(&[("middle_name", FieldValue::Text("Q".into()))]),
        )
        .unwrap_err();
        assert_eq!(err, FormError::UnknownField("middle_name".to_string()));
    }

    #[test]
    fn test_fill_checkbox_with_text_is_invalid() {
        let err = fill_and_flatten(
            &sample(),
            &values(&[("agree_to_terms", FieldValue::Text("yes".into()))]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            FormError::InvalidValue("agree_to_terms".to_string(), FieldType::Checkbox)
        );
        assert_eq!(
            err.to_string(),
            "Invalid value for field 'agree_to_terms': expected checkbox"
        );
    }

    #[test]
    fn test_fill_choice_outside_options() {
        let err = fill_and_flatten(&sample(), &values(&[("state", FieldValue::Text("ZZ".into()))]))
            .unwrap_err();
        assert_eq!(err.kind(), shared_types::ErrorKind::InvalidValue);
    }

    #[test]
    fn test_fill_number_into_text_field() {
        let filled = fill_and_flatten(
            &sample(),
            &values(&[("address.city", FieldValue::Number(94110.0))]),
        )
        .unwrap();
        let doc = lopdf::Document::load_mem(filled.bytes()).unwrap();
        assert!(fixtures::all_stream_text(&doc).contains("(94110) Tj"));
    }

    #[test]
    fn test_fill_date_field() {
        let filled = fill_and_flatten(
            &sample(),
            &values(&[("sign_date", FieldValue::Text("2024-03-01".into()))]),
        )
        .unwrap();
        let doc = lopdf::Document::load_mem(filled.bytes()).unwrap();
        assert!(fixtures::all_stream_text(&doc).contains("(2024-03-01) Tj"));
    }

    #[test]
    fn test_fill_blank_date_is_invalid() {
        for blank in ["", "   "] {
            let err = fill_and_flatten(
                &sample(),
                &values(&[("sign_date", FieldValue::Text(blank.into()))]),
            )
            .unwrap_err();
            assert_eq!(
                err,
                FormError::InvalidValue("sign_date".to_string(), FieldType::Date)
            );
        }
        let err = fill_and_flatten(&sample(), &values(&[("sign_date", FieldValue::Bool(true))]))
            .unwrap_err();
        assert_eq!(err.kind(), shared_types::ErrorKind::InvalidValue);
    }

    #[test]
    fn test_fill_winansi_punctuation() {
        let filled = fill_and_flatten(
            &sample(),
            &values(&[(
                "full_name",
                FieldValue::Text("Zo\u{EB} \u{0160}ar \u{20AC}5".into()),
            )]),
        )
        .unwrap();
        let doc = lopdf::Document::load_mem(filled.bytes()).unwrap();
        let mut drawn = Vec::new();
        for object in doc.objects.values() {
            if let lopdf::Object::Stream(stream) = object {
                let content = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                drawn.extend(content);
            }
        }
        let needle = b"(Zo\xEB \x8Aar \x805) Tj";
        assert!(drawn.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn test_fill_unencodable_text_is_invalid() {
        let err = fill_and_flatten(
            &sample(),
            &values(&[(
                "full_name",
                FieldValue::Text("\u{141}ukasz \u{674E} \u{20AC}5".into()),
            )]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            FormError::InvalidValue("full_name".to_string(), FieldType::Text)
        );

        let err = fill_and_flatten(
            &sample(),
            &values(&[(
                "sign_date",
                FieldValue::Text("\u{4EE4}\u{548C}6\u{5E74}".into()),
            )]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            FormError::InvalidValue("sign_date".to_string(), FieldType::Date)
        );
    }

    #[test]
    fn test_fill_nothing_still_flattens() {
        let filled = fill_and_flatten(&sample(), &BTreeMap::new()).unwrap();
        assert!(matches!(
            detect_fields(&filled).unwrap_err(),
            FormError::UnsupportedDocument(_)
        ));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeSet;

        fn field_names() -> impl Strategy<Value = Vec<String>> {
            prop::collection::btree_set("[a-z][a-z_]{0,11}", 1..6)
                .prop_map(|names: BTreeSet<String>| names.into_iter().collect())
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(24))]

            /// Property: whatever subset of fields is filled, the output has
            /// no interactive fields left.
            #[test]
            fn flattened_output_has_no_fields(
                names in field_names(),
                mask in prop::collection::vec(any::<bool>(), 6),
                value in "[A-Za-z0-9 ]{0,20}",
            ) {
                let document = Document::pdf(fixtures::text_form_pdf(&names), "props.pdf");
                let detected = detect_fields(&document).unwrap();
                prop_assert_eq!(detected.len(), names.len());

                let chosen: BTreeMap<String, FieldValue> = names
                    .iter()
                    .zip(&mask)
                    .filter(|(_, keep)| **keep)
                    .map(|(name, _)| (name.clone(), FieldValue::Text(value.clone())))
                    .collect();
                let filled = fill_and_flatten(&document, &chosen).unwrap();
                prop_assert!(
                    matches!(detect_fields(&filled), Err(FormError::UnsupportedDocument(_))),
                    "flattened output still has a form"
                );
            }

            /// Property: any mix of text, date, checkbox, choice and radio
            /// values flattens the sample form completely.
            #[test]
            fn flattened_mixed_form_has_no_fields(
                name in prop::option::of("[A-Za-z ]{1,20}"),
                date in prop::option::of("20[0-9]{2}-[01][0-9]-[0-3][0-9]"),
                agree in prop::option::of(any::<bool>()),
                state in prop::option::of(prop::sample::select(vec!["CA", "NY", "TX"])),
                plan in prop::option::of(prop::sample::select(vec!["basic", "premium"])),
            ) {
                let mut chosen = BTreeMap::new();
                if let Some(name) = &name {
                    chosen.insert("full_name".to_string(), FieldValue::Text(name.clone()));
                }
                if let Some(date) = &date {
                    chosen.insert("sign_date".to_string(), FieldValue::Text(date.clone()));
                }
                if let Some(agree) = agree {
                    chosen.insert("agree_to_terms".to_string(), FieldValue::Bool(agree));
                }
                if let Some(state) = state {
                    chosen.insert("state".to_string(), FieldValue::Text(state.to_string()));
                }
                if let Some(plan) = plan {
                    chosen.insert("plan".to_string(), FieldValue::Text(plan.to_string()));
                }

                let filled = fill_and_flatten(&sample(), &chosen).unwrap();
                prop_assert!(
                    matches!(detect_fields(&filled), Err(FormError::UnsupportedDocument(_))),
                    "flattened output still has a form"
                );
                let drawn = fixtures::all_stream_text(
                    &lopdf::Document::load_mem(filled.bytes()).unwrap(),
                );
                if let Some(date) = &date {
                    let needle = format!("({}) Tj", date);
                    prop_assert!(drawn.contains(&needle));
                }
                if let Some(state) = state {
                    let needle = format!("({}) Tj", state);
                    prop_assert!(drawn.contains(&needle));
                }
            }

            /// Property: one unknown key rejects the whole fill
            #[test]
            fn unknown_key_is_rejected(names in field_names(), extra in "[A-Z]{1,8}") {
                let document = Document::pdf(fixtures::text_form_pdf(&names), "props.pdf");
                let mut chosen: BTreeMap<String, FieldValue> = names
                    .iter()
                    .map(|name| (name.clone(), FieldValue::Text("x".into())))
                    .collect();
                chosen.insert(extra.clone(), FieldValue::Text("x".into()));
                prop_assert_eq!(
                    fill_and_flatten(&document, &chosen).unwrap_err(),
                    FormError::UnknownField(extra)
                );
            }
        }
    }
}
