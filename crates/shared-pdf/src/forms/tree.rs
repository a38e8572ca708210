//! AcroForm field-tree traversal
//!
//! Terminal fields are collected with their inherited type and flags, a
//! fully qualified dotted name, and the widget annotations that render them.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object, ObjectId};
use shared_types::{FieldSpec, FieldType, FieldValue};

use super::text::decode_text_string;
use crate::error::FormError;

const MAX_DEPTH: usize = 32;

pub(crate) const FLAG_REQUIRED: i64 = 1 << 1;
pub(crate) const FLAG_RADIO: i64 = 1 << 15;
pub(crate) const FLAG_PUSHBUTTON: i64 = 1 << 16;

/// A terminal form field and everything needed to fill and flatten it
#[derive(Debug, Clone)]
pub(crate) struct FormField {
    pub name: String,
    pub field_type: FieldType,
    pub flags: i64,
    pub value: Option<Object>,
    pub default_appearance: Option<String>,
    pub quadding: i64,
    pub max_len: Option<usize>,
    pub options: Vec<String>,
    pub widgets: Vec<ObjectId>,
}

impl FormField {
    pub fn required(&self) -> bool {
        self.flags & FLAG_REQUIRED != 0
    }

    /// Current value as reported to callers
    pub fn current_value(&self) -> Option<FieldValue> {
        let value = self.value.as_ref()?;
        match self.field_type {
            FieldType::Checkbox => value
                .as_name()
                .ok()
                .map(|name| FieldValue::Bool(name != b"Off")),
            FieldType::Radio => match value.as_name() {
                Ok(b"Off") | Err(_) => None,
                Ok(name) => Some(FieldValue::Text(String::from_utf8_lossy(name).into_owned())),
            },
            FieldType::Signature => None,
            FieldType::Text | FieldType::Date | FieldType::Choice => {
                let text = match value {
                    Object::String(bytes, _) => decode_text_string(bytes),
                    Object::Array(items) => items
                        .iter()
                        .filter_map(|item| item.as_str().ok())
                        .map(decode_text_string)
                        .collect::<Vec<_>>()
                        .join(", "),
                    _ => return None,
                };
                (!text.is_empty()).then_some(FieldValue::Text(text))
            }
        }
    }

    pub fn to_spec(&self, pages: &HashMap<ObjectId, u32>) -> FieldSpec {
        FieldSpec {
            name: self.name.clone(),
            field_type: self.field_type,
            required: self.required(),
            current_value: self.current_value(),
            options: self.options.clone(),
            page: self
                .widgets
                .iter()
                .find_map(|widget| pages.get(widget).copied()),
        }
    }
}

/// Values that descendants inherit from their ancestors
#[derive(Debug, Clone, Default)]
struct Inherited {
    field_type: Option<Vec<u8>>,
    flags: Option<i64>,
    value: Option<Object>,
    default_appearance: Option<String>,
    quadding: Option<i64>,
}

/// Resolve one level of indirection
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object, FormError> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

pub(crate) fn resolve_dict<'a>(
    doc: &'a Document,
    object: &'a Object,
) -> Result<&'a Dictionary, FormError> {
    resolve(doc, object)?
        .as_dict()
        .map_err(|_| FormError::Corrupt("expected a dictionary".to_string()))
}

/// Collect all terminal fields of the document's AcroForm.
///
/// Returns `UnsupportedDocument` when there is no usable AcroForm.
pub(crate) fn collect_fields(doc: &Document) -> Result<Vec<FormField>, FormError> {
    let catalog = doc.catalog()?;
    let acroform = match catalog.get(b"AcroForm") {
        Ok(object) => resolve_dict(doc, object)?,
        Err(_) => {
            return Err(FormError::UnsupportedDocument(
                "document has no AcroForm".to_string(),
            ))
        }
    };

    let roots: Vec<ObjectId> = match acroform.get(b"Fields") {
        Ok(object) => resolve(doc, object)?
            .as_array()
            .map_err(|_| FormError::Corrupt("AcroForm /Fields is not an array".to_string()))?
            .iter()
            .filter_map(|field| field.as_reference().ok())
            .collect(),
        Err(_) => Vec::new(),
    };

    let inherited = Inherited {
        default_appearance: acroform
            .get(b"DA")
            .ok()
            .and_then(|da| da.as_str().ok())
            .map(|da| String::from_utf8_lossy(da).into_owned()),
        quadding: acroform.get(b"Q").ok().and_then(|q| q.as_i64().ok()),
        ..Inherited::default()
    };

    let mut fields = Vec::new();
    for root in roots {
        walk(doc, root, None, &inherited, 0, &mut fields)?;
    }

    if fields.is_empty() {
        let reason = if acroform.has(b"XFA") {
            "XFA forms are not supported"
        } else {
            "document has no fillable form fields"
        };
        return Err(FormError::UnsupportedDocument(reason.to_string()));
    }

    Ok(fields)
}

fn walk(
    doc: &Document,
    id: ObjectId,
    prefix: Option<&str>,
    parent: &Inherited,
    depth: usize,
    out: &mut Vec<FormField>,
) -> Result<(), FormError> {
    if depth > MAX_DEPTH {
        return Err(FormError::Corrupt("form field tree is too deep".to_string()));
    }
    let dict = doc
        .get_object(id)?
        .as_dict()
        .map_err(|_| FormError::Corrupt(format!("field {:?} is not a dictionary", id)))?;

    let partial = dict
        .get(b"T")
        .ok()
        .and_then(|t| t.as_str().ok())
        .map(decode_text_string);
    let name = match (prefix, partial) {
        (Some(prefix), Some(partial)) => format!("{}.{}", prefix, partial),
        (None, Some(partial)) => partial,
        (Some(prefix), None) => prefix.to_string(),
        (None, None) => String::new(),
    };

    let inherited = Inherited {
        field_type: dict
            .get(b"FT")
            .ok()
            .and_then(|ft| ft.as_name().ok())
            .map(<[u8]>::to_vec)
            .or_else(|| parent.field_type.clone()),
        flags: dict
            .get(b"Ff")
            .ok()
            .and_then(|ff| ff.as_i64().ok())
            .or(parent.flags),
        value: dict.get(b"V").ok().cloned().or_else(|| parent.value.clone()),
        default_appearance: dict
            .get(b"DA")
            .ok()
            .and_then(|da| da.as_str().ok())
            .map(|da| String::from_utf8_lossy(da).into_owned())
            .or_else(|| parent.default_appearance.clone()),
        quadding: dict
            .get(b"Q")
            .ok()
            .and_then(|q| q.as_i64().ok())
            .or(parent.quadding),
    };

    let kids: Vec<ObjectId> = match dict.get(b"Kids") {
        Ok(kids) => resolve(doc, kids)?
            .as_array()
            .map(|kids| kids.iter().filter_map(|k| k.as_reference().ok()).collect())
            .unwrap_or_default(),
        Err(_) => Vec::new(),
    };

    let (field_kids, widget_kids): (Vec<ObjectId>, Vec<ObjectId>) =
        kids.into_iter().partition(|kid| {
            doc.get_object(*kid)
                .ok()
                .and_then(|kid| kid.as_dict().ok())
                .is_some_and(|kid| kid.has(b"T"))
        });

    if !field_kids.is_empty() {
        let prefix = (!name.is_empty()).then_some(name.as_str());
        for kid in field_kids {
            walk(doc, kid, prefix, &inherited, depth + 1, out)?;
        }
        return Ok(());
    }

    if name.is_empty() {
        tracing::debug!("Skipping unnamed form field {:?}", id);
        return Ok(());
    }

    let flags = inherited.flags.unwrap_or(0);
    let Some(field_type) = classify(doc, dict, inherited.field_type.as_deref(), flags) else {
        return Ok(());
    };

    let widgets = if widget_kids.is_empty() {
        vec![id]
    } else {
        widget_kids
    };

    let options = match field_type {
        FieldType::Choice => choice_options(doc, dict),
        FieldType::Radio => appearance_states(doc, &widgets),
        _ => Vec::new(),
    };

    out.push(FormField {
        name,
        field_type,
        flags,
        value: inherited.value,
        default_appearance: inherited.default_appearance,
        quadding: inherited.quadding.unwrap_or(0),
        max_len: dict
            .get(b"MaxLen")
            .ok()
            .and_then(|m| m.as_i64().ok())
            .and_then(|m| usize::try_from(m).ok()),
        options,
        widgets,
    });
    Ok(())
}

fn classify(
    doc: &Document,
    dict: &Dictionary,
    field_type: Option<&[u8]>,
    flags: i64,
) -> Option<FieldType> {
    match field_type? {
        b"Tx" if has_date_format(doc, dict) => Some(FieldType::Date),
        b"Tx" => Some(FieldType::Text),
        b"Btn" if flags & FLAG_PUSHBUTTON != 0 => None,
        b"Btn" if flags & FLAG_RADIO != 0 => Some(FieldType::Radio),
        b"Btn" => Some(FieldType::Checkbox),
        b"Ch" => Some(FieldType::Choice),
        b"Sig" => Some(FieldType::Signature),
        other => {
            tracing::debug!(
                "Skipping field with unknown type {}",
                String::from_utf8_lossy(other)
            );
            None
        }
    }
}

/// Text fields formatted through Acrobat's `AFDate_*` helpers are dates
fn has_date_format(doc: &Document, dict: &Dictionary) -> bool {
    let script = (|| {
        let actions = resolve_dict(doc, dict.get(b"AA").ok()?).ok()?;
        let format = resolve_dict(doc, actions.get(b"F").ok()?).ok()?;
        match resolve(doc, format.get(b"JS").ok()?).ok()? {
            Object::String(bytes, _) => Some(bytes.clone()),
            Object::Stream(stream) => stream
                .decompressed_content()
                .ok()
                .or_else(|| Some(stream.content.clone())),
            _ => None,
        }
    })();
    script.is_some_and(|js| js.windows(6).any(|w| w == b"AFDate"))
}

fn choice_options(doc: &Document, dict: &Dictionary) -> Vec<String> {
    let Some(opt) = dict
        .get(b"Opt")
        .ok()
        .and_then(|opt| resolve(doc, opt).ok())
        .and_then(|opt| opt.as_array().ok())
    else {
        return Vec::new();
    };
    opt.iter()
        .filter_map(|entry| match entry {
            Object::String(bytes, _) => Some(decode_text_string(bytes)),
            // [export value, display text]
            Object::Array(pair) => pair
                .first()
                .and_then(|export| export.as_str().ok())
                .map(decode_text_string),
            _ => None,
        })
        .collect()
}

/// Names of the "on" appearance states across a field's widgets
pub(crate) fn appearance_states(doc: &Document, widgets: &[ObjectId]) -> Vec<String> {
    let mut states = Vec::new();
    for widget in widgets {
        let Some(normal) = normal_appearance(doc, *widget) else {
            continue;
        };
        if let Ok(normal) = normal.as_dict() {
            for (key, _) in normal.iter() {
                if key.as_slice() != b"Off" {
                    let state = String::from_utf8_lossy(key).into_owned();
                    if !states.contains(&state) {
                        states.push(state);
                    }
                }
            }
        }
    }
    states
}

/// The widget's `/AP /N` entry, resolved one level
pub(crate) fn normal_appearance(doc: &Document, widget: ObjectId) -> Option<&Object> {
    let dict = doc.get_object(widget).ok()?.as_dict().ok()?;
    let ap = resolve_dict(doc, dict.get(b"AP").ok()?).ok()?;
    resolve(doc, ap.get(b"N").ok()?).ok()
}

/// Map each annotation object on a page to its 1-indexed page number
pub(crate) fn widget_pages(doc: &Document) -> HashMap<ObjectId, u32> {
    let mut pages = HashMap::new();
    for (page_number, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_object(page_id).and_then(Object::as_dict) else {
            continue;
        };
        let Some(annots) = page
            .get(b"Annots")
            .ok()
            .and_then(|annots| resolve(doc, annots).ok())
            .and_then(|annots| annots.as_array().ok())
        else {
            continue;
        };
        for annot in annots {
            if let Ok(id) = annot.as_reference() {
                pages.insert(id, page_number);
            }
        }
    }
    pages
}
