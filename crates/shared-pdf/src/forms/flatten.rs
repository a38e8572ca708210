//! Flattening: draw widget appearances into page content and drop the form

use std::collections::{HashMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::appearance::{
    add_standard_fonts, check_content, existing_appearance, form_xobject, radio_content,
    text_content, ExistingAppearance, Placement, Rect,
};
use super::tree::{appearance_states, resolve, resolve_dict, FormField};
use crate::error::FormError;

const FLAG_HIDDEN: i64 = 1 << 1;

/// A validated value ready to be rendered
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Fill {
    Text(String),
    Checked(bool),
    /// Export value of the selected radio button
    Selected(String),
}

/// Render every visible widget onto its page and remove the AcroForm.
///
/// Widgets of filled fields get a freshly generated appearance. All other
/// widgets keep their existing normal appearance, if any.
pub(crate) fn flatten(
    doc: &mut Document,
    fields: &[FormField],
    fills: &HashMap<String, Fill>,
) -> Result<(), FormError> {
    let fonts = add_standard_fonts(doc);

    let mut widget_ids = HashSet::new();
    let mut placements: HashMap<ObjectId, Placement> = HashMap::new();

    for field in fields {
        for &widget in &field.widgets {
            widget_ids.insert(widget);
            if is_hidden(doc, widget) {
                continue;
            }
            let Some(rect) = Rect::of_widget(doc, widget) else {
                continue;
            };

            let generated = match fills.get(&field.name) {
                Some(Fill::Text(text)) => Some(text_content(
                    rect,
                    text,
                    field.default_appearance.as_deref(),
                    field.quadding,
                )),
                Some(Fill::Checked(true)) => Some(check_content(rect)),
                Some(Fill::Checked(false)) => continue,
                Some(Fill::Selected(value)) => {
                    if !appearance_states(doc, &[widget]).contains(value) {
                        continue;
                    }
                    Some(radio_content(rect))
                }
                None => None,
            };

            let placement = match generated {
                Some(content) => {
                    let xobject = doc.add_object(form_xobject(rect, content, &fonts));
                    Placement::fit(xobject, at_origin(rect), rect)
                }
                None => {
                    let Some((appearance, bbox)) = existing_appearance(doc, widget) else {
                        continue;
                    };
                    let xobject = match appearance {
                        ExistingAppearance::Object(id) => id,
                        ExistingAppearance::Inline(stream) => doc.add_object(stream),
                    };
                    Placement::fit(xobject, bbox, rect)
                }
            };
            placements.insert(widget, placement);
        }
    }

    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
    for (page_number, page_id) in pages {
        flatten_page(doc, page_number, page_id, &widget_ids, &placements)?;
    }

    let root = doc.trailer.get(b"Root")?.as_reference()?;
    doc.get_object_mut(root)?.as_dict_mut()?.remove(b"AcroForm");
    doc.prune_objects();
    Ok(())
}

fn at_origin(rect: Rect) -> Rect {
    Rect {
        llx: 0.0,
        lly: 0.0,
        ..rect
    }
}

fn is_hidden(doc: &Document, widget: ObjectId) -> bool {
    doc.get_object(widget)
        .and_then(Object::as_dict)
        .ok()
        .and_then(|dict| dict.get(b"F").ok())
        .and_then(|flags| flags.as_i64().ok())
        .is_some_and(|flags| flags & FLAG_HIDDEN != 0)
}

fn flatten_page(
    doc: &mut Document,
    page_number: u32,
    page_id: ObjectId,
    widget_ids: &HashSet<ObjectId>,
    placements: &HashMap<ObjectId, Placement>,
) -> Result<(), FormError> {
    let page = doc.get_object(page_id)?.as_dict()?;
    let annots: Vec<Object> = match page.get(b"Annots") {
        Ok(annots) => resolve(doc, annots)?
            .as_array()
            .map(|annots| annots.to_vec())
            .unwrap_or_default(),
        Err(_) => return Ok(()),
    };

    let mut kept = Vec::with_capacity(annots.len());
    let mut draws = Vec::new();
    for annot in annots {
        match annot.as_reference() {
            Ok(id) if widget_ids.contains(&id) => {
                if let Some(placement) = placements.get(&id) {
                    draws.push(*placement);
                }
            }
            _ => kept.push(annot),
        }
    }

    let mut resources = inherited_resources(doc, page_id)?;
    let mut contents = page_contents(doc, page)?;

    if !draws.is_empty() {
        let mut xobjects = match resources.get(b"XObject") {
            Ok(xobjects) => resolve_dict(doc, xobjects)?.clone(),
            Err(_) => Dictionary::new(),
        };
        let mut ops = b"Q\n".to_vec();
        for (index, placement) in draws.iter().enumerate() {
            let mut name = format!("FlatP{}W{}", page_number, index);
            while xobjects.has(name.as_bytes()) {
                name.push('_');
            }
            ops.extend(placement.draw_op(&name).into_bytes());
            xobjects.set(name, Object::Reference(placement.xobject));
        }
        resources.set("XObject", Object::Dictionary(xobjects));

        // Isolate the original content's graphics state from the overlays
        let open = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let close = doc.add_object(Stream::new(Dictionary::new(), ops));
        contents.insert(0, Object::Reference(open));
        contents.push(Object::Reference(close));
    }

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    if !draws.is_empty() {
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Array(contents));
    }
    if kept.is_empty() {
        page.remove(b"Annots");
    } else {
        page.set("Annots", Object::Array(kept));
    }
    Ok(())
}

/// Page resources, following `/Parent` when the page inherits them
fn inherited_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, FormError> {
    let mut current = Some(page_id);
    let mut depth = 0;
    while let Some(id) = current {
        let node = doc.get_object(id)?.as_dict()?;
        if let Ok(resources) = node.get(b"Resources") {
            return Ok(resolve_dict(doc, resources)?.clone());
        }
        current = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
        if depth > 64 {
            break;
        }
    }
    Ok(Dictionary::new())
}

fn page_contents(doc: &Document, page: &Dictionary) -> Result<Vec<Object>, FormError> {
    Ok(match page.get(b"Contents") {
        Ok(Object::Array(items)) => items.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id)? {
            Object::Array(items) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        _ => Vec::new(),
    })
}
