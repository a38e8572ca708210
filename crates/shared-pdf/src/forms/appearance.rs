//! Appearance streams for flattened widgets

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::text::encode_literal;
use super::tree::resolve_dict;

const PADDING: f32 = 2.0;
const MAX_AUTO_FONT_SIZE: f32 = 12.0;
const MIN_AUTO_FONT_SIZE: f32 = 4.0;
// Average Helvetica advance, used only for centering/right alignment
const HELVETICA_AVG_WIDTH: f32 = 0.5;
// ZapfDingbats advances for "4" (check mark) and "l" (filled circle)
const CHECK_WIDTH: f32 = 0.846;
const DOT_WIDTH: f32 = 0.791;

pub(crate) const TEXT_FONT: &str = "Helv";
pub(crate) const SYMBOL_FONT: &str = "ZaDb";

/// Widget rectangle normalized to lower-left origin and positive size
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Rect {
    pub llx: f32,
    pub lly: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn from_array(doc: &Document, object: &Object) -> Option<Self> {
        let resolved = match object {
            Object::Reference(id) => doc.get_object(*id).ok()?,
            other => other,
        };
        let values: Vec<f32> = resolved
            .as_array()
            .ok()?
            .iter()
            .filter_map(|v| v.as_float().ok())
            .collect();
        let [x1, y1, x2, y2] = values.as_slice() else {
            return None;
        };
        let rect = Rect {
            llx: x1.min(*x2),
            lly: y1.min(*y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        };
        (rect.width > 0.0 && rect.height > 0.0).then_some(rect)
    }

    pub fn of_widget(doc: &Document, widget: ObjectId) -> Option<Self> {
        let dict = doc.get_object(widget).ok()?.as_dict().ok()?;
        Self::from_array(doc, dict.get(b"Rect").ok()?)
    }
}

/// A Form XObject and the matrix that maps its bounding box onto a widget
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Placement {
    pub xobject: ObjectId,
    pub matrix: [f32; 6],
}

impl Placement {
    /// Scale and translate `bbox` so it covers `rect`
    pub fn fit(xobject: ObjectId, bbox: Rect, rect: Rect) -> Self {
        let sx = rect.width / bbox.width;
        let sy = rect.height / bbox.height;
        Self {
            xobject,
            matrix: [
                sx,
                0.0,
                0.0,
                sy,
                rect.llx - bbox.llx * sx,
                rect.lly - bbox.lly * sy,
            ],
        }
    }

    pub fn draw_op(&self, name: &str) -> String {
        let [a, b, c, d, e, f] = self.matrix;
        format!("q {} {} {} {} {} {} cm /{} Do Q\n", a, b, c, d, e, f, name)
    }
}

/// Font size from a default-appearance string such as `/Helv 0 Tf 0 g`
pub(crate) fn font_size_from_da(da: &str) -> Option<f32> {
    let tokens: Vec<&str> = da.split_whitespace().collect();
    let position = tokens.iter().position(|token| *token == "Tf")?;
    let size: f32 = tokens.get(position.checked_sub(1)?)?.parse().ok()?;
    (size > 0.0).then_some(size)
}

fn auto_font_size(height: f32) -> f32 {
    ((height - 2.0 * PADDING) * 0.75).clamp(MIN_AUTO_FONT_SIZE, MAX_AUTO_FONT_SIZE)
}

pub(crate) fn text_content(rect: Rect, text: &str, da: Option<&str>, quadding: i64) -> Vec<u8> {
    let size = da
        .and_then(font_size_from_da)
        .unwrap_or_else(|| auto_font_size(rect.height));
    let text_width = text.chars().count() as f32 * size * HELVETICA_AVG_WIDTH;
    let x = match quadding {
        1 => ((rect.width - text_width) / 2.0).max(PADDING),
        2 => (rect.width - PADDING - text_width).max(PADDING),
        _ => PADDING,
    };
    let y = ((rect.height - size) / 2.0 + size * 0.22).max(1.0);

    let mut content = format!(
        "/Tx BMC\nq\n1 1 {} {} re W n\nBT\n/{} {} Tf\n0 g\n{} {} Td\n",
        (rect.width - 2.0).max(0.0),
        (rect.height - 2.0).max(0.0),
        TEXT_FONT,
        size,
        x,
        y
    )
    .into_bytes();
    content.extend(encode_literal(text));
    content.extend_from_slice(b" Tj\nET\nQ\nEMC\n");
    content
}

fn symbol_content(rect: Rect, glyph: char, advance: f32, scale: f32) -> Vec<u8> {
    let size = rect.width.min(rect.height) * scale;
    let x = (rect.width - advance * size) / 2.0;
    let y = (rect.height - 0.7 * size) / 2.0;
    format!(
        "q\nBT\n/{} {} Tf\n0 g\n{} {} Td\n({}) Tj\nET\nQ\n",
        SYMBOL_FONT, size, x, y, glyph
    )
    .into_bytes()
}

pub(crate) fn check_content(rect: Rect) -> Vec<u8> {
    symbol_content(rect, '4', CHECK_WIDTH, 0.8)
}

pub(crate) fn radio_content(rect: Rect) -> Vec<u8> {
    symbol_content(rect, 'l', DOT_WIDTH, 0.6)
}

/// Standard Type 1 fonts shared by every generated appearance
pub(crate) fn add_standard_fonts(doc: &mut Document) -> Dictionary {
    let mut helvetica = Dictionary::new();
    helvetica.set("Type", Object::Name(b"Font".to_vec()));
    helvetica.set("Subtype", Object::Name(b"Type1".to_vec()));
    helvetica.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    helvetica.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));

    let mut dingbats = Dictionary::new();
    dingbats.set("Type", Object::Name(b"Font".to_vec()));
    dingbats.set("Subtype", Object::Name(b"Type1".to_vec()));
    dingbats.set("BaseFont", Object::Name(b"ZapfDingbats".to_vec()));

    let mut fonts = Dictionary::new();
    fonts.set(TEXT_FONT, Object::Reference(doc.add_object(helvetica)));
    fonts.set(SYMBOL_FONT, Object::Reference(doc.add_object(dingbats)));
    fonts
}

/// Wrap generated content in a Form XObject sized to `rect`
pub(crate) fn form_xobject(rect: Rect, content: Vec<u8>, fonts: &Dictionary) -> Stream {
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts.clone()));

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Form".to_vec()));
    dict.set(
        "BBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(rect.width),
            Object::Real(rect.height),
        ]),
    );
    dict.set("Resources", Object::Dictionary(resources));
    Stream::new(dict, content)
}

/// Where a widget's existing normal appearance lives
pub(crate) enum ExistingAppearance {
    Object(ObjectId),
    Inline(Stream),
}

/// Pick the widget's current normal appearance (`/AP /N`, selecting the
/// `/AS` state for checkboxes and radio buttons).
pub(crate) fn existing_appearance(
    doc: &Document,
    widget: ObjectId,
) -> Option<(ExistingAppearance, Rect)> {
    let dict = doc.get_object(widget).ok()?.as_dict().ok()?;
    let ap = resolve_dict(doc, dict.get(b"AP").ok()?).ok()?;
    let mut normal = ap.get(b"N").ok()?;

    let target = match normal {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    if let Object::Dictionary(states) = target {
        let state = dict.get(b"AS").ok()?.as_name().ok()?;
        normal = states.get(state).ok()?;
    }

    let (appearance, stream) = match normal {
        Object::Reference(id) => (
            ExistingAppearance::Object(*id),
            doc.get_object(*id).ok()?.as_stream().ok()?,
        ),
        Object::Stream(stream) => (ExistingAppearance::Inline(stream.clone()), stream),
        _ => return None,
    };
    let bbox = Rect::from_array(doc, stream.dict.get(b"BBox").ok()?)?;
    Some((appearance, bbox))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_size_from_da() {
        assert_eq!(font_size_from_da("/Helv 10 Tf 0 g"), Some(10.0));
        assert_eq!(font_size_from_da("/Helv 0 Tf 0 g"), None);
        assert_eq!(font_size_from_da("0 g"), None);
    }

    #[test]
    fn test_placement_fit_identity() {
        let rect = Rect {
            llx: 100.0,
            lly: 700.0,
            width: 200.0,
            height: 20.0,
        };
        let bbox = Rect {
            llx: 0.0,
            lly: 0.0,
            width: 200.0,
            height: 20.0,
        };
        let placement = Placement::fit((7, 0), bbox, rect);
        assert_eq!(placement.matrix, [1.0, 0.0, 0.0, 1.0, 100.0, 700.0]);
        assert_eq!(placement.draw_op("F1"), "q 1 0 0 1 100 700 cm /F1 Do Q\n");
    }

    #[test]
    fn test_text_content_contains_value() {
        let rect = Rect {
            llx: 0.0,
            lly: 0.0,
            width: 200.0,
            height: 20.0,
        };
        let content = String::from_utf8(text_content(rect, "Jane Doe", None, 0)).unwrap();
        assert!(content.contains("(Jane Doe) Tj"));
        assert!(content.contains("/Helv 12 Tf"));
    }
}
