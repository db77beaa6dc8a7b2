//! Page overlay: draws the provenance marker (and logo) onto each page.
//!
//! Each stamped page gets:
//! - its existing content wrapped in `q`/`Q` so prior graphics state cannot leak
//! - a page-local copy of its (possibly inherited) resources with our font,
//!   image and graphics-state entries added
//! - one appended overlay content stream
//!
//! Objects shared with other pages are never mutated.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use notary_core::config::{TextPolicy, WatermarkConfig};
use notary_core::{NotaryError, NotaryResult};

use crate::logo::LogoImage;

/// Used when a page has no resolvable MediaBox (US Letter).
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Upper bound on `/Parent` hops when resolving inherited attributes.
const MAX_TREE_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StampSummary {
    pub pages: usize,
    pub text_pages: usize,
    pub logo_pages: usize,
}

/// Document-wide objects shared by every page overlay.
struct SharedObjects {
    open_q: ObjectId,
    font: ObjectId,
    text_gs: ObjectId,
    logo: Option<(ObjectId, ObjectId, f32)>,
}

/// Reject anything that is not a PDF with a catalog and at least one page.
pub fn check_structure(doc: &Document) -> NotaryResult<()> {
    let root = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| NotaryError::unsupported_document("document has no catalog"))?;
    let catalog = doc
        .get_dictionary(root)
        .map_err(|_| NotaryError::unsupported_document("document catalog is not a dictionary"))?;
    if catalog.get(b"Pages").is_err() {
        return Err(NotaryError::unsupported_document("document has no page tree"));
    }
    if doc.get_pages().is_empty() {
        return Err(NotaryError::unsupported_document("document has no pages"));
    }
    Ok(())
}

/// Replace characters a standard Type1 font cannot show with `?`.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .map(|c| if (' '..='~').contains(&c) { c } else { '?' })
        .collect()
}

/// Stamp every page of `doc`.
pub fn stamp_document(
    doc: &mut Document,
    text: &str,
    logo: Option<&LogoImage>,
    config: &WatermarkConfig,
) -> NotaryResult<StampSummary> {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let mut summary = StampSummary {
        pages: page_ids.len(),
        ..Default::default()
    };
    // Text is drawn whenever anything is drawn, so no logo under the legacy
    // policy means the pages are left untouched.
    if logo.is_none() && config.text_policy == TextPolicy::WithLogoOnly {
        return Ok(summary);
    }

    let shared = SharedObjects {
        open_q: doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec())),
        font: doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        }),
        text_gs: doc.add_object(ext_gstate(config.text_opacity)),
        logo: logo.map(|img| {
            let image = add_image(doc, img);
            let gs = doc.add_object(ext_gstate(config.logo_opacity));
            (image, gs, img.aspect())
        }),
    };

    let text = sanitize_text(text);
    for page_id in page_ids {
        stamp_page(doc, page_id, &text, &shared, config)?;
        summary.text_pages += 1;
        if shared.logo.is_some() {
            summary.logo_pages += 1;
        }
    }
    Ok(summary)
}

fn ext_gstate(opacity: f32) -> Dictionary {
    dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(opacity),
        "CA" => Object::Real(opacity),
    }
}

fn add_image(doc: &mut Document, img: &LogoImage) -> ObjectId {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => img.width as i64,
        "Height" => img.height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    if let Some(alpha) = &img.alpha {
        let mut smask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => img.width as i64,
                "Height" => img.height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha.clone(),
        );
        let _ = smask.compress();
        dict.set("SMask", doc.add_object(smask));
    }
    let mut stream = Stream::new(dict, img.rgb.clone());
    let _ = stream.compress();
    doc.add_object(stream)
}

fn stamp_page(
    doc: &mut Document,
    page_id: ObjectId,
    text: &str,
    shared: &SharedObjects,
    config: &WatermarkConfig,
) -> NotaryResult<()> {
    let [llx, lly, urx, _ury] = media_box(doc, page_id);
    let page_width = urx - llx;
    let x = llx + config.margin;
    let y = lly + config.margin;

    let mut resources = page_resources(doc, page_id);
    let mut ops = vec![Operation::new("Q", vec![])];

    if let Some((image_id, gs_id, aspect)) = shared.logo {
        let im = add_resource(doc, &mut resources, "XObject", "NtLogo", image_id);
        let gs = add_resource(doc, &mut resources, "ExtGState", "NtLogoGs", gs_id);
        let w = config.logo_max_width.min(page_width * config.logo_width_fraction);
        let h = w * aspect;
        ops.extend([
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(gs)]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(w),
                    0.into(),
                    0.into(),
                    Object::Real(h),
                    Object::Real(x),
                    Object::Real(y + config.logo_offset_y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(im)]),
            Operation::new("Q", vec![]),
        ]);
    }

    let font = add_resource(doc, &mut resources, "Font", "NtHelv", shared.font);
    let gs = add_resource(doc, &mut resources, "ExtGState", "NtTextGs", shared.text_gs);
    ops.extend([
        Operation::new("q", vec![]),
        Operation::new("gs", vec![Object::Name(gs)]),
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(font), Object::Real(config.text_size)]),
        Operation::new("rg", vec![0.into(), 0.into(), 0.into()]),
        Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ]);

    // Leading newline keeps the token boundary with the preceding stream.
    let mut overlay = b"\n".to_vec();
    overlay.extend(
        Content { operations: ops }
            .encode()
            .map_err(|e| NotaryError::unsupported_document(format!("encode overlay: {e}")))?,
    );
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), overlay));

    let mut contents = vec![Object::Reference(shared.open_q)];
    contents.extend(page_contents(doc, page_id));
    contents.push(Object::Reference(overlay_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| NotaryError::unsupported_document(format!("page {page_id:?}: {e}")))?;

    page.set("Contents", Object::Array(contents));
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// The page's content streams as a flat list of entries for a Contents array.
///
/// `/Contents` may be a stream reference, an array, or a reference to an array;
/// the last form is spliced so no array ends up nested inside another.
fn page_contents(doc: &Document, page_id: ObjectId) -> Vec<Object> {
    let Some(contents) = doc.get_dictionary(page_id).ok().and_then(|p| p.get(b"Contents").ok()) else {
        return Vec::new();
    };
    match contents {
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Array(streams)) => streams.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Object::Array(streams) => streams.clone(),
        _ => Vec::new(),
    }
}

fn deref<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

/// Look up `key` on the page, falling back to its ancestors.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(deref(doc, value));
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn number(doc: &Document, obj: &Object) -> Option<f32> {
    match deref(doc, obj) {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// The page's MediaBox normalized to `[llx, lly, urx, ury]`.
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let parsed = inherited(doc, page_id, b"MediaBox")
        .and_then(|o| o.as_array().ok())
        .filter(|a| a.len() == 4)
        .and_then(|a| a.iter().map(|o| number(doc, o)).collect::<Option<Vec<f32>>>());
    match parsed {
        Some(v) => [v[0].min(v[2]), v[1].min(v[3]), v[0].max(v[2]), v[1].max(v[3])],
        None => DEFAULT_MEDIA_BOX,
    }
}

/// Page-local copy of the page's effective resources.
fn page_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    inherited(doc, page_id, b"Resources")
        .and_then(|o| o.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new)
}

/// Register `id` under a fresh name in `resources[category]`, returning the name.
fn add_resource(
    doc: &Document,
    resources: &mut Dictionary,
    category: &str,
    base: &str,
    id: ObjectId,
) -> Vec<u8> {
    let mut sub = resources
        .get(category.as_bytes())
        .ok()
        .map(|o| deref(doc, o))
        .and_then(|o| o.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);

    let mut name = base.as_bytes().to_vec();
    let mut n = 1;
    while sub.has(&name) {
        name = format!("{base}{n}").into_bytes();
        n += 1;
    }
    sub.set(name.clone(), Object::Reference(id));
    resources.set(category, Object::Dictionary(sub));
    name
}
