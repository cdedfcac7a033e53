//! Inline picture insertion.
//!
//! Copies the image bytes into the package media directory, registers the
//! relationship and content type, and builds the DrawingML inline element
//! tree. When the caller gives no explicit size, the dimensions are sniffed
//! from the PNG, GIF or JPEG header.

use crate::docx::builders;
use crate::docx::package::Package;
use crate::error::{Error, Result};
use crate::opc::{content_type, extension, relationship_type};
use crate::xml::{NodeId, ns};

/// On-screen objects are measured in English Metric Units.
const EMU_PER_PIXEL: u64 = 12700;

/// Read `(width, height)` in pixels from an image header, if the format is
/// one of PNG, GIF or JPEG.
pub fn dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        return png_dimensions(bytes);
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return gif_dimensions(bytes);
    }
    if bytes.starts_with(&[0xFF, 0xD8]) {
        return jpeg_dimensions(bytes);
    }
    None
}

fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    // IHDR is always the first chunk: width and height at offsets 16 and 20.
    if bytes.len() < 24 || &bytes[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes(bytes[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(bytes[20..24].try_into().ok()?);
    Some((width, height))
}

fn gif_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 10 {
        return None;
    }
    let width = u16::from_le_bytes(bytes[6..8].try_into().ok()?);
    let height = u16::from_le_bytes(bytes[8..10].try_into().ok()?);
    Some((width as u32, height as u32))
}

fn jpeg_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    // Walk the marker segments until a start-of-frame block.
    let mut pos = 2;
    while pos + 9 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        let length = u16::from_be_bytes(bytes[pos + 2..pos + 4].try_into().ok()?) as usize;
        if (0xC0..=0xCF).contains(&marker) && marker != 0xC4 && marker != 0xC8 && marker != 0xCC {
            let height = u16::from_be_bytes(bytes[pos + 5..pos + 7].try_into().ok()?);
            let width = u16::from_be_bytes(bytes[pos + 7..pos + 9].try_into().ok()?);
            return Some((width as u32, height as u32));
        }
        pos += 2 + length;
    }
    None
}

fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "gif" => content_type::GIF,
        "jpeg" | "jpg" => content_type::JPEG,
        _ => content_type::PNG,
    }
}

/// Insert an inline picture as a new paragraph at the end of the body.
///
/// `size` overrides the sniffed pixel dimensions; when neither is available
/// the insertion fails rather than writing a zero-sized drawing. Media
/// relationships are always appended under a fresh id, even for a repeated
/// filename.
pub fn insert_picture(
    pkg: &mut Package,
    filename: &str,
    bytes: Vec<u8>,
    description: &str,
    size: Option<(u32, u32)>,
) -> Result<NodeId> {
    let (width, height) = match size.or_else(|| dimensions(&bytes)) {
        Some(dims) => dims,
        None => return Err(Error::ImageDimensions(filename.to_string())),
    };
    let ext = extension(filename);
    pkg.content_types.ensure_default(ext, mime_for_extension(ext));
    pkg.insert_raw(&format!("word/media/{}", filename), bytes);
    let rel_id = pkg
        .rels
        .add(&format!("media/{}", filename), relationship_type::IMAGE)
        .ok_or_else(|| {
            Error::MalformedPackage(format!("no relationship allocated for media/{}", filename))
        })?;

    let cx = (width as u64 * EMU_PER_PIXEL).to_string();
    let cy = (height as u64 * EMU_PER_PIXEL).to_string();
    // The drawing tree is the first place these prefixes may appear.
    ns::ensure_declared(&mut pkg.document, &["wp", "a", "pic", "r"]);
    let doc = &mut pkg.document;

    let pic = doc.create_element("pic:pic");
    let nv_pic_pr = doc.create_element("pic:nvPicPr");
    let cnv_pr = doc.create_element_with(
        "pic:cNvPr",
        &[("id", "0"), ("name", "Picture 1"), ("descr", filename)],
    );
    doc.append(nv_pic_pr, cnv_pr);
    let cnv_pic_pr = doc.create_element("pic:cNvPicPr");
    let locks = doc.create_element_with(
        "a:picLocks",
        &[("noChangeAspect", "1"), ("noChangeArrowheads", "1")],
    );
    doc.append(cnv_pic_pr, locks);
    doc.append(nv_pic_pr, cnv_pic_pr);
    doc.append(pic, nv_pic_pr);

    let blip_fill = doc.create_element("pic:blipFill");
    let blip = doc.create_element_with("a:blip", &[("r:embed", rel_id.as_str())]);
    doc.append(blip_fill, blip);
    let src_rect = doc.create_element("a:srcRect");
    doc.append(blip_fill, src_rect);
    let stretch = doc.create_element("a:stretch");
    let fill_rect = doc.create_element("a:fillRect");
    doc.append(stretch, fill_rect);
    doc.append(blip_fill, stretch);
    doc.append(pic, blip_fill);

    let sp_pr = doc.create_element_with("pic:spPr", &[("bwMode", "auto")]);
    let xfrm = doc.create_element("a:xfrm");
    let off = doc.create_element_with("a:off", &[("x", "0"), ("y", "0")]);
    doc.append(xfrm, off);
    let ext_el = doc.create_element_with("a:ext", &[("cx", cx.as_str()), ("cy", cy.as_str())]);
    doc.append(xfrm, ext_el);
    doc.append(sp_pr, xfrm);
    let geom = doc.create_element_with("a:prstGeom", &[("prst", "rect")]);
    let av_lst = doc.create_element("a:avLst");
    doc.append(geom, av_lst);
    doc.append(sp_pr, geom);
    doc.append(pic, sp_pr);

    let graphic_data = doc.create_element_with(
        "a:graphicData",
        &[("uri", "http://schemas.openxmlformats.org/drawingml/2006/picture")],
    );
    doc.append(graphic_data, pic);
    let graphic = doc.create_element("a:graphic");
    doc.append(graphic, graphic_data);

    let inline = doc.create_element_with(
        "wp:inline",
        &[("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")],
    );
    let wp_extent = doc.create_element_with("wp:extent", &[("cx", cx.as_str()), ("cy", cy.as_str())]);
    doc.append(inline, wp_extent);
    let effect = doc.create_element_with(
        "wp:effectExtent",
        &[("l", "25400"), ("t", "0"), ("r", "0"), ("b", "0")],
    );
    doc.append(inline, effect);
    let doc_pr = doc.create_element_with(
        "wp:docPr",
        &[("id", "2"), ("name", "Picture 1"), ("descr", description)],
    );
    doc.append(inline, doc_pr);
    let frame_pr = doc.create_element("wp:cNvGraphicFramePr");
    let frame_locks = doc.create_element_with("a:graphicFrameLocks", &[("noChangeAspect", "1")]);
    doc.append(frame_pr, frame_locks);
    doc.append(inline, frame_pr);
    doc.append(inline, graphic);

    let drawing = doc.create_element("w:drawing");
    doc.append(drawing, inline);
    let run = doc.create_element("w:r");
    doc.append(run, drawing);
    let paragraph = doc.create_element("w:p");
    doc.append(paragraph, run);
    builders::attach_to_body(pkg, paragraph);
    Ok(paragraph)
}
