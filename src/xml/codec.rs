//! XML parse/serialize boundary for package parts.
//!
//! Parses part bytes into an [`XmlDoc`] arena and serializes the arena back
//! to bytes with the standard OPC XML declaration. Text and attribute values
//! round-trip through quick-xml's escaping; element and attribute names are
//! kept in their prefixed form untouched.

use crate::error::{Error, Result};
use crate::xml::{NodeId, XmlDoc};
use quick_xml::Reader;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Cursor;

/// Parse an XML part into a tree.
///
/// Any well-formedness violation is an error; the loader treats that as a
/// fatal condition for the whole package.
pub fn parse(bytes: &[u8]) -> Result<XmlDoc> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();

    let mut doc: Option<XmlDoc> = None;
    // Stack of currently open elements; empty means we are at the prolog.
    let mut open: Vec<NodeId> = Vec::new();
    // Accumulates text split across Text/GeneralRef events.
    let mut pending_text = String::new();

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = std::str::from_utf8(e.name().as_ref())?.to_string();
                let node = if let Some(parent) = open.last().copied() {
                    let d = doc.as_mut().ok_or_else(|| {
                        Error::MalformedPackage("start tag before root element".to_string())
                    })?;
                    flush_text(d, parent, &mut pending_text);
                    let node = d.create_element(&name);
                    d.append(parent, node);
                    node
                } else if doc.is_none() {
                    let d = XmlDoc::with_root(&name);
                    let root = d.root();
                    doc = Some(d);
                    root
                } else {
                    return Err(Error::MalformedPackage(
                        "multiple root elements in part".to_string(),
                    ));
                };
                if let Some(d) = doc.as_mut() {
                    for attr in e.attributes() {
                        let attr = attr?;
                        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
                        let value = attr.unescape_value()?.into_owned();
                        d.set_attr(node, &key, &value);
                    }
                }
                if !is_empty {
                    open.push(node);
                }
            }
            Event::End(_) => {
                let d = doc
                    .as_mut()
                    .ok_or_else(|| Error::MalformedPackage("unexpected end tag".to_string()))?;
                let node = open
                    .pop()
                    .ok_or_else(|| Error::MalformedPackage("unbalanced end tag".to_string()))?;
                flush_text(d, node, &mut pending_text);
            }
            Event::Text(e) => {
                // Entities are delivered separately as GeneralRef, so the
                // text bytes here are already literal.
                if let (Some(_), Some(_)) = (&doc, open.last()) {
                    pending_text.push_str(std::str::from_utf8(e.as_ref())?);
                }
            }
            Event::CData(e) => {
                if let (Some(_), Some(_)) = (&doc, open.last()) {
                    pending_text.push_str(std::str::from_utf8(e.as_ref())?);
                }
            }
            Event::GeneralRef(e) => {
                // Entity references arrive as standalone events; only the
                // predefined XML entities and character references occur in
                // WordprocessingML parts.
                if open.last().is_some() {
                    let name = std::str::from_utf8(e.as_ref())?;
                    pending_text.push_str(&resolve_entity(name)?);
                }
            }
            // The prolog declaration is re-emitted on serialize; comments,
            // doctypes and processing instructions do not occur in parts
            // this crate edits.
            Event::Decl(_) | Event::Comment(_) | Event::DocType(_) | Event::PI(_) => {}
            Event::Eof => break,
        }
        buf.clear();
    }

    doc.ok_or_else(|| Error::MalformedPackage("part has no root element".to_string()))
}

fn flush_text(doc: &mut XmlDoc, parent: NodeId, pending: &mut String) {
    if !pending.is_empty() {
        let t = doc.create_text(pending);
        doc.append(parent, t);
        pending.clear();
    }
}

fn resolve_entity(name: &str) -> Result<String> {
    let resolved = match name {
        "amp" => "&".to_string(),
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok()
            } else {
                None
            };
            let ch = code
                .and_then(char::from_u32)
                .ok_or_else(|| Error::Escape(format!("unresolvable entity '&{};'", name)))?;
            ch.to_string()
        }
    };
    Ok(resolved)
}

/// Serialize a tree back to part bytes, prefixed with the standard
/// declaration.
pub fn serialize(doc: &XmlDoc) -> Result<Vec<u8>> {
    let mut writer = quick_xml::Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    write_node(&mut writer, doc, doc.root())?;
    Ok(writer.into_inner().into_inner())
}

fn write_node(
    writer: &mut quick_xml::Writer<Cursor<Vec<u8>>>,
    doc: &XmlDoc,
    node: NodeId,
) -> Result<()> {
    if let Some(text) = doc.text(node) {
        writer.write_event(Event::Text(BytesText::new(text)))?;
        return Ok(());
    }
    let Some(name) = doc.name(node) else {
        return Ok(());
    };
    let mut start = BytesStart::new(name);
    for attr in doc.attrs(node) {
        start.push_attribute((attr.name.as_str(), attr.value.as_str()));
    }
    let children = doc.children(node);
    if children.is_empty() {
        writer.write_event(Event::Empty(start))?;
    } else {
        writer.write_event(Event::Start(start))?;
        for &child in children {
            write_node(writer, doc, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new(name)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_document() {
        let xml = br#"<?xml version="1.0"?><w:document xmlns:w="x"><w:body><w:p><w:r><w:t>Hi</w:t></w:r></w:p></w:body></w:document>"#;
        let doc = parse(xml).unwrap();
        assert!(doc.is_named(doc.root(), "w:document"));
        let body = doc.first_child_named(doc.root(), "w:body").unwrap();
        assert_eq!(doc.text_content(body), "Hi");
    }

    #[test]
    fn test_parse_preserves_attributes_and_entities() {
        let xml = br#"<w:t xml:space="preserve">a &amp; b &#x2014; c</w:t>"#;
        let doc = parse(xml).unwrap();
        assert_eq!(doc.attr(doc.root(), "xml:space"), Some("preserve"));
        assert_eq!(doc.text_content(doc.root()), "a & b \u{2014} c");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse(b"<w:p><w:r></w:p>").is_err());
        assert!(parse(b"not xml at all").is_err());
        assert!(parse(b"").is_err());
    }

    #[test]
    fn test_round_trip_structural() {
        let xml = br#"<w:document xmlns:w="x"><w:body><w:p><w:r><w:t xml:space="preserve"> a &lt; b </w:t></w:r></w:p><w:sectPr/></w:body></w:document>"#;
        let doc = parse(xml).unwrap();
        let bytes = serialize(&doc).unwrap();
        let reparsed = parse(&bytes).unwrap();
        assert!(XmlDoc::deep_eq(&doc, doc.root(), &reparsed, reparsed.root()));
    }

    #[test]
    fn test_serialize_escapes_text() {
        let mut doc = XmlDoc::with_root("w:t");
        let root = doc.root();
        doc.set_text_content(root, "a<b&c");
        let bytes = serialize(&doc).unwrap();
        let s = String::from_utf8(bytes).unwrap();
        assert!(s.contains("a&lt;b&amp;c"));
    }
}
