//! The fixed prefix -> URI namespace table used by WordprocessingML packages.
//!
//! Every qualified name this crate creates resolves its prefix through this
//! table. The table is process-constant data, injected into element
//! construction rather than re-derived at each call site.

use phf::phf_map;

/// All namespace prefixes observed in document.xml, core.xml and friends.
pub static NAMESPACES: phf::Map<&'static str, &'static str> = phf_map! {
    "mo" => "http://schemas.microsoft.com/office/mac/office/2008/main",
    "o" => "urn:schemas-microsoft-com:office:office",
    "ve" => "http://schemas.openxmlformats.org/markup-compatibility/2006",
    // Text content
    "w" => "http://schemas.openxmlformats.org/wordprocessingml/2006/main",
    "w10" => "urn:schemas-microsoft-com:office:word",
    "wne" => "http://schemas.microsoft.com/office/word/2006/wordml",
    // Drawing
    "a" => "http://schemas.openxmlformats.org/drawingml/2006/main",
    "m" => "http://schemas.openxmlformats.org/officeDocument/2006/math",
    "mv" => "urn:schemas-microsoft-com:mac:vml",
    "pic" => "http://schemas.openxmlformats.org/drawingml/2006/picture",
    "v" => "urn:schemas-microsoft-com:vml",
    "wp" => "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing",
    // Properties (core and extended)
    "cp" => "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
    "dc" => "http://purl.org/dc/elements/1.1/",
    "ep" => "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties",
    "xsi" => "http://www.w3.org/2001/XMLSchema-instance",
    // Content types
    "ct" => "http://schemas.openxmlformats.org/package/2006/content-types",
    // Package relationships
    "r" => "http://schemas.openxmlformats.org/officeDocument/2006/relationships",
    "pr" => "http://schemas.openxmlformats.org/package/2006/relationships",
    // Dublin Core document properties
    "dcmitype" => "http://purl.org/dc/dcmitype/",
    "dcterms" => "http://purl.org/dc/terms/",
    // Special xml namespace
    "xml" => "http://www.w3.org/XML/1998/namespace",
};

/// Look up the URI for a namespace prefix.
#[inline]
pub fn uri(prefix: &str) -> Option<&'static str> {
    NAMESPACES.get(prefix).copied()
}

/// Make sure the document root declares the given prefixes.
///
/// Element construction stores prefixed names; a part that never used a
/// prefix before (say `pic:` on the first picture) needs the declaration
/// added at its root for third-party readers to resolve it.
pub fn ensure_declared(doc: &mut crate::xml::XmlDoc, prefixes: &[&str]) {
    let root = doc.root();
    for prefix in prefixes {
        let name = format!("xmlns:{}", prefix);
        if doc.attr(root, &name).is_none() {
            if let Some(uri) = uri(prefix) {
                doc.set_attr(root, &name, uri);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_prefixes() {
        assert_eq!(
            uri("w"),
            Some("http://schemas.openxmlformats.org/wordprocessingml/2006/main")
        );
        assert_eq!(
            uri("xml"),
            Some("http://www.w3.org/XML/1998/namespace")
        );
        assert_eq!(uri("nope"), None);
    }
}
