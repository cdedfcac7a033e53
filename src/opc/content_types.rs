//! The `[Content_Types].xml` manifest: default declarations keyed by file
//! extension and override declarations keyed by part path.

use crate::error::{Error, Result};
use crate::xml::XmlDoc;

/// Content-type registry for one package.
///
/// Both categories keep their file order; additions are idempotent
/// set-insertions keyed by extension (defaults) or part path (overrides).
#[derive(Debug, Default, Clone)]
pub struct ContentTypes {
    defaults: Vec<(String, String)>,
    overrides: Vec<(String, String)>,
}

impl ContentTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `[Content_Types].xml` part.
    pub fn from_doc(doc: &XmlDoc) -> Result<Self> {
        let mut types = Self::new();
        for node in doc.children(doc.root()).iter().copied() {
            match doc.name(node) {
                Some("Default") => {
                    let ext = required(doc.attr(node, "Extension"), "Extension")?;
                    let ct = required(doc.attr(node, "ContentType"), "ContentType")?;
                    types.ensure_default(&ext, &ct);
                }
                Some("Override") => {
                    let part = required(doc.attr(node, "PartName"), "PartName")?;
                    let ct = required(doc.attr(node, "ContentType"), "ContentType")?;
                    types.ensure_override(&part, &ct);
                }
                _ => {}
            }
        }
        Ok(types)
    }

    /// Register a default content type for an extension. No-op when the
    /// extension is already declared.
    pub fn ensure_default(&mut self, extension: &str, content_type: &str) {
        if !self.defaults.iter().any(|(ext, _)| ext == extension) {
            self.defaults
                .push((extension.to_string(), content_type.to_string()));
        }
    }

    /// Register an override for a part path (leading slash expected, e.g.
    /// `/word/comments.xml`). No-op when the part is already declared.
    pub fn ensure_override(&mut self, part_path: &str, content_type: &str) {
        if !self.overrides.iter().any(|(part, _)| part == part_path) {
            self.overrides
                .push((part_path.to_string(), content_type.to_string()));
        }
    }

    /// Default content type declared for an extension, if any.
    pub fn default_for(&self, extension: &str) -> Option<&str> {
        self.defaults
            .iter()
            .find(|(ext, _)| ext == extension)
            .map(|(_, ct)| ct.as_str())
    }

    /// Override content type declared for a part path, if any.
    pub fn override_for(&self, part_path: &str) -> Option<&str> {
        self.overrides
            .iter()
            .find(|(part, _)| part == part_path)
            .map(|(_, ct)| ct.as_str())
    }

    /// Iterate default declarations in file order.
    pub fn defaults(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defaults.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate override declarations in file order.
    pub fn overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.overrides.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialize to `[Content_Types].xml` bytes.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(1024);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        );
        for (ext, ct) in &self.defaults {
            xml.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(ct)
            ));
        }
        for (part, ct) in &self.overrides {
            xml.push_str(&format!(
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(part),
                escape_xml(ct)
            ));
        }
        xml.push_str("</Types>");
        xml
    }
}

fn required(value: Option<&str>, attr: &str) -> Result<String> {
    value.map(str::to_string).ok_or_else(|| {
        Error::MalformedPackage(format!("content-type entry missing '{}' attribute", attr))
    })
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::codec;

    #[test]
    fn test_ensure_is_idempotent() {
        let mut ct = ContentTypes::new();
        ct.ensure_default("png", "image/png");
        ct.ensure_default("png", "image/png");
        ct.ensure_override("/word/comments.xml", "ct");
        ct.ensure_override("/word/comments.xml", "ct");
        assert_eq!(ct.defaults().count(), 1);
        assert_eq!(ct.overrides().count(), 1);
    }

    #[test]
    fn test_existing_key_wins() {
        let mut ct = ContentTypes::new();
        ct.ensure_default("png", "image/png");
        ct.ensure_default("png", "image/apng");
        assert_eq!(ct.default_for("png"), Some("image/png"));
    }

    #[test]
    fn test_parse_round_trip() {
        let mut ct = ContentTypes::new();
        ct.ensure_default("xml", "application/xml");
        ct.ensure_override("/word/document.xml", "main");
        let doc = codec::parse(ct.to_xml().as_bytes()).unwrap();
        let reparsed = ContentTypes::from_doc(&doc).unwrap();
        assert_eq!(reparsed.default_for("xml"), Some("application/xml"));
        assert_eq!(reparsed.override_for("/word/document.xml"), Some("main"));
    }
}
