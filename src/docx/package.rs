//! The package: part registry, typed part slots and the body handle.
//!
//! Loading parses every XML-bearing archive member, classifies the known
//! parts into typed slots and carries everything else through opaquely.
//! A `Package` exclusively owns its in-memory part graph; the graph is
//! reclaimed when the value drops.

use crate::docx::format::{self, FontOptions, ParagraphOptions};
use crate::docx::search::{self, ResultKind, Scope};
use crate::docx::template;
use crate::error::{Error, Result};
use crate::opc::content_types::ContentTypes;
use crate::opc::rel::Relationships;
use crate::opc::{content_type, extension, phys_pkg};
use crate::xml::{NodeId, XmlDoc, codec};
use log::debug;
use std::collections::HashMap;
use std::path::Path;

/// Part paths with dedicated slots.
pub(crate) mod part_path {
    pub const CONTENT_TYPES: &str = "[Content_Types].xml";
    pub const DOCUMENT: &str = "word/document.xml";
    pub const DOCUMENT_RELS: &str = "word/_rels/document.xml.rels";
    pub const STYLES: &str = "word/styles.xml";
    pub const COMMENTS: &str = "word/comments.xml";
}

/// Extension defaults back-filled on load when the manifest lacks them.
const BACKFILL_DEFAULTS: [(&str, &str); 6] = [
    ("gif", content_type::GIF),
    ("jpeg", content_type::JPEG),
    ("jpg", content_type::JPEG),
    ("png", content_type::PNG),
    ("rels", content_type::OPC_RELATIONSHIPS),
    ("xml", content_type::XML),
];

/// An in-memory WordprocessingML package.
///
/// Typed slots hold the parts the mutation algorithms understand; every
/// other member (media, settings, properties, unknown parts) is retained
/// opaquely and re-emitted verbatim on serialization.
pub struct Package {
    /// Member paths in archive order; serialization preserves it.
    entry_order: Vec<String>,
    /// Opaque members keyed by path.
    raw: HashMap<String, Vec<u8>>,
    /// The main document part.
    pub document: XmlDoc,
    /// The `w:body` element inside [`Package::document`].
    body: NodeId,
    /// Styles part, absent when the source package has none.
    styles: Option<XmlDoc>,
    /// Comments part, created lazily on first use.
    pub(crate) comments: Option<XmlDoc>,
    /// Relationships scoped to the main document part.
    pub rels: Relationships,
    /// The `[Content_Types].xml` manifest.
    pub content_types: ContentTypes,
}

impl Package {
    /// Create a package from the blank-document template.
    pub fn new() -> Result<Self> {
        Self::from_entries(template::blank_entries())
    }

    /// Open a package from a `.docx` file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Load a package from archive bytes.
    ///
    /// Malformed XML in any part is a fatal load error; an unknown part
    /// type is retained opaquely rather than rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_entries(phys_pkg::extract_all(bytes)?)
    }

    fn from_entries(entries: Vec<(String, Vec<u8>)>) -> Result<Self> {
        let mut entry_order = Vec::with_capacity(entries.len());
        let mut raw = HashMap::new();
        let mut document = None;
        let mut styles = None;
        let mut comments = None;
        let mut rels = None;
        let mut content_types = None;

        for (name, data) in entries {
            entry_order.push(name.clone());
            match name.as_str() {
                part_path::CONTENT_TYPES => {
                    content_types = Some(ContentTypes::from_doc(&parse_part(&name, &data)?)?);
                }
                part_path::DOCUMENT => {
                    document = Some(parse_part(&name, &data)?);
                }
                part_path::DOCUMENT_RELS => {
                    rels = Some(Relationships::from_doc(&parse_part(&name, &data)?)?);
                }
                part_path::STYLES => {
                    styles = Some(parse_part(&name, &data)?);
                }
                part_path::COMMENTS => {
                    comments = Some(parse_part(&name, &data)?);
                }
                _ => {
                    // Unknown XML parts still have to be well formed; they
                    // are then carried through untouched.
                    let ext = extension(&name);
                    if ext.eq_ignore_ascii_case("xml") || ext.eq_ignore_ascii_case("rels") {
                        parse_part(&name, &data)?;
                    }
                    raw.insert(name, data);
                }
            }
        }

        let document = document
            .ok_or_else(|| Error::PartNotFound(part_path::DOCUMENT.to_string()))?;
        let body = document
            .first_child_named(document.root(), "w:body")
            .ok_or_else(|| Error::MalformedPackage("document part has no w:body".to_string()))?;
        let mut content_types = content_types
            .ok_or_else(|| Error::PartNotFound(part_path::CONTENT_TYPES.to_string()))?;
        for (ext, ct) in BACKFILL_DEFAULTS {
            content_types.ensure_default(ext, ct);
        }

        debug!("loaded package with {} members", entry_order.len());
        Ok(Self {
            entry_order,
            raw,
            document,
            body,
            styles,
            comments,
            rels: rels.unwrap_or_default(),
            content_types,
        })
    }

    /// The `w:body` element of the main document.
    #[inline]
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// The styles part, created with empty document defaults when absent.
    pub fn styles_mut(&mut self) -> Result<&mut XmlDoc> {
        if self.styles.is_none() {
            self.styles = Some(codec::parse(template::STYLES.as_bytes())?);
            self.register_part(part_path::STYLES, content_type::WML_STYLES);
        }
        match self.styles.as_mut() {
            Some(styles) => Ok(styles),
            None => Err(Error::PartNotFound(part_path::STYLES.to_string())),
        }
    }

    /// The styles part, if the package has one.
    pub fn styles(&self) -> Option<&XmlDoc> {
        self.styles.as_ref()
    }

    /// The comments part, if one exists.
    pub fn comments(&self) -> Option<&XmlDoc> {
        self.comments.as_ref()
    }

    /// Opaque member bytes by path (media files, settings, properties).
    pub fn raw_part(&self, path: &str) -> Option<&[u8]> {
        self.raw.get(path).map(Vec::as_slice)
    }

    /// Member paths in archive order.
    pub fn member_paths(&self) -> impl Iterator<Item = &str> {
        self.entry_order.iter().map(String::as_str)
    }

    /// Store an opaque member, replacing any previous bytes at that path.
    pub fn insert_raw(&mut self, path: &str, bytes: Vec<u8>) {
        if self.raw.insert(path.to_string(), bytes).is_none() {
            self.entry_order.push(path.to_string());
        }
    }

    /// Add a typed part path to the member order and declare its override.
    pub(crate) fn register_part(&mut self, path: &str, content_type: &str) {
        if !self.entry_order.iter().any(|p| p == path) {
            self.entry_order.push(path.to_string());
        }
        self.content_types
            .ensure_override(&format!("/{}", path), content_type);
    }

    /// First match of `pattern` in the document, widened to the requested
    /// element kind.
    pub fn search(&self, pattern: &str, kind: ResultKind, scope: Scope) -> Result<Option<NodeId>> {
        search::search(&self.document, self.document.root(), pattern, kind, scope)
    }

    /// Replace every match of `pattern` in the document with `replacement`.
    pub fn replace(&mut self, pattern: &str, replacement: &str, scope: Scope) -> Result<()> {
        let root = self.document.root();
        search::replace(&mut self.document, root, pattern, replacement, scope)
    }

    /// Remove empty text fragments and runs left without children.
    ///
    /// An explicit normalization pass; mutation operations do not run it
    /// implicitly.
    pub fn clean(&mut self) {
        for fragment in self.document.descendants_named(self.body, "w:t") {
            if self.document.text_content(fragment).is_empty() {
                self.document.detach(fragment);
            }
        }
        for run in self.document.descendants_named(self.body, "w:r") {
            if self.document.children(run).is_empty() {
                self.document.detach(run);
            }
        }
    }

    /// The document's raw text as a list of paragraph strings; tab marks
    /// flatten to `\t`, empty paragraphs are skipped.
    pub fn document_text(&self) -> Vec<String> {
        let mut out = Vec::new();
        for paragraph in self.document.descendants_named(self.document.root(), "w:p") {
            let mut text = String::new();
            for node in self.document.descendants(paragraph) {
                match self.document.name(node) {
                    Some("w:t") => text.push_str(&self.document.text_content(node)),
                    Some("w:tab") => text.push('\t'),
                    _ => {}
                }
            }
            if !text.is_empty() {
                out.push(text);
            }
        }
        out
    }

    /// The `w:sectPr` element at the end of the body, created when absent.
    pub fn section_properties(&mut self) -> NodeId {
        if let Some(sect) = self.document.first_child_named(self.body, "w:sectPr") {
            return sect;
        }
        let sect = self.document.create_element("w:sectPr");
        self.document.append(self.body, sect);
        sect
    }

    /// Set page margins (twentieths of a point) on the body's section.
    /// `None` fields keep their current value.
    pub fn set_margins(&mut self, margins: &Margins) {
        let sect = self.section_properties();
        let pg_mar = match self.document.first_child_named(sect, "w:pgMar") {
            Some(existing) => existing,
            None => {
                let created = self.document.create_element("w:pgMar");
                self.document.append(sect, created);
                created
            }
        };
        let fields = [
            ("w:left", margins.left),
            ("w:right", margins.right),
            ("w:top", margins.top),
            ("w:bottom", margins.bottom),
            ("w:header", margins.header),
            ("w:footer", margins.footer),
            ("w:gutter", margins.gutter),
        ];
        for (attr, value) in fields {
            if let Some(v) = value {
                self.document.set_attr(pg_mar, attr, &v.to_string());
            }
        }
    }

    /// Append a named style with empty paragraph and run property children
    /// to the styles part, returning the new `w:style` element.
    pub fn add_style(&mut self, style_id: &str, style_type: &str, default: bool) -> Result<NodeId> {
        let styles = self.styles_mut()?;
        let root = styles.root();
        let style = styles.create_element_with(
            "w:style",
            &[("w:styleId", style_id), ("w:type", style_type)],
        );
        if default {
            styles.set_attr(style, "w:default", "1");
        }
        let ppr = styles.create_element("w:pPr");
        styles.append(style, ppr);
        let rpr = styles.create_element("w:rPr");
        styles.append(style, rpr);
        styles.append(root, style);
        Ok(style)
    }

    /// Apply font options to the document-wide run defaults
    /// (`w:docDefaults/w:rPrDefault`), and to every named style definition
    /// when `include_styles` is set.
    pub fn modify_font_defaults(&mut self, opts: &FontOptions, include_styles: bool) -> Result<()> {
        let styles = self.styles_mut()?;
        let host = ensure_defaults_host(styles, "w:rPrDefault");
        format::apply_font(styles, host, opts);
        if include_styles {
            let root = styles.root();
            for style in styles.children_named(root, "w:style") {
                format::apply_font(styles, style, opts);
            }
        }
        Ok(())
    }

    /// Apply paragraph options to the document-wide paragraph defaults
    /// (`w:docDefaults/w:pPrDefault`), and to every named style definition
    /// when `include_styles` is set.
    pub fn modify_paragraph_defaults(
        &mut self,
        opts: &ParagraphOptions,
        include_styles: bool,
    ) -> Result<()> {
        let styles = self.styles_mut()?;
        let host = ensure_defaults_host(styles, "w:pPrDefault");
        format::apply_paragraph(styles, host, opts);
        if include_styles {
            let root = styles.root();
            for style in styles.children_named(root, "w:style") {
                format::apply_paragraph(styles, style, opts);
            }
        }
        Ok(())
    }

    /// Serialize the package back to archive bytes.
    ///
    /// Typed parts are re-emitted from their trees at their original paths;
    /// opaque members are copied through verbatim.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut members: Vec<(&str, Vec<u8>)> = Vec::with_capacity(self.entry_order.len());
        for path in &self.entry_order {
            let bytes = match path.as_str() {
                part_path::CONTENT_TYPES => self.content_types.to_xml().into_bytes(),
                part_path::DOCUMENT => codec::serialize(&self.document)?,
                part_path::DOCUMENT_RELS => self.rels.to_xml().into_bytes(),
                part_path::STYLES => match &self.styles {
                    Some(styles) => codec::serialize(styles)?,
                    None => continue,
                },
                part_path::COMMENTS => match &self.comments {
                    Some(comments) => codec::serialize(comments)?,
                    None => continue,
                },
                _ => match self.raw.get(path) {
                    Some(data) => data.clone(),
                    None => continue,
                },
            };
            members.push((path, bytes));
        }
        // Relationships created against a package that had no rels member.
        if !self.rels.is_empty() && !self.entry_order.iter().any(|p| p == part_path::DOCUMENT_RELS)
        {
            members.push((part_path::DOCUMENT_RELS, self.rels.to_xml().into_bytes()));
        }
        debug!("serializing package with {} members", members.len());
        phys_pkg::build(members.iter().map(|(name, data)| (*name, data.as_slice())))
    }

    /// Serialize and write the package to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Paragraph margins in twentieths of a point; `None` leaves a side alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct Margins {
    pub left: Option<u32>,
    pub right: Option<u32>,
    pub top: Option<u32>,
    pub bottom: Option<u32>,
    pub header: Option<u32>,
    pub footer: Option<u32>,
    pub gutter: Option<u32>,
}

fn parse_part(name: &str, data: &[u8]) -> Result<XmlDoc> {
    codec::parse(data).map_err(|e| Error::MalformedXml {
        part: name.to_string(),
        message: e.to_string(),
    })
}

/// Find or create `w:docDefaults/<host>` in the styles part.
fn ensure_defaults_host(styles: &mut XmlDoc, host_name: &str) -> NodeId {
    let root = styles.root();
    let defaults = match styles.first_child_named(root, "w:docDefaults") {
        Some(existing) => existing,
        None => {
            let created = styles.create_element("w:docDefaults");
            styles.insert(root, 0, created);
            created
        }
    };
    match styles.first_child_named(defaults, host_name) {
        Some(existing) => existing,
        None => {
            let created = styles.create_element(host_name);
            styles.append(defaults, created);
            created
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::builders;
    use crate::docx::format::Change;

    #[test]
    fn test_blank_package_has_expected_parts() {
        let pkg = Package::new().unwrap();
        assert!(pkg.document.is_named(pkg.document.root(), "w:document"));
        assert!(pkg.styles().is_some());
        assert!(pkg.comments().is_none());
        assert_eq!(pkg.content_types.default_for("png"), Some("image/png"));
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let mut pkg = Package::new().unwrap();
        builders::append_paragraph(&mut pkg, "Hello round trip");
        let bytes = pkg.to_bytes().unwrap();
        let reloaded = Package::from_bytes(&bytes).unwrap();
        assert!(XmlDoc::deep_eq(
            &pkg.document,
            pkg.document.root(),
            &reloaded.document,
            reloaded.document.root(),
        ));
        assert_eq!(
            pkg.member_paths().collect::<Vec<_>>(),
            reloaded.member_paths().collect::<Vec<_>>(),
        );
    }

    #[test]
    fn test_malformed_document_is_fatal() {
        let members: Vec<(&str, &[u8])> = vec![
            ("[Content_Types].xml", template::CONTENT_TYPES.as_bytes()),
            ("word/document.xml", b"<w:document><w:body></w:document>"),
        ];
        let bytes = phys_pkg::build(members).unwrap();
        assert!(Package::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_unknown_part_retained_opaquely() {
        let mut pkg = Package::new().unwrap();
        pkg.insert_raw("word/custom/widget.bin", b"\x00\x01\x02".to_vec());
        let bytes = pkg.to_bytes().unwrap();
        let reloaded = Package::from_bytes(&bytes).unwrap();
        assert_eq!(reloaded.raw_part("word/custom/widget.bin"), Some(&b"\x00\x01\x02"[..]));
    }

    #[test]
    fn test_clean_removes_empty_fragments_and_runs() {
        let mut pkg = Package::new().unwrap();
        let body = pkg.body();
        let p = pkg.document.create_element("w:p");
        pkg.document.insert(body, 0, p);
        let run = pkg.document.create_element("w:r");
        pkg.document.append(p, run);
        let t = pkg.document.create_element("w:t");
        pkg.document.append(run, t);
        pkg.clean();
        assert!(pkg.document.descendants_named(p, "w:t").is_empty());
        assert!(pkg.document.descendants_named(p, "w:r").is_empty());
    }

    #[test]
    fn test_document_text_flattens_tabs() {
        let mut pkg = Package::new().unwrap();
        let p = builders::append_paragraph(&mut pkg, "before");
        let run = pkg.document.descendants_named(p, "w:r")[0];
        let tab = pkg.document.create_element("w:tab");
        pkg.document.append(run, tab);
        let run2 = pkg.document.create_element("w:r");
        pkg.document.append(p, run2);
        let t2 = pkg.document.create_element("w:t");
        pkg.document.append(run2, t2);
        pkg.document.set_text_content(t2, "after");
        let text = pkg.document_text();
        assert_eq!(text, vec!["before\tafter".to_string()]);
    }

    #[test]
    fn test_set_margins_touches_only_given_sides() {
        let mut pkg = Package::new().unwrap();
        pkg.set_margins(&Margins { left: Some(720), ..Default::default() });
        let sect = pkg.section_properties();
        let pg_mar = pkg.document.first_child_named(sect, "w:pgMar").unwrap();
        assert_eq!(pkg.document.attr(pg_mar, "w:left"), Some("720"));
        // The template's other margins are untouched.
        assert_eq!(pkg.document.attr(pg_mar, "w:top"), Some("1440"));
    }

    #[test]
    fn test_modify_font_defaults_targets_rpr_default() {
        let mut pkg = Package::new().unwrap();
        pkg.modify_font_defaults(
            &FontOptions { bold: Change::Set(true), ..Default::default() },
            false,
        )
        .unwrap();
        pkg.modify_font_defaults(
            &FontOptions { bold: Change::Set(true), ..Default::default() },
            false,
        )
        .unwrap();
        let styles = pkg.styles().unwrap();
        let root = styles.root();
        let defaults = styles.first_child_named(root, "w:docDefaults").unwrap();
        let host = styles.first_child_named(defaults, "w:rPrDefault").unwrap();
        let rpr = styles.first_child_named(host, "w:rPr").unwrap();
        assert_eq!(styles.children_named(rpr, "w:b").len(), 1);
    }

    #[test]
    fn test_add_style() {
        let mut pkg = Package::new().unwrap();
        let style = pkg.add_style("Emphatic", "paragraph", true).unwrap();
        let styles = pkg.styles().unwrap();
        assert_eq!(styles.attr(style, "w:styleId"), Some("Emphatic"));
        assert_eq!(styles.attr(style, "w:default"), Some("1"));
        assert!(styles.first_child_named(style, "w:pPr").is_some());
        assert!(styles.first_child_named(style, "w:rPr").is_some());
    }
}
