//! Relationship definitions for the main document part.
//!
//! Relationship ids are `rId<N>` with `N` a positive integer; the allocator
//! keeps the id space compact by filling the first gap left behind by
//! deletions before extending past the current count, so externally authored
//! packages with holes round-trip safely.

use crate::error::{Error, Result};
use crate::xml::XmlDoc;

/// A single relationship: (id, target, type), id unique within the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1", "rId2")
    pub id: String,
    /// Relationship type URI
    pub reltype: String,
    /// Target reference: a part path relative to `word/`, or an external URL
    pub target: String,
    /// TargetMode attribute, carried through verbatim ("External" or absent)
    pub mode: Option<String>,
}

/// Ordered collection of relationships scoped to the main document part.
#[derive(Debug, Default, Clone)]
pub struct Relationships {
    rels: Vec<Relationship>,
}

impl Relationships {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a relationships part (`word/_rels/document.xml.rels`).
    pub fn from_doc(doc: &XmlDoc) -> Result<Self> {
        let mut rels = Vec::new();
        for node in doc.children(doc.root()).iter().copied() {
            let name = match doc.name(node) {
                Some(n) => n,
                None => continue,
            };
            if name != "Relationship" {
                continue;
            }
            let get = |attr: &str| -> Result<String> {
                doc.attr(node, attr)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        Error::MalformedPackage(format!(
                            "Relationship element missing '{}' attribute",
                            attr
                        ))
                    })
            };
            rels.push(Relationship {
                id: get("Id")?,
                reltype: get("Type")?,
                target: get("Target")?,
                mode: doc.attr(node, "TargetMode").map(str::to_string),
            });
        }
        Ok(Self { rels })
    }

    /// Add a relationship to `target` of the given type.
    ///
    /// Returns `Some(id)` with the freshly allocated id, or `None` when an
    /// identical target is already present and the target is not a media
    /// resource. Media targets are always appended under a new id, because
    /// distinct media insertions may need distinct relationships even when
    /// they share a filename. Use [`Relationships::find_by_target`] to
    /// resolve the existing id in the `None` case.
    pub fn add(&mut self, target: &str, reltype: &str) -> Option<String> {
        let duplicate = self.rels.iter().any(|rel| rel.target == target);
        if duplicate && !target.contains("media") {
            return None;
        }
        let id = format!("rId{}", self.next_id_number());
        self.rels.push(Relationship {
            id: id.clone(),
            reltype: reltype.to_string(),
            target: target.to_string(),
            mode: None,
        });
        Some(id)
    }

    /// Smallest positive integer not currently used as an id number.
    fn next_id_number(&self) -> u32 {
        let mut used: Vec<u32> = self
            .rels
            .iter()
            .filter_map(|rel| rel.id.strip_prefix("rId"))
            .filter_map(|n| n.parse::<u32>().ok())
            .collect();
        used.sort_unstable();

        let mut next = 1u32;
        for &num in &used {
            match num.cmp(&next) {
                std::cmp::Ordering::Equal => next += 1,
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Less => {}
            }
        }
        next
    }

    /// Look up a relationship by id.
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|rel| rel.id == id)
    }

    /// First relationship whose target matches exactly.
    pub fn find_by_target(&self, target: &str) -> Option<&Relationship> {
        self.rels.iter().find(|rel| rel.target == target)
    }

    /// Remove a relationship by id, returning it if present.
    pub fn remove(&mut self, id: &str) -> Option<Relationship> {
        let pos = self.rels.iter().position(|rel| rel.id == id)?;
        Some(self.rels.remove(pos))
    }

    /// Iterate over all relationships in file order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Serialize to relationships-part XML.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(1024);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for rel in &self.rels {
            xml.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}" Target="{}""#,
                escape_xml(&rel.id),
                escape_xml(&rel.reltype),
                escape_xml(&rel.target),
            ));
            if let Some(mode) = &rel.mode {
                xml.push_str(&format!(r#" TargetMode="{}""#, escape_xml(mode)));
            }
            xml.push_str("/>");
        }
        xml.push_str("</Relationships>");
        xml
    }
}

/// Escape XML special characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
