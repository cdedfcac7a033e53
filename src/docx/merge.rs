//! Cross-package merge: relationship remapping, media transfer,
//! content-type union and body splicing.

use crate::docx::builders;
use crate::docx::package::Package;
use crate::error::Result;
use crate::xml::{NodeId, XmlDoc};
use log::debug;

/// Append `source`'s content to the end of `target`.
///
/// Source relationships are re-registered against the target's allocator
/// and every reference in the source body is rewritten to the id the target
/// assigned (or the target's existing id, when the same non-media target
/// was already registered). Media and other members the target lacks are
/// copied over; a same-named media file is assumed to be a different asset
/// and is never overwritten — callers expecting a collision ship the
/// duplicate as `new_<name>`, which travels under that name. With
/// `page_break` set, a page break separates the two bodies.
///
/// Comment and numbering id spaces are not remapped; merging two packages
/// that both define them will collide.
pub fn merge(target: &mut Package, mut source: Package, page_break: bool) -> Result<()> {
    remap_relationships(target, &mut source);
    copy_members(target, &source);
    union_content_types(target, &source);
    if page_break {
        insert_page_break(target, &mut source);
    }
    splice_bodies(target, &source);
    debug!("merged package; target now has {} members", target.member_paths().count());
    Ok(())
}

fn remap_relationships(target: &mut Package, source: &mut Package) {
    let source_rels: Vec<_> = source.rels.iter().cloned().collect();
    for rel in source_rels {
        let new_id = match target.rels.add(&rel.target, &rel.reltype) {
            Some(id) => id,
            // Already registered in the target: point the source's
            // references at the existing id instead of guessing.
            None => match target.rels.find_by_target(&rel.target) {
                Some(existing) => existing.id.clone(),
                None => continue,
            },
        };
        if new_id != rel.id {
            let body = source.body();
            rewrite_attribute_values(&mut source.document, body, &rel.id, &new_id);
        }
    }
}

/// Rewrite every attribute value equal to `old` anywhere under `root`.
fn rewrite_attribute_values(doc: &mut XmlDoc, root: NodeId, old: &str, new: &str) {
    for node in doc.descendants(root) {
        let names: Vec<String> = doc
            .attrs(node)
            .iter()
            .filter(|attr| attr.value == old)
            .map(|attr| attr.name.clone())
            .collect();
        for name in names {
            doc.set_attr(node, &name, new);
        }
    }
}

fn copy_members(target: &mut Package, source: &Package) {
    let wanted: Vec<String> = source
        .member_paths()
        .filter(|path| source.raw_part(path).is_some())
        .map(str::to_string)
        .collect();
    for path in wanted {
        if target.member_paths().any(|p| p == path) {
            // Same-named member in both packages. For media this is the
            // documented collision case: the target's file wins and the
            // caller's pre-renamed new_<name> duplicate travels instead.
            debug!("skipping colliding member {}", path);
            continue;
        }
        if let Some(bytes) = source.raw_part(&path) {
            let bytes = bytes.to_vec();
            target.insert_raw(&path, bytes);
        }
    }
}

fn union_content_types(target: &mut Package, source: &Package) {
    let defaults: Vec<(String, String)> = source
        .content_types
        .defaults()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    for (extension, content_type) in defaults {
        target.content_types.ensure_default(&extension, &content_type);
    }
    let overrides: Vec<(String, String)> = source
        .content_types
        .overrides()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    for (part, content_type) in overrides {
        target.content_types.ensure_override(&part, &content_type);
    }
}

fn insert_page_break(target: &mut Package, source: &mut Package) {
    // A page-break run at the end of the target's last paragraph.
    let body = target.body();
    let last_para = match target.document.children_named(body, "w:p").last().copied() {
        Some(p) => p,
        None => {
            let p = builders::paragraph(&mut target.document, "");
            builders::attach_to_body(target, p);
            p
        }
    };
    let run = target.document.create_element("w:r");
    let br = target
        .document
        .create_element_with("w:br", &[("w:type", "page")]);
    target.document.append(run, br);
    target.document.append(last_para, run);

    // A rendered-page-break marker at the front of the source's first run.
    let src_body = source.body();
    let first_para = match source
        .document
        .children_named(src_body, "w:p")
        .first()
        .copied()
    {
        Some(p) => p,
        None => {
            let p = builders::paragraph(&mut source.document, "");
            builders::attach_to_body(source, p);
            p
        }
    };
    let first_run = match source.document.first_child_named(first_para, "w:r") {
        Some(r) => r,
        None => {
            let r = source.document.create_element("w:r");
            source.document.append(first_para, r);
            r
        }
    };
    let marker = source.document.create_element("w:lastRenderedPageBreak");
    source.document.insert(first_run, 0, marker);
}

fn splice_bodies(target: &mut Package, source: &Package) {
    let src_body = source.body();
    let children: Vec<NodeId> = source.document.children(src_body).to_vec();
    for child in children {
        // The body-level section marker must stay unique and last; the
        // target's survives, the source's is dropped.
        if source.document.is_named(child, "w:sectPr") {
            continue;
        }
        let imported = target.document.import(&source.document, child);
        builders::attach_to_body(target, imported);
    }
}
