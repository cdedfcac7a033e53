//! Comment anchors and the lazily created comments part.
//!
//! A comment is bound to a span of content by a pair of range markers; the
//! comment body itself lives in `word/comments.xml`, which is created (with
//! its content-type override and relationship) the first time a comment is
//! added.

use crate::docx::package::{Package, part_path};
use crate::error::{Error, Result};
use crate::opc::{content_type, relationship_type};
use crate::xml::{NodeClass, NodeId, XmlDoc};
use chrono::Utc;

/// Comments part root, with the namespaces its elements use.
const COMMENTS_ROOT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:comments xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"/>"#;

/// Attach a comment to the span from `start` to `end`.
///
/// Both anchors must be a paragraph, run or text fragment; `None` for `end`
/// comments on `start` alone. The end anchor must not precede the start
/// anchor in document order — violations fail before any mutation is
/// applied. Only one comment thread per anchor is supported.
pub fn add_comment(
    pkg: &mut Package,
    text: &str,
    start: NodeId,
    end: Option<NodeId>,
    author: &str,
    initials: &str,
) -> Result<()> {
    let end = end.unwrap_or(start);
    validate_anchor(&pkg.document, start)?;
    validate_anchor(&pkg.document, end)?;
    if pkg.document.path(end) < pkg.document.path(start) {
        return Err(Error::AnchorOrder);
    }

    let id = ensure_comments_part(pkg)?;
    insert_range_start(&mut pkg.document, start, &id);
    insert_range_end(&mut pkg.document, end, &id);
    append_comment_body(pkg, &id, text, author, initials)
}

fn validate_anchor(doc: &XmlDoc, anchor: NodeId) -> Result<()> {
    match doc.class(anchor) {
        NodeClass::Paragraph | NodeClass::Run | NodeClass::TextFragment => Ok(()),
        NodeClass::Other => Err(Error::InvalidAnchor(
            "comment anchors must be a paragraph, run or text fragment".to_string(),
        )),
    }
}

/// Create the comments part on first use and hand back the next comment id.
fn ensure_comments_part(pkg: &mut Package) -> Result<String> {
    if pkg.comments.is_none() {
        let doc = crate::xml::codec::parse(COMMENTS_ROOT.as_bytes())?;
        pkg.comments = Some(doc);
        pkg.register_part(part_path::COMMENTS, content_type::WML_COMMENTS);
        pkg.rels.add("comments.xml", relationship_type::COMMENTS);
    }
    let comments = match pkg.comments.as_ref() {
        Some(comments) => comments,
        None => return Err(Error::PartNotFound(part_path::COMMENTS.to_string())),
    };
    let used: Vec<u32> = comments
        .children_named(comments.root(), "w:comment")
        .into_iter()
        .filter_map(|c| comments.attr(c, "w:id").and_then(|v| v.parse().ok()))
        .collect();
    let mut id = 0u32;
    while used.contains(&id) {
        id += 1;
    }
    Ok(id.to_string())
}

fn insert_range_start(doc: &mut XmlDoc, start: NodeId, id: &str) {
    let marker = doc.create_element_with("w:commentRangeStart", &[("w:id", id)]);
    match doc.class(start) {
        NodeClass::Paragraph => doc.insert(start, 0, marker),
        NodeClass::Run => doc.insert_before(start, marker),
        _ => {
            let run = split_run_before_fragment(doc, start);
            doc.insert_before(run, marker);
        }
    }
}

fn insert_range_end(doc: &mut XmlDoc, end: NodeId, id: &str) {
    let marker = doc.create_element_with("w:commentRangeEnd", &[("w:id", id)]);
    let reference = reference_run(doc, id);
    match doc.class(end) {
        NodeClass::Paragraph => {
            doc.append(end, marker);
            doc.append(end, reference);
        }
        NodeClass::Run => {
            doc.insert_after(end, marker);
            doc.insert_after(marker, reference);
        }
        _ => {
            let run = split_run_before_fragment(doc, end);
            doc.insert_after(run, marker);
            doc.insert_after(marker, reference);
        }
    }
}

/// When a fragment anchor is not the first fragment of its run, the run is
/// split so the marker can sit on the fragment boundary. Returns the run
/// the anchor fragment now belongs to.
fn split_run_before_fragment(doc: &mut XmlDoc, fragment: NodeId) -> NodeId {
    let run = doc
        .ancestor_of_class(fragment, NodeClass::Run)
        .unwrap_or(fragment);
    if run == fragment {
        return fragment;
    }
    let fragments = doc.children_named(run, "w:t");
    let pos = fragments.iter().position(|&f| f == fragment).unwrap_or(0);
    if pos > 0 {
        let preceding = doc.create_element("w:r");
        for &moved in &fragments[..pos] {
            doc.append(preceding, moved);
        }
        doc.insert_before(run, preceding);
    }
    run
}

/// A run carrying the in-text comment reference mark.
fn reference_run(doc: &mut XmlDoc, id: &str) -> NodeId {
    let run = doc.create_element("w:r");
    let rpr = doc.create_element("w:rPr");
    let style = doc.create_element_with("w:rStyle", &[("w:val", "CommentReference")]);
    doc.append(rpr, style);
    doc.append(run, rpr);
    let reference = doc.create_element_with("w:commentReference", &[("w:id", id)]);
    doc.append(run, reference);
    run
}

fn append_comment_body(
    pkg: &mut Package,
    id: &str,
    text: &str,
    author: &str,
    initials: &str,
) -> Result<()> {
    let date = Utc::now().format("%Y-%m-%dT%H:%M:00Z").to_string();
    let comments = match pkg.comments.as_mut() {
        Some(comments) => comments,
        None => return Err(Error::PartNotFound(part_path::COMMENTS.to_string())),
    };
    let root = comments.root();
    let comment = comments.create_element_with(
        "w:comment",
        &[
            ("w:id", id),
            ("w:author", author),
            ("w:date", date.as_str()),
            ("w:initials", initials),
        ],
    );
    let para = comments.create_element("w:p");
    let ppr = comments.create_element("w:pPr");
    let pstyle = comments.create_element_with("w:pStyle", &[("w:val", "CommentText")]);
    comments.append(ppr, pstyle);
    comments.append(para, ppr);

    let annotation_run = comments.create_element("w:r");
    let rpr = comments.create_element("w:rPr");
    let rstyle = comments.create_element_with("w:rStyle", &[("w:val", "CommentReference")]);
    comments.append(rpr, rstyle);
    comments.append(annotation_run, rpr);
    let annotation = comments.create_element("w:annotationRef");
    comments.append(annotation_run, annotation);
    comments.append(para, annotation_run);

    let text_run = comments.create_element("w:r");
    let fragment = comments.create_element("w:t");
    comments.append(text_run, fragment);
    comments.set_text_content(fragment, text);
    comments.append(para, text_run);

    comments.append(comment, para);
    comments.append(root, comment);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::builders;

    #[test]
    fn test_first_comment_creates_part() {
        let mut pkg = Package::new().unwrap();
        let p = builders::append_paragraph(&mut pkg, "commented text");
        add_comment(&mut pkg, "a note", p, None, "Reviewer", "R").unwrap();

        let comments = pkg.comments().expect("comments part created");
        let entries = comments.children_named(comments.root(), "w:comment");
        assert_eq!(entries.len(), 1);
        assert_eq!(comments.attr(entries[0], "w:id"), Some("0"));
        assert_eq!(comments.attr(entries[0], "w:author"), Some("Reviewer"));
        assert_eq!(comments.text_content(entries[0]), "a note");
        assert_eq!(
            pkg.content_types.override_for("/word/comments.xml"),
            Some(content_type::WML_COMMENTS)
        );
        assert!(pkg.rels.find_by_target("comments.xml").is_some());
        assert!(pkg.member_paths().any(|p| p == part_path::COMMENTS));
    }

    #[test]
    fn test_paragraph_anchor_markers() {
        let mut pkg = Package::new().unwrap();
        let p = builders::append_paragraph(&mut pkg, "text");
        add_comment(&mut pkg, "note", p, None, "", "").unwrap();
        let children = pkg.document.children(p);
        assert!(pkg.document.is_named(children[0], "w:commentRangeStart"));
        let names: Vec<_> = children
            .iter()
            .filter_map(|&c| pkg.document.name(c))
            .collect();
        assert!(names.contains(&"w:commentRangeEnd"));
        assert_eq!(
            pkg.document.descendants_named(p, "w:commentReference").len(),
            1
        );
    }

    #[test]
    fn test_run_anchor_span() {
        let mut pkg = Package::new().unwrap();
        let p1 = builders::append_paragraph(&mut pkg, "first");
        let p2 = builders::append_paragraph(&mut pkg, "second");
        let r1 = pkg.document.descendants_named(p1, "w:r")[0];
        let r2 = pkg.document.descendants_named(p2, "w:r")[0];
        add_comment(&mut pkg, "span", r1, Some(r2), "", "").unwrap();
        assert_eq!(pkg.document.descendants_named(p1, "w:commentRangeStart").len(), 1);
        assert_eq!(pkg.document.descendants_named(p2, "w:commentRangeEnd").len(), 1);
    }

    #[test]
    fn test_reversed_anchors_fail_without_mutation() {
        let mut pkg = Package::new().unwrap();
        let p1 = builders::append_paragraph(&mut pkg, "first");
        let p2 = builders::append_paragraph(&mut pkg, "second");
        let err = add_comment(&mut pkg, "bad", p2, Some(p1), "", "").unwrap_err();
        assert!(matches!(err, Error::AnchorOrder));
        assert!(pkg.comments().is_none());
        assert!(pkg.document.descendants_named(pkg.body(), "w:commentRangeStart").is_empty());
    }

    #[test]
    fn test_comment_ids_fill_smallest_gap() {
        let mut pkg = Package::new().unwrap();
        let p1 = builders::append_paragraph(&mut pkg, "one");
        let p2 = builders::append_paragraph(&mut pkg, "two");
        add_comment(&mut pkg, "first", p1, None, "", "").unwrap();
        add_comment(&mut pkg, "second", p2, None, "", "").unwrap();
        let comments = pkg.comments().unwrap();
        let ids: Vec<_> = comments
            .children_named(comments.root(), "w:comment")
            .into_iter()
            .filter_map(|c| comments.attr(c, "w:id").map(str::to_string))
            .collect();
        assert_eq!(ids, vec!["0".to_string(), "1".to_string()]);
    }

    #[test]
    fn test_invalid_anchor_kind_rejected() {
        let mut pkg = Package::new().unwrap();
        let body = pkg.body();
        let err = add_comment(&mut pkg, "x", body, None, "", "").unwrap_err();
        assert!(matches!(err, Error::InvalidAnchor(_)));
    }

    #[test]
    fn test_fragment_anchor_splits_run() {
        let mut pkg = Package::new().unwrap();
        let p = builders::append_paragraph(&mut pkg, "head");
        let run = pkg.document.descendants_named(p, "w:r")[0];
        let second = pkg.document.create_element("w:t");
        pkg.document.append(run, second);
        pkg.document.set_text_content(second, "tail");
        add_comment(&mut pkg, "note", second, None, "", "").unwrap();
        // The fragments before the anchor moved into a preceding run and
        // the start marker sits between the two runs.
        let children: Vec<_> = pkg
            .document
            .children(p)
            .iter()
            .filter_map(|&c| pkg.document.name(c).map(str::to_string))
            .collect();
        let start_pos = children
            .iter()
            .position(|n| n == "w:commentRangeStart")
            .unwrap();
        assert!(start_pos >= 1);
        assert_eq!(children[start_pos - 1], "w:r");
    }
}
