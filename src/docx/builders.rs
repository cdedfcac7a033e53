//! Document-construction helpers: paragraphs, headings, tables, numbered
//! lists and text appending.
//!
//! Builders create detached subtrees in the target document's arena; the
//! `append_*` variants also attach them to the body, keeping any trailing
//! `w:sectPr` last.

use crate::docx::package::Package;
use crate::error::{Error, Result};
use crate::xml::{NodeClass, NodeId, XmlDoc};

/// Build a detached paragraph containing one run with the given text.
pub fn paragraph(doc: &mut XmlDoc, text: &str) -> NodeId {
    let p = doc.create_element("w:p");
    let run = doc.create_element("w:r");
    doc.append(p, run);
    let fragment = doc.create_element("w:t");
    doc.append(run, fragment);
    doc.set_text_content(fragment, text);
    if text.starts_with(' ') || text.ends_with(' ') {
        doc.set_attr(fragment, "xml:space", "preserve");
    }
    p
}

/// Build a detached heading paragraph styled `Heading<level>`.
pub fn heading(doc: &mut XmlDoc, text: &str, level: u8) -> NodeId {
    let p = paragraph(doc, text);
    let ppr = doc.create_element("w:pPr");
    let style_id = format!("Heading{}", level);
    let style = doc.create_element_with("w:pStyle", &[("w:val", style_id.as_str())]);
    doc.append(ppr, style);
    doc.insert(p, 0, ppr);
    p
}

/// Append a new text paragraph to the package body.
pub fn append_paragraph(pkg: &mut Package, text: &str) -> NodeId {
    let p = paragraph(&mut pkg.document, text);
    attach_to_body(pkg, p);
    p
}

/// Append a new heading paragraph to the package body.
pub fn append_heading(pkg: &mut Package, text: &str, level: u8) -> NodeId {
    let h = heading(&mut pkg.document, text, level);
    attach_to_body(pkg, h);
    h
}

/// Attach a detached block element to the body, before any trailing
/// `w:sectPr`.
pub fn attach_to_body(pkg: &mut Package, node: NodeId) {
    let body = pkg.body();
    match pkg.document.first_child_named(body, "w:sectPr") {
        Some(sect) => pkg.document.insert_before(sect, node),
        None => pkg.document.append(body, node),
    }
}

/// Append text to a node, dispatching on what the node is.
///
/// A body gains the text at the end of its last paragraph (creating one if
/// needed), a paragraph at the end of its last run, a run at the end of its
/// last fragment, and a fragment extends its own payload. Anything else is
/// a structural precondition violation.
pub fn append_text(doc: &mut XmlDoc, node: NodeId, text: &str) -> Result<()> {
    match doc.class(node) {
        NodeClass::TextFragment => {
            let combined = format!("{}{}", doc.text_content(node), text);
            doc.set_text_content(node, &combined);
            Ok(())
        }
        NodeClass::Run => {
            match doc.children_named(node, "w:t").last().copied() {
                Some(last) => append_text(doc, last, text),
                None => {
                    let fragment = doc.create_element("w:t");
                    doc.append(node, fragment);
                    doc.set_text_content(fragment, text);
                    Ok(())
                }
            }
        }
        NodeClass::Paragraph => {
            match doc.children_named(node, "w:r").last().copied() {
                Some(last) => append_text(doc, last, text),
                None => {
                    let run = doc.create_element("w:r");
                    doc.append(node, run);
                    append_text(doc, run, text)
                }
            }
        }
        NodeClass::Other if doc.is_named(node, "w:body") => {
            match doc.children_named(node, "w:p").last().copied() {
                Some(last) => append_text(doc, last, text),
                None => {
                    let p = paragraph(doc, text);
                    doc.append(node, p);
                    Ok(())
                }
            }
        }
        NodeClass::Other => Err(Error::MalformedPackage(
            "append_text target must be a body, paragraph, run or text fragment".to_string(),
        )),
    }
}

/// Turn the paragraphs between `start` and `end` (inclusive, same parent)
/// into one numbered list, using the smallest list id not yet in use.
pub fn numbered_list(doc: &mut XmlDoc, start: NodeId, end: NodeId) -> Result<()> {
    if doc.class(start) != NodeClass::Paragraph || doc.class(end) != NodeClass::Paragraph {
        return Err(Error::InvalidAnchor(
            "numbered list anchors must be paragraphs".to_string(),
        ));
    }
    let parent = doc
        .parent(start)
        .ok_or_else(|| Error::InvalidAnchor("start paragraph is detached".to_string()))?;
    if doc.parent(end) != Some(parent) {
        return Err(Error::InvalidAnchor(
            "start and end paragraphs must share a parent".to_string(),
        ));
    }
    let (start_idx, end_idx) = match (doc.index_in_parent(start), doc.index_in_parent(end)) {
        (Some(s), Some(e)) => (s, e),
        _ => {
            return Err(Error::InvalidAnchor(
                "list anchors must be attached paragraphs".to_string(),
            ));
        }
    };
    if start_idx > end_idx {
        return Err(Error::AnchorOrder);
    }

    // Smallest numbering id not already referenced anywhere in the tree.
    let used: Vec<u32> = doc
        .descendants_named(doc.root(), "w:numId")
        .into_iter()
        .filter_map(|n| doc.attr(n, "w:val").and_then(|v| v.parse().ok()))
        .collect();
    let mut num_id = 1u32;
    while used.contains(&num_id) {
        num_id += 1;
    }
    let num_id = num_id.to_string();

    let members: Vec<NodeId> = doc.children(parent)[start_idx..=end_idx]
        .iter()
        .copied()
        .filter(|&n| doc.class(n) == NodeClass::Paragraph)
        .collect();
    for member in members {
        let ppr = match doc.first_child_named(member, "w:pPr") {
            Some(existing) => existing,
            None => {
                let created = doc.create_element("w:pPr");
                doc.insert(member, 0, created);
                created
            }
        };
        let num_pr = doc.create_element("w:numPr");
        let ilvl = doc.create_element_with("w:ilvl", &[("w:val", "0")]);
        doc.append(num_pr, ilvl);
        let id_element = doc.create_element_with("w:numId", &[("w:val", num_id.as_str())]);
        doc.append(num_pr, id_element);
        doc.insert(ppr, 0, num_pr);
    }
    Ok(())
}

/// Strip every `w:pPr` and `w:rPr` in the subtree below a node.
pub fn remove_formatting(doc: &mut XmlDoc, node: NodeId) {
    for descendant in doc.descendants(node) {
        if doc.is_named(descendant, "w:pPr") || doc.is_named(descendant, "w:rPr") {
            doc.detach(descendant);
        }
    }
}

/// Border drawn on every side of a table.
#[derive(Debug, Clone)]
pub struct TableBorder {
    /// Border style value, e.g. `single`.
    pub style: String,
    /// Hex color or `auto`.
    pub color: String,
    /// Width in eighths of a point.
    pub size: u32,
}

/// Layout options for [`table`].
#[derive(Debug, Clone, Default)]
pub struct TableOptions {
    /// Center the first row's cell content and mark it as a header row.
    pub header_row: bool,
    /// Column widths in twentieths of a point; unset columns use a default.
    pub column_widths: Option<Vec<u32>>,
    /// Uniform border applied to all sides, inside edges included.
    pub borders: Option<TableBorder>,
}

const DEFAULT_COLUMN_WIDTH: u32 = 2390;

/// Build a detached table from rows of cell text.
pub fn table(doc: &mut XmlDoc, rows: &[Vec<String>], options: &TableOptions) -> NodeId {
    let tbl = doc.create_element("w:tbl");
    let columns = rows.first().map(Vec::len).unwrap_or(0);

    let props = doc.create_element("w:tblPr");
    let style = doc.create_element_with("w:tblStyle", &[("w:val", "")]);
    doc.append(props, style);
    let width = doc.create_element_with("w:tblW", &[("w:w", "0"), ("w:type", "auto")]);
    doc.append(props, width);
    if let Some(border) = &options.borders {
        let borders = doc.create_element("w:tblBorders");
        let size = border.size.to_string();
        for side in ["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"] {
            let edge = doc.create_element_with(
                side,
                &[
                    ("w:val", border.style.as_str()),
                    ("w:color", border.color.as_str()),
                    ("w:sz", size.as_str()),
                ],
            );
            doc.append(borders, edge);
        }
        doc.append(props, borders);
    }
    let look = doc.create_element_with("w:tblLook", &[("w:val", "0400")]);
    doc.append(props, look);
    doc.append(tbl, props);

    let grid = doc.create_element("w:tblGrid");
    for index in 0..columns {
        let col_width = column_width(options, index).to_string();
        let col = doc.create_element_with("w:gridCol", &[("w:w", col_width.as_str())]);
        doc.append(grid, col);
    }
    doc.append(tbl, grid);

    for (row_index, cells) in rows.iter().enumerate() {
        let header = options.header_row && row_index == 0;
        let row = doc.create_element("w:tr");
        if header {
            let row_props = doc.create_element("w:trPr");
            let cnf = doc.create_element_with("w:cnfStyle", &[("w:val", "000000100000")]);
            doc.append(row_props, cnf);
            doc.append(row, row_props);
        }
        for (col_index, cell_text) in cells.iter().enumerate() {
            let cell = doc.create_element("w:tc");
            let cell_props = doc.create_element("w:tcPr");
            let cell_width = column_width(options, col_index).to_string();
            let tcw =
                doc.create_element_with("w:tcW", &[("w:w", cell_width.as_str()), ("w:type", "dxa")]);
            doc.append(cell_props, tcw);
            doc.append(cell, cell_props);
            let content = paragraph(doc, cell_text);
            if header {
                let ppr = doc.create_element("w:pPr");
                let jc = doc.create_element_with("w:jc", &[("w:val", "center")]);
                doc.append(ppr, jc);
                doc.insert(content, 0, ppr);
            }
            doc.append(cell, content);
            doc.append(row, cell);
        }
        doc.append(tbl, row);
    }
    tbl
}

fn column_width(options: &TableOptions, index: usize) -> u32 {
    options
        .column_widths
        .as_ref()
        .and_then(|widths| widths.get(index).copied())
        .unwrap_or(DEFAULT_COLUMN_WIDTH)
}
