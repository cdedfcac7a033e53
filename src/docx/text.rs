//! Run-span text index.
//!
//! Maps a paragraph's flattened text onto the `w:t` fragments that carry it.
//! Offsets are byte offsets into the flattened string, half-open, with no
//! gaps and no overlaps; concatenating the spans' fragments in order
//! reproduces the flattened text exactly. The index is a snapshot: rebuild
//! it after any structural edit to the paragraph.

use crate::xml::{NodeId, XmlDoc};

/// One fragment's slice of a paragraph's flattened text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan {
    /// Byte offset of the fragment's first character.
    pub start: usize,
    /// Byte offset one past the fragment's last character.
    pub end: usize,
    /// The owning `w:t` element.
    pub fragment: NodeId,
}

impl TextSpan {
    /// Whether the span intersects the half-open range `[start, end)`.
    ///
    /// A zero-length range (insertion point) intersects the span that
    /// contains its offset. An offset sitting exactly on the seam between
    /// two fragments belongs to the following one, so a span's own end
    /// offset does not intersect it.
    pub fn intersects(&self, start: usize, end: usize) -> bool {
        if start == end {
            return self.start <= start && start < self.end;
        }
        self.start < end && self.end > start
    }

    /// Whether the span lies entirely inside `[start, end)`.
    pub fn contained_in(&self, start: usize, end: usize) -> bool {
        start <= self.start && self.end <= end
    }
}

/// Build the ordered span index for a paragraph.
///
/// Single left-to-right pass over the paragraph's `w:t` descendants,
/// accumulating fragment lengths. Empty fragments yield zero-length spans.
pub fn spans(doc: &XmlDoc, paragraph: NodeId) -> Vec<TextSpan> {
    let mut out = Vec::new();
    let mut offset = 0;
    for fragment in doc.descendants_named(paragraph, "w:t") {
        let len = doc.text_content(fragment).len();
        out.push(TextSpan {
            start: offset,
            end: offset + len,
            fragment,
        });
        offset += len;
    }
    out
}

/// A paragraph's flattened text: the concatenation of all its fragments in
/// document order.
pub fn flattened(doc: &XmlDoc, paragraph: NodeId) -> String {
    let mut text = String::new();
    for fragment in doc.descendants_named(paragraph, "w:t") {
        text.push_str(&doc.text_content(fragment));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph_with(texts: &[&str]) -> (XmlDoc, NodeId) {
        let mut doc = XmlDoc::with_root("w:p");
        let p = doc.root();
        for text in texts {
            let r = doc.create_element("w:r");
            doc.append(p, r);
            let t = doc.create_element("w:t");
            doc.append(r, t);
            doc.set_text_content(t, text);
        }
        (doc, p)
    }

    #[test]
    fn test_spans_cover_flattened_text() {
        let (doc, p) = paragraph_with(&["Hello ", "World", "", "!"]);
        let index = spans(&doc, p);
        let text = flattened(&doc, p);
        assert_eq!(text, "Hello World!");

        // No gaps, no overlaps, full coverage.
        let mut offset = 0;
        let mut rebuilt = String::new();
        for span in &index {
            assert_eq!(span.start, offset);
            assert!(span.start <= span.end);
            rebuilt.push_str(&doc.text_content(span.fragment));
            offset = span.end;
        }
        assert_eq!(offset, text.len());
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_intersection() {
        let span = TextSpan {
            start: 6,
            end: 11,
            fragment: NodeId(0),
        };
        assert!(span.intersects(4, 8));
        assert!(span.intersects(8, 20));
        assert!(!span.intersects(0, 6));
        assert!(!span.intersects(11, 12));
        // Zero-length insertion points; the span's end offset belongs to
        // the following fragment.
        assert!(span.intersects(6, 6));
        assert!(span.intersects(10, 10));
        assert!(!span.intersects(11, 11));
        assert!(!span.intersects(3, 3));
        assert!(span.contained_in(6, 11));
        assert!(!span.contained_in(7, 11));
    }

    #[test]
    fn test_empty_paragraph() {
        let (doc, p) = paragraph_with(&[]);
        assert!(spans(&doc, p).is_empty());
        assert_eq!(flattened(&doc, p), "");
    }
}
