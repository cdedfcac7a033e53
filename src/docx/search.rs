//! Regex search and replace over document text.
//!
//! The paragraph-scoped mode reasons about each paragraph's flattened text
//! as a single string, so a match may straddle several formatting runs; the
//! fragment-scoped mode searches each `w:t` payload independently and never
//! crosses a fragment boundary.

use crate::docx::text::{self, TextSpan};
use crate::error::{Error, Result};
use crate::xml::{NodeClass, NodeId, XmlDoc};
use regex::Regex;

/// How text is scanned for matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Search each paragraph's flattened text; matches may span runs.
    Paragraph,
    /// Search each text fragment on its own; matches cannot span fragments.
    Fragment,
}

/// Which element a search hit is widened to before being returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// The `w:t` fragment owning the match start.
    Fragment,
    /// The fragment's enclosing `w:r`.
    Run,
    /// The fragment's enclosing `w:p`.
    Paragraph,
}

impl ResultKind {
    fn class(self) -> NodeClass {
        match self {
            Self::Fragment => NodeClass::TextFragment,
            Self::Run => NodeClass::Run,
            Self::Paragraph => NodeClass::Paragraph,
        }
    }
}

/// Find the first match of `pattern` under `root` and return the owning
/// element, widened to the requested kind.
///
/// In paragraph scope the hit fragment is the one containing the match's
/// start offset, resolved through the run-span index. Widening walks
/// ancestors; a hit with no ancestor of the requested kind is a structural
/// precondition violation and fails rather than returning a wrong element.
pub fn search(
    doc: &XmlDoc,
    root: NodeId,
    pattern: &str,
    kind: ResultKind,
    scope: Scope,
) -> Result<Option<NodeId>> {
    let re = Regex::new(pattern)?;
    let hit = match scope {
        Scope::Paragraph => search_paragraphs(doc, root, &re),
        Scope::Fragment => search_fragments(doc, root, &re),
    };
    match hit {
        Some(node) => widen(doc, node, kind).map(Some),
        None => Ok(None),
    }
}

/// `root` and its descendants with the given name; `descendants_named`
/// alone would skip a root that is itself the scope element.
fn scoped(doc: &XmlDoc, root: NodeId, name: &str) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    if doc.is_named(root, name) {
        nodes.push(root);
    }
    nodes.extend(doc.descendants_named(root, name));
    nodes
}

fn search_paragraphs(doc: &XmlDoc, root: NodeId, re: &Regex) -> Option<NodeId> {
    for paragraph in scoped(doc, root, "w:p") {
        let flattened = text::flattened(doc, paragraph);
        if let Some(m) = re.find(&flattened) {
            let index = text::spans(doc, paragraph);
            return index
                .iter()
                .find(|span| span.intersects(m.start(), m.start()))
                .map(|span| span.fragment);
        }
    }
    None
}

fn search_fragments(doc: &XmlDoc, root: NodeId, re: &Regex) -> Option<NodeId> {
    scoped(doc, root, "w:t")
        .into_iter()
        .find(|&fragment| re.is_match(&doc.text_content(fragment)))
}

fn widen(doc: &XmlDoc, node: NodeId, kind: ResultKind) -> Result<NodeId> {
    doc.ancestor_of_class(node, kind.class())
        .ok_or(Error::NoMatchingAncestor)
}

/// Replace every non-overlapping match of `pattern` under `root` with
/// `replacement`.
///
/// Paragraph scope rewrites matches that straddle runs: the first
/// intersecting fragment absorbs the replacement, fragments consumed whole
/// by the match are deleted (along with runs left without text), and a
/// partially consumed trailing fragment is trimmed to the overflow.
/// Formatting outside the match span is untouched. Fragment scope is a
/// strict per-fragment substitution.
pub fn replace(
    doc: &mut XmlDoc,
    root: NodeId,
    pattern: &str,
    replacement: &str,
    scope: Scope,
) -> Result<()> {
    let re = Regex::new(pattern)?;
    match scope {
        Scope::Paragraph => {
            for paragraph in scoped(doc, root, "w:p") {
                replace_in_paragraph(doc, paragraph, &re, replacement);
            }
        }
        Scope::Fragment => {
            for fragment in scoped(doc, root, "w:t") {
                let old = doc.text_content(fragment);
                if re.is_match(&old) {
                    let new = re.replace_all(&old, replacement).into_owned();
                    doc.set_text_content(fragment, &new);
                    assert_preserved_space(doc, fragment, &new);
                }
            }
        }
    }
    Ok(())
}

fn replace_in_paragraph(doc: &mut XmlDoc, paragraph: NodeId, re: &Regex, replacement: &str) {
    let flattened = text::flattened(doc, paragraph);
    let matches: Vec<(usize, usize)> = re
        .find_iter(&flattened)
        .map(|m| (m.start(), m.end()))
        .collect();

    // Replacements change the paragraph length, so every later match is
    // shifted by the cumulative delta of the ones already applied.
    let mut shift: isize = 0;
    for (match_start, match_end) in matches {
        let start = (match_start as isize + shift) as usize;
        let end = (match_end as isize + shift) as usize;
        apply_match(doc, paragraph, start, end, replacement);
        shift += replacement.len() as isize - (match_end - match_start) as isize;
    }
}

/// Rewrite one match span, given offsets already adjusted into the
/// paragraph's current text. The span index is rebuilt here because prior
/// matches may have restructured the paragraph.
fn apply_match(doc: &mut XmlDoc, paragraph: NodeId, start: usize, end: usize, replacement: &str) {
    let index = text::spans(doc, paragraph);
    let mut hit: Vec<TextSpan> = index
        .iter()
        .filter(|span| span.intersects(start, end))
        .copied()
        .collect();
    if hit.is_empty() && start == end {
        // An insertion point past the last fragment's end has no owning
        // span; it appends to the final fragment.
        hit.extend(index.last().copied());
    }
    let Some(first) = hit.first().copied() else {
        return;
    };

    let first_text = doc.text_content(first.fragment);
    let prefix = &first_text[..start - first.start];
    // The suffix comes from the first fragment only; a match running past
    // it overflows into later fragments, handled below.
    let local_suffix = if end <= first.end {
        &first_text[end - first.start..]
    } else {
        ""
    };
    let new_first = format!("{prefix}{replacement}{local_suffix}");

    for span in hit.iter().skip(1).copied() {
        if span.contained_in(start, end) {
            // Consumed whole by the match: the replacement already lives in
            // the first fragment, so this one goes away, and so does its
            // run once no text is left in it.
            let run = doc.ancestor_of_class(span.fragment, NodeClass::Run);
            doc.detach(span.fragment);
            if let Some(run) = run {
                if doc.descendants_named(run, "w:t").is_empty() {
                    doc.detach(run);
                }
            }
        } else {
            // Partially consumed trailing fragment: trim the overflow off
            // its front.
            let tail = doc.text_content(span.fragment);
            let trimmed = &tail[end - span.start..];
            doc.set_text_content(span.fragment, trimmed);
            let trimmed = trimmed.to_string();
            assert_preserved_space(doc, span.fragment, &trimmed);
        }
    }

    doc.set_text_content(first.fragment, &new_first);
    assert_preserved_space(doc, first.fragment, &new_first);
}

/// Leading or trailing spaces would be collapsed by downstream readers
/// unless the fragment carries `xml:space="preserve"`.
fn assert_preserved_space(doc: &mut XmlDoc, fragment: NodeId, new_text: &str) {
    if new_text.starts_with(' ') || new_text.ends_with(' ') {
        doc.set_attr(fragment, "xml:space", "preserve");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::text;

    /// A body with one paragraph whose text is split over the given runs.
    fn body_with(texts: &[&str]) -> (XmlDoc, NodeId, NodeId) {
        let mut doc = XmlDoc::with_root("w:document");
        let root = doc.root();
        let body = doc.create_element("w:body");
        doc.append(root, body);
        let p = doc.create_element("w:p");
        doc.append(body, p);
        for t in texts {
            let run = doc.create_element("w:r");
            doc.append(p, run);
            let frag = doc.create_element("w:t");
            doc.append(run, frag);
            doc.set_text_content(frag, t);
        }
        (doc, body, p)
    }

    #[test]
    fn test_search_maps_match_to_owning_fragment() {
        let (doc, body, p) = body_with(&["Hello ", "World"]);
        let hit = search(&doc, body, "World", ResultKind::Fragment, Scope::Paragraph)
            .unwrap()
            .unwrap();
        let index = text::spans(&doc, p);
        assert_eq!(hit, index[1].fragment);
    }

    #[test]
    fn test_search_rooted_at_paragraph_node() {
        let (doc, _, p) = body_with(&["Hello ", "World"]);
        let hit = search(&doc, p, "World", ResultKind::Fragment, Scope::Paragraph)
            .unwrap()
            .unwrap();
        let index = text::spans(&doc, p);
        assert_eq!(hit, index[1].fragment);
        // Fragment scope rooted directly at a w:t.
        let frag = index[0].fragment;
        let same = search(&doc, frag, "Hello", ResultKind::Fragment, Scope::Fragment)
            .unwrap()
            .unwrap();
        assert_eq!(same, frag);
    }

    #[test]
    fn test_search_widens_to_run_and_paragraph() {
        let (doc, body, p) = body_with(&["Hello ", "World"]);
        let run = search(&doc, body, "World", ResultKind::Run, Scope::Paragraph)
            .unwrap()
            .unwrap();
        assert!(doc.is_named(run, "w:r"));
        let para = search(&doc, body, "World", ResultKind::Paragraph, Scope::Paragraph)
            .unwrap()
            .unwrap();
        assert_eq!(para, p);
    }

    #[test]
    fn test_search_widening_without_ancestor_fails() {
        // A bare paragraph tree whose fragments have no w:r ancestor.
        let mut doc = XmlDoc::with_root("w:p");
        let p = doc.root();
        let frag = doc.create_element("w:t");
        doc.append(p, frag);
        doc.set_text_content(frag, "loose text");
        let err = search(&doc, p, "loose", ResultKind::Run, Scope::Paragraph).unwrap_err();
        assert!(matches!(err, Error::NoMatchingAncestor));
    }

    #[test]
    fn test_search_fragment_scope_ignores_cross_fragment_matches() {
        let (doc, body, _) = body_with(&["Hello ", "World"]);
        // "lo Wo" spans both fragments, so fragment scope cannot see it.
        let miss = search(&doc, body, "lo Wo", ResultKind::Fragment, Scope::Fragment).unwrap();
        assert!(miss.is_none());
        let hit = search(&doc, body, "Wor", ResultKind::Fragment, Scope::Fragment).unwrap();
        assert!(hit.is_some());
    }

    #[test]
    fn test_replace_within_single_fragment() {
        let (mut doc, body, p) = body_with(&["Hello World"]);
        replace(&mut doc, body, "World", "Rust", Scope::Paragraph).unwrap();
        assert_eq!(text::flattened(&doc, p), "Hello Rust");
    }

    #[test]
    fn test_replace_match_starting_on_run_seam_keeps_earlier_run() {
        let (mut doc, body, p) = body_with(&["Hello ", "World"]);
        replace(&mut doc, body, "World", "Rust", Scope::Paragraph).unwrap();
        assert_eq!(text::flattened(&doc, p), "Hello Rust");
        // The match belongs to the second fragment; the first run and its
        // text are untouched and both runs survive.
        let frags = doc.descendants_named(p, "w:t");
        assert_eq!(frags.len(), 2);
        assert_eq!(doc.text_content(frags[0]), "Hello ");
        assert_eq!(doc.text_content(frags[1]), "Rust");
    }

    #[test]
    fn test_replace_rooted_at_paragraph_node() {
        let (mut doc, _, p) = body_with(&["Hello World"]);
        replace(&mut doc, p, "World", "Rust", Scope::Paragraph).unwrap();
        assert_eq!(text::flattened(&doc, p), "Hello Rust");
    }

    #[test]
    fn test_replace_across_two_runs() {
        let (mut doc, body, p) = body_with(&["Hello ", "World"]);
        replace(&mut doc, body, "lo Wo", "LO_WO", Scope::Paragraph).unwrap();
        assert_eq!(text::flattened(&doc, p), "HelLO_WOrld");
        // No orphaned empty runs.
        for run in doc.descendants_named(p, "w:r") {
            assert!(!doc.descendants_named(run, "w:t").is_empty());
        }
    }

    #[test]
    fn test_replace_consumes_interior_runs() {
        let (mut doc, body, p) = body_with(&["ab", "cd", "ef", "gh"]);
        replace(&mut doc, body, "bcdefg", "-", Scope::Paragraph).unwrap();
        assert_eq!(text::flattened(&doc, p), "a-h");
        assert_eq!(doc.descendants_named(p, "w:r").len(), 2);
    }

    #[test]
    fn test_replace_multiple_matches_with_length_delta() {
        let (mut doc, body, p) = body_with(&["one two one ", "two one"]);
        replace(&mut doc, body, "one", "1", Scope::Paragraph).unwrap();
        assert_eq!(text::flattened(&doc, p), "1 two 1 two 1");
    }

    #[test]
    fn test_replace_longer_than_match() {
        let (mut doc, body, p) = body_with(&["a b a"]);
        replace(&mut doc, body, "a", "alpha", Scope::Paragraph).unwrap();
        assert_eq!(text::flattened(&doc, p), "alpha b alpha");
    }

    #[test]
    fn test_replace_no_match_is_identity() {
        let (mut doc, body, p) = body_with(&["Hello ", "World"]);
        let before = text::flattened(&doc, p);
        replace(&mut doc, body, "absent", "x", Scope::Paragraph).unwrap();
        assert_eq!(text::flattened(&doc, p), before);
    }

    #[test]
    fn test_replace_zero_length_match_inserts() {
        let (mut doc, body, p) = body_with(&["ab"]);
        replace(&mut doc, body, "^", ">> ", Scope::Paragraph).unwrap();
        assert_eq!(text::flattened(&doc, p), ">> ab");
    }

    #[test]
    fn test_replace_zero_length_match_at_end_appends() {
        let (mut doc, body, p) = body_with(&["ab", "cd"]);
        replace(&mut doc, body, "$", " <<", Scope::Paragraph).unwrap();
        assert_eq!(text::flattened(&doc, p), "abcd <<");
        // Appended onto the last fragment, not a new one.
        assert_eq!(doc.descendants_named(p, "w:t").len(), 2);
    }

    #[test]
    fn test_replace_match_at_paragraph_boundaries() {
        let (mut doc, body, p) = body_with(&["start middle end"]);
        replace(&mut doc, body, "start", "S", Scope::Paragraph).unwrap();
        replace(&mut doc, body, "end", "E", Scope::Paragraph).unwrap();
        assert_eq!(text::flattened(&doc, p), "S middle E");
    }

    #[test]
    fn test_replace_sets_space_preservation() {
        let (mut doc, body, p) = body_with(&["Hello World"]);
        replace(&mut doc, body, "World", " trailing ", Scope::Paragraph).unwrap();
        assert_eq!(text::flattened(&doc, p), "Hello  trailing ");
        let frag = doc.descendants_named(p, "w:t")[0];
        assert_eq!(doc.attr(frag, "xml:space"), Some("preserve"));
    }

    #[test]
    fn test_replace_fragment_scope_is_per_fragment() {
        let (mut doc, body, p) = body_with(&["Hello ", "World World"]);
        replace(&mut doc, body, "World", "Rust", Scope::Fragment).unwrap();
        assert_eq!(text::flattened(&doc, p), "Hello Rust Rust");
        // A cross-fragment pattern is untouched in this scope.
        replace(&mut doc, body, "o R", "-", Scope::Fragment).unwrap();
        assert_eq!(text::flattened(&doc, p), "Hello Rust Rust");
    }
}
