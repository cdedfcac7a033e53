//! Property cascade mutation: direct run/paragraph formatting, style
//! definitions and document defaults, all through one set of options.
//!
//! Every option field defaults to leaving the existing state alone. A
//! mutation removes the property's existing element before appending the
//! new one, so repeated calls converge instead of accumulating duplicates.

use crate::xml::{NodeClass, NodeId, XmlDoc};
use phf::phf_map;

/// Tri-state change request for one formatting property.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Change<T> {
    /// Leave the existing state untouched.
    #[default]
    Keep,
    /// Remove the property's marker element.
    Clear,
    /// Set the property to the given value.
    Set(T),
}

/// Named underline styles; anything else a caller hands in degrades to
/// [`Underline::Single`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Underline {
    Single,
    Double,
    Thick,
    Dotted,
    Dash,
    DotDash,
    DotDotDash,
    Wave,
    WavyHeavy,
    WavyDouble,
}

impl Underline {
    const ALL: [Underline; 10] = [
        Self::Single,
        Self::Double,
        Self::Thick,
        Self::Dotted,
        Self::Dash,
        Self::DotDash,
        Self::DotDotDash,
        Self::Wave,
        Self::WavyHeavy,
        Self::WavyDouble,
    ];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
            Self::Thick => "thick",
            Self::Dotted => "dotted",
            Self::Dash => "dash",
            Self::DotDash => "dotDash",
            Self::DotDotDash => "dotDotDash",
            Self::Wave => "wave",
            Self::WavyHeavy => "wavyHeavy",
            Self::WavyDouble => "wavyDouble",
        }
    }

    /// Case-insensitive parse; unrecognized names degrade to `Single`.
    pub fn parse(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|u| u.as_str().eq_ignore_ascii_case(name))
            .unwrap_or(Self::Single)
    }
}

/// Named colors understood by [`Color::parse`].
static COLOR_MAP: phf::Map<&'static str, &'static str> = phf_map! {
    "black" => "000000",
    "blue" => "0000FF",
    "gray" => "808080",
    "green" => "00FF00",
    "grey" => "808080",
    "orange" => "FFA500",
    "pink" => "FFCBDB",
    "purple" => "FF00FF",
    "red" => "FF0000",
    "silver" => "C0C0C0",
    "white" => "FFFFFF",
    "yellow" => "FFFF00",
};

/// A text color as a six-digit hex value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Color(String);

impl Color {
    /// Accepts a name from the small named-color table or a literal hex
    /// string, which is written through as given.
    pub fn parse(value: &str) -> Self {
        match COLOR_MAP.get(value.to_ascii_lowercase().as_str()) {
            Some(hex) => Color((*hex).to_string()),
            None => Color(value.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Highlight colors; an unrecognized name is written through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Highlight {
    Yellow,
    Green,
    Cyan,
    Magenta,
    Blue,
    Red,
    DarkBlue,
    DarkCyan,
    DarkGreen,
    DarkMagenta,
    DarkRed,
    DarkYellow,
    LightGray,
    Black,
    /// Lenient write-through for a name outside the fixed set.
    Other(String),
}

impl Highlight {
    const NAMED: [(&'static str, Highlight); 14] = [
        ("yellow", Self::Yellow),
        ("green", Self::Green),
        ("cyan", Self::Cyan),
        ("magenta", Self::Magenta),
        ("blue", Self::Blue),
        ("red", Self::Red),
        ("darkBlue", Self::DarkBlue),
        ("darkCyan", Self::DarkCyan),
        ("darkGreen", Self::DarkGreen),
        ("darkMagenta", Self::DarkMagenta),
        ("darkRed", Self::DarkRed),
        ("darkYellow", Self::DarkYellow),
        ("lightGray", Self::LightGray),
        ("black", Self::Black),
    ];

    pub fn parse(name: &str) -> Self {
        Self::NAMED
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, h)| h.clone())
            .unwrap_or_else(|| Self::Other(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Other(name) => name,
            other => {
                Self::NAMED
                    .iter()
                    .find(|(_, h)| h == other)
                    .map(|(n, _)| *n)
                    .unwrap_or("yellow")
            }
        }
    }
}

/// Strikethrough variants: `w:strike` or `w:dstrike`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strikethrough {
    Single,
    Double,
}

impl Strikethrough {
    pub(crate) fn element(self) -> &'static str {
        match self {
            Self::Single => "w:strike",
            Self::Double => "w:dstrike",
        }
    }

    /// `single`/`strike` and `double`/`dstrike`, case-insensitive; anything
    /// else degrades to single.
    pub fn parse(name: &str) -> Self {
        if name.eq_ignore_ascii_case("double") || name.eq_ignore_ascii_case("dstrike") {
            Self::Double
        } else {
            Self::Single
        }
    }
}

/// Font-level options; every field defaults to "leave unchanged".
#[derive(Debug, Clone, Default)]
pub struct FontOptions {
    pub name: Change<String>,
    /// Size in points, as seen in an editor. Stored doubled (half-point
    /// units): a request for size N always writes 2N.
    pub size: Change<u32>,
    pub underline: Change<Underline>,
    pub color: Change<Color>,
    pub highlight: Change<Highlight>,
    pub strikethrough: Change<Strikethrough>,
    pub bold: Change<bool>,
    pub italics: Change<bool>,
    pub shadow: Change<bool>,
    pub small_caps: Change<bool>,
    pub all_caps: Change<bool>,
    pub hidden: Change<bool>,
    pub subscript: Change<bool>,
    pub superscript: Change<bool>,
}

/// Paragraph indentation in twentieths of a point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Indent {
    pub left: Option<i32>,
    pub right: Option<i32>,
    pub first_line: Option<i32>,
    pub hanging: Option<i32>,
}

/// Paragraph spacing in twentieths of a point; `line_rule` defaults to
/// `auto` when line spacing is given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spacing {
    pub before: Option<u32>,
    pub after: Option<u32>,
    pub line: Option<u32>,
    pub line_rule: Option<String>,
}

/// Paragraph justification values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justification {
    Left,
    Center,
    Right,
    Both,
    Distribute,
}

impl Justification {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Both => "both",
            Self::Distribute => "distribute",
        }
    }
}

/// Paragraph-level options; every field defaults to "leave unchanged".
#[derive(Debug, Clone, Default)]
pub struct ParagraphOptions {
    pub indent: Change<Indent>,
    pub spacing: Change<Spacing>,
    pub style_id: Change<String>,
    pub justification: Change<Justification>,
}

/// Apply font options to a target.
///
/// The target may be a single `w:r`, a properties host (`w:rPrDefault` or a
/// `w:style` definition), or any container, in which case every descendant
/// run is affected.
pub fn apply_font(doc: &mut XmlDoc, target: NodeId, opts: &FontOptions) {
    for host in property_hosts(doc, target, NodeClass::Run, "w:rPrDefault") {
        let rpr = find_or_create_props(doc, host, "w:rPr");
        apply_font_to_rpr(doc, rpr, opts);
    }
}

/// Apply paragraph options to a target.
///
/// The target may be a single `w:p`, a properties host (`w:pPrDefault` or a
/// `w:style` definition), or any container, in which case every descendant
/// paragraph is affected.
pub fn apply_paragraph(doc: &mut XmlDoc, target: NodeId, opts: &ParagraphOptions) {
    for host in property_hosts(doc, target, NodeClass::Paragraph, "w:pPrDefault") {
        let ppr = find_or_create_props(doc, host, "w:pPr");
        apply_paragraph_to_ppr(doc, ppr, opts);
    }
}

/// Resolve a target into the elements whose property child gets mutated.
fn property_hosts(
    doc: &XmlDoc,
    target: NodeId,
    direct: NodeClass,
    default_host: &str,
) -> Vec<NodeId> {
    if doc.class(target) == direct
        || doc.is_named(target, default_host)
        || doc.is_named(target, "w:style")
    {
        return vec![target];
    }
    let name = match direct {
        NodeClass::Run => "w:r",
        _ => "w:p",
    };
    doc.descendants_named(target, name)
}

fn find_or_create_props(doc: &mut XmlDoc, host: NodeId, name: &str) -> NodeId {
    if let Some(props) = doc.first_child_named(host, name) {
        return props;
    }
    let props = doc.create_element(name);
    doc.insert(host, 0, props);
    props
}

/// Remove any existing marker, then append the new one if the change sets a
/// value. This is what makes repeated applications idempotent.
fn swap_marker(doc: &mut XmlDoc, props: NodeId, names: &[&str], build: Option<(&str, &[(&str, &str)])>) {
    for name in names {
        while let Some(existing) = doc.first_child_named(props, name) {
            doc.detach(existing);
        }
    }
    if let Some((name, attrs)) = build {
        let element = doc.create_element_with(name, attrs);
        doc.append(props, element);
    }
}

fn apply_font_to_rpr(doc: &mut XmlDoc, rpr: NodeId, opts: &FontOptions) {
    match &opts.name {
        Change::Keep => {}
        Change::Clear => swap_marker(doc, rpr, &["w:rFonts"], None),
        Change::Set(name) => swap_marker(
            doc,
            rpr,
            &["w:rFonts"],
            Some(("w:rFonts", &[("w:ascii", name.as_str()), ("w:hAnsi", name.as_str())])),
        ),
    }
    match &opts.size {
        Change::Keep => {}
        Change::Clear => {
            swap_marker(doc, rpr, &["w:sz"], None);
            swap_marker(doc, rpr, &["w:szCs"], None);
        }
        Change::Set(points) => {
            let half_points = (points * 2).to_string();
            swap_marker(doc, rpr, &["w:sz"], Some(("w:sz", &[("w:val", half_points.as_str())])));
            swap_marker(doc, rpr, &["w:szCs"], Some(("w:szCs", &[("w:val", half_points.as_str())])));
        }
    }
    match &opts.underline {
        Change::Keep => {}
        Change::Clear => swap_marker(doc, rpr, &["w:u"], None),
        Change::Set(style) => {
            swap_marker(doc, rpr, &["w:u"], Some(("w:u", &[("w:val", style.as_str())])));
        }
    }
    match &opts.color {
        Change::Keep => {}
        Change::Clear => swap_marker(doc, rpr, &["w:color"], None),
        Change::Set(color) => {
            swap_marker(doc, rpr, &["w:color"], Some(("w:color", &[("w:val", color.as_str())])));
        }
    }
    match &opts.highlight {
        Change::Keep => {}
        Change::Clear => swap_marker(doc, rpr, &["w:highlight"], None),
        Change::Set(highlight) => swap_marker(
            doc,
            rpr,
            &["w:highlight"],
            Some(("w:highlight", &[("w:val", highlight.as_str())])),
        ),
    }
    match &opts.strikethrough {
        Change::Keep => {}
        Change::Clear => swap_marker(doc, rpr, &["w:strike", "w:dstrike"], None),
        Change::Set(style) => {
            swap_marker(doc, rpr, &["w:strike", "w:dstrike"], Some((style.element(), &[])));
        }
    }
    // Subscript and superscript share the single w:vertAlign slot.
    let vert_align = match (&opts.subscript, &opts.superscript) {
        (Change::Set(true), _) => Change::Set("subscript"),
        (_, Change::Set(true)) => Change::Set("superscript"),
        (Change::Keep, Change::Keep) => Change::Keep,
        _ => Change::Clear,
    };
    match vert_align {
        Change::Keep => {}
        Change::Clear => swap_marker(doc, rpr, &["w:vertAlign"], None),
        Change::Set(value) => {
            swap_marker(doc, rpr, &["w:vertAlign"], Some(("w:vertAlign", &[("w:val", value)])));
        }
    }
    let toggles = [
        (&opts.bold, "w:b"),
        (&opts.italics, "w:i"),
        (&opts.shadow, "w:shadow"),
        (&opts.all_caps, "w:caps"),
        (&opts.small_caps, "w:smallCaps"),
        (&opts.hidden, "w:vanish"),
    ];
    for (change, element) in toggles {
        match change {
            Change::Keep => {}
            Change::Clear | Change::Set(false) => swap_marker(doc, rpr, &[element], None),
            Change::Set(true) => swap_marker(doc, rpr, &[element], Some((element, &[]))),
        }
    }
}

fn apply_paragraph_to_ppr(doc: &mut XmlDoc, ppr: NodeId, opts: &ParagraphOptions) {
    match &opts.indent {
        Change::Keep => {}
        Change::Clear => swap_marker(doc, ppr, &["w:ind"], None),
        Change::Set(indent) => {
            let mut attrs: Vec<(&str, String)> = Vec::new();
            if let Some(v) = indent.left {
                attrs.push(("w:left", v.to_string()));
            }
            if let Some(v) = indent.right {
                attrs.push(("w:right", v.to_string()));
            }
            if let Some(v) = indent.first_line {
                attrs.push(("w:firstLine", v.to_string()));
            }
            if let Some(v) = indent.hanging {
                attrs.push(("w:hanging", v.to_string()));
            }
            let borrowed: Vec<(&str, &str)> =
                attrs.iter().map(|(k, v)| (*k, v.as_str())).collect();
            swap_marker(doc, ppr, &["w:ind"], Some(("w:ind", &borrowed)));
        }
    }
    match &opts.spacing {
        Change::Keep => {}
        Change::Clear => swap_marker(doc, ppr, &["w:spacing"], None),
        Change::Set(spacing) => {
            let mut attrs: Vec<(&str, String)> = Vec::new();
            if let Some(v) = spacing.before {
                attrs.push(("w:before", v.to_string()));
            }
            if let Some(v) = spacing.after {
                attrs.push(("w:after", v.to_string()));
            }
            if let Some(v) = spacing.line {
                attrs.push(("w:line", v.to_string()));
                let rule = spacing.line_rule.as_deref().unwrap_or("auto");
                attrs.push(("w:lineRule", rule.to_string()));
            }
            let borrowed: Vec<(&str, &str)> =
                attrs.iter().map(|(k, v)| (*k, v.as_str())).collect();
            swap_marker(doc, ppr, &["w:spacing"], Some(("w:spacing", &borrowed)));
        }
    }
    match &opts.style_id {
        Change::Keep => {}
        Change::Clear => swap_marker(doc, ppr, &["w:pStyle"], None),
        Change::Set(style) => {
            swap_marker(doc, ppr, &["w:pStyle"], Some(("w:pStyle", &[("w:val", style.as_str())])));
        }
    }
    match &opts.justification {
        Change::Keep => {}
        Change::Clear => swap_marker(doc, ppr, &["w:jc"], None),
        Change::Set(jc) => {
            swap_marker(doc, ppr, &["w:jc"], Some(("w:jc", &[("w:val", jc.as_str())])));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_doc() -> (XmlDoc, NodeId) {
        let mut doc = XmlDoc::with_root("w:p");
        let p = doc.root();
        let r = doc.create_element("w:r");
        doc.append(p, r);
        let t = doc.create_element("w:t");
        doc.append(r, t);
        doc.set_text_content(t, "text");
        (doc, r)
    }

    fn rpr_children(doc: &XmlDoc, run: NodeId, name: &str) -> usize {
        let rpr = doc.first_child_named(run, "w:rPr").expect("rPr exists");
        doc.children_named(rpr, name).len()
    }

    #[test]
    fn test_bold_is_idempotent() {
        let (mut doc, run) = run_doc();
        let opts = FontOptions {
            bold: Change::Set(true),
            ..Default::default()
        };
        apply_font(&mut doc, run, &opts);
        apply_font(&mut doc, run, &opts);
        assert_eq!(rpr_children(&doc, run, "w:b"), 1);
    }

    #[test]
    fn test_bold_false_removes_marker() {
        let (mut doc, run) = run_doc();
        apply_font(&mut doc, run, &FontOptions { bold: Change::Set(true), ..Default::default() });
        apply_font(&mut doc, run, &FontOptions { bold: Change::Set(false), ..Default::default() });
        assert_eq!(rpr_children(&doc, run, "w:b"), 0);
    }

    #[test]
    fn test_keep_leaves_existing_state() {
        let (mut doc, run) = run_doc();
        apply_font(&mut doc, run, &FontOptions { bold: Change::Set(true), ..Default::default() });
        apply_font(&mut doc, run, &FontOptions { italics: Change::Set(true), ..Default::default() });
        assert_eq!(rpr_children(&doc, run, "w:b"), 1);
        assert_eq!(rpr_children(&doc, run, "w:i"), 1);
    }

    #[test]
    fn test_size_written_in_half_points() {
        let (mut doc, run) = run_doc();
        apply_font(&mut doc, run, &FontOptions { size: Change::Set(12), ..Default::default() });
        let rpr = doc.first_child_named(run, "w:rPr").unwrap();
        let sz = doc.first_child_named(rpr, "w:sz").unwrap();
        assert_eq!(doc.attr(sz, "w:val"), Some("24"));
        let szcs = doc.first_child_named(rpr, "w:szCs").unwrap();
        assert_eq!(doc.attr(szcs, "w:val"), Some("24"));
    }

    #[test]
    fn test_underline_parse_degrades_to_single() {
        assert_eq!(Underline::parse("DOTDASH"), Underline::DotDash);
        assert_eq!(Underline::parse("wavyheavy"), Underline::WavyHeavy);
        assert_eq!(Underline::parse("squiggle"), Underline::Single);
    }

    #[test]
    fn test_color_named_and_hex() {
        assert_eq!(Color::parse("Purple").as_str(), "FF00FF");
        assert_eq!(Color::parse("grey").as_str(), "808080");
        assert_eq!(Color::parse("1A2B3C").as_str(), "1A2B3C");
    }

    #[test]
    fn test_highlight_unknown_written_verbatim() {
        assert_eq!(Highlight::parse("darkgreen"), Highlight::DarkGreen);
        let odd = Highlight::parse("chartreuse");
        assert_eq!(odd.as_str(), "chartreuse");
    }

    #[test]
    fn test_strikethrough_swaps_variants() {
        let (mut doc, run) = run_doc();
        apply_font(&mut doc, run, &FontOptions {
            strikethrough: Change::Set(Strikethrough::Single),
            ..Default::default()
        });
        assert_eq!(rpr_children(&doc, run, "w:strike"), 1);
        apply_font(&mut doc, run, &FontOptions {
            strikethrough: Change::Set(Strikethrough::Double),
            ..Default::default()
        });
        assert_eq!(rpr_children(&doc, run, "w:strike"), 0);
        assert_eq!(rpr_children(&doc, run, "w:dstrike"), 1);
    }

    #[test]
    fn test_subscript_and_superscript_share_slot() {
        let (mut doc, run) = run_doc();
        apply_font(&mut doc, run, &FontOptions {
            subscript: Change::Set(true),
            ..Default::default()
        });
        apply_font(&mut doc, run, &FontOptions {
            superscript: Change::Set(true),
            ..Default::default()
        });
        let rpr = doc.first_child_named(run, "w:rPr").unwrap();
        let aligns = doc.children_named(rpr, "w:vertAlign");
        assert_eq!(aligns.len(), 1);
        assert_eq!(doc.attr(aligns[0], "w:val"), Some("superscript"));
    }

    #[test]
    fn test_container_target_hits_all_runs() {
        let mut doc = XmlDoc::with_root("w:body");
        let body = doc.root();
        for _ in 0..2 {
            let p = doc.create_element("w:p");
            doc.append(body, p);
            let r = doc.create_element("w:r");
            doc.append(p, r);
        }
        apply_font(&mut doc, body, &FontOptions { bold: Change::Set(true), ..Default::default() });
        for r in doc.descendants_named(body, "w:r") {
            assert_eq!(rpr_children(&doc, r, "w:b"), 1);
        }
    }

    #[test]
    fn test_style_host_gets_direct_rpr() {
        let mut doc = XmlDoc::with_root("w:styles");
        let styles = doc.root();
        let style = doc.create_element_with("w:style", &[("w:styleId", "Emphatic")]);
        doc.append(styles, style);
        apply_font(&mut doc, style, &FontOptions { bold: Change::Set(true), ..Default::default() });
        let rpr = doc.first_child_named(style, "w:rPr").unwrap();
        assert_eq!(doc.children_named(rpr, "w:b").len(), 1);
    }

    #[test]
    fn test_paragraph_options() {
        let mut doc = XmlDoc::with_root("w:p");
        let p = doc.root();
        let opts = ParagraphOptions {
            justification: Change::Set(Justification::Center),
            style_id: Change::Set("Quote".to_string()),
            spacing: Change::Set(Spacing { line: Some(480), ..Default::default() }),
            ..Default::default()
        };
        apply_paragraph(&mut doc, p, &opts);
        apply_paragraph(&mut doc, p, &opts);
        let ppr = doc.first_child_named(p, "w:pPr").unwrap();
        assert_eq!(doc.children_named(ppr, "w:jc").len(), 1);
        let jc = doc.first_child_named(ppr, "w:jc").unwrap();
        assert_eq!(doc.attr(jc, "w:val"), Some("center"));
        let style = doc.first_child_named(ppr, "w:pStyle").unwrap();
        assert_eq!(doc.attr(style, "w:val"), Some("Quote"));
        let spacing = doc.first_child_named(ppr, "w:spacing").unwrap();
        assert_eq!(doc.attr(spacing, "w:lineRule"), Some("auto"));
    }
}
