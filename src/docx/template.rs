//! Blank-document template parts.
//!
//! A new package starts from these static part bodies instead of a template
//! directory on disk; they describe the smallest WordprocessingML package
//! third-party readers accept.

/// `[Content_Types].xml` for a blank document.
///
/// The loader back-fills image defaults, so only the parts the template
/// actually ships are declared here.
pub const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

/// Root relationships part (`_rels/.rels`).
pub const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Document-scoped relationships part (`word/_rels/document.xml.rels`).
pub const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

/// Main document part with an empty body and a default section.
pub const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:ve="http://schemas.openxmlformats.org/markup-compatibility/2006" xmlns:o="urn:schemas-microsoft-com:office:office" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:m="http://schemas.openxmlformats.org/officeDocument/2006/math" xmlns:v="urn:schemas-microsoft-com:vml" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:w10="urn:schemas-microsoft-com:office:word" xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:wne="http://schemas.microsoft.com/office/word/2006/wordml"><w:body><w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr></w:body></w:document>"#;

/// Styles part with empty document defaults.
pub const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault/><w:pPrDefault/></w:docDefaults></w:styles>"#;

/// The ordered entries of a blank package.
pub fn blank_entries() -> Vec<(String, Vec<u8>)> {
    vec![
        ("[Content_Types].xml".to_string(), CONTENT_TYPES.into()),
        ("_rels/.rels".to_string(), ROOT_RELS.into()),
        ("word/document.xml".to_string(), DOCUMENT.into()),
        ("word/_rels/document.xml.rels".to_string(), DOCUMENT_RELS.into()),
        ("word/styles.xml".to_string(), STYLES.into()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::codec;

    #[test]
    fn test_template_parts_are_well_formed() {
        for (name, bytes) in blank_entries() {
            assert!(codec::parse(&bytes).is_ok(), "malformed template part {}", name);
        }
    }
}
