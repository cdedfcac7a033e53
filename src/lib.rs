//! Quince - a programmatic editor for Word (.docx) packages
//!
//! This library loads a WordprocessingML package (or starts from a blank
//! template), exposes its parts as an in-memory object graph, and
//! re-serializes the graph into a valid package after mutation.
//!
//! # Features
//!
//! - **Search and replace**: regex search over paragraph text that works
//!   across run boundaries, with formatting outside the match preserved
//! - **Formatting**: font and paragraph property mutation on runs,
//!   paragraphs, named styles or the document defaults
//! - **Merging**: append one package to another with relationship
//!   remapping, media transfer and content-type union
//! - **Construction**: paragraph, heading, table, picture, numbered-list
//!   and comment helpers
//!
//! # Example - Editing a document
//!
//! ```no_run
//! use quince::docx::{Package, ResultKind, Scope};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut pkg = Package::open("report.docx")?;
//!
//! // Replace across formatting runs
//! pkg.replace("Q[34] 2025", "Q1 2026", Scope::Paragraph)?;
//!
//! // Locate the paragraph owning a match
//! if let Some(p) = pkg.search("Revenue", ResultKind::Paragraph, Scope::Paragraph)? {
//!     println!("found paragraph {:?}", p);
//! }
//!
//! pkg.save("report-updated.docx")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Building a document from scratch
//!
//! ```
//! use quince::docx::{builders, Package};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut pkg = Package::new()?;
//! builders::append_heading(&mut pkg, "Summary", 1);
//! builders::append_paragraph(&mut pkg, "All systems nominal.");
//! let bytes = pkg.to_bytes()?;
//! # assert!(!bytes.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Merging two documents
//!
//! ```no_run
//! use quince::docx::{merge, Package};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut report = Package::open("report.docx")?;
//! let appendix = Package::open("appendix.docx")?;
//! merge(&mut report, appendix, true)?;
//! report.save("combined.docx")?;
//! # Ok(())
//! # }
//! ```

pub mod error;

/// WordprocessingML document model and editing operations.
pub mod docx;

/// Open Packaging Convention layer: relationships, content types, the ZIP
/// container boundary.
pub mod opc;

/// Arena XML tree, namespace table and the parse/serialize codec.
pub mod xml;

pub use error::{Error, Result};

// Re-export the entry points most callers need.
pub use docx::{FontOptions, Package, ParagraphOptions, merge};
