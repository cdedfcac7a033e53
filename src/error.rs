/// Error types for package editing operations.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("part not found: {0}")]
    PartNotFound(String),

    #[error("malformed package: {0}")]
    MalformedPackage(String),

    #[error("malformed XML in part '{part}': {message}")]
    MalformedXml { part: String, message: String },

    #[error("no ancestor of the requested kind for this node")]
    NoMatchingAncestor,

    #[error("invalid anchor: {0}")]
    InvalidAnchor(String),

    #[error("end anchor precedes start anchor")]
    AnchorOrder,

    #[error("image dimensions unavailable for '{0}': supply explicit width and height")]
    ImageDimensions(String),

    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("XML escape error: {0}")]
    Escape(String),

    #[error("attribute error: {0}")]
    Attr(String),
}

impl From<quick_xml::escape::EscapeError> for Error {
    fn from(err: quick_xml::escape::EscapeError) -> Self {
        Error::Escape(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Attr(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
