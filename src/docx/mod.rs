//! WordprocessingML package editing: the part registry, text search and
//! replace, formatting mutation, merging and the construction helpers.

pub mod builders;
pub mod comment;
pub mod format;
pub mod image;
pub mod merge;
pub mod package;
pub mod search;
pub mod template;
pub mod text;

pub use comment::add_comment;
pub use format::{Change, FontOptions, ParagraphOptions};
pub use image::insert_picture;
pub use merge::merge;
pub use package::{Margins, Package};
pub use search::{ResultKind, Scope};
