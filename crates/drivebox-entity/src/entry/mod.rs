//! File-system entry domain entities.

pub mod breadcrumb;
pub mod model;

pub use breadcrumb::Breadcrumb;
pub use model::{DEFAULT_FILE_MIME_TYPE, Entry, FOLDER_MIME_TYPE, NewEntry};
