pub mod document;
pub mod entry;

pub use document::{document_filename, CapturedDocument};
pub use entry::{short_hash, FeedEntry};
