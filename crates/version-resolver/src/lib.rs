//! Multi-registry tag-listing client with token caching, semantic and
//! date-based version parsing, and the newer-stable-tag selection
//! pipeline, backed by a file-based result cache.

pub mod error;
pub mod features;
mod image_ref;
pub mod tag_parser;

pub use error::VersionError;
pub use features::check_version::{CheckVersionUseCase, HttpTagLister, TagLister};
pub use image_ref::parse_image_reference;
