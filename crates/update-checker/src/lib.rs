//! Pulls a candidate image by tag, compares digests with the running
//! container, caches the per-container decision, and supports cooperative
//! cancellation via a shared token.

pub mod error;
pub mod features;
pub mod floating_tag;

pub use error::UpdateCheckError;
pub use features::check_update::{CheckUpdateUseCase, ContainerImageContext, ImageInspector};
