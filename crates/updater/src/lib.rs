//! Replaces a running container with a newer image in place, preserving
//! configuration, networks and dependents, with an external-orchestrator
//! shortcut and best-effort rollback on the engine-path fallback.

pub mod effective_config;
pub mod error;
pub mod features;
pub mod lock;
pub mod orchestrator;
pub mod state;

pub use error::UpdaterError;
pub use features::update_container::{BollardContainerEngine, ContainerEngine, DependentContainer, UpdateContainerUseCase};
pub use state::{UpdateOutcome, UpdateState};
