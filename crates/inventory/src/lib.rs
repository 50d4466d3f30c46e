//! Fans out over every active host concurrently, extracts container and
//! cluster-service metadata, port maps, network bindings and orchestration
//! labels, and merges in cached per-image security, version and update
//! data from the other engines.

mod digest;
pub mod error;
pub mod features;
mod labels;
mod state_mapping;
mod traefik;

pub use digest::BollardDigestResolver;
pub use error::CollectorError;
pub use features::collect_inventory::{
    BollardInventorySource, CollectInventoryUseCase, HostInventorySource, HostSourceFactory,
    RawContainer, RawPortBinding, RawService,
};
pub use traefik::TraefikApiClient;
