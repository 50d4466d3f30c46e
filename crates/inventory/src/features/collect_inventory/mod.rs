pub mod adapter;
pub mod ports;
pub mod use_case;

#[cfg(test)]
mod use_case_test;

pub use adapter::BollardInventorySource;
pub use ports::{HostInventorySource, RawContainer, RawPortBinding, RawService};
pub use use_case::{CollectInventoryUseCase, HostSourceFactory};
