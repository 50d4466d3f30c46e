pub mod adapter;
pub mod ports;
pub mod use_case;

#[cfg(test)]
mod use_case_test;

pub use adapter::BollardContainerEngine;
pub use ports::{ContainerEngine, DependentContainer};
pub use use_case::UpdateContainerUseCase;
