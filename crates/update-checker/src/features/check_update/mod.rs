pub mod adapter;
pub mod ports;
pub mod use_case;

#[cfg(test)]
mod use_case_test;

pub use adapter::BollardImageInspector;
pub use ports::ImageInspector;
pub use use_case::{CheckUpdateUseCase, ContainerImageContext};
