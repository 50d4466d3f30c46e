pub mod adapter;
pub mod ports;
pub mod use_case;

#[cfg(test)]
mod use_case_test;

pub use adapter::HttpTagLister;
pub use ports::TagLister;
pub use use_case::CheckVersionUseCase;
