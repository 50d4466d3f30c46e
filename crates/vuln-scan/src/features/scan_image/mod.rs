pub mod adapter;
pub mod ports;
pub mod use_case;

#[cfg(test)]
mod use_case_test;

pub use ports::{DigestResolver, ScanError, ScannerClient};
pub use use_case::ScanImageUseCase;
