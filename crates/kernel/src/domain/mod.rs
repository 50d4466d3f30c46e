pub mod container;
pub mod credential;
pub mod history;
pub mod host;
pub mod scan;
pub mod update;
pub mod version;
