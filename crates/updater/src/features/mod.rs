pub mod update_container;
