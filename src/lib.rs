pub mod commands;
pub mod config;
pub mod confirm;
pub mod destroy;
pub mod doctor;
pub mod engine;
pub mod error;
pub mod fs_utils;
pub mod inventory;
pub mod lister;
pub mod lock;
pub mod ops;
pub mod paths;
pub mod snapshot;
pub mod store;
pub mod switch;
pub mod ui;

#[cfg(test)]
pub mod test_utils;
