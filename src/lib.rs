pub mod catalog;
pub mod config;
pub mod render;
pub mod server;
pub mod store;
