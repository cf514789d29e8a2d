pub mod api;
pub mod config;
pub mod logs;
pub mod server;

mod dirs;
