pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod handlers;
pub mod response;
pub mod restful;
