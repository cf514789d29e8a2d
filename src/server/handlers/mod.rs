pub mod drinks;
pub mod healthz;
