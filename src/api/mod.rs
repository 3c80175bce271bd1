#[allow(clippy::module_inception)]
pub mod api;
pub mod error;
pub mod http_server;
