pub mod api;
pub mod common;
pub mod dao;
pub mod decoder;
pub mod media;
pub mod migration;
pub mod refresh;
pub mod resolver;
pub mod stats;
pub mod store;
