pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod interrupt;
pub mod logging;
pub mod manifest;
pub mod output;
pub mod remote;
pub mod store;
