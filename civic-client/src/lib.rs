// Library interface for the civic client (shared by the binary and tests)
pub mod api;
pub mod app;
pub mod config;

#[macro_use]
pub mod logging;

pub mod session;
pub mod ui;
