pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod logging;
pub mod state;
pub mod validation;
