#![allow(clippy::uninlined_format_args)]

pub mod apod;
pub mod app;
pub mod config;
pub mod dates;
pub mod favorites;
pub mod gallery;
pub mod keys;
pub mod logging;
pub mod render;
pub mod ui;
pub mod viewer;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
