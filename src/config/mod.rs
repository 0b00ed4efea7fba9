//! Process configuration, read once at startup.

pub mod app;

pub use app::AppConfig;
