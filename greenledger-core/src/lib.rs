pub mod config;
pub mod errors;

pub mod app_context;
pub use app_context::AppContext;
pub mod database;
pub mod lifecycle;
pub mod services;
