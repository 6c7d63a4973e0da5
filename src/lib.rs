pub mod api;
pub mod app;
pub mod charts;
pub mod config;
pub mod errors;
pub mod filter;
pub mod handlers;
pub mod models;
pub mod state;
pub mod stats;
pub mod ui;
pub mod validation;

pub use app::router;
pub use config::Settings;
pub use state::AppState;
