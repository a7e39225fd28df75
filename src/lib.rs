pub mod api;
pub mod app;
pub mod auth;
pub mod cache;
pub mod cli;
pub mod config;
pub mod database;
pub mod email;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod sms;
pub mod state;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use app::router;
pub use state::AppState;
