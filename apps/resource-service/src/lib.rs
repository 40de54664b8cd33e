//! Resource service: serves product data to holders of a valid access token.

pub mod config;
pub mod products;
pub mod routes;
pub mod state;

pub use config::Config;
pub use state::AppState;
