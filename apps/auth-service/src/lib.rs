//! Auth service: authenticates credentials and issues RS256 tokens.

pub mod config;
pub mod routes;
pub mod state;
pub mod users;

pub use config::Config;
pub use state::AppState;
