pub mod auth;
pub mod blob;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod gallery;
pub mod memories;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod session;
pub mod state;
pub mod upload;
pub mod validate;

pub use config::Config;
pub use error::ApiError;
pub use state::AppState;
