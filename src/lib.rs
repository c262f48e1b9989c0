// Library root for the Plaid relay service

pub mod api;
pub mod config;
pub mod core;
pub mod tasks;
pub mod upstream;
pub mod utils;

pub use crate::config::environment::EnvironmentVariables;
pub use crate::config::state::AppState;
pub use crate::utils::error_handler::RelayError;
