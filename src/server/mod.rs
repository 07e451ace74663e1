pub mod config;
mod http_layers;
pub mod server;
pub mod session;
pub mod state;
pub mod validation;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
pub use validation::is_valid_identifier;
