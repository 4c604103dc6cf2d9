pub mod api;
pub mod config;
pub mod entities;
pub mod error;
pub mod middleware;
pub mod seed;
pub mod sentiment;
pub mod services;
pub mod state;

pub use api::create_api_router;
pub use config::Config;
pub use state::AppState;
