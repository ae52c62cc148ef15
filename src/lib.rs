pub mod clients;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod models;
pub mod services;
pub mod store;

pub use config::StoryConfig;
pub use error::{AppError, Result};
pub use handler::StoryFunction;
