pub mod config;
pub mod consumers;
pub mod db;
pub mod error;
pub mod metrics;
pub mod models;
pub mod schema;
pub mod services;

pub use config::Config;
pub use error::{AppError, IngestError, Result};
