pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use db::{create_pool, run_migrations, PgLoadStore};
pub use error::{AppError, LoadError};
pub use service::{ChatClient, Loader, ReportService};
