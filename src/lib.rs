pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod models;
pub mod sync;

pub use app::App;
pub use config::Config;
pub use error::{AppError, Result};
