//! Résumé intake service
//!
//! Accepts an uploaded PDF résumé, stages it in a scratch directory under a
//! random name, extracts its text and hands that text to a structured
//! extraction delegate. The staged file is removed on every exit path.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};
