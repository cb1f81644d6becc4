//! PDF Toolbox
//!
//! A small web service that compresses PDFs through Ghostscript, splits them
//! into single pages packed in a ZIP, and merges several PDFs into one.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};
