//! Launchpad catalog server
//!
//! Builds a single view of a library item across the consortium catalog
//! database and the partner catalogs reachable only over Z39.50:
//! bibliographic description, related bibs, per-library holdings,
//! availability and interlibrary loan eligibility.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod identifiers;
pub mod marc;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
