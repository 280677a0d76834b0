//! KORMARC cataloging server
//!
//! Turns ISBNs into KORMARC bibliographic records in MRK text form, pulling
//! from Aladin, the National Library of Korea, Wikidata and the publisher
//! registries, and exposes the pipeline as a REST JSON API.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod marc;
pub mod models;
pub mod repository;
pub mod services;
pub mod text;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
