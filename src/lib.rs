//! BDC Fetcher Library
//!
//! A Rust library for bulk-downloading FCC Broadband Data Collection files
//! from the National Broadband Map. Provides deterministic filter planning
//! over the published catalog, sequential rate-limited downloading, and an
//! optional hexagon-to-polygon GIS conversion step behind collaborator
//! traits.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
