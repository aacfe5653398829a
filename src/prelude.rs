//! Prelude module for the BDC Fetcher library
//!
//! Re-exports the most commonly used items so that typical integrations
//! need a single `use bdc_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use bdc_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let credentials = Credentials::from_env()?;
//!     let client = BdcClient::new(&credentials)?;
//!
//!     let catalog = client.fetch_reference_catalog("2024-06-30").await?;
//!     let request = FixedRequest {
//!         as_of_date: "2024-06-30".to_string(),
//!         state_fips: vec!["06".to_string()],
//!         technology_codes: vec!["all".to_string()],
//!         provider_ids: vec!["all".to_string()],
//!     };
//!     let plan = request.plan(&catalog)?;
//!     println!("{} files selected", plan.len());
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, RequestError, Result};

// Essential app components
pub use crate::app::{
    BatchOutcome,
    BatchReport,
    BdcClient,
    CancelFlag,
    CellGeometry,
    ChallengeCatalog,
    ChallengeRequest,
    ClientConfig,
    DownloadOrchestrator,
    FileFetcher,
    FilterRequest,
    FixedRequest,
    GisFormat,
    LayerWriter,
    MobileRequest,
    OutputLayout,
    ReferenceCatalog,
    SelectedFile,
};

// Authentication
pub use crate::auth::{check_credentials, get_auth_status, Credentials};

// Commonly used constants
pub use crate::constants::{ALL_SENTINEL, DEFAULT_RATE_LIMIT_RPS, ENV_USERNAME, USER_AGENT};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

pub use tokio;
