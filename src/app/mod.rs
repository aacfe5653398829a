//! Core application logic for BDC Fetcher
//!
//! This module contains the main application components: the map API
//! client, catalog models, filter planning, download orchestration, and
//! the GIS conversion step.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bdc_fetcher::app::{BdcClient, DownloadOrchestrator, CancelFlag, FixedRequest};
//! use bdc_fetcher::auth::Credentials;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = Credentials::from_env()?;
//! let client = BdcClient::new(&credentials)?;
//!
//! // Discover the available vintages, newest first
//! let dates = client.list_as_of_dates().await?;
//! println!("latest availability vintage: {}", dates[0].as_of_date);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod client;
pub mod geometry;
pub mod orchestrator;
pub mod output;
pub mod planner;
pub mod predicate;

// Re-export main public API
pub use catalog::{
    normalize_as_of_date, Category, ChallengeCatalog, ChallengeRow, FileType, ReferenceCatalog,
    ReferenceRow, TechnologyType,
};
pub use client::{AsOfDate, BdcClient, ClientConfig};
pub use geometry::{
    decode_coverage_archive, polygonize, CellGeometry, CoverageTable, GeoRecord, GisFormat,
    HexRecord, LayerWriter, Polygon,
};
pub use orchestrator::{
    BatchOutcome, BatchReport, CancelFlag, DownloadOrchestrator, FailedTransfer, FileFetcher,
    PolygonizeConfig, ProgressEvent,
};
pub use output::OutputLayout;
pub use planner::{
    ChallengeRequest, DataType, FilterRequest, FixedRequest, MobileRequest, SelectedFile,
    SourceRow,
};
pub use predicate::{Dimension, Field, Predicate};
