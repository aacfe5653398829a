//! Command-line argument parsing for BDC Fetcher
//!
//! This module defines the CLI structure using clap derive macros,
//! providing an interface for fixed, mobile and challenge downloads,
//! vintage discovery, and authentication management.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::planner::{
    ChallengeRequest, FilterRequest, FixedRequest, MobileRequest,
};
use crate::app::GisFormat;

/// BDC Fetcher - Download FCC National Broadband Map data
#[derive(Parser, Debug)]
#[command(
    name = "bdc_fetcher",
    version,
    about = "Download availability and challenge files from the FCC National Broadband Map",
    long_about = "A tool for bulk-downloading FCC Broadband Data Collection files.
Filters the published catalog by provider, state, technology and speed tier,
then downloads the matching files with polite rate limiting."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output directory root (overrides config)
    #[arg(long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download fixed broadband availability files
    Fixed(FixedArgs),

    /// Download mobile coverage files
    Mobile(MobileArgs),

    /// Download challenge data files
    Challenge(ChallengeArgs),

    /// List the as-of dates the map service can serve
    Dates,

    /// Manage authentication credentials
    Auth(AuthArgs),
}

/// Arguments for the fixed broadband download command
#[derive(Args, Debug, Clone)]
pub struct FixedArgs {
    /// Catalog as-of date (YYYY-MM-DD); see the 'dates' command
    #[arg(short, long)]
    pub date: String,

    /// Comma-separated state FIPS codes, or 'all'
    #[arg(short, long, default_value = "all")]
    pub states: String,

    /// Comma-separated technology codes (e.g. 50,71), or 'all'
    #[arg(short, long, default_value = "all")]
    pub technologies: String,

    /// Comma-separated provider IDs, or 'all'
    #[arg(short, long, default_value = "all")]
    pub providers: String,

    /// Convert each downloaded CSV into a GIS layer of hexagon polygons
    #[arg(long)]
    pub polygonize: bool,

    /// GIS layer format for --polygonize output
    #[arg(long, value_name = "FORMAT")]
    pub gis_format: Option<GisFormat>,

    /// Show the planned downloads without downloading
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the mobile coverage download command
#[derive(Args, Debug, Clone)]
pub struct MobileArgs {
    /// Catalog as-of date (YYYY-MM-DD); see the 'dates' command
    #[arg(short, long)]
    pub date: String,

    /// Technology type: 'Mobile Broadband' or 'Mobile Voice'
    #[arg(long, default_value = "Mobile Broadband")]
    pub technology_type: String,

    /// Subcategory: 'Raw Coverage' or 'Hexagon Coverage'
    #[arg(long, default_value = "Hexagon Coverage")]
    pub subcategory: String,

    /// Comma-separated state FIPS codes, or 'all'
    #[arg(short, long, default_value = "all")]
    pub states: String,

    /// Comma-separated technology codes (300, 400, 500), or 'all'
    #[arg(short, long, default_value = "all")]
    pub technologies: String,

    /// Comma-separated provider IDs, or 'all'
    #[arg(short, long, default_value = "all")]
    pub providers: String,

    /// Comma-separated 5G speed tiers (e.g. 35/3,7/1)
    #[arg(long, value_name = "TIERS")]
    pub speed_tiers: Option<String>,

    /// GIS payload format the service should deliver (shp or gpkg)
    #[arg(long, value_name = "FORMAT")]
    pub gis_format: Option<GisFormat>,

    /// Show the planned downloads without downloading
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the challenge data download command
#[derive(Args, Debug, Clone)]
pub struct ChallengeArgs {
    /// Catalog as-of date (YYYY-MM-DD); see the 'dates' command
    #[arg(short, long)]
    pub date: String,

    /// Challenge category label, exactly as published
    #[arg(short, long)]
    pub category: String,

    /// Comma-separated state FIPS codes, or 'all'
    #[arg(short, long, default_value = "all")]
    pub states: String,

    /// Show the planned downloads without downloading
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for authentication management
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthAction,
}

/// Authentication actions
#[derive(Subcommand, Debug)]
pub enum AuthAction {
    /// Set up map API credentials interactively
    Setup,

    /// Verify current credentials against the API
    Verify,

    /// Show authentication status
    Status,

    /// Clear stored credentials
    Clear,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

impl FixedArgs {
    /// Build the filter request this invocation describes
    pub fn to_request(&self) -> FixedRequest {
        FixedRequest {
            as_of_date: self.date.clone(),
            state_fips: FilterRequest::split_dimension_list(&self.states),
            technology_codes: FilterRequest::split_dimension_list(&self.technologies),
            provider_ids: FilterRequest::split_dimension_list(&self.providers),
        }
    }
}

impl MobileArgs {
    /// Build the filter request this invocation describes
    pub fn to_request(&self) -> MobileRequest {
        MobileRequest {
            as_of_date: self.date.clone(),
            technology_type: self.technology_type.clone(),
            subcategory: self.subcategory.clone(),
            state_fips: FilterRequest::split_dimension_list(&self.states),
            technology_codes: FilterRequest::split_dimension_list(&self.technologies),
            provider_ids: FilterRequest::split_dimension_list(&self.providers),
            speed_tiers: self
                .speed_tiers
                .as_deref()
                .map(FilterRequest::split_dimension_list)
                .unwrap_or_default(),
            gis_format: self.gis_format,
        }
    }
}

impl ChallengeArgs {
    /// Build the filter request this invocation describes
    pub fn to_request(&self) -> ChallengeRequest {
        ChallengeRequest {
            as_of_date: self.date.clone(),
            category: self.category.clone(),
            state_fips: FilterRequest::split_dimension_list(&self.states),
        }
    }
}
