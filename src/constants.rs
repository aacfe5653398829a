//! Application constants for BDC Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names for authentication and service location
pub mod env {
    /// Environment variable name for the BDC map API username
    pub const USERNAME: &str = "BDC_USERNAME";

    /// Environment variable name for the BDC map API hash value
    pub const HASH_VALUE: &str = "BDC_HASH_VALUE";

    /// Environment variable overriding the map API base URL
    pub const BASE_URL: &str = "BDC_BASE_URL";
}

/// BDC map API endpoints
pub mod api {
    /// Default base URL for the public map API
    pub const DEFAULT_BASE_URL: &str = "https://broadbandmap.fcc.gov";

    /// Lists the as-of dates a catalog can be fetched for
    pub const LIST_AS_OF_DATES: &str = "/api/public/map/listAsOfDates";

    /// Availability reference-catalog listing, suffixed with `/{as_of_date}`
    pub const LIST_AVAILABILITY_DATA: &str = "/api/public/map/downloads/listAvailabilityData";

    /// Challenge reference listing, suffixed with `/{as_of_date}`
    pub const LIST_CHALLENGE_DATA: &str = "/api/public/map/downloads/listChallengeData";

    /// File download, suffixed with `/{data_type}/{file_id}[/{gis_code}]`
    pub const DOWNLOAD_FILE: &str = "/api/public/map/downloads/downloadFile";

    /// Path code the download endpoint uses for shapefile output
    pub const GIS_CODE_SHP: &str = "1";

    /// Path code the download endpoint uses for GeoPackage output
    pub const GIS_CODE_GPKG: &str = "2";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "BDC-Fetcher/0.1.0 (Broadband Data Tool)";

    /// Default HTTP request timeout (coverage archives can be large)
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 4;

    /// Header name carrying the account username
    pub const HEADER_USERNAME: &str = "username";

    /// Header name carrying the account hash value
    pub const HEADER_HASH_VALUE: &str = "hash_value";
}

/// Rate limiting configuration
pub mod limits {
    /// Default rate limit for map API requests (requests per second).
    /// Downloads are sequential by design, so this only smooths
    /// listing bursts against a rate-sensitive service.
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 2;
}

/// Catalog column values and filter vocabulary
pub mod catalog {
    /// Case-insensitive sentinel meaning "no restriction on this dimension"
    pub const ALL_SENTINEL: &str = "all";

    /// Technology code for 3G mobile broadband
    pub const TECH_3G: &str = "300";

    /// Technology code for LTE mobile broadband
    pub const TECH_LTE: &str = "400";

    /// Technology code for 5G-NR mobile broadband
    pub const TECH_5G: &str = "500";

    /// Technology code for mobile voice
    pub const TECH_VOICE: &str = "999";

    /// 5G speed tiers the service publishes
    pub const FIVE_G_SPEED_TIERS: [&str; 2] = ["35/3", "7/1"];

    /// Challenge category labels the service accepts, byte-for-byte
    /// (the unspaced cumulative label is what the API expects)
    pub const CHALLENGE_CATEGORIES: [&str; 7] = [
        "Fabric Challenge - In Progress",
        "Fabric Challenge - Resolved",
        "FixedChallenge - Cumulative",
        "Fixed Challenge - In Progress",
        "Fixed Challenge - Resolved",
        "Mobile Challenge - In Progress",
        "Mobile Challenge - Resolved",
    ];
}

/// Output directory layout
pub mod output {
    /// Directory name under the output root for CSV/ZIP downloads
    pub const CSV_DIR: &str = "csv";

    /// Directory name under the output root for shapefile output
    pub const SHP_DIR: &str = "shp";

    /// Directory name under the output root for GeoPackage output
    pub const GPKG_DIR: &str = "gpkg";

    /// Relative path of the output root under the base directory
    pub const OUTPUT_ROOT: &str = "data/output";
}

/// Coverage payload decoding constants
pub mod payload {
    /// Column in downloaded hexagon coverage CSVs carrying the H3
    /// resolution-8 cell identifier
    pub const HEX_CELL_COLUMN: &str = "h3_res8_id";
}

/// Credential storage constants
pub mod auth {
    /// Owner-only permissions applied to the .env credential file
    pub const ENV_FILE_PERMISSIONS: u32 = 0o600;

    /// Path of the credential file, relative to the working directory
    pub const ENV_FILE: &str = ".env";
}

// Re-export commonly used constants for convenience
pub use api::DEFAULT_BASE_URL;
pub use catalog::ALL_SENTINEL;
pub use env::{HASH_VALUE as ENV_HASH_VALUE, USERNAME as ENV_USERNAME};
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use limits::DEFAULT_RATE_LIMIT_RPS;
