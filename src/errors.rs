//! Error types for BDC Fetcher
//!
//! Errors are split by domain and unified under [`AppError`]. The split
//! mirrors how callers must react: request errors are user-correctable and
//! abort before any download starts, source errors are transport problems
//! left for the caller to retry manually, and transfer errors are recorded
//! per file without aborting the rest of a batch.

use std::path::PathBuf;
use thiserror::Error;

/// Structurally invalid or contradictory filter requests.
///
/// None of these are retried; the batch never starts and the message is
/// surfaced to the user so they can adjust the request.
#[derive(Error, Debug)]
pub enum RequestError {
    /// Malformed request: unknown enum value, unset required flag, or a
    /// combination the kind forbids
    #[error("Invalid request: {message}")]
    Invalid { message: String },

    /// A required filter dimension's list was empty
    #[error("No {dimension} list provided. Pass at least one value, or 'all' for no restriction")]
    MissingDimension { dimension: &'static str },

    /// Mutually exclusive selections, e.g. 'all' mixed with explicit
    /// technology codes for a kind that forbids it
    #[error("Conflicting filter: {message}")]
    ConflictingFilter { message: String },

    /// The remote catalog itself had no rows for the requested date
    #[error("No reference data found for as-of date {as_of_date}. Check the date against 'bdc_fetcher dates'")]
    EmptyCatalog { as_of_date: String },

    /// A syntactically valid request narrowed the catalog to zero rows.
    /// The applied filter expression is echoed so the user can adjust it.
    #[error("No files matched the applied filter: {filter}")]
    EmptyReference { filter: String },
}

impl RequestError {
    /// Convenience constructor for [`RequestError::Invalid`]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Convenience constructor for [`RequestError::ConflictingFilter`]
    pub fn conflicting(message: impl Into<String>) -> Self {
        Self::ConflictingFilter {
            message: message.into(),
        }
    }
}

/// Transport or authorization failures talking to the map API.
///
/// The core never retries these automatically; retry is a caller decision.
#[derive(Error, Debug)]
pub enum SourceError {
    /// HTTP request failed before a status was received
    #[error("Request to the map API failed")]
    Http(#[from] reqwest::Error),

    /// The service rejected our credentials
    #[error("Map API returned 401 Unauthorized. Check BDC_USERNAME and BDC_HASH_VALUE, or run 'bdc_fetcher auth setup'")]
    Unauthorized,

    /// Client-side error status other than 401
    #[error("Map API rejected the request: HTTP {status}")]
    Rejected { status: u16 },

    /// Server-side error status
    #[error("Map API unavailable: HTTP {status}")]
    Unavailable { status: u16 },

    /// Listing payload did not parse as the expected JSON shape
    #[error("Unexpected listing payload from the map API")]
    InvalidPayload(#[from] serde_json::Error),

    /// Invalid URL construction
    #[error("Invalid map API URL: {url}")]
    InvalidUrl { url: String },
}

/// A single file download failed after the catalog narrowed successfully.
///
/// The orchestrator records these and continues with the remaining batch.
#[derive(Error, Debug)]
pub enum TransferError {
    /// HTTP failure mid-transfer
    #[error("File transfer failed")]
    Http(#[from] reqwest::Error),

    /// Non-success status for an individual file
    #[error("File transfer rejected: HTTP {status} for file {file_id}")]
    Status { status: u16, file_id: String },

    /// Writing the downloaded payload to disk failed
    #[error("Failed to persist downloaded file to {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures decoding a downloaded coverage payload or writing a GIS layer
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The downloaded archive was not a readable ZIP
    #[error("Downloaded archive is not readable: {path}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// CSV decoding of the archived payload failed
    #[error("Failed to decode coverage CSV from {path}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The payload has no hexagon cell column
    #[error("Coverage payload has no '{column}' column: {path}")]
    MissingCellColumn { column: &'static str, path: PathBuf },

    /// The geometry collaborator could not resolve a cell token
    #[error("Cannot resolve hexagon cell '{token}' to a boundary: {reason}")]
    Geometry { token: String, reason: String },

    /// The GIS writer collaborator failed
    #[error("Failed to write GIS layer {layer}: {reason}")]
    LayerWrite { layer: String, reason: String },

    /// I/O error reading the archive
    #[error("I/O error reading archive")]
    Io(#[from] std::io::Error),
}

/// Credential loading and storage errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Missing environment variables for credentials
    #[error("Missing BDC credentials. Set BDC_USERNAME and BDC_HASH_VALUE or run 'bdc_fetcher auth setup'")]
    MissingCredentials,

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// File I/O error during credential storage
    #[error("Failed to save credentials to file")]
    CredentialStorage(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// I/O error reading configuration
    #[error("I/O error reading configuration")]
    Io(#[from] std::io::Error),
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Filter request error
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Map API transport error
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Individual file transfer error
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// GIS conversion error
    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// Credential error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Request(_) => "request",
            AppError::Source(_) => "source",
            AppError::Transfer(_) => "transfer",
            AppError::Convert(_) => "convert",
            AppError::Auth(_) => "auth",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }

    /// True when the user can fix the condition by changing the request
    /// (as opposed to a transport problem or a bug)
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, AppError::Request(_))
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Request-planning result type alias
pub type RequestResult<T> = std::result::Result<T, RequestError>;

/// Map API transport result type alias
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// File transfer result type alias
pub type TransferResult<T> = std::result::Result<T, TransferError>;

/// GIS conversion result type alias
pub type ConvertResult<T> = std::result::Result<T, ConvertError>;

/// Credential result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;
