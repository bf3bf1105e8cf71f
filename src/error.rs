//! The `error` module creates a library-specific Error type `GeocoderError`, and an alias for
//! Result using the `GeocoderError`, called `GeocoderResult`.
use thiserror::Error;

/// The `GeocoderError` enum represents the library-specific Error type.
#[derive(Error, Debug)]
pub enum GeocoderError {
    /// A `MissingData` error indicates an expected input file or directory is absent, with a hint
    /// naming the pipeline step to run first.
    #[error("Missing data: {0}.")]
    MissingData(String),
    /// An `EmptyBuild` error indicates ingestion produced no records; no database is written.
    #[error("No records aggregated, refusing to write an empty database.")]
    EmptyBuild,
    /// A `BadStatus` error indicates a remote fetch returned a non-success HTTP status.
    #[error("Remote fetch of {url} failed with status {status}.")]
    BadStatus {
        /// The requested URL.
        url: String,
        /// The HTTP status code returned by the server.
        status: u16,
    },
    /// A `Corrupt` error indicates a database file does not conform to its record layout.
    #[error("Corrupt database file {path}: {reason}.")]
    Corrupt {
        /// The offending file.
        path: std::path::PathBuf,
        /// What failed to line up.
        reason: String,
    },
    /// Error conversion type for [`reqwest::Error`].
    #[error("Transport error reaching the BAN address website.")]
    Fetch(#[from] reqwest::Error),
    /// Error conversion type for [`csv::Error`].
    #[error("Malformed CSV input.")]
    Csv(#[from] csv::Error),
    /// Error conversion type for [`std::io::Error`].
    #[error("Input/output error from std.")]
    Io(#[from] std::io::Error),
    /// Error conversion type for [`std::env::VarError`].
    #[error("Could not read environment variables.")]
    EnvError(#[from] std::env::VarError),
}

/// Alias for the Result type using the local Error type.
pub type GeocoderResult<T> = Result<T, GeocoderError>;
