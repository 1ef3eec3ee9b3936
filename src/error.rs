use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required option: {0}")]
    Missing(&'static str),
    #[error("Unknown platform '{0}', expected one of MOLA, MOLT, MOTA, MOST, MOSA, LAADS")]
    UnknownPlatform(String),
    #[error("Product '{0}' must look like NAME.COLLECTION (e.g. MOD09GA.005)")]
    MalformedProduct(String),
    #[error("Invalid year: {0}")]
    InvalidYear(i32),
    #[error("Invalid day-of-year range {begin}..={end} for year {year}")]
    InvalidDoyRange { begin: u32, end: u32, year: i32 },
    #[error("A tile or coordinates are required for platform {0}")]
    MissingTile(String),
    #[error("Coordinates '{0}' must look like lat,lon,lat,lon (upper left, lower right)")]
    MalformedCoordinates(String),
    #[error("Coordinates '{0}' seem inverted: expected upper left then lower right")]
    InvertedCoordinates(String),
    #[error("Coordinate selection is not available for platform {0}")]
    CoordinatesUnsupported(String),
    #[error("Invalid tile '{0}', expected something like h17v04")]
    InvalidTile(String),
    #[error("Invalid URL '{0}': {1}")]
    InvalidUrl(String, String),
    #[error("Unable to build HTTP client: {0}")]
    HttpClient(String),
    #[error("Unable to read config file {0:?}: {1}")]
    ReadFile(PathBuf, std::io::Error),
    #[error("Unable to parse config file {0:?}: {1}")]
    ParseFile(PathBuf, toml::de::Error),
}

#[derive(Error, Debug)]
pub enum ListingError {
    #[error("Authentication rejected for {0}")]
    Unauthorized(String),
    #[error("Unable to fetch listing {url}: {reason}")]
    Network { url: String, reason: String },
    #[error("Unexpected listing page {url}: {reason}")]
    Parse { url: String, reason: String },
}

impl ListingError {
    pub fn parse(url: &str, reason: impl Into<String>) -> Self {
        ListingError::Parse {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ListingError::Unauthorized(_))
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Authentication rejected for {0}")]
    Unauthorized(String),
    #[error("Server answered {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("Transfer of {url} failed: {reason}")]
    Network { url: String, reason: String },
    #[error("Unable to write {0:?}: {1}")]
    Io(PathBuf, std::io::Error),
}
