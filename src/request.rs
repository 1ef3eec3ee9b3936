use crate::error::ConfigError;
use crate::planner::SyncPolicy;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Mola,
    Molt,
    Mota,
    Most,
    Mosa,
    Laads,
}

impl Platform {
    pub fn provider(&self) -> Provider {
        match self {
            Self::Mola | Self::Molt | Self::Mota => Provider::Usgs,
            Self::Most | Self::Mosa => Provider::Nsidc,
            Self::Laads => Provider::Laads,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Mola => "MOLA",
            Self::Molt => "MOLT",
            Self::Mota => "MOTA",
            Self::Most => "MOST",
            Self::Mosa => "MOSA",
            Self::Laads => "LAADS",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MOLA" => Ok(Self::Mola),
            "MOLT" => Ok(Self::Molt),
            "MOTA" => Ok(Self::Mota),
            "MOST" => Ok(Self::Most),
            "MOSA" => Ok(Self::Mosa),
            "LAADS" => Ok(Self::Laads),
            _ => Err(ConfigError::UnknownPlatform(s.to_string())),
        }
    }
}

/// The archive hosting a platform. Determines URL layout and listing markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Usgs,
    Nsidc,
    Laads,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Usgs => "https://e4ftl01.cr.usgs.gov",
            Self::Nsidc => "https://n5eil01u.ecs.nsidc.org",
            Self::Laads => "https://ladsweb.modaps.eosdis.nasa.gov/archive/allData",
        }
    }

    /// USGS and NSIDC only publish gridded products, so a tile (or an area) is mandatory there.
    pub fn requires_tile(&self) -> bool {
        !matches!(self, Self::Laads)
    }

    /// Whether every granule has an ECS `.hdf.xml` companion describing its footprint.
    pub fn has_granule_metadata(&self) -> bool {
        !matches!(self, Self::Laads)
    }
}

/// A product name with its collection tag, e.g. `MOD09GA.005`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Product {
    short_name: String,
    collection: String,
    collection_number: u32,
}

impl Product {
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// LAADS names its collection directories without the leading zeros (`006` -> `6`).
    pub fn collection_number(&self) -> u32 {
        self.collection_number
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.short_name, self.collection)
    }
}

impl FromStr for Product {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ConfigError::MalformedProduct(s.to_string());
        let (short_name, collection) = s.trim().split_once('.').ok_or_else(malformed)?;

        let valid_short = !short_name.is_empty()
            && short_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        let valid_collection =
            !collection.is_empty() && collection.chars().all(|c| c.is_ascii_digit());
        if !valid_short || !valid_collection {
            return Err(malformed());
        }
        let collection_number = collection.parse().map_err(|_| malformed())?;

        Ok(Self {
            short_name: short_name.to_ascii_uppercase(),
            collection: collection.to_string(),
            collection_number,
        })
    }
}

/// Inclusive day-of-year range within a single year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoyRange {
    pub begin: u32,
    pub end: u32,
}

impl DoyRange {
    pub fn new(year: i32, begin: Option<u32>, end: Option<u32>) -> Result<Self, ConfigError> {
        let last = days_in_year(year);
        let begin = begin.unwrap_or(1);
        let end = end.unwrap_or(last);
        if begin < 1 || end > last || begin > end {
            return Err(ConfigError::InvalidDoyRange { begin, end, year });
        }
        Ok(Self { begin, end })
    }

    pub fn contains(&self, doy: u32) -> bool {
        (self.begin..=self.end).contains(&doy)
    }
}

pub fn days_in_year(year: i32) -> u32 {
    match NaiveDate::from_yo_opt(year, 366) {
        Some(_) => 366,
        None => 365,
    }
}

/// Area of interest given by its upper left and lower right corners, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub west: f64,
    pub south: f64,
    pub east: f64,
}

impl FromStr for BoundingBox {
    type Err = ConfigError;

    /// `lat,lon,lat,lon`: upper left corner, then lower right corner.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ConfigError::MalformedCoordinates(s.to_string()))?;
        let [north, west, south, east] = values[..] else {
            return Err(ConfigError::MalformedCoordinates(s.to_string()));
        };
        let in_range = |lat: f64, lon: f64| (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon);
        if !in_range(north, west) || !in_range(south, east) {
            return Err(ConfigError::MalformedCoordinates(s.to_string()));
        }
        if east <= west || north <= south {
            return Err(ConfigError::InvertedCoordinates(s.to_string()));
        }
        Ok(Self {
            north,
            west,
            south,
            east,
        })
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything a run needs, validated once before any component touches the network.
#[derive(Debug, Clone)]
pub struct GranuleRequest {
    pub platform: Platform,
    pub product: Product,
    pub tile: Option<String>,
    /// Only used when no tile is given.
    pub bbox: Option<BoundingBox>,
    pub year: i32,
    pub doys: DoyRange,
    pub output_dir: PathBuf,
    pub policy: SyncPolicy,
    pub credentials: Option<Credentials>,
    pub proxy: Option<Url>,
    pub base_url: Url,
    pub dry_run: bool,
    pub plan_path: Option<PathBuf>,
}

impl GranuleRequest {
    pub fn provider(&self) -> Provider {
        self.platform.provider()
    }
}

/// Optional request file. Every field may also be given on the command line, which wins.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RequestFile {
    pub username: Option<String>,
    pub password: Option<String>,
    pub platform: Option<String>,
    pub product: Option<String>,
    pub tile: Option<String>,
    pub coordinates: Option<String>,
    pub year: Option<i32>,
    pub begin: Option<u32>,
    pub end: Option<u32>,
    pub output: Option<PathBuf>,
    pub proxy: Option<String>,
    pub base_url: Option<String>,
    pub quick: Option<bool>,
}

impl RequestFile {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::ReadFile(path.to_owned(), e))?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFile(path.to_owned(), e))
    }

    /// Fields set in `other` replace ours.
    pub fn overlay(self, other: RequestFile) -> Self {
        Self {
            username: other.username.or(self.username),
            password: other.password.or(self.password),
            platform: other.platform.or(self.platform),
            product: other.product.or(self.product),
            tile: other.tile.or(self.tile),
            coordinates: other.coordinates.or(self.coordinates),
            year: other.year.or(self.year),
            begin: other.begin.or(self.begin),
            end: other.end.or(self.end),
            output: other.output.or(self.output),
            proxy: other.proxy.or(self.proxy),
            base_url: other.base_url.or(self.base_url),
            quick: other.quick.or(self.quick),
        }
    }

    pub fn into_request(
        self,
        dry_run: bool,
        plan_path: Option<PathBuf>,
    ) -> Result<GranuleRequest, ConfigError> {
        let platform: Platform = self
            .platform
            .ok_or(ConfigError::Missing("platform"))?
            .parse()?;
        let product: Product = self
            .product
            .ok_or(ConfigError::Missing("product"))?
            .parse()?;
        let year = self.year.ok_or(ConfigError::Missing("year"))?;
        if !(1999..=9999).contains(&year) {
            return Err(ConfigError::InvalidYear(year));
        }
        let doys = DoyRange::new(year, self.begin, self.end)?;

        let tile = self.tile.map(|t| t.trim().to_ascii_lowercase());
        let bbox: Option<BoundingBox> = self.coordinates.as_deref().map(str::parse).transpose()?;
        if bbox.is_some() && !platform.provider().has_granule_metadata() {
            return Err(ConfigError::CoordinatesUnsupported(platform.to_string()));
        }
        match &tile {
            Some(t) if !is_valid_tile(t) => return Err(ConfigError::InvalidTile(t.clone())),
            None if bbox.is_none() && platform.provider().requires_tile() => {
                return Err(ConfigError::MissingTile(platform.to_string()))
            }
            _ => {}
        }

        let credentials = match (self.username, self.password) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (Some(_), None) => return Err(ConfigError::Missing("password")),
            (None, Some(_)) => return Err(ConfigError::Missing("username")),
            (None, None) => None,
        };

        let proxy = self.proxy.as_deref().map(parse_url).transpose()?;
        let base_url = parse_url(
            self.base_url
                .as_deref()
                .unwrap_or(platform.provider().default_base_url()),
        )?;

        let policy = if self.quick.unwrap_or(false) {
            SyncPolicy::PresenceOnly
        } else {
            SyncPolicy::Verified
        };

        Ok(GranuleRequest {
            platform,
            product,
            tile,
            bbox,
            year,
            doys,
            output_dir: self.output.unwrap_or_else(|| PathBuf::from(".")),
            policy,
            credentials,
            proxy,
            base_url,
            dry_run,
            plan_path,
        })
    }
}

fn parse_url(s: &str) -> Result<Url, ConfigError> {
    Url::parse(s.trim_end_matches('/')).map_err(|e| ConfigError::InvalidUrl(s.to_string(), e.to_string()))
}

fn is_valid_tile(tile: &str) -> bool {
    let bytes = tile.as_bytes();
    bytes.len() == 6
        && bytes[0] == b'h'
        && bytes[3] == b'v'
        && bytes[1..3].iter().all(u8::is_ascii_digit)
        && bytes[4..6].iter().all(u8::is_ascii_digit)
}
