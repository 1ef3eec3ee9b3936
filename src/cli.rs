use crate::error::ConfigError;
use crate::request::{GranuleRequest, RequestFile};
use clap::Parser;
use std::path::PathBuf;

/// Mirror MODIS granules from the LP DAAC, NSIDC or LAADS archives into a local directory.
#[derive(Parser, Debug)]
#[command(name = "granule-sync")]
#[command(version)]
pub struct Cli {
    /// Earthdata login
    #[arg(short = 'u', long, env = "GRANULE_SYNC_USERNAME")]
    pub username: Option<String>,

    /// Earthdata password
    #[arg(short = 'P', long, env = "GRANULE_SYNC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// MOLA, MOLT, MOTA, MOST, MOSA or LAADS
    #[arg(short = 's', long)]
    pub platform: Option<String>,

    /// Product with collection, e.g. MOD09GA.005
    #[arg(short = 'p', long)]
    pub product: Option<String>,

    /// Sinusoidal grid tile, e.g. h17v04
    #[arg(short = 't', long)]
    pub tile: Option<String>,

    /// Area of interest instead of a tile: upper left and lower right corners as lat,lon,lat,lon
    #[arg(short = 'c', long, allow_hyphen_values = true)]
    pub coordinates: Option<String>,

    #[arg(short = 'y', long)]
    pub year: Option<i32>,

    /// First day of year (default 1)
    #[arg(short = 'b', long)]
    pub begin: Option<u32>,

    /// Last day of year (default: end of year)
    #[arg(short = 'e', long)]
    pub end: Option<u32>,

    /// Output directory [default: .]
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// HTTP(S) proxy used for every request
    #[arg(short = 'r', long)]
    pub proxy: Option<String>,

    /// Override the archive root URL of the platform
    #[arg(long)]
    pub base_url: Option<String>,

    /// Treat any local file with the right name as complete, without checking its size
    #[arg(short = 'q', long)]
    pub quick: bool,

    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// TOML request file. Command line options take precedence
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// List and decide, but do not download anything
    #[arg(long)]
    pub dry_run: bool,

    /// Write every decision and its outcome to this JSON file
    #[arg(long)]
    pub plan: Option<PathBuf>,
}

impl Cli {
    /// Options given on the command line, as a request file layer.
    fn as_request_file(self: &Self) -> RequestFile {
        RequestFile {
            username: self.username.clone(),
            password: self.password.clone(),
            platform: self.platform.clone(),
            product: self.product.clone(),
            tile: self.tile.clone(),
            coordinates: self.coordinates.clone(),
            year: self.year,
            begin: self.begin,
            end: self.end,
            output: self.output.clone(),
            proxy: self.proxy.clone(),
            base_url: self.base_url.clone(),
            // An absent flag must not override `quick = true` from the file.
            quick: self.quick.then_some(true),
        }
    }

    pub fn into_request(self: &Self) -> Result<GranuleRequest, ConfigError> {
        let file = match &self.config {
            Some(path) => RequestFile::read(path)?,
            None => RequestFile::default(),
        };
        file.overlay(self.as_request_file())
            .into_request(self.dry_run, self.plan.clone())
    }
}
