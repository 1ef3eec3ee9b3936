use crate::error::ListingError;
use crate::footprint::parse_footprint;
use crate::granule::matches_request;
use crate::http::{ArchiveOps, Page};
use crate::planner::RemoteEntry;
use crate::request::{BoundingBox, GranuleRequest, Provider};
use chrono::{Datelike, NaiveDate};
use futures_util::{stream, Stream, StreamExt};
use tracing::{debug, warn};
use url::Url;

pub mod laads;
pub mod nsidc;
pub mod usgs;

pub use laads::LaadsParser;
pub use nsidc::NsidcParser;
pub use usgs::UsgsParser;

/// A date subdirectory of the archive. `label` is the directory name as published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateDir {
    pub doy: u32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub name: String,
    /// Exact byte count, when the page states one.
    pub size: Option<u64>,
}

/// URL layout and page markup of one provider.
pub trait ListingParser {
    /// The page that enumerates date directories.
    fn index_url(&self, request: &GranuleRequest) -> Url;

    fn date_url(&self, request: &GranuleRequest, date: &DateDir) -> Url;

    fn file_url(&self, request: &GranuleRequest, date: &DateDir, filename: &str) -> Url;

    /// Date directories belonging to `year`. Other entries are ignored.
    fn parse_dates(&self, page: &Page, year: i32) -> Result<Vec<DateDir>, ListingError>;

    fn parse_files(&self, page: &Page) -> Result<Vec<ListedFile>, ListingError>;
}

pub fn parser_for(provider: Provider) -> Box<dyn ListingParser> {
    match provider {
        Provider::Usgs => Box::new(UsgsParser),
        Provider::Nsidc => Box::new(NsidcParser),
        Provider::Laads => Box::new(LaadsParser),
    }
}

/// Append path segments to `base`, optionally ending the path with `/`.
pub(crate) fn join_url(base: &Url, segments: &[&str], trailing_slash: bool) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
        if trailing_slash {
            path.push("");
        }
    }
    url
}

/// `{base}/{platform}/{product}/`, the layout shared by the USGS and NSIDC data pools.
pub(crate) fn product_dir_url(request: &GranuleRequest) -> Url {
    join_url(
        &request.base_url,
        &[request.platform.code(), request.product.to_string().as_str()],
        true,
    )
}

/// Parse a `YYYY.MM.DD` directory name, keeping it only when it falls in `year`.
pub(crate) fn dotted_date(label: &str, year: i32) -> Option<DateDir> {
    let label = label.trim_end_matches('/');
    let date = NaiveDate::parse_from_str(label, "%Y.%m.%d").ok()?;
    if date.year() != year {
        return None;
    }
    Some(DateDir {
        doy: date.ordinal(),
        label: label.to_string(),
    })
}

/// Apache indexes print either an exact byte count or an abbreviation like `82M`.
pub(crate) fn exact_size(text: &str) -> Option<u64> {
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// The listing of one date directory, or why it could not be listed.
#[derive(Debug)]
pub struct DateListing {
    pub date: DateDir,
    pub result: Result<Vec<RemoteEntry>, ListingError>,
}

pub struct RemoteLister<'a, A: ArchiveOps> {
    ops: &'a A,
    request: &'a GranuleRequest,
    parser: Box<dyn ListingParser>,
}

impl<'a, A: ArchiveOps> RemoteLister<'a, A> {
    pub fn new(ops: &'a A, request: &'a GranuleRequest) -> Self {
        Self {
            ops,
            request,
            parser: parser_for(request.provider()),
        }
    }

    /// Date directories inside the requested day range, ascending.
    pub async fn dates(&self) -> Result<Vec<DateDir>, ListingError> {
        let url = self.parser.index_url(self.request);
        let page = self.ops.get_page(&url).await?;

        let mut dates: Vec<DateDir> = self
            .parser
            .parse_dates(&page, self.request.year)?
            .into_iter()
            .filter(|d| self.request.doys.contains(d.doy))
            .collect();
        dates.sort_by_key(|d| d.doy);
        dates.dedup_by_key(|d| d.doy);

        debug!("{} date directories selected from {}", dates.len(), url);
        Ok(dates)
    }

    /// Granules of the requested product in one date directory.
    pub async fn list_date(&self, date: &DateDir) -> Result<Vec<RemoteEntry>, ListingError> {
        let url = self.parser.date_url(self.request, date);
        let page = self.ops.get_page(&url).await?;

        let entries: Vec<RemoteEntry> = self
            .parser
            .parse_files(&page)?
            .into_iter()
            .filter(|f| matches_request(&f.name, self.request))
            .map(|f| RemoteEntry {
                doy: date.doy,
                url: self.parser.file_url(self.request, date, &f.name),
                filename: f.name,
                size: f.size,
            })
            .collect();

        let entries = match (&self.request.tile, &self.request.bbox) {
            (None, Some(bbox)) => self.within_area(date, bbox, entries).await?,
            _ => entries,
        };

        debug!("{} matching granules in {}", entries.len(), url);
        Ok(entries)
    }

    /// Keep the granules whose footprint, read from their `.xml` companion, meets
    /// the requested area. A granule whose metadata cannot be read is left out.
    async fn within_area(
        &self,
        date: &DateDir,
        bbox: &BoundingBox,
        entries: Vec<RemoteEntry>,
    ) -> Result<Vec<RemoteEntry>, ListingError> {
        let mut kept = vec![];
        for entry in entries {
            let url = self
                .parser
                .file_url(self.request, date, &format!("{}.xml", entry.filename));
            let page = match self.ops.get_page(&url).await {
                Ok(page) => page,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!("No metadata for {}: {}", entry.filename, err);
                    continue;
                }
            };
            match parse_footprint(&page.body) {
                Ok(points) if bbox.intersects_footprint(&points) => kept.push(entry),
                Ok(_) => debug!("{} is outside the requested area", entry.filename),
                Err(err) => warn!("Unreadable metadata for {}: {}", entry.filename, err),
            }
        }
        Ok(kept)
    }

    /// Lazily list each date in turn; a page is only requested when the stream is polled.
    pub fn entries(&'a self, dates: Vec<DateDir>) -> impl Stream<Item = DateListing> + 'a {
        stream::iter(dates).then(move |date| async move {
            let result = self.list_date(&date).await;
            DateListing { date, result }
        })
    }
}
