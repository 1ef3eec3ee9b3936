use super::{join_url, DateDir, ListedFile, ListingParser};
use crate::error::ListingError;
use crate::http::Page;
use crate::request::{days_in_year, GranuleRequest};
use serde::Deserialize;
use url::Url;

/// The LAADS DAAC archive. Every directory is also published as `<dir>.json`,
/// and day directories are named by zero-padded day of year.
pub struct LaadsParser;

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum Listing {
    Wrapped { content: Vec<Item> },
    Bare(Vec<Item>),
}

#[derive(Deserialize, Debug)]
struct Item {
    name: String,
    #[serde(default)]
    size: Option<Size>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum Size {
    Bytes(u64),
    Text(String),
}

impl Size {
    fn bytes(&self) -> Option<u64> {
        match self {
            Size::Bytes(n) => Some(*n),
            Size::Text(s) => s.trim().parse().ok(),
        }
    }
}

fn items(page: &Page) -> Result<Vec<Item>, ListingError> {
    let listing: Listing = serde_json::from_str(&page.body)
        .map_err(|e| ListingError::parse(&page.url, e.to_string()))?;
    Ok(match listing {
        Listing::Wrapped { content } => content,
        Listing::Bare(items) => items,
    })
}

fn year_dir(request: &GranuleRequest) -> Url {
    join_url(
        &request.base_url,
        &[
            request.product.collection_number().to_string().as_str(),
            request.product.short_name(),
            request.year.to_string().as_str(),
        ],
        false,
    )
}

impl ListingParser for LaadsParser {
    fn index_url(&self, request: &GranuleRequest) -> Url {
        let mut url = year_dir(request);
        let path = format!("{}.json", url.path());
        url.set_path(&path);
        url
    }

    fn date_url(&self, request: &GranuleRequest, date: &DateDir) -> Url {
        join_url(&year_dir(request), &[format!("{}.json", date.label).as_str()], false)
    }

    fn file_url(&self, request: &GranuleRequest, date: &DateDir, filename: &str) -> Url {
        join_url(&year_dir(request), &[date.label.as_str(), filename], false)
    }

    fn parse_dates(&self, page: &Page, year: i32) -> Result<Vec<DateDir>, ListingError> {
        let last = days_in_year(year);
        Ok(items(page)?
            .into_iter()
            .filter(|item| item.name.len() == 3)
            .filter_map(|item| {
                let doy: u32 = item.name.parse().ok()?;
                (1..=last).contains(&doy).then(|| DateDir {
                    doy,
                    label: item.name,
                })
            })
            .collect())
    }

    fn parse_files(&self, page: &Page) -> Result<Vec<ListedFile>, ListingError> {
        Ok(items(page)?
            .into_iter()
            .map(|item| ListedFile {
                size: item.size.as_ref().and_then(Size::bytes),
                name: item.name,
            })
            .collect())
    }
}
