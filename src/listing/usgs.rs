use super::{dotted_date, exact_size, join_url, product_dir_url, DateDir, ListedFile, ListingParser};
use crate::error::ListingError;
use crate::http::Page;
use crate::request::GranuleRequest;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

/// The LP DAAC data pool (e4ftl01): Apache `<pre>` indexes with `[DIR]` icons,
/// one entry per line followed by its modification time and size.
pub struct UsgsParser;

struct Anchor {
    href: String,
    is_dir: bool,
    trailing: String,
}

fn modified_and_size() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}(?::\d{2})?\s+(?<size>\S+)")
            .expect("Regex pattern should always compile")
    })
}

/// The icon in front of an entry says whether it is a directory.
fn has_dir_icon(anchor: &ElementRef<'_>) -> bool {
    anchor
        .prev_siblings()
        .find_map(ElementRef::wrap)
        .is_some_and(|el| el.value().name() == "img" && el.value().attr("alt") == Some("[DIR]"))
}

/// Text between this anchor and the next element: `2008-05-29 16:36  86015839`.
fn trailing_text(anchor: &ElementRef<'_>) -> String {
    anchor
        .next_sibling()
        .and_then(|node| node.value().as_text().map(|t| String::from(&**t)))
        .unwrap_or_default()
}

fn anchors(page: &Page) -> Result<Vec<Anchor>, ListingError> {
    let document = Html::parse_document(&page.body);
    let links = Selector::parse("a[href]").expect("Selector should always parse");

    let mut found_links = false;
    let mut anchors = vec![];
    for anchor in document.select(&links) {
        found_links = true;
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if href.starts_with('?') || href.starts_with('/') || href.contains("://") {
            continue;
        }
        anchors.push(Anchor {
            href: href.to_string(),
            is_dir: has_dir_icon(&anchor) || href.ends_with('/'),
            trailing: trailing_text(&anchor),
        });
    }

    if !found_links {
        return Err(ListingError::parse(&page.url, "no links in directory index"));
    }
    Ok(anchors)
}

impl ListingParser for UsgsParser {
    fn index_url(&self, request: &GranuleRequest) -> Url {
        product_dir_url(request)
    }

    fn date_url(&self, request: &GranuleRequest, date: &DateDir) -> Url {
        join_url(&product_dir_url(request), &[date.label.as_str()], true)
    }

    fn file_url(&self, request: &GranuleRequest, date: &DateDir, filename: &str) -> Url {
        join_url(&product_dir_url(request), &[date.label.as_str(), filename], false)
    }

    fn parse_dates(&self, page: &Page, year: i32) -> Result<Vec<DateDir>, ListingError> {
        Ok(anchors(page)?
            .into_iter()
            .filter(|a| a.is_dir)
            .filter_map(|a| dotted_date(&a.href, year))
            .collect())
    }

    fn parse_files(&self, page: &Page) -> Result<Vec<ListedFile>, ListingError> {
        Ok(anchors(page)?
            .into_iter()
            .filter(|a| !a.is_dir)
            .map(|a| ListedFile {
                size: modified_and_size()
                    .captures(&a.trailing)
                    .and_then(|c| exact_size(&c["size"])),
                name: a.href,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"<html><head><title>Index of /MOLT/MOD09GA.005</title></head><body>
<h1>Index of /MOLT/MOD09GA.005</h1>
<pre><img src="/icons/blank.gif" alt="Icon "> <a href="?C=N;O=D">Name</a>                    <a href="?C=M;O=A">Last modified</a>      <a href="?C=S;O=A">Size</a><hr><img src="/icons/back.gif" alt="[PARENTDIR]"> <a href="/MOLT/">Parent Directory</a>                             -
<img src="/icons/folder.gif" alt="[DIR]"> <a href="2003.12.31/">2003.12.31/</a>             2008-05-29 16:36    -
<img src="/icons/folder.gif" alt="[DIR]"> <a href="2004.04.09/">2004.04.09/</a>             2008-05-29 16:36    -
<img src="/icons/folder.gif" alt="[DIR]"> <a href="2004.07.18/">2004.07.18/</a>             2008-05-29 16:36    -
<img src="/icons/folder.gif" alt="[DIR]"> <a href="2004.09.06/">2004.09.06/</a>             2008-05-29 16:36    -
<img src="/icons/unknown.gif" alt="[   ]"> <a href="README.txt">README.txt</a>              2008-05-29 16:36  1.2K
<hr></pre>
</body></html>"#;

    const DAY: &str = r#"<pre><img src="/icons/back.gif" alt="[PARENTDIR]"> <a href="/MOLT/MOD09GA.005/">Parent Directory</a>                             -
<img src="/icons/unknown.gif" alt="[   ]"> <a href="MOD09GA.A2004200.h17v04.005.2008150171822.hdf">MOD09GA.A2004200.h17v04.005.2008150171822.hdf</a> 2008-05-29 16:36  86015839
<img src="/icons/text.gif" alt="[TXT]"> <a href="MOD09GA.A2004200.h17v04.005.2008150171822.hdf.xml">MOD09GA.A2004200.h17v04.005.2008150171822.hdf.xml</a> 2008-05-29 16:36   12K
<img src="/icons/unknown.gif" alt="[   ]"> <a href="MOD09GA.A2004200.h18v04.005.2008150171900.hdf">MOD09GA.A2004200.h18v04.005.2008150171900.hdf</a> 2008-05-29 16:37   82M
</pre>"#;

    fn page(body: &str) -> Page {
        Page {
            url: "https://e4ftl01.cr.usgs.gov/MOLT/MOD09GA.005/".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_parse_dates() {
        let dates = UsgsParser.parse_dates(&page(INDEX), 2004).unwrap();
        let labels: Vec<_> = dates.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["2004.04.09", "2004.07.18", "2004.09.06"]);
        assert_eq!(dates[1].doy, 200);
    }

    #[test]
    fn test_parse_files() {
        let files = UsgsParser.parse_files(&page(DAY)).unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(files[0].name, "MOD09GA.A2004200.h17v04.005.2008150171822.hdf");
        assert_eq!(files[0].size, Some(86015839));
        assert_eq!(files[2].size, None);
    }

    #[test]
    fn test_uppercase_markup() {
        let body = r#"<PRE><IMG SRC="/icons/folder.gif" ALT="[DIR]"> <A HREF="2004.07.18/">2004.07.18/</A>   2008-05-29 16:36    -
<IMG SRC="/icons/folder.gif" ALT="[DIR]"> <A HREF="2004.07.19">2004.07.19</A>   2008-05-29 16:36    -
</PRE>"#;
        let dates = UsgsParser.parse_dates(&page(body), 2004).unwrap();
        let doys: Vec<_> = dates.iter().map(|d| d.doy).collect();
        assert_eq!(doys, vec![200, 201]);
    }

    #[test]
    fn test_single_quoted_attributes() {
        let index = "<pre><img src='/icons/folder.gif' alt='[DIR]'> <a href='2004.07.18/'>2004.07.18/</a>   2008-05-29 16:36    -\n</pre>";
        let dates = UsgsParser.parse_dates(&page(index), 2004).unwrap();
        assert_eq!(dates.len(), 1);
        assert_eq!(dates[0].label, "2004.07.18");

        let day = "<pre><img src='/icons/unknown.gif' alt='[   ]'> <a href='MOD09GA.A2004200.h17v04.005.2008150171822.hdf'>MOD09GA.A2004200.h17v04.005.2008150171822.hdf</a> 2008-05-29 16:36  86015839\n</pre>";
        let files = UsgsParser.parse_files(&page(day)).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size, Some(86015839));
    }

    #[test]
    fn test_page_without_links_is_a_parse_error() {
        let result = UsgsParser.parse_files(&page("<html><body>Service Unavailable</body></html>"));
        assert!(matches!(result, Err(ListingError::Parse { .. })));
    }

    #[test]
    fn test_urls() {
        let request = crate::request::RequestFile {
            platform: Some("MOLT".to_string()),
            product: Some("MOD09GA.005".to_string()),
            tile: Some("h17v04".to_string()),
            year: Some(2004),
            ..Default::default()
        }
        .into_request(false, None)
        .unwrap();
        let date = DateDir {
            doy: 200,
            label: "2004.07.18".to_string(),
        };

        assert_eq!(
            UsgsParser.index_url(&request).as_str(),
            "https://e4ftl01.cr.usgs.gov/MOLT/MOD09GA.005/"
        );
        assert_eq!(
            UsgsParser.date_url(&request, &date).as_str(),
            "https://e4ftl01.cr.usgs.gov/MOLT/MOD09GA.005/2004.07.18/"
        );
        assert_eq!(
            UsgsParser.file_url(&request, &date, "x.hdf").as_str(),
            "https://e4ftl01.cr.usgs.gov/MOLT/MOD09GA.005/2004.07.18/x.hdf"
        );
    }
}
