use super::{dotted_date, exact_size, join_url, product_dir_url, DateDir, ListedFile, ListingParser};
use crate::error::ListingError;
use crate::http::Page;
use crate::request::GranuleRequest;
use scraper::{Html, Selector};
use url::Url;

/// The NSIDC DAAC data pool (n5eil01u): Apache table indexes, one `<tr>` per entry,
/// the size in the last right-aligned cell.
pub struct NsidcParser;

struct Row {
    href: String,
    size: Option<String>,
}

struct Selectors {
    row: Selector,
    link: Selector,
    right_cell: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            row: Selector::parse("tr").expect("row selector"),
            link: Selector::parse("a[href]").expect("link selector"),
            right_cell: Selector::parse(r#"td[align="right" i]"#).expect("right cell selector"),
        }
    }
}

fn rows(page: &Page) -> Result<Vec<Row>, ListingError> {
    let document = Html::parse_document(&page.body);
    let selectors = Selectors::new();

    let mut saw_table = false;
    let mut rows = vec![];
    for row in document.select(&selectors.row) {
        saw_table = true;
        let Some(href) = row
            .select(&selectors.link)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };
        if href.starts_with('?') || href.starts_with('/') || href.contains("://") {
            continue;
        }
        let size = row
            .select(&selectors.right_cell)
            .last()
            .map(|cell| cell.text().collect::<String>());
        rows.push(Row {
            href: href.to_string(),
            size,
        });
    }

    if !saw_table {
        return Err(ListingError::parse(&page.url, "no table rows in directory index"));
    }
    Ok(rows)
}

impl ListingParser for NsidcParser {
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
        Ok(rows(page)?
            .into_iter()
            .filter(|r| r.href.ends_with('/'))
            .filter_map(|r| dotted_date(&r.href, year))
            .collect())
    }

    fn parse_files(&self, page: &Page) -> Result<Vec<ListedFile>, ListingError> {
        Ok(rows(page)?
            .into_iter()
            .filter(|r| !r.href.ends_with('/'))
            .map(|r| ListedFile {
                size: r.size.as_deref().and_then(exact_size),
                name: r.href,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"<table>
   <tr><th valign="top"><img src="/icons/blank.gif" alt="[ICO]"></th><th><a href="?C=N;O=D">Name</a></th><th><a href="?C=M;O=A">Last modified</a></th><th><a href="?C=S;O=A">Size</a></th></tr>
   <tr><th colspan="4"><hr></th></tr>
<tr><td valign="top"><img src="/icons/back.gif" alt="[PARENTDIR]"></td><td><a href="/MOST/">Parent Directory</a></td><td>&nbsp;</td><td align="right">  - </td></tr>
<tr><td valign="top"><img src="/icons/folder.gif" alt="[DIR]"></td><td><a href="2004.07.18/">2004.07.18/</a></td><td align="right">2016-11-18 12:41  </td><td align="right">  - </td></tr>
<tr><td valign="top"><img src="/icons/folder.gif" alt="[DIR]"></td><td><a href="2005.01.01/">2005.01.01/</a></td><td align="right">2016-11-18 12:41  </td><td align="right">  - </td></tr>
</table>"#;

    const DAY: &str = r#"<table>
<tr><td valign="top"><img src="/icons/back.gif" alt="[PARENTDIR]"></td><td><a href="/MOST/MOD10A1.006/">Parent Directory</a></td><td>&nbsp;</td><td align="right">  - </td></tr>
<tr><td valign="top"><img src="/icons/unknown.gif" alt="[   ]"></td><td><a href="MOD10A1.A2004200.h17v04.006.2016144184016.hdf">MOD10A1.A2004200.h17v04.006.2016144184016.hdf</a></td><td align="right">2016-05-23 14:40  </td><td align="right">1843317</td></tr>
<tr><td valign="top"><img src="/icons/unknown.gif" alt="[   ]"></td><td><a href="MOD10A1.A2004200.h17v04.006.2016144184016.hdf.xml">MOD10A1.A2004200.h17v04.006.2016144184016.hdf.xml</a></td><td align="right">2016-05-23 14:40  </td><td align="right"> 10K</td></tr>
</table>"#;

    fn page(body: &str) -> Page {
        Page {
            url: "https://n5eil01u.ecs.nsidc.org/MOST/MOD10A1.006/".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_parse_dates() {
        let dates = NsidcParser.parse_dates(&page(INDEX), 2004).unwrap();
        assert_eq!(
            dates,
            vec![DateDir {
                doy: 200,
                label: "2004.07.18".to_string()
            }]
        );
    }

    #[test]
    fn test_parse_files() {
        let files = NsidcParser.parse_files(&page(DAY)).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].size, Some(1843317));
        assert!(files[1].name.ends_with(".hdf.xml"));
        assert_eq!(files[1].size, None);
    }

    #[test]
    fn test_uppercase_markup_and_single_quotes() {
        let body = r#"<TABLE>
<TR><TD VALIGN='top'><IMG SRC='/icons/folder.gif' ALT='[DIR]'></TD><TD><A HREF='2004.07.18/'>2004.07.18/</A></TD><TD ALIGN='right'>2016-11-18 12:41</TD><TD ALIGN='RIGHT'> - </TD></TR>
</TABLE>"#;
        let dates = NsidcParser.parse_dates(&page(body), 2004).unwrap();
        assert_eq!(dates.len(), 1);
        assert_eq!(dates[0].doy, 200);

        let body = r#"<TABLE><TR><TD><A HREF='MOD10A1.A2004200.h17v04.006.2016144184016.hdf'>x</A></TD><TD ALIGN='RIGHT'>1843317</TD></TR></TABLE>"#;
        let files = NsidcParser.parse_files(&page(body)).unwrap();
        assert_eq!(files[0].size, Some(1843317));
    }

    #[test]
    fn test_usgs_style_page_is_a_parse_error() {
        let result = NsidcParser.parse_files(&page("<pre><a href=\"x.hdf\">x.hdf</a></pre>"));
        assert!(matches!(result, Err(ListingError::Parse { .. })));
    }
}
