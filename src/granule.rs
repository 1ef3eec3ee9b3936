//! MODIS granule filenames: `SHORT.AYYYYDDD.<segment>.<segment>....hdf`
use crate::request::GranuleRequest;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct GranuleName<'a> {
    pub short_name: &'a str,
    pub year: i32,
    pub doy: u32,
    segments: Vec<&'a str>,
}

fn granule_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<short>[A-Za-z0-9_]+)\.A(?<year>\d{4})(?<doy>\d{3})\.(?<rest>.+)\.hdf$")
            .expect("Regex pattern should always compile")
    })
}

impl<'a> GranuleName<'a> {
    pub fn parse(filename: &'a str) -> Option<Self> {
        let captures = granule_regex().captures(filename)?;
        let short_name = captures.name("short")?.as_str();
        let year = captures.name("year")?.as_str().parse().ok()?;
        let doy = captures.name("doy")?.as_str().parse().ok()?;
        let segments = captures.name("rest")?.as_str().split('.').collect();
        Some(Self {
            short_name,
            year,
            doy,
            segments,
        })
    }

    pub fn has_segment(&self, segment: &str) -> bool {
        self.segments.iter().any(|s| *s == segment)
    }

    pub fn matches(&self, request: &GranuleRequest) -> bool {
        self.short_name.eq_ignore_ascii_case(request.product.short_name())
            && self.year == request.year
            && request.doys.contains(self.doy)
            && self.has_segment(request.product.collection())
            && request
                .tile
                .as_deref()
                .map_or(true, |tile| self.has_segment(tile))
    }
}

/// True when `filename` is a granule of the requested product, tile, year and day range.
pub fn matches_request(filename: &str, request: &GranuleRequest) -> bool {
    GranuleName::parse(filename).is_some_and(|name| name.matches(request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestFile;

    fn request(tile: Option<&str>) -> GranuleRequest {
        RequestFile {
            platform: Some(if tile.is_some() { "MOLT" } else { "LAADS" }.to_string()),
            product: Some("MOD09GA.005".to_string()),
            tile: tile.map(str::to_string),
            year: Some(2004),
            begin: Some(153),
            end: Some(243),
            ..Default::default()
        }
        .into_request(false, None)
        .unwrap()
    }

    #[test]
    fn test_parse() {
        let name = GranuleName::parse("MOD09GA.A2004200.h17v04.005.2008150171822.hdf").unwrap();
        assert_eq!(name.short_name, "MOD09GA");
        assert_eq!(name.year, 2004);
        assert_eq!(name.doy, 200);
        assert!(name.has_segment("h17v04"));
        assert!(name.has_segment("005"));

        assert!(GranuleName::parse("MOD09GA.A2004200.h17v04.005.2008150171822.hdf.xml").is_none());
        assert!(GranuleName::parse("BROWSE.MOD09GA.A2004200.h17v04.005.jpg").is_none());
        assert!(GranuleName::parse("index.html").is_none());
    }

    #[test]
    fn test_matches_request() {
        let req = request(Some("h17v04"));
        assert!(matches_request("MOD09GA.A2004200.h17v04.005.2008150171822.hdf", &req));
        // wrong tile, collection, product, year, outside range
        assert!(!matches_request("MOD09GA.A2004200.h18v04.005.2008150171822.hdf", &req));
        assert!(!matches_request("MOD09GA.A2004200.h17v04.006.2008150171822.hdf", &req));
        assert!(!matches_request("MYD09GA.A2004200.h17v04.005.2008150171822.hdf", &req));
        assert!(!matches_request("MOD09GA.A2005200.h17v04.005.2008150171822.hdf", &req));
        assert!(!matches_request("MOD09GA.A2004100.h17v04.005.2008150171822.hdf", &req));
        assert!(!matches_request("MOD09GA.A2004250.h17v04.005.2008150171822.hdf", &req));
        // the tile must be a whole segment
        assert!(!matches_request("MOD09GA.A2004200.xh17v04.005.2008150171822.hdf", &req));
    }

    #[test]
    fn test_swath_products_without_tile() {
        let req = request(None);
        assert!(matches_request("MOD09GA.A2004200.1030.005.2008150171822.hdf", &req));
    }
}
