//! Granule footprints from ECS `.hdf.xml` metadata, checked against a bounding box
use crate::request::BoundingBox;
use anyhow::{anyhow, Result};
use geo::{coord, ConvexHull, Coord, Intersects, MultiPoint, Rect};
use roxmltree::Node;

/// Corner points of the granule's `GPolygon` boundary, as (lon, lat).
pub fn parse_footprint(xml: &str) -> Result<Vec<Coord<f64>>> {
    let doc = roxmltree::Document::parse(xml)?;

    let boundary = doc
        .descendants()
        .filter(|n| n.has_tag_name("GPolygon"))
        .flat_map(|polygon| polygon.children().filter(|n| n.has_tag_name("Boundary")))
        .next()
        .ok_or(anyhow!("Unable to locate 'GPolygon/Boundary' tag"))?;

    boundary
        .children()
        .filter(|n| n.has_tag_name("Point"))
        .map(|point| -> Result<Coord<f64>> {
            let x = child_value(point, "PointLongitude")?;
            let y = child_value(point, "PointLatitude")?;
            Ok(coord! { x: x, y: y })
        })
        .collect()
}

fn child_value(node: Node, name: &str) -> Result<f64> {
    let text = node
        .children()
        .find(|n| n.has_tag_name(name))
        .and_then(|n| n.text())
        .ok_or_else(|| anyhow!("Point without '{}'", name))?;
    Ok(text.trim().parse()?)
}

impl BoundingBox {
    pub fn intersects_footprint(self: &Self, points: &[Coord<f64>]) -> bool {
        if points.is_empty() {
            return false;
        }
        let area = Rect::new(
            coord! { x: self.west, y: self.south },
            coord! { x: self.east, y: self.north },
        )
        .to_polygon();
        let hull = MultiPoint::from(points.to_vec()).convex_hull();
        area.intersects(&hull)
    }
}
