use geo::{BoundingRect, Intersects};
use geo_types::{Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::types::ZonalError;

/// One administrative boundary as it appears in the run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boundary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub geometry: BoundaryGeometry,
}

/// GeoJSON-style geometry. Coordinates are kept untyped until the geometry
/// type is known so that unsupported types can be skipped instead of failing
/// the whole configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Value,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    fn union(self, other: BoundingBox) -> BoundingBox {
        BoundingBox {
            min_lat: self.min_lat.min(other.min_lat),
            min_lon: self.min_lon.min(other.min_lon),
            max_lat: self.max_lat.max(other.max_lat),
            max_lon: self.max_lon.max(other.max_lon),
        }
    }
}

/// A region's rings, each tested independently, plus the box spanning all of them.
#[derive(Debug, Clone)]
pub struct Region {
    pub id: String,
    pub name: String,
    pub rings: Vec<Polygon<f64>>,
    pub bbox: Option<BoundingBox>,
}

impl Region {
    pub fn from_rings(id: impl Into<String>, name: impl Into<String>, rings: Vec<Polygon<f64>>) -> Self {
        let bbox = rings
            .iter()
            .filter_map(|ring| ring.bounding_rect())
            .map(|rect| BoundingBox {
                min_lat: rect.min().y,
                min_lon: rect.min().x,
                max_lat: rect.max().y,
                max_lon: rect.max().x,
            })
            .reduce(BoundingBox::union);

        Self {
            id: id.into(),
            name: name.into(),
            rings,
            bbox,
        }
    }

    /// Cheap rejection before the exact ring tests.
    pub fn may_contain(&self, lon: f64, lat: f64) -> bool {
        self.bbox.map_or(false, |bbox| bbox.contains(lon, lat))
    }

    /// Exact containment against any ring, boundary inclusive.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let point = Coord { x: lon, y: lat };
        self.rings.iter().any(|ring| ring.intersects(&point))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegionIndex {
    regions: Vec<Region>,
}

impl RegionIndex {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    /// Builds the index from configured boundaries. Entries with an unsupported
    /// geometry type are skipped with a warning; malformed coordinates of a
    /// supported type are a configuration error.
    pub fn build(boundaries: &[Boundary]) -> Result<Self, ZonalError> {
        let mut regions = Vec::with_capacity(boundaries.len());

        for boundary in boundaries {
            match Self::rings_for(boundary) {
                Ok(rings) => regions.push(Region::from_rings(
                    boundary.id.clone(),
                    boundary.name.clone(),
                    rings,
                )),
                Err(e @ ZonalError::UnsupportedGeometry { .. }) => {
                    warn!(region = %boundary.id, "Skipping region: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Self { regions })
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn ring_count(&self) -> usize {
        self.regions.iter().map(|r| r.rings.len()).sum()
    }

    fn rings_for(boundary: &Boundary) -> Result<Vec<Polygon<f64>>, ZonalError> {
        let geometry = &boundary.geometry;
        let malformed = |e: serde_json::Error| {
            ZonalError::Config(format!(
                "region {} has malformed {} coordinates: {}",
                boundary.id, geometry.kind, e
            ))
        };

        match geometry.kind.as_str() {
            "Polygon" => {
                let rings: Vec<Vec<Vec<f64>>> =
                    serde_json::from_value(geometry.coordinates.clone()).map_err(malformed)?;
                rings.iter().map(|r| ring_polygon(&boundary.id, r)).collect()
            }
            "MultiPolygon" => {
                let parts: Vec<Vec<Vec<Vec<f64>>>> =
                    serde_json::from_value(geometry.coordinates.clone()).map_err(malformed)?;
                parts
                    .iter()
                    .flatten()
                    .map(|r| ring_polygon(&boundary.id, r))
                    .collect()
            }
            other => Err(ZonalError::UnsupportedGeometry {
                id: boundary.id.clone(),
                kind: other.to_string(),
            }),
        }
    }
}

/// Every ring (holes included) becomes its own hole-free polygon.
fn ring_polygon(id: &str, positions: &[Vec<f64>]) -> Result<Polygon<f64>, ZonalError> {
    let coords = positions
        .iter()
        .map(|p| match p.as_slice() {
            [lon, lat, ..] => Ok(Coord { x: *lon, y: *lat }),
            _ => Err(ZonalError::Config(format!(
                "region {} has a position with fewer than two values",
                id
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Polygon::new(LineString::from(coords), vec![]))
}
