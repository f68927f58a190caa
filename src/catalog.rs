use geo::algorithm::bounding_rect::BoundingRect;
use geo::{MultiPolygon, Rect};
use geojson::GeoJson;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("boundary file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("malformed boundary data: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// Immutable region boundary catalog, loaded once at startup.
#[derive(Debug, Clone)]
pub struct RegionCatalog {
    regions: Vec<Region>,
    names: Vec<String>,
}

impl RegionCatalog {
    pub fn empty() -> Self {
        RegionCatalog {
            regions: Vec::new(),
            names: Vec::new(),
        }
    }

    /// Loads a GeoJSON FeatureCollection, keeping only features that carry
    /// `name_property` and a polygonal geometry.
    pub fn load(path: &Path, name_property: &str) -> Result<Self, CatalogError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(CatalogError::Malformed(format!("read failed: {e}"))),
        };
        let reader = BufReader::new(file);

        let geojson = GeoJson::from_reader(reader)
            .map_err(|e| CatalogError::Malformed(format!("parse failed: {e}")))?;

        let collection = match geojson {
            GeoJson::FeatureCollection(fc) => fc,
            _ => {
                return Err(CatalogError::Malformed(
                    "boundary data must be a FeatureCollection".to_string(),
                ));
            }
        };

        let mut regions: Vec<Region> = Vec::new();

        for feature in collection.features {
            let name_val = feature
                .properties
                .as_ref()
                .and_then(|props| props.get(name_property));

            let name = match name_val {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Number(n)) => n.to_string(),
                _ => continue, // Skip if no name or not string/number
            };

            let geometry = match feature.geometry {
                Some(geom) => {
                    let converted: Result<geo::Geometry<f64>, _> = geom.value.try_into();
                    match converted {
                        Ok(geo::Geometry::MultiPolygon(mp)) => mp,
                        Ok(geo::Geometry::Polygon(p)) => MultiPolygon::new(vec![p]),
                        Ok(_) => continue, // Skip points/lines
                        Err(e) => {
                            warn!("Skipping region '{}': bad geometry: {:?}", name, e);
                            continue;
                        }
                    }
                }
                None => continue,
            };

            // First feature wins on duplicate names
            if regions.iter().any(|r| r.name == name) {
                continue;
            }

            regions.push(Region { name, geometry });
        }

        let mut names: Vec<String> = regions.iter().map(|r| r.name.clone()).collect();
        names.sort();

        if names.is_empty() {
            warn!(
                "No region names found in {:?} using property '{}'",
                path, name_property
            );
        }

        Ok(RegionCatalog { regions, names })
    }

    /// Region names, lexicographically sorted.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.regions.iter().any(|r| r.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Minimal bounding box of a region's geometry. None for unknown names
    /// or geometry whose bounds cannot be computed.
    pub fn bounds_of(&self, name: &str) -> Option<Rect<f64>> {
        let region = self.regions.iter().find(|r| r.name == name)?;
        match region.geometry.bounding_rect() {
            Some(rect) => Some(rect),
            None => {
                warn!("Could not compute bounds for region '{}'", name);
                None
            }
        }
    }

    /// Bounding box covering every region in the catalog.
    pub fn union_bounds(&self) -> Option<Rect<f64>> {
        let mut rects = self
            .regions
            .iter()
            .filter_map(|r| r.geometry.bounding_rect());
        let first = rects.next()?;
        Some(rects.fold(first, |acc, r| {
            Rect::new(
                geo::Coord {
                    x: acc.min().x.min(r.min().x),
                    y: acc.min().y.min(r.min().y),
                },
                geo::Coord {
                    x: acc.max().x.max(r.max().x),
                    y: acc.max().y.max(r.max().y),
                },
            )
        }))
    }

    /// Re-emits the catalog as a GeoJSON FeatureCollection with a single
    /// property per feature: the configured name key.
    pub fn feature_collection(&self, name_property: &str) -> geojson::FeatureCollection {
        let features = self
            .regions
            .iter()
            .map(|region| {
                let mut props = geojson::JsonObject::new();
                props.insert(
                    name_property.to_string(),
                    serde_json::Value::String(region.name.clone()),
                );
                geojson::Feature {
                    bbox: None,
                    geometry: Some(geojson::Geometry::new(geojson::Value::from(
                        &region.geometry,
                    ))),
                    id: None,
                    properties: Some(props),
                    foreign_members: None,
                }
            })
            .collect();

        geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}
