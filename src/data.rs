use crate::config::AppConfig;
use crate::topology;
use crate::types::{Region, StatRecord};
use anyhow::{anyhow, Context, Result};
use geo::MultiPolygon;
use geojson::GeoJson;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, info};

/// Where a JSON document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    Path(PathBuf),
}

impl Source {
    pub fn parse(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            Source::Url(s.to_string())
        } else {
            Source::Path(PathBuf::from(s))
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Url(url) => f.write_str(url),
            Source::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Everything the map is built from.
#[derive(Debug, Clone)]
pub struct MapData {
    pub regions: Vec<Region>,
    pub records: Vec<StatRecord>,
}

pub async fn load_data(config: &AppConfig) -> Result<MapData> {
    let geometry_source = Source::parse(&config.input.geometry);
    let statistics_source = Source::parse(&config.input.statistics);
    info!(geometry = %geometry_source, statistics = %statistics_source, "Loading data");

    let client = reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;

    // The documents are independent; fetch both at once.
    let (geometry_bytes, statistics_bytes) = tokio::try_join!(
        fetch(&client, &geometry_source),
        fetch(&client, &statistics_source),
    )?;

    let records = parse_statistics(&statistics_bytes)
        .with_context(|| format!("Invalid statistics document: {}", statistics_source))?;
    info!("Loaded {} statistics records", records.len());

    let regions = parse_geometry(&geometry_bytes, &config.input.geometry_object)
        .with_context(|| format!("Invalid geometry document: {}", geometry_source))?;
    info!("Loaded geometry for {} regions", regions.len());

    Ok(MapData { regions, records })
}

async fn fetch(client: &reqwest::Client, source: &Source) -> Result<Vec<u8>> {
    match source {
        Source::Url(url) => {
            debug!("GET {}", url);
            let response = client
                .get(url)
                .header("Accept", "application/json")
                .send()
                .await
                .with_context(|| format!("Request failed: {}", url))?;
            if !response.status().is_success() {
                return Err(anyhow!("{}: HTTP {}", url, response.status()));
            }
            let bytes = response
                .bytes()
                .await
                .with_context(|| format!("Failed to read response body: {}", url))?;
            Ok(bytes.to_vec())
        }
        Source::Path(path) => {
            debug!("Reading {:?}", path);
            tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read file: {:?}", path))
        }
    }
}

pub fn parse_statistics(bytes: &[u8]) -> Result<Vec<StatRecord>> {
    serde_json::from_slice(bytes).context("Failed to parse statistics JSON")
}

/// Accepts a TopoJSON topology or a GeoJSON FeatureCollection.
pub fn parse_geometry(bytes: &[u8], object: &str) -> Result<Vec<Region>> {
    let value: Value = serde_json::from_slice(bytes).context("Failed to parse geometry JSON")?;

    match value.get("type").and_then(Value::as_str) {
        Some("Topology") => topology::parse_topology(value)?.regions(object),
        Some("FeatureCollection") => regions_from_geojson(value),
        Some(other) => Err(anyhow!("Unsupported geometry document type: {}", other)),
        None => Err(anyhow!("Geometry document has no 'type' member")),
    }
}

fn regions_from_geojson(value: Value) -> Result<Vec<Region>> {
    let geojson = GeoJson::from_json_value(value).context("Failed to parse GeoJSON")?;
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut regions = Vec::new();

    for feature in collection.features {
        // Prefer the feature id, fall back to an `id` property.
        let id_value = match &feature.id {
            Some(geojson::feature::Id::String(s)) => Some(Value::String(s.clone())),
            Some(geojson::feature::Id::Number(n)) => Some(Value::Number(n.clone())),
            None => feature
                .properties
                .as_ref()
                .and_then(|props| props.get("id"))
                .cloned(),
        };
        let id = match topology::parse_id(id_value.as_ref())? {
            Some(id) => id,
            None => continue,
        };

        let geometry = match feature.geometry {
            Some(geom) => {
                let geo_geom: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;
                match geo_geom {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue,
                }
            }
            None => continue,
        };

        regions.push(Region { id, geometry });
    }

    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const STATS: &str = r#"[
        {"fips": 1001, "state": "AL", "area_name": "Autauga County", "bachelorsOrHigher": 21.9},
        {"fips": 1003, "state": "AL", "area_name": "Baldwin County", "bachelorsOrHigher": 28.6}
    ]"#;

    const TOPOLOGY: &str = r#"{
        "type": "Topology",
        "arcs": [[[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]],
        "objects": {
            "counties": {
                "type": "GeometryCollection",
                "geometries": [{"type": "Polygon", "id": 1001, "arcs": [[0]]}]
            }
        }
    }"#;

    #[test]
    fn source_kinds() {
        assert_eq!(
            Source::parse("https://example.com/a.json"),
            Source::Url("https://example.com/a.json".to_string())
        );
        assert_eq!(
            Source::parse("data/counties.json"),
            Source::Path(PathBuf::from("data/counties.json"))
        );
    }

    #[test]
    fn statistics_document() {
        let records = parse_statistics(STATS.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].area_name, "Baldwin County");
        assert_eq!(records[1].bachelors_or_higher, 28.6);
    }

    #[test]
    fn statistics_missing_field_fails() {
        let err = parse_statistics(br#"[{"fips": 1001, "state": "AL"}]"#).unwrap_err();
        assert!(format!("{:#}", err).contains("area_name"));
    }

    #[test]
    fn topology_document() {
        let regions = parse_geometry(TOPOLOGY.as_bytes(), "counties").unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].id, 1001);
    }

    #[test]
    fn geojson_document() {
        let doc = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "id": "01003",
                    "properties": {},
                    "geometry": {"type": "Polygon", "coordinates": [[[0,0],[2,0],[2,2],[0,0]]]}
                },
                {
                    "type": "Feature",
                    "properties": {"id": 1005},
                    "geometry": {"type": "MultiPolygon", "coordinates": [[[[0,0],[1,0],[1,1],[0,0]]]]}
                },
                {
                    "type": "Feature",
                    "properties": {"id": 1007},
                    "geometry": {"type": "Point", "coordinates": [0, 0]}
                },
                {
                    "type": "Feature",
                    "properties": {},
                    "geometry": {"type": "Polygon", "coordinates": [[[0,0],[2,0],[2,2],[0,0]]]}
                }
            ]
        }"#;
        let regions = parse_geometry(doc.as_bytes(), "counties").unwrap();
        assert_eq!(regions.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1003, 1005]);
    }

    #[test]
    fn unknown_document_type() {
        assert!(parse_geometry(br#"{"type": "Point", "coordinates": [0, 0]}"#, "counties").is_err());
        assert!(parse_geometry(b"[]", "counties").is_err());
    }

    #[tokio::test]
    async fn loads_both_documents_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let geometry_path = dir.path().join("counties.json");
        let statistics_path = dir.path().join("education.json");
        std::fs::File::create(&geometry_path)
            .unwrap()
            .write_all(TOPOLOGY.as_bytes())
            .unwrap();
        std::fs::File::create(&statistics_path)
            .unwrap()
            .write_all(STATS.as_bytes())
            .unwrap();

        let mut config = AppConfig::default();
        config.input.geometry = geometry_path.to_string_lossy().into_owned();
        config.input.statistics = statistics_path.to_string_lossy().into_owned();

        let data = load_data(&config).await.unwrap();
        assert_eq!(data.regions.len(), 1);
        assert_eq!(data.records.len(), 2);
    }

    #[tokio::test]
    async fn missing_file_aborts_load() {
        let dir = tempfile::tempdir().unwrap();
        let statistics_path = dir.path().join("education.json");
        std::fs::write(&statistics_path, STATS).unwrap();

        let mut config = AppConfig::default();
        config.input.geometry = dir.path().join("absent.json").to_string_lossy().into_owned();
        config.input.statistics = statistics_path.to_string_lossy().into_owned();

        let err = load_data(&config).await.unwrap_err();
        assert!(format!("{:#}", err).contains("absent.json"));
    }
}
