//! TopoJSON decoding.
//!
//! Topologies store each boundary segment once as an "arc" shared by the
//! polygons on either side of it. Quantized topologies additionally store arc
//! positions as integer deltas that must be accumulated and scaled back.

use crate::types::Region;
use anyhow::{anyhow, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct Topology {
    #[serde(default)]
    transform: Option<Transform>,
    arcs: Vec<Vec<Vec<f64>>>,
    // Decoded lazily: only the requested object has to be well formed.
    objects: HashMap<String, Value>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum TopoGeometry {
    GeometryCollection {
        geometries: Vec<Value>,
    },
    Polygon {
        #[serde(default)]
        id: Option<Value>,
        arcs: Vec<Vec<i64>>,
    },
    MultiPolygon {
        #[serde(default)]
        id: Option<Value>,
        arcs: Vec<Vec<Vec<i64>>>,
    },
    #[serde(other)]
    Other,
}

impl Topology {
    /// Decode every polygonal geometry of the named object into a region.
    /// Geometries without an id and non-polygonal geometries are skipped.
    pub fn regions(&self, object: &str) -> Result<Vec<Region>> {
        let root = self
            .objects
            .get(object)
            .ok_or_else(|| anyhow!("Topology has no object named '{}'", object))?;

        let arcs = self.decode_arcs();
        let mut regions = Vec::new();
        collect_regions(root, &arcs, &mut regions)?;
        Ok(regions)
    }

    fn decode_arcs(&self) -> Vec<Vec<Coord<f64>>> {
        self.arcs
            .iter()
            .map(|arc| match self.transform {
                Some(t) => {
                    let (mut x, mut y) = (0.0, 0.0);
                    arc.iter()
                        .filter(|p| p.len() >= 2)
                        .map(|p| {
                            x += p[0];
                            y += p[1];
                            Coord {
                                x: x * t.scale[0] + t.translate[0],
                                y: y * t.scale[1] + t.translate[1],
                            }
                        })
                        .collect()
                }
                None => arc
                    .iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| Coord { x: p[0], y: p[1] })
                    .collect(),
            })
            .collect()
    }
}

pub fn parse_topology(value: Value) -> Result<Topology> {
    serde_json::from_value(value).context("Failed to parse TopoJSON topology")
}

/// Null-typed geometries are valid TopoJSON and decode as `Other`.
fn decode_geometry(value: &Value) -> Result<TopoGeometry> {
    match value.get("type") {
        Some(Value::String(_)) => {
            TopoGeometry::deserialize(value).context("Invalid TopoJSON geometry")
        }
        _ => Ok(TopoGeometry::Other),
    }
}

fn collect_regions(
    value: &Value,
    arcs: &[Vec<Coord<f64>>],
    out: &mut Vec<Region>,
) -> Result<()> {
    match decode_geometry(value)? {
        TopoGeometry::GeometryCollection { geometries } => {
            for g in &geometries {
                collect_regions(g, arcs, out)?;
            }
        }
        TopoGeometry::Polygon { id, arcs: rings } => {
            if let Some(id) = parse_id(id.as_ref())? {
                let polygon = polygon(&rings, arcs)?;
                out.push(Region {
                    id,
                    geometry: MultiPolygon::new(vec![polygon]),
                });
            }
        }
        TopoGeometry::MultiPolygon { id, arcs: polygons } => {
            if let Some(id) = parse_id(id.as_ref())? {
                let polygons = polygons
                    .iter()
                    .map(|rings| polygon(rings, arcs))
                    .collect::<Result<Vec<_>>>()?;
                out.push(Region {
                    id,
                    geometry: MultiPolygon::new(polygons),
                });
            }
        }
        TopoGeometry::Other => {}
    }
    Ok(())
}

/// Region identifiers appear as numbers or as zero-padded strings ("01001").
pub fn parse_id(id: Option<&Value>) -> Result<Option<u32>> {
    match id {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| anyhow!("Region id {} is not a county code", n)),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .with_context(|| format!("Region id '{}' is not numeric", s)),
        Some(other) => Err(anyhow!("Unsupported region id: {}", other)),
    }
}

fn polygon(rings: &[Vec<i64>], arcs: &[Vec<Coord<f64>>]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|r| ring(r, arcs));
    let exterior = match rings.next() {
        Some(r) => r?,
        None => LineString::new(vec![]),
    };
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn ring(indices: &[i64], arcs: &[Vec<Coord<f64>>]) -> Result<LineString<f64>> {
    let mut coords: Vec<Coord<f64>> = Vec::new();
    for &index in indices {
        // Negative indices address arc !index traversed backwards.
        let (arc, reversed) = if index >= 0 {
            (index as usize, false)
        } else {
            ((!index) as usize, true)
        };
        let points = arcs
            .get(arc)
            .ok_or_else(|| anyhow!("Arc index {} out of range ({} arcs)", index, arcs.len()))?;

        // Consecutive arcs share their joining point.
        coords.pop();
        if reversed {
            coords.extend(points.iter().rev().copied());
        } else {
            coords.extend(points.iter().copied());
        }
    }
    Ok(LineString::new(coords))
}
