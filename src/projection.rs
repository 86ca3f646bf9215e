use crate::config::{CanvasConfig, ProjectionKind};
use crate::types::Region;
use geo::{BoundingRect, Coord, MapCoords, MultiPolygon, Rect};
use std::fmt::Write;

/// Maps geometry coordinates into canvas space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Identity,
    /// `canvas = (x * scale + dx, dy - y * scale)`; y is flipped so north is up.
    Fit { scale: f64, dx: f64, dy: f64 },
}

impl Projection {
    pub fn for_regions(canvas: &CanvasConfig, regions: &[Region]) -> Self {
        match canvas.projection {
            ProjectionKind::Identity => Projection::Identity,
            ProjectionKind::Fit => match bounds(regions) {
                Some(b) => Projection::fit(b, canvas.width, canvas.height),
                None => Projection::Identity,
            },
        }
    }

    /// Largest uniform scale that keeps `bounds` inside the canvas, centered.
    pub fn fit(bounds: Rect<f64>, width: f64, height: f64) -> Self {
        let (w, h) = (bounds.width(), bounds.height());
        let scale = match (w > 0.0, h > 0.0) {
            (true, true) => (width / w).min(height / h),
            (true, false) => width / w,
            (false, true) => height / h,
            (false, false) => 1.0,
        };
        let dx = (width - w * scale) / 2.0 - bounds.min().x * scale;
        let dy = (height + h * scale) / 2.0 + bounds.min().y * scale;
        Projection::Fit { scale, dx, dy }
    }

    pub fn apply(&self, c: Coord<f64>) -> Coord<f64> {
        match *self {
            Projection::Identity => c,
            Projection::Fit { scale, dx, dy } => Coord {
                x: c.x * scale + dx,
                y: dy - c.y * scale,
            },
        }
    }

    pub fn project(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        match self {
            Projection::Identity => geometry.clone(),
            _ => geometry.map_coords(|c| self.apply(c)),
        }
    }
}

fn bounds(regions: &[Region]) -> Option<Rect<f64>> {
    regions
        .iter()
        .filter_map(|r| r.geometry.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                },
            )
        })
}

/// SVG path data for a (projected) multipolygon: `M x,y L x,y ... Z` per ring.
pub fn path_data(geometry: &MultiPolygon<f64>) -> String {
    let mut out = String::new();
    for polygon in geometry {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            // The closing coordinate repeats the first; Z covers it.
            let coords = match ring.0.split_last() {
                Some((_, rest)) if ring.is_closed() && !rest.is_empty() => rest,
                _ => &ring.0[..],
            };
            for (i, c) in coords.iter().enumerate() {
                out.push(if i == 0 { 'M' } else { 'L' });
                push_number(&mut out, c.x);
                out.push(',');
                push_number(&mut out, c.y);
            }
            if !coords.is_empty() {
                out.push('Z');
            }
        }
    }
    out
}

/// At most three decimals, trailing zeros trimmed. Non-finite values print
/// as `0` so the path data stays parseable.
fn push_number(out: &mut String, v: f64) {
    if !v.is_finite() {
        out.push('0');
        return;
    }
    let start = out.len();
    let _ = write!(out, "{:.3}", v);
    if out[start..].contains('.') {
        while out.ends_with('0') {
            out.pop();
        }
        if out.ends_with('.') {
            out.pop();
        }
    }
    if &out[start..] == "-0" {
        out.truncate(start);
        out.push('0');
    }
}
