//! Joined and classified view model: everything the renderers need, with
//! no markup in it.

use crate::classify::{extent, Extent, Palette};
use crate::config::AppConfig;
use crate::join::StatIndex;
use crate::projection::{path_data, Projection};
use crate::types::{Region, StatRecord};
use rayon::prelude::*;
use tracing::{info, warn};

/// Visual attributes of one county.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionView {
    pub fips: u32,
    /// `None` when no statistics record matched.
    pub education: Option<f64>,
    pub bucket: Option<usize>,
    pub fill: String,
    pub path: String,
    pub tooltip: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub color: String,
    pub label: String,
    pub swatch_x: f64,
    pub swatch_y: f64,
    pub swatch_size: f64,
    pub label_x: f64,
    pub label_y: f64,
}

#[derive(Debug, Clone)]
pub struct ChoroplethView {
    pub width: f64,
    pub height: f64,
    pub regions: Vec<RegionView>,
    pub legend: Vec<LegendEntry>,
    pub extent: Option<Extent>,
    pub unmatched: usize,
}

/// `"{area_name}, {state}: {percentage}"`
pub fn tooltip_text(record: &StatRecord) -> String {
    format!(
        "{}, {}: {}",
        record.area_name, record.state, record.bachelors_or_higher
    )
}

/// Attributes derived for a region whose record was found.
pub struct Classified<'a> {
    pub record: &'a StatRecord,
    pub bucket: usize,
    pub fill: &'a str,
}

/// Joins and classifies one region. `None` when the region has no record or
/// the collection has no measurable extent.
pub fn classify_region<'a>(
    region: &Region,
    index: &StatIndex<'a>,
    palette: &'a Palette,
    extent: Option<Extent>,
) -> Option<Classified<'a>> {
    let record = index.join(region)?;
    let extent = extent?;
    let bucket = palette.bucket(record.bachelors_or_higher, extent);
    let fill = palette.color_for(record.bachelors_or_higher, extent)?;
    Some(Classified {
        record,
        bucket,
        fill,
    })
}

pub fn build_view(config: &AppConfig, regions: &[Region], records: &[StatRecord]) -> ChoroplethView {
    let palette = Palette::new(config.style.palette.clone());
    let index = StatIndex::build(records);
    let extent = extent(records);
    let projection = Projection::for_regions(&config.canvas, regions);

    if let Some(e) = extent {
        info!(min = e.min, max = e.max, "Classifying {} regions", regions.len());
    }

    let views: Vec<RegionView> = regions
        .par_iter()
        .map(|region| {
            let path = path_data(&projection.project(&region.geometry));
            match classify_region(region, &index, &palette, extent) {
                Some(c) => RegionView {
                    fips: region.id,
                    education: Some(c.record.bachelors_or_higher),
                    bucket: Some(c.bucket),
                    fill: c.fill.to_string(),
                    path,
                    tooltip: Some(tooltip_text(c.record)),
                },
                None => RegionView {
                    fips: region.id,
                    education: None,
                    bucket: None,
                    fill: config.style.missing_color.clone(),
                    path,
                    tooltip: None,
                },
            }
        })
        .collect();

    let unmatched = views.iter().filter(|v| v.education.is_none()).count();
    if unmatched > 0 {
        warn!("{} regions have no statistics record", unmatched);
    }

    ChoroplethView {
        width: config.canvas.width,
        height: config.canvas.height,
        regions: views,
        legend: build_legend(config),
        extent,
        unmatched,
    }
}

/// One swatch and label per palette color, stacked downwards.
pub fn build_legend(config: &AppConfig) -> Vec<LegendEntry> {
    let legend = &config.legend;
    config
        .style
        .palette
        .iter()
        .zip(&legend.labels)
        .enumerate()
        .map(|(i, (color, label))| {
            let y = legend.start_y + i as f64 * legend.spacing;
            LegendEntry {
                color: color.clone(),
                label: label.clone(),
                swatch_x: legend.start_x,
                swatch_y: y,
                swatch_size: legend.swatch_size,
                label_x: legend.start_x + legend.label_offset,
                label_y: y + legend.swatch_size,
            }
        })
        .collect()
}

/// Screen-space pointer position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    pub x: f64,
    pub y: f64,
}

/// State of the single shared tooltip element.
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub top: f64,
    pub left: f64,
    pub opacity: f64,
    pub text: String,
    pub education: Option<f64>,
    offset: f64,
}

impl Tooltip {
    pub fn new(offset: f64) -> Self {
        Self {
            top: 0.0,
            left: 0.0,
            opacity: 0.0,
            text: String::new(),
            education: None,
            offset,
        }
    }

    /// Show the region's tooltip up and to the right of the pointer.
    /// Regions without a record leave the tooltip untouched.
    pub fn on_enter(&mut self, region: &RegionView, pointer: Pointer) {
        let Some(text) = &region.tooltip else {
            return;
        };
        self.top = pointer.y - self.offset;
        self.left = pointer.x + self.offset;
        self.education = region.education;
        self.text = text.clone();
        self.opacity = 1.0;
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn on_leave(&mut self) {
        self.opacity = 0.0;
    }

    pub fn is_visible(&self) -> bool {
        self.opacity > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::bucket_index;
    use geo::{polygon, MultiPolygon};

    fn record(fips: u32, area_name: &str, state: &str, value: f64) -> StatRecord {
        StatRecord {
            fips,
            state: state.to_string(),
            area_name: area_name.to_string(),
            bachelors_or_higher: value,
        }
    }

    fn region(id: u32, x: f64) -> Region {
        Region {
            id,
            geometry: MultiPolygon::new(vec![polygon![
                (x: x, y: 0.0),
                (x: x + 1.0, y: 0.0),
                (x: x + 1.0, y: 1.0),
                (x: x, y: 1.0),
            ]]),
        }
    }

    fn sample() -> (Vec<Region>, Vec<StatRecord>) {
        let regions = vec![region(1001, 0.0), region(1003, 2.0), region(1005, 4.0), region(2000, 6.0)];
        let records = vec![
            record(1001, "Autauga County", "AL", 37.0),
            record(1003, "Baldwin County", "AL", 75.0),
            record(1005, "Barbour County", "AL", 2.6),
        ];
        (regions, records)
    }

    #[test]
    fn fills_follow_the_bucket_formula() {
        let config = AppConfig::default();
        let (regions, records) = sample();
        let view = build_view(&config, &regions, &records);

        assert_eq!(view.regions.len(), 4);
        for rv in view.regions.iter().filter(|rv| rv.education.is_some()) {
            let expected = bucket_index(rv.education.unwrap(), 75.0, 4);
            assert_eq!(rv.bucket, Some(expected));
            assert_eq!(rv.fill, config.style.palette[expected]);
        }
        assert_eq!(view.regions[0].fill, "#38bdf8");
        assert_eq!(view.regions[1].fill, "#0284c7");
        assert_eq!(view.regions[2].fill, "#7dd3fc");
    }

    #[test]
    fn unmatched_region_gets_missing_color() {
        let config = AppConfig::default();
        let (regions, records) = sample();
        let view = build_view(&config, &regions, &records);

        let missing = &view.regions[3];
        assert_eq!(missing.fips, 2000);
        assert_eq!(missing.fill, config.style.missing_color);
        assert_eq!(missing.education, None);
        assert_eq!(missing.tooltip, None);
        assert_eq!(view.unmatched, 1);
    }

    #[test]
    fn empty_statistics_render_everything_missing() {
        let config = AppConfig::default();
        let (regions, _) = sample();
        let view = build_view(&config, &regions, &[]);
        assert!(view.extent.is_none());
        assert_eq!(view.unmatched, regions.len());
    }

    #[test]
    fn region_order_and_paths_follow_geometry() {
        let config = AppConfig::default();
        let (regions, records) = sample();
        let view = build_view(&config, &regions, &records);
        let ids: Vec<_> = view.regions.iter().map(|r| r.fips).collect();
        assert_eq!(ids, vec![1001, 1003, 1005, 2000]);
        assert_eq!(view.regions[1].path, "M2,0L3,0L3,1L2,1Z");
        assert_eq!((view.width, view.height), (1280.0, 720.0));
    }

    #[test]
    fn tooltip_format() {
        let r = record(1001, "Autauga County", "AL", 24.6);
        assert_eq!(tooltip_text(&r), "Autauga County, AL: 24.6");
        let whole = record(1003, "Baldwin County", "AL", 30.0);
        assert_eq!(tooltip_text(&whole), "Baldwin County, AL: 30");
    }

    #[test]
    fn legend_layout() {
        let config = AppConfig::default();
        let legend = build_legend(&config);
        assert_eq!(legend.len(), config.style.palette.len());

        let labels: Vec<_> = legend.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["very low", "low", "normal", "high"]);

        for (i, entry) in legend.iter().enumerate() {
            assert_eq!(entry.color, config.style.palette[i]);
            assert_eq!(entry.swatch_x, 25.0);
            assert_eq!(entry.swatch_y, 625.0 + 20.0 * i as f64);
            assert_eq!(entry.swatch_size, 7.0);
            assert_eq!(entry.label_x, 40.0);
            assert_eq!(entry.label_y, 632.0 + 20.0 * i as f64);
        }
        for pair in legend.windows(2) {
            assert_eq!(pair[1].swatch_y - pair[0].swatch_y, 20.0);
        }
    }

    #[test]
    fn tooltip_enter_and_leave() {
        let config = AppConfig::default();
        let (regions, records) = sample();
        let view = build_view(&config, &regions, &records);

        let mut tooltip = Tooltip::new(config.tooltip.offset);
        assert!(!tooltip.is_visible());

        tooltip.on_enter(&view.regions[0], Pointer { x: 100.0, y: 50.0 });
        assert_eq!(tooltip.opacity, 1.0);
        assert_eq!(tooltip.top, 43.0);
        assert_eq!(tooltip.left, 107.0);
        assert_eq!(tooltip.text, "Autauga County, AL: 37");
        assert_eq!(tooltip.education, Some(37.0));

        tooltip.on_leave();
        assert_eq!(tooltip.opacity, 0.0);
        assert_eq!(tooltip.text, "Autauga County, AL: 37");

        tooltip.on_enter(&view.regions[1], Pointer { x: 10.0, y: 10.0 });
        assert!(tooltip.is_visible());
        assert_eq!(tooltip.text, "Baldwin County, AL: 75");
        tooltip.on_leave();
        assert!(!tooltip.is_visible());
    }

    #[test]
    fn entering_unmatched_region_keeps_tooltip_hidden() {
        let config = AppConfig::default();
        let (regions, records) = sample();
        let view = build_view(&config, &regions, &records);

        let mut tooltip = Tooltip::new(7.0);
        tooltip.on_enter(&view.regions[3], Pointer { x: 1.0, y: 1.0 });
        assert!(!tooltip.is_visible());
        assert!(tooltip.text.is_empty());
    }
}
