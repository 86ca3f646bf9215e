use crate::types::StatRecord;

/// Observed value range across the statistics collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min: f64,
    pub max: f64,
}

/// `None` when there are no records to measure.
pub fn extent(records: &[StatRecord]) -> Option<Extent> {
    records
        .iter()
        .map(|r| r.bachelors_or_higher)
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some(Extent { min: v, max: v }),
            Some(e) => Some(Extent {
                min: e.min.min(v),
                max: e.max.max(v),
            }),
        })
}

/// Linear bucket for `value` on a `[0, max]` scale split into `buckets` slots.
///
/// The index is clamped to `buckets - 1`, so `value == max` lands in the top
/// slot. Negative or undefined ratios fall into slot 0.
pub fn bucket_index(value: f64, max: f64, buckets: usize) -> usize {
    if buckets == 0 {
        return 0;
    }
    if !(max > 0.0) {
        return 0;
    }
    let scaled = (value / max * buckets as f64).floor();
    if !(scaled >= 0.0) {
        return 0;
    }
    (scaled as usize).min(buckets - 1)
}

/// Ordered display colors, lowest bucket first.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<String>,
}

impl Palette {
    pub fn new(colors: Vec<String>) -> Self {
        Self { colors }
    }

    pub fn bucket(&self, value: f64, extent: Extent) -> usize {
        bucket_index(value, extent.max, self.colors.len())
    }

    pub fn color_for(&self, value: f64, extent: Extent) -> Option<&str> {
        self.colors
            .get(self.bucket(value, extent))
            .map(String::as_str)
    }
}
