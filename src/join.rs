use crate::types::{Region, StatRecord};
use std::collections::HashMap;

/// Position of the first item carrying each identifier. Later duplicates are
/// ignored, so lookups through this map match a front-to-back scan.
pub fn first_occurrence(ids: impl IntoIterator<Item = u32>) -> HashMap<u32, usize> {
    let ids = ids.into_iter();
    let mut index = HashMap::with_capacity(ids.size_hint().0);
    for (i, id) in ids.enumerate() {
        index.entry(id).or_insert(i);
    }
    index
}

/// Identifier lookup over a statistics collection.
pub struct StatIndex<'a> {
    records: &'a [StatRecord],
    by_fips: HashMap<u32, usize>,
}

impl<'a> StatIndex<'a> {
    pub fn build(records: &'a [StatRecord]) -> Self {
        Self {
            records,
            by_fips: first_occurrence(records.iter().map(|r| r.fips)),
        }
    }

    pub fn get(&self, fips: u32) -> Option<&'a StatRecord> {
        self.by_fips.get(&fips).map(|&i| &self.records[i])
    }

    /// First record whose identifier equals the region's.
    pub fn join(&self, region: &Region) -> Option<&'a StatRecord> {
        self.get(region.id)
    }
}
