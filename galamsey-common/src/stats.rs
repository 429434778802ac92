//! Aggregate statistics over site records
//!
//! Pure functions: callers load the records (all of them, or one batch)
//! and these compute the totals. Region output is ordered by region name.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::db::SiteRecord;

/// Mean site count for one region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionAverage {
    #[serde(rename = "Region")]
    pub region: String,
    pub avg_sites: f64,
}

/// Summed site count for one region
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionTotal {
    #[serde(rename = "Region")]
    pub region: String,
    pub total_sites: i64,
}

/// The region with the most sites
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopRegion {
    pub region: String,
    pub total_galamsey_sites: i64,
}

/// Analysis block returned with every upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub total_galamsey_sites: Option<i64>,
    pub average_galamsey_sites_per_region: Vec<RegionAverage>,
    pub region_with_highest_galamsey_sites: Option<TopRegion>,
    pub threshold: Option<i64>,
    /// Present only when a threshold was supplied
    pub regions_above_threshold: Option<Vec<RegionTotal>>,
}

#[derive(Debug, Clone, Copy, Default)]
struct RegionGroup {
    sum: i64,
    count: i64,
}

fn group_by_region(records: &[SiteRecord]) -> BTreeMap<&str, RegionGroup> {
    let mut groups: BTreeMap<&str, RegionGroup> = BTreeMap::new();
    for record in records {
        let group = groups.entry(record.region.as_str()).or_default();
        group.sum = group.sum.saturating_add(record.site_count);
        group.count += 1;
    }
    groups
}

/// Sum of all site counts; `None` when there are no records
pub fn total_sites(records: &[SiteRecord]) -> Option<i64> {
    if records.is_empty() {
        return None;
    }
    Some(
        records
            .iter()
            .fold(0i64, |acc, r| acc.saturating_add(r.site_count)),
    )
}

/// Mean site count per region
pub fn average_per_region(records: &[SiteRecord]) -> Vec<RegionAverage> {
    group_by_region(records)
        .into_iter()
        .map(|(region, group)| RegionAverage {
            region: region.to_string(),
            avg_sites: group.sum as f64 / group.count as f64,
        })
        .collect()
}

/// Region with the largest summed site count
///
/// Ties go to the region with fewer records (higher average), then to the
/// lexicographically lowest region name.
pub fn top_region(records: &[SiteRecord]) -> Option<TopRegion> {
    let mut best: Option<(&str, RegionGroup)> = None;

    // BTreeMap iterates in ascending name order, so only a strictly better
    // group replaces the current best.
    for (region, group) in group_by_region(records) {
        let better = match best {
            None => true,
            Some((_, current)) => {
                group.sum > current.sum
                    || (group.sum == current.sum && group.count < current.count)
            }
        };
        if better {
            best = Some((region, group));
        }
    }

    best.map(|(region, group)| TopRegion {
        region: region.to_string(),
        total_galamsey_sites: group.sum,
    })
}

/// Regions whose summed site count is strictly greater than `threshold`
pub fn regions_above_threshold(records: &[SiteRecord], threshold: i64) -> Vec<RegionTotal> {
    group_by_region(records)
        .into_iter()
        .filter(|(_, group)| group.sum > threshold)
        .map(|(region, group)| RegionTotal {
            region: region.to_string(),
            total_sites: group.sum,
        })
        .collect()
}

/// All four aggregates at once
pub fn analyze(records: &[SiteRecord], threshold: Option<i64>) -> Analysis {
    Analysis {
        total_galamsey_sites: total_sites(records),
        average_galamsey_sites_per_region: average_per_region(records),
        region_with_highest_galamsey_sites: top_region(records),
        threshold,
        regions_above_threshold: threshold.map(|t| regions_above_threshold(records, t)),
    }
}
