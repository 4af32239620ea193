//! Record grouping and aggregate statistics.
//!
//! This module partitions records by business and campaign and computes the
//! per-group and global baselines the classifier compares against.

use crate::analysis::normalize::{has_rate, parse_count, parse_percent};
use crate::error::DiagnosticError;
use crate::models::{GroupMetrics, Quadrant, QuadrantDistribution, Record, ALL_BUSINESSES};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Records bucketed by key, in first-occurrence order.
#[derive(Debug, Clone, Default)]
pub struct Groups<'a> {
    index: HashMap<String, usize>,
    buckets: Vec<(String, Vec<&'a Record>)>,
}

impl<'a> Groups<'a> {
    /// Iterate `(key, records)` pairs in first-occurrence order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[&'a Record])> {
        self.buckets
            .iter()
            .map(|(key, records)| (key.as_str(), records.as_slice()))
    }
}

/// Group records by an arbitrary key.
pub fn group_by<'a, I, F>(records: I, key_fn: F) -> Groups<'a>
where
    I: IntoIterator<Item = &'a Record>,
    F: Fn(&Record) -> &str,
{
    let mut groups = Groups::default();

    for record in records {
        let key = key_fn(record);
        match groups.index.get(key) {
            Some(&position) => groups.buckets[position].1.push(record),
            None => {
                groups.index.insert(key.to_string(), groups.buckets.len());
                groups.buckets.push((key.to_string(), vec![record]));
            }
        }
    }

    groups
}

/// Mean of one rate field over the records where it is valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RateAverage {
    /// Mean in percent units (0-100), or 0 when nothing was valid.
    pub mean: f64,
    pub valid: usize,
    pub missing: usize,
}

/// Average a rate field. Blank, malformed and zero cells are missing.
pub fn average_rate<'a, I, F>(records: I, field: F) -> RateAverage
where
    I: IntoIterator<Item = &'a Record>,
    F: Fn(&Record) -> Option<&str>,
{
    let mut sum = 0.0;
    let mut average = RateAverage::default();

    for record in records {
        let raw = field(record);
        if has_rate(raw) {
            sum += parse_percent(raw) * 100.0;
            average.valid += 1;
        } else {
            average.missing += 1;
        }
    }

    if average.valid > 0 {
        average.mean = sum / average.valid as f64;
    }
    average
}

fn csat_field(record: &Record) -> Option<&str> {
    record.csat_rate.as_deref()
}

fn adherence_field(record: &Record) -> Option<&str> {
    record.adherence_rate.as_deref()
}

/// Tally records per quadrant.
pub fn quadrant_distribution<'a, I>(records: I) -> QuadrantDistribution
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut distribution = QuadrantDistribution::default();
    for record in records {
        distribution.record(record.quadrant);
    }
    distribution
}

/// Compute the metrics of one group.
pub fn group_metrics(key: &str, records: &[&Record]) -> GroupMetrics {
    let csat = average_rate(records.iter().copied(), csat_field);
    let adherence = average_rate(records.iter().copied(), adherence_field);
    let quadrants = quadrant_distribution(records.iter().copied());

    GroupMetrics {
        key: key.to_string(),
        count: records.len(),
        promoters: records
            .iter()
            .map(|r| parse_count(r.promoter_count.as_deref()))
            .sum(),
        detractors: records
            .iter()
            .map(|r| parse_count(r.detractor_count.as_deref()))
            .sum(),
        avg_csat: csat.mean,
        avg_adherence: adherence.mean,
        missing_csat: csat.missing,
        missing_adherence: adherence.missing,
        quadrants,
        q3_share: quadrants.share(Quadrant::Q3),
        q4_share: quadrants.share(Quadrant::Q4),
    }
}

/// Metrics for every group, in first-occurrence order.
pub fn metrics_for(groups: &Groups<'_>) -> Vec<GroupMetrics> {
    groups
        .iter()
        .map(|(key, records)| group_metrics(key, records))
        .collect()
}

/// Everything computed from one filtered record set, before classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    pub scope: String,
    pub total: usize,
    pub quadrants: QuadrantDistribution,
    pub csat: RateAverage,
    pub adherence: RateAverage,
    pub campaigns: Vec<GroupMetrics>,
    pub businesses: Vec<GroupMetrics>,
}

/// Aggregate the records matching `business` (or all records).
///
/// An empty input is [`DiagnosticError::EmptyDataset`]; a filter that
/// matches nothing is [`DiagnosticError::NoMatchingRecords`].
pub fn aggregate(records: &[Record], business: Option<&str>) -> Result<Aggregate, DiagnosticError> {
    if records.is_empty() {
        return Err(DiagnosticError::EmptyDataset);
    }

    let business = business.map(str::trim).filter(|b| !b.is_empty());
    let selected: Vec<&Record> = match business {
        Some(label) => records.iter().filter(|r| r.business == label).collect(),
        None => records.iter().collect(),
    };

    if selected.is_empty() {
        return Err(DiagnosticError::NoMatchingRecords {
            business: business.unwrap_or_default().to_string(),
        });
    }

    let by_campaign = group_by(selected.iter().copied(), |r| r.campaign.as_str());
    let by_business = group_by(selected.iter().copied(), |r| r.business.as_str());

    let aggregate = Aggregate {
        scope: business.unwrap_or(ALL_BUSINESSES).to_string(),
        total: selected.len(),
        quadrants: quadrant_distribution(selected.iter().copied()),
        csat: average_rate(selected.iter().copied(), csat_field),
        adherence: average_rate(selected.iter().copied(), adherence_field),
        campaigns: metrics_for(&by_campaign),
        businesses: metrics_for(&by_business),
    };

    debug!(
        "Aggregated {} records for {} ({} campaigns, {} businesses)",
        aggregate.total,
        aggregate.scope,
        aggregate.campaigns.len(),
        aggregate.businesses.len()
    );

    Ok(aggregate)
}
