//! Data models for the campaign diagnostic.
//!
//! This module contains the record type consumed by the engine and the
//! derived metrics, offenders and results it produces.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label used when a record carries no business or campaign.
pub const UNSPECIFIED: &str = "unspecified";

/// Scope label of an audience that reads the whole dataset.
pub const ALL_BUSINESSES: &str = "All businesses";

/// Performance quadrant assigned to an analyst upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    Q1,
    Q2,
    Q3,
    Q4,
    /// Absent or unrecognized quadrant value.
    None,
}

impl Quadrant {
    /// Every bucket, in report order.
    pub const ALL: [Quadrant; 5] = [
        Quadrant::Q1,
        Quadrant::Q2,
        Quadrant::Q3,
        Quadrant::Q4,
        Quadrant::None,
    ];

    /// Map a raw cell to a quadrant. Anything but Q1..Q4 lands in `None`.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Quadrant::None;
        };
        match raw.trim().to_ascii_uppercase().as_str() {
            "Q1" => Quadrant::Q1,
            "Q2" => Quadrant::Q2,
            "Q3" => Quadrant::Q3,
            "Q4" => Quadrant::Q4,
            _ => Quadrant::None,
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quadrant::Q1 => write!(f, "Q1"),
            Quadrant::Q2 => write!(f, "Q2"),
            Quadrant::Q3 => write!(f, "Q3"),
            Quadrant::Q4 => write!(f, "Q4"),
            Quadrant::None => write!(f, "none"),
        }
    }
}

/// One analyst-period observation as read from the source table.
///
/// Rates and counts stay in their raw textual form; they are normalized on
/// demand by [`crate::analysis::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub business: String,
    pub campaign: String,
    pub quadrant: Quadrant,
    pub csat_rate: Option<String>,
    pub adherence_rate: Option<String>,
    pub promoter_count: Option<String>,
    pub detractor_count: Option<String>,
}

impl Record {
    /// Build a record from its identifying cells. Blank labels become
    /// [`UNSPECIFIED`].
    pub fn new(business: Option<&str>, campaign: Option<&str>, quadrant: Option<&str>) -> Self {
        Self {
            business: label_or_unspecified(business),
            campaign: label_or_unspecified(campaign),
            quadrant: Quadrant::parse(quadrant),
            csat_rate: None,
            adherence_rate: None,
            promoter_count: None,
            detractor_count: None,
        }
    }

    pub fn with_csat(mut self, raw: Option<&str>) -> Self {
        self.csat_rate = raw.map(String::from);
        self
    }

    pub fn with_adherence(mut self, raw: Option<&str>) -> Self {
        self.adherence_rate = raw.map(String::from);
        self
    }

    pub fn with_promoters(mut self, raw: Option<&str>) -> Self {
        self.promoter_count = raw.map(String::from);
        self
    }

    pub fn with_detractors(mut self, raw: Option<&str>) -> Self {
        self.detractor_count = raw.map(String::from);
        self
    }
}

fn label_or_unspecified(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => UNSPECIFIED.to_string(),
    }
}

/// Tally of records per quadrant bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QuadrantDistribution {
    pub q1: usize,
    pub q2: usize,
    pub q3: usize,
    pub q4: usize,
    pub none: usize,
}

impl QuadrantDistribution {
    /// Count one record in its bucket.
    pub fn record(&mut self, quadrant: Quadrant) {
        match quadrant {
            Quadrant::Q1 => self.q1 += 1,
            Quadrant::Q2 => self.q2 += 1,
            Quadrant::Q3 => self.q3 += 1,
            Quadrant::Q4 => self.q4 += 1,
            Quadrant::None => self.none += 1,
        }
    }

    pub fn count(&self, quadrant: Quadrant) -> usize {
        match quadrant {
            Quadrant::Q1 => self.q1,
            Quadrant::Q2 => self.q2,
            Quadrant::Q3 => self.q3,
            Quadrant::Q4 => self.q4,
            Quadrant::None => self.none,
        }
    }

    pub fn total(&self) -> usize {
        self.q1 + self.q2 + self.q3 + self.q4 + self.none
    }

    /// Percentage (0-100) of all tallied records that sit in `quadrant`.
    pub fn share(&self, quadrant: Quadrant) -> f64 {
        percentage(self.count(quadrant), self.total())
    }
}

/// `part / whole * 100`, or 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Aggregated metrics of one business or one campaign.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMetrics {
    /// Business or campaign label.
    pub key: String,
    /// Number of records in the group.
    pub count: usize,
    pub promoters: u64,
    pub detractors: u64,
    /// Mean CSAT in percent units, over records with a valid rate.
    pub avg_csat: f64,
    /// Mean adherence in percent units, over records with a valid rate.
    pub avg_adherence: f64,
    pub missing_csat: usize,
    pub missing_adherence: usize,
    pub quadrants: QuadrantDistribution,
    /// Percentage of the group's records in Q3.
    pub q3_share: f64,
    /// Percentage of the group's records in Q4.
    pub q4_share: f64,
}

/// A campaign flagged below the global baselines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Offender {
    pub campaign: String,
    /// Records in the campaign.
    pub count: usize,
    /// Records of the campaign inside the offending quadrant.
    pub quadrant_count: usize,
    /// `quadrant_count` as a percentage of `count`.
    pub share: f64,
    pub avg_csat: f64,
    pub avg_adherence: f64,
}

/// Full output of one aggregation pass for one audience filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticResult {
    /// Business label the records were filtered by, or [`ALL_BUSINESSES`].
    pub scope: String,
    pub total: usize,
    pub quadrants: QuadrantDistribution,
    pub avg_csat: f64,
    pub avg_adherence: f64,
    pub missing_csat: usize,
    pub missing_adherence: usize,
    /// Ranked campaigns matching the Q3 rule.
    pub q3_offenders: Vec<Offender>,
    /// Ranked campaigns matching the Q4 rule.
    pub q4_offenders: Vec<Offender>,
    pub campaigns: Vec<GroupMetrics>,
    pub businesses: Vec<GroupMetrics>,
}

impl DiagnosticResult {
    /// Percentage of records in Q1 or Q2.
    pub fn top_quadrant_share(&self) -> f64 {
        percentage(self.quadrants.q1 + self.quadrants.q2, self.total)
    }
}

/// Caller-tunable classification and rendering thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum records a campaign needs before it can be flagged.
    #[serde(default = "default_min_campaign_records")]
    pub min_campaign_records: usize,

    /// Q1+Q2 share (percent) at which the report adds its marker.
    #[serde(default = "default_healthy_share_pct")]
    pub healthy_share_pct: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_campaign_records: default_min_campaign_records(),
            healthy_share_pct: default_healthy_share_pct(),
        }
    }
}

fn default_min_campaign_records() -> usize {
    3
}

fn default_healthy_share_pct() -> f64 {
    30.0
}

/// Per-audience threshold overrides. Unset fields inherit the run's values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_campaign_records: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthy_share_pct: Option<f64>,
}

impl ThresholdOverrides {
    /// Layer the set fields over `base`.
    pub fn apply(&self, base: Thresholds) -> Thresholds {
        Thresholds {
            min_campaign_records: self
                .min_campaign_records
                .unwrap_or(base.min_campaign_records),
            healthy_share_pct: self.healthy_share_pct.unwrap_or(base.healthy_share_pct),
        }
    }
}

/// A recipient of one filtered report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audience {
    /// Delivery identifier (a Slack channel id, or a file stem).
    pub id: String,

    /// Name used in the greeting line.
    pub display_name: String,

    /// Business the report is restricted to. Absent means everything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business: Option<String>,

    /// Per-audience overrides of the global thresholds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<ThresholdOverrides>,
}

impl Audience {
    /// An audience that reads the whole dataset.
    pub fn everyone(id: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            business: None,
            thresholds: None,
        }
    }

    /// The trimmed business filter, with blank treated as no filter.
    pub fn business_filter(&self) -> Option<&str> {
        self.business
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
    }

    /// Label naming the scope of this audience's report.
    pub fn scope_label(&self) -> &str {
        self.business_filter().unwrap_or(ALL_BUSINESSES)
    }
}
