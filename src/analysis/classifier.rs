//! Offender classification against global baselines.
//!
//! A campaign is an offender when its mean CSAT falls below the global mean.
//! The adherence comparison then splits offenders in two: adherence at or
//! above the baseline is the Q3 pattern, below it the Q4 pattern.

use crate::models::{GroupMetrics, Offender, Quadrant};
use std::cmp::Ordering;

/// Which offender rule a campaign matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffenderRule {
    /// Low CSAT with adherence at or above the baseline.
    Q3,
    /// Low CSAT and low adherence.
    Q4,
}

impl OffenderRule {
    /// Quadrant whose share ranks campaigns under this rule.
    pub fn quadrant(self) -> Quadrant {
        match self {
            OffenderRule::Q3 => Quadrant::Q3,
            OffenderRule::Q4 => Quadrant::Q4,
        }
    }
}

/// Both offender lists, fully ranked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OffenderRanking {
    pub q3: Vec<Offender>,
    pub q4: Vec<Offender>,
}

/// Decide which rule, if any, a campaign falls under.
pub fn classify(
    campaign: &GroupMetrics,
    global_csat: f64,
    global_adherence: f64,
    min_records: usize,
) -> Option<OffenderRule> {
    if campaign.count < min_records || campaign.avg_csat >= global_csat {
        return None;
    }
    if campaign.avg_adherence >= global_adherence {
        Some(OffenderRule::Q3)
    } else {
        Some(OffenderRule::Q4)
    }
}

fn offender(campaign: &GroupMetrics, rule: OffenderRule) -> Offender {
    let quadrant = rule.quadrant();
    Offender {
        campaign: campaign.key.clone(),
        count: campaign.count,
        quadrant_count: campaign.quadrants.count(quadrant),
        share: campaign.quadrants.share(quadrant),
        avg_csat: campaign.avg_csat,
        avg_adherence: campaign.avg_adherence,
    }
}

/// Rank by share, highest first. `sort_by` is stable, so ties keep the
/// campaigns' first-occurrence order.
fn rank(offenders: &mut [Offender]) {
    offenders.sort_by(|a, b| b.share.partial_cmp(&a.share).unwrap_or(Ordering::Equal));
}

/// Classify every campaign and return both rankings in full.
pub fn rank_offenders(
    campaigns: &[GroupMetrics],
    global_csat: f64,
    global_adherence: f64,
    min_records: usize,
) -> OffenderRanking {
    let mut ranking = OffenderRanking::default();

    for campaign in campaigns {
        match classify(campaign, global_csat, global_adherence, min_records) {
            Some(rule @ OffenderRule::Q3) => ranking.q3.push(offender(campaign, rule)),
            Some(rule @ OffenderRule::Q4) => ranking.q4.push(offender(campaign, rule)),
            None => {}
        }
    }

    rank(&mut ranking.q3);
    rank(&mut ranking.q4);
    ranking
}
