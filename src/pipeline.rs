//! Audience loop.
//!
//! Runs the engine once per audience over one immutable record set. The
//! aggregate of a business filter is computed once and shared by every
//! audience asking for the same filter.

use crate::analysis::{aggregate, diagnose, Aggregate};
use crate::config::Config;
use crate::error::DiagnosticError;
use crate::models::{Audience, Record, Thresholds};
use crate::report::{build_message, AudienceReport, RenderOptions};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Settings shared by every audience of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Defaults for audiences without their own thresholds.
    pub thresholds: Thresholds,
    pub top_offenders: usize,
    pub top_campaigns: usize,
    pub image_url: Option<String>,
    /// Date printed as the data cut-off.
    pub cutoff: NaiveDate,
}

impl RunOptions {
    pub fn from_config(config: &Config, cutoff: NaiveDate) -> Self {
        Self {
            thresholds: config.thresholds,
            top_offenders: config.report.top_offenders,
            top_campaigns: config.report.top_campaigns,
            image_url: config.report.image_url.clone(),
            cutoff,
        }
    }

    fn render_options(&self, thresholds: &Thresholds) -> RenderOptions {
        RenderOptions {
            top_offenders: self.top_offenders,
            top_campaigns: self.top_campaigns,
            healthy_share_pct: thresholds.healthy_share_pct,
        }
    }
}

/// An audience that produced no report.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedAudience {
    pub audience_id: String,
    pub reason: DiagnosticError,
}

/// Everything one run produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub reports: Vec<AudienceReport>,
    pub skipped: Vec<SkippedAudience>,
    /// Set when cancellation stopped the loop before the last audience.
    pub cancelled: bool,
}

/// Diagnose and render every audience in order.
///
/// `cancel` is checked before each audience; a set flag stops the loop and
/// returns what was produced so far.
pub fn run_audiences(
    records: &[Record],
    audiences: &[Audience],
    options: &RunOptions,
    cancel: &AtomicBool,
) -> Result<RunSummary, DiagnosticError> {
    if records.is_empty() {
        return Err(DiagnosticError::EmptyDataset);
    }

    let mut summary = RunSummary::default();
    let mut cache: HashMap<Option<String>, Result<Aggregate, DiagnosticError>> = HashMap::new();

    for audience in audiences {
        if cancel.load(Ordering::SeqCst) {
            warn!(
                "Cancelled before audience {}; {} audiences left unprocessed",
                audience.id,
                audiences.len() - summary.reports.len() - summary.skipped.len()
            );
            summary.cancelled = true;
            break;
        }

        let filter = audience.business_filter();
        let key = filter.map(String::from);
        if cache.contains_key(&key) {
            debug!("Reusing aggregate for {}", audience.scope_label());
        }
        let aggregated = cache
            .entry(key)
            .or_insert_with(|| aggregate(records, filter));

        let aggregated = match &*aggregated {
            Ok(aggregated) => aggregated,
            Err(err) if err.is_recoverable() => {
                warn!("Skipping audience {}: {}", audience.id, err);
                summary.skipped.push(SkippedAudience {
                    audience_id: audience.id.clone(),
                    reason: err.clone(),
                });
                continue;
            }
            Err(err) => return Err(err.clone()),
        };

        let thresholds = match audience.thresholds {
            Some(overrides) => overrides.apply(options.thresholds),
            None => options.thresholds,
        };
        let result = diagnose(aggregated, &thresholds);
        let message = build_message(
            &result,
            audience,
            options.cutoff,
            &options.render_options(&thresholds),
            options.image_url.as_deref(),
        );

        info!(
            "Rendered diagnostic for {} ({}): {} records, {} Q3 and {} Q4 offenders",
            audience.id,
            result.scope,
            result.total,
            result.q3_offenders.len(),
            result.q4_offenders.len()
        );

        summary.reports.push(AudienceReport { message, result });
    }

    Ok(summary)
}
