//! Analysis modules.
//!
//! Normalization, grouping, aggregation and offender classification. Nothing
//! in here performs I/O.

pub mod aggregator;
pub mod classifier;
pub mod normalize;

pub use aggregator::{aggregate, Aggregate};
pub use classifier::rank_offenders;

use crate::models::{DiagnosticResult, Thresholds};
#[cfg(test)]
use crate::{error::DiagnosticError, models::Record};

/// Classify an already computed aggregate into a full result.
pub fn diagnose(aggregate: &Aggregate, thresholds: &Thresholds) -> DiagnosticResult {
    let ranking = rank_offenders(
        &aggregate.campaigns,
        aggregate.csat.mean,
        aggregate.adherence.mean,
        thresholds.min_campaign_records,
    );

    DiagnosticResult {
        scope: aggregate.scope.clone(),
        total: aggregate.total,
        quadrants: aggregate.quadrants,
        avg_csat: aggregate.csat.mean,
        avg_adherence: aggregate.adherence.mean,
        missing_csat: aggregate.csat.missing,
        missing_adherence: aggregate.adherence.missing,
        q3_offenders: ranking.q3,
        q4_offenders: ranking.q4,
        campaigns: aggregate.campaigns.clone(),
        businesses: aggregate.businesses.clone(),
    }
}

/// Aggregate and classify in one step.
#[cfg(test)]
pub fn diagnose_records(
    records: &[Record],
    business: Option<&str>,
    thresholds: &Thresholds,
) -> Result<DiagnosticResult, DiagnosticError> {
    let aggregate = aggregate(records, business)?;
    Ok(diagnose(&aggregate, thresholds))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(business: &str, campaign: &str, quadrant: &str, csat: &str, adherence: &str) -> Record {
        Record::new(Some(business), Some(campaign), Some(quadrant))
            .with_csat(Some(csat))
            .with_adherence(Some(adherence))
    }

    #[test]
    fn test_four_record_scenario() {
        let records = vec![
            record("A", "X", "Q1", "80%", "90%"),
            record("A", "X", "Q3", "50%", "95%"),
            record("A", "X", "Q3", "40%", "92%"),
            record("A", "Y", "Q4", "30%", "20%"),
        ];

        let result = diagnose_records(&records, None, &Thresholds::default()).unwrap();

        assert!((result.avg_csat - 50.0).abs() < 1e-9);
        assert!((result.avg_adherence - 74.25).abs() < 1e-9);
        assert_eq!(result.total, 4);
        // X sits above the CSAT baseline; Y has a single record.
        assert!(result.q3_offenders.is_empty());
        assert!(result.q4_offenders.is_empty());
        assert_eq!(result.campaigns.len(), 2);
    }

    #[test]
    fn test_offenders_detected_against_baseline() {
        let mut records = Vec::new();
        for _ in 0..3 {
            records.push(record("A", "Good", "Q1", "90%", "90%"));
        }
        for q in ["Q3", "Q3", "Q1"] {
            records.push(record("A", "Friendly", q, "40%", "95%"));
        }
        for q in ["Q4", "Q4", "Q4", "Q2"] {
            records.push(record("A", "Lost", q, "35%", "30%"));
        }

        let result = diagnose_records(&records, None, &Thresholds::default()).unwrap();

        assert_eq!(result.q3_offenders.len(), 1);
        assert_eq!(result.q3_offenders[0].campaign, "Friendly");
        assert_eq!(result.q3_offenders[0].quadrant_count, 2);
        assert_eq!(result.q4_offenders.len(), 1);
        assert_eq!(result.q4_offenders[0].campaign, "Lost");
        assert!((result.q4_offenders[0].share - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_diagnosis_is_idempotent() {
        let records = vec![
            record("A", "X", "Q1", "80,5%", "90%"),
            record("B", "Y", "q2", "", "91%"),
            record("A", "X", "Q3", "50%", "abc"),
            record("", "", "", "33,3%", "20%"),
        ];
        let thresholds = Thresholds::default();

        let first = diagnose_records(&records, None, &thresholds).unwrap();
        let second = diagnose_records(&records, None, &thresholds).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.quadrants.total(), records.len());
        assert_eq!(first.missing_csat, 1);
        assert_eq!(first.missing_adherence, 1);
    }

    #[test]
    fn test_no_matching_business_is_sentinel() {
        let records = vec![record("A", "X", "Q1", "80%", "90%")];
        let result = diagnose_records(&records, Some("Z"), &Thresholds::default());
        assert!(matches!(
            result,
            Err(DiagnosticError::NoMatchingRecords { .. })
        ));
    }
}
