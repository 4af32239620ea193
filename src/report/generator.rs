//! Diagnostic text generation.
//!
//! The output uses Slack mrkdwn (`*bold*`, `_italic_`) so the same text reads
//! well in a terminal, a file, or a chat message.

use crate::models::{Audience, DiagnosticResult, GroupMetrics, Offender, Quadrant};
use chrono::NaiveDate;

/// Fixed note printed under the header of every report.
pub const ADVISORY_NOTE: &str = "_This diagnostic is generated automatically from the latest \
performance base. Use it to guide conversations with supervisors, not as a final verdict._";

/// Appended to the Q1+Q2 line when the share reaches the threshold.
pub const HEALTHY_SHARE_MARKER: &str = " ✅";

/// Rendering knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Offender lines per rule.
    pub top_offenders: usize,
    /// Campaign summary lines.
    pub top_campaigns: usize,
    /// Q1+Q2 share (percent) at which the marker is shown.
    pub healthy_share_pct: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            top_offenders: 3,
            top_campaigns: 5,
            healthy_share_pct: 30.0,
        }
    }
}

/// Render the full diagnostic text for one audience.
pub fn render(
    result: &DiagnosticResult,
    audience: &Audience,
    cutoff: NaiveDate,
    options: &RenderOptions,
) -> String {
    let mut output = String::new();

    output.push_str(&format!("Hello, {}! 👋\n\n", audience.display_name));
    output.push_str(&format!("*📊 Strategic Diagnostic - {}*\n", result.scope));
    output.push_str(ADVISORY_NOTE);
    output.push('\n');
    output.push_str(&format!("📅 Data up to: {}\n\n", cutoff.format("%d/%m/%Y")));

    output.push_str(&generate_quadrant_section(result));
    output.push_str(&generate_warning_section(result));
    output.push_str(&generate_baseline_section(result, options.healthy_share_pct));

    output.push_str(&generate_offender_section(
        "*🔻 Campaigns with CSAT below average and adherence at or above average (Q3)*",
        &result.q3_offenders,
        options.top_offenders,
    ));
    output.push_str(&generate_offender_section(
        "*🔻 Campaigns with CSAT and adherence below average (Q4)*",
        &result.q4_offenders,
        options.top_offenders,
    ));
    output.push_str(&generate_campaign_section(
        &result.campaigns,
        options.top_campaigns,
    ));

    // Sections end with a blank separator line; drop the trailing one.
    let trimmed = output.trim_end().len();
    output.truncate(trimmed);
    output.push('\n');
    output
}

/// Generate the quadrant distribution section.
fn generate_quadrant_section(result: &DiagnosticResult) -> String {
    let mut section = String::new();

    section.push_str("*Quadrant distribution*\n");
    for quadrant in Quadrant::ALL {
        if quadrant == Quadrant::None {
            continue;
        }
        section.push_str(&format!(
            "• {}: {}\n",
            quadrant,
            result.quadrants.count(quadrant)
        ));
    }
    section.push('\n');

    section
}

/// Generate the data-quality warning block.
fn generate_warning_section(result: &DiagnosticResult) -> String {
    let mut section = String::new();

    section.push_str("⚠️ *Data warning*\n");
    section.push_str(&format!("• Records analysed: {}\n", result.total));
    section.push_str(&format!("• Missing CSAT: {}\n", result.missing_csat));
    section.push_str(&format!("• Missing adherence: {}\n", result.missing_adherence));
    section.push('\n');

    section
}

/// Generate the Q1+Q2 share and the global averages.
fn generate_baseline_section(result: &DiagnosticResult, healthy_share_pct: f64) -> String {
    let mut section = String::new();

    let share = result.top_quadrant_share();
    let marker = if share >= healthy_share_pct {
        HEALTHY_SHARE_MARKER
    } else {
        ""
    };

    section.push_str(&format!("*Analysts in Q1+Q2:* {:.1}%{}\n", share, marker));
    section.push_str(&format!("*Average adherence:* {:.1}%\n", result.avg_adherence));
    section.push_str(&format!("*Average CSAT:* {:.1}%\n", result.avg_csat));
    section.push('\n');

    section
}

/// Format one offender line.
pub fn offender_line(offender: &Offender) -> String {
    format!(
        "{} - {} analysts ({:.1}%)",
        offender.campaign, offender.quadrant_count, offender.share
    )
}

/// Generate an offender section, or nothing when the list is empty.
fn generate_offender_section(title: &str, offenders: &[Offender], limit: usize) -> String {
    if offenders.is_empty() || limit == 0 {
        return String::new();
    }

    let mut section = String::new();

    section.push_str(title);
    section.push('\n');
    for offender in offenders.iter().take(limit) {
        section.push_str(&format!("• {}\n", offender_line(offender)));
    }
    section.push('\n');

    section
}

/// Format one campaign summary line.
pub fn campaign_line(campaign: &GroupMetrics) -> String {
    format!(
        "{}: {} analysts (CSAT: {:.1}%, Adherence: {:.1}%)",
        campaign.key, campaign.count, campaign.avg_csat, campaign.avg_adherence
    )
}

/// Largest campaigns first; equal sizes keep first-occurrence order.
pub fn largest_campaigns(campaigns: &[GroupMetrics], limit: usize) -> Vec<&GroupMetrics> {
    let mut sorted: Vec<&GroupMetrics> = campaigns.iter().collect();
    sorted.sort_by_key(|c| std::cmp::Reverse(c.count));
    sorted.truncate(limit);
    sorted
}

/// Generate the campaign summary section, or nothing without campaigns.
fn generate_campaign_section(campaigns: &[GroupMetrics], limit: usize) -> String {
    let largest = largest_campaigns(campaigns, limit);
    if largest.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("*📋 Largest campaigns*\n");
    for campaign in largest {
        section.push_str(&format!("• {}\n", campaign_line(campaign)));
    }
    section.push('\n');

    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::diagnose_records;
    use crate::models::{Record, Thresholds};

    fn record(campaign: &str, quadrant: &str, csat: &str, adherence: &str) -> Record {
        Record::new(Some("A"), Some(campaign), Some(quadrant))
            .with_csat(Some(csat))
            .with_adherence(Some(adherence))
    }

    fn cutoff() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 30).unwrap()
    }

    fn scenario_result() -> DiagnosticResult {
        let records = vec![
            record("X", "Q1", "80%", "90%"),
            record("X", "Q3", "50%", "95%"),
            record("X", "Q3", "40%", "92%"),
            record("Y", "Q4", "30%", "20%"),
        ];
        diagnose_records(&records, None, &Thresholds::default()).unwrap()
    }

    fn offender_result() -> DiagnosticResult {
        let mut records = Vec::new();
        for _ in 0..3 {
            records.push(record("Good", "Q1", "90%", "90%"));
        }
        for q in ["Q3", "Q3", "Q1"] {
            records.push(record("Friendly", q, "40%", "95%"));
        }
        for q in ["Q4", "Q4", "Q4", "Q2"] {
            records.push(record("Lost", q, "35%", "30%"));
        }
        diagnose_records(&records, None, &Thresholds::default()).unwrap()
    }

    #[test]
    fn test_render_scenario_report() {
        let audience = Audience::everyone("C1", "Erick");
        let text = render(&scenario_result(), &audience, cutoff(), &RenderOptions::default());

        assert!(text.starts_with("Hello, Erick! 👋\n"));
        assert!(text.contains("*📊 Strategic Diagnostic - All businesses*"));
        assert!(text.contains(ADVISORY_NOTE));
        assert!(text.contains("📅 Data up to: 30/04/2025"));
        assert!(text.contains("• Q1: 1\n• Q2: 0\n• Q3: 2\n• Q4: 1\n"));
        assert!(text.contains("• Records analysed: 4"));
        assert!(text.contains("• Missing CSAT: 0"));
        assert!(text.contains("*Analysts in Q1+Q2:* 25.0%\n"));
        assert!(text.contains("*Average adherence:* 74."));
        assert!(text.contains("*Average CSAT:* 50.0%"));
        assert!(text.contains("• X: 3 analysts (CSAT: 56.7%, Adherence: 92.3%)"));
        assert!(text.ends_with("Adherence: 20.0%)\n"));
    }

    #[test]
    fn test_quadrant_bullets_skip_unassigned() {
        let records = vec![
            record("X", "Q2", "80%", "90%"),
            record("X", "Q5", "80%", "90%"),
            record("X", "", "80%", "90%"),
        ];
        let result = diagnose_records(&records, None, &Thresholds::default()).unwrap();
        let section = generate_quadrant_section(&result);

        assert_eq!(
            section,
            "*Quadrant distribution*\n• Q1: 0\n• Q2: 1\n• Q3: 0\n• Q4: 0\n\n"
        );
        assert_eq!(result.quadrants.none, 2);
    }

    #[test]
    fn test_render_omits_empty_offender_sections() {
        let audience = Audience::everyone("C1", "Erick");
        let text = render(&scenario_result(), &audience, cutoff(), &RenderOptions::default());

        assert!(!text.contains("(Q3)"));
        assert!(!text.contains("(Q4)"));
        assert!(!text.contains("•  \n"));
        assert!(!text.contains("\n\n\n"));
    }

    #[test]
    fn test_render_offender_sections() {
        let audience = Audience::everyone("C1", "Ana");
        let text = render(&offender_result(), &audience, cutoff(), &RenderOptions::default());

        assert!(text.contains("(Q3)*\n• Friendly - 2 analysts (66.7%)\n"));
        assert!(text.contains("(Q4)*\n• Lost - 3 analysts (75.0%)\n"));
        // 3 Q1 (Good) + 1 Q1 (Friendly) + 1 Q2 (Lost) out of 10.
        assert!(text.contains("*Analysts in Q1+Q2:* 50.0% ✅"));
        assert!(text.contains("• Lost: 4 analysts"));
    }

    #[test]
    fn test_marker_threshold_is_inclusive() {
        let audience = Audience::everyone("C1", "Ana");
        let mut options = RenderOptions::default();
        options.healthy_share_pct = 50.0;
        let text = render(&offender_result(), &audience, cutoff(), &options);
        assert!(text.contains("50.0% ✅"));

        options.healthy_share_pct = 50.1;
        let text = render(&offender_result(), &audience, cutoff(), &options);
        assert!(!text.contains("✅"));
    }

    #[test]
    fn test_largest_campaigns_sorted_and_limited() {
        let result = offender_result();
        let largest = largest_campaigns(&result.campaigns, 2);
        let names: Vec<&str> = largest.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(names, vec!["Lost", "Good"]);
    }

    #[test]
    fn test_offender_lines_truncated() {
        let result = offender_result();
        let mut many = result.clone();
        for i in 0..5 {
            let mut extra = result.q3_offenders[0].clone();
            extra.campaign = format!("Extra{}", i);
            many.q3_offenders.push(extra);
        }

        let section = generate_offender_section("*Q3*", &many.q3_offenders, 3);
        assert_eq!(section.matches("• ").count(), 3);
        assert!(generate_offender_section("*Q3*", &[], 3).is_empty());
    }
}
