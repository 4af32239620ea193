//! Per-audience message assembly.

use super::generator::{render, RenderOptions};
use crate::models::{Audience, DiagnosticResult};
use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

/// The structured message handed to a delivery sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticMessage {
    /// Audience id, used as channel or file stem.
    pub audience_id: String,
    /// Short title naming the scope.
    pub title: String,
    /// Full rendered diagnostic.
    pub text: String,
    /// One-line summary for secondary display elements.
    pub summary: String,
    /// Static cover image, identical for every audience.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A rendered message together with the result it was rendered from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudienceReport {
    pub message: DiagnosticMessage,
    pub result: DiagnosticResult,
}

impl AudienceReport {
    /// Serialize the report as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }
}

/// Title naming the scope of a result.
pub fn title(result: &DiagnosticResult) -> String {
    format!("📊 Strategic Diagnostic - {}", result.scope)
}

/// Averages and record count on a single line.
pub fn summary_line(result: &DiagnosticResult) -> String {
    format!(
        "CSAT {:.1}% | Adherence {:.1}% | {} analysts",
        result.avg_csat, result.avg_adherence, result.total
    )
}

/// Build the message for one audience.
pub fn build_message(
    result: &DiagnosticResult,
    audience: &Audience,
    cutoff: NaiveDate,
    options: &RenderOptions,
    image_url: Option<&str>,
) -> DiagnosticMessage {
    DiagnosticMessage {
        audience_id: audience.id.clone(),
        title: title(result),
        text: render(result, audience, cutoff, options),
        summary: summary_line(result),
        image_url: image_url.map(String::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::diagnose_records;
    use crate::models::{Record, Thresholds};

    fn result() -> DiagnosticResult {
        let records = vec![
            Record::new(Some("Retail"), Some("X"), Some("Q1"))
                .with_csat(Some("80%"))
                .with_adherence(Some("90%")),
            Record::new(Some("Retail"), Some("X"), Some("Q2"))
                .with_csat(Some("60%"))
                .with_adherence(Some("")),
        ];
        diagnose_records(&records, Some("Retail"), &Thresholds::default()).unwrap()
    }

    #[test]
    fn test_build_message() {
        let mut audience = Audience::everyone("C0RETAIL", "Ana");
        audience.business = Some("Retail".to_string());
        let cutoff = NaiveDate::from_ymd_opt(2025, 4, 30).unwrap();

        let message = build_message(
            &result(),
            &audience,
            cutoff,
            &RenderOptions::default(),
            Some("https://example.com/cover.png"),
        );

        assert_eq!(message.audience_id, "C0RETAIL");
        assert_eq!(message.title, "📊 Strategic Diagnostic - Retail");
        assert_eq!(message.summary, "CSAT 70.0% | Adherence 90.0% | 2 analysts");
        assert!(message.text.contains("Hello, Ana!"));
        assert_eq!(
            message.image_url.as_deref(),
            Some("https://example.com/cover.png")
        );
    }

    #[test]
    fn test_report_json() {
        let audience = Audience::everyone("C1", "Ana");
        let cutoff = NaiveDate::from_ymd_opt(2025, 4, 30).unwrap();
        let result = result();
        let report = AudienceReport {
            message: build_message(&result, &audience, cutoff, &RenderOptions::default(), None),
            result,
        };

        let json = report.to_json().unwrap();
        assert!(json.contains("\"audience_id\": \"C1\""));
        assert!(json.contains("\"q3_offenders\""));
        assert!(!json.contains("\"image_url\""));
    }
}
