//! Delivery of rendered diagnostics.
//!
//! Rendering is done by the time a sink sees a report; sinks only move text
//! to its destination. Every report is delivered independently, so one
//! failing channel never blocks the others.

pub mod slack;

use crate::cli::{DeliveryTarget, OutputFormat};
use crate::config::Config;
use crate::report::AudienceReport;
use anyhow::{Context, Result};
use futures::future::join_all;
use slack::{SlackClient, SlackConfig};
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Destination for rendered reports.
pub enum Sink {
    Stdout { format: OutputFormat },
    Directory { dir: PathBuf, format: OutputFormat },
    Slack(SlackClient),
}

/// Result of delivering one report.
#[derive(Debug)]
pub struct DeliveryOutcome {
    pub audience_id: String,
    pub result: Result<()>,
}

impl Sink {
    /// Build the sink selected by the configuration.
    pub fn from_config(
        config: &Config,
        format: OutputFormat,
        slack_token: Option<&str>,
    ) -> Result<Self> {
        match config.delivery.target {
            DeliveryTarget::Stdout => Ok(Sink::Stdout { format }),
            DeliveryTarget::Directory => Ok(Sink::Directory {
                dir: config.general.output_dir.clone(),
                format,
            }),
            DeliveryTarget::Slack => {
                let token = slack_token
                    .filter(|t| !t.trim().is_empty())
                    .context("SLACK_BOT_TOKEN must be set to deliver to Slack")?;
                let client = SlackClient::new(SlackConfig {
                    api_url: config.delivery.slack_api_url.clone(),
                    token: token.to_string(),
                    timeout_seconds: config.delivery.timeout_seconds,
                    retries: config.delivery.retries,
                    retry_delay_ms: config.delivery.retry_delay_ms,
                })?;
                Ok(Sink::Slack(client))
            }
        }
    }

    /// Deliver one report.
    pub async fn deliver(&self, report: &AudienceReport) -> Result<()> {
        match self {
            Sink::Stdout { format } => {
                println!("{}", format_report(report, *format)?);
                Ok(())
            }
            Sink::Directory { dir, format } => {
                let path = report_path(dir, &report.message.audience_id, *format);
                tokio::fs::create_dir_all(dir)
                    .await
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                tokio::fs::write(&path, format_report(report, *format)?)
                    .await
                    .with_context(|| format!("Failed to write report to {}", path.display()))?;
                info!("Report written to {}", path.display());
                Ok(())
            }
            Sink::Slack(client) => client.post(&report.message).await,
        }
    }
}

/// Deliver every report concurrently and collect per-audience outcomes.
pub async fn deliver_all(sink: &Sink, reports: &[AudienceReport]) -> Vec<DeliveryOutcome> {
    let deliveries = reports.iter().map(|report| async move {
        let result = sink.deliver(report).await;
        if let Err(ref e) = result {
            error!("Delivery to {} failed: {:#}", report.message.audience_id, e);
        }
        DeliveryOutcome {
            audience_id: report.message.audience_id.clone(),
            result,
        }
    });

    join_all(deliveries).await
}

/// Like [`deliver_all`], but gives up once `shutdown` resolves.
///
/// Returns `None` when interrupted; deliveries still in flight are dropped.
pub async fn deliver_until<F>(
    sink: &Sink,
    reports: &[AudienceReport],
    shutdown: F,
) -> Option<Vec<DeliveryOutcome>>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        biased;

        _ = shutdown => {
            warn!("Interrupted; abandoning pending deliveries");
            None
        }
        outcomes = deliver_all(sink, reports) => Some(outcomes),
    }
}

/// Text or JSON rendition of a report.
pub fn format_report(report: &AudienceReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => report.to_json(),
        OutputFormat::Text => Ok(format!(
            "{}\n\n{}\n{}\n",
            report.message.title, report.message.text, report.message.summary
        )),
    }
}

/// File path for an audience, with characters unsafe in file names replaced.
pub fn report_path(dir: &Path, audience_id: &str, format: OutputFormat) -> PathBuf {
    let stem: String = audience_id
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let extension = match format {
        OutputFormat::Text => "txt",
        OutputFormat::Json => "json",
    };
    dir.join(format!("{}.{}", stem, extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::diagnose_records;
    use crate::models::{Audience, Record, Thresholds};
    use crate::report::{build_message, RenderOptions};
    use chrono::NaiveDate;

    fn report(id: &str) -> AudienceReport {
        let records = vec![Record::new(Some("A"), Some("X"), Some("Q1"))
            .with_csat(Some("80%"))
            .with_adherence(Some("90%"))];
        let result = diagnose_records(&records, None, &Thresholds::default()).unwrap();
        let message = build_message(
            &result,
            &Audience::everyone(id, "Erick"),
            NaiveDate::from_ymd_opt(2025, 4, 30).unwrap(),
            &RenderOptions::default(),
            None,
        );
        AudienceReport { message, result }
    }

    #[test]
    fn test_report_path_sanitizes_ids() {
        let path = report_path(Path::new("out"), "team/retail #1", OutputFormat::Text);
        assert_eq!(path, Path::new("out").join("team_retail__1.txt"));

        let path = report_path(Path::new("out"), "C08P4TE2WCV", OutputFormat::Json);
        assert_eq!(path, Path::new("out").join("C08P4TE2WCV.json"));
    }

    #[test]
    fn test_format_report_text() {
        let text = format_report(&report("C1"), OutputFormat::Text).unwrap();
        assert!(text.starts_with("📊 Strategic Diagnostic - All businesses\n\nHello, Erick!"));
        assert!(text.ends_with("CSAT 80.0% | Adherence 90.0% | 1 analysts\n"));
    }

    #[test]
    fn test_directory_sink_writes_one_file_per_audience() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");
        let sink = Sink::Directory {
            dir: out.clone(),
            format: OutputFormat::Json,
        };
        let reports = vec![report("C1"), report("C2")];

        let outcomes = tokio_test::block_on(deliver_all(&sink, &reports));

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        let written = std::fs::read_to_string(out.join("C2.json")).unwrap();
        assert!(written.contains("\"audience_id\": \"C2\""));
        assert!(out.join("C1.json").exists());
    }

    #[test]
    fn test_deliver_until_completes_without_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Sink::Directory {
            dir: dir.path().to_path_buf(),
            format: OutputFormat::Text,
        };
        let reports = vec![report("C1")];

        let outcomes = tokio_test::block_on(deliver_until(
            &sink,
            &reports,
            std::future::pending::<()>(),
        ))
        .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(dir.path().join("C1.txt").exists());
    }

    #[test]
    fn test_deliver_until_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Sink::Directory {
            dir: dir.path().join("never"),
            format: OutputFormat::Text,
        };
        let reports = vec![report("C1"), report("C2")];

        let outcomes = tokio_test::block_on(deliver_until(&sink, &reports, std::future::ready(())));

        assert!(outcomes.is_none());
        assert!(!dir.path().join("never").join("C1.txt").exists());
    }

    #[test]
    fn test_slack_sink_requires_token() {
        let mut config = Config::default();
        config.delivery.target = DeliveryTarget::Slack;

        assert!(Sink::from_config(&config, OutputFormat::Text, None).is_err());
        assert!(Sink::from_config(&config, OutputFormat::Text, Some("  ")).is_err());
        assert!(Sink::from_config(&config, OutputFormat::Text, Some("xoxb-1")).is_ok());
    }
}
