//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.diagnostic.toml` files.

use crate::cli::DeliveryTarget;
use crate::models::{Audience, Thresholds};
use crate::source::Field;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".diagnostic.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input table settings.
    #[serde(default)]
    pub input: InputConfig,

    /// Header aliases per field.
    #[serde(default)]
    pub columns: ColumnsConfig,

    /// Classification thresholds shared by every audience.
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Delivery settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Audiences, in delivery order.
    #[serde(default = "default_audiences")]
    pub audiences: Vec<Audience>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            input: InputConfig::default(),
            columns: ColumnsConfig::default(),
            thresholds: Thresholds::default(),
            report: ReportConfig::default(),
            delivery: DeliveryConfig::default(),
            audiences: default_audiences(),
        }
    }
}

fn default_audiences() -> Vec<Audience> {
    vec![Audience::everyone("diagnostic", "team")]
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory used by the `directory` delivery target.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("diagnostics")
}

/// Input table settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Field delimiter for CSV input.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

fn default_delimiter() -> char {
    ','
}

impl InputConfig {
    /// The delimiter as the single byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> Result<u8> {
        if !self.delimiter.is_ascii() {
            bail!("CSV delimiter must be an ASCII character, got '{}'", self.delimiter);
        }
        Ok(self.delimiter as u8)
    }
}

/// Header aliases, tried in order, for each field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnsConfig {
    #[serde(default = "default_business_aliases")]
    pub business: Vec<String>,
    #[serde(default = "default_campaign_aliases")]
    pub campaign: Vec<String>,
    #[serde(default = "default_quadrant_aliases")]
    pub quadrant: Vec<String>,
    #[serde(default = "default_csat_aliases")]
    pub csat: Vec<String>,
    #[serde(default = "default_adherence_aliases")]
    pub adherence: Vec<String>,
    #[serde(default = "default_promoter_aliases")]
    pub promoters: Vec<String>,
    #[serde(default = "default_detractor_aliases")]
    pub detractors: Vec<String>,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            business: default_business_aliases(),
            campaign: default_campaign_aliases(),
            quadrant: default_quadrant_aliases(),
            csat: default_csat_aliases(),
            adherence: default_adherence_aliases(),
            promoters: default_promoter_aliases(),
            detractors: default_detractor_aliases(),
        }
    }
}

impl ColumnsConfig {
    /// Aliases configured for `field`.
    pub fn aliases(&self, field: Field) -> &[String] {
        match field {
            Field::Business => &self.business,
            Field::Campaign => &self.campaign,
            Field::Quadrant => &self.quadrant,
            Field::Csat => &self.csat,
            Field::Adherence => &self.adherence,
            Field::Promoters => &self.promoters,
            Field::Detractors => &self.detractors,
        }
    }
}

fn aliases(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn default_business_aliases() -> Vec<String> {
    aliases(&["negocio", "business"])
}

fn default_campaign_aliases() -> Vec<String> {
    aliases(&["campanha", "campaign"])
}

fn default_quadrant_aliases() -> Vec<String> {
    aliases(&["quadrante", "quadrant"])
}

fn default_csat_aliases() -> Vec<String> {
    aliases(&["perc_csat", "csat", "satisfacao"])
}

fn default_adherence_aliases() -> Vec<String> {
    aliases(&["perc_aderencia", "aderencia", "adere", "adherence"])
}

fn default_promoter_aliases() -> Vec<String> {
    aliases(&["promotor", "promoter"])
}

fn default_detractor_aliases() -> Vec<String> {
    aliases(&["detrator", "detractor"])
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Offender lines shown per rule.
    #[serde(default = "default_top_offenders")]
    pub top_offenders: usize,

    /// Campaign summary lines shown.
    #[serde(default = "default_top_campaigns")]
    pub top_campaigns: usize,

    /// Static cover image attached to every message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_offenders: default_top_offenders(),
            top_campaigns: default_top_campaigns(),
            image_url: None,
        }
    }
}

fn default_top_offenders() -> usize {
    3
}

fn default_top_campaigns() -> usize {
    5
}

/// Delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Where rendered messages go.
    #[serde(default)]
    pub target: DeliveryTarget,

    /// Slack Web API endpoint for `chat.postMessage`.
    #[serde(default = "default_slack_api_url")]
    pub slack_api_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Number of retries on failure.
    #[serde(default = "default_retries")]
    pub retries: usize,

    /// Delay before the first retry; grows linearly with each attempt.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            target: DeliveryTarget::default(),
            slack_api_url: default_slack_api_url(),
            timeout_seconds: default_timeout(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

fn default_slack_api_url() -> String {
    "https://slack.com/api/chat.postMessage".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> usize {
    3
}

fn default_retry_delay() -> u64 {
    500
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.output_dir {
            self.general.output_dir = dir.clone();
        }
        if let Some(target) = args.target {
            self.delivery.target = target;
        }
        if let Some(delimiter) = args.delimiter {
            self.input.delimiter = delimiter;
        }
        if let Some(min) = args.min_campaign_records {
            self.thresholds.min_campaign_records = min;
        }
        if let Some(share) = args.healthy_share {
            self.thresholds.healthy_share_pct = share;
        }
        if let Some(ref url) = args.image_url {
            self.report.image_url = Some(url.clone());
        }

        // An ad-hoc business replaces the configured audience list.
        if let Some(ref business) = args.business {
            self.audiences = vec![Audience {
                id: business.clone(),
                display_name: "team".to_string(),
                business: Some(business.clone()),
                thresholds: None,
            }];
        }
    }

    /// Restrict the audience list to `ids`, keeping configured order.
    pub fn select_audiences(&self, ids: &[String]) -> Result<Vec<Audience>> {
        if ids.is_empty() {
            return Ok(self.audiences.clone());
        }

        for id in ids {
            if !self.audiences.iter().any(|a| &a.id == id) {
                bail!("Unknown audience '{}' (not present in configuration)", id);
            }
        }

        Ok(self
            .audiences
            .iter()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
