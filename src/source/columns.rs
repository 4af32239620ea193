//! Header-to-field mapping.
//!
//! Spreadsheet headers drift between exports (`perc_csat`, `CSAT %`,
//! `satisfacao`), so each field is matched against an ordered alias list.

use crate::config::ColumnsConfig;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Semantic fields the engine reads from a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Field {
    Business,
    Campaign,
    Quadrant,
    Csat,
    Adherence,
    Promoters,
    Detractors,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Business,
        Field::Campaign,
        Field::Quadrant,
        Field::Csat,
        Field::Adherence,
        Field::Promoters,
        Field::Detractors,
    ];
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Business => write!(f, "business"),
            Field::Campaign => write!(f, "campaign"),
            Field::Quadrant => write!(f, "quadrant"),
            Field::Csat => write!(f, "csat"),
            Field::Adherence => write!(f, "adherence"),
            Field::Promoters => write!(f, "promoters"),
            Field::Detractors => write!(f, "detractors"),
        }
    }
}

/// Column index of each field, if the table has one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    pub business: Option<usize>,
    pub campaign: Option<usize>,
    pub quadrant: Option<usize>,
    pub csat: Option<usize>,
    pub adherence: Option<usize>,
    pub promoters: Option<usize>,
    pub detractors: Option<usize>,
}

impl ColumnMapping {
    /// Resolve every field against `headers` using the configured aliases.
    ///
    /// Headers are compared lowercased and trimmed; for each field the first
    /// alias contained in some header wins, scanning headers left to right.
    pub fn resolve(headers: &[String], columns: &ColumnsConfig) -> Self {
        let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

        let mut mapping = ColumnMapping::default();
        for field in Field::ALL {
            let index = find_column(&normalized, columns.aliases(field));
            match index {
                Some(i) => debug!("Column '{}' mapped to {}", headers[i], field),
                None => warn!("No column found for {}; values will be read as blank", field),
            }
            *mapping.slot_mut(field) = index;
        }
        mapping
    }

    /// Column index of `field`.
    pub fn get(&self, field: Field) -> Option<usize> {
        match field {
            Field::Business => self.business,
            Field::Campaign => self.campaign,
            Field::Quadrant => self.quadrant,
            Field::Csat => self.csat,
            Field::Adherence => self.adherence,
            Field::Promoters => self.promoters,
            Field::Detractors => self.detractors,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<usize> {
        match field {
            Field::Business => &mut self.business,
            Field::Campaign => &mut self.campaign,
            Field::Quadrant => &mut self.quadrant,
            Field::Csat => &mut self.csat,
            Field::Adherence => &mut self.adherence,
            Field::Promoters => &mut self.promoters,
            Field::Detractors => &mut self.detractors,
        }
    }

    /// Fields that no header matched.
    pub fn unresolved(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|&field| self.get(field).is_none())
            .collect()
    }
}

fn find_column(headers: &[String], aliases: &[String]) -> Option<usize> {
    aliases.iter().find_map(|alias| {
        let alias = alias.trim().to_lowercase();
        if alias.is_empty() {
            return None;
        }
        headers.iter().position(|h| h.contains(&alias))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_default_aliases() {
        let headers = headers(&[
            "Negocio",
            "Campanha",
            "Avaliado",
            "CSAT",
            "Perc_CSAT",
            "Perc_Aderencia",
            "Quadrante",
            "Promotores",
            "Detratores",
        ]);

        let mapping = ColumnMapping::resolve(&headers, &ColumnsConfig::default());

        assert_eq!(mapping.business, Some(0));
        assert_eq!(mapping.campaign, Some(1));
        assert_eq!(mapping.csat, Some(4));
        assert_eq!(mapping.adherence, Some(5));
        assert_eq!(mapping.quadrant, Some(6));
        assert_eq!(mapping.promoters, Some(7));
        assert_eq!(mapping.detractors, Some(8));
        assert!(mapping.unresolved().is_empty());
    }

    #[test]
    fn test_resolve_falls_back_to_later_aliases() {
        let headers = headers(&[" Satisfacao Cliente ", "Adesao"]);
        let mapping = ColumnMapping::resolve(&headers, &ColumnsConfig::default());

        assert_eq!(mapping.csat, Some(0));
        assert_eq!(mapping.adherence, None);
        assert!(mapping.unresolved().contains(&Field::Adherence));
        assert!(mapping.unresolved().contains(&Field::Business));
    }

    #[test]
    fn test_resolve_custom_aliases() {
        let mut columns = ColumnsConfig::default();
        columns.business = vec!["lob".to_string()];

        let mapping = ColumnMapping::resolve(&headers(&["LOB", "negocio"]), &columns);
        assert_eq!(mapping.business, Some(0));
    }
}
