//! Export: flat, serializable entity reports as JSON or CSV.
//!
//! CSV columns are stable for a given set of reports:
//! `domain,id,name,category`, then `metric.<m>` for every metric name,
//! `score.<s>` and `band.<s>` for every score name (each group sorted),
//! then `open_alerts,total_alerts,last_updated`. Reports lacking a column
//! leave the cell empty.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use thiserror::Error;

use crate::scoring::ScoreBand;
use crate::types::{Category, EntityId, Recommendation, Snapshot};
use crate::view::{SortValue, ViewRecord};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Export write failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format: {other} (expected json or csv)")),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::Csv => f.write_str("csv"),
        }
    }
}

/// Everything an operator sees about one entity, flattened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityReport {
    pub domain: String,
    pub id: EntityId,
    pub name: String,
    pub category: Category,
    pub attributes: BTreeMap<String, String>,
    pub metrics: Snapshot,
    pub scores: BTreeMap<String, f64>,
    pub bands: BTreeMap<String, ScoreBand>,
    pub open_alerts: usize,
    pub total_alerts: usize,
    pub last_maintenance: Option<NaiveDate>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

impl ViewRecord for EntityReport {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Category {
        self.category
    }

    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    fn open_alerts(&self) -> usize {
        self.open_alerts
    }

    fn field(&self, name: &str) -> Option<SortValue<'_>> {
        self.scores
            .get(name)
            .or_else(|| self.metrics.get(name))
            .map(|v| SortValue::Number(*v))
            .or_else(|| self.attribute(name).map(SortValue::Text))
    }
}

pub fn to_json(reports: &[EntityReport]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(reports)?)
}

/// Header row for `reports`.
pub fn csv_columns(reports: &[EntityReport]) -> Vec<String> {
    let metrics: BTreeSet<&String> = reports.iter().flat_map(|r| r.metrics.keys()).collect();
    let scores: BTreeSet<&String> = reports.iter().flat_map(|r| r.scores.keys()).collect();

    let mut columns: Vec<String> = ["domain", "id", "name", "category"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    columns.extend(metrics.iter().map(|m| format!("metric.{m}")));
    columns.extend(scores.iter().map(|s| format!("score.{s}")));
    columns.extend(scores.iter().map(|s| format!("band.{s}")));
    columns.extend(["open_alerts", "total_alerts", "last_updated"].iter().map(|s| s.to_string()));
    columns
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn csv_cell(report: &EntityReport, column: &str) -> String {
    if let Some(m) = column.strip_prefix("metric.") {
        return report.metrics.get(m).map(f64::to_string).unwrap_or_default();
    }
    if let Some(s) = column.strip_prefix("score.") {
        return report.scores.get(s).map(|v| format!("{v:.2}")).unwrap_or_default();
    }
    if let Some(s) = column.strip_prefix("band.") {
        return report.bands.get(s).map(|b| b.to_string()).unwrap_or_default();
    }
    match column {
        "domain" => report.domain.clone(),
        "id" => report.id.to_string(),
        "name" => report.name.clone(),
        "category" => report.category.to_string(),
        "open_alerts" => report.open_alerts.to_string(),
        "total_alerts" => report.total_alerts.to_string(),
        "last_updated" => report.last_updated.to_rfc3339(),
        _ => String::new(),
    }
}

/// Write `reports` as CSV with a header row.
pub fn write_csv<W: Write>(reports: &[EntityReport], mut out: W) -> Result<(), ExportError> {
    let columns = csv_columns(reports);
    let header: Vec<String> = columns.iter().map(|c| csv_escape(c)).collect();
    writeln!(out, "{}", header.join(","))?;
    for report in reports {
        let row: Vec<String> = columns
            .iter()
            .map(|c| csv_escape(&csv_cell(report, c)))
            .collect();
        writeln!(out, "{}", row.join(","))?;
    }
    out.flush()?;
    Ok(())
}

pub fn to_csv(reports: &[EntityReport]) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_csv(reports, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn render(reports: &[EntityReport], format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => to_json(reports),
        ExportFormat::Csv => to_csv(reports),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(domain: &str, id: EntityId, name: &str) -> EntityReport {
        let mut metrics = Snapshot::new();
        metrics.insert("oil".to_string(), 4200.0);
        let mut scores = BTreeMap::new();
        scores.insert("optimization".to_string(), 82.346);
        let mut bands = BTreeMap::new();
        bands.insert("optimization".to_string(), ScoreBand::Good);
        EntityReport {
            domain: domain.to_string(),
            id,
            name: name.to_string(),
            category: Category::Producing,
            attributes: BTreeMap::new(),
            metrics,
            scores,
            bands,
            open_alerts: 1,
            total_alerts: 2,
            last_maintenance: None,
            last_updated: DateTime::parse_from_rfc3339("2025-09-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            recommendations: Vec::new(),
        }
    }

    #[test]
    fn test_csv_header_and_row() {
        let csv = to_csv(&[report("wells", 1, "ALPHA-1")]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("domain,id,name,category,metric.oil,score.optimization,band.optimization,open_alerts,total_alerts,last_updated")
        );
        assert_eq!(
            lines.next(),
            Some("wells,1,ALPHA-1,producing,4200,82.35,good,1,2,2025-09-01T12:00:00+00:00")
        );
    }

    #[test]
    fn test_csv_escapes_commas_and_quotes() {
        assert_eq!(csv_escape("Houston, TX"), "\"Houston, TX\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("plain"), "plain");
    }

    #[test]
    fn test_missing_columns_are_empty() {
        let mut other = report("markets", 1, "AAPL");
        other.metrics.clear();
        other.metrics.insert("price".to_string(), 175.25);
        let csv = to_csv(&[report("wells", 1, "ALPHA-1"), other]).unwrap();
        let header = csv.lines().next().unwrap();
        assert!(header.contains("metric.oil,metric.price"));
        let aapl = csv.lines().nth(2).unwrap();
        assert!(aapl.starts_with("markets,1,AAPL,producing,,175.25,"));
    }

    #[test]
    fn test_json_round_trip() {
        let json = to_json(&[report("wells", 1, "ALPHA-1")]).unwrap();
        let back: Vec<EntityReport> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[0].name, "ALPHA-1");
        assert_eq!(back[0].bands["optimization"], ScoreBand::Good);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
