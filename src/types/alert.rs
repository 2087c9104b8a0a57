//! Alert records: severity, resolution comments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Alert identifier, strictly increasing in creation order within a domain.
pub type AlertId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// Operator note attached when an alert is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub severity: Severity,
    pub message: String,
    /// Threshold rule that produced the alert; `None` for seeded or noise alerts.
    pub rule_id: Option<String>,
    pub metric: Option<String>,
    pub value: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub resolved: bool,
    pub comments: Vec<Comment>,
}

impl Alert {
    pub fn new(id: AlertId, severity: Severity, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id,
            severity,
            message: message.into(),
            rule_id: None,
            metric: None,
            value: None,
            created_at: at,
            resolved: false,
            comments: Vec::new(),
        }
    }

    /// Mark resolved and record the operator's comment.
    ///
    /// Resolving twice keeps `resolved == true` and appends both comments.
    pub fn resolve(&mut self, comment: impl Into<String>, at: DateTime<Utc>) {
        self.resolved = true;
        self.comments.push(Comment {
            text: comment.into(),
            timestamp: at,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_twice_appends_comments() {
        let now = Utc::now();
        let mut alert = Alert::new(1, Severity::Medium, "Water cut increasing", now);
        alert.resolve("choke reduced", now);
        alert.resolve("confirmed next shift", now);
        assert!(alert.resolved);
        assert_eq!(alert.comments.len(), 2);
        assert_eq!(alert.comments[1].text, "confirmed next shift");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!("HIGH".parse::<Severity>(), Ok(Severity::High));
    }
}
