//! Setpoint and maintenance recommendations, derived on read like scores.

use chrono::{Duration, NaiveDate};

use crate::types::{Criterion, MaintenancePolicy, Recommendation, SetpointRule, Snapshot};

fn holds(criteria: &[Criterion], snapshot: &Snapshot) -> bool {
    !criteria.is_empty()
        && criteria.iter().all(|c| {
            snapshot
                .get(&c.metric)
                .is_some_and(|v| c.condition.is_met(None, *v, c.value))
        })
}

/// Step the setpoint down or up when its criteria hold.
///
/// Returns `None` when neither list matches or the step is absorbed by the
/// setpoint's limits.
pub fn setpoint(rule: &SetpointRule, snapshot: &Snapshot) -> Option<Recommendation> {
    let current = *snapshot.get(&rule.metric)?;
    let recommended = if holds(&rule.decrease_when, snapshot) {
        (current - rule.step).max(rule.min)
    } else if holds(&rule.increase_when, snapshot) {
        (current + rule.step).min(rule.max)
    } else {
        return None;
    };

    (recommended != current).then(|| Recommendation::Setpoint {
        metric: rule.metric.clone(),
        current,
        recommended,
    })
}

/// Schedule maintenance when the policy's score is low or the last
/// maintenance is too old. An entity never maintained counts as overdue.
///
/// Returns `None` when the due date falls outside the calendar range.
pub fn maintenance(
    policy: &MaintenancePolicy,
    score: f64,
    last_maintenance: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<Recommendation> {
    let reason = if score < policy.score_below {
        format!("{} score {score:.1} below {}", policy.score, policy.score_below)
    } else {
        match last_maintenance {
            Some(date) => {
                let days = (today - date).num_days();
                if days <= policy.max_days_since {
                    return None;
                }
                format!("{days} days since last maintenance")
            }
            None => "no maintenance on record".to_string(),
        }
    };

    let due = Duration::try_days(policy.lead_days).and_then(|lead| today.checked_add_signed(lead))?;
    Some(Recommendation::Maintenance { due, reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Condition;

    fn choke_rule() -> SetpointRule {
        SetpointRule {
            metric: "choke".to_string(),
            step: 4.0,
            min: 16.0,
            max: 48.0,
            decrease_when: vec![
                Criterion::new("efficiency", Condition::Below, 85.0),
                Criterion::new("water_cut", Condition::Above, 20.0),
            ],
            increase_when: vec![Criterion::new("efficiency", Condition::Above, 90.0)],
        }
    }

    fn snap(choke: f64, efficiency: f64, water: f64) -> Snapshot {
        [("choke", choke), ("efficiency", efficiency), ("water_cut", water)]
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    #[test]
    fn test_choke_decrease_when_inefficient_and_wet() {
        let rec = setpoint(&choke_rule(), &snap(28.0, 80.0, 22.0));
        assert_eq!(
            rec,
            Some(Recommendation::Setpoint {
                metric: "choke".into(),
                current: 28.0,
                recommended: 24.0
            })
        );
    }

    #[test]
    fn test_choke_increase_capped_at_max() {
        let rec = setpoint(&choke_rule(), &snap(46.0, 92.0, 10.0));
        assert!(matches!(rec, Some(Recommendation::Setpoint { recommended, .. }) if recommended == 48.0));
        assert!(setpoint(&choke_rule(), &snap(48.0, 92.0, 10.0)).is_none());
    }

    #[test]
    fn test_choke_no_change_in_between() {
        assert!(setpoint(&choke_rule(), &snap(28.0, 88.0, 22.0)).is_none());
    }

    #[test]
    fn test_maintenance_due_on_low_score() {
        let policy = MaintenancePolicy {
            score: "health".into(),
            score_below: 80.0,
            max_days_since: 180,
            lead_days: 7,
        };
        let today = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        let recent = NaiveDate::from_ymd_opt(2025, 8, 1);
        match maintenance(&policy, 75.0, recent, today) {
            Some(Recommendation::Maintenance { due, .. }) => {
                assert_eq!(due, NaiveDate::from_ymd_opt(2025, 9, 8).unwrap());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(maintenance(&policy, 90.0, recent, today).is_none());
    }

    #[test]
    fn test_maintenance_due_when_overdue() {
        let policy = MaintenancePolicy {
            score: "delivery".into(),
            score_below: 80.0,
            max_days_since: 90,
            lead_days: 7,
        };
        let today = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        let old = NaiveDate::from_ymd_opt(2025, 6, 15);
        assert!(maintenance(&policy, 95.0, old, today).is_some());
    }

    #[test]
    fn test_maintenance_lead_beyond_calendar_is_skipped() {
        let mut policy = MaintenancePolicy {
            score: "delivery".into(),
            score_below: 80.0,
            max_days_since: 90,
            lead_days: 100_000_000,
        };
        let today = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        assert!(maintenance(&policy, 10.0, None, today).is_none());

        policy.lead_days = i64::MAX;
        assert!(maintenance(&policy, 10.0, None, today).is_none());
    }
}
