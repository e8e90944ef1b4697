use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::timeline::{classify_risk, days_until, submission_window, RiskLevel};

pub const MISSING_PROCESSING_TIME: &str = "missing processing time data";
pub const MISSING_ENTRY_DATE: &str = "missing entry date";

/// One leg of a trip as seen by the feasibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationPlan {
    pub destination_name: String,
    pub visa_required: bool,
    #[serde(default)]
    pub processing_time_max: Option<i64>,
    #[serde(default)]
    pub entry_date: Option<NaiveDate>,
}

/// Overall verdict for a multi-destination trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeasibilityStatus {
    Feasible,
    Risky,
    NotFeasible,
}

impl FeasibilityStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Feasible => "FEASIBLE",
            Self::Risky => "RISKY",
            Self::NotFeasible => "NOT_FEASIBLE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskyDestination {
    pub destination_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskLevel>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripFeasibility {
    pub status: FeasibilityStatus,
    pub summary: String,
    pub risky_destinations: Vec<RiskyDestination>,
}

/// Roll the per-destination risk classification up into a single trip verdict.
pub fn assess_trip_feasibility(destinations: &[DestinationPlan], now: DateTime<Utc>) -> TripFeasibility {
    let mut risky_destinations = Vec::new();
    let mut blocked = 0usize;
    let mut checked = 0usize;

    for destination in destinations.iter().filter(|plan| plan.visa_required) {
        checked += 1;

        let Some(processing_time_max) = destination.processing_time_max else {
            risky_destinations.push(RiskyDestination {
                destination_name: destination.destination_name.clone(),
                risk: None,
                reason: MISSING_PROCESSING_TIME.to_string(),
            });
            continue;
        };
        let Some(entry_date) = destination.entry_date else {
            risky_destinations.push(RiskyDestination {
                destination_name: destination.destination_name.clone(),
                risk: None,
                reason: MISSING_ENTRY_DATE.to_string(),
            });
            continue;
        };

        let window = match submission_window(Some(processing_time_max), entry_date) {
            Ok(window) => window,
            Err(err) => {
                risky_destinations.push(RiskyDestination {
                    destination_name: destination.destination_name.clone(),
                    risk: None,
                    reason: err.to_string(),
                });
                continue;
            }
        };
        let latest = window.latest_submission_date;
        match classify_risk(latest, now) {
            RiskLevel::High => {
                blocked += 1;
                risky_destinations.push(RiskyDestination {
                    destination_name: destination.destination_name.clone(),
                    risk: Some(RiskLevel::High),
                    reason: format!("latest safe submission date {latest} has already passed"),
                });
            }
            RiskLevel::Tight => {
                let days_left = days_until(latest, now);
                risky_destinations.push(RiskyDestination {
                    destination_name: destination.destination_name.clone(),
                    risk: Some(RiskLevel::Tight),
                    reason: format!(
                        "only {days_left} day(s) left before the latest safe submission date {latest}"
                    ),
                });
            }
            RiskLevel::Safe => {}
        }
    }

    let status = if blocked > 0 {
        FeasibilityStatus::NotFeasible
    } else if !risky_destinations.is_empty() {
        FeasibilityStatus::Risky
    } else {
        FeasibilityStatus::Feasible
    };

    let summary = match status {
        FeasibilityStatus::Feasible if checked == 0 => {
            "no destination on this trip requires a visa".to_string()
        }
        FeasibilityStatus::Feasible => {
            format!("all {checked} visa application(s) can be submitted in time")
        }
        FeasibilityStatus::Risky => format!(
            "{} of {checked} visa application(s) have a tight or uncertain timeline",
            risky_destinations.len()
        ),
        FeasibilityStatus::NotFeasible => format!(
            "{blocked} of {checked} visa application(s) cannot be processed before entry"
        ),
    };

    TripFeasibility {
        status,
        summary,
        risky_destinations,
    }
}
