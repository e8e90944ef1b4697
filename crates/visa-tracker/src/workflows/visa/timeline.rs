//! Submission deadline arithmetic shared by the lifecycle service, the trip feasibility check,
//! and the HTTP/CLI surfaces.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Processing time assumed when a requirement does not publish one.
pub const DEFAULT_PROCESSING_DAYS: i64 = 15;
/// Days kept between the latest submission date and the processing deadline.
pub const SAFETY_BUFFER_DAYS: i64 = 7;
/// Preparation lead time between the recommended and the latest submission date.
pub const PREPARATION_DAYS: i64 = 14;
/// Upper bound (inclusive) of the window classified as tight.
pub const TIGHT_WINDOW_DAYS: i64 = 14;

const SECONDS_PER_DAY: i64 = 86_400;

/// Errors raised when the timeline cannot be anchored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimelineError {
    #[error("entry date is required to compute a visa timeline")]
    MissingEntryDate,
    #[error("entry date '{0}' is not a valid date (expected YYYY-MM-DD)")]
    InvalidEntryDate(String),
    #[error("processing time of {0} days puts the timeline outside the supported date range")]
    ProcessingTimeOutOfRange(i64),
}

/// Derived submission window for one destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionWindow {
    pub latest_submission_date: NaiveDate,
    pub recommended_submission_date: NaiveDate,
}

/// Full set of derived dates for an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisaTimeline {
    pub processing_days: i64,
    pub latest_submission_date: NaiveDate,
    pub recommended_submission_date: NaiveDate,
    pub expected_decision_date: Option<DateTime<Utc>>,
}

/// Deadline pressure relative to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Safe,
    Tight,
    High,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Tight => "TIGHT",
            Self::High => "HIGH",
        }
    }
}

/// Processing time in days, falling back to [`DEFAULT_PROCESSING_DAYS`] when the requirement
/// does not carry a usable value.
pub fn effective_processing_days(processing_time_max: Option<i64>) -> i64 {
    match processing_time_max {
        Some(days) if days > 0 => days,
        _ => DEFAULT_PROCESSING_DAYS,
    }
}

/// Latest and recommended submission dates for `entry_date`. Fails instead of wrapping when the
/// processing time pushes the dates out of the calendar range.
pub fn submission_window(
    processing_time_max: Option<i64>,
    entry_date: NaiveDate,
) -> Result<SubmissionWindow, TimelineError> {
    let processing_days = effective_processing_days(processing_time_max);
    let out_of_range = || TimelineError::ProcessingTimeOutOfRange(processing_days);

    let lead = processing_days
        .checked_add(SAFETY_BUFFER_DAYS)
        .and_then(Duration::try_days)
        .ok_or_else(out_of_range)?;
    let latest_submission_date = entry_date.checked_sub_signed(lead).ok_or_else(out_of_range)?;
    let recommended_submission_date = latest_submission_date
        .checked_sub_signed(Duration::days(PREPARATION_DAYS))
        .ok_or_else(out_of_range)?;

    Ok(SubmissionWindow {
        latest_submission_date,
        recommended_submission_date,
    })
}

pub fn expected_decision_date(
    processing_time_max: Option<i64>,
    submission_date: DateTime<Utc>,
) -> Result<DateTime<Utc>, TimelineError> {
    let processing_days = effective_processing_days(processing_time_max);
    Duration::try_days(processing_days)
        .and_then(|processing| submission_date.checked_add_signed(processing))
        .ok_or(TimelineError::ProcessingTimeOutOfRange(processing_days))
}

/// Derive every timeline date from the destination entry date and the requirement's maximum
/// processing time.
pub fn compute_timeline(
    processing_time_max: Option<i64>,
    entry_date: Option<NaiveDate>,
    submission_date: Option<DateTime<Utc>>,
) -> Result<VisaTimeline, TimelineError> {
    let entry_date = entry_date.ok_or(TimelineError::MissingEntryDate)?;
    let window = submission_window(processing_time_max, entry_date)?;
    let expected_decision_date = submission_date
        .map(|submitted| expected_decision_date(processing_time_max, submitted))
        .transpose()?;

    Ok(VisaTimeline {
        processing_days: effective_processing_days(processing_time_max),
        latest_submission_date: window.latest_submission_date,
        recommended_submission_date: window.recommended_submission_date,
        expected_decision_date,
    })
}

/// Parse an entry date supplied as `YYYY-MM-DD` or as an RFC 3339 timestamp.
pub fn parse_entry_date(raw: &str) -> Result<NaiveDate, TimelineError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TimelineError::MissingEntryDate);
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| TimelineError::InvalidEntryDate(trimmed.to_string()))
}

/// Whole days between `now` and the start of `latest_submission_date`, rounded down.
pub fn days_until(latest_submission_date: NaiveDate, now: DateTime<Utc>) -> i64 {
    let deadline = latest_submission_date.and_time(chrono::NaiveTime::MIN).and_utc();
    (deadline - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

pub fn classify_risk(latest_submission_date: NaiveDate, now: DateTime<Utc>) -> RiskLevel {
    match days_until(latest_submission_date, now) {
        days if days < 0 => RiskLevel::High,
        days if days <= TIGHT_WINDOW_DAYS => RiskLevel::Tight,
        _ => RiskLevel::Safe,
    }
}
