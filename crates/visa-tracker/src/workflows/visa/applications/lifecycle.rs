//! Visa application aggregate and the status state machine guarding it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::domain::{
    ApplicationId, Appointment, AppointmentUpdate, DestinationId, RequirementId,
    StatusHistoryEntry, StatusUpdate, UserId, VisaApplicationStatus,
};
use crate::workflows::visa::timeline::{expected_decision_date, SubmissionWindow, TimelineError};

pub const INITIALIZED_NOTE: &str = "Application initialized";
pub const APPOINTMENT_NOTE: &str = "Appointment details added";

/// Raised when the adjacency table does not allow a move.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("application is already {from} and accepts no further transitions (requested {to})")]
    Terminal {
        from: VisaApplicationStatus,
        to: VisaApplicationStatus,
    },
    #[error("cannot move application from {from} to {to}")]
    NotAllowed {
        from: VisaApplicationStatus,
        to: VisaApplicationStatus,
    },
}

/// Statuses reachable from `from`. Re-entering the current status is allowed so callers can
/// annotate an application without moving it.
pub fn allowed_next(from: VisaApplicationStatus) -> &'static [VisaApplicationStatus] {
    use VisaApplicationStatus::*;

    match from {
        NotStarted => &[
            NotStarted,
            DocumentsInProgress,
            AppointmentBooked,
            Submitted,
            UnderReview,
            Cancelled,
        ],
        DocumentsInProgress => &[
            NotStarted,
            DocumentsInProgress,
            AppointmentBooked,
            Submitted,
            UnderReview,
            Cancelled,
        ],
        AppointmentBooked => &[
            NotStarted,
            DocumentsInProgress,
            AppointmentBooked,
            Submitted,
            UnderReview,
            Cancelled,
        ],
        Submitted | UnderReview => &[
            NotStarted,
            DocumentsInProgress,
            AppointmentBooked,
            Submitted,
            UnderReview,
            Approved,
            Rejected,
            Cancelled,
        ],
        Approved | Rejected | Cancelled => &[],
    }
}

pub fn check_transition(
    from: VisaApplicationStatus,
    to: VisaApplicationStatus,
) -> Result<(), TransitionError> {
    if from.is_terminal() {
        return Err(TransitionError::Terminal { from, to });
    }
    if !allowed_next(from).contains(&to) {
        return Err(TransitionError::NotAllowed { from, to });
    }
    Ok(())
}

/// Status change produced by a transition, used to drive notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub old_status: VisaApplicationStatus,
    pub new_status: VisaApplicationStatus,
}

/// Aggregate root for one traveler's application against one visa requirement.
///
/// Status and history only change through [`VisaApplication::transition`]; the derived
/// timeline dates only change through the timeline setters. It is serialized for read models
/// but never deserialized, so stored state cannot be forged around those rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisaApplication {
    pub id: ApplicationId,
    pub owner: UserId,
    pub requirement_id: RequirementId,
    pub destination_id: DestinationId,
    status: VisaApplicationStatus,
    status_history: Vec<StatusHistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment: Option<Appointment>,
    pub application_date: Option<DateTime<Utc>>,
    pub appointment_date: Option<DateTime<Utc>>,
    pub submission_date: Option<DateTime<Utc>>,
    pub decision_date: Option<DateTime<Utc>>,
    expected_decision_date: Option<DateTime<Utc>>,
    latest_submission_date: Option<NaiveDate>,
    recommended_submission_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl VisaApplication {
    /// Seed a new application in `NOT_STARTED` with its initial history entry.
    pub fn new(
        id: ApplicationId,
        owner: UserId,
        requirement_id: RequirementId,
        destination_id: DestinationId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner,
            requirement_id,
            destination_id,
            status: VisaApplicationStatus::NotStarted,
            status_history: vec![StatusHistoryEntry {
                status: VisaApplicationStatus::NotStarted,
                changed_at: now,
                notes: Some(INITIALIZED_NOTE.to_string()),
            }],
            appointment: None,
            application_date: Some(now),
            appointment_date: None,
            submission_date: None,
            decision_date: None,
            expected_decision_date: None,
            latest_submission_date: None,
            recommended_submission_date: None,
            notes: None,
        }
    }

    pub fn status(&self) -> VisaApplicationStatus {
        self.status
    }

    pub fn status_history(&self) -> &[StatusHistoryEntry] {
        &self.status_history
    }

    pub fn expected_decision_date(&self) -> Option<DateTime<Utc>> {
        self.expected_decision_date
    }

    pub fn latest_submission_date(&self) -> Option<NaiveDate> {
        self.latest_submission_date
    }

    pub fn recommended_submission_date(&self) -> Option<NaiveDate> {
        self.recommended_submission_date
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Validate and apply a status change with its accompanying field updates.
    ///
    /// History grows when the status changes or notes are supplied. Date fields are merged and
    /// never cleared. Returns the change when the status actually moved.
    pub fn transition(
        &mut self,
        new_status: VisaApplicationStatus,
        updates: &StatusUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<StatusChange>, TransitionError> {
        check_transition(self.status, new_status)?;

        let old_status = self.status;
        let changed = old_status != new_status;

        if changed || updates.notes.is_some() {
            // history must stay time-ordered even if the caller's clock drifts backwards
            let changed_at = self
                .status_history
                .last()
                .map_or(now, |last| last.changed_at.max(now));
            self.status_history.push(StatusHistoryEntry {
                status: new_status,
                changed_at,
                notes: updates.notes.clone(),
            });
        }

        self.status = new_status;
        if let Some(notes) = &updates.notes {
            self.notes = Some(notes.clone());
        }
        if let Some(date) = updates.appointment_date {
            self.appointment_date = Some(date);
        }
        if let Some(date) = updates.submission_date {
            self.submission_date = Some(date);
        }
        if let Some(date) = updates.decision_date {
            self.decision_date = Some(date);
        }

        Ok(changed.then_some(StatusChange {
            old_status,
            new_status,
        }))
    }

    /// Shallow-merge appointment details; unspecified fields keep their stored value.
    pub fn merge_appointment(&mut self, update: &AppointmentUpdate) {
        let appointment = self.appointment.get_or_insert_with(Appointment::default);

        if let Some(date) = update.date {
            appointment.date = Some(date);
            self.appointment_date = Some(date);
        }
        if let Some(location) = &update.location {
            appointment.location = Some(location.clone());
        }
        if let Some(address) = &update.address {
            appointment.address = Some(address.clone());
        }
        if let Some(kind) = &update.kind {
            appointment.kind = Some(kind.clone());
        }
        if let Some(notes) = &update.notes {
            appointment.notes = Some(notes.clone());
        }
    }

    pub fn apply_submission_window(&mut self, window: SubmissionWindow) {
        self.latest_submission_date = Some(window.latest_submission_date);
        self.recommended_submission_date = Some(window.recommended_submission_date);
    }

    /// Recompute the expected decision from the stored submission date. Leaves the stored value
    /// untouched on error.
    pub fn refresh_expected_decision(
        &mut self,
        processing_time_max: Option<i64>,
    ) -> Result<(), TimelineError> {
        self.expected_decision_date = self
            .submission_date
            .map(|submitted| expected_decision_date(processing_time_max, submitted))
            .transpose()?;
        Ok(())
    }
}
