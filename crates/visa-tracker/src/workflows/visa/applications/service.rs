use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::completeness::{self, DocumentCompleteness, DOCUMENTS_COMPLETE_NOTE};
use super::domain::{
    ApplicationId, AppointmentUpdate, DestinationId, RequirementId, StatusUpdate, TripDestination,
    UnknownStatus, UserId, VisaApplicationStatus, VisaRequirement,
};
use super::lifecycle::{check_transition, TransitionError, VisaApplication, APPOINTMENT_NOTE};
use super::progress::estimate_progress;
use super::repository::{
    ApplicationRepository, CatalogError, NotificationPublisher, RepositoryError,
    RequirementCatalog, StatusChangeNotification,
};
use crate::workflows::visa::timeline::{
    classify_risk, compute_timeline, days_until, submission_window, RiskLevel, TimelineError,
    VisaTimeline,
};

/// Service composing the lifecycle aggregate, the timeline calculator, the completeness gate,
/// and the outbound notifier.
///
/// Writes are serialized so a load, mutate and store cycle never interleaves with another
/// writer on the same service.
pub struct VisaApplicationService<R, C, N> {
    repository: Arc<R>,
    catalog: Arc<C>,
    notifier: Arc<N>,
    writes: Mutex<()>,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("visa-app-{id:06}"))
}

/// Result of [`VisaApplicationService::create_or_resume`].
#[derive(Debug, Clone)]
pub struct Creation {
    pub application: VisaApplication,
    pub created: bool,
}

/// Aggregated read model for tracking screens.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingView {
    pub application: VisaApplication,
    pub completeness: DocumentCompleteness,
    pub progress_percentage: u8,
    pub current_step: VisaApplicationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until_latest_submission: Option<i64>,
}

impl<R, C, N> VisaApplicationService<R, C, N>
where
    R: ApplicationRepository + 'static,
    C: RequirementCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(repository: Arc<R>, catalog: Arc<C>, notifier: Arc<N>) -> Self {
        Self {
            repository,
            catalog,
            notifier,
            writes: Mutex::new(()),
        }
    }

    /// Open an application for `owner`, or return the one already filed against the same
    /// requirement.
    pub fn create(
        &self,
        owner: UserId,
        requirement_id: RequirementId,
        destination_id: DestinationId,
        now: DateTime<Utc>,
    ) -> Result<VisaApplication, ApplicationServiceError> {
        self.create_or_resume(owner, requirement_id, destination_id, now)
            .map(|creation| creation.application)
    }

    pub fn create_or_resume(
        &self,
        owner: UserId,
        requirement_id: RequirementId,
        destination_id: DestinationId,
        now: DateTime<Utc>,
    ) -> Result<Creation, ApplicationServiceError> {
        let requirement = self.requirement(&requirement_id)?;
        let destination = self.destination(&destination_id)?;

        let _write = self.write_guard();
        if let Some(existing) = self.repository.find_for_owner(&owner, &requirement_id)? {
            debug!(application_id = %existing.id, %owner, %requirement_id, "returning existing visa application");
            return Ok(Creation {
                application: existing,
                created: false,
            });
        }

        let mut application = VisaApplication::new(
            next_application_id(),
            owner,
            requirement_id,
            destination_id,
            now,
        );

        match destination.entry_date {
            Some(entry_date) => application.apply_submission_window(submission_window(
                requirement.processing_time_max,
                entry_date,
            )?),
            None => warn!(
                destination_id = %destination.id,
                "destination has no entry date; submission window left empty"
            ),
        }

        let stored = self.repository.insert(application)?;
        info!(
            application_id = %stored.id,
            requirement_id = %stored.requirement_id,
            latest_submission = ?stored.latest_submission_date(),
            "visa application created"
        );

        Ok(Creation {
            application: stored,
            created: true,
        })
    }

    /// Move an application to `new_status`, merging the supplied dates and notes.
    pub fn transition(
        &self,
        application_id: &ApplicationId,
        new_status: VisaApplicationStatus,
        updates: StatusUpdate,
        now: DateTime<Utc>,
    ) -> Result<VisaApplication, ApplicationServiceError> {
        let _write = self.write_guard();
        let application = self.load(application_id)?;
        self.apply_transition(application, new_status, &updates, now)
    }

    /// Label-based variant used by transport layers; unknown labels are validation failures.
    pub fn transition_by_label(
        &self,
        application_id: &ApplicationId,
        status: &str,
        updates: StatusUpdate,
        now: DateTime<Utc>,
    ) -> Result<VisaApplication, ApplicationServiceError> {
        let new_status = status.parse::<VisaApplicationStatus>()?;
        self.transition(application_id, new_status, updates, now)
    }

    pub fn update_appointment(
        &self,
        application_id: &ApplicationId,
        fields: AppointmentUpdate,
        now: DateTime<Utc>,
    ) -> Result<VisaApplication, ApplicationServiceError> {
        if fields.is_empty() {
            return Err(ApplicationServiceError::Validation(
                "appointment update carries no fields".to_string(),
            ));
        }

        let _write = self.write_guard();
        let mut application = self.load(application_id)?;
        let current = application.status();
        if current.is_terminal() {
            return Err(TransitionError::Terminal {
                from: current,
                to: VisaApplicationStatus::AppointmentBooked,
            }
            .into());
        }

        application.merge_appointment(&fields);

        match current {
            VisaApplicationStatus::NotStarted | VisaApplicationStatus::DocumentsInProgress => {
                let updates = StatusUpdate {
                    notes: Some(APPOINTMENT_NOTE.to_string()),
                    appointment_date: fields.date,
                    ..StatusUpdate::default()
                };
                self.apply_transition(
                    application,
                    VisaApplicationStatus::AppointmentBooked,
                    &updates,
                    now,
                )
            }
            _ => {
                self.repository.update(application.clone())?;
                debug!(application_id = %application.id, "appointment details updated");
                Ok(application)
            }
        }
    }

    /// Run the completeness gate, promoting `NOT_STARTED` applications once every mandatory
    /// document is on file.
    pub fn check_completeness(
        &self,
        application_id: &ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<DocumentCompleteness, ApplicationServiceError> {
        let _write = self.write_guard();
        let application = self.load(application_id)?;
        let completeness = self.completeness_for(&application)?;

        if completeness.is_complete && application.status() == VisaApplicationStatus::NotStarted {
            info!(application_id = %application.id, "mandatory documents complete; promoting");
            self.apply_transition(
                application,
                VisaApplicationStatus::DocumentsInProgress,
                &StatusUpdate::with_notes(DOCUMENTS_COMPLETE_NOTE),
                now,
            )?;
        }

        Ok(completeness)
    }

    /// Read-only aggregate for tracking screens.
    pub fn tracking(
        &self,
        application_id: &ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<TrackingView, ApplicationServiceError> {
        let application = self.load(application_id)?;
        let completeness = self.completeness_for(&application)?;
        let progress_percentage = estimate_progress(application.status(), &completeness);

        let awaiting_submission = matches!(
            application.status(),
            VisaApplicationStatus::NotStarted
                | VisaApplicationStatus::DocumentsInProgress
                | VisaApplicationStatus::AppointmentBooked
        );
        let latest = application
            .latest_submission_date()
            .filter(|_| awaiting_submission);

        Ok(TrackingView {
            current_step: application.status(),
            risk: latest.map(|date| classify_risk(date, now)),
            days_until_latest_submission: latest.map(|date| days_until(date, now)),
            application,
            completeness,
            progress_percentage,
        })
    }

    /// Full timeline for an application; fails when its destination has no entry date.
    pub fn timeline(
        &self,
        application_id: &ApplicationId,
    ) -> Result<VisaTimeline, ApplicationServiceError> {
        let application = self.load(application_id)?;
        let requirement = self.requirement(&application.requirement_id)?;
        let destination = self.destination(&application.destination_id)?;

        Ok(compute_timeline(
            requirement.processing_time_max,
            destination.entry_date,
            application.submission_date,
        )?)
    }

    pub fn get(
        &self,
        application_id: &ApplicationId,
    ) -> Result<VisaApplication, ApplicationServiceError> {
        self.load(application_id)
    }

    fn apply_transition(
        &self,
        mut application: VisaApplication,
        new_status: VisaApplicationStatus,
        updates: &StatusUpdate,
        now: DateTime<Utc>,
    ) -> Result<VisaApplication, ApplicationServiceError> {
        check_transition(application.status(), new_status)?;
        validate_decision_date(&application, updates)?;

        let change = application.transition(new_status, updates, now)?;
        if updates.submission_date.is_some() {
            self.refresh_timeline(&mut application)?;
        }

        self.repository.update(application.clone())?;

        if let Some(change) = change {
            info!(
                application_id = %application.id,
                from = %change.old_status,
                to = %change.new_status,
                "visa application status changed"
            );
            self.notify(StatusChangeNotification {
                application_id: application.id.clone(),
                old_status: change.old_status,
                new_status: change.new_status,
                timestamp: now,
            });
        }

        Ok(application)
    }

    fn refresh_timeline(
        &self,
        application: &mut VisaApplication,
    ) -> Result<(), ApplicationServiceError> {
        let requirement = self.requirement(&application.requirement_id)?;
        application.refresh_expected_decision(requirement.processing_time_max)?;

        if let Some(entry_date) = self
            .catalog
            .destination(&application.destination_id)?
            .and_then(|destination| destination.entry_date)
        {
            application.apply_submission_window(submission_window(
                requirement.processing_time_max,
                entry_date,
            )?);
        }

        Ok(())
    }

    fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().expect("application write mutex poisoned")
    }

    fn notify(&self, notification: StatusChangeNotification) {
        let application_id = notification.application_id.clone();
        if let Err(err) = self.notifier.publish(notification) {
            warn!(%application_id, error = %err, "status change notification was not delivered");
        }
    }

    fn completeness_for(
        &self,
        application: &VisaApplication,
    ) -> Result<DocumentCompleteness, ApplicationServiceError> {
        let requirement = self.requirement(&application.requirement_id)?;
        let documents = self.repository.documents(&application.id)?;
        Ok(completeness::evaluate(
            &requirement.mandatory_documents(),
            &documents,
        ))
    }

    fn load(&self, application_id: &ApplicationId) -> Result<VisaApplication, ApplicationServiceError> {
        self.repository
            .fetch(application_id)?
            .ok_or_else(|| ApplicationServiceError::ApplicationNotFound(application_id.clone()))
    }

    fn requirement(&self, id: &RequirementId) -> Result<VisaRequirement, ApplicationServiceError> {
        self.catalog
            .requirement(id)?
            .ok_or_else(|| ApplicationServiceError::RequirementNotFound(id.clone()))
    }

    fn destination(&self, id: &DestinationId) -> Result<TripDestination, ApplicationServiceError> {
        self.catalog
            .destination(id)?
            .ok_or_else(|| ApplicationServiceError::DestinationNotFound(id.clone()))
    }
}

fn validate_decision_date(
    application: &VisaApplication,
    updates: &StatusUpdate,
) -> Result<(), ApplicationServiceError> {
    let submitted = updates.submission_date.or(application.submission_date);
    match (updates.decision_date, submitted) {
        (Some(decided), Some(submitted)) if decided < submitted => {
            Err(ApplicationServiceError::Validation(format!(
                "decision date {decided} precedes submission date {submitted}"
            )))
        }
        _ => Ok(()),
    }
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error("visa application {0} not found")]
    ApplicationNotFound(ApplicationId),
    #[error("visa requirement {0} not found")]
    RequirementNotFound(RequirementId),
    #[error("trip destination {0} not found")]
    DestinationNotFound(DestinationId),
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
    #[error(transparent)]
    InvalidInput(#[from] TimelineError),
    #[error("invalid update: {0}")]
    Validation(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ApplicationServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ApplicationNotFound(_)
                | Self::RequirementNotFound(_)
                | Self::DestinationNotFound(_)
                | Self::Repository(RepositoryError::NotFound)
        )
    }
}

impl From<UnknownStatus> for ApplicationServiceError {
    fn from(value: UnknownStatus) -> Self {
        Self::Validation(value.to_string())
    }
}
