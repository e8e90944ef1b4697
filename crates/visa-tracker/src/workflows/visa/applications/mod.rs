//! Visa application lifecycle: status state machine, document completeness gate, progress
//! estimation, and the service/router pair exposing them.

pub mod completeness;
pub mod domain;
pub mod lifecycle;
pub mod progress;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use completeness::DocumentCompleteness;
pub use domain::{
    ApplicationDocument, ApplicationId, Appointment, AppointmentUpdate, DestinationId,
    RequiredDocument, RequirementId, StatusHistoryEntry, StatusUpdate, TripDestination, UserId,
    VisaApplicationStatus, VisaRequirement,
};
pub use lifecycle::{StatusChange, TransitionError, VisaApplication};
pub use progress::estimate_progress;
pub use repository::{
    ApplicationRepository, CatalogError, NotificationError, NotificationPublisher,
    RepositoryError, RequirementCatalog, StatusChangeNotification,
};
pub use router::application_router;
pub use service::{ApplicationServiceError, Creation, TrackingView, VisaApplicationService};
