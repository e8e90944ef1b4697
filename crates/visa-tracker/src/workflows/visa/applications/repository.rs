use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicationDocument, ApplicationId, DestinationId, RequirementId, TripDestination, UserId,
    VisaApplicationStatus, VisaRequirement,
};
use super::lifecycle::VisaApplication;

/// Storage abstraction so the service module can be exercised in isolation.
///
/// Implementations serialize writes per application id; the service performs read-modify-write
/// without its own locking.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: VisaApplication) -> Result<VisaApplication, RepositoryError>;
    fn update(&self, application: VisaApplication) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<VisaApplication>, RepositoryError>;
    /// First application filed by `owner` against `requirement`, if any.
    fn find_for_owner(
        &self,
        owner: &UserId,
        requirement: &RequirementId,
    ) -> Result<Option<VisaApplication>, RepositoryError>;
    fn documents(&self, id: &ApplicationId) -> Result<Vec<ApplicationDocument>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Read-only lookups for reference data owned by other parts of the product.
pub trait RequirementCatalog: Send + Sync {
    fn requirement(&self, id: &RequirementId) -> Result<Option<VisaRequirement>, CatalogError>;
    fn destination(&self, id: &DestinationId) -> Result<Option<TripDestination>, CatalogError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("reference catalog unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for push/e-mail adapters. Delivery is entirely the adapter's concern.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: StatusChangeNotification) -> Result<(), NotificationError>;
}

/// Payload handed to the notifier whenever an application's status moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeNotification {
    pub application_id: ApplicationId,
    pub old_status: VisaApplicationStatus,
    pub new_status: VisaApplicationStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
