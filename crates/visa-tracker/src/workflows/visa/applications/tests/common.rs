use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::visa::applications::domain::{
    ApplicationDocument, ApplicationId, DestinationId, RequiredDocument, RequirementId,
    TripDestination, UserId, VisaRequirement,
};
use crate::workflows::visa::applications::lifecycle::VisaApplication;
use crate::workflows::visa::applications::repository::{
    ApplicationRepository, CatalogError, NotificationError, NotificationPublisher,
    RepositoryError, RequirementCatalog, StatusChangeNotification,
};
use crate::workflows::visa::applications::{application_router, VisaApplicationService};

pub(super) const REQUIREMENT: &str = "req-jp-tourist";
pub(super) const DESTINATION: &str = "dest-tokyo";
pub(super) const UNDATED_DESTINATION: &str = "dest-undated";
pub(super) const TRAVELER: &str = "traveler-ada";

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap()
}

pub(super) fn later(hours: i64) -> DateTime<Utc> {
    now() + Duration::hours(hours)
}

pub(super) fn entry_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date")
}

pub(super) fn requirement() -> VisaRequirement {
    VisaRequirement {
        id: RequirementId(REQUIREMENT.to_string()),
        processing_time_min: Some(5),
        processing_time_max: Some(15),
        required_documents: vec![
            RequiredDocument {
                document_type: "PASSPORT".to_string(),
                mandatory: true,
            },
            RequiredDocument {
                document_type: "PHOTO".to_string(),
                mandatory: true,
            },
            RequiredDocument {
                document_type: "HOTEL_BOOKING".to_string(),
                mandatory: false,
            },
        ],
    }
}

pub(super) fn destination() -> TripDestination {
    TripDestination {
        id: DestinationId(DESTINATION.to_string()),
        name: "Tokyo".to_string(),
        entry_date: Some(entry_date()),
        visa_required: true,
    }
}

pub(super) fn undated_destination() -> TripDestination {
    TripDestination {
        id: DestinationId(UNDATED_DESTINATION.to_string()),
        name: "Osaka".to_string(),
        entry_date: None,
        visa_required: true,
    }
}

pub(super) fn uploaded(document_type: &str) -> ApplicationDocument {
    ApplicationDocument {
        document_type: document_type.to_string(),
        uploaded: true,
    }
}

pub(super) type TestService = VisaApplicationService<MemoryRepository, MemoryCatalog, MemoryNotifier>;

pub(super) fn build_service() -> (
    TestService,
    Arc<MemoryRepository>,
    Arc<MemoryNotifier>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let catalog = Arc::new(MemoryCatalog::standard());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = VisaApplicationService::new(repository.clone(), catalog, notifier.clone());
    (service, repository, notifier)
}

pub(super) fn create_application(service: &TestService) -> VisaApplication {
    service
        .create(
            UserId(TRAVELER.to_string()),
            RequirementId(REQUIREMENT.to_string()),
            DestinationId(DESTINATION.to_string()),
            now(),
        )
        .expect("application created")
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<ApplicationId, VisaApplication>>>,
    pub(super) documents: Arc<Mutex<HashMap<ApplicationId, Vec<ApplicationDocument>>>>,
}

impl MemoryRepository {
    pub(super) fn upload(&self, id: &ApplicationId, document: ApplicationDocument) {
        self.documents
            .lock()
            .expect("documents mutex poisoned")
            .entry(id.clone())
            .or_default()
            .push(document);
    }
}

impl ApplicationRepository for MemoryRepository {
    fn insert(&self, application: VisaApplication) -> Result<VisaApplication, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn update(&self, application: VisaApplication) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(application.id.clone(), application);
        Ok(())
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<VisaApplication>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_for_owner(
        &self,
        owner: &UserId,
        requirement: &RequirementId,
    ) -> Result<Option<VisaApplication>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|application| {
                &application.owner == owner && &application.requirement_id == requirement
            })
            .cloned())
    }

    fn documents(&self, id: &ApplicationId) -> Result<Vec<ApplicationDocument>, RepositoryError> {
        let guard = self.documents.lock().expect("documents mutex poisoned");
        Ok(guard.get(id).cloned().unwrap_or_default())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryCatalog {
    requirements: HashMap<RequirementId, VisaRequirement>,
    destinations: HashMap<DestinationId, TripDestination>,
}

impl MemoryCatalog {
    pub(super) fn standard() -> Self {
        let mut catalog = Self::default();
        let requirement = requirement();
        catalog
            .requirements
            .insert(requirement.id.clone(), requirement);
        for destination in [destination(), undated_destination()] {
            catalog
                .destinations
                .insert(destination.id.clone(), destination);
        }
        catalog
    }

    pub(super) fn with_requirement(mut self, requirement: VisaRequirement) -> Self {
        self.requirements.insert(requirement.id.clone(), requirement);
        self
    }
}

impl RequirementCatalog for MemoryCatalog {
    fn requirement(&self, id: &RequirementId) -> Result<Option<VisaRequirement>, CatalogError> {
        Ok(self.requirements.get(id).cloned())
    }

    fn destination(&self, id: &DestinationId) -> Result<Option<TripDestination>, CatalogError> {
        Ok(self.destinations.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    events: Arc<Mutex<Vec<StatusChangeNotification>>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<StatusChangeNotification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationPublisher for MemoryNotifier {
    fn publish(&self, notification: StatusChangeNotification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct OfflineNotifier;

impl NotificationPublisher for OfflineNotifier {
    fn publish(&self, _notification: StatusChangeNotification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("push gateway offline".to_string()))
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _application: VisaApplication) -> Result<VisaApplication, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _application: VisaApplication) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<VisaApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_for_owner(
        &self,
        _owner: &UserId,
        _requirement: &RequirementId,
    ) -> Result<Option<VisaApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn documents(&self, _id: &ApplicationId) -> Result<Vec<ApplicationDocument>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    application_router(Arc::new(service))
}
