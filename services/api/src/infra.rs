use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;
use visa_tracker::workflows::visa::applications::{
    ApplicationDocument, ApplicationId, ApplicationRepository, CatalogError, DestinationId,
    NotificationError, NotificationPublisher, RepositoryError, RequiredDocument,
    RequirementCatalog, RequirementId, StatusChangeNotification, TripDestination, UserId,
    VisaApplication, VisaRequirement,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, VisaApplication>>>,
    documents: Arc<Mutex<HashMap<ApplicationId, Vec<ApplicationDocument>>>>,
}

impl InMemoryApplicationRepository {
    /// Record an uploaded document. Storage of the file itself happens elsewhere.
    pub(crate) fn record_upload(&self, id: &ApplicationId, document_type: &str) {
        let mut guard = self.documents.lock().expect("document mutex poisoned");
        guard
            .entry(id.clone())
            .or_default()
            .push(ApplicationDocument {
                document_type: document_type.to_string(),
                uploaded: true,
            });
    }
}

impl ApplicationRepository for InMemoryApplicationRepository {
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
        if guard.contains_key(&application.id) {
            guard.insert(application.id.clone(), application);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
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
        let guard = self.documents.lock().expect("document mutex poisoned");
        Ok(guard.get(id).cloned().unwrap_or_default())
    }
}

/// Read-only catalog of sample requirements and destinations for local runs.
#[derive(Default, Clone)]
pub(crate) struct InMemoryCatalog {
    requirements: HashMap<RequirementId, VisaRequirement>,
    destinations: HashMap<DestinationId, TripDestination>,
}

pub(crate) const SAMPLE_REQUIREMENT: &str = "req-jp-tourist";
pub(crate) const SAMPLE_DESTINATION: &str = "dest-tokyo";

impl InMemoryCatalog {
    /// Entry dates are placed relative to `today` so the sample data never goes stale.
    pub(crate) fn seeded(today: NaiveDate) -> Self {
        let mut catalog = Self::default();

        catalog.add_requirement(VisaRequirement {
            id: RequirementId(SAMPLE_REQUIREMENT.to_string()),
            processing_time_min: Some(5),
            processing_time_max: Some(15),
            required_documents: documents(&[
                ("PASSPORT", true),
                ("PHOTO", true),
                ("BANK_STATEMENT", true),
                ("FLIGHT_ITINERARY", false),
            ]),
        });
        catalog.add_requirement(VisaRequirement {
            id: RequirementId("req-schengen-c".to_string()),
            processing_time_min: Some(10),
            processing_time_max: Some(20),
            required_documents: documents(&[
                ("PASSPORT", true),
                ("TRAVEL_INSURANCE", true),
                ("HOTEL_BOOKING", true),
                ("INVITATION_LETTER", false),
            ]),
        });
        catalog.add_requirement(VisaRequirement {
            id: RequirementId("req-in-evisa".to_string()),
            processing_time_min: None,
            processing_time_max: None,
            required_documents: documents(&[("PASSPORT", true), ("PHOTO", true)]),
        });

        catalog.add_destination(SAMPLE_DESTINATION, "Tokyo", Some(today + Duration::days(75)));
        catalog.add_destination("dest-lisbon", "Lisbon", Some(today + Duration::days(35)));
        catalog.add_destination("dest-goa", "Goa", None);

        catalog
    }

    fn add_requirement(&mut self, requirement: VisaRequirement) {
        self.requirements.insert(requirement.id.clone(), requirement);
    }

    fn add_destination(&mut self, id: &str, name: &str, entry_date: Option<NaiveDate>) {
        let id = DestinationId(id.to_string());
        self.destinations.insert(
            id.clone(),
            TripDestination {
                id,
                name: name.to_string(),
                entry_date,
                visa_required: true,
            },
        );
    }
}

fn documents(entries: &[(&str, bool)]) -> Vec<RequiredDocument> {
    entries
        .iter()
        .map(|(document_type, mandatory)| RequiredDocument {
            document_type: (*document_type).to_string(),
            mandatory: *mandatory,
        })
        .collect()
}

impl RequirementCatalog for InMemoryCatalog {
    fn requirement(&self, id: &RequirementId) -> Result<Option<VisaRequirement>, CatalogError> {
        Ok(self.requirements.get(id).cloned())
    }

    fn destination(&self, id: &DestinationId) -> Result<Option<TripDestination>, CatalogError> {
        Ok(self.destinations.get(id).cloned())
    }
}

/// Keeps delivered notifications in memory and mirrors them to the log.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotifier {
    events: Arc<Mutex<Vec<StatusChangeNotification>>>,
}

impl NotificationPublisher for InMemoryNotifier {
    fn publish(&self, notification: StatusChangeNotification) -> Result<(), NotificationError> {
        info!(
            application_id = %notification.application_id,
            from = %notification.old_status,
            to = %notification.new_status,
            "status change notification queued"
        );
        let mut guard = self.events.lock().expect("notifier mutex poisoned");
        guard.push(notification);
        Ok(())
    }
}

impl InMemoryNotifier {
    pub(crate) fn events(&self) -> Vec<StatusChangeNotification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Accepts RFC 3339 instants or plain dates (midnight UTC).
pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&Utc));
    }
    parse_date(trimmed)
        .map(start_of_day)
        .map_err(|_| format!("failed to parse '{raw}' as an RFC 3339 instant or YYYY-MM-DD"))
}

pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}
