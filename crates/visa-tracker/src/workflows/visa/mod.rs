pub mod applications;
pub mod feasibility;
pub mod itinerary;
pub mod timeline;

pub use feasibility::{assess_trip_feasibility, DestinationPlan, FeasibilityStatus, TripFeasibility};
pub use itinerary::{ItineraryImportError, ItineraryImporter};
pub use timeline::{classify_risk, compute_timeline, RiskLevel, TimelineError, VisaTimeline};
