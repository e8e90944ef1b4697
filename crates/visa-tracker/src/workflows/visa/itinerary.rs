//! CSV itinerary import feeding the trip feasibility check.

use super::feasibility::DestinationPlan;
use super::timeline::{parse_entry_date, TimelineError};
use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::path::Path;

#[derive(Debug)]
pub enum ItineraryImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    EntryDate { destination: String, source: TimelineError },
    ProcessingDays { destination: String, value: String },
}

impl std::fmt::Display for ItineraryImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItineraryImportError::Io(err) => write!(f, "failed to read itinerary: {}", err),
            ItineraryImportError::Csv(err) => write!(f, "invalid itinerary CSV data: {}", err),
            ItineraryImportError::EntryDate {
                destination,
                source,
            } => write!(f, "destination '{}': {}", destination, source),
            ItineraryImportError::ProcessingDays { destination, value } => write!(
                f,
                "destination '{}': processing days '{}' is not a whole number",
                destination, value
            ),
        }
    }
}

impl std::error::Error for ItineraryImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ItineraryImportError::Io(err) => Some(err),
            ItineraryImportError::Csv(err) => Some(err),
            ItineraryImportError::EntryDate { source, .. } => Some(source),
            ItineraryImportError::ProcessingDays { .. } => None,
        }
    }
}

impl From<std::io::Error> for ItineraryImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ItineraryImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub struct ItineraryImporter;

impl ItineraryImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<DestinationPlan>, ItineraryImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Read `Destination,Visa Required,Processing Days,Entry Date` rows. Blank processing days or
    /// entry dates are kept as missing data so the feasibility check can flag them.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<DestinationPlan>, ItineraryImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut plans = Vec::new();

        for record in csv_reader.deserialize::<ItineraryRow>() {
            let row = record?;
            plans.push(row.into_plan()?);
        }

        Ok(plans)
    }
}

#[derive(Debug, Deserialize)]
struct ItineraryRow {
    #[serde(rename = "Destination")]
    destination: String,
    #[serde(rename = "Visa Required", deserialize_with = "yes_no")]
    visa_required: bool,
    #[serde(
        rename = "Processing Days",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    processing_days: Option<String>,
    #[serde(rename = "Entry Date", default, deserialize_with = "empty_string_as_none")]
    entry_date: Option<String>,
}

impl ItineraryRow {
    fn into_plan(self) -> Result<DestinationPlan, ItineraryImportError> {
        let processing_time_max = match self.processing_days.as_deref() {
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
                ItineraryImportError::ProcessingDays {
                    destination: self.destination.clone(),
                    value: raw.to_string(),
                }
            })?),
            None => None,
        };

        let entry_date = self
            .entry_date
            .as_deref()
            .map(parse_entry_date)
            .transpose()
            .map_err(|source| ItineraryImportError::EntryDate {
                destination: self.destination.clone(),
                source,
            })?;

        Ok(DestinationPlan {
            destination_name: self.destination,
            visa_required: self.visa_required,
            processing_time_max,
            entry_date,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn yes_no<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Ok(true),
        "no" | "n" | "false" | "0" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected yes/no for visa requirement, found '{other}'"
        ))),
    }
}
