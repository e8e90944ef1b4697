use serde::{Deserialize, Serialize};

use super::domain::ApplicationDocument;

/// History note recorded when the gate promotes an application.
pub const DOCUMENTS_COMPLETE_NOTE: &str = "All mandatory documents uploaded";

/// Outcome of checking uploads against the requirement checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCompleteness {
    pub is_complete: bool,
    pub total_mandatory: usize,
    pub uploaded_count: usize,
    pub missing_mandatory: Vec<String>,
}

impl DocumentCompleteness {
    /// Fraction of mandatory documents on file, `None` when nothing is mandatory.
    pub fn ratio(&self) -> Option<f64> {
        if self.total_mandatory == 0 {
            None
        } else {
            Some(self.uploaded_count as f64 / self.total_mandatory as f64)
        }
    }
}

/// Compare mandatory document types with the documents actually uploaded.
///
/// Only documents flagged `uploaded` count; matching is by exact document type.
pub fn evaluate(mandatory: &[String], documents: &[ApplicationDocument]) -> DocumentCompleteness {
    let missing_mandatory: Vec<String> = mandatory
        .iter()
        .filter(|document_type| {
            !documents
                .iter()
                .any(|doc| doc.uploaded && &doc.document_type == *document_type)
        })
        .cloned()
        .collect();

    DocumentCompleteness {
        is_complete: missing_mandatory.is_empty(),
        total_mandatory: mandatory.len(),
        uploaded_count: mandatory.len() - missing_mandatory.len(),
        missing_mandatory,
    }
}
