use super::completeness::DocumentCompleteness;
use super::domain::VisaApplicationStatus;

/// Share of the progress bar that document uploads can fill before the first transition.
const DOCUMENT_PROGRESS_SPAN: usize = 20;

pub const fn status_weight(status: VisaApplicationStatus) -> u8 {
    match status {
        VisaApplicationStatus::NotStarted => 0,
        VisaApplicationStatus::DocumentsInProgress => 20,
        VisaApplicationStatus::AppointmentBooked => 40,
        VisaApplicationStatus::Submitted => 60,
        VisaApplicationStatus::UnderReview => 80,
        VisaApplicationStatus::Approved | VisaApplicationStatus::Rejected => 100,
        VisaApplicationStatus::Cancelled => 0,
    }
}

/// Map the current status, and uploads while documents are still being gathered, onto 0..=100.
pub fn estimate_progress(status: VisaApplicationStatus, completeness: &DocumentCompleteness) -> u8 {
    let base = status_weight(status);

    let gathering = matches!(
        status,
        VisaApplicationStatus::NotStarted | VisaApplicationStatus::DocumentsInProgress
    );
    if !gathering || completeness.total_mandatory == 0 {
        return base;
    }

    let total = completeness.total_mandatory;
    let uploaded = completeness.uploaded_count.min(total);
    // round half up
    let document_progress = (2 * DOCUMENT_PROGRESS_SPAN * uploaded + total) / (2 * total);

    base.max(document_progress as u8)
}
