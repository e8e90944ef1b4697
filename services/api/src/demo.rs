use crate::infra::{
    parse_date, parse_instant, start_of_day, InMemoryApplicationRepository, InMemoryCatalog,
    InMemoryNotifier, SAMPLE_DESTINATION, SAMPLE_REQUIREMENT,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use visa_tracker::error::AppError;
use visa_tracker::workflows::visa::applications::{
    ApplicationServiceError, AppointmentUpdate, DestinationId, RequirementId, StatusUpdate,
    UserId, VisaApplication, VisaApplicationService, VisaApplicationStatus,
};
use visa_tracker::workflows::visa::{
    assess_trip_feasibility, classify_risk, compute_timeline, DestinationPlan, ItineraryImporter,
    TripFeasibility, VisaTimeline,
};

#[derive(Args, Debug)]
pub(crate) struct TimelineArgs {
    /// Entry date at the destination (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) entry_date: NaiveDate,
    /// Maximum processing time in days (defaults to 15)
    #[arg(long)]
    pub(crate) processing_days: Option<i64>,
    /// Submission instant (RFC 3339 or YYYY-MM-DD) used for the expected decision
    #[arg(long, value_parser = parse_instant)]
    pub(crate) submitted_on: Option<DateTime<Utc>>,
    /// Evaluation date for the risk classification (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct TripArgs {
    /// Itinerary CSV with Destination,Visa Required,Processing Days,Entry Date columns
    #[arg(long)]
    pub(crate) itinerary: PathBuf,
    /// Evaluation date for the feasibility check (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Date the demo starts on (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Skip the trip feasibility portion of the demo
    #[arg(long)]
    pub(crate) skip_trip: bool,
}

fn evaluation_instant(today: Option<NaiveDate>) -> DateTime<Utc> {
    today.map(start_of_day).unwrap_or_else(Utc::now)
}

pub(crate) fn run_timeline(args: TimelineArgs) -> Result<(), AppError> {
    let TimelineArgs {
        entry_date,
        processing_days,
        submitted_on,
        today,
    } = args;

    let now = evaluation_instant(today);
    let timeline = compute_timeline(processing_days, Some(entry_date), submitted_on)
        .map_err(ApplicationServiceError::from)?;

    println!("Visa timeline for entry on {}", entry_date);
    render_timeline(&timeline, now);
    Ok(())
}

pub(crate) fn run_trip(args: TripArgs) -> Result<(), AppError> {
    let TripArgs { itinerary, today } = args;

    let plans = ItineraryImporter::from_path(&itinerary)?;
    let now = evaluation_instant(today);
    let verdict = assess_trip_feasibility(&plans, now);

    println!(
        "Trip feasibility for {} ({} destination(s), evaluated {})",
        itinerary.display(),
        plans.len(),
        now.date_naive()
    );
    render_feasibility(&plans, &verdict);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { today, skip_trip } = args;
    let today = today.unwrap_or_else(|| Utc::now().date_naive());
    let start = start_of_day(today) + Duration::hours(9);
    let step = |days: i64| start + Duration::days(days);

    println!("Visa application lifecycle demo (starting {})", today);

    let repository = Arc::new(InMemoryApplicationRepository::default());
    let notifier = Arc::new(InMemoryNotifier::default());
    let service = VisaApplicationService::new(
        repository.clone(),
        Arc::new(InMemoryCatalog::seeded(today)),
        notifier.clone(),
    );

    let application = service.create(
        UserId("demo-traveler".to_string()),
        RequirementId(SAMPLE_REQUIREMENT.to_string()),
        DestinationId(SAMPLE_DESTINATION.to_string()),
        start,
    )?;
    println!("- Opened application {} -> {}", application.id, application.status());
    render_timeline(&service.timeline(&application.id)?, start);

    repository.record_upload(&application.id, "PASSPORT");
    repository.record_upload(&application.id, "PHOTO");
    let partial = service.check_completeness(&application.id, step(1))?;
    println!(
        "- Documents {}/{} uploaded ({:.0}%), missing: {}",
        partial.uploaded_count,
        partial.total_mandatory,
        partial.ratio().unwrap_or(1.0) * 100.0,
        partial.missing_mandatory.join(", ")
    );

    repository.record_upload(&application.id, "BANK_STATEMENT");
    let complete = service.check_completeness(&application.id, step(2))?;
    println!(
        "- Documents complete: {} -> {}",
        complete.is_complete,
        service.get(&application.id)?.status()
    );

    let booked = service.update_appointment(
        &application.id,
        AppointmentUpdate {
            date: Some(step(9)),
            location: Some("Embassy of Japan, visa section".to_string()),
            kind: Some("in-person".to_string()),
            ..AppointmentUpdate::default()
        },
        step(3),
    )?;
    println!("- Appointment booked -> {}", booked.status());

    let submitted = service.transition(
        &application.id,
        VisaApplicationStatus::Submitted,
        StatusUpdate {
            submission_date: Some(step(9)),
            notes: Some("Submitted at the appointment".to_string()),
            ..StatusUpdate::default()
        },
        step(9),
    )?;
    if let Some(expected) = submitted.expected_decision_date() {
        println!("- Submitted; decision expected by {}", expected.date_naive());
    }

    service.transition(
        &application.id,
        VisaApplicationStatus::UnderReview,
        StatusUpdate::default(),
        step(11),
    )?;
    let approved = service.transition(
        &application.id,
        VisaApplicationStatus::Approved,
        StatusUpdate {
            decision_date: Some(step(20)),
            ..StatusUpdate::default()
        },
        step(20),
    )?;

    match service.transition(
        &application.id,
        VisaApplicationStatus::Submitted,
        StatusUpdate::default(),
        step(21),
    ) {
        Err(err) => println!("- Reopening rejected as expected: {}", err),
        Ok(_) => println!("- Unexpectedly reopened an approved application"),
    }

    render_history(&approved);

    let tracking = service.tracking(&application.id, step(21))?;
    println!(
        "\nProgress {}% at step {}",
        tracking.progress_percentage, tracking.current_step
    );
    match serde_json::to_string_pretty(&tracking) {
        Ok(json) => println!("Tracking payload:\n{}", json),
        Err(err) => println!("Tracking payload unavailable: {}", err),
    }

    let events = notifier.events();
    println!("\nNotifications dispatched: {}", events.len());
    for event in events {
        println!(
            "  - {} -> {} at {}",
            event.old_status, event.new_status, event.timestamp
        );
    }

    if skip_trip {
        return Ok(());
    }

    let plans = demo_itinerary(today);
    let verdict = assess_trip_feasibility(&plans, start);
    println!("\nTrip feasibility demo");
    render_feasibility(&plans, &verdict);
    Ok(())
}

fn demo_itinerary(today: NaiveDate) -> Vec<DestinationPlan> {
    vec![
        DestinationPlan {
            destination_name: "Japan".to_string(),
            visa_required: true,
            processing_time_max: Some(15),
            entry_date: Some(today + Duration::days(75)),
        },
        DestinationPlan {
            destination_name: "India".to_string(),
            visa_required: true,
            processing_time_max: Some(30),
            entry_date: Some(today + Duration::days(45)),
        },
        DestinationPlan {
            destination_name: "Vietnam".to_string(),
            visa_required: true,
            processing_time_max: None,
            entry_date: Some(today + Duration::days(60)),
        },
        DestinationPlan {
            destination_name: "Singapore".to_string(),
            visa_required: false,
            processing_time_max: None,
            entry_date: Some(today + Duration::days(90)),
        },
    ]
}

fn render_timeline(timeline: &VisaTimeline, now: DateTime<Utc>) {
    println!("  Processing time: {} day(s)", timeline.processing_days);
    println!(
        "  Recommended submission: {}",
        timeline.recommended_submission_date
    );
    println!(
        "  Latest submission: {} ({})",
        timeline.latest_submission_date,
        classify_risk(timeline.latest_submission_date, now).label()
    );
    match timeline.expected_decision_date {
        Some(expected) => println!("  Expected decision: {}", expected),
        None => println!("  Expected decision: not yet submitted"),
    }
}

fn render_feasibility(plans: &[DestinationPlan], verdict: &TripFeasibility) {
    for plan in plans {
        let processing = plan
            .processing_time_max
            .map(|days| format!("{days} day(s)"))
            .unwrap_or_else(|| "unknown".to_string());
        let entry = plan
            .entry_date
            .map(|date| date.to_string())
            .unwrap_or_else(|| "undated".to_string());
        println!(
            "- {} | visa {} | processing {} | entry {}",
            plan.destination_name,
            if plan.visa_required { "required" } else { "not required" },
            processing,
            entry
        );
    }

    println!("Verdict: {} ({})", verdict.status.label(), verdict.summary);
    for risky in &verdict.risky_destinations {
        let risk = risky
            .risk
            .map(|level| level.label())
            .unwrap_or("UNKNOWN");
        println!("  - [{}] {}: {}", risk, risky.destination_name, risky.reason);
    }
}

fn render_history(application: &VisaApplication) {
    println!("\nStatus history");
    for entry in application.status_history() {
        match &entry.notes {
            Some(notes) => println!("- {} {} ({})", entry.changed_at, entry.status, notes),
            None => println!("- {} {}", entry.changed_at, entry.status),
        }
    }
}
