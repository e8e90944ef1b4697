use crate::demo::{run_demo, run_timeline, run_trip, DemoArgs, TimelineArgs, TripArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use visa_tracker::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Visa Tracker",
    about = "Track visa applications and plan submission deadlines from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Compute the submission window and expected decision for one destination
    Timeline(TimelineArgs),
    /// Assess an itinerary CSV for visa deadline feasibility
    Trip(TripArgs),
    /// Walk one application through its lifecycle using in-memory adapters
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Timeline(args) => run_timeline(args),
        Command::Trip(args) => run_trip(args),
        Command::Demo(args) => run_demo(args),
    }
}
