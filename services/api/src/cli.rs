use crate::demo::{run_demo, run_periods_check, DemoArgs, PeriodsCheckArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use epicq::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "EPIC-Q Management",
    about = "Run and exercise the EPIC-Q study rules service from the command line",
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
    /// Work with recruitment period schedules
    Periods {
        #[command(subcommand)]
        command: PeriodsCommand,
    },
    /// Seed an in-memory study and walk through scoring, scheduling and alerting
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum PeriodsCommand {
    /// Validate a CSV schedule of recruitment periods row by row
    Check(PeriodsCheckArgs),
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
        Command::Periods {
            command: PeriodsCommand::Check(args),
        } => run_periods_check(args),
        Command::Demo(args) => run_demo(args),
    }
}
