use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use studyblock_core::{DayRange, Planner};
use studyblock_ingest::{
    AssignmentRecord, AvailabilitySource, CanvasClient, CombinedSource, CsvCommitments,
    NoCommitments, load_assignments_json, records_into_tasks,
};

mod calendar;
mod config;
#[cfg(feature = "gcal")]
mod google_calendar;
mod logging;
mod render;
mod state;

use config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "studyblock",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("STUDYBLOCK_BUILD_SHA"), ")"),
    about = "Turn assignments into study blocks around your fixed schedule"
)]
struct Cli {
    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan study blocks for the coming days
    Plan {
        /// Number of days to plan (default: [scheduler] day_range_days)
        #[arg(long)]
        days: Option<u32>,

        /// JSON array of assignment records
        #[arg(long)]
        assignments: Option<PathBuf>,

        /// CSV of fixed commitments (start,end,kind,title in local time)
        #[arg(long)]
        commitments: Option<PathBuf>,

        /// Also fetch upcoming assignments from Canvas
        #[arg(long)]
        canvas: bool,

        /// Print per-day totals and the unscheduled list
        #[arg(long)]
        summary: bool,

        /// Print the plan as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Write the study blocks to an ICS file
        #[arg(long)]
        ics: Option<PathBuf>,

        /// Push the study blocks to Google Calendar
        #[arg(long)]
        push: bool,

        /// Keep a copy of the plan as JSON in the studyblock home
        #[arg(long)]
        save: bool,
    },

    /// Show the free windows the planner would use
    Windows {
        #[arg(long)]
        days: Option<u32>,

        #[arg(long)]
        commitments: Option<PathBuf>,
    },

    /// Test the configured connections
    Check,

    /// Config file commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Google Calendar commands
    Calendar {
        #[command(subcommand)]
        command: CalendarCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config.toml if none exists
    Init,
    /// Print the effective configuration
    Show,
}

#[derive(Subcommand, Debug)]
enum CalendarCommand {
    /// Import a Desktop-app OAuth client secret and authorize the Google Calendar API
    Connect {
        /// client_secret JSON downloaded from the Cloud Console (reuses the stored one if omitted)
        #[arg(long)]
        credentials: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config()?;
    logging::init_logging(&cfg.logging.level, cli.verbose)?;

    match cli.command {
        Command::Plan {
            days,
            assignments,
            commitments,
            canvas,
            summary,
            json,
            ics,
            push,
            save,
        } => {
            plan(
                &cfg,
                PlanArgs {
                    days,
                    assignments,
                    commitments,
                    canvas,
                    summary,
                    json,
                    ics,
                    push,
                    save,
                },
            )
            .await?;
        }

        Command::Windows { days, commitments } => {
            let planner = Planner::new(cfg.scheduler.clone())?;
            let tz = planner.availability().tz();
            let range = run_range(&planner, days);
            let fixed = commitment_source(commitments, tz).fetch(range)?;
            let windows = planner.windows(range, &fixed, Utc::now());
            print!("{}", render::render_windows(&windows, tz));
        }

        Command::Check => check(&cfg).await?,

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                println!("# {}", config::config_path()?.display());
                let mut shown = cfg.clone();
                if shown.canvas.token.is_some() {
                    shown.canvas.token = Some("********".to_string());
                }
                print!("{}", toml::to_string_pretty(&shown).context("serialize config")?);
            }
        },

        Command::Calendar { command } => match command {
            CalendarCommand::Connect { credentials } => {
                #[cfg(feature = "gcal")]
                google_calendar::connect(credentials.as_deref()).await?;

                #[cfg(not(feature = "gcal"))]
                {
                    let _ = credentials;
                    bail!("built without the `gcal` feature; rebuild with --features gcal or use --ics / gcalcli");
                }
            }
        },
    }

    Ok(())
}

struct PlanArgs {
    days: Option<u32>,
    assignments: Option<PathBuf>,
    commitments: Option<PathBuf>,
    canvas: bool,
    summary: bool,
    json: bool,
    ics: Option<PathBuf>,
    push: bool,
    save: bool,
}

fn run_range(planner: &Planner, days: Option<u32>) -> DayRange {
    let range = planner.default_range(Utc::now());
    match days {
        Some(d) => DayRange::new(range.first_day, d.max(1)),
        None => range,
    }
}

fn commitment_source(path: Option<PathBuf>, tz: chrono_tz::Tz) -> CombinedSource {
    match path {
        Some(p) => CombinedSource::new().with(CsvCommitments::new(p, tz)),
        None => CombinedSource::new().with(NoCommitments),
    }
}

fn canvas_client(cfg: &Config) -> Result<CanvasClient> {
    let token = cfg
        .canvas
        .resolved_token()
        .context("no Canvas token; set [canvas] token in config.toml or CANVAS_API_TOKEN")?;
    CanvasClient::new(&cfg.canvas.base_url, &token)
}

async fn plan(cfg: &Config, args: PlanArgs) -> Result<()> {
    let now = Utc::now();
    let planner = Planner::new(cfg.scheduler.clone())?;
    let tz = planner.availability().tz();
    let range = run_range(&planner, args.days);

    let mut records: Vec<AssignmentRecord> = Vec::new();
    if let Some(path) = &args.assignments {
        records.extend(load_assignments_json(path)?);
    }
    if args.canvas {
        let client = canvas_client(cfg)?;
        let fetched = client
            .upcoming_assignments(cfg.canvas.upcoming_days, now)
            .await
            .context("fetching Canvas assignments")?;
        info!(count = fetched.len(), "canvas assignments fetched");
        records.extend(fetched);
    }
    if args.assignments.is_none() && !args.canvas {
        bail!("no assignment source; pass --assignments <file.json> and/or --canvas");
    }

    let tasks = records_into_tasks(records, now)?;
    let fixed = commitment_source(args.commitments, tz).fetch(range)?;
    let outcome = planner.plan(tasks, &fixed, range, now)?;

    if args.save {
        match state::write_last_plan(&outcome) {
            Ok(p) => info!(path = %p.display(), "saved plan"),
            Err(e) => warn!(error = %format!("{e:#}"), "could not save plan"),
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", render::render_schedule(&outcome, tz));
        if args.summary {
            println!();
            print!("{}", render::render_summary(&outcome, tz));
        }
    }

    if args.ics.is_none() && !args.push {
        return Ok(());
    }

    let events = calendar::schedule_to_events(&outcome.result, &cfg.calendar);
    let ics = calendar::events_to_ics(&events);
    if let Some(path) = &args.ics {
        std::fs::write(path, &ics).with_context(|| format!("write {}", path.display()))?;
        eprintln!("Wrote {} events to {}", events.len(), path.display());
    }
    if args.push {
        #[cfg(feature = "gcal")]
        {
            let ids = google_calendar::push_events(&cfg.calendar.calendar_id, &events).await?;
            eprintln!("Pushed {} events to Google Calendar", ids.len());
            for id in &ids {
                tracing::debug!(%id, "google event");
            }
        }

        #[cfg(not(feature = "gcal"))]
        {
            calendar::push_ics_via_gcalcli(&ics, Some(&cfg.calendar.calendar_id))?;
            eprintln!("Imported {} events via gcalcli", events.len());
        }
    }

    Ok(())
}

async fn check(cfg: &Config) -> Result<()> {
    println!("config: {}", config::config_path()?.display());

    match Planner::new(cfg.scheduler.clone()) {
        Ok(_) => println!("scheduler: ok ({})", cfg.scheduler.timezone),
        Err(e) => println!("scheduler: invalid ({e})"),
    }

    match canvas_client(cfg) {
        Ok(client) => {
            let ok = client.check_connection().await?;
            println!("canvas: {}", if ok { "connected" } else { "connection failed" });
        }
        Err(e) => println!("canvas: not configured ({e})"),
    }

    println!(
        "gcalcli: {}",
        if which::which("gcalcli").is_ok() {
            "found"
        } else {
            "not installed"
        }
    );

    #[cfg(feature = "gcal")]
    match google_calendar::stored_client_secret() {
        Ok(_) => println!("google calendar api: credentials stored"),
        Err(_) => println!("google calendar api: not connected (run: studyblock calendar connect)"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_does_not_save_unless_asked() {
        let cli = Cli::try_parse_from(["studyblock", "plan", "--assignments", "a.json"]).unwrap();
        match cli.command {
            Command::Plan { save, push, .. } => {
                assert!(!save);
                assert!(!push);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["studyblock", "plan", "--canvas", "--save"]).unwrap();
        assert!(matches!(cli.command, Command::Plan { save: true, canvas: true, .. }));
    }

    #[test]
    fn connect_takes_a_credentials_file() {
        let cli = Cli::try_parse_from([
            "studyblock",
            "calendar",
            "connect",
            "--credentials",
            "client_secret.json",
        ])
        .unwrap();
        match cli.command {
            Command::Calendar {
                command: CalendarCommand::Connect { credentials },
            } => assert_eq!(credentials, Some(PathBuf::from("client_secret.json"))),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
