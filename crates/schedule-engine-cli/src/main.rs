//! `schedule`: expand recurrence rules and compute booking availability.
//!
//! Reads a rule or availability settings as JSON (from a file or `-` for
//! stdin) and prints the result as JSON on stdout.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use schedule_engine::slots::DEFAULT_WINDOW_DAYS;
use schedule_engine::time::format_time_of_day;
use schedule_engine::{
    bookable_days, candidate_dates, default_time_slots, expand_with_options, ical,
    AvailabilityConfig, AvailabilitySettings, ExpandOptions, MonthOverflow, RecurrenceRule,
    WeekStartDay,
};
use serde_json::json;

#[derive(Parser)]
#[command(name = "schedule", version, about = "Recurrence expansion and booking availability")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a recurrence rule without expanding it
    Validate {
        /// Rule JSON file, or `-` for stdin
        rule: PathBuf,
    },
    /// Expand a recurrence rule into occurrence dates
    Expand {
        /// Rule JSON file, or `-` for stdin
        rule: PathBuf,
        /// First date of the series (YYYY-MM-DD)
        #[arg(long)]
        anchor: NaiveDate,
        /// Maximum number of occurrences
        #[arg(long, default_value_t = 50)]
        max: usize,
        #[arg(long, value_enum, default_value_t = WeekStart::Sunday)]
        week_start: WeekStart,
        #[arg(long, value_enum, default_value_t = Overflow::Clamp)]
        month_overflow: Overflow,
    },
    /// Print a rule as iCalendar DTSTART/RRULE lines
    Rrule {
        /// Rule JSON file, or `-` for stdin
        rule: PathBuf,
        #[arg(long)]
        anchor: NaiveDate,
    },
    /// List candidate booking dates
    Dates {
        /// Availability settings JSON file, or `-` for stdin
        settings: PathBuf,
        /// Reference instant (RFC 3339); defaults to the current time
        #[arg(long)]
        now: Option<DateTime<Utc>>,
        /// Days to scan after today
        #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
        window: u32,
    },
    /// List time slots for one date
    Slots {
        /// Availability settings JSON file, or `-` for stdin
        settings: PathBuf,
        #[arg(long)]
        date: NaiveDate,
        /// Print the stock 09:00-16:00 schedule when the day is closed
        #[arg(long)]
        fallback_default: bool,
    },
    /// List candidate dates with their bookable slots
    Bookable {
        /// Availability settings JSON file, or `-` for stdin
        settings: PathBuf,
        /// Reference instant (RFC 3339); defaults to the current time
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum WeekStart {
    Sunday,
    Monday,
}

#[derive(Clone, Copy, ValueEnum)]
enum Overflow {
    Clamp,
    Skip,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Validate { rule } => {
            let rule = read_rule(&rule)?;
            rule.validate().context("rule is invalid")?;
            println!("valid");
        }
        Command::Expand {
            rule,
            anchor,
            max,
            week_start,
            month_overflow,
        } => {
            let rule = read_rule(&rule)?;
            let options = ExpandOptions {
                week_start: match week_start {
                    WeekStart::Sunday => WeekStartDay::Sunday,
                    WeekStart::Monday => WeekStartDay::Monday,
                },
                month_overflow: match month_overflow {
                    Overflow::Clamp => MonthOverflow::Clamp,
                    Overflow::Skip => MonthOverflow::Skip,
                },
            };
            let occurrences = expand_with_options(&rule, anchor, max, &options)
                .context("failed to expand rule")?;
            print_json(&occurrences)?;
        }
        Command::Rrule { rule, anchor } => {
            let rule = read_rule(&rule)?;
            match ical::to_ical_text(&rule, anchor)? {
                Some(text) => println!("{text}"),
                None => println!("DTSTART:{}T000000Z", anchor.format("%Y%m%d")),
            }
        }
        Command::Dates {
            settings,
            now,
            window,
        } => {
            let config = read_config(&settings)?;
            let now = now.unwrap_or_else(Utc::now);
            let dates = candidate_dates(&config, now, window)?;
            print_json(&dates)?;
        }
        Command::Slots {
            settings,
            date,
            fallback_default,
        } => {
            let config = read_config(&settings)?;
            let slots = match schedule_engine::time_slots(&config, date) {
                Ok(slots) => slots,
                Err(err) if fallback_default && err.is_no_availability() => {
                    tracing::info!(%date, "day closed, using default slots");
                    default_time_slots()
                }
                Err(err) => return Err(err.into()),
            };
            let slots: Vec<String> = slots.into_iter().map(format_time_of_day).collect();
            print_json(&slots)?;
        }
        Command::Bookable { settings, now } => {
            let config = read_config(&settings)?;
            let now = now.unwrap_or_else(Utc::now);
            let days: Vec<serde_json::Value> = bookable_days(&config, now)?
                .into_iter()
                .map(|day| {
                    let slots: Vec<String> =
                        day.slots.into_iter().map(format_time_of_day).collect();
                    json!({ "date": day.date, "slots": slots })
                })
                .collect();
            print_json(&days)?;
        }
    }
    Ok(())
}

fn read_input(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_rule(path: &PathBuf) -> Result<RecurrenceRule> {
    let text = read_input(path)?;
    serde_json::from_str(&text).with_context(|| format!("invalid rule JSON in {}", path.display()))
}

fn read_config(path: &PathBuf) -> Result<AvailabilityConfig> {
    let text = read_input(path)?;
    let settings = AvailabilitySettings::from_json(&text)
        .with_context(|| format!("invalid settings JSON in {}", path.display()))?;
    Ok(AvailabilityConfig::from_settings(&settings)?)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
