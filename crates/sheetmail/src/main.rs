//! `sheetmail` - mail merge from a spreadsheet
//!
//! Renders a `#A1#` body template for every row of a sheet and sends the
//! results over one SMTP session.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod args;
mod commands;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use args::{Cli, Command};

const DEFAULT_FILTER: &str = "sheetmail=info,sheetmail_core=info,sheetmail_smtp=warn";
const VERBOSE_FILTER: &str = "sheetmail=debug,sheetmail_core=debug,sheetmail_smtp=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                if cli.verbose {
                    VERBOSE_FILTER.into()
                } else {
                    DEFAULT_FILTER.into()
                }
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!(?cli, "Starting sheetmail");

    match cli.command {
        Command::Sheets { workbook } => commands::sheets(&workbook),
        Command::Show { sheet, limit } => commands::show(&sheet, limit),
        Command::Generate(generate) => commands::generate(generate).await,
        Command::Preview { sheet, campaign, row } => {
            commands::preview(&sheet, campaign, row).await
        }
        Command::Send {
            sheet,
            campaign,
            yes,
            remember_password,
        } => commands::send(&sheet, campaign, yes, remember_password).await,
        Command::Config { action } => commands::config(action).await,
    }
}
