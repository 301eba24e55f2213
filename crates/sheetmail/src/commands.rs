//! Subcommand implementations.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use sheetmail_core::campaign::DraftBuilder;
use sheetmail_core::credentials::{
    PASSWORD_ENV, delete_smtp_password, resolve_smtp_password, store_smtp_password,
};
use sheetmail_core::{
    Batch, Campaign, DispatchRange, Settings, SmtpSettings, SmtpTransport, TemplateGenerator,
    Workbook,
};
use sheetmail_template::CellSource;
use tracing::{info, warn};

use crate::args::{CampaignArgs, ConfigAction, GenerateArgs, SheetArgs};

/// Opens the workbook and activates the requested sheet.
fn open_sheet(args: &SheetArgs) -> Result<Workbook> {
    let mut workbook = Workbook::open(&args.workbook)
        .with_context(|| format!("Failed to open `{}`", args.workbook.display()))?;
    match &args.sheet {
        Some(name) => {
            workbook.select(name)?;
        }
        None => ensure!(
            workbook.active().is_some(),
            "`{}` has no sheets",
            args.workbook.display()
        ),
    }
    Ok(workbook)
}

pub fn sheets(path: &Path) -> Result<()> {
    let workbook =
        Workbook::open(path).with_context(|| format!("Failed to open `{}`", path.display()))?;
    for sheet in workbook.sheets() {
        println!(
            "{}\t{} rows x {} columns",
            sheet.name,
            sheet.grid.row_count(),
            sheet.grid.column_count()
        );
    }
    Ok(())
}

pub fn show(args: &SheetArgs, limit: Option<usize>) -> Result<()> {
    let workbook = open_sheet(args)?;
    let columns = workbook.column_count();
    let rows = limit.map_or(workbook.row_count(), |n| n.min(workbook.row_count()));

    let header: Vec<String> = (1..=columns).map(|c| workbook.header_name(c)).collect();
    println!("\t{}", header.join("\t"));
    for row in 1..=rows {
        let cells: Vec<String> = (1..=columns).map(|c| workbook.value_at(row, c)).collect();
        println!("{row}\t{}", cells.join("\t"));
    }
    Ok(())
}

pub async fn generate(args: GenerateArgs) -> Result<()> {
    let settings = Settings::load().await.context("Failed to load settings")?;
    let generator = TemplateGenerator {
        name_column: args.name_column,
        final_grade_column: args.grade_column,
        course_code: args.course_code.or(Some(settings.course_code)),
        columns: args.columns,
        header_row: args.header_row,
        max_points_row: args.max_row,
        sender_name: args.sender_name.unwrap_or(settings.sender_name),
    };
    print!("{}", generator.generate()?);
    Ok(())
}

/// Merges saved settings, overrides and the template file into a campaign.
async fn load_campaign(args: CampaignArgs, workbook: &Workbook) -> Result<(Settings, Campaign)> {
    let mut settings = Settings::load().await.context("Failed to load settings")?;
    args.overrides.apply(&mut settings);
    if args.save {
        let path = settings.save().await.context("Failed to save settings")?;
        info!("Saved settings to {}", path.display());
    }

    let body = tokio::fs::read_to_string(&args.template)
        .await
        .with_context(|| format!("Failed to read template `{}`", args.template.display()))?;

    let all = DispatchRange::all(workbook.row_count());
    let range = DispatchRange::new(
        args.first.unwrap_or(all.first_row),
        args.last.unwrap_or(all.last_row),
    );
    let campaign = settings.campaign(body, range);
    Ok((settings, campaign))
}

pub async fn preview(sheet: &SheetArgs, args: CampaignArgs, row: u32) -> Result<()> {
    let workbook = open_sheet(sheet)?;
    let (_, campaign) = load_campaign(args, &workbook).await?;

    let draft = DraftBuilder::from_campaign(&campaign).build(row, &workbook);
    if let Some(problem) = &draft.problem {
        warn!(row, ?problem, "This row cannot be sent");
    }
    println!("{}", sheetmail_core::preview(&campaign, row, &workbook));
    Ok(())
}

pub async fn send(
    sheet: &SheetArgs,
    args: CampaignArgs,
    yes: bool,
    remember_password: bool,
) -> Result<()> {
    let workbook = open_sheet(sheet)?;
    let (settings, campaign) = load_campaign(args, &workbook).await?;

    let batch = Batch::new(campaign)
        .validate(&workbook)
        .map_err(|rejected| rejected.error)
        .context("Nothing was sent")?;

    let count = batch.rows().len();
    if !yes && !confirm(&format!("Send {count} mails from {}?", batch.campaign().sender_email))? {
        println!("Cancelled.");
        return Ok(());
    }

    let password = smtp_password(&settings.smtp, remember_password)?;
    let mut transport = SmtpTransport::connect(&settings.smtp, &password).await?;

    let outcome = batch.dispatch(&mut transport).await;
    if outcome.aborted.is_none()
        && let Err(e) = transport.close().await
    {
        warn!(error = %e, "QUIT failed");
    }

    println!("{}", outcome.summary());
    if outcome.report_sent {
        println!("Report sent to {}.", settings.sender_email);
    }
    ensure!(
        outcome.is_complete_success(),
        "{} of {} mails were not sent",
        count - outcome.succeeded,
        count
    );
    Ok(())
}

pub async fn config(action: Option<ConfigAction>) -> Result<()> {
    let mut settings = Settings::load().await.context("Failed to load settings")?;
    match action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            println!("# {}", Settings::default_path().display());
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        ConfigAction::Set { overrides } => {
            overrides.apply(&mut settings);
            let path = settings.save().await.context("Failed to save settings")?;
            println!("Saved {}", path.display());
        }
        ConfigAction::ForgetPassword => {
            delete_smtp_password(&settings.smtp)?;
            println!(
                "Removed the password for {}@{}",
                settings.smtp.username, settings.smtp.host
            );
        }
    }
    Ok(())
}

/// Password from the environment, the keyring or a prompt.
fn smtp_password(smtp: &SmtpSettings, remember: bool) -> Result<String> {
    if smtp.username.is_empty() {
        return Ok(String::new());
    }

    let stored = resolve_smtp_password(smtp).unwrap_or_else(|e| {
        warn!(error = %e, "Keyring unavailable");
        None
    });
    let password = match stored {
        Some(password) => password,
        None => {
            let password = rpassword::prompt_password(format!(
                "Password for {}@{} (or set {PASSWORD_ENV}): ",
                smtp.username, smtp.host
            ))
            .context("Failed to read the password")?;
            non_empty_password(password)?
        }
    };

    if remember && let Err(e) = store_smtp_password(smtp, &password) {
        warn!(error = %e, "Password not stored");
    }
    Ok(password)
}

fn non_empty_password(password: String) -> Result<String> {
    if password.is_empty() {
        bail!("No SMTP password given");
    }
    Ok(password)
}

fn confirm(question: &str) -> Result<bool> {
    let answer = prompt(&format!("{question} [y/N] "))?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim(), "y" | "Y" | "yes")
}

fn prompt(question: &str) -> Result<String> {
    eprint!("{question}");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
