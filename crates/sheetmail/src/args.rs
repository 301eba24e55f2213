//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use sheetmail_core::{Security, Settings};

/// Send one personalised mail per spreadsheet row.
#[derive(Debug, Parser)]
#[command(name = "sheetmail", version, about)]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the sheets of a workbook with their sizes.
    Sheets {
        /// Spreadsheet file (xlsx, xlsm, xlsb, xls, ods).
        workbook: PathBuf,
    },

    /// Print a sheet with column letters and row numbers.
    Show {
        #[command(flatten)]
        sheet: SheetArgs,

        /// Print at most this many rows.
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Print a starter template built from column choices.
    Generate(GenerateArgs),

    /// Render the mail for one row.
    Preview {
        #[command(flatten)]
        sheet: SheetArgs,

        #[command(flatten)]
        campaign: CampaignArgs,

        /// Row to render.
        #[arg(long)]
        row: u32,
    },

    /// Validate the batch, then send one mail per row.
    Send {
        #[command(flatten)]
        sheet: SheetArgs,

        #[command(flatten)]
        campaign: CampaignArgs,

        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,

        /// Store the SMTP password in the system keyring.
        #[arg(long)]
        remember_password: bool,
    },

    /// Show or change saved settings.
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the settings file location and contents.
    Show,
    /// Change settings and save them.
    Set {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Remove the stored SMTP password from the keyring.
    ForgetPassword,
}

/// Workbook and sheet selection.
#[derive(Debug, Args)]
pub struct SheetArgs {
    /// Spreadsheet file (xlsx, xlsm, xlsb, xls, ods).
    pub workbook: PathBuf,

    /// Sheet name; the first sheet if omitted.
    #[arg(short, long)]
    pub sheet: Option<String>,
}

/// Body template, row range and per-run setting overrides.
#[derive(Debug, Args)]
pub struct CampaignArgs {
    /// File holding the body template.
    #[arg(short, long, value_name = "FILE")]
    pub template: PathBuf,

    /// First row to mail (default 1).
    #[arg(long, value_name = "ROW")]
    pub first: Option<u32>,

    /// Last row to mail (default: last row of the sheet).
    #[arg(long, value_name = "ROW")]
    pub last: Option<u32>,

    #[command(flatten)]
    pub overrides: Overrides,

    /// Save the merged settings for next time.
    #[arg(long)]
    pub save: bool,
}

/// Values that replace the saved settings for this run.
#[derive(Debug, Default, Args)]
pub struct Overrides {
    /// Sender display name.
    #[arg(long)]
    pub sender_name: Option<String>,

    /// Sender address.
    #[arg(long, value_name = "ADDRESS")]
    pub sender_email: Option<String>,

    /// Subject, without the course code.
    #[arg(long)]
    pub subject: Option<String>,

    /// Course code, shown as `[CODE]` before the subject.
    #[arg(long, value_name = "CODE")]
    pub course_code: Option<String>,

    /// Blind copies, separated by `;`.
    #[arg(long, value_name = "ADDRESSES")]
    pub bcc: Option<String>,

    /// Cell holding each row's address, e.g. `C`.
    #[arg(long, value_name = "REF")]
    pub email_column: Option<String>,

    /// Appended to every address cell, e.g. `@student.example.edu`.
    #[arg(long, value_name = "SUFFIX")]
    pub append: Option<String>,

    /// Leave out rows whose address cell is blank.
    #[arg(long, value_name = "BOOL")]
    pub skip_blank: Option<bool>,

    /// Mail a summary to the sender afterwards.
    #[arg(long, value_name = "BOOL")]
    pub report: Option<bool>,

    /// SMTP server.
    #[arg(long, value_name = "HOST")]
    pub smtp_host: Option<String>,

    /// SMTP port (default follows the security mode).
    #[arg(long, value_name = "PORT")]
    pub smtp_port: Option<u16>,

    /// SMTP security mode.
    #[arg(long, value_enum, value_name = "MODE")]
    pub smtp_security: Option<SecurityArg>,

    /// SMTP username; empty disables authentication.
    #[arg(long, value_name = "USER")]
    pub smtp_user: Option<String>,
}

impl Overrides {
    /// Writes every given value into `settings`.
    pub fn apply(self, settings: &mut Settings) {
        fn set<T>(target: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *target = value;
            }
        }

        set(&mut settings.sender_name, self.sender_name);
        set(&mut settings.sender_email, self.sender_email);
        set(&mut settings.subject, self.subject);
        set(&mut settings.course_code, self.course_code);
        set(&mut settings.bcc, self.bcc);
        set(&mut settings.email_column, self.email_column);
        set(&mut settings.append_suffix, self.append);
        set(&mut settings.skip_blank_addresses, self.skip_blank);
        set(&mut settings.send_report, self.report);
        set(&mut settings.smtp.host, self.smtp_host);
        set(&mut settings.smtp.username, self.smtp_user);

        if let Some(security) = self.smtp_security {
            settings.smtp.security = security.into();
            settings.smtp.port = settings.smtp.security.default_port();
        }
        set(&mut settings.smtp.port, self.smtp_port);
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SecurityArg {
    /// Plain TCP.
    None,
    /// Implicit TLS.
    Tls,
    /// STARTTLS upgrade.
    Starttls,
}

impl From<SecurityArg> for Security {
    fn from(arg: SecurityArg) -> Self {
        match arg {
            SecurityArg::None => Self::None,
            SecurityArg::Tls => Self::Tls,
            SecurityArg::Starttls => Self::StartTls,
        }
    }
}

/// Options for `generate`.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Column with the recipient's name.
    #[arg(long, value_name = "COL")]
    pub name_column: Option<String>,

    /// Column with the final grade.
    #[arg(long, value_name = "COL")]
    pub grade_column: Option<String>,

    /// Breakdown columns as `FIRST:LAST`, e.g. `C:F`.
    #[arg(long, value_name = "FIRST:LAST", value_parser = parse_span)]
    pub columns: Option<(String, String)>,

    /// Row with the column titles.
    #[arg(long, value_name = "ROW")]
    pub header_row: Option<u32>,

    /// Row with the maximum points per column.
    #[arg(long, value_name = "ROW")]
    pub max_row: Option<u32>,

    /// Course code (default: saved setting).
    #[arg(long, value_name = "CODE")]
    pub course_code: Option<String>,

    /// Name in the sign-off (default: saved sender name).
    #[arg(long)]
    pub sender_name: Option<String>,
}

fn parse_span(value: &str) -> Result<(String, String), String> {
    value
        .split_once(':')
        .map(|(first, last)| (first.trim().to_string(), last.trim().to_string()))
        .filter(|(first, last)| !first.is_empty() && !last.is_empty())
        .ok_or_else(|| format!("expected FIRST:LAST, got `{value}`"))
}
