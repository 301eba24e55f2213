//! Settings that persist across sessions.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Result;
use crate::campaign::{Campaign, DispatchRange};
use crate::service::SmtpSettings;

/// Saved campaign defaults and SMTP server. Everything except the body
/// template and the row range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Sender display name.
    pub sender_name: String,
    /// Sender address.
    pub sender_email: String,
    /// Subject, without the course code.
    pub subject: String,
    /// Course code.
    pub course_code: String,
    /// Blind copies, separated by `;`.
    pub bcc: String,
    /// Address cell reference.
    pub email_column: String,
    /// Appended to every address cell.
    pub append_suffix: String,
    /// Leave out rows with a blank address cell.
    pub skip_blank_addresses: bool,
    /// Mail the sender a summary after each batch.
    pub send_report: bool,
    /// Outgoing server.
    pub smtp: SmtpSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sender_name: String::new(),
            sender_email: String::new(),
            subject: String::new(),
            course_code: String::new(),
            bcc: String::new(),
            email_column: String::from("A"),
            append_suffix: String::new(),
            skip_blank_addresses: true,
            send_report: false,
            smtp: SmtpSettings::default(),
        }
    }
}

impl Settings {
    /// `<config dir>/sheetmail/settings.json`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sheetmail")
            .join("settings.json")
    }

    /// Loads settings from [`Settings::default_path`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()).await
    }

    /// Loads settings from `path`; a missing file gives the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Saves settings to [`Settings::default_path`].
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save(&self) -> Result<PathBuf> {
        let path = Self::default_path();
        self.save_to(&path).await?;
        Ok(path)
    }

    /// Saves settings to `path` as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;
        info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Builds a campaign from these settings plus a body and range.
    #[must_use]
    pub fn campaign(&self, body: impl Into<String>, range: DispatchRange) -> Campaign {
        Campaign {
            sender_name: self.sender_name.clone(),
            sender_email: self.sender_email.clone(),
            subject: self.subject.clone(),
            course_code: self.course_code.clone(),
            bcc: self.bcc.clone(),
            email_column: self.email_column.clone(),
            append_suffix: self.append_suffix.clone(),
            body: body.into(),
            range,
            skip_blank_addresses: self.skip_blank_addresses,
            send_report: self.send_report,
        }
    }
}
