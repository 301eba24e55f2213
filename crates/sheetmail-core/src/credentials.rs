//! SMTP password lookup and storage.
//!
//! Passwords never go into the settings file. They come from the
//! `SHEETMAIL_SMTP_PASSWORD` environment variable or the platform keyring:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use keyring::Entry;
use tracing::debug;

use crate::service::SmtpSettings;

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "sheetmail";

/// Environment variable consulted before the keyring.
pub const PASSWORD_ENV: &str = "SHEETMAIL_SMTP_PASSWORD";

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Failed to access keyring.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// A username and host are needed to name the keyring entry.
    #[error("SMTP username and host are required for credential storage")]
    MissingAccount,
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

/// Keyring entry name for an SMTP account: `sheetmail_smtp_<user>@<host>`.
///
/// # Errors
///
/// Returns [`CredentialError::MissingAccount`] if the username or host is
/// empty.
pub fn credential_key(smtp: &SmtpSettings) -> CredentialResult<String> {
    let user = smtp.username.trim();
    let host = smtp.host.trim();
    if user.is_empty() || host.is_empty() {
        return Err(CredentialError::MissingAccount);
    }
    Ok(format!("{SERVICE_NAME}_smtp_{user}@{host}"))
}

fn entry(smtp: &SmtpSettings) -> CredentialResult<Entry> {
    Ok(Entry::new(SERVICE_NAME, &credential_key(smtp)?)?)
}

/// Stores the SMTP password in the system keyring.
///
/// # Errors
///
/// Returns an error if the keyring operation fails.
pub fn store_smtp_password(smtp: &SmtpSettings, password: &str) -> CredentialResult<()> {
    entry(smtp)?.set_password(password)?;
    debug!("Stored SMTP password for {}@{}", smtp.username, smtp.host);
    Ok(())
}

/// Retrieves the SMTP password from the system keyring.
///
/// # Errors
///
/// Returns an error if the keyring operation fails.
pub fn get_smtp_password(smtp: &SmtpSettings) -> CredentialResult<Option<String>> {
    match entry(smtp)?.get_password() {
        Ok(password) => Ok(Some(password)),
        Err(keyring::Error::NoEntry) => {
            debug!("No SMTP password found for {}@{}", smtp.username, smtp.host);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Deletes the stored SMTP password. A missing entry is not an error.
///
/// # Errors
///
/// Returns an error if the keyring operation fails.
pub fn delete_smtp_password(smtp: &SmtpSettings) -> CredentialResult<()> {
    match entry(smtp)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Password from [`PASSWORD_ENV`], then the keyring.
///
/// # Errors
///
/// Returns an error if the keyring cannot be read.
pub fn resolve_smtp_password(smtp: &SmtpSettings) -> CredentialResult<Option<String>> {
    if let Some(password) = password_from_env(std::env::var(PASSWORD_ENV).ok()) {
        debug!("Using SMTP password from {PASSWORD_ENV}");
        return Ok(Some(password));
    }
    if credential_key(smtp).is_err() {
        return Ok(None);
    }
    get_smtp_password(smtp)
}

fn password_from_env(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
