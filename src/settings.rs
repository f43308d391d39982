//! Store-wide settings: one JSON document with an explicit load/reload
//! lifecycle. Handlers read a cached copy; updates validate, persist, and
//! swap the cache in one step so every request sees a consistent snapshot.

use crate::storage::{self, StoreError};

use argon2::Argon2;
use argon2::password_hash::{PasswordHasher, SaltString};
use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub company_name: String,
    pub whatsapp: String,
    pub pix_key: String,
    pub webhook_url: Option<String>,
    pub admin_email: String,
    pub site_logo: String,
    pub app_icon: String,
    pub admin_password_hash: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            company_name: "Bakeshop".to_string(),
            whatsapp: String::new(),
            pix_key: String::new(),
            webhook_url: None,
            admin_email: "admin@example.com".to_string(),
            site_logo: "/static/icons/icon-192.png".to_string(),
            app_icon: "/static/icons/icon-512.png".to_string(),
            admin_password_hash: None,
        }
    }
}

/// Settings as returned to the admin UI. The password hash never leaves the
/// server.
#[derive(Debug, Clone, Serialize)]
pub struct PublicSettings {
    pub company_name: String,
    pub whatsapp: String,
    pub pix_key: String,
    pub webhook_url: Option<String>,
    pub admin_email: String,
    pub site_logo: String,
    pub app_icon: String,
}

impl From<StoreSettings> for PublicSettings {
    fn from(settings: StoreSettings) -> Self {
        Self {
            company_name: settings.company_name,
            whatsapp: settings.whatsapp,
            pix_key: settings.pix_key,
            webhook_url: settings.webhook_url,
            admin_email: settings.admin_email,
            site_logo: settings.site_logo,
            app_icon: settings.app_icon,
        }
    }
}

/// Partial update posted by the admin UI. Absent fields keep their current
/// value; an empty webhook URL clears it; an empty password is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPatch {
    pub company_name: Option<String>,
    pub whatsapp: Option<String>,
    pub pix_key: Option<String>,
    pub webhook_url: Option<String>,
    pub admin_email: Option<String>,
    pub site_logo: Option<String>,
    pub app_icon: Option<String>,
    pub admin_password: Option<String>,
}

#[derive(Debug)]
pub enum SettingsError {
    InvalidEmail,
    InvalidWebhookUrl,
    PasswordHash,
    Store(StoreError),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::InvalidEmail => f.write_str("invalid admin email"),
            SettingsError::InvalidWebhookUrl => f.write_str("invalid webhook url"),
            SettingsError::PasswordHash => f.write_str("failed to hash admin password"),
            SettingsError::Store(err) => write!(f, "settings store error: {err}"),
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    current: Mutex<StoreSettings>,
}

impl SettingsStore {
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let path = data_dir.join(SETTINGS_FILE);
        let current = storage::load_or_default(&path)?;
        Ok(Self {
            path,
            current: Mutex::new(current),
        })
    }

    pub fn current(&self) -> StoreSettings {
        self.current.lock().expect("settings lock").clone()
    }

    /// Re-reads the document from disk, replacing the cached copy.
    pub fn reload(&self) -> Result<(), StoreError> {
        let fresh = storage::load_or_default(&self.path)?;
        *self.current.lock().expect("settings lock") = fresh;
        Ok(())
    }

    /// Validates and applies a partial update, persisting the result.
    pub fn apply(&self, patch: SettingsPatch) -> Result<StoreSettings, SettingsError> {
        if let Some(email) = patch.admin_email.as_deref()
            && !is_valid_email(email.trim())
        {
            return Err(SettingsError::InvalidEmail);
        }
        if let Some(url) = patch.webhook_url.as_deref()
            && !url.trim().is_empty()
            && !is_valid_webhook_url(url.trim())
        {
            return Err(SettingsError::InvalidWebhookUrl);
        }

        let password_hash = match patch.admin_password.as_deref() {
            Some(password) if !password.trim().is_empty() => Some(hash_password(password)?),
            _ => None,
        };

        let mut guard = self.current.lock().expect("settings lock");
        let mut updated = guard.clone();
        if let Some(company_name) = patch.company_name {
            updated.company_name = company_name;
        }
        if let Some(whatsapp) = patch.whatsapp {
            updated.whatsapp = whatsapp;
        }
        if let Some(pix_key) = patch.pix_key {
            updated.pix_key = pix_key;
        }
        if let Some(url) = patch.webhook_url {
            let url = url.trim().to_string();
            updated.webhook_url = if url.is_empty() { None } else { Some(url) };
        }
        if let Some(admin_email) = patch.admin_email {
            updated.admin_email = admin_email.trim().to_string();
        }
        if let Some(site_logo) = patch.site_logo {
            updated.site_logo = site_logo;
        }
        if let Some(app_icon) = patch.app_icon {
            updated.app_icon = app_icon;
        }
        if let Some(hash) = password_hash {
            updated.admin_password_hash = Some(hash);
        }

        storage::persist(&self.path, &updated).map_err(SettingsError::Store)?;
        *guard = updated.clone();
        Ok(updated)
    }
}

fn hash_password(password: &str) -> Result<String, SettingsError> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| SettingsError::PasswordHash)
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((name, tld)) => !name.is_empty() && !tld.is_empty(),
        None => false,
    }
}

fn is_valid_webhook_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    matches!(rest, Some(rest) if !rest.is_empty())
}
