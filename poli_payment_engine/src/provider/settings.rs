//! Per-event POLi settings.
//!
//! Settings live in the host's key-value store under the `payment_poli_` prefix. The settings form submitted by the
//! host is validated here and errors are reported per field, keyed by the full setting name.
use std::collections::BTreeMap;

use log::*;
use poli_common::{parse_boolean_flag, Secret};
use poli_tools::{PoliConfig, PoliEndpoint};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::traits::{GatewayStoreError, SettingsStore};

pub const SETTINGS_PREFIX: &str = "payment_poli_";
pub const KEY_ENABLED: &str = "payment_poli__enabled";
pub const KEY_AUTHENTICATION_CODE: &str = "payment_poli_authentication_code";
pub const KEY_MERCHANT_CODE: &str = "payment_poli_merchant_code";
pub const KEY_ENDPOINT: &str = "payment_poli_endpoint";
pub const KEY_TIMEOUT: &str = "payment_poli_timeout";

pub const DEFAULT_TIMEOUT: u32 = 900;
pub const MIN_TIMEOUT: i64 = 60;
pub const MAX_TIMEOUT: i64 = 3600;
pub const MERCHANT_CODE_MAX_LEN: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoliSettings {
    pub enabled: bool,
    pub authentication_code: Secret<String>,
    pub merchant_code: String,
    pub endpoint: PoliEndpoint,
    pub timeout: u32,
}

impl PoliSettings {
    /// Reads the settings for an event. Unparseable stored values fall back to their defaults.
    pub async fn load<B: SettingsStore>(db: &B, event_id: i64) -> Result<Self, GatewayStoreError> {
        let enabled = parse_boolean_flag(db.fetch_setting(event_id, KEY_ENABLED).await?, false);
        let authentication_code = Secret::new(db.fetch_setting(event_id, KEY_AUTHENTICATION_CODE).await?.unwrap_or_default());
        let merchant_code = db.fetch_setting(event_id, KEY_MERCHANT_CODE).await?.unwrap_or_default();
        let endpoint = match db.fetch_setting(event_id, KEY_ENDPOINT).await? {
            Some(v) => v.parse().unwrap_or_else(|e| {
                warn!("⚙️ Stored POLi endpoint for event #{event_id} is invalid ({e}). Using production.");
                PoliEndpoint::Production
            }),
            None => PoliEndpoint::default(),
        };
        let timeout = match db.fetch_setting(event_id, KEY_TIMEOUT).await? {
            Some(v) if !v.trim().is_empty() => v.trim().parse::<u32>().unwrap_or_else(|e| {
                warn!("⚙️ Stored POLi timeout for event #{event_id} is invalid ({e}). Using {DEFAULT_TIMEOUT}.");
                DEFAULT_TIMEOUT
            }),
            _ => DEFAULT_TIMEOUT,
        };
        Ok(Self { enabled, authentication_code, merchant_code, endpoint, timeout })
    }

    pub async fn save<B: SettingsStore>(&self, db: &B, event_id: i64) -> Result<(), GatewayStoreError> {
        db.save_setting(event_id, KEY_ENABLED, if self.enabled { "True" } else { "False" }).await?;
        db.save_setting(event_id, KEY_AUTHENTICATION_CODE, self.authentication_code.reveal()).await?;
        db.save_setting(event_id, KEY_MERCHANT_CODE, &self.merchant_code).await?;
        db.save_setting(event_id, KEY_ENDPOINT, &self.endpoint.to_string()).await?;
        db.save_setting(event_id, KEY_TIMEOUT, &self.timeout.to_string()).await?;
        debug!("⚙️ POLi settings saved for event #{event_id}");
        Ok(())
    }

    /// Both credentials are present.
    pub fn is_configured(&self) -> bool {
        self.authentication_code.is_set() && !self.merchant_code.trim().is_empty()
    }

    pub fn api_config(&self, base_url_override: Option<&str>) -> PoliConfig {
        PoliConfig::new(&self.merchant_code, self.authentication_code.clone(), self.endpoint)
            .with_base_url(base_url_override)
    }

    /// A view of the settings that is safe to hand back to the host. The authentication code is never included.
    pub fn public_view(&self) -> PublicSettings {
        PublicSettings {
            enabled: self.enabled,
            authentication_code_set: self.authentication_code.is_set(),
            merchant_code: self.merchant_code.clone(),
            endpoint: self.endpoint,
            timeout: self.timeout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicSettings {
    #[serde(rename = "_enabled")]
    pub enabled: bool,
    pub authentication_code_set: bool,
    pub merchant_code: String,
    pub endpoint: PoliEndpoint,
    pub timeout: u32,
}

/// The settings form as submitted by the host. Every field is optional so that validation can report on all of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsForm {
    #[serde(rename = "_enabled", default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub authentication_code: Option<String>,
    #[serde(default)]
    pub merchant_code: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub timeout: Option<i64>,
}

#[derive(Debug, Clone, Default, Error, PartialEq, Eq, Serialize)]
#[error("Invalid POLi settings: {}", summarize(.errors))]
pub struct SettingsValidationError {
    pub errors: BTreeMap<String, String>,
}

fn summarize(errors: &BTreeMap<String, String>) -> String {
    errors.iter().map(|(k, v)| format!("{k}: {v}")).collect::<Vec<_>>().join("; ")
}

impl SettingsValidationError {
    fn add(&mut self, key: &str, message: &str) {
        self.errors.insert(key.to_string(), message.to_string());
    }
}

impl SettingsForm {
    /// Validates the form against the currently stored settings and returns the settings to save.
    ///
    /// A blank authentication code keeps the stored one, so the host never has to echo the secret back.
    pub fn validate(self, current: &PoliSettings) -> Result<PoliSettings, SettingsValidationError> {
        let mut errors = SettingsValidationError::default();
        let authentication_code = match self.authentication_code.map(|s| s.trim().to_string()) {
            Some(code) if !code.is_empty() => Secret::new(code),
            _ => current.authentication_code.clone(),
        };
        if !authentication_code.is_set() {
            errors.add(KEY_AUTHENTICATION_CODE, "Authentication code is required.");
        }
        let merchant_code = self.merchant_code.map(|s| s.trim().to_string()).unwrap_or_default();
        if merchant_code.is_empty() {
            errors.add(KEY_MERCHANT_CODE, "Merchant code is required.");
        } else if merchant_code.chars().count() > MERCHANT_CODE_MAX_LEN {
            errors.add(
                KEY_MERCHANT_CODE,
                &format!("Ensure this value has at most {MERCHANT_CODE_MAX_LEN} characters."),
            );
        }
        let endpoint = match self.endpoint.as_deref().map(str::trim) {
            None | Some("") => PoliEndpoint::Production,
            Some(v) => v.parse().unwrap_or_else(|e: String| {
                errors.add(KEY_ENDPOINT, &e);
                PoliEndpoint::Production
            }),
        };
        let timeout = match self.timeout {
            None => DEFAULT_TIMEOUT,
            Some(t) if (MIN_TIMEOUT..=MAX_TIMEOUT).contains(&t) => u32::try_from(t).unwrap_or(DEFAULT_TIMEOUT),
            Some(_) => {
                errors.add(KEY_TIMEOUT, &format!("Ensure this value is between {MIN_TIMEOUT} and {MAX_TIMEOUT}."));
                DEFAULT_TIMEOUT
            },
        };
        if !errors.errors.is_empty() {
            return Err(errors);
        }
        Ok(PoliSettings {
            enabled: self.enabled.unwrap_or(current.enabled),
            authentication_code,
            merchant_code,
            endpoint,
            timeout,
        })
    }
}
