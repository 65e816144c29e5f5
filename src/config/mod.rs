use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::env;

use crate::models::{DeviceModel, Family};
use crate::utils::is_valid_site;

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub netbox_url: String,
    pub netbox_token: String,
    pub netbox_timeout_secs: u64,
    pub device_user: String,
    pub device_pass: String,
    pub netconf_port: u16,
    pub netconf_timeout_secs: u64,
    pub sites: Vec<String>,
    pub sync_schedule: Option<String>,
    pub sync_on_start: bool,
    pub api_token: String,
    pub legacy_updates: bool,
    pub internet_instance: String,
    /// Raw `site=model` overrides, checked by `validate`
    pub ex_models: String,
    pub history_limit: usize,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        let schedule = get_env("SYNC_SCHEDULE", "");
        Self {
            listen_addr: get_env("LISTEN_ADDR", "0.0.0.0:8080"),
            netbox_url: get_env("NETBOX_URL", ""),
            netbox_token: get_env("NETBOX_TOKEN", ""),
            netbox_timeout_secs: get_env("NETBOX_TIMEOUT_SECS", "30").parse().unwrap_or(30),
            device_user: get_env("DEVICE_USER", ""),
            device_pass: get_env("DEVICE_PASS", ""),
            netconf_port: get_env("NETCONF_PORT", "22").parse().unwrap_or(22),
            netconf_timeout_secs: get_env("NETCONF_TIMEOUT_SECS", "300").parse().unwrap_or(300),
            sites: parse_list(&get_env("SITES", "")),
            sync_schedule: Some(schedule.trim().to_string()).filter(|s| !s.is_empty()),
            sync_on_start: parse_bool(&get_env("SYNC_ON_START", "false")),
            api_token: get_env("API_TOKEN", ""),
            legacy_updates: parse_bool(&get_env("LEGACY_UPDATES", "false")),
            internet_instance: get_env("INTERNET_INSTANCE", "RI-VRF-Internet-2"),
            ex_models: get_env("EX_MODELS", ""),
            history_limit: get_env("HISTORY_LIMIT", "50").parse().unwrap_or(50),
        }
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.netbox_url.trim().is_empty() {
            return Err(anyhow!("NETBOX_URL is required"));
        }
        if self.netbox_token.trim().is_empty() {
            return Err(anyhow!("NETBOX_TOKEN is required"));
        }
        if let Some(site) = self.sites.iter().find(|s| !is_valid_site(s)) {
            return Err(anyhow!("SITES contains an invalid site '{}'", site));
        }
        if let Some(schedule) = &self.sync_schedule {
            croner::Cron::new(schedule)
                .parse()
                .map_err(|e| anyhow!("SYNC_SCHEDULE '{}' is invalid: {}", schedule, e))?;
        }
        self.model_overrides()?;
        Ok(())
    }

    /// Per-site EX model table from `EX_MODELS`
    pub fn model_overrides(&self) -> Result<BTreeMap<String, DeviceModel>> {
        parse_model_overrides(&self.ex_models)
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Comma separated list, lowercased, empties dropped
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse `site=model[,site=model...]`. Only EX models may be overridden.
fn parse_model_overrides(value: &str) -> Result<BTreeMap<String, DeviceModel>> {
    let mut models = BTreeMap::new();
    for entry in parse_list(value) {
        let (site, model) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("EX_MODELS entry '{}' is not site=model", entry))?;
        let model: DeviceModel = model.parse().map_err(|e: String| anyhow!("EX_MODELS: {}", e))?;
        if model.family() != Family::Ex {
            return Err(anyhow!("EX_MODELS: '{}' is not an EX model", entry));
        }
        models.insert(site.trim().to_string(), model);
    }
    Ok(models)
}
