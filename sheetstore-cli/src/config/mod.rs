//! Configuration: optional TOML file, overridden by environment variables
//!
//! The file lives at `<config dir>/sheetstore/config.toml` unless a path is
//! given explicitly. Environment variables (including those loaded from a
//! `.env` file) always win over file values.

use anyhow::{Context, Result, bail};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::api::constants::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_MS};
use crate::api::resilience::config::ResilienceConfigBuilder;
use crate::api::{GoogleSheetsClient, MemoryBackend, ResilienceConfig, SheetsAuth, SheetsBackend};
use crate::repository::{EntityKind, EntitySchema, Repositories};
use crate::store::RowStore;

const SPREADSHEET_ID_VARS: [&str; 2] = ["GOOGLE_SHEETS_SPREADSHEET_ID", "GOOGLE_SHEETS_ID"];

/// Tab title overrides per entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub products: Option<String>,
    pub orders: Option<String>,
    pub order_details: Option<String>,
    pub transactions: Option<String>,
    pub batches: Option<String>,
}

impl SheetNames {
    fn slot(&mut self, kind: EntityKind) -> &mut Option<String> {
        match kind {
            EntityKind::Products => &mut self.products,
            EntityKind::Orders => &mut self.orders,
            EntityKind::OrderDetails => &mut self.order_details,
            EntityKind::Transactions => &mut self.transactions,
            EntityKind::Batches => &mut self.batches,
        }
    }

    pub fn get(&self, kind: EntityKind) -> &str {
        let name = match kind {
            EntityKind::Products => &self.products,
            EntityKind::Orders => &self.orders,
            EntityKind::OrderDetails => &self.order_details,
            EntityKind::Transactions => &self.transactions,
            EntityKind::Batches => &self.batches,
        };
        name.as_deref().unwrap_or(kind.default_sheet_name())
    }
}

/// Named starting point for [`ResilienceConfig`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResiliencePreset {
    #[default]
    Default,
    Conservative,
    Disabled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceSettings {
    pub preset: ResiliencePreset,
    /// Retries after the first attempt of a backend request
    pub max_retries: Option<u32>,
    pub max_concurrent_requests: Option<usize>,
    pub serialize_writes: Option<bool>,
}

/// Where rows are stored
#[derive(Debug, Clone, PartialEq)]
pub enum BackendKind {
    Google {
        spreadsheet_id: String,
        auth: SheetsAuth,
        base_url: String,
        timeout: Duration,
    },
    /// Spreadsheet kept in a local JSON file
    Local(PathBuf),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub spreadsheet_id: Option<String>,
    pub access_token: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    /// Request timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// Use a local JSON spreadsheet instead of the Sheets API
    pub local_file: Option<PathBuf>,
    pub sheets: SheetNames,
    pub resilience: ResilienceSettings,
}

impl Config {
    /// `<config dir>/sheetstore/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sheetstore").join("config.toml"))
    }

    /// Read the file (explicit path must exist, default path is optional) and apply the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Config::default(),
            },
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Override fields from environment variables looked up through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(id) = SPREADSHEET_ID_VARS.iter().find_map(|name| var(*name)) {
            self.spreadsheet_id = Some(id);
        }
        if let Some(token) = var("GOOGLE_SHEETS_ACCESS_TOKEN") {
            self.access_token = Some(token);
        }
        if let Some(key) = var("GOOGLE_SHEETS_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = var("GOOGLE_SHEETS_BASE_URL") {
            self.base_url = Some(url);
        }
        if let Some(file) = var("SHEETSTORE_LOCAL_FILE") {
            self.local_file = Some(PathBuf::from(file));
        }
        if let Some(timeout) = var("API_TIMEOUT") {
            let ms = timeout
                .trim()
                .parse::<u64>()
                .with_context(|| format!("API_TIMEOUT must be milliseconds, got '{}'", timeout))?;
            self.timeout_ms = Some(ms);
        }
        if let Some(retries) = var("SHEETSTORE_MAX_RETRIES") {
            let count = retries.trim().parse::<u32>().with_context(|| {
                format!("SHEETSTORE_MAX_RETRIES must be a whole number, got '{}'", retries)
            })?;
            self.resilience.max_retries = Some(count);
        }
        if let Some(flag) = var("SHEETSTORE_SERIALIZE_WRITES") {
            self.resilience.serialize_writes = Some(parse_flag("SHEETSTORE_SERIALIZE_WRITES", &flag)?);
        }
        for kind in EntityKind::ALL {
            if let Some(name) = var(kind.sheet_name_env()) {
                *self.sheets.slot(kind) = Some(name);
            }
        }
        Ok(())
    }

    /// Fail listing every missing required setting
    pub fn validate(&self) -> Result<()> {
        if self.local_file.is_some() {
            return Ok(());
        }

        let mut missing = Vec::new();
        if self.spreadsheet_id.is_none() {
            missing.push(format!("{} (or {})", SPREADSHEET_ID_VARS[0], SPREADSHEET_ID_VARS[1]));
        }
        if self.access_token.is_none() && self.api_key.is_none() {
            missing.push("GOOGLE_SHEETS_ACCESS_TOKEN or GOOGLE_SHEETS_API_KEY".to_string());
        }

        if !missing.is_empty() {
            bail!(
                "Missing required configuration: {}. Set them in the environment, a .env file or the config file{}",
                missing.join(", "),
                Self::default_path()
                    .map(|p| format!(" ({})", p.display()))
                    .unwrap_or_default()
            );
        }
        Ok(())
    }

    pub fn backend_kind(&self) -> Result<BackendKind> {
        self.validate()?;
        if let Some(path) = &self.local_file {
            return Ok(BackendKind::Local(path.clone()));
        }

        let spreadsheet_id = self
            .spreadsheet_id
            .clone()
            .context("Spreadsheet id is not configured")?;
        Ok(BackendKind::Google {
            spreadsheet_id,
            auth: SheetsAuth {
                access_token: self.access_token.clone(),
                api_key: self.api_key.clone(),
            },
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
        })
    }

    pub fn resilience_config(&self) -> ResilienceConfig {
        let base = match self.resilience.preset {
            ResiliencePreset::Default => ResilienceConfig::default(),
            ResiliencePreset::Conservative => ResilienceConfig::conservative(),
            ResiliencePreset::Disabled => ResilienceConfig::disabled(),
        };

        let mut builder = ResilienceConfigBuilder::from_config(base);
        if let Some(retries) = self.resilience.max_retries {
            builder = builder.max_retries(retries);
        }
        if let Some(max) = self.resilience.max_concurrent_requests {
            builder = builder.max_concurrent_requests(max);
        }
        if let Some(serialize) = self.resilience.serialize_writes {
            builder = builder.serialize_writes(serialize);
        }
        builder.build()
    }

    /// Built-in entity layouts on the configured tabs
    pub fn schemas(&self) -> Vec<EntitySchema> {
        EntityKind::ALL
            .into_iter()
            .map(|kind| EntitySchema::for_kind(kind).with_sheet_name(self.sheets.get(kind)))
            .collect()
    }

    pub fn build_backend(&self) -> Result<Arc<dyn SheetsBackend>> {
        match self.backend_kind()? {
            BackendKind::Google {
                spreadsheet_id,
                auth,
                base_url,
                timeout,
            } => {
                info!("Using spreadsheet {} at {}", spreadsheet_id, base_url);
                let client = GoogleSheetsClient::new(spreadsheet_id, auth, base_url, timeout)
                    .context("Failed to create Sheets client")?;
                Ok(Arc::new(client))
            }
            BackendKind::Local(path) => {
                info!("Using local spreadsheet file {}", path.display());
                let backend = MemoryBackend::open(&path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                Ok(Arc::new(backend))
            }
        }
    }

    pub fn row_store(&self) -> Result<RowStore> {
        Ok(RowStore::new(self.build_backend()?, &self.resilience_config()))
    }

    pub fn repositories(&self) -> Result<Repositories> {
        let resilience = self.resilience_config();
        let store = RowStore::new(self.build_backend()?, &resilience);
        Ok(Repositories::new(
            store,
            self.schemas(),
            resilience.locking.serialize_writes,
        ))
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{} must be true or false, got '{}'", name, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_validate_lists_every_missing_variable() {
        let err = Config::default().validate().unwrap_err().to_string();
        assert!(err.contains("GOOGLE_SHEETS_SPREADSHEET_ID"));
        assert!(err.contains("GOOGLE_SHEETS_ACCESS_TOKEN or GOOGLE_SHEETS_API_KEY"));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config: Config = toml::from_str(
            r#"
            spreadsheet_id = "from-file"
            timeout_ms = 1000

            [sheets]
            orders = "Orders 2023"
            "#,
        )
        .unwrap();

        config
            .apply_env(env(&[
                ("GOOGLE_SHEETS_ID", "from-env"),
                ("GOOGLE_SHEETS_ACCESS_TOKEN", "ya29.token"),
                ("API_TIMEOUT", "5000"),
                ("ORDER_DETAILS_SHEET_NAME", "Lines"),
            ]))
            .unwrap();

        assert_eq!(config.spreadsheet_id.as_deref(), Some("from-env"));
        assert_eq!(config.timeout_ms, Some(5000));
        assert_eq!(config.sheets.get(EntityKind::Orders), "Orders 2023");
        assert_eq!(config.sheets.get(EntityKind::OrderDetails), "Lines");
        assert_eq!(config.sheets.get(EntityKind::Products), "Products");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_primary_spreadsheet_var_wins() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("GOOGLE_SHEETS_SPREADSHEET_ID", "primary"),
                ("GOOGLE_SHEETS_ID", "legacy"),
            ]))
            .unwrap();
        assert_eq!(config.spreadsheet_id.as_deref(), Some("primary"));
    }

    #[test]
    fn test_bad_numbers_are_reported() {
        let mut config = Config::default();
        let err = config.apply_env(env(&[("API_TIMEOUT", "30s")])).unwrap_err();
        assert!(err.to_string().contains("API_TIMEOUT"));
    }

    #[test]
    fn test_backend_kind_defaults() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("GOOGLE_SHEETS_ID", "abc"),
                ("GOOGLE_SHEETS_API_KEY", "key"),
            ]))
            .unwrap();
        match config.backend_kind().unwrap() {
            BackendKind::Google {
                base_url, timeout, ..
            } => {
                assert_eq!(base_url, DEFAULT_BASE_URL);
                assert_eq!(timeout, Duration::from_millis(30_000));
            }
            other => panic!("unexpected backend: {other:?}"),
        }
    }

    #[test]
    fn test_local_file_needs_no_credentials() {
        let config = Config {
            local_file: Some(PathBuf::from("shop.json")),
            ..Default::default()
        };
        assert_eq!(
            config.backend_kind().unwrap(),
            BackendKind::Local(PathBuf::from("shop.json"))
        );
    }

    #[test]
    fn test_resilience_overrides() {
        let mut config = Config::default();
        config.resilience.preset = ResiliencePreset::Disabled;
        config
            .apply_env(env(&[
                ("SHEETSTORE_MAX_RETRIES", "4"),
                ("SHEETSTORE_SERIALIZE_WRITES", "yes"),
            ]))
            .unwrap();
        let resilience = config.resilience_config();
        assert_eq!(resilience.retry.max_attempts, 5);
        assert!(resilience.locking.serialize_writes);
        assert!(!resilience.concurrency.enabled);
    }

    #[test]
    fn test_schemas_follow_sheet_names() {
        let mut config = Config::default();
        config.sheets.batches = Some("Lots".into());
        let schemas = config.schemas();
        assert_eq!(schemas.len(), 5);
        let batches = schemas.iter().find(|s| s.kind == EntityKind::Batches).unwrap();
        assert_eq!(batches.sheet_name, "Lots");
    }

    #[test]
    fn test_one_retry_means_two_attempts() {
        let mut config = Config::default();
        config
            .apply_env(env(&[("SHEETSTORE_MAX_RETRIES", "1")]))
            .unwrap();
        assert_eq!(config.resilience_config().retry.max_attempts, 2);
    }
}
