use std::{fs, io, path::Path, str::FromStr};

use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    #[default]
    Clock,
    Uuid,
}

impl FromStr for IdStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clock" => Ok(Self::Clock),
            "uuid" => Ok(Self::Uuid),
            other => bail!("unknown id strategy '{other}', expected 'clock' or 'uuid'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub storage_key: String,
    pub allow_negative_prices: bool,
    pub id_strategy: IdStrategy,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/catalog.db".into(),
            storage_key: storage::DEFAULT_PRODUCTS_KEY.into(),
            allow_negative_prices: false,
            id_strategy: IdStrategy::Clock,
            log_filter: "warn".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    database_url: Option<String>,
    storage_key: Option<String>,
    allow_negative_prices: Option<bool>,
    id_strategy: Option<IdStrategy>,
    log_filter: Option<String>,
}

pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

/// Defaults, then the TOML file at `path` if it exists, then environment
/// variables looked up through `env`.
pub fn load_settings_with(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
            if let Some(v) = file_cfg.database_url {
                settings.database_url = v;
            }
            if let Some(v) = file_cfg.storage_key {
                settings.storage_key = v;
            }
            if let Some(v) = file_cfg.allow_negative_prices {
                settings.allow_negative_prices = v;
            }
            if let Some(v) = file_cfg.id_strategy {
                settings.id_strategy = v;
            }
            if let Some(v) = file_cfg.log_filter {
                settings.log_filter = v;
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    }

    if let Some(v) = env("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = env("APP__STORAGE_KEY") {
        settings.storage_key = v;
    }

    if let Some(v) = env("APP__ALLOW_NEGATIVE_PRICES") {
        settings.allow_negative_prices = parse_flag(&v)
            .with_context(|| format!("APP__ALLOW_NEGATIVE_PRICES has invalid value '{v}'"))?;
    }

    if let Some(v) = env("APP__ID_STRATEGY") {
        settings.id_strategy = v.parse()?;
    }

    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if settings.storage_key.trim().is_empty() {
        bail!("storage key must not be empty");
    }

    Ok(settings)
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("expected a boolean"),
    }
}

/// Accepts `sqlite::memory:`, `sqlite://<path>`, `sqlite:<path>` or a bare
/// file path and returns the `sqlite://` form the storage layer opens.
pub fn normalize_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let raw = raw_database_url.trim();
    if raw.is_empty() {
        return Ok(Settings::default().database_url);
    }
    if raw == "sqlite::memory:" {
        return Ok(raw.to_string());
    }

    let path = raw
        .strip_prefix("sqlite://")
        .or_else(|| raw.strip_prefix("sqlite:"))
        .unwrap_or(raw);
    if path.contains("://") {
        bail!("unsupported database url '{raw}', the catalog only stores to sqlite");
    }
    if path.is_empty() {
        bail!("database url '{raw}' names no file");
    }
    Ok(format!("sqlite://{}", path.replace('\\', "/")))
}
