//! Shared configuration for Pool Math pollers.
//!
//! TOML pool entries merged with `POOLMATH_` environment variables, and
//! validation into `poolmath_core::PoolSource`. The CLI layers its
//! flag-aware wrappers on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use poolmath_api::{DEFAULT_TIMEOUT_SECS, PoolIds, ShareId, ShareLink};
use poolmath_core::{
    DEFAULT_POLL_INTERVAL, DEFAULT_POOL_NAME, PoolIdentity, PoolSource, TargetProfile,
    TemperatureUnit,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no pool named '{pool}' in the config")]
    NotFound { pool: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Settings every pool inherits unless it overrides them.
    #[serde(default)]
    pub defaults: Defaults,

    /// Pools keyed by a short local name (`[pools.backyard]`).
    #[serde(default)]
    pub pools: BTreeMap<String, PoolEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature_unit")]
    pub temperature_unit: String,

    #[serde(default = "default_target")]
    pub target: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            timeout_secs: default_timeout(),
            temperature_unit: default_temperature_unit(),
            target: default_target(),
        }
    }
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_temperature_unit() -> String {
    TemperatureUnit::default().to_string()
}
fn default_target() -> String {
    TargetProfile::default().to_string()
}

/// One configured pool. Exactly one identity form must be given:
/// `share_url`, `user_id` + `pool_id`, or a legacy `share_id`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PoolEntry {
    /// Display name; entity names are prefixed with it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Share link as copied from the Pool Math app or troublefreepool.com.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_id: Option<String>,

    /// Legacy single-token share id; migrated to `user_id`/`pool_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl PoolEntry {
    /// An entry for a share link, with everything else inherited.
    pub fn from_share_url(name: Option<String>, share_url: impl Into<String>) -> Self {
        Self {
            name,
            share_url: Some(share_url.into()),
            ..Self::default()
        }
    }

    /// Replace whatever identity the entry had with canonical ids.
    pub fn set_ids(&mut self, ids: &PoolIds) {
        self.share_url = None;
        self.share_id = None;
        self.user_id = Some(ids.user_id().to_owned());
        self.pool_id = Some(ids.pool_id().to_owned());
    }
}

impl Config {
    pub fn pool(&self, key: &str) -> Result<&PoolEntry, ConfigError> {
        self.pools.get(key).ok_or_else(|| ConfigError::NotFound {
            pool: key.to_owned(),
        })
    }

    pub fn pool_mut(&mut self, key: &str) -> Result<&mut PoolEntry, ConfigError> {
        self.pools.get_mut(key).ok_or_else(|| ConfigError::NotFound {
            pool: key.to_owned(),
        })
    }

    /// Validate one pool into a `PoolSource`.
    pub fn source(&self, key: &str) -> Result<PoolSource, ConfigError> {
        pool_to_source(key, self.pool(key)?, &self.defaults)
    }

    /// Validate every pool, in key order.
    pub fn sources(&self) -> Result<Vec<(String, PoolSource)>, ConfigError> {
        self.pools
            .iter()
            .map(|(key, entry)| Ok((key.clone(), pool_to_source(key, entry, &self.defaults)?)))
            .collect()
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "poolmath", "poolmath")
}

fn dirs_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("poolmath");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory holding per-pool restore state files.
pub fn state_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share").join("state"),
        |dirs| dirs.data_dir().join("state"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Environment keys nest on a double underscore:
/// `POOLMATH_DEFAULTS__POLL_INTERVAL_SECS=600`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("POOLMATH_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Validation ──────────────────────────────────────────────────────

/// Build a `PoolSource` from an entry plus defaults.
///
/// Share links that carry only a token become legacy identities, to be
/// migrated before the first fetch.
pub fn pool_to_source(
    key: &str,
    entry: &PoolEntry,
    defaults: &Defaults,
) -> Result<PoolSource, ConfigError> {
    let field = |name: &str| format!("pools.{key}.{name}");

    let name = entry.name.as_deref().unwrap_or(DEFAULT_POOL_NAME).trim();
    if name.is_empty() {
        return Err(ConfigError::validation(field("name"), "must not be empty"));
    }

    let identity = resolve_identity(entry, &field)?;

    let unit_str = entry
        .temperature_unit
        .as_deref()
        .unwrap_or(&defaults.temperature_unit);
    let unit = TemperatureUnit::from_str(unit_str).map_err(|_| {
        ConfigError::validation(
            field("temperature_unit"),
            format!("expected 'F' or 'C', got '{unit_str}'"),
        )
    })?;

    let target_str = entry.target.as_deref().unwrap_or(&defaults.target);
    let target = TargetProfile::from_str(target_str).map_err(|_| {
        ConfigError::validation(field("target"), format!("unknown target profile '{target_str}'"))
    })?;

    let poll = entry.poll_interval_secs.unwrap_or(defaults.poll_interval_secs);
    let timeout = entry.timeout_secs.unwrap_or(defaults.timeout_secs);

    PoolSource::new(name, identity)
        .with_temperature_unit(unit)
        .with_target(target)
        .with_poll_interval(Duration::from_secs(poll))
        .map_err(|e| ConfigError::validation(field("poll_interval_secs"), e.to_string()))?
        .with_timeout(Duration::from_secs(timeout))
        .map_err(|e| ConfigError::validation(field("timeout_secs"), e.to_string()))
}

fn resolve_identity(
    entry: &PoolEntry,
    field: &impl Fn(&str) -> String,
) -> Result<PoolIdentity, ConfigError> {
    let has_ids = entry.user_id.is_some() || entry.pool_id.is_some();
    let forms = [entry.share_url.is_some(), has_ids, entry.share_id.is_some()]
        .into_iter()
        .filter(|present| *present)
        .count();
    if forms > 1 {
        return Err(ConfigError::validation(
            field("share_url"),
            "set only one of share_url, user_id/pool_id, or share_id",
        ));
    }

    if let Some(url) = &entry.share_url {
        let link = ShareLink::parse(url)
            .map_err(|e| ConfigError::validation(field("share_url"), e.to_string()))?;
        return Ok(match link {
            ShareLink::Pool(ids) => PoolIdentity::Ids(ids),
            ShareLink::Token(share_id) => PoolIdentity::Legacy(share_id),
        });
    }

    if has_ids {
        let (Some(user_id), Some(pool_id)) = (&entry.user_id, &entry.pool_id) else {
            return Err(ConfigError::validation(
                field("user_id"),
                "user_id and pool_id must be set together",
            ));
        };
        let ids = PoolIds::new(user_id, pool_id)
            .map_err(|e| ConfigError::validation(field("user_id"), e.to_string()))?;
        return Ok(PoolIdentity::Ids(ids));
    }

    if let Some(share_id) = &entry.share_id {
        let share_id = ShareId::new(share_id)
            .map_err(|e| ConfigError::validation(field("share_id"), e.to_string()))?;
        return Ok(PoolIdentity::Legacy(share_id));
    }

    Err(ConfigError::validation(
        field("share_url"),
        "one of share_url, user_id/pool_id, or share_id is required",
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn entry(f: impl FnOnce(&mut PoolEntry)) -> PoolEntry {
        let mut e = PoolEntry::default();
        f(&mut e);
        e
    }

    #[test]
    fn tfp_link_with_ids_is_canonical() {
        let e = entry(|e| {
            e.name = Some("Backyard".into());
            e.share_url = Some("https://www.troublefreepool.com/mypool/u1/p1".into());
        });
        let src = pool_to_source("backyard", &e, &Defaults::default()).unwrap();
        assert_eq!(src.ids(), Some(&PoolIds::new("u1", "p1").unwrap()));
        assert_eq!(src.name, "Backyard");
        assert_eq!(src.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn token_link_is_legacy() {
        let e = entry(|e| e.share_url = Some("https://troublefreepool.com/mypool/6WPG8yL".into()));
        let src = pool_to_source("p", &e, &Defaults::default()).unwrap();
        assert!(src.needs_migration());
        assert_eq!(src.name, DEFAULT_POOL_NAME);
    }

    #[test]
    fn pool_overrides_defaults() {
        let defaults = Defaults {
            temperature_unit: "c".into(),
            ..Defaults::default()
        };
        let e = entry(|e| {
            e.user_id = Some("u1".into());
            e.pool_id = Some("p1".into());
            e.poll_interval_secs = Some(600);
        });
        let src = pool_to_source("p", &e, &defaults).unwrap();
        assert_eq!(src.poll_interval, Duration::from_secs(600));
        assert_eq!(src.temperature_unit, TemperatureUnit::Celsius);
    }

    #[test]
    fn rejects_invalid_entries() {
        let cases = [
            entry(|_| {}),
            entry(|e| e.share_url = Some("https://example.com/pool".into())),
            entry(|e| e.user_id = Some("u1".into())),
            entry(|e| {
                e.share_id = Some("abc".into());
                e.share_url = Some("https://troublefreepool.com/mypool/abc".into());
            }),
            entry(|e| {
                e.share_id = Some("abc".into());
                e.poll_interval_secs = Some(30);
            }),
            entry(|e| {
                e.share_id = Some("abc".into());
                e.temperature_unit = Some("K".into());
            }),
            entry(|e| {
                e.share_id = Some("abc".into());
                e.target = Some("salty".into());
            }),
            entry(|e| {
                e.share_id = Some("abc".into());
                e.name = Some("  ".into());
            }),
        ];
        for case in &cases {
            let result = pool_to_source("p", case, &Defaults::default());
            assert!(
                matches!(result, Err(ConfigError::Validation { .. })),
                "{case:?} -> {result:?}"
            );
        }
    }

    #[test]
    fn set_ids_clears_legacy_fields() {
        let mut e = entry(|e| e.share_id = Some("6WPG8yL".into()));
        e.set_ids(&PoolIds::new("u9", "p9").unwrap());
        assert_eq!(e.share_id, None);
        assert_eq!(e.user_id.as_deref(), Some("u9"));
        let src = pool_to_source("p", &e, &Defaults::default()).unwrap();
        assert!(!src.needs_migration());
    }

    #[test]
    fn missing_pool_is_not_found() {
        let cfg = Config::default();
        assert!(matches!(cfg.source("nope"), Err(ConfigError::NotFound { .. })));
    }
}
