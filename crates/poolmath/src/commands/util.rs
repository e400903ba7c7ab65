//! Shared helpers for command handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use poolmath_api::{
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, PoolMathClient, ShareLink, ShareResolver,
    TransportConfig,
};
use poolmath_config::Config;
use poolmath_core::{
    Coordinator, DEFAULT_POOL_NAME, JsonFileStore, PoolIdentity, PoolSource, RestoreStore,
    migrate_source,
};

use crate::cli::{GlobalOpts, PoolSelector};
use crate::error::CliError;

use super::migrate;

/// Key used for a pool given with `--url`.
pub const URL_POOL_KEY: &str = "url";

/// A pool a command works on.
pub struct SelectedPool {
    pub key: String,
    pub source: PoolSource,
}

// ── Config ──────────────────────────────────────────────────────────

pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(poolmath_config::config_path)
}

pub fn load_config(global: &GlobalOpts) -> Result<(PathBuf, Config), CliError> {
    let path = config_file(global);
    let cfg = poolmath_config::load_config_from(&path)?;
    Ok((path, cfg))
}

pub fn pool_not_found(cfg: &Config, key: &str) -> CliError {
    let available = if cfg.pools.is_empty() {
        "(none)".to_owned()
    } else {
        cfg.pools.keys().cloned().collect::<Vec<_>>().join(", ")
    };
    CliError::PoolNotFound {
        name: key.to_owned(),
        available,
    }
}

/// Config keys named by `pool`, or every key when `None`.
pub fn pool_keys(cfg: &Config, pool: Option<&str>) -> Result<Vec<String>, CliError> {
    match pool {
        Some(key) if cfg.pools.contains_key(key) => Ok(vec![key.to_owned()]),
        Some(key) => Err(pool_not_found(cfg, key)),
        None => Ok(cfg.pools.keys().cloned().collect()),
    }
}

// ── HTTP ────────────────────────────────────────────────────────────

pub fn base_url(global: &GlobalOpts) -> Result<Url, CliError> {
    let raw = global.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
    Url::parse(raw).map_err(|e| CliError::Validation {
        field: "base-url".into(),
        reason: e.to_string(),
    })
}

fn timeout(global: &GlobalOpts) -> Duration {
    Duration::from_secs(global.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))
}

pub fn resolver(global: &GlobalOpts) -> Result<ShareResolver, CliError> {
    let http = TransportConfig::default()
        .with_timeout(timeout(global))
        .build_client()?;
    Ok(ShareResolver::with_client(http, base_url(global)?))
}

pub fn client(global: &GlobalOpts, source: &PoolSource) -> Result<PoolMathClient, CliError> {
    let ids = source.require_ids()?.clone();
    let http = TransportConfig::default()
        .with_timeout(source.timeout)
        .build_client()?;
    Ok(PoolMathClient::with_client(http, base_url(global)?, ids))
}

// ── Coordinators ────────────────────────────────────────────────────

pub fn restore_store(global: &GlobalOpts) -> Arc<dyn RestoreStore> {
    let dir = global
        .state_dir
        .clone()
        .unwrap_or_else(poolmath_config::state_dir);
    Arc::new(JsonFileStore::new(dir))
}

pub fn coordinator(global: &GlobalOpts, source: PoolSource) -> Result<Coordinator, CliError> {
    let client = client(global, &source)?;
    Ok(Coordinator::new(source, client, restore_store(global))?)
}

/// Resolve the selector into validated, migrated pool sources.
///
/// Legacy pools from the config are migrated on first use and the config
/// file is rewritten.
pub async fn select_pools(
    global: &GlobalOpts,
    selector: &PoolSelector,
) -> Result<Vec<SelectedPool>, CliError> {
    let pools = match &selector.url {
        Some(url) => {
            let identity = match ShareLink::parse(url)? {
                ShareLink::Pool(ids) => PoolIdentity::Ids(ids),
                ShareLink::Token(share_id) => PoolIdentity::Legacy(share_id),
            };
            let name = selector.name.as_deref().unwrap_or(DEFAULT_POOL_NAME);
            vec![(URL_POOL_KEY.to_owned(), PoolSource::new(name, identity))]
        }
        None => {
            let (path, mut cfg) = load_config(global)?;
            let keys = pool_keys(&cfg, selector.pool.as_deref())?;
            if keys.is_empty() {
                return Err(CliError::NoConfig {
                    path: path.display().to_string(),
                });
            }
            let migrated = migrate::migrate_config_pools(global, &mut cfg, &keys).await?;
            if !migrated.is_empty() {
                poolmath_config::save_config_to(&cfg, &path)?;
            }
            keys.into_iter()
                .map(|key| Ok((key.clone(), cfg.source(&key)?)))
                .collect::<Result<Vec<_>, CliError>>()?
        }
    };

    let mut selected = Vec::with_capacity(pools.len());
    for (key, mut source) in pools {
        if let Some(unit) = selector.unit {
            source = source.with_temperature_unit(unit.into());
        }
        if let Some(secs) = global.timeout {
            source = source.with_timeout(Duration::from_secs(secs))?;
        }
        if source.needs_migration() {
            source = migrate_source(&source, &resolver(global)?).await?;
        }
        selected.push(SelectedPool { key, source });
    }
    Ok(selected)
}
