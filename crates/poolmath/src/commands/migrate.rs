//! Legacy share-id migration.

use serde::Serialize;
use tabled::Tabled;
use tracing::info;

use poolmath_config::Config;
use poolmath_core::migrate_all;

use crate::cli::{GlobalOpts, MigrateArgs};
use crate::error::CliError;
use crate::output;

use super::util;

/// One rewritten pool entry.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct Migration {
    #[tabled(rename = "Pool")]
    pub pool: String,
    #[tabled(rename = "Share ID")]
    pub share_id: String,
    #[tabled(rename = "User ID")]
    pub user_id: String,
    #[tabled(rename = "Pool ID")]
    pub pool_id: String,
}

/// Resolve legacy entries among `keys` and rewrite them in `cfg`.
///
/// Does not save; the caller decides whether to persist.
pub async fn migrate_config_pools(
    global: &GlobalOpts,
    cfg: &mut Config,
    keys: &[String],
) -> Result<Vec<Migration>, CliError> {
    let resolver = util::resolver(global)?;
    let sources = keys
        .iter()
        .map(|key| cfg.source(key))
        .collect::<Result<Vec<_>, _>>()?;
    let migrated = migrate_all(&sources, &resolver).await?;

    let mut migrations = Vec::new();
    for ((key, before), after) in keys.iter().zip(&sources).zip(&migrated) {
        let Some(share_id) = before.legacy_share_id() else {
            continue;
        };

        let ids = after.require_ids()?;
        cfg.pool_mut(key)?.set_ids(ids);
        info!(pool = %key, %share_id, "rewrote legacy pool entry");

        migrations.push(Migration {
            pool: key.clone(),
            share_id: share_id.to_string(),
            user_id: ids.user_id().to_owned(),
            pool_id: ids.pool_id().to_owned(),
        });
    }
    Ok(migrations)
}

pub async fn handle(args: MigrateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (path, mut cfg) = util::load_config(global)?;
    let keys = util::pool_keys(&cfg, args.pool.as_deref())?;

    let migrations = migrate_config_pools(global, &mut cfg, &keys).await?;
    if migrations.is_empty() {
        output::status("Nothing to migrate", global.quiet);
        return Ok(());
    }

    if args.dry_run {
        output::status("Dry run: config not written", global.quiet);
    } else {
        poolmath_config::save_config_to(&cfg, &path)?;
        output::status(
            &format!(
                "Migrated {} pool(s) in {}",
                migrations.len(),
                path.display()
            ),
            global.quiet,
        );
    }

    let out = output::render_list(
        &global.output,
        &migrations,
        Migration::clone,
        |m| format!("{}\t{}/{}", m.pool, m.user_id, m.pool_id),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
