// ── Legacy source migration ──
//
// Sources created from a bare share token cannot be polled directly; the
// pool endpoint wants the owning user and pool ids. Migration resolves the
// token once and hands back an equivalent source keyed by those ids.

use poolmath_api::ShareResolver;
use tracing::info;

use crate::error::CoreError;
use crate::model::PoolSource;

/// Resolve a legacy source to one keyed by `user_id`/`pool_id`.
///
/// Sources that already carry ids are returned unchanged without I/O.
pub async fn migrate_source(
    source: &PoolSource,
    resolver: &ShareResolver,
) -> Result<PoolSource, CoreError> {
    let Some(share_id) = source.legacy_share_id() else {
        return Ok(source.clone());
    };

    let ids = resolver.lookup(share_id).await?;
    info!(
        pool = %source.name,
        %share_id,
        ids = %ids,
        "migrated legacy share id"
    );
    Ok(source.clone().with_ids(ids))
}

/// Migrate every source that needs it, preserving order.
///
/// Stops at the first failure; sources are left untouched in that case.
pub async fn migrate_all(
    sources: &[PoolSource],
    resolver: &ShareResolver,
) -> Result<Vec<PoolSource>, CoreError> {
    let mut migrated = Vec::with_capacity(sources.len());
    for source in sources {
        migrated.push(migrate_source(source, resolver).await?);
    }
    Ok(migrated)
}
