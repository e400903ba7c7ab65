//! Continuous polling: one coordinator per pool, printing entity views as
//! they change until interrupted.

use futures_util::StreamExt;
use futures_util::stream::select_all;
use tracing::info;

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::fetch::{PoolReading, render_readings};
use super::util;

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let pools = util::select_pools(global, &args.pools).await?;

    let mut coordinators = Vec::with_capacity(pools.len());
    let mut streams = Vec::with_capacity(pools.len());
    for pool in pools {
        let mut source = pool.source;
        if let Some(interval) = args.interval {
            source = source.with_poll_interval(interval)?;
        }
        let coordinator = util::coordinator(global, source)?;
        let outcome = coordinator.start().await?;
        info!(pool = %pool.key, ?outcome, "watching");

        let key = pool.key;
        streams.push(
            coordinator
                .entities()
                .into_stream()
                .map(move |views| (key.clone(), views)),
        );
        coordinators.push(coordinator);
    }

    let mut updates = select_all(streams);
    let mut printed = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            next = updates.next() => {
                let Some((key, views)) = next else { break };
                if views.is_empty() {
                    continue;
                }
                let readings = PoolReading::collect(&key, &views);
                output::print_output(&render_readings(global, &readings), global.quiet);
                printed += 1;
                if args.count.is_some_and(|limit| printed >= limit) {
                    break;
                }
            }
        }
    }

    for coordinator in &coordinators {
        coordinator.shutdown().await;
    }
    Ok(())
}
