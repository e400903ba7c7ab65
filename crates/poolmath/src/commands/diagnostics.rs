//! Redacted health report: one refresh per pool, then the coordinator's view
//! of how it went.

use std::fmt::Write as _;
use std::time::Duration;

use serde::Serialize;

use poolmath_core::Diagnostics;

use crate::cli::{FetchArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct PoolDiagnostics {
    pool: String,
    #[serde(flatten)]
    diagnostics: Diagnostics,
}

fn detail(reports: &[PoolDiagnostics]) -> String {
    let mut out = String::new();
    for report in reports {
        let entry = &report.diagnostics.entry;
        let coord = &report.diagnostics.coordinator;
        let _ = writeln!(out, "{}", report.pool);
        let _ = writeln!(out, "  state:         {}", coord.state);
        let _ = writeln!(out, "  available:     {}", coord.last_update_success);
        let _ = writeln!(
            out,
            "  last success:  {}",
            coord
                .last_success
                .map_or_else(|| "never".into(), |t| t.to_rfc3339())
        );
        if let Some(failure) = &coord.last_exception {
            let _ = writeln!(out, "  last error:    {}", failure.message);
        }
        let _ = writeln!(
            out,
            "  interval:      {}",
            humantime::format_duration(Duration::from_secs(coord.update_interval_secs))
        );
        let _ = writeln!(out, "  timeout:       {}s", entry.timeout_secs);
        let _ = writeln!(out, "  unit/target:   {}/{}", entry.temperature_unit, entry.target);
        let _ = writeln!(out, "  entities:      {}", coord.entity_count);
    }
    out.trim_end().to_owned()
}

pub async fn handle(args: FetchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let pools = util::select_pools(global, &args.pools).await?;

    let mut reports = Vec::with_capacity(pools.len());
    for pool in pools {
        let coordinator = util::coordinator(global, pool.source)?;
        coordinator.restore_state();
        coordinator.refresh().await;
        reports.push(PoolDiagnostics {
            pool: pool.key,
            diagnostics: coordinator.diagnostics(),
        });
        coordinator.shutdown().await;
    }

    let out = output::render_report(&global.output, &reports, |r| detail(r), |reports| {
        reports
            .iter()
            .map(|r| format!("{}\t{}", r.pool, r.diagnostics.coordinator.state))
            .collect::<Vec<_>>()
            .join("\n")
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
