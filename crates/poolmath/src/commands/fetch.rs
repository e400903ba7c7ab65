//! One-shot fetch, plus the reading table shared with `watch`.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;
use tracing::debug;

use poolmath_api::MeasurementValue;
use poolmath_core::{EntityView, RefreshOutcome};

use crate::cli::{FetchArgs, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util;

// ── Readings ────────────────────────────────────────────────────────

/// One sensor of one pool.
#[derive(Debug, Serialize)]
pub struct PoolReading {
    pub pool: String,
    #[serde(flatten)]
    pub view: Arc<EntityView>,
}

impl PoolReading {
    pub fn collect(pool: &str, views: &[Arc<EntityView>]) -> Vec<Self> {
        views
            .iter()
            .map(|view| Self {
                pool: pool.to_owned(),
                view: Arc::clone(view),
            })
            .collect()
    }
}

#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "Pool")]
    pool: String,
    #[tabled(rename = "Sensor")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Logged")]
    logged: String,
}

fn target_cell(view: &EntityView, color: bool) -> String {
    let Some(check) = &view.target else {
        return "-".into();
    };
    if !check.out_of_range {
        return output::paint("ok", Tone::Good, color);
    }
    let low = view
        .value
        .as_ref()
        .and_then(MeasurementValue::as_number)
        .zip(check.range.min)
        .is_some_and(|(value, min)| value < min);
    let direction = if low { "low" } else { "high" };
    output::paint(&format!("{direction} by {}", check.deviation), Tone::Bad, color)
}

fn to_row(r: &PoolReading, color: bool) -> ReadingRow {
    let view = &r.view;
    let mut value = view.display_value();
    if let (Some(unit), Some(_)) = (&view.unit, &view.value) {
        value = format!("{value} {unit}");
    }
    if !view.available || view.restored {
        value = output::paint(&value, Tone::Muted, color);
    }

    ReadingRow {
        pool: r.pool.clone(),
        name: view.name.clone(),
        value,
        target: target_cell(view, color),
        logged: view
            .last_updated
            .map_or_else(|| "-".into(), |t| t.format("%Y-%m-%d %H:%M UTC").to_string()),
    }
}

pub fn render_readings(global: &GlobalOpts, readings: &[PoolReading]) -> String {
    let color = output::should_color(&global.color);
    output::render_list(
        &global.output,
        readings,
        |r| to_row(r, color),
        |r| format!("{}\t{}\t{}", r.pool, r.view.code, r.view.display_value()),
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: FetchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let pools = util::select_pools(global, &args.pools).await?;

    let mut readings = Vec::new();
    let mut first_error = None;
    for pool in pools {
        let coordinator = util::coordinator(global, pool.source)?;
        coordinator.restore_state();

        let outcome = coordinator.refresh().await;
        debug!(pool = %pool.key, ?outcome, "refresh finished");
        if let RefreshOutcome::Failed { kind, message } = outcome {
            first_error
                .get_or_insert_with(|| CliError::from_fetch(kind, message).for_pool(&pool.key));
        }

        readings.extend(PoolReading::collect(&pool.key, &coordinator.registry().views()));
        coordinator.shutdown().await;
    }

    if !readings.is_empty() {
        output::print_output(&render_readings(global, &readings), global.quiet);
    }
    first_error.map_or(Ok(()), Err)
}
