//! Pool listing. Reads the config only; no network access.

use serde::Serialize;
use tabled::Tabled;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util;

#[derive(Debug, Serialize)]
struct PoolListing {
    key: String,
    name: Option<String>,
    identity: Option<String>,
    poll_interval_secs: Option<u64>,
    temperature_unit: Option<String>,
    needs_migration: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Tabled)]
struct PoolRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Pool")]
    identity: String,
    #[tabled(rename = "Interval")]
    interval: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn to_row(p: &PoolListing, color: bool) -> PoolRow {
    let status = match (&p.error, p.needs_migration) {
        (Some(err), _) => output::paint(&format!("invalid: {err}"), Tone::Bad, color),
        (None, true) => output::paint("needs migration", Tone::Warn, color),
        (None, false) => output::paint("ok", Tone::Good, color),
    };
    PoolRow {
        key: p.key.clone(),
        name: p.name.clone().unwrap_or_default(),
        identity: p.identity.clone().unwrap_or_default(),
        interval: p
            .poll_interval_secs
            .map(|s| humantime::format_duration(std::time::Duration::from_secs(s)).to_string())
            .unwrap_or_default(),
        unit: p.temperature_unit.clone().unwrap_or_default(),
        status,
    }
}

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let (_, cfg) = util::load_config(global)?;

    let listings: Vec<PoolListing> = cfg
        .pools
        .keys()
        .map(|key| match cfg.source(key) {
            Ok(src) => PoolListing {
                key: key.clone(),
                name: Some(src.name.clone()),
                identity: Some(src.identity.to_string()),
                poll_interval_secs: Some(src.poll_interval.as_secs()),
                temperature_unit: Some(src.temperature_unit.to_string()),
                needs_migration: src.needs_migration(),
                error: None,
            },
            Err(e) => PoolListing {
                key: key.clone(),
                name: None,
                identity: None,
                poll_interval_secs: None,
                temperature_unit: None,
                needs_migration: false,
                error: Some(e.to_string()),
            },
        })
        .collect();

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &listings,
        |p| to_row(p, color),
        |p| p.key.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
