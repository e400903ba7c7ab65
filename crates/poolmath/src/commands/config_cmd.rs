//! Config subcommand handlers.

use poolmath_api::ShareLink;
use poolmath_config::PoolEntry;
use poolmath_core::TemperatureUnit;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&util::config_file(global).display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let (_, cfg) = util::load_config(global)?;
            let toml_str = toml::to_string_pretty(&cfg).map_err(|e| {
                CliError::Config(Box::new(poolmath_config::ConfigError::Serialization(e)))
            })?;
            output::print_output(toml_str.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Add {
            key,
            url,
            name,
            interval,
            unit,
        } => {
            let (path, mut cfg) = util::load_config(global)?;
            if cfg.pools.contains_key(&key) {
                return Err(CliError::Conflict { key });
            }

            let link = ShareLink::parse(&url)?;
            let mut entry = PoolEntry::from_share_url(name, link.to_string());
            entry.poll_interval_secs = interval.map(|d| d.as_secs());
            entry.temperature_unit = unit.map(|u| TemperatureUnit::from(u).to_string());

            let source = poolmath_config::pool_to_source(&key, &entry, &cfg.defaults)?;
            cfg.pools.insert(key.clone(), entry);
            poolmath_config::save_config_to(&cfg, &path)?;

            output::status(
                &format!("Added pool '{key}' ({})", source.identity),
                global.quiet,
            );
            if source.needs_migration() {
                output::status(
                    &format!(
                        "This link carries a share token; it is resolved on first fetch, \
                         or now with: poolmath migrate {key}"
                    ),
                    global.quiet,
                );
            }
            Ok(())
        }

        ConfigCommand::Remove { key } => {
            let (path, mut cfg) = util::load_config(global)?;
            if cfg.pools.remove(&key).is_none() {
                return Err(util::pool_not_found(&cfg, &key));
            }
            poolmath_config::save_config_to(&cfg, &path)?;
            output::status(&format!("Removed pool '{key}'"), global.quiet);
            Ok(())
        }
    }
}
