//! Command dispatch: bridges CLI args -> core coordinators -> output formatting.

pub mod config_cmd;
pub mod diagnostics;
pub mod fetch;
pub mod migrate;
pub mod pools;
pub mod resolve;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Pools => pools::handle(global),
        Command::Resolve(args) => resolve::handle(args, global).await,
        Command::Fetch(args) => fetch::handle(args, global).await,
        Command::Watch(args) => watch::handle(args, global).await,
        Command::Migrate(args) => migrate::handle(args, global).await,
        Command::Diagnostics(args) => diagnostics::handle(args, global).await,
        Command::Config(args) => config_cmd::handle(args, global),
        // Completions are handled before dispatch
        Command::Completions(_) => Err(CliError::Internal(
            "completions are generated before dispatch".into(),
        )),
    }
}
