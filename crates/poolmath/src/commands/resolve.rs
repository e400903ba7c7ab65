//! Share-link resolution.

use std::fmt::Write as _;

use serde::Serialize;

use poolmath_api::ShareLink;
use poolmath_core::{DEFAULT_POOL_NAME, PoolIdentity, PoolSource};

use crate::cli::{GlobalOpts, ResolveArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct Resolution {
    share_link: String,
    user_id: String,
    pool_id: String,
    api_url: String,
    configuration_url: String,
}

fn detail(r: &Resolution) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Share link:  {}", r.share_link);
    let _ = writeln!(out, "User ID:     {}", r.user_id);
    let _ = writeln!(out, "Pool ID:     {}", r.pool_id);
    let _ = writeln!(out, "API URL:     {}", r.api_url);
    let _ = write!(out, "Pool page:   {}", r.configuration_url);
    out
}

pub async fn handle(args: ResolveArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let link = ShareLink::parse(&args.url)?;
    let ids = util::resolver(global)?.resolve(&link).await?;

    // Only used to render the endpoint URL; nothing is fetched.
    let source = PoolSource::new(DEFAULT_POOL_NAME, PoolIdentity::Ids(ids.clone()));
    let client = util::client(global, &source)?;

    let resolution = Resolution {
        share_link: link.to_string(),
        user_id: ids.user_id().to_owned(),
        pool_id: ids.pool_id().to_owned(),
        api_url: client.pool_url()?.to_string(),
        configuration_url: ids.configuration_url(),
    };

    let out = output::render_report(&global.output, &resolution, detail, |r| {
        format!("{}/{}", r.user_id, r.pool_id)
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
