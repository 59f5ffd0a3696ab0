//! `strata engines`

use camino::Utf8Path;
use strata_core::{StrataError, StrataResult};
use strata_packages::RewrittenPackageCache;
use strata_resolver::partition_engines;

use super::CommandContext;

/// Partition the app's package graph and print the engine configs as JSON
pub async fn execute(app: Option<&Utf8Path>, ctx: &CommandContext) -> StrataResult<()> {
    let app_root = app.map(|app| ctx.absolute(app)).unwrap_or_else(|| ctx.cwd.clone());
    let packages = RewrittenPackageCache::load(&app_root)?;
    let partition = partition_engines(&packages)?;

    let configs = partition.to_configs();
    let json = serde_json::to_string_pretty(&configs).map_err(|e| StrataError::JsonParse {
        path: app_root.join("package.json"),
        message: e.to_string(),
    })?;

    ctx.output.result(&json);
    ctx.output.success(&format!("{} engine(s)", configs.len()));
    Ok(())
}
