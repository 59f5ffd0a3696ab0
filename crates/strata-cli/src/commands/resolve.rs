//! `strata resolve`

use strata_core::StrataResult;
use strata_resolver::{FsResolver, ModuleRequest, Resolution};

use super::CommandContext;

/// Resolve `specifier` from `from` with the filesystem host
pub async fn execute(specifier: &str, from: &camino::Utf8Path, use_async: bool, ctx: &CommandContext) -> StrataResult<()> {
    let resolver = if use_async {
        ctx.loader.resolver_async().await?
    } else {
        ctx.loader.resolver()?
    };
    let host = FsResolver::new(resolver.options().resolvable_extensions.clone());
    let request = ModuleRequest::new(specifier, ctx.absolute(from));

    let resolution = if use_async {
        resolver
            .resolve(request, |request| {
                let host = host.clone();
                async move { host.resolve(&request) }
            })
            .await?
    } else {
        resolver.resolve_sync(request, |request| host.resolve(request))?
    };

    report(&resolution, ctx);
    Ok(())
}

fn report(resolution: &Resolution, ctx: &CommandContext) {
    match resolution {
        Resolution::Found {
            id,
            virtual_response: None,
        } => ctx.output.result(id),
        Resolution::Found {
            id,
            virtual_response: Some(_),
        } => {
            ctx.output.result(id);
            ctx.output.info("virtual module; run `strata content <id>` to see its source");
        },
        Resolution::NotFound {
            specifier,
            from_file,
            reason,
        } => {
            ctx.output.warn(&format!("Cannot resolve {} from {}", specifier, from_file));
            if let Some(reason) = reason {
                ctx.output.info(reason);
            }
        },
    }
}
