//! `strata content`

use strata_core::StrataResult;

use super::CommandContext;

/// Print the generated source of the virtual module `id`
pub async fn execute(id: &str, watches: bool, ctx: &CommandContext) -> StrataResult<()> {
    let resolver = ctx.loader.resolver_async().await?;
    let content = resolver.virtual_content_for_id(id)?;

    ctx.output.result(&content.src);
    if watches {
        for path in &content.watches {
            ctx.output.info(&format!("watch: {}", path));
        }
    }
    Ok(())
}
