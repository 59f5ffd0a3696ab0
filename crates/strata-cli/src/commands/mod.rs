//! Command implementations and dispatch

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use strata_config::ConfigLoader;
use strata_core::{StrataError, StrataResult};
use strata_resolver::ResolverLoader;
use tracing::info;

pub mod content;
pub mod engines;
pub mod resolve;

#[cfg(test)]
mod tests;

use crate::{output::OutputHandler, Commands};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub output: OutputHandler,
    pub loader: Arc<ResolverLoader>,
}

impl CommandContext {
    /// Context rooted at `cwd`, or the process working directory
    pub fn new(cwd: Option<Utf8PathBuf>) -> StrataResult<Self> {
        let cwd = match cwd {
            Some(cwd) => cwd,
            None => {
                let cwd = std::env::current_dir()
                    .map_err(|e| StrataError::io("Failed to get current directory", e))?;
                Utf8PathBuf::try_from(cwd)
                    .map_err(|e| StrataError::io("Current directory is not valid UTF-8", e.into_io_error()))?
            },
        };
        Ok(Self::at(cwd))
    }

    pub fn at(cwd: Utf8PathBuf) -> Self {
        let loader = Arc::new(ResolverLoader::new(ConfigLoader::new(cwd.clone())));
        Self {
            cwd,
            output: OutputHandler::new(),
            loader,
        }
    }

    /// `path` made absolute against the working directory
    pub fn absolute(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> StrataResult<()> {
    match command {
        Commands::Resolve {
            specifier,
            from,
            use_async,
        } => {
            info!("Resolving {} from {} (async: {})", specifier, from, use_async);
            resolve::execute(&specifier, &from, use_async, ctx).await
        },
        Commands::Content { id, watches } => {
            info!("Generating content of {}", id);
            content::execute(&id, watches, ctx).await
        },
        Commands::Engines { app } => {
            info!("Partitioning engines");
            engines::execute(app.as_deref(), ctx).await
        },
    }
}
