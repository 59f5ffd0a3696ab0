//! Unit tests for CLI commands.

use super::*;
use crate::Cli;
use clap::Parser;
use serde_json::json;
use strata_config::ResolverOptions;
use strata_packages::fixture::Fixture;

/// An app with one component and its resolver options written
fn app_with_config() -> (Fixture, CommandContext) {
    let fixture = Fixture::new();
    fixture.write_json("app/package.json", json!({ "name": "my-app" }));
    fixture.write("app/components/x.js", "export default class X {}");

    let ctx = CommandContext::at(fixture.path("app"));
    ConfigLoader::new(fixture.path("app"))
        .write(&ResolverOptions::for_app(fixture.path("app"), "my-app", "5.4.0"))
        .unwrap();
    (fixture, ctx)
}

#[test]
fn test_cli_parses_global_flags() {
    let cli = Cli::try_parse_from(["strata", "resolve", "./x", "--from", "app.js", "--async", "-v", "--cwd", "/work"]).unwrap();
    assert!(cli.verbose);
    assert_eq!(cli.cwd, Some(Utf8PathBuf::from("/work")));
    match cli.command {
        Commands::Resolve {
            specifier,
            from,
            use_async,
        } => {
            assert_eq!(specifier, "./x");
            assert_eq!(from, Utf8PathBuf::from("app.js"));
            assert!(use_async);
        },
        _ => panic!("expected resolve"),
    }

    assert!(Cli::try_parse_from(["strata", "resolve", "./x"]).is_err());
}

#[test]
fn test_relative_paths_are_made_absolute() {
    let ctx = CommandContext::at(Utf8PathBuf::from("/work"));
    assert_eq!(ctx.absolute(Utf8Path::new("app.js")), Utf8PathBuf::from("/work/app.js"));
    assert_eq!(ctx.absolute(Utf8Path::new("/elsewhere/app.js")), Utf8PathBuf::from("/elsewhere/app.js"));
}

#[tokio::test]
async fn test_resolve_command() {
    let (_fixture, ctx) = app_with_config();

    resolve::execute("./components/x", Utf8Path::new("app.js"), false, &ctx)
        .await
        .unwrap();
    resolve::execute("./components/missing", Utf8Path::new("app.js"), true, &ctx)
        .await
        .unwrap();
    assert!(ctx.loader.current().is_some());
}

#[tokio::test]
async fn test_resolve_without_config_fails() {
    let fixture = Fixture::new();
    let ctx = CommandContext::at(fixture.path("app"));

    let err = resolve::execute("./x", Utf8Path::new("app.js"), false, &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, StrataError::Io { .. }));
}

#[tokio::test]
async fn test_content_command() {
    let (fixture, ctx) = app_with_config();

    let id = fixture.path("app/-strata-entrypoint.js");
    content::execute(id.as_str(), true, &ctx).await.unwrap();

    let err = content::execute("/app/-strata-bogus.js", false, &ctx).await.unwrap_err();
    assert!(matches!(err, StrataError::UnknownVirtualModule { .. }));
}

#[tokio::test]
async fn test_engines_command() {
    let (fixture, ctx) = app_with_config();
    engines::execute(None, &ctx).await.unwrap();
    engines::execute(Some(Utf8Path::new(".")), &ctx).await.unwrap();
    drop(fixture);
}
