use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use locallib_db::MemoryStore;
use locallib_http::{router::merged_openapi, JsonRenderer};
use locallib_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "locallib-cli", version, about = "Local library catalog service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Print every served route
    Routes,
    /// Print the effective configuration as JSON
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().context("failed to load settings")?;

    match cli.command {
        Command::Serve => serve(settings),
        Command::Routes => print_routes(),
        Command::Config => {
            let rendered = serde_json::to_string_pretty(&settings)
                .context("failed to render configuration")?;
            println!("{rendered}");
            Ok(())
        }
    }
}

fn serve(settings: Settings) -> anyhow::Result<()> {
    locallib_telemetry::init(&settings.telemetry)?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(locallib_app::run(settings))
}

/// Routes as documented by the mounted modules, one `METHOD path  summary` per line.
fn print_routes() -> anyhow::Result<()> {
    let registry = locallib_app::build_registry(Arc::new(MemoryStore::new()), Arc::new(JsonRenderer));
    let spec = merged_openapi(&registry);

    let paths = spec["paths"]
        .as_object()
        .context("OpenAPI document has no paths")?;
    for (path, item) in paths {
        let Some(operations) = item.as_object() else {
            continue;
        };
        for (method, operation) in operations {
            let summary = operation["summary"].as_str().unwrap_or_default();
            println!("{:<6} {:<40} {}", method.to_uppercase(), path, summary);
        }
    }
    Ok(())
}
