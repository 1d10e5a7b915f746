//! Local library catalog service.
//!
//! The application modules live under [`modules`]; this crate also wires the
//! store, the renderer and the module registry into a running server.

use std::sync::Arc;

use anyhow::Context;
use locallib_db::DocumentStore;
use locallib_http::{JsonRenderer, Renderer};
use locallib_kernel::{settings::Settings, InitCtx, ModuleRegistry};

pub mod modules;

pub use modules::catalog::Catalog;

/// Registry with every application module, sharing one store and renderer.
pub fn build_registry(store: Arc<dyn DocumentStore>, renderer: Arc<dyn Renderer>) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, Catalog::new(store, renderer));
    registry
}

/// Connect, run the module lifecycle around the HTTP server, and shut down.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.endpoint,
        "locallib bootstrap starting"
    );

    let store = locallib_db::connect(&settings.database)
        .with_context(|| format!("failed to open store at '{}'", settings.database.endpoint))?;
    let registry = build_registry(Arc::clone(&store), Arc::new(JsonRenderer));
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_modules(&ctx).await?;
    locallib_db::prepare_collections(store.as_ref(), &registry.collect_collections())
        .await
        .context("failed to prepare collections")?;
    registry.start_modules(&ctx).await?;

    let served = locallib_http::start_server(&registry, &settings).await;
    registry.stop_modules().await?;
    served
}
