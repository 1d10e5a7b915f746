//! Catalog module: authors, books, book copies and genres.

pub mod controllers;
pub mod models;
pub mod resource;
pub mod routes;
pub mod stats;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{response::Response, Router};
use locallib_db::{DocumentStore, Record, Repository};
use locallib_http::{Page, Renderer};
use locallib_kernel::{InitCtx, Module};

use models::{Author, Book, BookInstance, Genre};

/// Shared handler state: the store connection and the page renderer.
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn DocumentStore>,
    renderer: Arc<dyn Renderer>,
}

impl Catalog {
    pub fn new(store: Arc<dyn DocumentStore>, renderer: Arc<dyn Renderer>) -> Self {
        Self { store, renderer }
    }

    pub fn repo<R: Record>(&self) -> Repository<R> {
        Repository::new(Arc::clone(&self.store))
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn render(&self, page: Page) -> Response {
        self.renderer.render(page)
    }
}

pub struct CatalogModule {
    catalog: Catalog,
}

impl CatalogModule {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Module for CatalogModule {
    fn name(&self) -> &'static str {
        "catalog"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = self.catalog.store().backend(),
            "catalog module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.catalog.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(routes::openapi_fragment())
    }

    fn collections(&self) -> Vec<&'static str> {
        vec![
            Author::COLLECTION,
            Book::COLLECTION,
            BookInstance::COLLECTION,
            Genre::COLLECTION,
        ]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let stats = stats::collect(&self.catalog).await?;
        tracing::info!(
            module = self.name(),
            books = stats.book_count,
            copies = stats.book_instance_count,
            authors = stats.author_count,
            genres = stats.genre_count,
            "catalog module started"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "catalog module stopped");
        Ok(())
    }
}

pub fn create_module(catalog: Catalog) -> Arc<dyn Module> {
    Arc::new(CatalogModule::new(catalog))
}
