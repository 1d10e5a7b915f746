//! Site root.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{response::Redirect, routing::get, Router};
use locallib_kernel::Module;

use super::catalog::resource::CATALOG_ROOT;

/// Sends visitors of `/` to the catalog.
pub struct HomeModule;

#[async_trait]
impl Module for HomeModule {
    fn name(&self) -> &'static str {
        "home"
    }

    fn mount_path(&self) -> String {
        "/".to_string()
    }

    fn routes(&self) -> Router {
        Router::new().route("/", get(|| async { Redirect::to(CATALOG_ROOT) }))
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "Redirect to the catalog",
                        "operationId": "home_index",
                        "tags": ["home"],
                        "responses": {
                            "303": { "description": "Redirect to /catalog" }
                        }
                    }
                }
            }
        }))
    }
}

pub fn create_module() -> Arc<dyn Module> {
    Arc::new(HomeModule)
}
