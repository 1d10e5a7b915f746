//! Page rendering seam.
//!
//! Handlers describe a page as a template name plus a context map and hand it
//! to the installed [`Renderer`]. The template engine itself lives outside the
//! service; [`JsonRenderer`] exposes the context as JSON.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

/// A template name and the values it is rendered with.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page {
    template: String,
    context: Map<String, Value>,
}

impl Page {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            context: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    /// Add every entry of `values`, replacing existing keys.
    pub fn extend(mut self, values: Map<String, Value>) -> Self {
        self.context.extend(values);
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }
}

/// Turns a page into an HTTP response.
pub trait Renderer: Send + Sync {
    fn render(&self, page: Page) -> Response;
}

/// Answers every page as `{"template": .., ...context}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, page: Page) -> Response {
        let mut body = Map::with_capacity(page.context.len() + 1);
        body.insert("template".to_string(), Value::String(page.template));
        body.extend(page.context);
        (StatusCode::OK, Json(Value::Object(body))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn later_values_replace_earlier_ones() {
        let page = Page::new("genre_form")
            .with("title", "Create Genre")
            .with("title", "Update Genre");
        assert_eq!(page.get("title"), Some(&json!("Update Genre")));
        assert_eq!(page.template(), "genre_form");
    }

    #[tokio::test]
    async fn json_renderer_flattens_context() {
        let response = JsonRenderer.render(Page::new("index").with("author_count", 3));
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"template": "index", "author_count": 3}));
    }
}
