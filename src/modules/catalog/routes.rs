//! Catalog routing table.
//!
//! One list of route shapes is instantiated per entity; it drives the axum
//! router, the OpenAPI fragment and the `routes` listing alike. Paths are
//! relative to the module's mount path.

use std::collections::BTreeMap;

use axum::{
    http::Method,
    routing::{get, post, MethodRouter},
    Router,
};
use serde_json::{json, Map, Value};

use super::controllers;
use super::models::{Author, Book, BookInstance, Genre};
use super::resource::{Resource, CATALOG_ROOT};
use super::stats;
use super::Catalog;

/// One step of an entity's CRUD surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Detail,
    CreateForm,
    Create,
    UpdateForm,
    Update,
    DeleteForm,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::List,
        Operation::CreateForm,
        Operation::Create,
        Operation::Detail,
        Operation::UpdateForm,
        Operation::Update,
        Operation::DeleteForm,
        Operation::Delete,
    ];

    pub fn method(self) -> Method {
        match self {
            Operation::Create | Operation::Update | Operation::Delete => Method::POST,
            _ => Method::GET,
        }
    }

    pub fn path(self, singular: &str, plural: &str) -> String {
        match self {
            Operation::List => format!("/{plural}"),
            Operation::Detail => format!("/{singular}/{{id}}"),
            Operation::CreateForm | Operation::Create => format!("/{singular}/create"),
            Operation::UpdateForm | Operation::Update => format!("/{singular}/{{id}}/update"),
            Operation::DeleteForm | Operation::Delete => format!("/{singular}/{{id}}/delete"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Detail => "detail",
            Operation::CreateForm => "create_form",
            Operation::Create => "create",
            Operation::UpdateForm => "update_form",
            Operation::Update => "update",
            Operation::DeleteForm => "delete_form",
            Operation::Delete => "delete",
        }
    }

    fn takes_id(self) -> bool {
        !matches!(
            self,
            Operation::List | Operation::CreateForm | Operation::Create
        )
    }

    fn takes_form(self) -> bool {
        matches!(self, Operation::Create | Operation::Update)
    }

    fn handler<R: Resource>(self) -> MethodRouter<Catalog> {
        match self {
            Operation::List => get(controllers::list::<R>),
            Operation::Detail => get(controllers::detail::<R>),
            Operation::CreateForm => get(controllers::create_form::<R>),
            Operation::Create => post(controllers::create::<R>),
            Operation::UpdateForm => get(controllers::update_form::<R>),
            Operation::Update => post(controllers::update::<R>),
            Operation::DeleteForm => get(controllers::delete_form::<R>),
            Operation::Delete => post(controllers::delete::<R>),
        }
    }
}

/// A single row of the routing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub method: Method,
    pub path: String,
    /// Entity segment, or `catalog` for the index page.
    pub entity: &'static str,
    pub operation: &'static str,
    pub summary: String,
    takes_id: bool,
    takes_form: bool,
}

impl RouteSpec {
    fn for_entity<R: Resource>(operation: Operation) -> Self {
        let summary = match operation {
            Operation::List => R::LABELS.list,
            Operation::Detail => R::LABELS.detail,
            Operation::CreateForm | Operation::Create => R::LABELS.create,
            Operation::UpdateForm | Operation::Update => R::LABELS.update,
            Operation::DeleteForm | Operation::Delete => R::LABELS.delete,
        };
        Self {
            method: operation.method(),
            path: operation.path(R::SINGULAR, R::PLURAL),
            entity: R::SINGULAR,
            operation: operation.name(),
            summary: summary.to_string(),
            takes_id: operation.takes_id(),
            takes_form: operation.takes_form(),
        }
    }

    /// Path as served, including the catalog mount point.
    pub fn full_path(&self) -> String {
        if self.path == "/" {
            CATALOG_ROOT.to_string()
        } else {
            format!("{}{}", CATALOG_ROOT, self.path)
        }
    }
}

fn index_route() -> RouteSpec {
    RouteSpec {
        method: Method::GET,
        path: "/".to_string(),
        entity: "catalog",
        operation: "index",
        summary: stats::INDEX_TITLE.to_string(),
        takes_id: false,
        takes_form: false,
    }
}

fn entity_routes<R: Resource>() -> impl Iterator<Item = RouteSpec> {
    Operation::ALL.into_iter().map(RouteSpec::for_entity::<R>)
}

pub fn route_table() -> Vec<RouteSpec> {
    std::iter::once(index_route())
        .chain(entity_routes::<Author>())
        .chain(entity_routes::<Book>())
        .chain(entity_routes::<BookInstance>())
        .chain(entity_routes::<Genre>())
        .collect()
}

fn add_entity<R: Resource>(routes: &mut BTreeMap<String, MethodRouter<Catalog>>) {
    for operation in Operation::ALL {
        let path = operation.path(R::SINGULAR, R::PLURAL);
        let handler = operation.handler::<R>();
        let merged = match routes.remove(&path) {
            Some(existing) => existing.merge(handler),
            None => handler,
        };
        routes.insert(path, merged);
    }
}

pub fn router(catalog: Catalog) -> Router {
    let mut routes: BTreeMap<String, MethodRouter<Catalog>> = BTreeMap::new();
    routes.insert("/".to_string(), get(stats::index));
    add_entity::<Author>(&mut routes);
    add_entity::<Book>(&mut routes);
    add_entity::<BookInstance>(&mut routes);
    add_entity::<Genre>(&mut routes);

    routes
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| {
            router.route(&path, method_router)
        })
        .with_state(catalog)
}

fn operation_doc(spec: &RouteSpec) -> Value {
    let mut responses = Map::new();
    if spec.method == Method::POST {
        responses.insert(
            "200".into(),
            json!({ "description": "Form page re-rendered with errors or dependents" }),
        );
        responses.insert(
            "303".into(),
            json!({ "description": "Redirect to the saved record or the list" }),
        );
    } else {
        responses.insert("200".into(), json!({ "description": "Rendered page" }));
    }
    if spec.takes_id {
        responses.insert(
            "404".into(),
            json!({
                "description": "No record with this id",
                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
            }),
        );
    }
    responses.insert(
        "500".into(),
        json!({
            "description": "Internal server error",
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
        }),
    );

    let mut doc = json!({
        "summary": spec.summary,
        "operationId": format!("{}_{}", spec.entity, spec.operation),
        "tags": [spec.entity],
        "responses": responses,
    });
    if spec.takes_id {
        doc["parameters"] = json!([{
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "string" }
        }]);
    }
    if spec.takes_form {
        doc["requestBody"] = json!({
            "required": true,
            "content": {
                "application/x-www-form-urlencoded": { "schema": { "type": "object" } }
            }
        });
    }
    doc
}

/// OpenAPI paths for every row of the routing table.
pub fn openapi_fragment() -> Value {
    let mut paths = Map::new();
    for spec in route_table() {
        let item = paths
            .entry(spec.path.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        item[spec.method.as_str().to_lowercase()] = operation_doc(&spec);
    }
    json!({ "paths": paths })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_entity_operation() {
        let table = route_table();
        assert_eq!(table.len(), 1 + 4 * Operation::ALL.len());

        let paths: Vec<(Method, String)> = table
            .iter()
            .map(|spec| (spec.method.clone(), spec.full_path()))
            .collect();
        assert!(paths.contains(&(Method::GET, "/catalog".to_string())));
        assert!(paths.contains(&(Method::GET, "/catalog/authors".to_string())));
        assert!(paths.contains(&(Method::POST, "/catalog/genre/create".to_string())));
        assert!(paths.contains(&(Method::POST, "/catalog/bookinstance/{id}/delete".to_string())));
        assert!(paths.contains(&(Method::GET, "/catalog/book/{id}/update".to_string())));
    }

    #[test]
    fn openapi_groups_methods_by_path() {
        let doc = openapi_fragment();
        let create = &doc["paths"]["/author/create"];
        assert_eq!(create["get"]["operationId"], "author_create_form");
        assert_eq!(create["post"]["operationId"], "author_create");
        assert!(create["post"]["requestBody"].is_object());

        let detail = &doc["paths"]["/genre/{id}"]["get"];
        assert_eq!(detail["parameters"][0]["name"], "id");
        assert!(detail["responses"]["404"].is_object());
        assert_eq!(doc["paths"]["/"]["get"]["operationId"], "catalog_index");
    }
}
