//! HTTP handlers shared by every catalog entity.
//!
//! Each handler is generic over a [`Resource`] and is instantiated once per
//! entity by the routing table. Pages are named `{entity}_list`,
//! `{entity}_detail`, `{entity}_form` and `{entity}_delete`.

use axum::{
    extract::{rejection::FormRejection, Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use locallib_db::RecordId;
use locallib_http::{AppError, Page};
use serde_json::Value;

use super::resource::{self, Deletion, Dependents, MissingPolicy, Resource, Submission};
use super::validation::{FieldError, FormInput};
use super::Catalog;

type FormFields = Result<Form<Vec<(String, String)>>, FormRejection>;

fn template<R: Resource>(page: &str) -> String {
    format!("{}_{}", R::SINGULAR, page)
}

/// Malformed bodies are a bad request; anything well-formed goes to validation.
fn form_input(fields: FormFields) -> Result<FormInput, AppError> {
    let Form(pairs) = fields.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    Ok(FormInput::from_pairs(pairs))
}

/// Create/update form, with the lookups it needs to offer choices.
async fn form_page<R: Resource>(
    catalog: &Catalog,
    title: &str,
    record: Value,
    errors: &[FieldError],
) -> Result<Response, AppError> {
    let lookups = R::lookups(catalog).await?;
    let errors = serde_json::to_value(errors).map_err(|e| AppError::Internal(e.into()))?;
    Ok(catalog.render(
        Page::new(template::<R>("form"))
            .with("title", title)
            .with(R::SINGULAR, record)
            .with("errors", errors)
            .extend(lookups),
    ))
}

fn delete_page<R: Resource>(catalog: &Catalog, record: &R, dependents: Option<Dependents>) -> Response {
    let mut page = Page::new(template::<R>("delete"))
        .with("title", R::LABELS.delete)
        .with(R::SINGULAR, record.view());
    if let Some(dependents) = dependents {
        page = page.with(dependents.key, dependents.records);
    }
    catalog.render(page)
}

/// Delete-side answer for an id with no record behind it.
fn missing_on_delete<R: Resource>() -> Result<Response, AppError> {
    match R::MISSING_ON_DELETE {
        MissingPolicy::NotFound => Err(AppError::not_found(R::LABELS.not_found)),
        MissingPolicy::RedirectToList => Ok(Redirect::to(&R::list_url()).into_response()),
    }
}

async fn submission_response<R: Resource>(
    catalog: &Catalog,
    title: &str,
    outcome: Submission<R>,
) -> Result<Response, AppError> {
    match outcome {
        Submission::Saved(record) | Submission::Existing(record) => {
            Ok(Redirect::to(&record.url()).into_response())
        }
        Submission::Invalid { view, errors, .. } => {
            form_page::<R>(catalog, title, view, &errors).await
        }
        Submission::Rejected { record, error } => {
            form_page::<R>(catalog, title, record.view(), &[error]).await
        }
        Submission::NotFound => Err(AppError::not_found(R::LABELS.not_found)),
    }
}

pub async fn list<R: Resource>(State(catalog): State<Catalog>) -> Result<Response, AppError> {
    let records = R::list(&catalog).await?;
    tracing::debug!(resource = R::SINGULAR, count = records.len(), "listing records");

    Ok(catalog.render(
        Page::new(template::<R>("list"))
            .with("title", R::LABELS.list)
            .with(&format!("{}_list", R::SINGULAR), records),
    ))
}

pub async fn detail<R: Resource>(
    State(catalog): State<Catalog>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = RecordId::from(id);
    let Some(detail) = resource::detail::<R>(&catalog, &id).await? else {
        return Err(AppError::not_found(R::LABELS.not_found));
    };

    Ok(catalog.render(
        Page::new(template::<R>("detail"))
            .with("title", R::LABELS.detail)
            .with(R::SINGULAR, detail.view)
            .extend(detail.related),
    ))
}

pub async fn create_form<R: Resource>(State(catalog): State<Catalog>) -> Result<Response, AppError> {
    form_page::<R>(&catalog, R::LABELS.create, Value::Null, &[]).await
}

pub async fn create<R: Resource>(
    State(catalog): State<Catalog>,
    fields: FormFields,
) -> Result<Response, AppError> {
    tracing::debug!(resource = R::SINGULAR, "create submission received");
    let input = form_input(fields)?;
    let outcome = resource::create::<R>(&catalog, &input).await?;
    submission_response(&catalog, R::LABELS.create, outcome).await
}

pub async fn update_form<R: Resource>(
    State(catalog): State<Catalog>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = RecordId::from(id);
    let Some(record) = catalog.repo::<R>().get(&id).await? else {
        return Err(AppError::not_found(R::LABELS.not_found));
    };
    form_page::<R>(&catalog, R::LABELS.update, record.view(), &[]).await
}

pub async fn update<R: Resource>(
    State(catalog): State<Catalog>,
    Path(id): Path<String>,
    fields: FormFields,
) -> Result<Response, AppError> {
    tracing::debug!(resource = R::SINGULAR, id = %id, "update submission received");
    let id = RecordId::from(id);
    let input = form_input(fields)?;
    let outcome = resource::update::<R>(&catalog, &id, &input).await?;
    submission_response(&catalog, R::LABELS.update, outcome).await
}

pub async fn delete_form<R: Resource>(
    State(catalog): State<Catalog>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = RecordId::from(id);
    match resource::delete_preview::<R>(&catalog, &id).await? {
        Some(preview) => Ok(delete_page(&catalog, &preview.record, preview.dependents)),
        None => missing_on_delete::<R>(),
    }
}

/// The id comes from the path; any id in the body is ignored.
pub async fn delete<R: Resource>(
    State(catalog): State<Catalog>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = RecordId::from(id);
    match resource::delete::<R>(&catalog, &id).await? {
        Deletion::Deleted(_) => Ok(Redirect::to(&R::list_url()).into_response()),
        Deletion::Blocked { record, dependents } => {
            Ok(delete_page(&catalog, &record, Some(dependents)))
        }
        Deletion::NotFound => missing_on_delete::<R>(),
    }
}
