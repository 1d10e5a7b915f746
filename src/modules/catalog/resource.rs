//! Generic catalog resource.
//!
//! Every entity plugs into the same list / detail / create / update / delete
//! flow by implementing [`Resource`]: its form, sort key, uniqueness and
//! reference checks and its delete guard. The operations here return plain
//! outcomes; turning them into pages and redirects is the controllers' job.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use locallib_db::{Filter, FindOptions, Record, RecordId, StoreError};
use serde_json::{Map, Value};

use super::validation::{self, EntityForm, FieldError, FormInput};
use super::Catalog;

pub const CATALOG_ROOT: &str = "/catalog";

/// Page titles and the not-found message of one entity.
#[derive(Debug, Clone, Copy)]
pub struct Labels {
    pub list: &'static str,
    pub detail: &'static str,
    pub create: &'static str,
    pub update: &'static str,
    pub delete: &'static str,
    pub not_found: &'static str,
}

/// What a delete (or delete form) does when the record is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    NotFound,
    RedirectToList,
}

/// An existing record that clashes with a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Duplicate<R> {
    /// Send the user to the existing record instead of creating another.
    Redirect(R),
    /// Refuse the submission with an explanation.
    Reject(FieldError),
}

/// Records that still point at the one being deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependents {
    pub key: &'static str,
    pub records: Vec<Value>,
}

impl Dependents {
    pub fn blocks_delete(&self) -> bool {
        !self.records.is_empty()
    }
}

#[async_trait]
pub trait Resource: Record + Clone + fmt::Debug {
    /// Path segment of a single record and template prefix, e.g. `author`.
    const SINGULAR: &'static str;
    /// Path segment of the list page, e.g. `authors`.
    const PLURAL: &'static str;
    const LABELS: Labels;
    /// Ascending list order.
    const SORT_KEY: &'static str;
    const MISSING_ON_DELETE: MissingPolicy;

    /// Submitted fields and their checks.
    type Form: EntityForm;

    /// Build a record from a trimmed form. Every declared field is taken
    /// from the form, so omitted optionals come back cleared.
    fn from_form(id: RecordId, form: &Self::Form) -> Self;

    /// Entity-specific derived fields, merged into the view next to `url`.
    fn derived(&self) -> Map<String, Value> {
        Map::new()
    }

    fn url(&self) -> String {
        format!("{}/{}/{}", CATALOG_ROOT, Self::SINGULAR, self.id())
    }

    fn list_url() -> String {
        format!("{}/{}", CATALOG_ROOT, Self::PLURAL)
    }

    /// Stored fields plus derived fields, for rendering.
    fn view(&self) -> Value {
        let Ok(Value::Object(mut fields)) = serde_json::to_value(self) else {
            return Value::Null;
        };
        fields.insert("url".to_string(), Value::String(self.url()));
        fields.extend(self.derived());
        Value::Object(fields)
    }

    /// All records in list order, ready for rendering.
    async fn list(catalog: &Catalog) -> Result<Vec<Value>, StoreError> {
        let records = catalog
            .repo::<Self>()
            .find(&Filter::all(), &FindOptions::sorted_by(Self::SORT_KEY))
            .await?;
        Ok(records.iter().map(Self::view).collect())
    }

    /// The record as shown on its detail page, with references resolved.
    async fn detail_view(&self, _catalog: &Catalog) -> Result<Value, StoreError> {
        Ok(self.view())
    }

    /// Extra context for the detail page, loaded alongside the record.
    async fn related(_id: &RecordId, _catalog: &Catalog) -> Result<Map<String, Value>, StoreError> {
        Ok(Map::new())
    }

    /// Option lists the create/update form needs.
    async fn lookups(_catalog: &Catalog) -> Result<Map<String, Value>, StoreError> {
        Ok(Map::new())
    }

    /// Look for another record this one would duplicate.
    async fn find_duplicate(&self, _catalog: &Catalog) -> Result<Option<Duplicate<Self>>, StoreError> {
        Ok(None)
    }

    /// Verify referenced records exist; the first dangling reference is reported.
    async fn check_references(&self, _catalog: &Catalog) -> Result<Option<FieldError>, StoreError> {
        Ok(None)
    }

    /// Records that block deletion. `None` means deletes are never guarded.
    async fn dependents(_id: &RecordId, _catalog: &Catalog) -> Result<Option<Dependents>, StoreError> {
        Ok(None)
    }
}

/// A record with everything its detail page shows.
#[derive(Debug, Clone)]
pub struct Detail<R> {
    pub record: R,
    pub view: Value,
    pub related: Map<String, Value>,
}

/// Outcome of a create or update submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission<R> {
    Saved(R),
    /// Field validation failed. `view` is the record overlaid with the
    /// values exactly as submitted, for re-display.
    Invalid {
        record: R,
        view: Value,
        errors: Vec<FieldError>,
    },
    /// Uniqueness or reference rule failed.
    Rejected { record: R, error: FieldError },
    /// The submission duplicates this existing record.
    Existing(R),
    NotFound,
}

/// A record about to be deleted, with whatever depends on it.
#[derive(Debug, Clone)]
pub struct DeletePreview<R> {
    pub record: R,
    pub dependents: Option<Dependents>,
}

/// Outcome of a delete.
#[derive(Debug, Clone, PartialEq)]
pub enum Deletion<R> {
    Deleted(R),
    Blocked { record: R, dependents: Dependents },
    NotFound,
}

pub async fn detail<R: Resource>(
    catalog: &Catalog,
    id: &RecordId,
) -> Result<Option<Detail<R>>, StoreError> {
    let repo = catalog.repo::<R>();
    let (record, related) = tokio::try_join!(repo.get(id), R::related(id, catalog))?;

    let Some(record) = record else {
        tracing::debug!(resource = R::SINGULAR, id = %id, "record not found");
        return Ok(None);
    };

    let view = record.detail_view(catalog).await?;
    Ok(Some(Detail {
        record,
        view,
        related,
    }))
}

enum Screened<R> {
    Accepted(R),
    Refused(Submission<R>),
}

/// Validation, then uniqueness, then references. Nothing is written here.
async fn screen<R: Resource>(
    catalog: &Catalog,
    id: RecordId,
    input: &FormInput,
) -> Result<Screened<R>, StoreError> {
    let validated = validation::validate::<R::Form>(input);
    let record = R::from_form(id, &validated.form);

    if !validated.is_valid() {
        tracing::info!(
            resource = R::SINGULAR,
            errors = validated.errors.len(),
            "submission failed validation"
        );
        let view = resubmitted_view(&record, &validated.form);
        return Ok(Screened::Refused(Submission::Invalid {
            record,
            view,
            errors: validated.errors,
        }));
    }

    match record.find_duplicate(catalog).await? {
        Some(Duplicate::Redirect(existing)) => {
            tracing::info!(resource = R::SINGULAR, existing = %existing.id(), "duplicate submission");
            return Ok(Screened::Refused(Submission::Existing(existing)));
        }
        Some(Duplicate::Reject(error)) => {
            tracing::info!(resource = R::SINGULAR, "duplicate submission rejected");
            return Ok(Screened::Refused(Submission::Rejected { record, error }));
        }
        None => {}
    }

    if let Some(error) = record.check_references(catalog).await? {
        tracing::info!(resource = R::SINGULAR, field = %error.field, "dangling reference");
        return Ok(Screened::Refused(Submission::Rejected { record, error }));
    }

    Ok(Screened::Accepted(record))
}

pub async fn create<R: Resource>(
    catalog: &Catalog,
    input: &FormInput,
) -> Result<Submission<R>, StoreError> {
    let record = match screen::<R>(catalog, RecordId::generate(), input).await? {
        Screened::Accepted(record) => record,
        Screened::Refused(outcome) => return Ok(outcome),
    };

    catalog.repo::<R>().insert(&record).await?;
    tracing::info!(resource = R::SINGULAR, id = %record.id(), "record created");
    Ok(Submission::Saved(record))
}

/// Full replace of an existing record from the submitted form.
pub async fn update<R: Resource>(
    catalog: &Catalog,
    id: &RecordId,
    input: &FormInput,
) -> Result<Submission<R>, StoreError> {
    let repo = catalog.repo::<R>();
    if !repo.exists(id).await? {
        return Ok(Submission::NotFound);
    }

    let record = match screen::<R>(catalog, id.clone(), input).await? {
        Screened::Accepted(record) => record,
        Screened::Refused(outcome) => return Ok(outcome),
    };

    if !repo.replace(&record).await? {
        return Ok(Submission::NotFound);
    }
    tracing::info!(resource = R::SINGULAR, id = %id, "record updated");
    Ok(Submission::Saved(record))
}

pub async fn delete_preview<R: Resource>(
    catalog: &Catalog,
    id: &RecordId,
) -> Result<Option<DeletePreview<R>>, StoreError> {
    let repo = catalog.repo::<R>();
    let (record, dependents) = tokio::try_join!(repo.get(id), R::dependents(id, catalog))?;

    Ok(record.map(|record| DeletePreview { record, dependents }))
}

pub async fn delete<R: Resource>(
    catalog: &Catalog,
    id: &RecordId,
) -> Result<Deletion<R>, StoreError> {
    let repo = catalog.repo::<R>();
    let (record, dependents) = tokio::try_join!(repo.get(id), R::dependents(id, catalog))?;

    let Some(record) = record else {
        return Ok(Deletion::NotFound);
    };

    if let Some(dependents) = dependents.filter(Dependents::blocks_delete) {
        tracing::info!(
            resource = R::SINGULAR,
            id = %id,
            dependents = dependents.records.len(),
            "delete refused while dependents exist"
        );
        return Ok(Deletion::Blocked { record, dependents });
    }

    match repo.delete(id).await? {
        Some(deleted) => {
            tracing::info!(resource = R::SINGULAR, id = %id, "record deleted");
            Ok(Deletion::Deleted(deleted))
        }
        None => Ok(Deletion::NotFound),
    }
}

/// The record's view with every submitted form field written over it, so
/// values that could not be stored (an unknown status, a bad date) are shown
/// back as typed.
pub fn resubmitted_view<R: Resource>(record: &R, form: &R::Form) -> Value {
    let mut view = record.view();
    if let (Value::Object(fields), Ok(Value::Object(submitted))) =
        (&mut view, serde_json::to_value(form))
    {
        fields.extend(submitted);
    }
    view
}

/// Index views of `R` by id, for resolving references.
pub async fn views_by_id<R: Resource>(
    catalog: &Catalog,
    sort: &str,
) -> Result<(Vec<Value>, HashMap<String, Value>), StoreError> {
    let records = catalog
        .repo::<R>()
        .find(&Filter::all(), &FindOptions::sorted_by(sort))
        .await?;

    let views: Vec<Value> = records.iter().map(R::view).collect();
    let index = records
        .iter()
        .zip(views.iter())
        .map(|(record, view)| (record.id().to_string(), view.clone()))
        .collect();
    Ok((views, index))
}

/// Replace the id (or ids) stored under `field` with the referenced views.
/// Dangling ids become `null`.
pub fn populate(view: &mut Value, field: &str, index: &HashMap<String, Value>) {
    let Some(slot) = view.get_mut(field) else {
        return;
    };

    let resolve = |id: &Value| {
        id.as_str()
            .and_then(|id| index.get(id))
            .cloned()
            .unwrap_or(Value::Null)
    };

    let resolved = match &*slot {
        Value::Array(ids) => Value::Array(ids.iter().map(resolve).collect()),
        other => resolve(other),
    };
    *slot = resolved;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn populate_resolves_single_and_many() {
        let index: HashMap<String, Value> = [
            ("a1".to_string(), json!({"name": "Tolkien, J.R.R."})),
            ("g1".to_string(), json!({"name": "Fantasy"})),
        ]
        .into_iter()
        .collect();

        let mut view = json!({"author": "a1", "genre": ["g1", "gone"]});
        populate(&mut view, "author", &index);
        populate(&mut view, "genre", &index);
        populate(&mut view, "missing", &index);

        assert_eq!(view["author"]["name"], "Tolkien, J.R.R.");
        assert_eq!(view["genre"][0]["name"], "Fantasy");
        assert_eq!(view["genre"][1], Value::Null);
        assert!(view.get("missing").is_none());
    }

    #[test]
    fn empty_dependents_do_not_block() {
        let none = Dependents {
            key: "author_books",
            records: vec![],
        };
        assert!(!none.blocks_delete());
    }
}
