use std::cmp::Ordering;

use async_trait::async_trait;
use locallib_db::{store::compare_values, Filter, FindOptions, Record, RecordId, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{Date, OffsetDateTime};
use validator::{Validate, ValidationError};

use super::{format_long_date, Book};
use crate::modules::catalog::resource::{populate, views_by_id, Labels, MissingPolicy, Resource};
use crate::modules::catalog::validation::{
    iso_date_or_empty, parse_iso_date, EntityForm, FieldError, FormInput,
};
use crate::modules::catalog::Catalog;

/// Circulation state of a physical copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    Available,
    #[default]
    Maintenance,
    Loaned,
    Reserved,
}

impl Status {
    pub const NAMES: &'static [&'static str] = &["Available", "Maintenance", "Loaned", "Reserved"];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Available => "Available",
            Status::Maintenance => "Maintenance",
            Status::Loaned => "Loaned",
            Status::Reserved => "Reserved",
        }
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Available" => Ok(Status::Available),
            "Maintenance" => Ok(Status::Maintenance),
            "Loaned" => Ok(Status::Loaned),
            "Reserved" => Ok(Status::Reserved),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// Empty is allowed and means "use the default".
fn known_status(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || Status::NAMES.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new("status"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct BookInstanceForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "Книга не повинна бути порожньою."))]
    pub book: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "Видавництво не повинно бути порожнім."))]
    pub imprint: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    #[validate(custom(
        function = "known_status",
        message = "Статус має бути одним із: Available, Maintenance, Loaned, Reserved."
    ))]
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    #[validate(custom(function = "iso_date_or_empty", message = "Недійсна дата повернення"))]
    pub due_back: String,
}

impl EntityForm for BookInstanceForm {
    const FIELDS: &'static [&'static str] = &["book", "imprint", "status", "due_back"];

    fn from_input(input: &FormInput) -> Self {
        Self {
            book: input.optional("book"),
            imprint: input.optional("imprint"),
            status: input.text("status"),
            due_back: input.text("due_back"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookInstance {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub book: RecordId,
    pub imprint: String,
    #[serde(default)]
    pub status: Status,
    pub due_back: Date,
}

impl BookInstance {
    pub fn due_back_formatted(&self) -> String {
        format_long_date(self.due_back)
    }
}

impl Record for BookInstance {
    const COLLECTION: &'static str = "bookinstances";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

fn book_title(view: &Value) -> Option<&Value> {
    view.get("book").and_then(|book| book.get("title"))
}

#[async_trait]
impl Resource for BookInstance {
    const SINGULAR: &'static str = "bookinstance";
    const PLURAL: &'static str = "bookinstances";
    const LABELS: Labels = Labels {
        list: "Список екземплярів книг",
        detail: "Екземпляр книги",
        create: "Створити екземпляр книги",
        update: "Оновити примірник книги",
        delete: "Видалити примірник книги",
        not_found: "Примірник книги не знайдено",
    };
    const SORT_KEY: &'static str = "book";
    const MISSING_ON_DELETE: MissingPolicy = MissingPolicy::RedirectToList;

    type Form = BookInstanceForm;

    /// Empty status falls back to `Maintenance`, empty due date to today.
    fn from_form(id: RecordId, form: &BookInstanceForm) -> Self {
        Self {
            id,
            book: form.book.clone().unwrap_or_default().into(),
            imprint: form.imprint.clone().unwrap_or_default(),
            status: form.status.parse().unwrap_or_default(),
            due_back: parse_iso_date(&form.due_back).unwrap_or_else(today),
        }
    }

    fn derived(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert(
            "due_back_formatted".into(),
            Value::String(self.due_back_formatted()),
        );
        fields
    }

    /// Copies ordered by the title of the book they belong to.
    async fn list(catalog: &Catalog) -> Result<Vec<Value>, StoreError> {
        let repo = catalog.repo::<BookInstance>();
        let filter = Filter::all();
        let options = FindOptions::default();
        let (instances, (_, books)) = tokio::try_join!(
            repo.find(&filter, &options),
            views_by_id::<Book>(catalog, Book::SORT_KEY),
        )?;

        let mut views: Vec<Value> = instances
            .iter()
            .map(|instance| {
                let mut view = instance.view();
                populate(&mut view, "book", &books);
                view
            })
            .collect();
        views.sort_by(|a, b| match compare_values(book_title(a), book_title(b)) {
            Ordering::Equal => compare_values(a.get("_id"), b.get("_id")),
            other => other,
        });
        Ok(views)
    }

    async fn detail_view(&self, catalog: &Catalog) -> Result<Value, StoreError> {
        let book = catalog.repo::<Book>().get(&self.book).await?;
        let mut view = self.view();
        view["book"] = book.as_ref().map_or(Value::Null, Book::view);
        Ok(view)
    }

    async fn lookups(catalog: &Catalog) -> Result<Map<String, Value>, StoreError> {
        let (books, _) = views_by_id::<Book>(catalog, Book::SORT_KEY).await?;
        let mut lookups = Map::new();
        lookups.insert("book_list".into(), Value::Array(books));
        Ok(lookups)
    }

    async fn check_references(&self, catalog: &Catalog) -> Result<Option<FieldError>, StoreError> {
        if catalog.repo::<Book>().exists(&self.book).await? {
            return Ok(None);
        }
        Ok(Some(FieldError::new(
            "book",
            "Книгу не знайдено",
            self.book.as_str(),
        )))
    }
}
