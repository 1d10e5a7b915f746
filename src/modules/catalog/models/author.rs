use async_trait::async_trait;
use locallib_db::{Filter, FindOptions, Record, RecordId, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::Date;
use validator::Validate;

use super::{format_long_date, Book, NO_DATE};
use crate::modules::catalog::resource::{Dependents, Duplicate, Labels, MissingPolicy, Resource};
use crate::modules::catalog::validation::{
    iso_date_or_empty, parse_iso_date, EntityForm, FieldError, FormInput,
};
use crate::modules::catalog::Catalog;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub first_name: String,
    pub family_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_death: Option<Date>,
}

impl Author {
    /// `family_name, first_name`, or empty when either part is missing.
    pub fn name(&self) -> String {
        if self.first_name.is_empty() || self.family_name.is_empty() {
            return String::new();
        }
        format!("{}, {}", self.family_name, self.first_name)
    }

    pub fn lifespan(&self) -> String {
        let show = |date: Option<Date>| date.map_or_else(|| NO_DATE.to_string(), format_long_date);
        format!("{} - {}", show(self.date_of_birth), show(self.date_of_death))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct AuthorForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        required(message = "Ім’я не повинно бути порожнім."),
        length(max = 100, message = "Ім’я занадто довге (макс. 100 символів).")
    )]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        required(message = "Прізвище не повинно бути порожнім."),
        length(max = 100, message = "Прізвище занадто довге (макс. 100 символів).")
    )]
    pub family_name: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    #[validate(custom(function = "iso_date_or_empty", message = "Недійсна дата народження"))]
    pub date_of_birth: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    #[validate(custom(function = "iso_date_or_empty", message = "Недійсна дата смерті"))]
    pub date_of_death: String,
}

impl EntityForm for AuthorForm {
    const FIELDS: &'static [&'static str] =
        &["first_name", "family_name", "date_of_birth", "date_of_death"];

    fn from_input(input: &FormInput) -> Self {
        Self {
            first_name: input.optional("first_name"),
            family_name: input.optional("family_name"),
            date_of_birth: input.text("date_of_birth"),
            date_of_death: input.text("date_of_death"),
        }
    }
}

impl Record for Author {
    const COLLECTION: &'static str = "authors";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

async fn books_by(author: &RecordId, catalog: &Catalog) -> Result<Vec<Value>, StoreError> {
    let books = catalog
        .repo::<Book>()
        .find(
            &Filter::all().eq("author", author),
            &FindOptions::sorted_by("title"),
        )
        .await?;
    Ok(books.iter().map(Book::view).collect())
}

#[async_trait]
impl Resource for Author {
    const SINGULAR: &'static str = "author";
    const PLURAL: &'static str = "authors";
    const LABELS: Labels = Labels {
        list: "Список авторів",
        detail: "Деталі автора",
        create: "Створити автора",
        update: "Оновити автора",
        delete: "Видалити автора",
        not_found: "Автора не знайдено",
    };
    const SORT_KEY: &'static str = "family_name";
    const MISSING_ON_DELETE: MissingPolicy = MissingPolicy::RedirectToList;

    type Form = AuthorForm;

    fn from_form(id: RecordId, form: &AuthorForm) -> Self {
        Self {
            id,
            first_name: form.first_name.clone().unwrap_or_default(),
            family_name: form.family_name.clone().unwrap_or_default(),
            date_of_birth: parse_iso_date(&form.date_of_birth),
            date_of_death: parse_iso_date(&form.date_of_death),
        }
    }

    fn derived(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("name".into(), Value::String(self.name()));
        fields.insert("lifespan".into(), Value::String(self.lifespan()));
        fields
    }

    async fn related(id: &RecordId, catalog: &Catalog) -> Result<Map<String, Value>, StoreError> {
        let mut related = Map::new();
        related.insert("author_books".into(), Value::Array(books_by(id, catalog).await?));
        Ok(related)
    }

    /// Same first and family name, ignoring case, is refused.
    async fn find_duplicate(&self, catalog: &Catalog) -> Result<Option<Duplicate<Self>>, StoreError> {
        let filter = Filter::all()
            .eq_ignore_case("first_name", self.first_name.as_str())
            .eq_ignore_case("family_name", self.family_name.as_str())
            .not_eq("_id", &self.id);

        let existing = catalog.repo::<Self>().find_one(&filter).await?;
        Ok(existing.map(|existing| {
            Duplicate::Reject(FieldError::new(
                "author",
                "Автор з таким ім’ям і прізвищем уже існує",
                existing.name(),
            ))
        }))
    }

    async fn dependents(id: &RecordId, catalog: &Catalog) -> Result<Option<Dependents>, StoreError> {
        Ok(Some(Dependents {
            key: "author_books",
            records: books_by(id, catalog).await?,
        }))
    }
}
