use async_trait::async_trait;
use locallib_db::{Filter, FindOptions, Record, RecordId, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use super::Book;
use crate::modules::catalog::resource::{Duplicate, Labels, MissingPolicy, Resource};
use crate::modules::catalog::validation::{alphanumeric, EntityForm, FormInput};
use crate::modules::catalog::Catalog;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct GenreForm {
    #[validate(
        length(min = 3, message = "Назва жанру повинна містити щонайменше 3 символи."),
        custom(function = "alphanumeric", message = "Назва жанру містить неалфанумерні символи.")
    )]
    pub name: String,
}

impl EntityForm for GenreForm {
    const FIELDS: &'static [&'static str] = &["name"];

    fn from_input(input: &FormInput) -> Self {
        Self {
            name: input.text("name"),
        }
    }
}

impl Record for Genre {
    const COLLECTION: &'static str = "genres";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

// Genres are deleted without checking for books that still list them.
#[async_trait]
impl Resource for Genre {
    const SINGULAR: &'static str = "genre";
    const PLURAL: &'static str = "genres";
    const LABELS: Labels = Labels {
        list: "Список жанрів",
        detail: "Деталі жанру",
        create: "Створити жанр",
        update: "Оновити жанр",
        delete: "Видалити жанр",
        not_found: "Жанр не знайдено",
    };
    const SORT_KEY: &'static str = "name";
    const MISSING_ON_DELETE: MissingPolicy = MissingPolicy::NotFound;

    type Form = GenreForm;

    fn from_form(id: RecordId, form: &GenreForm) -> Self {
        Self {
            id,
            name: form.name.clone(),
        }
    }

    async fn related(id: &RecordId, catalog: &Catalog) -> Result<Map<String, Value>, StoreError> {
        let books = catalog
            .repo::<Book>()
            .find(&Filter::all().eq("genre", id), &FindOptions::sorted_by("title"))
            .await?;

        let mut related = Map::new();
        related.insert(
            "genre_books".into(),
            Value::Array(books.iter().map(Book::view).collect()),
        );
        Ok(related)
    }

    /// A case-insensitive name match sends the user to the existing genre.
    async fn find_duplicate(&self, catalog: &Catalog) -> Result<Option<Duplicate<Self>>, StoreError> {
        let filter = Filter::all()
            .eq_ignore_case("name", self.name.as_str())
            .not_eq("_id", &self.id);

        Ok(catalog
            .repo::<Self>()
            .find_one(&filter)
            .await?
            .map(Duplicate::Redirect))
    }
}
