use async_trait::async_trait;
use locallib_db::{Filter, FindOptions, Record, RecordId, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use super::{Author, BookInstance, Genre};
use crate::modules::catalog::resource::{
    populate, views_by_id, Dependents, Labels, MissingPolicy, Resource,
};
use crate::modules::catalog::validation::{EntityForm, FieldError, FormInput};
use crate::modules::catalog::Catalog;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub title: String,
    pub author: RecordId,
    pub summary: String,
    pub isbn: String,
    #[serde(default)]
    pub genre: Vec<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct BookForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "Назва не повинна бути порожньою."))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "Автор не повинен бути порожнім."))]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "Опис не повинен бути порожнім."))]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "ISBN не повинен бути порожнім."))]
    pub isbn: Option<String>,
    pub genre: Vec<String>,
}

impl EntityForm for BookForm {
    const FIELDS: &'static [&'static str] = &["title", "author", "summary", "isbn", "genre"];

    fn from_input(input: &FormInput) -> Self {
        Self {
            title: input.optional("title"),
            author: input.optional("author"),
            summary: input.optional("summary"),
            isbn: input.optional("isbn"),
            genre: input.list("genre"),
        }
    }
}

impl Record for Book {
    const COLLECTION: &'static str = "books";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

async fn instances_of(book: &RecordId, catalog: &Catalog) -> Result<Vec<Value>, StoreError> {
    let instances = catalog
        .repo::<BookInstance>()
        .find(&Filter::all().eq("book", book), &FindOptions::default())
        .await?;
    Ok(instances.iter().map(BookInstance::view).collect())
}

#[async_trait]
impl Resource for Book {
    const SINGULAR: &'static str = "book";
    const PLURAL: &'static str = "books";
    const LABELS: Labels = Labels {
        list: "Список книг",
        detail: "Деталі книги",
        create: "Створити книгу",
        update: "Оновити книгу",
        delete: "Видалити книгу",
        not_found: "Книгу не знайдено",
    };
    const SORT_KEY: &'static str = "title";
    const MISSING_ON_DELETE: MissingPolicy = MissingPolicy::RedirectToList;

    type Form = BookForm;

    fn from_form(id: RecordId, form: &BookForm) -> Self {
        Self {
            id,
            title: form.title.clone().unwrap_or_default(),
            author: form.author.clone().unwrap_or_default().into(),
            summary: form.summary.clone().unwrap_or_default(),
            isbn: form.isbn.clone().unwrap_or_default(),
            genre: form.genre.iter().cloned().map(RecordId::from).collect(),
        }
    }

    /// Books by title, each with its author resolved.
    async fn list(catalog: &Catalog) -> Result<Vec<Value>, StoreError> {
        let repo = catalog.repo::<Book>();
        let filter = Filter::all();
        let options = FindOptions::sorted_by(Self::SORT_KEY);
        let (books, (_, authors)) = tokio::try_join!(
            repo.find(&filter, &options),
            views_by_id::<Author>(catalog, Author::SORT_KEY),
        )?;

        Ok(books
            .iter()
            .map(|book| {
                let mut view = book.view();
                populate(&mut view, "author", &authors);
                view
            })
            .collect())
    }

    async fn detail_view(&self, catalog: &Catalog) -> Result<Value, StoreError> {
        let authors = catalog.repo::<Author>();
        let genres = catalog.repo::<Genre>();
        let genre_filter = Filter::all();
        let genre_options = FindOptions::sorted_by(Genre::SORT_KEY);
        let (author, genres) = tokio::try_join!(
            authors.get(&self.author),
            genres.find(&genre_filter, &genre_options),
        )?;

        let mut view = self.view();
        view["author"] = author.as_ref().map_or(Value::Null, Author::view);
        view["genre"] = Value::Array(
            genres
                .iter()
                .filter(|genre| self.genre.contains(&genre.id))
                .map(Genre::view)
                .collect(),
        );
        Ok(view)
    }

    async fn related(id: &RecordId, catalog: &Catalog) -> Result<Map<String, Value>, StoreError> {
        let mut related = Map::new();
        related.insert("book_instances".into(), Value::Array(instances_of(id, catalog).await?));
        Ok(related)
    }

    async fn lookups(catalog: &Catalog) -> Result<Map<String, Value>, StoreError> {
        let ((authors, _), (genres, _)) = tokio::try_join!(
            views_by_id::<Author>(catalog, Author::SORT_KEY),
            views_by_id::<Genre>(catalog, Genre::SORT_KEY),
        )?;

        let mut lookups = Map::new();
        lookups.insert("authors".into(), Value::Array(authors));
        lookups.insert("genres".into(), Value::Array(genres));
        Ok(lookups)
    }

    async fn check_references(&self, catalog: &Catalog) -> Result<Option<FieldError>, StoreError> {
        if !catalog.repo::<Author>().exists(&self.author).await? {
            return Ok(Some(FieldError::new(
                "author",
                "Автора не знайдено",
                self.author.as_str(),
            )));
        }

        let genres = catalog.repo::<Genre>();
        for genre in &self.genre {
            if !genres.exists(genre).await? {
                return Ok(Some(FieldError::new("genre", "Жанр не знайдено", genre.as_str())));
            }
        }

        Ok(None)
    }

    async fn dependents(id: &RecordId, catalog: &Catalog) -> Result<Option<Dependents>, StoreError> {
        Ok(Some(Dependents {
            key: "book_instances",
            records: instances_of(id, catalog).await?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::catalog::validation::validate;

    #[test]
    fn from_form_keeps_every_genre() {
        let validated = validate::<BookForm>(&FormInput::from_pairs([
            ("title", "Kobzar"),
            ("author", "a1"),
            ("summary", "Poems"),
            ("isbn", "978-966"),
            ("genre", "g1"),
            ("genre", "g2"),
        ]));
        assert!(validated.is_valid());

        let book = Book::from_form(RecordId::from("b1"), &validated.form);
        assert_eq!(book.genre, vec![RecordId::from("g1"), RecordId::from("g2")]);
        assert_eq!(book.author, RecordId::from("a1"));
        assert_eq!(book.url(), "/catalog/book/b1");
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let validated = validate::<BookForm>(&FormInput::from_pairs([("title", "Kobzar")]));
        let fields: Vec<&str> = validated.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["author", "summary", "isbn"]);
    }
}
