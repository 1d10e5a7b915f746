//! Catalog dashboard counts.

use axum::{extract::State, response::Response};
use locallib_db::{Filter, StoreError};
use locallib_http::{AppError, Page};
use serde::Serialize;

use super::models::{Author, Book, BookInstance, Genre, Status};
use super::Catalog;

pub const INDEX_TITLE: &str = "Місцева бібліотека";

/// Record counts taken at one moment. Recomputed on every request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub book_count: u64,
    pub book_instance_count: u64,
    pub book_instance_available_count: u64,
    pub author_count: u64,
    pub genre_count: u64,
}

/// Run the five counts concurrently.
pub async fn collect(catalog: &Catalog) -> Result<CatalogStats, StoreError> {
    let books = catalog.repo::<Book>();
    let instances = catalog.repo::<BookInstance>();
    let authors = catalog.repo::<Author>();
    let genres = catalog.repo::<Genre>();
    let all = Filter::all();
    let available = Filter::all().eq("status", Status::Available.as_str());

    let (book_count, book_instance_count, book_instance_available_count, author_count, genre_count) =
        tokio::try_join!(
            books.count(&all),
            instances.count(&all),
            instances.count(&available),
            authors.count(&all),
            genres.count(&all),
        )?;

    Ok(CatalogStats {
        book_count,
        book_instance_count,
        book_instance_available_count,
        author_count,
        genre_count,
    })
}

pub async fn index(State(catalog): State<Catalog>) -> Result<Response, AppError> {
    let stats = collect(&catalog).await?;
    tracing::debug!(?stats, "catalog counts collected");

    Ok(catalog.render(
        Page::new("index")
            .with("title", INDEX_TITLE)
            .with("book_count", stats.book_count)
            .with("book_instance_count", stats.book_instance_count)
            .with("book_instance_available_count", stats.book_instance_available_count)
            .with("author_count", stats.author_count)
            .with("genre_count", stats.genre_count),
    ))
}
