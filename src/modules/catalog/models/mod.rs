//! Catalog entities and their derived (render-time) fields.

mod author;
mod book;
mod book_instance;
mod genre;

pub use author::Author;
pub use book::Book;
pub use book_instance::{BookInstance, Status};
pub use genre::Genre;

use time::Date;

/// Placeholder shown for an unknown date.
pub const NO_DATE: &str = "н/д";

const MONTHS_GENITIVE: [&str; 12] = [
    "січня",
    "лютого",
    "березня",
    "квітня",
    "травня",
    "червня",
    "липня",
    "серпня",
    "вересня",
    "жовтня",
    "листопада",
    "грудня",
];

/// Long Ukrainian date, e.g. `9 вересня 1828 року`.
pub fn format_long_date(date: Date) -> String {
    let month = MONTHS_GENITIVE[usize::from(u8::from(date.month())) - 1];
    format!("{} {} {} року", date.day(), month, date.year())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn long_date_uses_genitive_month() {
        assert_eq!(format_long_date(date!(1828 - 09 - 09)), "9 вересня 1828 року");
        assert_eq!(format_long_date(date!(2024 - 01 - 31)), "31 січня 2024 року");
        assert_eq!(format_long_date(date!(1999 - 12 - 01)), "1 грудня 1999 року");
    }
}
