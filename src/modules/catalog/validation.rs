//! Form input and validation.
//!
//! Every entity declares a form struct deriving [`Validate`]. [`validate`]
//! builds that form from the raw submission (trimming every value) and
//! flattens all failing checks into [`FieldError`]s, ordered by the form's
//! declared fields, so a form comes back with all of its problems at once.

use std::collections::BTreeMap;

use serde::Serialize;
use time::{
    format_description::well_known::{Iso8601, Rfc3339},
    macros::format_description,
    Date, OffsetDateTime, PrimitiveDateTime,
};
use validator::{Validate, ValidationError, ValidationErrors};

/// Raw submitted form: every key with all of its values, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormInput {
    values: BTreeMap<String, Vec<String>>,
}

impl FormInput {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in pairs {
            values.entry(key.into()).or_default().push(value.into());
        }
        Self { values }
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// Trimmed first value, empty when absent.
    pub fn text(&self, key: &str) -> String {
        self.first(key).unwrap_or_default().trim().to_string()
    }

    /// Trimmed first value; `None` when absent or blank.
    pub fn optional(&self, key: &str) -> Option<String> {
        Some(self.text(key)).filter(|value| !value.is_empty())
    }

    /// Every non-blank value, trimmed (e.g. a checkbox group).
    pub fn list(&self, key: &str) -> Vec<String> {
        self.values
            .get(key)
            .map(|values| {
                values
                    .iter()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One field-level problem, shaped for re-display next to the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub msg: String,
    pub value: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, msg: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            msg: msg.into(),
            value: value.into(),
        }
    }
}

/// A form struct an entity is created from.
pub trait EntityForm: Validate + Serialize + Send + Sync + Sized {
    /// Accepted fields, in the order their errors are reported.
    const FIELDS: &'static [&'static str];

    /// Read the declared fields; undeclared ones are dropped.
    fn from_input(input: &FormInput) -> Self;
}

/// The built form plus every error found in it.
#[derive(Debug, Clone)]
pub struct Validated<F> {
    pub form: F,
    pub errors: Vec<FieldError>,
}

impl<F> Validated<F> {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn validate<F: EntityForm>(input: &FormInput) -> Validated<F> {
    let form = F::from_input(input);
    let errors = match form.validate() {
        Ok(()) => Vec::new(),
        Err(failures) => flatten::<F>(&failures, input),
    };
    Validated { form, errors }
}

fn flatten<F: EntityForm>(failures: &ValidationErrors, input: &FormInput) -> Vec<FieldError> {
    let by_field = failures.field_errors();
    let mut errors = Vec::new();
    for field in F::FIELDS {
        let Some(failed) = by_field.get(*field) else {
            continue;
        };
        for error in failed.iter() {
            let msg = error
                .message
                .as_ref()
                .map_or_else(|| error.code.to_string(), |m| m.to_string());
            errors.push(FieldError::new(*field, msg, input.text(field)));
        }
    }
    errors
}

/// Letters of any script and ASCII digits. Numeric symbols such as `½` or
/// `Ⅻ` are refused.
pub fn alphanumeric(value: &str) -> Result<(), ValidationError> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || (c.is_alphabetic() && !c.is_numeric()));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("alphanumeric"))
    }
}

/// An ISO-8601 date or date-time; an empty value means "no date".
pub fn iso_date_or_empty(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || parse_iso_date(value).is_some() {
        Ok(())
    } else {
        Err(ValidationError::new("iso_date"))
    }
}

/// Calendar date of an ISO-8601 value: a date (extended or basic) or a
/// date-time with or without offset.
pub fn parse_iso_date(value: &str) -> Option<Date> {
    let value = value.trim();
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .or_else(|| OffsetDateTime::parse(value, &Rfc3339).ok().map(|dt| dt.date()))
        .or_else(|| OffsetDateTime::parse(value, &Iso8601::DEFAULT).ok().map(|dt| dt.date()))
        .or_else(|| PrimitiveDateTime::parse(value, &Iso8601::DEFAULT).ok().map(|dt| dt.date()))
        .or_else(|| Date::parse(value, &Iso8601::DEFAULT).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[derive(Debug, Serialize, Validate)]
    struct SampleForm {
        #[validate(
            length(min = 3, message = "too short"),
            custom(function = "alphanumeric", message = "not alphanumeric")
        )]
        name: String,
        #[validate(required(message = "required"), length(max = 5, message = "too long"))]
        title: Option<String>,
        #[validate(custom(function = "iso_date_or_empty", message = "bad date"))]
        born: String,
        tags: Vec<String>,
    }

    impl EntityForm for SampleForm {
        const FIELDS: &'static [&'static str] = &["name", "title", "born", "tags"];

        fn from_input(input: &FormInput) -> Self {
            Self {
                name: input.text("name"),
                title: input.optional("title"),
                born: input.text("born"),
                tags: input.list("tags"),
            }
        }
    }

    fn form(pairs: &[(&str, &str)]) -> FormInput {
        FormInput::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn trims_and_keeps_declared_fields_only() {
        let validated = validate::<SampleForm>(&form(&[
            ("name", "  Poetry "),
            ("title", " Odes "),
            ("unknown", "ignored"),
        ]));

        assert!(validated.is_valid(), "{:?}", validated.errors);
        assert_eq!(validated.form.name, "Poetry");
        assert_eq!(validated.form.title.as_deref(), Some("Odes"));
    }

    #[test]
    fn collects_every_error_in_field_order() {
        let validated = validate::<SampleForm>(&form(&[
            ("born", "yesterday"),
            ("title", "Ballads"),
            ("name", "a!"),
        ]));

        let fields: Vec<&str> = validated.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "name", "title", "born"]);
        let name_msgs: Vec<&str> = validated.errors[..2].iter().map(|e| e.msg.as_str()).collect();
        assert!(name_msgs.contains(&"too short"));
        assert!(name_msgs.contains(&"not alphanumeric"));
        assert_eq!(validated.errors[3].value, "yesterday");
    }

    #[test]
    fn missing_required_field_is_reported() {
        let validated = validate::<SampleForm>(&form(&[("name", "Drama"), ("title", "   ")]));
        assert_eq!(validated.errors.len(), 1);
        assert_eq!(validated.errors[0].field, "title");
        assert_eq!(validated.errors[0].msg, "required");
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let validated = validate::<SampleForm>(&form(&[("name", "ґєї"), ("title", "ґєїіа")]));
        assert!(validated.is_valid(), "{:?}", validated.errors);
    }

    #[test]
    fn many_keeps_all_non_blank_values() {
        let input = form(&[("tags", "a"), ("tags", " "), ("tags", "b ")]);
        assert_eq!(input.list("tags"), vec!["a", "b"]);
        assert_eq!(input.optional("missing"), None);
    }

    #[test]
    fn iso_date_forms() {
        assert_eq!(parse_iso_date("2024-02-29"), Some(date!(2024 - 02 - 29)));
        assert_eq!(parse_iso_date("2024-02-29T23:10:00Z"), Some(date!(2024 - 02 - 29)));
        assert_eq!(parse_iso_date("2024-05-01T10:00:00.000Z"), Some(date!(2024 - 05 - 01)));
        assert_eq!(parse_iso_date("2024-05-01T10:00:00"), Some(date!(2024 - 05 - 01)));
        assert_eq!(parse_iso_date("2024-05-01T10:00"), Some(date!(2024 - 05 - 01)));
        assert_eq!(parse_iso_date("20240501"), Some(date!(2024 - 05 - 01)));
        assert_eq!(parse_iso_date("2023-02-29"), None);
        assert_eq!(parse_iso_date("29.02.2024"), None);
        assert_eq!(parse_iso_date(""), None);
    }

    #[test]
    fn empty_date_is_allowed() {
        assert!(iso_date_or_empty("").is_ok());
        assert!(iso_date_or_empty("2024-05-01T10:00").is_ok());
        assert!(iso_date_or_empty("soon").is_err());
    }

    #[test]
    fn letters_of_any_script_and_ascii_digits_are_alphanumeric() {
        assert!(alphanumeric("Фентезі").is_ok());
        assert!(alphanumeric("Poetry2").is_ok());
        for refused in ["½½½", "²³⁴", "ⅫⅫⅫ", "Science Fiction", "Sci-Fi", ""] {
            assert!(alphanumeric(refused).is_err(), "{refused:?}");
        }
    }
}
