//! Rules checked before anything is written to the database.
//!
//! Each field reports at most one message, the first rule it breaks.

use std::{collections::BTreeMap, fmt, hash::Hash};

use garde::Validate;
use serde::Serialize;

use crate::volumes::Volumes;

pub const MAX_TITLE_BYTES: usize = 500;
pub const MIN_YEAR: i32 = 1888;
pub const MAX_GENRES: usize = 5;

/// Context for rules that depend on the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationContext {
    pub current_year: i32,
}

impl ValidationContext {
    pub fn with_year(current_year: i32) -> Self {
        ValidationContext { current_year }
    }
}

impl Default for ValidationContext {
    fn default() -> Self {
        ValidationContext {
            current_year: time::OffsetDateTime::now_utc().year(),
        }
    }
}

fn fail(msg: &'static str) -> garde::Result {
    Err(garde::Error::new(msg))
}

pub(crate) fn title(value: &str, _ctx: &ValidationContext) -> garde::Result {
    if value.is_empty() {
        return fail("must be provided");
    }
    if value.len() > MAX_TITLE_BYTES {
        return fail("must not be more than 500 bytes long");
    }
    Ok(())
}

pub(crate) fn year(value: &i32, ctx: &ValidationContext) -> garde::Result {
    if *value == 0 {
        return fail("must be provided");
    }
    if *value < MIN_YEAR {
        return fail("must be greater than 1888");
    }
    if *value > ctx.current_year {
        return fail("must not be in the future");
    }
    Ok(())
}

pub(crate) fn volumes(value: &Volumes, _ctx: &ValidationContext) -> garde::Result {
    if value.get() == 0 {
        return fail("must be provided");
    }
    if value.get() < 0 {
        return fail("must be a positive integer");
    }
    Ok(())
}

pub(crate) fn genres(value: &[String], _ctx: &ValidationContext) -> garde::Result {
    if value.is_empty() {
        return fail("must contain at least 1 genre");
    }
    if value.len() > MAX_GENRES {
        return fail("must not contain more than 5 genres");
    }
    if !unique(value) {
        return fail("must not contain duplicate values");
    }
    Ok(())
}

pub(crate) fn required_genres(value: &Option<Vec<String>>, ctx: &ValidationContext) -> garde::Result {
    match value {
        Some(values) => genres(values, ctx),
        None => fail("must be provided"),
    }
}

pub fn unique<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = std::collections::HashSet::with_capacity(values.len());
    values.iter().all(|v| seen.insert(v))
}

/// Field name to message of the first failed rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the message only if the field has none yet.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, message) in other.0 {
            self.add(field, message);
        }
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<garde::Report> for ValidationErrors {
    fn from(report: garde::Report) -> Self {
        let mut errors = ValidationErrors::new();
        for (path, error) in report.iter() {
            errors.add(path.to_string(), error.message());
        }
        errors
    }
}

/// Validates against the current clock.
pub fn validate<T>(value: &T) -> Result<(), ValidationErrors>
where
    T: Validate,
    T::Context: Default,
{
    value.validate().map_err(ValidationErrors::from)
}

pub fn validate_with<T>(value: &T, ctx: &T::Context) -> Result<(), ValidationErrors>
where
    T: Validate,
{
    value.validate_with(ctx).map_err(ValidationErrors::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comic::{Comic, CreateComic};

    const YEAR: i32 = 2025;

    fn ctx() -> ValidationContext {
        ValidationContext::with_year(YEAR)
    }

    fn genres_of(names: &[&str]) -> Option<Vec<String>> {
        Some(names.iter().map(|s| s.to_string()).collect())
    }

    fn valid_comic() -> CreateComic {
        CreateComic {
            title: "Akira".to_string(),
            year: 1982,
            volumes: Volumes::new(6),
            genres: genres_of(&["cyberpunk", "action"]),
        }
    }

    #[test]
    fn test_valid_comic() {
        assert_eq!(validate_with(&valid_comic(), &ctx()), Ok(()));
    }

    #[test]
    fn test_missing_year() {
        let comic = CreateComic {
            year: 0,
            ..valid_comic()
        };
        let errors = validate_with(&comic, &ctx()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("year"), Some("must be provided"));
    }

    #[test]
    fn test_year_bounds() {
        let early = CreateComic {
            year: 1887,
            ..valid_comic()
        };
        let errors = validate_with(&early, &ctx()).unwrap_err();
        assert_eq!(errors.get("year"), Some("must be greater than 1888"));

        let this_year = CreateComic {
            year: YEAR,
            ..valid_comic()
        };
        assert!(validate_with(&this_year, &ctx()).is_ok());

        let next_year = CreateComic {
            year: YEAR + 1,
            ..valid_comic()
        };
        let errors = validate_with(&next_year, &ctx()).unwrap_err();
        assert_eq!(errors.get("year"), Some("must not be in the future"));
    }

    #[test]
    fn test_year_against_system_clock() {
        let next_year = time::OffsetDateTime::now_utc().year() + 1;
        let comic = CreateComic {
            year: next_year,
            ..valid_comic()
        };
        let errors = validate(&comic).unwrap_err();
        assert_eq!(errors.get("year"), Some("must not be in the future"));
    }

    #[test]
    fn test_genres_cardinality() {
        let five = CreateComic {
            genres: genres_of(&["a", "b", "c", "d", "e"]),
            ..valid_comic()
        };
        assert!(validate_with(&five, &ctx()).is_ok());

        let six = CreateComic {
            genres: genres_of(&["a", "b", "c", "d", "e", "f"]),
            ..valid_comic()
        };
        let errors = validate_with(&six, &ctx()).unwrap_err();
        assert_eq!(errors.get("genres"), Some("must not contain more than 5 genres"));

        let empty = CreateComic {
            genres: Some(vec![]),
            ..valid_comic()
        };
        let errors = validate_with(&empty, &ctx()).unwrap_err();
        assert_eq!(errors.get("genres"), Some("must contain at least 1 genre"));

        let missing = CreateComic {
            genres: None,
            ..valid_comic()
        };
        let errors = validate_with(&missing, &ctx()).unwrap_err();
        assert_eq!(errors.get("genres"), Some("must be provided"));
    }

    #[test]
    fn test_duplicate_genres() {
        let comic = CreateComic {
            genres: genres_of(&["drama", "drama"]),
            ..valid_comic()
        };
        let errors = validate_with(&comic, &ctx()).unwrap_err();
        assert_eq!(errors.get("genres"), Some("must not contain duplicate values"));

        // case sensitive
        let comic = CreateComic {
            genres: genres_of(&["drama", "Drama"]),
            ..valid_comic()
        };
        assert!(validate_with(&comic, &ctx()).is_ok());
    }

    #[test]
    fn test_first_rule_wins() {
        let comic = CreateComic {
            title: String::new(),
            year: 0,
            volumes: Volumes::new(0),
            genres: None,
        };
        let errors = validate_with(&comic, &ctx()).unwrap_err();
        assert_eq!(errors.len(), 4);
        for field in ["title", "year", "volumes", "genres"] {
            assert_eq!(errors.get(field), Some("must be provided"), "field {field}");
        }
    }

    #[test]
    fn test_title_and_volumes() {
        let long = CreateComic {
            title: "x".repeat(MAX_TITLE_BYTES + 1),
            volumes: Volumes::new(-1),
            ..valid_comic()
        };
        let errors = validate_with(&long, &ctx()).unwrap_err();
        assert_eq!(errors.get("title"), Some("must not be more than 500 bytes long"));
        assert_eq!(errors.get("volumes"), Some("must be a positive integer"));

        // limit is in bytes, not characters
        let multibyte = CreateComic {
            title: "é".repeat(251),
            ..valid_comic()
        };
        assert!(validate_with(&multibyte, &ctx()).is_err());
    }

    #[test]
    fn test_stored_comic_rules() {
        let mut comic = Comic {
            id: 1,
            created_at: time::OffsetDateTime::now_utc(),
            title: "Blacksad".to_string(),
            year: 2000,
            volumes: Volumes::new(7),
            genres: vec!["noir".to_string()],
            version: 1,
        };
        assert!(validate_with(&comic, &ctx()).is_ok());

        comic.genres.clear();
        let errors = validate_with(&comic, &ctx()).unwrap_err();
        assert_eq!(errors.get("genres"), Some("must contain at least 1 genre"));
    }

    #[test]
    fn test_errors_keep_first_message() {
        let mut errors = ValidationErrors::new();
        errors.add("page", "must be an integer value");
        errors.add("page", "must be greater than zero");
        errors.check(false, "sort", "invalid sort value");
        errors.check(true, "page_size", "never added");
        assert_eq!(errors.get("page"), Some("must be an integer value"));
        assert_eq!(errors.get("sort"), Some("invalid sort value"));
        assert_eq!(errors.get("page_size"), None);
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({"page": "must be an integer value", "sort": "invalid sort value"})
        );
    }
}
