use std::{fmt::Display, str::FromStr};

use garde::Validate;
use serde::Serialize;

pub const MAX_PAGE: u32 = 10_000_000;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Sort tokens a comic listing may be ordered by.
pub const COMIC_SORT_SAFELIST: &[&str] = &[
    "id", "title", "year", "volumes", "-id", "-title", "-year", "-volumes",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Id,
    Title,
    Year,
    Volumes,
}

impl SortColumn {
    pub fn column_name(self) -> &'static str {
        match self {
            SortColumn::Id => "id",
            SortColumn::Title => "title",
            SortColumn::Year => "year",
            SortColumn::Volumes => "volumes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Asc => f.write_str("ASC"),
            Direction::Desc => f.write_str("DESC"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub column: SortColumn,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown sort field: {0}")]
pub struct UnknownSortField(pub String);

impl FromStr for SortOrder {
    type Err = UnknownSortField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, direction) = match s.strip_prefix('-') {
            Some(name) => (name, Direction::Desc),
            None => (s, Direction::Asc),
        };
        let column = match name {
            "id" => SortColumn::Id,
            "title" => SortColumn::Title,
            "year" => SortColumn::Year,
            "volumes" => SortColumn::Volumes,
            _ => return Err(UnknownSortField(s.to_string())),
        };
        Ok(SortOrder { column, direction })
    }
}

/// Paging and ordering of a listing.
///
/// `sort_safelist` comes from the calling code, never from the request,
/// and `sort` must match one of its entries exactly.
#[derive(Debug, Clone, Validate)]
pub struct Filters {
    #[garde(custom(page_in_range))]
    pub page: u32,
    #[garde(custom(page_size_in_range))]
    pub page_size: u32,
    #[garde(custom(in_safelist(self.sort_safelist)))]
    pub sort: String,
    #[garde(skip)]
    pub sort_safelist: &'static [&'static str],
}

fn page_in_range(value: &u32, _ctx: &()) -> garde::Result {
    if *value < 1 {
        return Err(garde::Error::new("must be greater than zero"));
    }
    if *value > MAX_PAGE {
        return Err(garde::Error::new("must be a maximum of 10 million"));
    }
    Ok(())
}

fn page_size_in_range(value: &u32, _ctx: &()) -> garde::Result {
    if *value < 1 {
        return Err(garde::Error::new("must be greater than zero"));
    }
    if *value > MAX_PAGE_SIZE {
        return Err(garde::Error::new("must be a maximum of 100"));
    }
    Ok(())
}

fn in_safelist(safelist: &'static [&'static str]) -> impl FnOnce(&String, &()) -> garde::Result {
    move |value: &String, _: &()| {
        if safelist.contains(&value.as_str()) {
            Ok(())
        } else {
            Err(garde::Error::new("invalid sort value"))
        }
    }
}

impl Filters {
    pub fn new(
        page: u32,
        page_size: u32,
        sort: impl Into<String>,
        sort_safelist: &'static [&'static str],
    ) -> Self {
        Filters {
            page,
            page_size,
            sort: sort.into(),
            sort_safelist,
        }
    }

    /// Ordering for a validated filter.
    ///
    /// # Panics
    ///
    /// When `sort` is not in the safelist - callers must validate first.
    pub fn sort_order(&self) -> SortOrder {
        if !self.sort_safelist.contains(&self.sort.as_str()) {
            panic!("unsafe sort parameter: {}", self.sort);
        }
        match self.sort.parse() {
            Ok(order) => order,
            Err(e) => panic!("safelisted sort parameter is not sortable: {e}"),
        }
    }

    pub fn limit(&self) -> i64 {
        self.page_size.into()
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Metadata {
    pub current_page: u32,
    pub page_size: u32,
    pub first_page: u32,
    pub last_page: u32,
    pub total_records: u64,
}

impl Metadata {
    pub fn calculate(total_records: u64, page: u32, page_size: u32) -> Self {
        if total_records == 0 || page_size == 0 {
            return Metadata::default();
        }
        let last_page = total_records.div_ceil(u64::from(page_size));
        Metadata {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: u32::try_from(last_page).unwrap_or(u32::MAX),
            total_records,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Batch<T> {
    pub rows: Vec<T>,
    pub metadata: Metadata,
}
