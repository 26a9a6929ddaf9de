//! Search statement for comic listings.
//!
//! Request values are only ever bound as parameters. The ORDER BY clause is
//! rendered from [`SortOrder`], which exists only for safelisted tokens.

use sqlx::{QueryBuilder, types::Json};

use crate::{ChosenDB, filters::Filters};

/// Columns of a search row, `total_records` is the size of the whole filtered set.
const SEARCH_SELECT: &str = "SELECT count(*) OVER() AS total_records, \
c.id, c.created_at, c.title, c.year, c.volumes, c.genres, c.version FROM comics c WHERE 1 = 1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleMatch {
    Any,
    /// FTS5 expression requiring every term
    Terms(String),
    /// Title given but it has no searchable words
    Nothing,
}

impl TitleMatch {
    pub fn new(title: &str) -> Self {
        if title.is_empty() {
            return TitleMatch::Any;
        }
        let terms = title
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| format!("\"{t}\""))
            .collect::<Vec<_>>();
        if terms.is_empty() {
            TitleMatch::Nothing
        } else {
            TitleMatch::Terms(terms.join(" "))
        }
    }
}

pub fn search_query<'a>(
    title: &str,
    genres: &[String],
    filters: &Filters,
) -> QueryBuilder<'a, ChosenDB> {
    let order = filters.sort_order();
    let mut query = QueryBuilder::new(SEARCH_SELECT);

    match TitleMatch::new(title) {
        TitleMatch::Any => {}
        TitleMatch::Terms(terms) => {
            query
                .push(" AND c.id IN (SELECT rowid FROM comics_fts WHERE comics_fts MATCH ")
                .push_bind(terms)
                .push(")");
        }
        TitleMatch::Nothing => {
            query.push(" AND 0");
        }
    }

    if !genres.is_empty() {
        // every requested genre must be among the stored ones
        query
            .push(" AND NOT EXISTS (SELECT 1 FROM json_each(")
            .push_bind(Json(genres.to_vec()))
            .push(") AS wanted WHERE wanted.value NOT IN (SELECT have.value FROM json_each(c.genres) AS have))");
    }

    query
        .push(" ORDER BY c.")
        .push(order.column.column_name())
        .push(" ")
        .push(order.direction)
        .push(", c.id ASC LIMIT ")
        .push_bind(filters.limit())
        .push(" OFFSET ")
        .push_bind(filters.offset());

    query
}
