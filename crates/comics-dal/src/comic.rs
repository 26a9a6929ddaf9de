use std::{future::Future, time::Duration};

use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Pool, Row as _, types::Json};
use time::OffsetDateTime;
use tracing::debug;

use crate::{
    ChosenRow, DEFAULT_TIMEOUT, Error,
    error::Result,
    filters::{Batch, Filters, Metadata},
    query::search_query,
    validation::{self, ValidationContext},
    volumes::Volumes,
};

#[derive(Debug, Serialize, Clone, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[garde(context(ValidationContext))]
pub struct Comic {
    #[garde(skip)]
    pub id: i64,
    #[serde(skip_serializing)]
    #[garde(skip)]
    pub created_at: OffsetDateTime,
    #[garde(custom(validation::title))]
    pub title: String,
    #[garde(custom(validation::year))]
    pub year: i32,
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "12 Volumes"))]
    #[garde(custom(validation::volumes))]
    pub volumes: Volumes,
    #[garde(custom(validation::genres))]
    pub genres: Vec<String>,
    #[garde(skip)]
    pub version: i32,
}

impl FromRow<'_, ChosenRow> for Comic {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        let Json(genres) = row.try_get::<Json<Vec<String>>, _>("genres")?;
        Ok(Comic {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            title: row.try_get("title")?,
            year: row.try_get("year")?,
            volumes: row.try_get("volumes")?,
            genres,
            version: row.try_get("version")?,
        })
    }
}

/// Row of a search, carries size of the whole filtered set.
struct SearchRow {
    total_records: i64,
    comic: Comic,
}

impl FromRow<'_, ChosenRow> for SearchRow {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        Ok(SearchRow {
            total_records: row.try_get("total_records")?,
            comic: Comic::from_row(row)?,
        })
    }
}

/// New comic as sent by a client.
///
/// Missing fields get their "not provided" value, so validation can report them.
#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[garde(context(ValidationContext))]
pub struct CreateComic {
    #[serde(default)]
    #[garde(custom(validation::title))]
    pub title: String,
    #[serde(default)]
    #[garde(custom(validation::year))]
    pub year: i32,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "12 Volumes"))]
    #[garde(custom(validation::volumes))]
    pub volumes: Volumes,
    #[serde(default)]
    #[garde(custom(validation::required_genres))]
    pub genres: Option<Vec<String>>,
}

/// Partial change of a comic, absent fields are left as they are.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateComic {
    pub title: Option<String>,
    pub year: Option<i32>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, example = "12 Volumes"))]
    pub volumes: Option<Volumes>,
    pub genres: Option<Vec<String>>,
}

impl UpdateComic {
    pub fn apply_to(self, comic: &mut Comic) {
        if let Some(title) = self.title {
            comic.title = title;
        }
        if let Some(year) = self.year {
            comic.year = year;
        }
        if let Some(volumes) = self.volumes {
            comic.volumes = volumes;
        }
        if let Some(genres) = self.genres {
            comic.genres = genres;
        }
    }
}

pub type ComicRepository = ComicRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct ComicRepositoryImpl<E> {
    executor: E,
    timeout: Duration,
}

impl<'c, E> ComicRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, operation).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                debug!("Database operation exceeded {:?}", self.timeout);
                Err(Error::Timeout(self.timeout))
            }
        }
    }

    pub async fn create(&self, payload: CreateComic) -> Result<Comic> {
        let genres = payload.genres.unwrap_or_default();
        let (id, created_at, version): (i64, OffsetDateTime, i32) = self
            .bounded(
                sqlx::query_as(
                    "INSERT INTO comics (title, year, volumes, genres, version) VALUES (?, ?, ?, ?, 1) \
                     RETURNING id, created_at, version",
                )
                .bind(&payload.title)
                .bind(payload.year)
                .bind(payload.volumes)
                .bind(Json(&genres))
                .fetch_one(&self.executor),
            )
            .await?;
        debug!("Created comic {id}");

        Ok(Comic {
            id,
            created_at,
            title: payload.title,
            year: payload.year,
            volumes: payload.volumes,
            genres,
            version,
        })
    }

    pub async fn get(&self, id: i64) -> Result<Comic> {
        if id < 1 {
            return Err(Error::RecordNotFound("Comic".to_string()));
        }
        self.bounded(
            sqlx::query_as::<_, Comic>(
                "SELECT id, created_at, title, year, volumes, genres, version FROM comics WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&self.executor),
        )
        .await?
        .ok_or_else(|| Error::RecordNotFound("Comic".to_string()))
    }

    /// Page of comics matching all words of `title` and containing all `genres`.
    ///
    /// `filters` must be validated, an unknown sort token panics.
    pub async fn list(
        &self,
        title: &str,
        genres: &[String],
        filters: &Filters,
    ) -> Result<Batch<Comic>> {
        let mut query = search_query(title, genres, filters);
        let rows = self
            .bounded(query.build_query_as::<SearchRow>().fetch_all(&self.executor))
            .await?;

        let total = rows
            .first()
            .map(|r| u64::try_from(r.total_records).unwrap_or_default())
            .unwrap_or_default();
        Ok(Batch {
            rows: rows.into_iter().map(|r| r.comic).collect(),
            metadata: Metadata::calculate(total, filters.page, filters.page_size),
        })
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = self
            .bounded(sqlx::query_scalar("SELECT count(*) FROM comics").fetch_one(&self.executor))
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Writes `comic` if its version is still the stored one.
    ///
    /// A missing record is also reported as [`Error::EditConflict`].
    pub async fn update(&self, comic: &mut Comic) -> Result<()> {
        let version: Option<i32> = self
            .bounded(
                sqlx::query_scalar(
                    "UPDATE comics SET title = ?, year = ?, volumes = ?, genres = ?, version = version + 1 \
                     WHERE id = ? AND version = ? RETURNING version",
                )
                .bind(&comic.title)
                .bind(comic.year)
                .bind(comic.volumes)
                .bind(Json(&comic.genres))
                .bind(comic.id)
                .bind(comic.version)
                .fetch_optional(&self.executor),
            )
            .await?;

        match version {
            Some(version) => {
                comic.version = version;
                Ok(())
            }
            None => {
                debug!("No comic {} with version {}", comic.id, comic.version);
                Err(Error::EditConflict {
                    id: comic.id,
                    version: comic.version,
                })
            }
        }
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if id < 1 {
            return Err(Error::RecordNotFound("Comic".to_string()));
        }
        let res = self
            .bounded(
                sqlx::query("DELETE FROM comics WHERE id = ?")
                    .bind(id)
                    .execute(&self.executor),
            )
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Comic".to_string()))
        } else {
            Ok(())
        }
    }
}
