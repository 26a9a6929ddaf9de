use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequestParts, Path, Query, State,
    },
    response::IntoResponse,
    routing::{get, post},
    Json,
};
use comics_dal::{
    comic::{Comic, ComicRepository, CreateComic, UpdateComic},
    filters::COMIC_SORT_SAFELIST,
    validation::validate,
    Filters, Metadata, ValidationErrors,
};
use http::{header, request::Parts, HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    auth::{RequiredPermissionLayer, COMICS_READ, COMICS_WRITE},
    error::{ApiError, ApiResult},
    repository_from_request,
    state::AppState,
    validate::Valid,
};

use super::paging::{parse_csv, parse_filters};

/// Client's idea of the current version, checked before a patch is applied.
pub const EXPECTED_VERSION_HEADER: &str = "x-expected-version";

repository_from_request!(ComicRepository);

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct ListQuery {
    /// Words that must all occur in the title
    pub title: Option<String>,
    /// Comma separated genres that must all be present
    pub genres: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    /// One of id, title, year, volumes, optionally prefixed by `-`
    pub sort: Option<String>,
}

#[derive(Debug)]
pub struct ComicSearch {
    pub title: String,
    pub genres: Vec<String>,
    pub filters: Filters,
}

impl ListQuery {
    pub fn into_search(self, default_page_size: u32) -> Result<ComicSearch, ValidationErrors> {
        let filters = parse_filters(
            self.page.as_deref(),
            self.page_size.as_deref(),
            self.sort.as_deref(),
            default_page_size,
            COMIC_SORT_SAFELIST,
        )?;
        Ok(ComicSearch {
            title: self.title.unwrap_or_default(),
            genres: parse_csv(self.genres.as_deref()),
            filters,
        })
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComicList {
    pub metadata: Metadata,
    pub comics: Vec<Comic>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComicEnvelope {
    pub comic: Comic,
}

/// Record id from the path, anything but a positive integer is not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdParam(pub i64);

impl FromRequestParts<AppState> for IdParam {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::ResourceNotFound)?;
        match raw.parse::<i64>() {
            Ok(id) if id >= 1 => Ok(IdParam(id)),
            _ => Err(ApiError::ResourceNotFound),
        }
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "", tag = "Comic", operation_id = "listComic",
    params(ListQuery),
    responses((status = StatusCode::OK, description = "Page of comics", body = ComicList))))]
pub async fn list(
    repository: ComicRepository,
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let search = query.into_search(state.config().default_page_size)?;
    let batch = repository
        .list(&search.title, &search.genres, &search.filters)
        .await?;
    Ok((
        StatusCode::OK,
        Json(ComicList {
            metadata: batch.metadata,
            comics: batch.rows,
        }),
    ))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "", tag = "Comic", operation_id = "createComic",
    request_body = CreateComic,
    responses((status = StatusCode::CREATED, description = "Created comic", body = ComicEnvelope))))]
pub async fn create(
    repository: ComicRepository,
    Valid(Json(payload)): Valid<Json<CreateComic>>,
) -> ApiResult<impl IntoResponse> {
    let comic = repository.create(payload).await?;
    let location = format!("/v1/comics/{}", comic.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(ComicEnvelope { comic }),
    ))
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/{id}", tag = "Comic", operation_id = "getComic",
    params(("id" = i64, Path, description = "Comic id")),
    responses((status = StatusCode::OK, description = "Get one", body = ComicEnvelope))))]
pub async fn get_comic(
    IdParam(id): IdParam,
    repository: ComicRepository,
) -> ApiResult<impl IntoResponse> {
    let comic = repository.get(id).await?;

    Ok((StatusCode::OK, Json(ComicEnvelope { comic })))
}

#[cfg_attr(feature = "openapi", utoipa::path(patch, path = "/{id}", tag = "Comic", operation_id = "updateComic",
    request_body = UpdateComic,
    params(
        ("id" = i64, Path, description = "Comic id"),
        ("X-Expected-Version" = Option<String>, Header, description = "Current version known to the client")
    ),
    responses((status = StatusCode::OK, description = "Updated comic", body = ComicEnvelope))))]
pub async fn update(
    IdParam(id): IdParam,
    repository: ComicRepository,
    headers: HeaderMap,
    payload: Result<Json<UpdateComic>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let mut comic = repository.get(id).await?;

    if let Some(expected) = headers.get(EXPECTED_VERSION_HEADER) {
        if !expected.is_empty() && expected.as_bytes() != comic.version.to_string().as_bytes() {
            debug!(
                "Comic {id} is at version {}, client expected {expected:?}",
                comic.version
            );
            return Err(ApiError::EditConflict);
        }
    }

    let Json(patch) = payload?;
    patch.apply_to(&mut comic);
    validate(&comic)?;

    repository.update(&mut comic).await?;

    Ok((StatusCode::OK, Json(ComicEnvelope { comic })))
}

#[cfg_attr(feature = "openapi", utoipa::path(delete, path = "/{id}", tag = "Comic", operation_id = "deleteComic",
    params(("id" = i64, Path, description = "Comic id")),
    responses((status = StatusCode::NO_CONTENT, description = "Deleted"))))]
pub async fn delete(
    IdParam(id): IdParam,
    repository: ComicRepository,
) -> ApiResult<impl IntoResponse> {
    repository.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> axum::Router<AppState> {
    let read = RequiredPermissionLayer::new(COMICS_READ);
    let write = RequiredPermissionLayer::new(COMICS_WRITE);
    axum::Router::new()
        .route(
            "/",
            get(list)
                .route_layer(read)
                .merge(post(create).route_layer(write)),
        )
        .route(
            "/{id}",
            get(get_comic)
                .route_layer(read)
                .merge(axum::routing::patch(update).delete(delete).route_layer(write)),
        )
}

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;
    #[derive(utoipa::OpenApi)]
    #[openapi(paths(list, create, get_comic, update, delete))]
    struct ApiDocs;
    ApiDocs::openapi()
}
