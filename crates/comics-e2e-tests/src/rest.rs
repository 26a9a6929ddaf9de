use anyhow::Result;
use comics_dal::Volumes;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::extend_url;

/// Comic as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ComicRecord {
    pub id: i64,
    pub title: String,
    pub year: i32,
    pub volumes: Volumes,
    pub genres: Vec<String>,
    pub version: i32,
}

#[derive(Debug, Deserialize)]
struct ComicEnvelope {
    comic: ComicRecord,
}

pub fn comic_payload(title: &str, year: i32, volumes: i32, genres: &[&str]) -> Value {
    json!({
        "title": title,
        "year": year,
        "volumes": Volumes::new(volumes).to_string(),
        "genres": genres,
    })
}

pub async fn create_comic(
    client: &reqwest::Client,
    api_url: &Url,
    payload: &Value,
) -> Result<ComicRecord> {
    let response = client.post(api_url.clone()).json(payload).send().await?;
    info!("Create response: {:#?}", response);
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let envelope: ComicEnvelope = response.json().await?;
    assert_eq!(
        location.as_deref(),
        Some(format!("/v1/comics/{}", envelope.comic.id).as_str())
    );
    Ok(envelope.comic)
}

pub async fn get_comic(client: &reqwest::Client, api_url: &Url, id: i64) -> Result<ComicRecord> {
    let response = client.get(extend_url(api_url, id)).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    let envelope: ComicEnvelope = response.json().await?;
    Ok(envelope.comic)
}

pub async fn patch_comic(
    client: &reqwest::Client,
    api_url: &Url,
    id: i64,
    expected_version: Option<&str>,
    patch: &Value,
) -> Result<(StatusCode, Value)> {
    let mut request = client.patch(extend_url(api_url, id)).json(patch);
    if let Some(version) = expected_version {
        request = request.header("X-Expected-Version", version);
    }
    let response = request.send().await?;
    let status = response.status();
    let body = response.json().await?;
    Ok((status, body))
}
