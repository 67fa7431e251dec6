//! Genius search API client.
//!
//! `GET <base>/api/search/lyrics?q=...` returns sectioned hits; only the
//! `lyric` section matters here. The same client doubles as the artist image
//! fetcher, since that is a plain bytes-for-url GET.

use serde::Deserialize;
use versecard_core::{Candidate, Error, ImageFetcher, Result, SearchProvider};

const DEFAULT_BASE_URL: &str = "https://genius.com";

#[derive(Debug, Clone)]
pub struct GeniusClient {
    client: reqwest::Client,
    base_url: String,
}

impl GeniusClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL)
    }

    /// Endpoint override for tests and private mirrors.
    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    response: ApiResponse,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    sections: Vec<Section>,
}

#[derive(Debug, Deserialize)]
struct Section {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    result: HitResult,
}

#[derive(Debug, Deserialize)]
struct HitResult {
    id: u64,
    title: String,
    url: String,
    primary_artist: Artist,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
    image_url: String,
}

fn candidates_from_envelope(envelope: ApiEnvelope) -> Vec<Candidate> {
    envelope
        .response
        .sections
        .into_iter()
        .find(|section| section.kind == "lyric")
        .map(|section| {
            section
                .hits
                .into_iter()
                .map(|hit| Candidate {
                    id: hit.result.id,
                    title: hit.result.title,
                    url: hit.result.url,
                    artist_name: hit.result.primary_artist.name,
                    artist_image_url: hit.result.primary_artist.image_url,
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl SearchProvider for GeniusClient {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>> {
        let url = format!("{}/api/search/lyrics", self.base_url);
        let envelope: ApiEnvelope = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Search(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        Ok(candidates_from_envelope(envelope))
    }
}

#[async_trait::async_trait]
impl ImageFetcher for GeniusClient {
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Fetch(e.to_string()))?
            .bytes()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
