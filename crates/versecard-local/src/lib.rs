use std::time::Duration;

use versecard_core::{Error, Result};

pub mod genius;
pub mod render;
pub mod scrape;

pub use genius::GeniusClient;
pub use render::{ImageRenderer, RendererConfig};
pub use scrape::LyricScraper;

/// Shared HTTP client with safety defaults: avoid "hang forever" on DNS/TLS
/// or body stalls.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("versecard/0.1")
        .redirect(reqwest::redirect::Policy::limited(10))
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| Error::Fetch(e.to_string()))
}
