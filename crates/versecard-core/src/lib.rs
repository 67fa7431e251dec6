use serde::{Deserialize, Serialize};

pub mod cache;
pub mod compose;
pub mod layout;
pub mod matcher;
pub mod normalize;
pub mod window;

pub use cache::{Namespace, TtlCache};
pub use compose::{
    CacheValue, CardRenderer, CardRequest, Composed, ImageFetcher, LyricSource, Pipeline,
    SearchProvider, Surface,
};
pub use layout::{FontKind, TextMeasure, Wrapped};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid query")]
    InvalidQuery,
    #[error("no candidate at requested page")]
    NoCandidate,
    #[error("search failed: {0}")]
    Search(String),
    #[error("scrape failed: {0}")]
    Scrape(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("render failed: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// One search result: enough to page through hits, scrape the full text, and
/// caption the card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: u64,
    pub title: String,
    pub url: String,
    pub artist_name: String,
    pub artist_image_url: String,
}

/// Raw scraped page data, line-delimited and untouched. Cleaning happens at
/// compose time so cached entries stay faithful to the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedLyrics {
    pub lines: Vec<String>,
    pub video_link: Option<String>,
}
