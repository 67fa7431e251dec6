//! Lyrics page scraping.
//!
//! The lyrics container occasionally comes back blank from the upstream (a
//! placeholder page), so the fetch reattempts a fixed number of times before
//! giving up. Parsing is split out as a pure function so it can be tested
//! without a network.

use scraper::{Html, Selector};
use versecard_core::{Error, LyricSource, Result, ScrapedLyrics};

/// How many times to re-fetch a page whose lyrics body is empty.
pub const SCRAPE_ATTEMPTS: usize = 10;

const LYRICS_ROOT_SELECTOR: &str = "#lyrics-root-pin-spacer";
const PAGE_DATA_SELECTOR: &str = r#"meta[itemprop="page_data"]"#;

#[derive(Debug, Clone)]
pub struct LyricScraper {
    client: reqwest::Client,
}

impl LyricScraper {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl LyricSource for LyricScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedLyrics> {
        for _ in 0..SCRAPE_ATTEMPTS {
            let html = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| Error::Scrape(e.to_string()))?
                .error_for_status()
                .map_err(|e| Error::Scrape(e.to_string()))?
                .text()
                .await
                .map_err(|e| Error::Scrape(e.to_string()))?;
            if let Some(scraped) = parse_page(&html) {
                return Ok(scraped);
            }
        }
        Err(Error::Scrape(format!(
            "no lyrics after {SCRAPE_ATTEMPTS} attempts: {url}"
        )))
    }
}

/// Extract line-delimited lyrics and the optional video link from page HTML.
///
/// Returns `None` when the lyrics container is missing or empty, which
/// callers treat as "try again".
pub fn parse_page(html: &str) -> Option<ScrapedLyrics> {
    let doc = Html::parse_document(html);
    let root_selector = Selector::parse(LYRICS_ROOT_SELECTOR).ok()?;
    let root = doc.select(&root_selector).next()?;

    let mut text = String::new();
    for node in root.descendants() {
        match node.value() {
            scraper::Node::Text(t) => text.push_str(t),
            scraper::Node::Element(e) if e.name() == "br" => text.push('\n'),
            _ => {}
        }
    }
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    Some(ScrapedLyrics {
        lines: text.split('\n').map(str::to_string).collect(),
        video_link: video_link(&doc),
    })
}

/// The video link hides in a meta tag whose content attribute is a JSON blob.
fn video_link(doc: &Html) -> Option<String> {
    let selector = Selector::parse(PAGE_DATA_SELECTOR).ok()?;
    let content = doc.select(&selector).next()?.value().attr("content")?;
    let page_data: serde_json::Value = serde_json::from_str(content).ok()?;
    page_data
        .get("song")?
        .get("youtube_url")?
        .as_str()
        .map(str::to_string)
}
