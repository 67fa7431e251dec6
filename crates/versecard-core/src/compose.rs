//! One request cycle: search, scrape, match, window, layout, draw.
//!
//! All fallibility lives here, in the calls out to the collaborators; the
//! normalizer, matcher, window, and layout stages are total and pure.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Namespace, TtlCache};
use crate::layout::{wrap, FontKind, TextMeasure};
use crate::matcher::find_best_line;
use crate::normalize::{clean, normalize_for_match};
use crate::window::Window;
use crate::{Candidate, Error, Result, ScrapedLyrics};

/// Canvas edge in pixels; cards are square.
pub const CANVAS_SIZE: u32 = 500;
/// Left margin for both lyric and title text.
pub const TEXT_GAP: u32 = 50;
/// Horizontal padding inside a lyric strip.
pub const LYRIC_PADDING: u32 = 20;
/// Chunk slots reserved for the excerpt before the title eats into them.
pub const LYRIC_SLOTS: usize = 5;
/// Hard cap on wrapped title chunks.
pub const TITLE_SLOTS: usize = 3;
/// Vertical distance between lyric strips.
pub const LYRIC_ROW_PITCH: u32 = 50;
/// First lyric strip offset from the top.
pub const LYRIC_TOP_OFFSET: u32 = 20;
/// Vertical distance between title lines, rendered bottom-up.
pub const TITLE_ROW_PITCH: u32 = 30;
/// Title baseline distance from the bottom edge.
pub const TITLE_BOTTOM_OFFSET: u32 = 50;
/// Decorative overlay position.
pub const OVERLAY_X: u32 = 15;
pub const OVERLAY_Y: u32 = 20;
/// How long any cached lookup stays fresh.
pub const CACHE_TTL: Duration = Duration::from_secs(600);

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Ordered candidates for a query; the page index selects one.
    async fn search(&self, query: &str) -> Result<Vec<Candidate>>;
}

#[async_trait::async_trait]
pub trait LyricSource: Send + Sync {
    /// Full line-delimited text plus an optional secondary link for a
    /// candidate's page. Implementations carry the bounded empty-body retry.
    async fn scrape(&self, url: &str) -> Result<ScrapedLyrics>;
}

#[async_trait::async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>>;
}

/// A surface text and images can be blitted onto at pixel coordinates.
pub trait Surface: Send {
    fn darken(&mut self, amount: f32);
    fn blit_text(&mut self, font: FontKind, x: u32, y: u32, text: &str);
    fn blit_overlay(&mut self, x: u32, y: u32);
    fn encode(&self) -> Result<Vec<u8>>;
}

/// Result-returning surface factory plus the measurement capability the
/// layout engine needs before any surface exists.
pub trait CardRenderer: Send + Sync {
    fn measure(&self) -> &dyn TextMeasure;
    fn begin(&self, background: &[u8]) -> Result<Box<dyn Surface>>;
}

/// One value slot shared by all namespaces of the store.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Search(Arc<Vec<Candidate>>),
    Scraped(Arc<ScrapedLyrics>),
    Image(Arc<Vec<u8>>),
}

#[derive(Debug, Clone)]
pub struct CardRequest {
    pub query: String,
    pub page: usize,
    pub before_offset: u32,
    pub after_offset: u32,
}

#[derive(Debug, Clone)]
pub struct Composed {
    /// Encoded card image.
    pub image: Vec<u8>,
    pub has_more_pages: bool,
    pub has_more_before: bool,
    pub has_more_after: bool,
    pub lyrics_link: String,
    pub video_link: Option<String>,
}

pub struct Pipeline {
    pub search: Arc<dyn SearchProvider>,
    pub lyrics: Arc<dyn LyricSource>,
    pub images: Arc<dyn ImageFetcher>,
    pub renderer: Arc<dyn CardRenderer>,
    pub cache: TtlCache<CacheValue>,
    pub ttl: Duration,
}

impl Pipeline {
    pub async fn compose(&self, req: &CardRequest) -> Result<Composed> {
        let query = prepare_query(&req.query);
        if query.is_empty() {
            return Err(Error::InvalidQuery);
        }

        let candidates = self.candidates_for(&query).await?;
        let candidate = candidates.get(req.page).ok_or(Error::NoCandidate)?;
        let has_more_pages = candidates.len() > req.page + 1;

        let scraped = self.scraped_for(&candidate.url).await?;

        // Keep only lines the fonts can print, and drop meta lines like
        // "[Chorus]" that never belong in an excerpt.
        let lines: Vec<String> = scraped
            .lines
            .iter()
            .map(|line| clean(line))
            .filter(|line| !line.is_empty() && !is_meta_line(line))
            .collect();
        let normalized_lines: Vec<String> =
            lines.iter().map(|line| normalize_for_match(line)).collect();

        let normalized_query = normalize_for_match(&query);
        let matched = find_best_line(&normalized_query, &normalized_lines);
        let (excerpt, window) = match matched {
            Some(index) => {
                let window = Window::around(index, req.before_offset, req.after_offset);
                (window.slice(&lines).join("\n "), Some(window))
            }
            // Degraded but valid: show the query itself.
            None => (query.clone(), None),
        };

        let background = self.image_for(&candidate.artist_image_url).await?;

        let measure = self.renderer.measure();
        let title_text = clean(&format!("{} \"{}\"", candidate.artist_name, candidate.title))
            .to_uppercase();
        let title = wrap(
            &title_text,
            measure,
            FontKind::Title,
            CANVAS_SIZE - TEXT_GAP,
            TITLE_SLOTS,
        );
        // Title renders bottom-up from a fixed baseline, so reverse the
        // chunk order before handing it to the surface.
        let mut title_chunks = title.chunks;
        title_chunks.reverse();

        let lyric_budget = LYRIC_SLOTS + TITLE_SLOTS - title_chunks.len();
        let lyric = wrap(
            &excerpt,
            measure,
            FontKind::Lyric,
            CANVAS_SIZE - TEXT_GAP - LYRIC_PADDING,
            lyric_budget,
        );

        let mut surface = self.renderer.begin(&background)?;
        surface.darken(0.3);
        for (i, chunk) in lyric.chunks.iter().enumerate() {
            surface.blit_text(
                FontKind::Lyric,
                TEXT_GAP,
                i as u32 * LYRIC_ROW_PITCH + LYRIC_TOP_OFFSET,
                chunk,
            );
        }
        for (i, chunk) in title_chunks.iter().enumerate() {
            surface.blit_text(
                FontKind::Title,
                TEXT_GAP,
                CANVAS_SIZE - TITLE_BOTTOM_OFFSET - i as u32 * TITLE_ROW_PITCH,
                chunk,
            );
        }
        surface.blit_overlay(OVERLAY_X, OVERLAY_Y);
        let image = surface.encode()?;

        // A full canvas cannot show more context, so a window that could
        // still grow reports nothing left once layout ran out of space.
        let (has_more_before, has_more_after) = match window {
            Some(w) => (
                lyric.has_more_space && w.can_extend_before(),
                lyric.has_more_space && w.can_extend_after(lines.len()),
            ),
            None => (false, false),
        };

        Ok(Composed {
            image,
            has_more_pages,
            has_more_before,
            has_more_after,
            lyrics_link: candidate.url.clone(),
            video_link: scraped.video_link.clone(),
        })
    }

    async fn candidates_for(&self, query: &str) -> Result<Arc<Vec<Candidate>>> {
        if let Some(CacheValue::Search(hit)) = self.cache.get(Namespace::Search, query) {
            return Ok(hit);
        }
        let fresh = Arc::new(self.search.search(query).await?);
        self.cache.set(
            Namespace::Search,
            query,
            CacheValue::Search(fresh.clone()),
            self.ttl,
        );
        Ok(fresh)
    }

    async fn scraped_for(&self, url: &str) -> Result<Arc<ScrapedLyrics>> {
        if let Some(CacheValue::Scraped(hit)) = self.cache.get(Namespace::Scraped, url) {
            return Ok(hit);
        }
        let fresh = Arc::new(self.lyrics.scrape(url).await?);
        self.cache.set(
            Namespace::Scraped,
            url,
            CacheValue::Scraped(fresh.clone()),
            self.ttl,
        );
        Ok(fresh)
    }

    async fn image_for(&self, url: &str) -> Result<Arc<Vec<u8>>> {
        if let Some(CacheValue::Image(hit)) = self.cache.get(Namespace::Image, url) {
            return Ok(hit);
        }
        let fresh = Arc::new(self.images.fetch_image(url).await?);
        self.cache.set(
            Namespace::Image,
            url,
            CacheValue::Image(fresh.clone()),
            self.ttl,
        );
        Ok(fresh)
    }
}

/// Trim, lowercase, and fold curly quotes so queries hit the same cache key
/// and matching key regardless of how they were typed.
fn prepare_query(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            c => c,
        })
        .collect()
}

fn is_meta_line(line: &str) -> bool {
    line.len() > 2 && line.starts_with('[') && line.ends_with(']')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubSearch {
        candidates: Vec<Candidate>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl SearchProvider for StubSearch {
        async fn search(&self, _query: &str) -> Result<Vec<Candidate>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.candidates.clone())
        }
    }

    struct StubLyrics {
        lines: Vec<String>,
        video_link: Option<String>,
    }

    #[async_trait::async_trait]
    impl LyricSource for StubLyrics {
        async fn scrape(&self, _url: &str) -> Result<ScrapedLyrics> {
            Ok(ScrapedLyrics {
                lines: self.lines.clone(),
                video_link: self.video_link.clone(),
            })
        }
    }

    struct StubImages;

    #[async_trait::async_trait]
    impl ImageFetcher for StubImages {
        async fn fetch_image(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(vec![0u8; 4])
        }
    }

    /// Ten pixels per character; records every text blit.
    struct StubRenderer {
        blits: Arc<Mutex<Vec<(FontKind, u32, u32, String)>>>,
    }

    impl TextMeasure for StubRenderer {
        fn width(&self, _font: FontKind, text: &str) -> u32 {
            text.chars().count() as u32 * 10
        }
    }

    struct StubSurface {
        blits: Arc<Mutex<Vec<(FontKind, u32, u32, String)>>>,
    }

    impl Surface for StubSurface {
        fn darken(&mut self, _amount: f32) {}
        fn blit_text(&mut self, font: FontKind, x: u32, y: u32, text: &str) {
            self.blits
                .lock()
                .expect("blit log")
                .push((font, x, y, text.to_string()));
        }
        fn blit_overlay(&mut self, _x: u32, _y: u32) {}
        fn encode(&self) -> Result<Vec<u8>> {
            Ok(b"card".to_vec())
        }
    }

    impl CardRenderer for StubRenderer {
        fn measure(&self) -> &dyn TextMeasure {
            self
        }
        fn begin(&self, _background: &[u8]) -> Result<Box<dyn Surface>> {
            Ok(Box::new(StubSurface {
                blits: self.blits.clone(),
            }))
        }
    }

    fn candidate() -> Candidate {
        Candidate {
            id: 1,
            title: "Hello, Dolly!".to_string(),
            url: "https://example.com/song".to_string(),
            artist_name: "Louis".to_string(),
            artist_image_url: "https://example.com/louis.png".to_string(),
        }
    }

    fn pipeline(lines: &[&str]) -> (Pipeline, Arc<Mutex<Vec<(FontKind, u32, u32, String)>>>) {
        let blits = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline {
            search: Arc::new(StubSearch {
                candidates: vec![candidate()],
                calls: AtomicUsize::new(0),
            }),
            lyrics: Arc::new(StubLyrics {
                lines: lines.iter().map(|s| s.to_string()).collect(),
                video_link: Some("https://youtube.example/v".to_string()),
            }),
            images: Arc::new(StubImages),
            renderer: Arc::new(StubRenderer {
                blits: blits.clone(),
            }),
            cache: TtlCache::new(),
            ttl: CACHE_TTL,
        };
        (pipeline, blits)
    }

    fn request(query: &str, before: u32, after: u32) -> CardRequest {
        CardRequest {
            query: query.to_string(),
            page: 0,
            before_offset: before,
            after_offset: after,
        }
    }

    #[tokio::test]
    async fn hello_dolly_selects_the_expected_window() {
        let (pipeline, blits) =
            pipeline(&["Well hello dolly", "Line two", "Line three"]);
        let composed = pipeline
            .compose(&request("hello dolly", 0, 1))
            .await
            .expect("compose");

        let blits = blits.lock().expect("blit log");
        let lyric_lines: Vec<&str> = blits
            .iter()
            .filter(|(font, ..)| *font == FontKind::Lyric)
            .map(|(.., text)| text.as_str())
            .collect();
        assert_eq!(lyric_lines, vec!["Well hello dolly", "Line two"]);

        assert_eq!(composed.image, b"card".to_vec());
        assert!(!composed.has_more_pages);
        assert!(!composed.has_more_before, "match is the first line");
        assert!(composed.has_more_after, "a third line exists");
        assert_eq!(composed.lyrics_link, "https://example.com/song");
        assert_eq!(
            composed.video_link.as_deref(),
            Some("https://youtube.example/v")
        );
    }

    #[tokio::test]
    async fn no_overlap_falls_back_to_the_query_text() {
        let (pipeline, blits) = pipeline(&["Nothing shared", "At all"]);
        let composed = pipeline
            .compose(&request("zebra xylophone", 2, 2))
            .await
            .expect("compose");

        let blits = blits.lock().expect("blit log");
        let lyric_lines: Vec<&str> = blits
            .iter()
            .filter(|(font, ..)| *font == FontKind::Lyric)
            .map(|(.., text)| text.as_str())
            .collect();
        assert_eq!(lyric_lines, vec!["zebra xylophone"]);
        assert!(!composed.has_more_before);
        assert!(!composed.has_more_after);
    }

    #[tokio::test]
    async fn meta_lines_never_match_or_render() {
        let (pipeline, blits) = pipeline(&["[Chorus]", "hello dolly", "[Outro: x]"]);
        let composed = pipeline
            .compose(&request("hello dolly", 1, 1))
            .await
            .expect("compose");

        let blits = blits.lock().expect("blit log");
        let lyric_lines: Vec<&str> = blits
            .iter()
            .filter(|(font, ..)| *font == FontKind::Lyric)
            .map(|(.., text)| text.as_str())
            .collect();
        assert_eq!(lyric_lines, vec!["hello dolly"]);
        assert!(!composed.has_more_before);
        assert!(!composed.has_more_after);
    }

    #[tokio::test]
    async fn full_canvas_suppresses_extendability() {
        // Enough long lines that the excerpt overflows its chunk budget.
        let lines: Vec<String> = (0..12)
            .map(|i| format!("hello dolly line number {i} with plenty of extra words here"))
            .collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let (pipeline, _blits) = pipeline(&refs);
        let composed = pipeline
            .compose(&request("hello dolly", 0, 9))
            .await
            .expect("compose");
        assert!(!composed.has_more_after, "layout reported no space left");
        assert!(!composed.has_more_before);
    }

    #[tokio::test]
    async fn wrapped_title_renders_bottom_up_and_shrinks_the_lyric_budget() {
        // 47 chars at 10px/char overflows the 450px title budget into two
        // chunks: `LOUIS ARMSTRONG AND HIS ALL STARS "HELLO` + `DOLLY"`.
        let blits = Arc::new(Mutex::new(Vec::new()));
        let lines: Vec<String> = (0..8)
            .map(|i| format!("hello dolly again and again number {i} with many words"))
            .collect();
        let pipeline = Pipeline {
            search: Arc::new(StubSearch {
                candidates: vec![Candidate {
                    id: 1,
                    title: "Hello Dolly".to_string(),
                    url: "https://example.com/song".to_string(),
                    artist_name: "Louis Armstrong And His All Stars".to_string(),
                    artist_image_url: "https://example.com/louis.png".to_string(),
                }],
                calls: AtomicUsize::new(0),
            }),
            lyrics: Arc::new(StubLyrics {
                lines,
                video_link: None,
            }),
            images: Arc::new(StubImages),
            renderer: Arc::new(StubRenderer {
                blits: blits.clone(),
            }),
            cache: TtlCache::new(),
            ttl: CACHE_TTL,
        };
        pipeline
            .compose(&request("hello dolly", 0, 7))
            .await
            .expect("compose");

        let blits = blits.lock().expect("blit log");
        let titles: Vec<(u32, &str)> = blits
            .iter()
            .filter(|(font, ..)| *font == FontKind::Title)
            .map(|(_, _, y, text)| (*y, text.as_str()))
            .collect();
        assert_eq!(
            titles,
            vec![
                (450, "DOLLY\""),
                (420, "LOUIS ARMSTRONG AND HIS ALL STARS \"HELLO"),
            ],
            "last wrapped chunk prints first, at the lowest baseline"
        );

        // Two title chunks leave 5 + 3 - 2 = 6 lyric slots; the long excerpt
        // overflows them, so exactly six chunks plus the ellipsis render.
        let lyric_chunks: Vec<&str> = blits
            .iter()
            .filter(|(font, ..)| *font == FontKind::Lyric)
            .map(|(.., text)| text.as_str())
            .collect();
        assert_eq!(lyric_chunks.len(), 7);
        assert_eq!(lyric_chunks.last().copied(), Some(crate::layout::ELLIPSIS));
    }

    #[tokio::test]
    async fn empty_query_is_rejected_before_any_upstream_work() {
        let (pipeline, _blits) = pipeline(&["a line"]);
        let err = pipeline.compose(&request("   ", 0, 0)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidQuery));
    }

    #[tokio::test]
    async fn absent_page_index_is_not_found() {
        let (pipeline, _blits) = pipeline(&["a line"]);
        let mut req = request("a line", 0, 0);
        req.page = 5;
        let err = pipeline.compose(&req).await.unwrap_err();
        assert!(matches!(err, Error::NoCandidate));
    }

    #[tokio::test]
    async fn search_results_are_cached_across_requests() {
        let search = Arc::new(StubSearch {
            candidates: vec![candidate()],
            calls: AtomicUsize::new(0),
        });
        let blits = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline {
            search: search.clone(),
            lyrics: Arc::new(StubLyrics {
                lines: vec!["hello dolly".to_string()],
                video_link: None,
            }),
            images: Arc::new(StubImages),
            renderer: Arc::new(StubRenderer { blits }),
            cache: TtlCache::new(),
            ttl: CACHE_TTL,
        };
        pipeline.compose(&request("hello dolly", 0, 0)).await.expect("first");
        pipeline.compose(&request("hello dolly", 0, 0)).await.expect("second");
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
    }
}
