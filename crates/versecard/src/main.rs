use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use versecard_core::compose::CACHE_TTL;
use versecard_core::{Pipeline, TtlCache};
use versecard_local::{GeniusClient, ImageRenderer, LyricScraper, RendererConfig};

mod http;

#[derive(Parser, Debug)]
#[command(name = "versecard")]
#[command(about = "Lyric card server: find the line, frame it, render it", long_about = None)]
struct Cli {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
    /// TTF/OTF font for lyric strips.
    #[arg(long, default_value = "res/lyric.ttf")]
    lyric_font: PathBuf,
    /// TTF/OTF font for the title lines.
    #[arg(long, default_value = "res/title.ttf")]
    title_font: PathBuf,
    /// Decorative overlay PNG blitted onto every card; omit to skip.
    #[arg(long)]
    overlay: Option<PathBuf>,
    /// Directory of static frontend files.
    #[arg(long, default_value = "public")]
    public_dir: PathBuf,
    /// Search API base URL override (tests, private mirrors).
    #[arg(long, default_value = "https://genius.com")]
    genius_base_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let client = versecard_local::http_client().context("build http client")?;
    let genius = Arc::new(GeniusClient::with_base_url(
        client.clone(),
        cli.genius_base_url,
    ));
    let renderer = ImageRenderer::open(&RendererConfig {
        lyric_font: cli.lyric_font,
        title_font: cli.title_font,
        overlay: cli.overlay,
    })
    .context("load renderer assets")?;

    let pipeline = Pipeline {
        search: genius.clone(),
        lyrics: Arc::new(LyricScraper::new(client)),
        images: genius,
        renderer: Arc::new(renderer),
        cache: TtlCache::new(),
        ttl: CACHE_TTL,
    };

    let app = http::router(Arc::new(http::AppState::new(pipeline)), cli.public_dir);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cli.port))
        .await
        .with_context(|| format!("bind port {}", cli.port))?;
    tracing::info!(port = cli.port, "listening");
    axum::serve(listener, app).await.context("serve")?;
    Ok(())
}
