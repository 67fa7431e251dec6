//! Card rendering over `image` + `ab_glyph`.
//!
//! Lyric chunks are printed dark-on-white strips, the title prints directly
//! in white, and an optional decorative overlay is blitted last. Font files
//! are plain TTF/OTF loaded at startup; codec and outline details stay inside
//! the two crates.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use ab_glyph::{point, Font, FontVec, GlyphId, PxScale, ScaleFont};
use image::imageops::FilterType;
use image::{imageops, Rgba, RgbaImage};
use versecard_core::compose::{CANVAS_SIZE, LYRIC_PADDING};
use versecard_core::{CardRenderer, Error, FontKind, Result, Surface, TextMeasure};

const LYRIC_PX: f32 = 26.0;
const TITLE_PX: f32 = 24.0;
const LYRIC_INK: Rgba<u8> = Rgba([20, 20, 20, 255]);
const LYRIC_STRIP: Rgba<u8> = Rgba([255, 255, 255, 255]);
const TITLE_INK: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub lyric_font: PathBuf,
    pub title_font: PathBuf,
    /// Decorative overlay PNG; skipped when absent.
    pub overlay: Option<PathBuf>,
}

struct Fonts {
    lyric: FontVec,
    title: FontVec,
}

pub struct ImageRenderer {
    fonts: Arc<Fonts>,
    overlay: Option<Arc<RgbaImage>>,
}

impl ImageRenderer {
    pub fn open(config: &RendererConfig) -> Result<Self> {
        let lyric = load_font(&config.lyric_font)?;
        let title = load_font(&config.title_font)?;
        let overlay = match &config.overlay {
            Some(path) => Some(Arc::new(
                image::open(path)
                    .map_err(|e| Error::Render(format!("overlay {}: {e}", path.display())))?
                    .to_rgba8(),
            )),
            None => None,
        };
        Ok(Self {
            fonts: Arc::new(Fonts { lyric, title }),
            overlay,
        })
    }
}

fn load_font(path: &PathBuf) -> Result<FontVec> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::Render(format!("font {}: {e}", path.display())))?;
    FontVec::try_from_vec(bytes)
        .map_err(|e| Error::Render(format!("font {}: {e}", path.display())))
}

impl Fonts {
    fn font(&self, kind: FontKind) -> &FontVec {
        match kind {
            FontKind::Lyric => &self.lyric,
            FontKind::Title => &self.title,
        }
    }

    fn scale(kind: FontKind) -> PxScale {
        match kind {
            FontKind::Lyric => PxScale::from(LYRIC_PX),
            FontKind::Title => PxScale::from(TITLE_PX),
        }
    }
}

fn text_width(font: &FontVec, scale: PxScale, text: &str) -> u32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0f32;
    let mut prev: Option<GlyphId> = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = prev {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width.ceil() as u32
}

fn draw_text(
    img: &mut RgbaImage,
    font: &FontVec,
    scale: PxScale,
    x: u32,
    y: u32,
    text: &str,
    ink: Rgba<u8>,
) {
    let scaled = font.as_scaled(scale);
    let mut caret = x as f32;
    let baseline = y as f32 + scaled.ascent();
    let mut prev: Option<GlyphId> = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = prev {
            caret += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, baseline));
        caret += scaled.h_advance(id);
        prev = Some(id);
        let Some(outlined) = scaled.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let px = bounds.min.x as i32 + gx as i32;
            let py = bounds.min.y as i32 + gy as i32;
            if px < 0 || py < 0 || px as u32 >= img.width() || py as u32 >= img.height() {
                return;
            }
            blend(img.get_pixel_mut(px as u32, py as u32), ink, coverage);
        });
    }
}

fn blend(pixel: &mut Rgba<u8>, ink: Rgba<u8>, coverage: f32) {
    let coverage = coverage.clamp(0.0, 1.0);
    for channel in 0..3 {
        let base = f32::from(pixel.0[channel]);
        let over = f32::from(ink.0[channel]);
        pixel.0[channel] = (base + (over - base) * coverage).round() as u8;
    }
    pixel.0[3] = 255;
}

/// Decode and square the background to the canvas size.
fn prepare_background(bytes: &[u8]) -> Result<RgbaImage> {
    let decoded = image::load_from_memory(bytes).map_err(|e| Error::Render(e.to_string()))?;
    Ok(decoded
        .resize_exact(CANVAS_SIZE, CANVAS_SIZE, FilterType::Lanczos3)
        .to_rgba8())
}

/// Scale color channels toward black; `amount` is the fraction removed.
fn darken_in_place(img: &mut RgbaImage, amount: f32) {
    let keep = (1.0 - amount).clamp(0.0, 1.0);
    for pixel in img.pixels_mut() {
        for channel in 0..3 {
            pixel.0[channel] = (f32::from(pixel.0[channel]) * keep) as u8;
        }
    }
}

struct CardSurface {
    image: RgbaImage,
    fonts: Arc<Fonts>,
    overlay: Option<Arc<RgbaImage>>,
}

impl Surface for CardSurface {
    fn darken(&mut self, amount: f32) {
        darken_in_place(&mut self.image, amount);
    }

    fn blit_text(&mut self, kind: FontKind, x: u32, y: u32, text: &str) {
        let font = self.fonts.font(kind);
        let scale = Fonts::scale(kind);
        match kind {
            FontKind::Lyric => {
                // White strip behind the text, padded on both sides.
                let width = text_width(font, scale, text) + LYRIC_PADDING;
                let height = font.as_scaled(scale).height().ceil() as u32;
                fill_rect(&mut self.image, x, y, width, height, LYRIC_STRIP);
                draw_text(
                    &mut self.image,
                    font,
                    scale,
                    x + LYRIC_PADDING / 2,
                    y,
                    text,
                    LYRIC_INK,
                );
            }
            FontKind::Title => {
                draw_text(&mut self.image, font, scale, x, y, text, TITLE_INK);
            }
        }
    }

    fn blit_overlay(&mut self, x: u32, y: u32) {
        if let Some(overlay) = &self.overlay {
            imageops::overlay(&mut self.image, overlay.as_ref(), i64::from(x), i64::from(y));
        }
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.image
            .write_to(&mut out, image::ImageFormat::Png)
            .map_err(|e| Error::Render(e.to_string()))?;
        Ok(out.into_inner())
    }
}

fn fill_rect(img: &mut RgbaImage, x: u32, y: u32, width: u32, height: u32, color: Rgba<u8>) {
    let x_end = (x + width).min(img.width());
    let y_end = (y + height).min(img.height());
    for py in y.min(img.height())..y_end {
        for px in x.min(img.width())..x_end {
            img.put_pixel(px, py, color);
        }
    }
}

impl TextMeasure for ImageRenderer {
    fn width(&self, kind: FontKind, text: &str) -> u32 {
        text_width(self.fonts.font(kind), Fonts::scale(kind), text)
    }
}

impl CardRenderer for ImageRenderer {
    fn measure(&self) -> &dyn TextMeasure {
        self
    }

    fn begin(&self, background: &[u8]) -> Result<Box<dyn Surface>> {
        Ok(Box::new(CardSurface {
            image: prepare_background(background)?,
            fonts: self.fonts.clone(),
            overlay: self.overlay.clone(),
        }))
    }
}
