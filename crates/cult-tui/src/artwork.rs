//! Artwork loading and half-block rendering.
//!
//! The image is fetched once per URL, decoded off the runtime threads and
//! shrunk to fit `ART_COLS × ART_ROWS` terminal cells.  Each cell shows two
//! vertically stacked pixels: `▀` with the upper pixel as foreground and the
//! lower pixel as background.

use std::sync::Arc;

use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};
use tracing::debug;

/// Artwork box size in terminal cells.
pub const ART_COLS: u16 = 24;
pub const ART_ROWS: u16 = 12;

const UPPER_HALF_BLOCK: &str = "▀";

#[derive(Debug, thiserror::Error)]
pub enum ImageLoadError {
    #[error("artwork fetch failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("artwork server returned HTTP {0}")]
    Status(u16),

    #[error("artwork decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("artwork decode task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A decoded, downscaled artwork ready to paint.
#[derive(Debug, Clone, PartialEq)]
pub struct Artwork {
    pub url: String,
    width: u32,
    height: u32,
    /// Row-major RGB.
    pixels: Vec<[u8; 3]>,
}

impl Artwork {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    /// Size in cells once painted.
    pub fn cell_size(&self) -> (u16, u16) {
        (self.width as u16, self.height.div_ceil(2) as u16)
    }
}

/// Load state of the current artwork, mirrored by the view.
#[derive(Debug, Clone, Default)]
pub enum ArtworkPhase {
    /// Requested, nothing to show yet.
    #[default]
    Empty,
    Success(Arc<Artwork>),
    Failure,
}

/// Fetch and decode `url`.
pub async fn load_artwork(client: &reqwest::Client, url: &str) -> Result<Artwork, ImageLoadError> {
    debug!("[artwork] GET {}", url);
    let resp = client.get(url).send().await?;
    let code = resp.status();
    if !code.is_success() {
        return Err(ImageLoadError::Status(code.as_u16()));
    }
    let bytes = resp.bytes().await?;
    debug!("[artwork] {} bytes from {}", bytes.len(), url);

    let url = url.to_string();
    tokio::task::spawn_blocking(move || {
        decode_artwork(url, &bytes, u32::from(ART_COLS), u32::from(ART_ROWS) * 2)
    })
    .await?
}

/// Decode any supported image format and fit it into `max_w × max_h` pixels,
/// keeping the aspect ratio.
pub fn decode_artwork(
    url: String,
    bytes: &[u8],
    max_w: u32,
    max_h: u32,
) -> Result<Artwork, ImageLoadError> {
    let mut img = image::load_from_memory(bytes)?;
    // thumbnail() also scales up; small art stays at its native size
    if img.width() > max_w || img.height() > max_h {
        img = img.thumbnail(max_w, max_h);
    }
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let pixels = rgb.pixels().map(|p| p.0).collect();
    Ok(Artwork {
        url,
        width,
        height,
        pixels,
    })
}

/// Paints an [`Artwork`] centered inside the render area.
pub struct ArtworkView<'a> {
    art: &'a Artwork,
}

impl<'a> ArtworkView<'a> {
    pub fn new(art: &'a Artwork) -> Self {
        Self { art }
    }
}

impl Widget for ArtworkView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (cols, rows) = self.art.cell_size();
        let cols = cols.min(area.width);
        let rows = rows.min(area.height);
        let x0 = area.x + (area.width - cols) / 2;
        let y0 = area.y + (area.height - rows) / 2;

        for row in 0..rows {
            for col in 0..cols {
                let top = self.art.pixel(u32::from(col), u32::from(row) * 2);
                let bottom = self.art.pixel(u32::from(col), u32::from(row) * 2 + 1);
                if let Some(cell) = buf.cell_mut((x0 + col, y0 + row)) {
                    cell.set_symbol(UPPER_HALF_BLOCK);
                    if let Some([r, g, b]) = top {
                        cell.set_fg(Color::Rgb(r, g, b));
                    }
                    // odd pixel height: last row has no lower half
                    cell.set_bg(match bottom {
                        Some([r, g, b]) => Color::Rgb(r, g, b),
                        None => Color::Reset,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// 2×2 PNG: red, green / blue, white.
    fn quad_png() -> Vec<u8> {
        let img = ImageBuffer::from_fn(2, 2, |x, y| match (x, y) {
            (0, 0) => Rgb([255u8, 0, 0]),
            (1, 0) => Rgb([0, 255, 0]),
            (0, 1) => Rgb([0, 0, 255]),
            _ => Rgb([255, 255, 255]),
        });
        let mut out = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_decode_keeps_small_images() {
        let art = decode_artwork("u".into(), &quad_png(), 24, 24).unwrap();
        assert_eq!((art.width(), art.height()), (2, 2));
        assert_eq!(art.pixel(0, 0), Some([255, 0, 0]));
        assert_eq!(art.pixel(1, 1), Some([255, 255, 255]));
        assert_eq!(art.pixel(2, 0), None);
        assert_eq!(art.cell_size(), (2, 1));
    }

    #[test]
    fn test_decode_fits_box_and_keeps_aspect() {
        let wide = ImageBuffer::from_pixel(200, 100, Rgb([10u8, 20, 30]));
        let mut png = Vec::new();
        wide.write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let art = decode_artwork("u".into(), &png, 24, 24).unwrap();
        assert_eq!(art.width(), 24);
        assert_eq!(art.height(), 12);
    }

    #[test]
    fn test_decode_rejects_non_images() {
        let err = decode_artwork("u".into(), b"<html>not found</html>", 24, 24).unwrap_err();
        assert!(matches!(err, ImageLoadError::Decode(_)));
    }

    #[test]
    fn test_half_block_render() {
        let art = decode_artwork("u".into(), &quad_png(), 24, 24).unwrap();
        let area = Rect::new(0, 0, 2, 1);
        let mut buf = Buffer::empty(area);
        ArtworkView::new(&art).render(area, &mut buf);

        let left = &buf[(0, 0)];
        assert_eq!(left.symbol(), "▀");
        assert_eq!(left.fg, Color::Rgb(255, 0, 0));
        assert_eq!(left.bg, Color::Rgb(0, 0, 255));
        let right = &buf[(1, 0)];
        assert_eq!(right.fg, Color::Rgb(0, 255, 0));
        assert_eq!(right.bg, Color::Rgb(255, 255, 255));
    }

    #[tokio::test]
    async fn test_load_artwork_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.png"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(quad_png(), "image/png"))
            .mount(&server)
            .await;

        let url = format!("{}/a.png", server.uri());
        let art = load_artwork(&reqwest::Client::new(), &url).await.unwrap();
        assert_eq!(art.url, url);
        assert_eq!(art.pixel(0, 1), Some([0, 0, 255]));
    }

    #[tokio::test]
    async fn test_load_artwork_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/missing.png", server.uri());
        let err = load_artwork(&reqwest::Client::new(), &url)
            .await
            .unwrap_err();
        assert!(matches!(err, ImageLoadError::Status(404)));
    }
}
