//! Annotation renderer
//!
//! Draws accepted detections onto a copy of the source image: a hollow box per
//! object and a filled label tag above its top-left corner.

use crate::detection::Detection;
use ab_glyph::{FontRef, PxScale};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use rand::Rng;
use std::collections::HashSet;

/// Detections must score strictly above this to be drawn and tagged.
pub const SCORE_THRESHOLD: f32 = 0.5;

/// Upper bound (inclusive) of each random color channel, keeping white text readable.
const MAX_CHANNEL: u8 = 233;

/// Label glyph height in pixels per unit of box line thickness.
const LABEL_PX_PER_LINE: f32 = 22.0 / 3.0;
const MIN_LABEL_PX: f32 = 10.0;

const JPEG_QUALITY: u8 = 95;

const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

static FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to load label font: {0}")]
    Font(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),
}

pub struct AnnotationRenderer {
    font: FontRef<'static>,
    /// Number of colors sampled per detection; the model's label count.
    palette_size: usize,
}

impl AnnotationRenderer {
    pub fn new(label_count: usize) -> Result<Self, RenderError> {
        let font =
            FontRef::try_from_slice(FONT_DATA).map_err(|e| RenderError::Font(e.to_string()))?;
        Ok(Self {
            font,
            palette_size: label_count.max(1),
        })
    }

    /// Render with the thread-local RNG.
    pub fn render(&self, image: &DynamicImage, detections: &[Detection]) -> (RgbImage, Vec<String>) {
        self.render_with_rng(image, detections, &mut rand::rng())
    }

    /// Draw every accepted detection and return the annotated copy plus the
    /// accepted labels in acceptance order.
    ///
    /// A detection is accepted when its score is above [`SCORE_THRESHOLD`] and
    /// its label has not been accepted yet. The first accepted detection of a
    /// label wins even if a later one scores higher.
    pub fn render_with_rng<R: Rng + ?Sized>(
        &self,
        image: &DynamicImage,
        detections: &[Detection],
        rng: &mut R,
    ) -> (RgbImage, Vec<String>) {
        let mut canvas = image.to_rgb8();
        let (width, height) = canvas.dimensions();
        let line = line_thickness(width, height);
        let scale = PxScale::from((line as f32 * LABEL_PX_PER_LINE).max(MIN_LABEL_PX));

        let mut seen = HashSet::new();
        let mut labels = Vec::new();

        for detection in detections {
            if detection.score <= SCORE_THRESHOLD || seen.contains(detection.label.as_str()) {
                continue;
            }
            seen.insert(detection.label.as_str());
            labels.push(detection.label.clone());

            let color = self.pick_color(rng);
            let x1 = to_pixel(detection.bbox.x1, width);
            let y1 = to_pixel(detection.bbox.y1, height);
            let x2 = to_pixel(detection.bbox.x2, width);
            let y2 = to_pixel(detection.bbox.y2, height);

            draw_box(&mut canvas, (x1, y1), (x2, y2), line, color);
            self.draw_label(&mut canvas, (x1, y1), scale, color, &detection.label);
        }

        tracing::debug!(
            detections = detections.len(),
            accepted = labels.len(),
            line_thickness = line,
            "Annotations rendered"
        );

        (canvas, labels)
    }

    /// Sample a fresh palette and choose one entry from it.
    fn pick_color<R: Rng + ?Sized>(&self, rng: &mut R) -> Rgb<u8> {
        let palette: Vec<Rgb<u8>> = (0..self.palette_size)
            .map(|_| {
                Rgb([
                    rng.random_range(0..=MAX_CHANNEL),
                    rng.random_range(0..=MAX_CHANNEL),
                    rng.random_range(0..=MAX_CHANNEL),
                ])
            })
            .collect();
        palette[rng.random_range(0..palette.len())]
    }

    fn draw_label(
        &self,
        canvas: &mut RgbImage,
        (x, y): (i32, i32),
        scale: PxScale,
        color: Rgb<u8>,
        text: &str,
    ) {
        let (text_w, text_h) = text_size(scale, &self.font, text);
        if text_w == 0 || text_h == 0 {
            return;
        }

        let top = y - text_h as i32 - 3;
        draw_filled_rect_mut(canvas, Rect::at(x, top).of_size(text_w, text_h + 3), color);
        draw_text_mut(
            canvas,
            LABEL_TEXT_COLOR,
            x,
            top + 1,
            scale,
            &self.font,
            text,
        );
    }
}

/// Box line thickness for an image: `round(0.002 * max(h, w)) + 1`.
pub fn line_thickness(width: u32, height: u32) -> u32 {
    (0.002 * width.max(height) as f64).round() as u32 + 1
}

/// Model coordinate clamped to `0..limit`; NaN lands on 0.
fn to_pixel(value: f32, limit: u32) -> i32 {
    value.clamp(0.0, limit.saturating_sub(1) as f32) as i32
}

/// Hollow rectangle `line` pixels thick, centered on the box outline.
fn draw_box(canvas: &mut RgbImage, (x1, y1): (i32, i32), (x2, y2): (i32, i32), line: u32, color: Rgb<u8>) {
    let (left, right) = (x1.min(x2), x1.max(x2));
    let (top, bottom) = (y1.min(y2), y1.max(y2));
    let half = line as i32 / 2;

    for i in 0..line as i32 {
        let offset = i - half;
        let w = right - left + 1 - 2 * offset;
        let h = bottom - top + 1 - 2 * offset;
        // Rect::of_size panics on zero
        if w <= 0 || h <= 0 {
            continue;
        }
        let rect = Rect::at(left + offset, top + offset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

/// Encode an annotated image as JPEG.
pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>, RenderError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY)
        .encode_image(image)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BoundingBox;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(64, 48, |x, y| {
            Rgb([(x * 3) as u8, (y * 5) as u8, 128])
        }))
    }

    fn detection(label: &str, score: f32) -> Detection {
        Detection::new(label, BoundingBox::new(10.0, 20.0, 40.0, 40.0), score)
    }

    #[test]
    fn test_line_thickness() {
        assert_eq!(line_thickness(64, 48), 1);
        assert_eq!(line_thickness(640, 480), 2);
        assert_eq!(line_thickness(1920, 1080), 5);
    }

    #[test]
    fn test_no_detections_is_identical_copy() {
        let renderer = AnnotationRenderer::new(91).unwrap();
        let image = test_image();

        let (rendered, labels) = renderer.render(&image, &[]);

        assert!(labels.is_empty());
        assert_eq!(rendered, image.to_rgb8());
    }

    #[test]
    fn test_low_scores_are_ignored() {
        let renderer = AnnotationRenderer::new(91).unwrap();
        let image = test_image();

        let (rendered, labels) =
            renderer.render(&image, &[detection("cat", 0.5), detection("dog", 0.1)]);

        assert!(labels.is_empty());
        assert_eq!(rendered, image.to_rgb8());
    }

    #[test]
    fn test_first_seen_label_wins() {
        let renderer = AnnotationRenderer::new(91).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let (_, labels) = renderer.render_with_rng(
            &test_image(),
            &[
                detection("cat", 0.6),
                detection("dog", 0.7),
                detection("cat", 0.99),
            ],
            &mut rng,
        );

        assert_eq!(labels, vec!["cat", "dog"]);
    }

    #[test]
    fn test_render_draws_and_keeps_dimensions() {
        let renderer = AnnotationRenderer::new(91).unwrap();
        let image = test_image();
        let mut rng = StdRng::seed_from_u64(42);

        let (rendered, labels) =
            renderer.render_with_rng(&image, &[detection("cat", 0.9)], &mut rng);

        assert_eq!(labels, vec!["cat"]);
        assert_eq!(rendered.dimensions(), (64, 48));
        assert_ne!(rendered, image.to_rgb8());
        // Box corner takes the sampled color, whose channels never exceed the cap
        let corner = rendered.get_pixel(10, 40);
        assert!(corner.0.iter().all(|&c| c <= MAX_CHANNEL));
    }

    #[test]
    fn test_same_seed_same_output() {
        let renderer = AnnotationRenderer::new(91).unwrap();
        let image = test_image();
        let detections = [detection("cat", 0.9)];

        let (a, _) = renderer.render_with_rng(&image, &detections, &mut StdRng::seed_from_u64(1));
        let (b, _) = renderer.render_with_rng(&image, &detections, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_degenerate_and_offscreen_boxes_do_not_panic() {
        let renderer = AnnotationRenderer::new(1).unwrap();
        let detections = [
            Detection::new("dot", BoundingBox::new(5.0, 5.0, 5.0, 5.0), 0.9),
            Detection::new("edge", BoundingBox::new(-10.0, -10.0, 500.0, 500.0), 0.9),
        ];

        let (_, labels) = renderer.render(&test_image(), &detections);
        assert_eq!(labels, vec!["dot", "edge"]);
    }

    #[test]
    fn test_extreme_coordinates_are_clamped() {
        let renderer = AnnotationRenderer::new(1).unwrap();
        let detections = [
            Detection::new(
                "huge",
                BoundingBox::new(-f32::MAX, -f32::MAX, f32::MAX, f32::MAX),
                0.9,
            ),
            Detection::new(
                "nan",
                BoundingBox::new(f32::NAN, 3.0, f32::INFINITY, f32::NEG_INFINITY),
                0.9,
            ),
        ];

        let (rendered, labels) = renderer.render(&test_image(), &detections);

        assert_eq!(labels, vec!["huge", "nan"]);
        assert_eq!(rendered.dimensions(), (64, 48));
        assert_eq!(to_pixel(1e30, 64), 63);
        assert_eq!(to_pixel(-5.0, 64), 0);
        assert_eq!(to_pixel(f32::NAN, 64), 0);
    }

    #[test]
    fn test_encode_jpeg() {
        let bytes = encode_jpeg(&test_image().to_rgb8()).unwrap();
        assert_eq!(
            image::guess_format(&bytes).unwrap(),
            image::ImageFormat::Jpeg
        );
    }
}
