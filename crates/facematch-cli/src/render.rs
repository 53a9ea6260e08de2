//! Draw annotation plans onto images and write them out as PNG.

use ab_glyph::{FontVec, PxScale};
use facematch_core::{FaceRectangle, ImagePlan};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

const MARK_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const CAPTION_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const MARK_WIDTH: u32 = 4;
const LABEL_FONT_SIZE: f32 = 32.0;
const CAPTION_FONT_SIZE: f32 = 20.0;
const CAPTION_HEIGHT: u32 = 32;
const PANEL_GAP: u32 = 16;
/// Space between a label and the box edge it sits on.
const LABEL_GAP: i32 = 6;

/// Fonts tried when none is configured.
const SYSTEM_FONTS: [&str; 5] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
];

pub struct Renderer {
    font: Option<FontVec>,
}

impl Renderer {
    /// Load the configured font, or the first system font found.
    ///
    /// Without a usable font only the boxes are drawn.
    pub fn new(font_path: Option<&Path>) -> Self {
        let candidates: Vec<PathBuf> = match font_path {
            Some(path) => vec![path.to_path_buf()],
            None => SYSTEM_FONTS.iter().map(PathBuf::from).collect(),
        };

        let font = candidates.iter().find_map(|path| {
            let bytes = std::fs::read(path).ok()?;
            match FontVec::try_from_vec(bytes) {
                Ok(font) => {
                    tracing::debug!(path = %path.display(), "label font loaded");
                    Some(font)
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "unusable font file");
                    None
                }
            }
        });

        if font.is_none() {
            tracing::warn!("no label font available; set FACEMATCH_FONT or --font to draw labels");
        }
        Self { font }
    }

    pub fn without_text() -> Self {
        Self { font: None }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw every box and label of `plan` onto `image`.
    pub fn annotate(&self, image: &mut RgbImage, plan: &ImagePlan) {
        for annotation in &plan.annotations {
            draw_box(image, &annotation.rectangle);

            let Some(font) = &self.font else { continue };
            let scale = PxScale::from(LABEL_FONT_SIZE);
            let (text_w, text_h) = text_size(scale, font, &annotation.text);
            let (x, y) = label_origin(
                &annotation.rectangle,
                text_w,
                text_h,
                image.width(),
                image.height(),
            );
            draw_text_mut(image, MARK_COLOR, x, y, scale, font, &annotation.text);
        }
    }

    /// Annotate both images and place them next to each other, captions below.
    pub fn side_by_side(
        &self,
        mut left: RgbImage,
        left_plan: &ImagePlan,
        mut right: RgbImage,
        right_plan: &ImagePlan,
    ) -> RgbImage {
        self.annotate(&mut left, left_plan);
        self.annotate(&mut right, right_plan);

        let caption_height = if self.has_font() { CAPTION_HEIGHT } else { 0 };
        let width = left.width() + PANEL_GAP + right.width();
        let height = left.height().max(right.height()) + caption_height;
        let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);

        let right_x = left.width() + PANEL_GAP;
        image::imageops::replace(&mut canvas, &left, 0, 0);
        image::imageops::replace(&mut canvas, &right, right_x as i64, 0);

        if let Some(font) = &self.font {
            let caption_y = height - caption_height;
            let right_caption = match &right_plan.summary {
                Some(summary) => format!("{} ({summary})", right_plan.caption),
                None => right_plan.caption.clone(),
            };
            draw_caption(&mut canvas, font, &left_plan.caption, 0, left.width(), caption_y);
            draw_caption(&mut canvas, font, &right_caption, right_x, right.width(), caption_y);
        }

        canvas
    }
}

/// Top-left corner for a label of `text_w` x `text_h` pixels.
///
/// The label sits above the box. If there is no room it goes below, and if
/// that runs off the image it goes inside the top of the box. It is centred
/// on the box and kept inside the image horizontally.
pub fn label_origin(
    rect: &FaceRectangle,
    text_w: u32,
    text_h: u32,
    image_w: u32,
    image_h: u32,
) -> (i32, i32) {
    let (text_w, text_h) = (text_w as i32, text_h as i32);
    let top = rect.top as i32;
    let bottom = rect.bottom() as i32;

    // Work with the text baseline, then convert to its top edge.
    let mut baseline = top - LABEL_GAP;
    if baseline < text_h {
        baseline = bottom + LABEL_GAP + text_h;
        if baseline > image_h as i32 {
            baseline = top + LABEL_GAP + text_h;
        }
    }
    let y = baseline - text_h;

    let mut x = rect.left as i32 + (rect.width as i32 - text_w) / 2;
    if x < 0 {
        x = 0;
    } else if x + text_w > image_w as i32 {
        x = image_w as i32 - text_w;
    }
    (x, y)
}

fn draw_box(image: &mut RgbImage, rect: &FaceRectangle) {
    // Thickness grows inwards so the box never leaves the face rectangle.
    for t in 0..MARK_WIDTH {
        let (w, h) = (
            rect.width.saturating_sub(2 * t),
            rect.height.saturating_sub(2 * t),
        );
        if w == 0 || h == 0 {
            break;
        }
        let r = Rect::at((rect.left + t) as i32, (rect.top + t) as i32).of_size(w, h);
        draw_hollow_rect_mut(image, r, MARK_COLOR);
    }
}

fn draw_caption(canvas: &mut RgbImage, font: &FontVec, text: &str, x: u32, width: u32, y: u32) {
    let scale = PxScale::from(CAPTION_FONT_SIZE);
    let (text_w, text_h) = text_size(scale, font, text);
    let cx = x as i32 + (width as i32 - text_w as i32).max(0) / 2;
    let cy = y as i32 + (CAPTION_HEIGHT as i32 - text_h as i32).max(0) / 2;
    draw_text_mut(canvas, CAPTION_COLOR, cx, cy, scale, font, text);
}

pub fn decode(bytes: &[u8]) -> Result<RgbImage, image::ImageError> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

pub fn save_png(image: &RgbImage, path: &Path) -> Result<(), image::ImageError> {
    image.save_with_format(path, image::ImageFormat::Png)?;
    tracing::info!(path = %path.display(), "annotated image written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use facematch_core::Annotation;

    fn plan(rects: &[FaceRectangle]) -> ImagePlan {
        ImagePlan {
            caption: "faces".into(),
            annotations: rects
                .iter()
                .map(|r| Annotation { rectangle: *r, text: "0".into(), confidence: None })
                .collect(),
            summary: None,
        }
    }

    #[test]
    fn test_label_above_box() {
        let rect = FaceRectangle::new(100, 100, 50, 50);
        let (x, y) = label_origin(&rect, 20, 30, 400, 400);
        assert_eq!(x, 115);
        assert_eq!(y, 100 - LABEL_GAP - 30);
    }

    #[test]
    fn test_label_below_box_near_top_edge() {
        let rect = FaceRectangle::new(100, 5, 50, 50);
        let (_, y) = label_origin(&rect, 20, 30, 400, 400);
        assert_eq!(y, 55 + LABEL_GAP);
    }

    #[test]
    fn test_label_inside_box_when_box_fills_image() {
        let rect = FaceRectangle::new(0, 5, 100, 90);
        let (_, y) = label_origin(&rect, 20, 30, 100, 100);
        assert_eq!(y, 5 + LABEL_GAP);
    }

    #[test]
    fn test_label_clamped_horizontally() {
        let (x, _) = label_origin(&FaceRectangle::new(0, 100, 10, 10), 40, 20, 200, 200);
        assert_eq!(x, 0);
        let (x, _) = label_origin(&FaceRectangle::new(190, 100, 10, 10), 40, 20, 200, 200);
        assert_eq!(x, 160);
    }

    #[test]
    fn test_annotate_draws_box_edges() {
        let mut image = RgbImage::from_pixel(64, 64, Rgb([0, 0, 0]));
        let rect = FaceRectangle::new(10, 10, 20, 20);
        Renderer::without_text().annotate(&mut image, &plan(&[rect]));
        assert_eq!(*image.get_pixel(10, 10), MARK_COLOR);
        assert_eq!(*image.get_pixel(13, 20), MARK_COLOR);
        // Interior and outside stay untouched.
        assert_eq!(*image.get_pixel(20, 20), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_annotate_box_past_image_edge() {
        let mut image = RgbImage::new(8, 8);
        Renderer::without_text().annotate(&mut image, &plan(&[FaceRectangle::new(6, 6, 20, 20)]));
        assert_eq!(*image.get_pixel(6, 6), MARK_COLOR);
        assert_eq!(*image.get_pixel(7, 7), MARK_COLOR);
    }

    #[test]
    fn test_side_by_side_layout() {
        let left = RgbImage::from_pixel(40, 30, Rgb([1, 1, 1]));
        let right = RgbImage::from_pixel(50, 60, Rgb([2, 2, 2]));
        let canvas = Renderer::without_text().side_by_side(left, &plan(&[]), right, &plan(&[]));
        assert_eq!(canvas.dimensions(), (40 + PANEL_GAP + 50, 60));
        assert_eq!(*canvas.get_pixel(0, 0), Rgb([1, 1, 1]));
        assert_eq!(*canvas.get_pixel(40 + PANEL_GAP, 0), Rgb([2, 2, 2]));
        assert_eq!(*canvas.get_pixel(0, 45), BACKGROUND);
    }

    #[test]
    fn test_missing_font_falls_back_to_boxes() {
        let renderer = Renderer::new(Some(Path::new("/nonexistent/font.ttf")));
        assert!(!renderer.has_font());
    }

    #[test]
    fn test_png_written_and_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        save_png(&RgbImage::from_pixel(3, 2, MARK_COLOR), &path).unwrap();
        let decoded = decode(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(*decoded.get_pixel(2, 1), MARK_COLOR);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode(b"definitely not an image").is_err());
    }
}
