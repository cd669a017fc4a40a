use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::generator::{
    Generator, PAGE_BATCH_SIZE, RenderReport, RenderSettings, write_atomically,
};
use crate::path_utils::path_to_string_lossy;
use crate::types::ArtifactKind;

/// Resampling filter used when a page is scaled to the strip width.
const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// Where one page goes on the strip.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlacement {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Height after scaling the page to the strip width.
    pub scaled_height: u32,
    /// Top edge of the page on the strip.
    pub offset_y: u64,
}

/// Height of a `width` x `height` page scaled proportionally to `target_width`.
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == target_width {
        return height;
    }
    let scaled = (height as f64 * target_width as f64 / width as f64).round();
    // a page must keep at least one row, an empty band cannot be resized into
    (scaled as u32).max(1)
}

/// Computes the strip layout from page dimensions.
///
/// Returns the strip width (widest page), the total height and the placement
/// of every page, each scaled independently to the strip width.
pub fn plan_layout(pages: Vec<(PathBuf, u32, u32)>) -> (u32, u64, Vec<PagePlacement>) {
    let target_width = pages.iter().map(|(_, w, _)| *w).max().unwrap_or(0);
    let mut offset_y: u64 = 0;
    let placements = pages
        .into_iter()
        .map(|(path, width, height)| {
            let scaled_height = scaled_height(width, height, target_width);
            let placement = PagePlacement {
                path,
                width,
                height,
                scaled_height,
                offset_y,
            };
            offset_y += scaled_height as u64;
            placement
        })
        .collect();
    (target_width, offset_y, placements)
}

/// A generator that stacks all pages of a chapter into one tall PNG.
///
/// The strip is as wide as the widest page; narrower (or wider) pages keep
/// their aspect ratio. Pages are decoded [`PAGE_BATCH_SIZE`] at a time and
/// dropped as soon as they are composited.
#[derive(Debug, Clone, Default)]
pub struct LongImageGenerator {
    settings: RenderSettings,
}

impl LongImageGenerator {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    /// Reads page dimensions from the image headers, skipping unreadable pages.
    fn measure_pages(pages: &[PathBuf], warnings: &mut Vec<String>) -> Vec<(PathBuf, u32, u32)> {
        let measured: Vec<Result<(PathBuf, u32, u32)>> = pages
            .par_iter()
            .map(|path| {
                let (width, height) =
                    image::image_dimensions(path).map_err(|e| Error::page_decode(path, e))?;
                if width == 0 || height == 0 {
                    return Err(Error::page_decode(path, "image has no pixels"));
                }
                Ok((path.clone(), width, height))
            })
            .collect();

        measured
            .into_iter()
            .filter_map(|result| match result {
                Ok(page) => Some(page),
                Err(e) => {
                    log::warn!("Skipping page: {}", e);
                    warnings.push(e.to_string());
                    None
                }
            })
            .collect()
    }

    /// Decodes one page as RGB, scaled to its slot on the strip.
    fn load_scaled(placement: &PagePlacement, target_width: u32) -> Result<RgbImage> {
        let rgb = image::open(&placement.path)
            .map_err(|e| Error::page_decode(&placement.path, e))?
            .into_rgb8();

        if rgb.dimensions() == (target_width, placement.scaled_height) {
            Ok(rgb)
        } else {
            Ok(imageops::resize(
                &rgb,
                target_width,
                placement.scaled_height,
                RESIZE_FILTER,
            ))
        }
    }

    fn write_png(&self, canvas: &RgbImage, target: &Path) -> Result<()> {
        let compression = if self.settings.optimize {
            CompressionType::Best
        } else {
            CompressionType::Default
        };
        let writer = BufWriter::new(File::create(target)?);
        PngEncoder::new_with_quality(writer, compression, PngFilterType::Adaptive)
            .write_image(
                canvas.as_raw(),
                canvas.width(),
                canvas.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| Error::render_write(target, e))
    }
}

impl Generator for LongImageGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::LongImage
    }

    fn render(&self, pages: &[PathBuf], output: &Path) -> Result<RenderReport> {
        let mut warnings = Vec::new();

        let measured = Self::measure_pages(pages, &mut warnings);
        if measured.is_empty() {
            return Ok(RenderReport::nothing_written(output, warnings));
        }

        let (target_width, total_height, placements) = plan_layout(measured);
        let canvas_height = u32::try_from(total_height).map_err(|_| {
            Error::render_write(
                output,
                format!("strip height {} exceeds the image size limit", total_height),
            )
        })?;

        let mut canvas = RgbImage::new(target_width, canvas_height);
        let mut pages_rendered = 0;

        for batch in placements.chunks(PAGE_BATCH_SIZE) {
            let decoded: Vec<Result<RgbImage>> = batch
                .par_iter()
                .map(|placement| Self::load_scaled(placement, target_width))
                .collect();

            for (placement, page) in batch.iter().zip(decoded) {
                match page {
                    Ok(page) => {
                        imageops::replace(&mut canvas, &page, 0, placement.offset_y as i64);
                        pages_rendered += 1;
                    }
                    Err(e) => {
                        // its band stays blank so later pages keep their offsets
                        log::warn!("Skipping page: {}", e);
                        warnings.push(e.to_string());
                    }
                }
            }
        }

        if pages_rendered == 0 {
            return Ok(RenderReport::nothing_written(output, warnings));
        }

        write_atomically(output, |target| self.write_png(&canvas, target))?;

        log::info!(
            "Long image saved: {} ({}x{}, {} page(s))",
            path_to_string_lossy(output),
            target_width,
            canvas_height,
            pages_rendered
        );

        Ok(RenderReport {
            output: output.to_path_buf(),
            pages_rendered,
            written: true,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_height_rounds() {
        assert_eq!(scaled_height(100, 100, 100), 100);
        assert_eq!(scaled_height(50, 75, 100), 150);
        // 33 * 100 / 30 = 110
        assert_eq!(scaled_height(30, 33, 100), 110);
        // 10 * 100 / 300 = 3.33
        assert_eq!(scaled_height(300, 10, 100), 3);
        // 10 * 100 / 60 = 16.67
        assert_eq!(scaled_height(60, 10, 100), 17);
    }

    #[test]
    fn test_scaled_height_keeps_one_row() {
        // 1 * 100 / 1000 = 0.1 rounds to 0
        assert_eq!(scaled_height(1000, 1, 100), 1);
        assert_eq!(scaled_height(4000, 1, 1), 1);
    }

    #[test]
    fn test_plan_layout_scales_each_page_independently() {
        let pages = vec![
            (PathBuf::from("a.png"), 100, 200),
            (PathBuf::from("b.png"), 50, 50),
            (PathBuf::from("c.png"), 200, 100),
        ];
        let (width, height, placements) = plan_layout(pages);

        assert_eq!(width, 200);
        assert_eq!(placements[0].scaled_height, 400);
        assert_eq!(placements[1].scaled_height, 200);
        assert_eq!(placements[2].scaled_height, 100);
        assert_eq!(height, 700);
        assert_eq!(placements[1].offset_y, 400);
        assert_eq!(placements[2].offset_y, 600);
    }
}
