use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use printpdf::{
    ColorBits, ColorSpace, CustomPdfConformance, Image, ImageFilter, ImageTransform,
    ImageXObject, Mm, PdfConformance, PdfDocument, Px,
};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::generator::{
    Generator, PAGE_BATCH_SIZE, RenderReport, RenderSettings, write_atomically,
};
use crate::path_utils::{get_file_name_lossy, path_to_string_lossy};
use crate::types::ArtifactKind;

/// Resolution used to size PDF pages from image pixels.
const PDF_DPI: f32 = 72.0;
const MM_PER_INCH: f32 = 25.4;
const LAYER_NAME: &str = "Page";

/// A page decoded, converted to RGB and JPEG-encoded for embedding.
struct EncodedPage {
    width: u32,
    height: u32,
    jpeg: Vec<u8>,
}

impl EncodedPage {
    fn width_mm(&self) -> Mm {
        Mm(px_to_mm(self.width))
    }

    fn height_mm(&self) -> Mm {
        Mm(px_to_mm(self.height))
    }

    fn into_image(self) -> Image {
        Image::from(ImageXObject {
            width: Px(self.width as usize),
            height: Px(self.height as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: self.jpeg,
            image_filter: Some(ImageFilter::DCT),
            clipping_bbox: None,
            smask: None,
        })
    }
}

fn px_to_mm(px: u32) -> f32 {
    px as f32 / PDF_DPI * MM_PER_INCH
}

/// A generator for multi-page PDF files, one page per image.
///
/// Every page is converted to 8-bit RGB and embedded as a JPEG stream at the
/// configured quality; each PDF page is sized to its image at 72 dpi.
#[derive(Debug, Clone, Default)]
pub struct PdfGenerator {
    settings: RenderSettings,
}

impl PdfGenerator {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    /// Opens one page and encodes it for embedding.
    fn encode_page(&self, path: &Path) -> Result<EncodedPage> {
        let rgb = image::open(path)
            .map_err(|e| Error::page_decode(path, e))?
            .into_rgb8();
        let (width, height) = rgb.dimensions();

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.settings.image_quality)
            .encode_image(&rgb)
            .map_err(|e| Error::page_decode(path, e))?;

        Ok(EncodedPage {
            width,
            height,
            jpeg,
        })
    }

    fn write_document(&self, title: &str, pages: Vec<EncodedPage>, target: &Path) -> Result<()> {
        let mut pages = pages.into_iter();
        let first = pages
            .next()
            .ok_or_else(|| Error::render_write(target, "no pages to write"))?;

        let (doc, first_page, first_layer) =
            PdfDocument::new(title, first.width_mm(), first.height_mm(), LAYER_NAME);
        let doc = if self.settings.optimize {
            // no ICC profile or XMP metadata stream
            doc.with_conformance(PdfConformance::Custom(CustomPdfConformance {
                requires_icc_profile: false,
                requires_xmp_metadata: false,
                ..Default::default()
            }))
        } else {
            doc
        };

        let transform = ImageTransform {
            dpi: Some(PDF_DPI),
            ..Default::default()
        };

        let layer = doc.get_page(first_page).get_layer(first_layer);
        first.into_image().add_to_layer(layer, transform.clone());

        for page in pages {
            let (page_index, layer_index) =
                doc.add_page(page.width_mm(), page.height_mm(), LAYER_NAME);
            let layer = doc.get_page(page_index).get_layer(layer_index);
            page.into_image().add_to_layer(layer, transform.clone());
        }

        let file = File::create(target)?;
        let mut writer = BufWriter::new(file);
        doc.save(&mut writer)
            .map_err(|e| Error::render_write(target, e))?;
        Ok(())
    }
}

impl Generator for PdfGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Pdf
    }

    fn render(&self, pages: &[PathBuf], output: &Path) -> Result<RenderReport> {
        let mut warnings = Vec::new();
        let mut encoded: Vec<EncodedPage> = Vec::with_capacity(pages.len());

        // Decoded pixels only live inside a batch; the JPEG streams are kept
        for batch in pages.chunks(PAGE_BATCH_SIZE) {
            let results: Vec<Result<EncodedPage>> = batch
                .par_iter()
                .map(|page| self.encode_page(page))
                .collect();

            for result in results {
                match result {
                    Ok(page) => encoded.push(page),
                    Err(e) => {
                        log::warn!("Skipping page: {}", e);
                        warnings.push(e.to_string());
                    }
                }
            }
        }

        if encoded.is_empty() {
            return Ok(RenderReport::nothing_written(output, warnings));
        }

        let pages_rendered = encoded.len();
        let title = output
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| get_file_name_lossy(output));

        write_atomically(output, |target| {
            self.write_document(&title, encoded, target)
        })?;

        log::info!(
            "PDF saved: {} ({} page(s))",
            path_to_string_lossy(output),
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
