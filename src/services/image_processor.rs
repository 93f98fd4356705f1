// src/services/image_processor.rs
use image::{GenericImageView, ImageFormat as ImgFormat};
use log::{info, warn};

use crate::errors::FitGeniusError;
use crate::models::EncodedImage;

/// Turns user-supplied files into session images.
pub struct ImageProcessor {
    max_dimension: Option<u32>,
}

impl ImageProcessor {
    pub fn new(max_dimension: Option<u32>) -> Self {
        Self { max_dimension }
    }

    pub fn is_image_type(content_type: &str) -> bool {
        content_type.trim().to_ascii_lowercase().starts_with("image/")
    }

    /// `Ok(None)` when the input does not declare an image type.
    pub fn ingest(
        &self,
        content_type: Option<&str>,
        data: Vec<u8>,
    ) -> Result<Option<EncodedImage>, FitGeniusError> {
        let Some(content_type) = content_type.filter(|ct| Self::is_image_type(ct)) else {
            return Ok(None);
        };

        let image = EncodedImage::new(content_type.trim(), data);
        Ok(Some(self.downscale(image)))
    }

    pub fn ingest_data_url(&self, data_url: &str) -> Result<Option<EncodedImage>, FitGeniusError> {
        if !Self::is_image_type(EncodedImage::data_url_mime_type(data_url)) {
            return Ok(None);
        }
        let image = EncodedImage::from_data_url(data_url)?;
        Ok(Some(self.downscale(image)))
    }

    /// Resizes in the declared format so the media-type tag stays true.
    fn downscale(&self, image: EncodedImage) -> EncodedImage {
        let Some(max_size) = self.max_dimension else {
            return image;
        };
        let Some(format) = ImgFormat::from_mime_type(&image.mime_type) else {
            warn!("Skipping downscale, no codec for {}", image.mime_type);
            return image;
        };

        match self.resize_if_needed(&image.data, max_size, format) {
            Some(resized) => EncodedImage::new(image.mime_type, resized),
            None => image,
        }
    }

    /// `None` when the image already fits, or cannot be decoded or re-encoded
    /// as `format` here.
    pub fn resize_if_needed(&self, data: &[u8], max_size: u32, format: ImgFormat) -> Option<Vec<u8>> {
        let img = match image::load_from_memory(data) {
            Ok(img) => img,
            Err(e) => {
                warn!("Skipping downscale, image not decodable locally: {}", e);
                return None;
            }
        };

        let (width, height) = img.dimensions();

        if width <= max_size && height <= max_size {
            return None;
        }

        let ratio = (max_size as f32 / width.max(height) as f32).min(1.0);
        let new_width = ((width as f32 * ratio) as u32).max(1);
        let new_height = ((height as f32 * ratio) as u32).max(1);

        let resized = img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3);

        let mut output = Vec::new();
        if let Err(e) = resized.write_to(&mut std::io::Cursor::new(&mut output), format) {
            warn!("Skipping downscale, cannot encode {:?}: {}", format, e);
            return None;
        }

        info!(
            "Downscaled upload from {}x{} to {}x{}",
            width,
            height,
            resized.width(),
            resized.height()
        );
        Some(output)
    }
}
