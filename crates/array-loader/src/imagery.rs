//! Plain image loader (PNG, JPEG).
//!
//! Not part of the default registry: thumbnails and overviews are not
//! analysis-ready rasters, so callers opt in explicitly.

use image::codecs::jpeg::JpegDecoder;
use image::codecs::png::PngDecoder;
use image::{ColorType, ImageDecoder, ImageFormat};
use serde_json::json;
use tracing::debug;

use crate::error::{LoaderError, Result};
use crate::handle::{ArrayHandle, DataType, Variable};
use crate::registry::{ArrayLoader, OpenOptions};
use crate::source::{self, read_prefix};

/// Loader for the `image` driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageLoader;

impl ArrayLoader for ImageLoader {
    fn driver(&self) -> &str {
        "image"
    }

    fn open(&self, href: &str, options: &OpenOptions) -> Result<ArrayHandle> {
        let mut reader = source::open(href, &options.storage_options, &options.source)?;
        let magic = read_prefix(reader.as_mut(), 16)?;
        let format = image::guess_format(&magic)?;

        let ((width, height), color) = match format {
            ImageFormat::Png => {
                let decoder = PngDecoder::new(reader)?;
                (decoder.dimensions(), decoder.color_type())
            }
            ImageFormat::Jpeg => {
                let decoder = JpegDecoder::new(reader)?;
                (decoder.dimensions(), decoder.color_type())
            }
            other => {
                return Err(LoaderError::Image(format!(
                    "unsupported image format {other:?}"
                )))
            }
        };

        let channels = color.channel_count() as u64;
        debug!(href = %href, width, height, channels, ?format, "Read image header");

        let variable = Variable::new(
            "image",
            vec!["y".into(), "x".into(), "channel".into()],
            vec![height as u64, width as u64, channels],
            sample_type(color),
        );

        Ok(ArrayHandle::new(href, self.driver())
            .with_variable(variable)
            .with_attribute("format", json!(format!("{format:?}").to_lowercase())))
    }
}

fn sample_type(color: ColorType) -> DataType {
    let channels = color.channel_count().max(1) as u16;
    match color.bytes_per_pixel() as u16 / channels {
        1 => DataType::UInt8,
        2 => DataType::UInt16,
        4 => DataType::Float32,
        _ => DataType::Other,
    }
}
