//! GeoTIFF / Cloud-Optimized GeoTIFF loader.
//!
//! Reads the first IFD only (plus a walk over the remaining IFDs to count
//! overviews). Pixel data is never decoded.

use serde_json::{json, Value};
use tiff::decoder::{ChunkType, Decoder};
use tiff::tags::Tag;
use tracing::debug;

use crate::error::Result;
use crate::handle::{ArrayHandle, DataType, Variable};
use crate::registry::{ArrayLoader, OpenOptions};
use crate::source;

/// GeoKey ids holding an EPSG code.
const PROJECTED_CRS_KEY: u16 = 3072;
const GEOGRAPHIC_CRS_KEY: u16 = 2048;

/// Variable name used for the band cube, as xarray/rioxarray do.
pub const BAND_VARIABLE: &str = "band_data";

/// Loader for the `geotiff` driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTiffLoader;

impl ArrayLoader for GeoTiffLoader {
    fn driver(&self) -> &str {
        "geotiff"
    }

    fn open(&self, href: &str, options: &OpenOptions) -> Result<ArrayHandle> {
        let reader = source::open(href, &options.storage_options, &options.source)?;
        let mut decoder = Decoder::new(reader)?;

        let (width, height) = decoder.dimensions()?;
        let bands = decoder.find_tag_unsigned::<u32>(Tag::SamplesPerPixel)?.unwrap_or(1);
        let bits = decoder
            .find_tag_unsigned_vec::<u32>(Tag::BitsPerSample)?
            .and_then(|v| v.first().copied())
            .unwrap_or(8);
        let format = decoder
            .find_tag_unsigned_vec::<u32>(Tag::SampleFormat)?
            .and_then(|v| v.first().copied())
            .unwrap_or(1);
        let dtype = DataType::from_tiff(bits, format);

        let tiled = decoder.get_chunk_type() == ChunkType::Tile;
        let (chunk_w, chunk_h) = decoder.chunk_dimensions();
        let compression = decoder.find_tag_unsigned::<u16>(Tag::Compression)?.unwrap_or(1);

        let mut attributes = serde_json::Map::new();
        attributes.insert("tiled".into(), json!(tiled));
        attributes.insert("compression".into(), json!(compression));
        if let Some(nodata) = read_nodata(&mut decoder)? {
            attributes.insert("nodata".into(), json!(nodata));
        }
        if let Some(transform) = read_transform(&mut decoder)? {
            attributes.insert("transform".into(), json!(transform));
        }
        if let Some(epsg) = read_epsg(&mut decoder)? {
            attributes.insert("crs".into(), json!(format!("EPSG:{epsg}")));
        }

        let overviews = count_overviews(&mut decoder, width, height);
        attributes.insert("overviews".into(), json!(overviews));

        debug!(
            href = %href,
            width,
            height,
            bands,
            ?dtype,
            tiled,
            overviews,
            "Read GeoTIFF header"
        );

        let variable = Variable::new(
            BAND_VARIABLE,
            vec!["band".into(), "y".into(), "x".into()],
            vec![bands as u64, height as u64, width as u64],
            dtype,
        )
        .with_chunks(vec![1, chunk_h.min(height) as u64, chunk_w.min(width) as u64]);

        let mut handle = ArrayHandle::new(href, self.driver()).with_variable(variable);
        handle.attributes = attributes;
        Ok(handle)
    }
}

/// GDAL nodata tag, stored as ASCII.
fn read_nodata<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>> {
    if decoder.find_tag(Tag::GdalNodata)?.is_none() {
        return Ok(None);
    }
    let text = decoder.get_tag_ascii_string(Tag::GdalNodata)?;
    Ok(text.trim_matches(char::from(0)).trim().parse().ok())
}

/// Affine transform `[a, b, c, d, e, f]` in GDAL order from pixel scale and
/// the first tiepoint.
fn read_transform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<Option<[f64; 6]>> {
    if decoder.find_tag(Tag::ModelPixelScaleTag)?.is_none()
        || decoder.find_tag(Tag::ModelTiepointTag)?.is_none()
    {
        return Ok(None);
    }
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag)?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag)?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return Ok(None);
    }

    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Ok(Some([origin_x, scale[0], 0.0, origin_y, 0.0, -scale[1]]))
}

/// EPSG code from the GeoKey directory, projected CRS preferred.
fn read_epsg<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<Option<u16>> {
    let Some(keys) = decoder.find_tag_unsigned_vec::<u16>(Tag::GeoKeyDirectoryTag)? else {
        return Ok(None);
    };
    Ok(epsg_from_geokeys(&keys))
}

fn epsg_from_geokeys(keys: &[u16]) -> Option<u16> {
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;
    let entries: Vec<&[u16]> = keys[4..].chunks_exact(4).take(count).collect();

    // Location 0 means the value is stored inline.
    let lookup = |id: u16| {
        entries
            .iter()
            .find(|e| e[0] == id && e[1] == 0)
            .map(|e| e[3])
            .filter(|&code| code != 0 && code != 32767)
    };
    lookup(PROJECTED_CRS_KEY).or_else(|| lookup(GEOGRAPHIC_CRS_KEY))
}

/// Count reduced-resolution IFDs following the first image.
fn count_overviews<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    width: u32,
    height: u32,
) -> usize {
    let mut count = 0;
    while decoder.more_images() {
        if decoder.next_image().is_err() {
            break;
        }
        match decoder.dimensions() {
            Ok((w, h)) if w < width || h < height => count += 1,
            _ => {}
        }
    }
    count
}

/// Convenience for callers that want the transform as JSON.
pub fn transform_of(handle: &ArrayHandle) -> Option<Vec<f64>> {
    handle
        .attributes
        .get("transform")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_f64).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsg_from_geokeys() {
        // Header + GTModelType + GeographicType 4326.
        let keys = [1, 1, 0, 2, 1024, 0, 1, 2, 2048, 0, 1, 4326];
        assert_eq!(epsg_from_geokeys(&keys), Some(4326));

        // Projected wins over geographic.
        let keys = [1, 1, 0, 2, 2048, 0, 1, 4326, 3072, 0, 1, 32615];
        assert_eq!(epsg_from_geokeys(&keys), Some(32615));

        // User-defined (32767) is not an EPSG code.
        let keys = [1, 1, 0, 1, 3072, 0, 1, 32767];
        assert_eq!(epsg_from_geokeys(&keys), None);

        assert_eq!(epsg_from_geokeys(&[1, 1]), None);
    }

    #[test]
    fn test_not_a_tiff() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.tif");
        std::fs::write(&path, b"definitely not a tiff").unwrap();

        let err = GeoTiffLoader
            .open(path.to_str().unwrap(), &OpenOptions::default())
            .unwrap_err();
        assert!(matches!(err, crate::LoaderError::Tiff(_) | crate::LoaderError::Io(_)));
    }
}
