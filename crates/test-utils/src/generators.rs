//! Generators for tiny raster and array files.
//!
//! Files are a few hundred bytes to a few KB so tests stay fast. Header
//! fields (sizes, strip layout, georeferencing) are fixed and documented on
//! each function so tests can assert against them.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use zarrs::array::{ArrayBuilder, DataType, FillValue};
use zarrs_filesystem::FilesystemStore;

type GenResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Rows per strip in generated GeoTIFFs.
pub const GEOTIFF_ROWS_PER_STRIP: u32 = 4;

/// Upper-left corner and pixel size of generated GeoTIFFs (EPSG:4326,
/// roughly Houston).
pub const GEOTIFF_ORIGIN: (f64, f64) = (-95.5, 30.0);
pub const GEOTIFF_PIXEL_SIZE: f64 = 0.01;

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0);
/// assert_eq!(grid[10], 1.0);
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Write a single-band Float32 GeoTIFF.
///
/// Stripped with [`GEOTIFF_ROWS_PER_STRIP`] rows per strip, georeferenced
/// with ModelPixelScale/ModelTiepoint at [`GEOTIFF_ORIGIN`] and a GeoKey
/// directory declaring EPSG:4326.
pub fn write_test_geotiff(path: &Path, width: u32, height: u32) -> GenResult<()> {
    let data = create_test_grid(width as usize, height as usize);
    let mut encoder = TiffEncoder::new(File::create(path)?)?;
    let mut image = encoder.new_image::<Gray32Float>(width, height)?;
    image.rows_per_strip(GEOTIFF_ROWS_PER_STRIP)?;

    let scale = [GEOTIFF_PIXEL_SIZE, GEOTIFF_PIXEL_SIZE, 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &scale[..])?;

    let tiepoint = [0.0, 0.0, 0.0, GEOTIFF_ORIGIN.0, GEOTIFF_ORIGIN.1, 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;

    let geokeys: [u16; 12] = [
        1, 1, 0, 2, // version 1.1.0, 2 keys
        1024, 0, 1, 2, // GTModelType = geographic
        2048, 0, 1, 4326, // GeographicType = WGS 84
    ];
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])?;

    image.write_data(&data)?;
    Ok(())
}

/// Write an RGB PNG with a simple gradient.
pub fn write_test_png(path: &Path, width: u32, height: u32) -> GenResult<()> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    img.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

/// Write a Zarr v3 array at `path` (metadata only, no chunks).
///
/// `dims` are stored in the xarray `_ARRAY_DIMENSIONS` attribute.
pub fn write_test_zarr_array(
    path: &Path,
    shape: &[u64],
    chunks: &[u64],
    dims: &[&str],
) -> GenResult<()> {
    std::fs::create_dir_all(path)?;
    let store = Arc::new(FilesystemStore::new(path)?);
    store_array(&store, "/", shape, chunks, dims)
}

/// Write a Zarr v3 group with one Float32 array per `(name, dims)` entry,
/// all sharing `shape` and `chunks`.
pub fn write_test_zarr_group(
    path: &Path,
    attributes: Value,
    arrays: &[(&str, &[&str])],
    shape: &[u64],
    chunks: &[u64],
) -> GenResult<()> {
    std::fs::create_dir_all(path)?;
    let group = json!({
        "zarr_format": 3,
        "node_type": "group",
        "attributes": attributes,
    });
    std::fs::write(path.join("zarr.json"), serde_json::to_vec_pretty(&group)?)?;

    let store = Arc::new(FilesystemStore::new(path)?);
    for (name, dims) in arrays {
        store_array(&store, &format!("/{name}"), shape, chunks, dims)?;
    }
    Ok(())
}

fn store_array(
    store: &Arc<FilesystemStore>,
    path: &str,
    shape: &[u64],
    chunks: &[u64],
    dims: &[&str],
) -> GenResult<()> {
    let mut attrs = Map::new();
    attrs.insert("_ARRAY_DIMENSIONS".to_string(), json!(dims));
    attrs.insert("units".to_string(), json!("degC"));

    let array = ArrayBuilder::new(
        shape.to_vec(),
        DataType::Float32,
        chunks.to_vec().try_into()?,
        FillValue::from(f32::NAN),
    )
    .attributes(attrs)
    .build(store.clone(), path)?;

    array.store_metadata()?;
    Ok(())
}
