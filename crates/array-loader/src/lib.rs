//! Lazy array handles for geospatial data assets.
//!
//! Loaders inspect headers and metadata only (TIFF IFDs, GRIB2 section
//! headers, Zarr metadata documents, image headers) and describe what they
//! find as an [`ArrayHandle`]: named variables with dimensions, shapes,
//! chunking and element types. No pixel data is decoded.
//!
//! # Example
//!
//! ```ignore
//! use array_loader::{LoaderRegistry, OpenOptions};
//!
//! let registry = LoaderRegistry::with_defaults();
//! let handle = registry.open("geotiff", "mosaic.tif", &OpenOptions::default())?;
//! println!("{:?}", handle.variables[0].shape);
//! ```

pub mod error;
pub mod geotiff;
pub mod grib2;
pub mod handle;
pub mod imagery;
pub mod registry;
pub mod source;
pub mod zarr;

pub use error::{LoaderError, Result};
pub use geotiff::GeoTiffLoader;
pub use grib2::Grib2Loader;
pub use handle::{ArrayHandle, DataType, Variable};
pub use imagery::ImageLoader;
pub use registry::{ArrayLoader, LoaderRegistry, OpenOptions};
pub use source::SourceConfig;
pub use zarr::ZarrLoader;
