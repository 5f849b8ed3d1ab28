//! Lazy array handles.
//!
//! An [`ArrayHandle`] describes the variables of a data source (dimension
//! names, shapes, chunking, element type, attributes) without holding any
//! element values. Loaders produce handles from headers and metadata only.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LoaderError, Result};

/// Element type of an array variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Complex64,
    Complex128,
    /// A type the loader recognised but this model does not name.
    Other,
}

impl DataType {
    /// Size of one element in bytes.
    pub fn size_bytes(&self) -> Option<usize> {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => Some(1),
            Self::Int16 | Self::UInt16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::Float32 => Some(4),
            Self::Int64 | Self::UInt64 | Self::Float64 | Self::Complex64 => Some(8),
            Self::Complex128 => Some(16),
            Self::Other => None,
        }
    }

    /// Map TIFF `BitsPerSample` / `SampleFormat` (1 = uint, 2 = int, 3 = float).
    pub fn from_tiff(bits_per_sample: u32, sample_format: u32) -> Self {
        match (sample_format, bits_per_sample) {
            (1, 1) => Self::Bool,
            (1, 8) => Self::UInt8,
            (1, 16) => Self::UInt16,
            (1, 32) => Self::UInt32,
            (1, 64) => Self::UInt64,
            (2, 8) => Self::Int8,
            (2, 16) => Self::Int16,
            (2, 32) => Self::Int32,
            (2, 64) => Self::Int64,
            (3, 32) => Self::Float32,
            (3, 64) => Self::Float64,
            _ => Self::Other,
        }
    }
}

/// One named, n-dimensional variable of a data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub dims: Vec<String>,
    pub shape: Vec<u64>,
    /// Chunk shape, same rank as `shape`.
    pub chunks: Vec<u64>,
    pub dtype: DataType,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl Variable {
    /// Create a variable stored as a single chunk.
    pub fn new(
        name: impl Into<String>,
        dims: Vec<String>,
        shape: Vec<u64>,
        dtype: DataType,
    ) -> Self {
        let chunks = shape.clone();
        Self {
            name: name.into(),
            dims,
            shape,
            chunks,
            dtype,
            attributes: Map::new(),
        }
    }

    /// Set the chunk shape.
    pub fn with_chunks(mut self, chunks: Vec<u64>) -> Self {
        self.chunks = chunks;
        self
    }

    /// Set one attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Number of elements.
    pub fn len(&self) -> u64 {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Uncompressed size in bytes, if the element size is known.
    pub fn nbytes(&self) -> Option<u64> {
        self.dtype.size_bytes().map(|s| s as u64 * self.len())
    }

    /// Number of chunks along each dimension.
    pub fn chunk_counts(&self) -> Vec<u64> {
        self.shape
            .iter()
            .zip(&self.chunks)
            .map(|(&n, &c)| if c == 0 { 0 } else { n.div_ceil(c) })
            .collect()
    }

    fn dim_index(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }
}

/// Metadata-only view of an opened data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayHandle {
    /// Where the data lives.
    pub href: String,
    /// Loader that produced this handle.
    pub driver: String,
    pub variables: Vec<Variable>,
    /// Source-level attributes (CRS, transform, format details).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    /// Keyword options the handle was opened with.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

impl ArrayHandle {
    pub fn new(href: impl Into<String>, driver: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            driver: driver.into(),
            variables: Vec::new(),
            attributes: Map::new(),
            options: Map::new(),
        }
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Look up a variable by name.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Names of all variables, in loader order.
    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    /// Apply a `chunks` keyword option.
    ///
    /// Accepts an object mapping dimension name to chunk size (`-1` means the
    /// whole dimension, `null` keeps the native chunking) or a single integer
    /// applied to every dimension. An empty object keeps the native chunking.
    pub fn apply_chunks(&mut self, chunks: &Value) -> Result<()> {
        if let Some(var) = self
            .variables
            .iter()
            .find(|v| v.chunks.len() != v.shape.len())
        {
            return Err(LoaderError::invalid_option(
                "chunks",
                format!(
                    "variable '{}' has {} chunk sizes for {} dimensions",
                    var.name,
                    var.chunks.len(),
                    var.shape.len()
                ),
            ));
        }
        match chunks {
            Value::Null => Ok(()),
            Value::Number(n) => {
                let size = parse_chunk_size(n.as_i64(), "chunks")?;
                for var in &mut self.variables {
                    for i in 0..var.shape.len() {
                        var.chunks[i] = clamp_chunk(size, var.shape[i]);
                    }
                }
                Ok(())
            }
            Value::Object(map) => {
                for (dim, value) in map {
                    if value.is_null() {
                        continue;
                    }
                    let size = parse_chunk_size(value.as_i64(), dim)?;
                    for var in &mut self.variables {
                        if let Some(i) = var.dim_index(dim) {
                            var.chunks[i] = clamp_chunk(size, var.shape[i]);
                        }
                    }
                }
                Ok(())
            }
            other => Err(LoaderError::invalid_option(
                "chunks",
                format!("expected an object or integer, got {other}"),
            )),
        }
    }

    /// Concatenate handles along `dim`.
    ///
    /// Variables that already have `dim` are joined along it and must agree
    /// on every other extent. Variables without it gain `dim` as a new
    /// leading dimension and must have identical shapes. The result records
    /// the source hrefs under the `sources` attribute.
    pub fn stack(handles: Vec<ArrayHandle>, dim: &str) -> Result<ArrayHandle> {
        let mut iter = handles.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| LoaderError::StackMismatch("no arrays to stack".to_string()))?;

        let mut variables = first.variables;
        let mut sources = vec![Value::String(first.href.clone())];
        let mut count: u64 = 1;
        for other in iter {
            if other.variables.len() != variables.len() {
                return Err(LoaderError::StackMismatch(format!(
                    "{} has {} variables, {} has {}",
                    first.href,
                    variables.len(),
                    other.href,
                    other.variables.len()
                )));
            }
            for (acc, var) in variables.iter_mut().zip(&other.variables) {
                let along = acc.dim_index(dim);
                let compatible = acc.name == var.name
                    && acc.dims == var.dims
                    && acc.shape.len() == var.shape.len()
                    && acc
                        .shape
                        .iter()
                        .zip(&var.shape)
                        .enumerate()
                        .all(|(i, (a, b))| Some(i) == along || a == b);
                if !compatible {
                    return Err(LoaderError::StackMismatch(format!(
                        "{}:{} {:?} {:?} does not match {}:{} {:?} {:?}",
                        first.href,
                        acc.name,
                        acc.dims,
                        acc.shape,
                        other.href,
                        var.name,
                        var.dims,
                        var.shape
                    )));
                }
                if let Some(i) = along {
                    acc.shape[i] += var.shape[i];
                }
            }
            sources.push(Value::String(other.href));
            count += 1;
        }

        for var in &mut variables {
            if var.dim_index(dim).is_none() {
                var.dims.insert(0, dim.to_string());
                var.shape.insert(0, count);
                var.chunks.insert(0, 1);
            }
        }

        let mut attributes = first.attributes;
        attributes.insert("sources".to_string(), Value::Array(sources));

        Ok(ArrayHandle {
            href: first.href,
            driver: first.driver,
            variables,
            attributes,
            options: first.options,
        })
    }
}

fn parse_chunk_size(value: Option<i64>, key: &str) -> Result<Option<u64>> {
    match value {
        Some(-1) => Ok(None),
        Some(n) if n > 0 => Ok(Some(n as u64)),
        _ => Err(LoaderError::invalid_option(
            key,
            "chunk size must be a positive integer or -1",
        )),
    }
}

fn clamp_chunk(size: Option<u64>, extent: u64) -> u64 {
    match size {
        Some(n) => n.min(extent.max(1)),
        None => extent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raster(href: &str, h: u64, w: u64) -> ArrayHandle {
        ArrayHandle::new(href, "geotiff").with_variable(
            Variable::new(
                "band_data",
                vec!["band".into(), "y".into(), "x".into()],
                vec![1, h, w],
                DataType::Float32,
            )
            .with_chunks(vec![1, 256, 256]),
        )
    }

    #[test]
    fn test_from_tiff() {
        assert_eq!(DataType::from_tiff(8, 1), DataType::UInt8);
        assert_eq!(DataType::from_tiff(16, 2), DataType::Int16);
        assert_eq!(DataType::from_tiff(32, 3), DataType::Float32);
        assert_eq!(DataType::from_tiff(12, 1), DataType::Other);
    }

    #[test]
    fn test_variable_sizes() {
        let var = Variable::new("v", vec!["y".into(), "x".into()], vec![10, 20], DataType::Float64)
            .with_chunks(vec![4, 20]);
        assert_eq!(var.len(), 200);
        assert_eq!(var.nbytes(), Some(1600));
        assert_eq!(var.chunk_counts(), vec![3, 1]);
    }

    #[test]
    fn test_apply_chunks_by_dim() {
        let mut handle = raster("a.tif", 1000, 500);
        handle.apply_chunks(&json!({"x": 100, "y": -1})).unwrap();
        assert_eq!(handle.variables[0].chunks, vec![1, 1000, 100]);
    }

    #[test]
    fn test_apply_empty_chunks_keeps_native() {
        let mut handle = raster("a.tif", 1000, 500);
        handle.apply_chunks(&json!({})).unwrap();
        assert_eq!(handle.variables[0].chunks, vec![1, 256, 256]);
    }

    #[test]
    fn test_apply_chunks_integer_clamps() {
        let mut handle = raster("a.tif", 100, 50);
        handle.apply_chunks(&json!(64)).unwrap();
        assert_eq!(handle.variables[0].chunks, vec![1, 64, 50]);
    }

    #[test]
    fn test_apply_chunks_rejects_garbage() {
        let mut handle = raster("a.tif", 100, 50);
        assert!(handle.apply_chunks(&json!({"x": 0})).is_err());
        assert!(handle.apply_chunks(&json!("auto")).is_err());
    }

    #[test]
    fn test_apply_chunks_rejects_rank_mismatch() {
        let mut handle = ArrayHandle::new("a.tif", "geotiff").with_variable(
            Variable::new("v", vec!["y".into(), "x".into()], vec![10, 10], DataType::UInt8)
                .with_chunks(vec![10]),
        );
        let err = handle.apply_chunks(&json!({"x": 5})).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidOption { .. }));
    }

    #[test]
    fn test_stack_concatenates_existing_dim() {
        let stacked = ArrayHandle::stack(
            vec![
                raster("b4.tif", 10, 10),
                raster("b5.tif", 10, 10),
                raster("b6.tif", 10, 10),
            ],
            "band",
        )
        .unwrap();
        let var = &stacked.variables[0];
        assert_eq!(var.dims, vec!["band", "y", "x"]);
        assert_eq!(var.shape, vec![3, 10, 10]);
        assert_eq!(var.chunks, vec![1, 256, 256]);
        assert_eq!(
            stacked.attributes["sources"],
            json!(["b4.tif", "b5.tif", "b6.tif"])
        );
    }

    #[test]
    fn test_stack_adds_leading_dim() {
        let stacked = ArrayHandle::stack(
            vec![raster("b4.tif", 10, 10), raster("b5.tif", 10, 10)],
            "wavelength",
        )
        .unwrap();
        let var = &stacked.variables[0];
        assert_eq!(var.dims, vec!["wavelength", "band", "y", "x"]);
        assert_eq!(var.shape, vec![2, 1, 10, 10]);
        assert_eq!(var.chunks[0], 1);
    }

    #[test]
    fn test_stack_rejects_shape_mismatch() {
        let err =
            ArrayHandle::stack(vec![raster("a.tif", 10, 10), raster("b.tif", 20, 10)], "band")
                .unwrap_err();
        assert!(matches!(err, LoaderError::StackMismatch(_)));

        let err =
            ArrayHandle::stack(vec![raster("a.tif", 10, 10), raster("b.tif", 20, 10)], "time")
                .unwrap_err();
        assert!(matches!(err, LoaderError::StackMismatch(_)));
    }
}
