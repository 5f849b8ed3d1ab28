//! Tabular view of an ItemCollection.
//!
//! One row per item: a `geometry` column holding the GeoJSON geometry,
//! then one column per property key. Items missing a property get `null`.

use indexmap::IndexSet;
use serde::Serialize;
use serde_json::{Map, Value};
use stac_model::{ItemCollection, ItemExt};

/// CRS recorded when the caller does not name one.
pub const DEFAULT_CRS: &str = "EPSG:4326";

const GEOMETRY_COLUMN: &str = "geometry";

/// Items of a FeatureCollection as rows of a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureTable {
    /// Coordinate reference system of the geometry column.
    pub crs: String,
    /// Column names: `geometry`, then property keys in first-seen order.
    pub columns: Vec<String>,
    /// One value per column, per item.
    pub rows: Vec<Vec<Value>>,
}

impl FeatureTable {
    pub(crate) fn from_item_collection(items: &ItemCollection, crs: Option<&str>) -> Self {
        let records: Vec<(Value, Map<String, Value>)> = items
            .items
            .iter()
            .map(|item| {
                let geometry = item
                    .geometry
                    .as_ref()
                    .and_then(|g| serde_json::to_value(g).ok())
                    .unwrap_or(Value::Null);
                (geometry, item.properties_map())
            })
            .collect();

        let mut columns: IndexSet<String> = IndexSet::new();
        columns.insert(GEOMETRY_COLUMN.to_string());
        for (_, properties) in &records {
            columns.extend(properties.keys().cloned());
        }

        let rows = records
            .into_iter()
            .map(|(geometry, properties)| {
                std::iter::once(geometry)
                    .chain(
                        columns
                            .iter()
                            .skip(1)
                            .map(|c| properties.get(c).cloned().unwrap_or(Value::Null)),
                    )
                    .collect()
            })
            .collect();

        Self {
            crs: crs.unwrap_or(DEFAULT_CRS).to_string(),
            columns: columns.into_iter().collect(),
            rows,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }
}
