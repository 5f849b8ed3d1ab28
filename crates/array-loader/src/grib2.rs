//! GRIB2 loader.
//!
//! Scans the section structure of every message with the `grib` crate and
//! describes each submessage as one variable. Data sections are skipped.

use std::collections::HashSet;

use serde_json::{json, Map};
use tracing::debug;

use crate::error::{LoaderError, Result};
use crate::handle::{ArrayHandle, DataType, Variable};
use crate::registry::{ArrayLoader, OpenOptions};
use crate::source;

/// Loader for the `grib` driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct Grib2Loader;

impl ArrayLoader for Grib2Loader {
    fn driver(&self) -> &str {
        "grib"
    }

    fn open(&self, href: &str, options: &OpenOptions) -> Result<ArrayHandle> {
        let reader = source::open(href, &options.storage_options, &options.source)?;
        let grib2 = grib::from_reader(reader).map_err(|e| LoaderError::Grib(e.to_string()))?;

        let mut handle = ArrayHandle::new(href, self.driver());
        let mut seen = HashSet::new();

        for ((message, submessage), sub) in grib2.iter() {
            let discipline = sub.indicator().discipline;
            let grid_tmpl = sub.grid_def().grid_tmpl_num();
            let prod_def = sub.prod_def();
            let category = prod_def.parameter_category();
            let number = prod_def.parameter_number();

            let mut name = format!(
                "d{}_c{}_p{}",
                discipline,
                category.map_or("x".to_string(), |c| c.to_string()),
                number.map_or("x".to_string(), |n| n.to_string()),
            );
            if !seen.insert(name.clone()) {
                name = format!("{name}_{message}_{submessage}");
                seen.insert(name.clone());
            }

            let mut attributes = Map::new();
            attributes.insert("discipline".into(), json!(discipline));
            attributes.insert("parameter_category".into(), json!(category));
            attributes.insert("parameter_number".into(), json!(number));
            attributes.insert("grid_template".into(), json!(grid_tmpl));
            attributes.insert("product_template".into(), json!(prod_def.prod_tmpl_num()));
            attributes.insert("message".into(), json!([message, submessage]));
            if let Some(ft) = prod_def.forecast_time() {
                attributes.insert("forecast_time".into(), json!(ft.value));
            }
            if let Some((first, _)) = prod_def.fixed_surfaces() {
                attributes.insert("surface_type".into(), json!(first.surface_type));
            }

            // Grids the crate cannot describe fall back to a flat point list.
            let mut variable = match sub.grid_shape() {
                Ok((ni, nj)) => Variable::new(
                    name,
                    vec!["y".into(), "x".into()],
                    vec![nj as u64, ni as u64],
                    DataType::Float32,
                ),
                Err(_) => Variable::new(
                    name,
                    vec!["values".into()],
                    vec![sub.grid_def().num_points() as u64],
                    DataType::Float32,
                ),
            };

            variable.attributes = attributes;
            handle.variables.push(variable);
        }

        if handle.variables.is_empty() {
            return Err(LoaderError::Grib(format!("no GRIB2 messages in {href}")));
        }

        debug!(href = %href, variables = handle.variables.len(), "Scanned GRIB2 sections");
        handle.attributes.insert("edition".into(), json!(2));
        Ok(handle)
    }
}
