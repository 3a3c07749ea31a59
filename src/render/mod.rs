//! GeoJSON rendering
//!
//! Renders a finalized [`Table`] as a GeoJSON `FeatureCollection`, one point
//! `Feature` per row. All columns become feature properties; the coordinate
//! columns keep whatever JSON type the server returned.

use crate::error::{Error, Result};
use crate::table::Table;
use serde_json::json;

/// Default longitude column name
pub const X_KEY: &str = "longitude";
/// Default latitude column name
pub const Y_KEY: &str = "latitude";

/// Render a table as GeoJSON using the default coordinate columns.
///
/// Returns `None` for an empty table; a table without the coordinate columns
/// is a caller error.
pub fn to_geojson(table: &Table) -> Result<Option<String>> {
    to_geojson_with(table, X_KEY, Y_KEY)
}

/// Render a table as GeoJSON with explicit coordinate column names
pub fn to_geojson_with(table: &Table, x_key: &str, y_key: &str) -> Result<Option<String>> {
    if table.is_empty() {
        return Ok(None);
    }
    if !table.has_column(x_key) {
        return Err(Error::missing_column(x_key));
    }
    if !table.has_column(y_key) {
        return Err(Error::missing_column(y_key));
    }

    let columns = table.columns();
    let features: Vec<_> = table
        .rows()
        .map(|row| {
            let properties: serde_json::Map<String, serde_json::Value> = columns
                .iter()
                .zip(row.iter())
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            let x = &properties[x_key];
            let y = &properties[y_key];
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [x, y],
                },
                "properties": properties,
            })
        })
        .collect();

    let collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });
    Ok(Some(serde_json::to_string(&collection)?))
}
