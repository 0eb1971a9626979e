//! Flattening of VIA documents into one record per labeled region.
//!
//! [`normalize`] walks every entry in document order and every region of that
//! entry in order, producing one [`RegionRecord`] per region. After all rows
//! exist, each row receives a `count`: the number of earlier rows sharing the
//! same `(filename, type)` pair. The `(filename, type, count)` triple is
//! therefore unique across the batch and is what mask file names are built
//! from.
//!
//! Any structural problem rejects the whole document; there is no partial
//! output.

pub mod export;

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::ViamaskError;
use crate::via::{RawAnnotationDocument, RawRegion};

/// The only region attribute key that carries the class label.
pub const TYPE_ATTRIBUTE: &str = "Type";

/// The only supported shape kind.
pub const POLYGON_SHAPE: &str = "polygon";

/// Fewest vertices a region polygon may have.
pub const MIN_POLYGON_POINTS: usize = 3;

/// One labeled polygon, flattened and ready to rasterize.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegionRecord {
    /// Source image file name without its extension.
    pub filename: String,
    pub x_points: Vec<i32>,
    pub y_points: Vec<i32>,
    /// Class label; empty when the region had no `Type` attribute.
    #[serde(rename = "type")]
    pub region_type: String,
    /// Source image extension (everything after the first `.`).
    pub filetype: String,
    /// Occurrence index among records with the same `(filename, type)`.
    pub count: usize,
}

impl RegionRecord {
    /// The source image's file name, `{filename}.{filetype}`.
    pub fn source_file_name(&self) -> String {
        format!("{}.{}", self.filename, self.filetype)
    }

    /// The class label, or `None` for untyped regions.
    pub fn label(&self) -> Option<&str> {
        if self.region_type.is_empty() {
            None
        } else {
            Some(&self.region_type)
        }
    }

    /// Polygon vertices as `(x, y)` pairs. The polygon is implicitly closed.
    pub fn points(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.x_points
            .iter()
            .copied()
            .zip(self.y_points.iter().copied())
    }

    pub fn point_count(&self) -> usize {
        self.x_points.len()
    }
}

/// Where in the document a region came from; used in schema error messages.
#[derive(Clone, Copy, Debug)]
struct RegionLocation<'a> {
    annotation_id: &'a str,
    region_index: usize,
}

impl fmt::Display for RegionLocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "annotation '{}' region {}",
            self.annotation_id, self.region_index
        )
    }
}

/// Flattens a VIA document into region records.
///
/// # Errors
/// Returns [`ViamaskError::Schema`] for the first structural problem found:
/// a missing `filename`, `regions` or `shape_attributes`, a file name without
/// an extension, a non-polygon shape, mismatched or too-short point lists, or
/// region attributes other than a single string `Type`.
pub fn normalize(document: &RawAnnotationDocument) -> Result<Vec<RegionRecord>, ViamaskError> {
    let mut records = Vec::with_capacity(document.region_count());

    for (annotation_id, entry) in &document.entries {
        let entry_location = format!("annotation '{}'", annotation_id);

        let file_name = entry
            .filename
            .as_deref()
            .ok_or_else(|| ViamaskError::schema(&entry_location, "missing 'filename'"))?;
        let (stem, extension) = split_filename(file_name)
            .map_err(|message| ViamaskError::schema(&entry_location, message))?;

        let regions = entry
            .regions
            .as_ref()
            .ok_or_else(|| ViamaskError::schema(&entry_location, "missing 'regions'"))?;

        for (region_index, region) in regions.iter().enumerate() {
            let location = RegionLocation {
                annotation_id,
                region_index,
            };
            records.push(normalize_region(stem, extension, region, location)?);
        }
    }

    assign_counts(&mut records);
    Ok(records)
}

/// Splits `name` on its first `.` into `(stem, extension)`.
pub fn split_filename(name: &str) -> Result<(&str, &str), String> {
    let Some((stem, extension)) = name.split_once('.') else {
        return Err(format!("filename '{}' has no extension", name));
    };

    if stem.is_empty() {
        return Err(format!("filename '{}' has an empty stem", name));
    }
    if extension.is_empty() {
        return Err(format!("filename '{}' has an empty extension", name));
    }
    if stem.contains(['/', '\\']) {
        return Err(format!(
            "filename '{}' contains a path separator; masks are written flat",
            name
        ));
    }

    Ok((stem, extension))
}

fn normalize_region(
    stem: &str,
    extension: &str,
    region: &RawRegion,
    location: RegionLocation<'_>,
) -> Result<RegionRecord, ViamaskError> {
    let shape = region
        .shape_attributes
        .as_ref()
        .ok_or_else(|| ViamaskError::schema(location.to_string(), "missing 'shape_attributes'"))?;

    if let Some(name) = shape.name.as_deref() {
        if name != POLYGON_SHAPE {
            return Err(ViamaskError::schema(
                location.to_string(),
                format!("unsupported shape '{}' (only 'polygon' is supported)", name),
            ));
        }
    }

    let x_points = shape
        .all_points_x
        .clone()
        .ok_or_else(|| ViamaskError::schema(location.to_string(), "missing 'all_points_x'"))?;
    let y_points = shape
        .all_points_y
        .clone()
        .ok_or_else(|| ViamaskError::schema(location.to_string(), "missing 'all_points_y'"))?;

    if x_points.len() != y_points.len() {
        return Err(ViamaskError::schema(
            location.to_string(),
            format!(
                "point count mismatch: {} x value(s) but {} y value(s)",
                x_points.len(),
                y_points.len()
            ),
        ));
    }
    if x_points.len() < MIN_POLYGON_POINTS {
        return Err(ViamaskError::schema(
            location.to_string(),
            format!(
                "polygon has {} point(s); at least {} are required",
                x_points.len(),
                MIN_POLYGON_POINTS
            ),
        ));
    }

    let region_type = extract_type(region)
        .map_err(|message| ViamaskError::schema(location.to_string(), message))?;

    Ok(RegionRecord {
        filename: stem.to_string(),
        x_points,
        y_points,
        region_type,
        filetype: extension.to_string(),
        count: 0,
    })
}

/// Reads the class label from `region_attributes`.
///
/// An absent attribute map, an empty one, or a `null` label all mean
/// "untyped". Any key other than `Type` is rejected rather than guessed at.
fn extract_type(region: &RawRegion) -> Result<String, String> {
    let Some(attributes) = region.region_attributes.as_ref() else {
        return Ok(String::new());
    };

    if let Some(other) = attributes.keys().find(|key| key.as_str() != TYPE_ATTRIBUTE) {
        return Err(format!(
            "unexpected region attribute '{}' (only '{}' is supported)",
            other, TYPE_ATTRIBUTE
        ));
    }

    match attributes.get(TYPE_ATTRIBUTE) {
        None | Some(serde_json::Value::Null) => Ok(String::new()),
        Some(serde_json::Value::String(label)) => Ok(label.clone()),
        Some(other) => Err(format!(
            "'{}' attribute must be a string, found {}",
            TYPE_ATTRIBUTE, other
        )),
    }
}

/// Numbers records within each `(filename, type)` group in production order.
fn assign_counts(records: &mut [RegionRecord]) {
    let mut seen: HashMap<(String, String), usize> = HashMap::new();

    for record in records.iter_mut() {
        let next = seen
            .entry((record.filename.clone(), record.region_type.clone()))
            .or_insert(0);
        record.count = *next;
        *next += 1;
    }
}
