//! VGG Image Annotator (VIA) JSON export reader.
//!
//! VIA exports annotations as a JSON object keyed by an opaque annotation ID
//! (usually the file name followed by the file size). Each value describes
//! one image and the regions drawn on it:
//!
//! ```json
//! {
//!   "cat.jpg20480": {
//!     "filename": "cat.jpg",
//!     "size": 20480,
//!     "regions": [
//!       {
//!         "shape_attributes": {
//!           "name": "polygon",
//!           "all_points_x": [0, 10, 10, 0],
//!           "all_points_y": [0, 0, 10, 10]
//!         },
//!         "region_attributes": { "Type": "head" }
//!       }
//!     ],
//!     "file_attributes": {}
//!   }
//! }
//! ```
//!
//! The types here are deliberately permissive: required keys are modelled as
//! `Option` so that [`crate::normalize`] can report *which* key is missing
//! and where, instead of surfacing a bare deserialization error. `size` and
//! `file_attributes` are not read.

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::error::Category;

use crate::error::ViamaskError;

/// A parsed VIA export, with top-level entries in document order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawAnnotationDocument {
    /// `(annotation_id, entry)` pairs. The ID is kept only for error messages.
    pub entries: Vec<(String, RawEntry)>,
}

/// One annotated image.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RawEntry {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub regions: Option<Vec<RawRegion>>,
}

/// One drawn region inside an image entry.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RawRegion {
    #[serde(default)]
    pub shape_attributes: Option<ShapeAttributes>,
    #[serde(default)]
    pub region_attributes: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Geometry of a region. Only polygons are supported.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ShapeAttributes {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub all_points_x: Option<Vec<i32>>,
    #[serde(default)]
    pub all_points_y: Option<Vec<i32>>,
}

impl<'de> Deserialize<'de> for RawAnnotationDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(DocumentVisitor)
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = RawAnnotationDocument;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a VIA export object keyed by annotation id")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        let mut seen = HashSet::new();

        while let Some(id) = map.next_key::<String>()? {
            if !seen.insert(id.clone()) {
                return Err(de::Error::custom(format!(
                    "duplicate annotation id '{}'",
                    id
                )));
            }
            let entry: RawEntry = map.next_value()?;
            entries.push((id, entry));
        }

        Ok(RawAnnotationDocument { entries })
    }
}

impl RawAnnotationDocument {
    /// Total number of regions across all entries that have a `regions` list.
    pub fn region_count(&self) -> usize {
        self.entries
            .iter()
            .filter_map(|(_, entry)| entry.regions.as_ref())
            .map(Vec::len)
            .sum()
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Reads a VIA JSON export from disk.
///
/// # Errors
/// - [`ViamaskError::Io`] if the file cannot be opened.
/// - [`ViamaskError::AnnotationParse`] if the file is not valid JSON.
/// - [`ViamaskError::Schema`] if the JSON is well-formed but has the wrong
///   shape (e.g. a string where point coordinates are expected).
pub fn read_via_json(path: &Path) -> Result<RawAnnotationDocument, ViamaskError> {
    let file = File::open(path).map_err(ViamaskError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| classify_parse_error(path, source))
}

/// Parses a VIA JSON export from a string.
///
/// Useful for testing without file I/O.
pub fn from_via_str(json: &str) -> Result<RawAnnotationDocument, serde_json::Error> {
    serde_json::from_str(json)
}

/// Parses a VIA JSON export from a byte slice.
pub fn from_via_slice(bytes: &[u8]) -> Result<RawAnnotationDocument, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Structural mismatches are schema errors; everything else is a parse error.
fn classify_parse_error(path: &Path, source: serde_json::Error) -> ViamaskError {
    match source.classify() {
        Category::Data => ViamaskError::schema(
            format!("{} (line {}, column {})", path.display(), source.line(), source.column()),
            source.to_string(),
        ),
        Category::Io => match source.io_error_kind() {
            Some(kind) => ViamaskError::Io(std::io::Error::new(kind, source)),
            None => ViamaskError::AnnotationParse {
                path: path.to_path_buf(),
                source,
            },
        },
        Category::Syntax | Category::Eof => ViamaskError::AnnotationParse {
            path: path.to_path_buf(),
            source,
        },
    }
}
