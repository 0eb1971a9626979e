//! Export of normalized region records for inspection.
//!
//! The record table is the contract between normalization and
//! rasterization, so it is useful to be able to look at it directly:
//! as CSV for spreadsheets, JSON for scripts, or an aligned text table.

use std::fmt;

use serde::Serialize;

use super::RegionRecord;
use crate::error::ViamaskError;
use crate::raster::{output_name, MASK_EXTENSION};

/// Output formats for [`render_records`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordsFormat {
    Text,
    Csv,
    Json,
}

/// One CSV row. Point lists are written as JSON arrays in a single cell.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    filename: &'a str,
    x_points: String,
    y_points: String,
    #[serde(rename = "type")]
    region_type: &'a str,
    filetype: &'a str,
    count: usize,
}

/// Renders records in the requested format.
pub fn render_records(
    records: &[RegionRecord],
    format: RecordsFormat,
) -> Result<String, ViamaskError> {
    match format {
        RecordsFormat::Text => Ok(RecordsTable(records).to_string()),
        RecordsFormat::Csv => to_records_csv_string(records),
        RecordsFormat::Json => {
            to_records_json_string(records).map_err(|e| ViamaskError::RecordsExport {
                message: e.to_string(),
            })
        }
    }
}

/// Writes records as CSV with the columns
/// `filename,x_points,y_points,type,filetype,count`.
pub fn to_records_csv_string(records: &[RegionRecord]) -> Result<String, ViamaskError> {
    let mut csv_writer = csv::Writer::from_writer(Vec::new());

    for record in records {
        let row = CsvRow {
            filename: &record.filename,
            x_points: points_cell(&record.x_points),
            y_points: points_cell(&record.y_points),
            region_type: &record.region_type,
            filetype: &record.filetype,
            count: record.count,
        };
        csv_writer
            .serialize(&row)
            .map_err(|e| ViamaskError::RecordsExport {
                message: e.to_string(),
            })?;
    }

    let bytes = csv_writer
        .into_inner()
        .map_err(|e| ViamaskError::Io(e.into_error()))?;

    String::from_utf8(bytes).map_err(|e| ViamaskError::RecordsExport {
        message: format!("Invalid UTF-8 in output: {}", e),
    })
}

/// Writes records as a pretty-printed JSON array.
pub fn to_records_json_string(records: &[RegionRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}

fn points_cell(points: &[i32]) -> String {
    let joined: Vec<String> = points.iter().map(i32::to_string).collect();
    format!("[{}]", joined.join(","))
}

/// Aligned text table of records and the mask file each one produces.
pub struct RecordsTable<'a>(pub &'a [RegionRecord]);

impl fmt::Display for RecordsTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let records = self.0;
        if records.is_empty() {
            return writeln!(f, "No regions found");
        }

        let rows: Vec<[String; 5]> = records
            .iter()
            .map(|r| {
                [
                    r.source_file_name(),
                    r.label().unwrap_or("-").to_string(),
                    r.count.to_string(),
                    r.point_count().to_string(),
                    output_name(r, MASK_EXTENSION),
                ]
            })
            .collect();

        let headers = ["source", "type", "count", "points", "mask"];
        let mut widths = headers.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.len());
            }
        }

        write_row(f, &headers.map(String::from), &widths)?;
        for row in &rows {
            write_row(f, row, &widths)?;
        }
        writeln!(f)?;
        writeln!(f, "{} region(s)", records.len())
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, cells: &[String; 5], widths: &[usize; 5]) -> fmt::Result {
    let line: Vec<String> = cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    writeln!(f, "{}", line.join("  ").trim_end())
}
